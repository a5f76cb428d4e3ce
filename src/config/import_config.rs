// ==========================================
// 竞品目录匹配系统 - 导入配置
// ==========================================
// 职责: 引擎命令、超时、临时目录、表头扫描参数、远程接口地址
// 加载顺序: 默认值 → JSON 配置文件 → 环境变量覆写
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::header_locator::{DEFAULT_MAX_AVG_LEN, DEFAULT_SCAN_ROWS};
use crate::importer::remote_sheet::DEFAULT_SHEETS_BASE_URL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

// ==========================================
// 配置键（环境变量名）
// ==========================================
pub mod config_keys {
    // 配置文件路径
    pub const CONFIG_PATH: &str = "CATALOG_IMPORT_CONFIG";

    // 匹配引擎
    pub const ENGINE_PROGRAM: &str = "CATALOG_IMPORT_ENGINE_PROGRAM";
    pub const ENGINE_TIMEOUT_SECS: &str = "CATALOG_IMPORT_ENGINE_TIMEOUT_SECS";

    // 临时文件
    pub const ARTIFACT_DIR: &str = "CATALOG_IMPORT_ARTIFACT_DIR";

    // 远程表格
    pub const REMOTE_BASE_URL: &str = "CATALOG_IMPORT_REMOTE_BASE_URL";
}

fn default_engine_program() -> String {
    "python".to_string()
}

fn default_engine_args() -> Vec<String> {
    vec!["tools/batch_processor.py".to_string()]
}

fn default_rematch_args() -> Vec<String> {
    vec!["tools/single_product_matcher.py".to_string()]
}

fn default_engine_timeout_secs() -> u64 {
    300
}

fn default_artifact_dir() -> PathBuf {
    std::env::temp_dir().join("catalog-import")
}

fn default_header_scan_rows() -> usize {
    DEFAULT_SCAN_ROWS
}

fn default_header_max_avg_len() -> usize {
    DEFAULT_MAX_AVG_LEN
}

fn default_remote_base_url() -> String {
    DEFAULT_SHEETS_BASE_URL.to_string()
}

fn default_remote_timeout_secs() -> u64 {
    30
}

fn default_preview_rows() -> usize {
    10
}

// ==========================================
// ImportConfig - 导入配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// 批量匹配引擎程序；临时文件路径作为最后一个位置参数追加
    #[serde(default = "default_engine_program")]
    pub engine_program: String,
    #[serde(default = "default_engine_args")]
    pub engine_args: Vec<String>,

    /// 单产品重新匹配程序
    #[serde(default = "default_engine_program")]
    pub rematch_program: String,
    #[serde(default = "default_rematch_args")]
    pub rematch_args: Vec<String>,

    /// 引擎调用上限（秒）
    #[serde(default = "default_engine_timeout_secs")]
    pub engine_timeout_secs: u64,

    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    #[serde(default = "default_header_scan_rows")]
    pub header_scan_rows: usize,
    #[serde(default = "default_header_max_avg_len")]
    pub header_max_avg_len: usize,

    #[serde(default = "default_remote_base_url")]
    pub remote_base_url: String,
    #[serde(default = "default_remote_timeout_secs")]
    pub remote_timeout_secs: u64,

    /// 预览行数
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            engine_program: default_engine_program(),
            engine_args: default_engine_args(),
            rematch_program: default_engine_program(),
            rematch_args: default_rematch_args(),
            engine_timeout_secs: default_engine_timeout_secs(),
            artifact_dir: default_artifact_dir(),
            header_scan_rows: default_header_scan_rows(),
            header_max_avg_len: default_header_max_avg_len(),
            remote_base_url: default_remote_base_url(),
            remote_timeout_secs: default_remote_timeout_secs(),
            preview_rows: default_preview_rows(),
        }
    }
}

impl ImportConfig {
    /// 加载配置
    ///
    /// # 逻辑
    /// 1. 配置文件存在时读取（路径见 default_config_path）
    /// 2. 应用环境变量覆写
    /// 3. 校验
    pub fn load() -> ImportResult<Self> {
        let mut config = match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件读取（缺失字段取默认值）
    pub fn from_file(path: &Path) -> ImportResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| ImportError::Config {
            key: config_keys::CONFIG_PATH.to_string(),
            message: format!("{}: {}", path.display(), e),
        })?;
        info!(path = %path.display(), "已加载配置文件");
        Ok(config)
    }

    /// 应用覆写
    ///
    /// # 参数
    /// - lookup: 键 → 值（通常为环境变量）
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ImportResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(program) = get(config_keys::ENGINE_PROGRAM) {
            self.engine_program = program;
        }
        if let Some(raw) = get(config_keys::ENGINE_TIMEOUT_SECS) {
            self.engine_timeout_secs = raw.parse().map_err(|_| ImportError::Config {
                key: config_keys::ENGINE_TIMEOUT_SECS.to_string(),
                message: format!("不是有效的秒数: {}", raw),
            })?;
        }
        if let Some(dir) = get(config_keys::ARTIFACT_DIR) {
            self.artifact_dir = PathBuf::from(dir);
        }
        if let Some(url) = get(config_keys::REMOTE_BASE_URL) {
            self.remote_base_url = url;
        }

        debug!(config = ?self, "配置覆写完成");
        Ok(())
    }

    pub fn validate(&self) -> ImportResult<()> {
        let invalid = |key: &str, message: &str| ImportError::Config {
            key: key.to_string(),
            message: message.to_string(),
        };

        if self.engine_program.trim().is_empty() {
            return Err(invalid("engine_program", "引擎程序不能为空"));
        }
        if self.engine_timeout_secs == 0 {
            return Err(invalid("engine_timeout_secs", "超时必须大于 0"));
        }
        if self.remote_timeout_secs == 0 {
            return Err(invalid("remote_timeout_secs", "超时必须大于 0"));
        }
        if self.header_scan_rows == 0 {
            return Err(invalid("header_scan_rows", "扫描行数必须大于 0"));
        }
        if self.header_max_avg_len == 0 {
            return Err(invalid("header_max_avg_len", "阈值必须大于 0"));
        }
        Ok(())
    }

    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout_secs)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }
}

/// 获取默认配置文件路径
///
/// # 返回
/// - 环境变量 CATALOG_IMPORT_CONFIG 指定的路径
/// - 否则: 用户配置目录/catalog-import/config.json
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(config_keys::CONFIG_PATH) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    dirs::config_dir().map(|dir| dir.join("catalog-import").join("config.json"))
}
