// ==========================================
// 竞品目录匹配系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 传播策略: 读取/解码错误在映射前中止；
//           processing 阶段的失败直接进入 error 终态；
//           任何阶段都不自动重试
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 远程数据源错误 =====
    #[error("无法识别的表格标识: {0}")]
    InvalidIdentifier(String),

    #[error("登录已过期，请重新登录")]
    AuthExpired,

    #[error("未登录，请先完成授权")]
    NotAuthenticated,

    #[error("无访问权限: {0}")]
    PermissionDenied(String),

    #[error("资源不存在: {0}")]
    NotFound(String),

    #[error("远程请求失败: {0}")]
    RemoteRequest(String),

    // ===== 本地文件解码错误 =====
    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件解析失败: {0}")]
    ParseFailure(String),

    // ===== 映射校验错误 =====
    #[error("列映射不完整: {0}")]
    MappingIncomplete(String),

    // ===== 处理阶段错误 =====
    #[error("标准记录生成失败: {0}")]
    SerializationFailure(String),

    #[error("文件读写失败: {0}")]
    FileIo(String),

    #[error("匹配引擎执行失败: {message}")]
    EngineDispatchFailure {
        message: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("匹配引擎超时（{timeout_secs} 秒）")]
    EngineTimeout { timeout_secs: u64 },

    // ===== 状态与配置错误 =====
    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("配置错误 (key: {key}): {message}")]
    Config { key: String, message: String },
}

impl ImportError {
    /// 引擎原始诊断输出（stderr 优先，其次 stdout）
    pub fn diagnostics(&self) -> Option<String> {
        match self {
            ImportError::EngineDispatchFailure { stdout, stderr, .. } => {
                if !stderr.trim().is_empty() {
                    Some(stderr.clone())
                } else if !stdout.trim().is_empty() {
                    Some(stdout.clone())
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// 是否属于数据源读取/解码类错误
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            ImportError::InvalidIdentifier(_)
                | ImportError::AuthExpired
                | ImportError::NotAuthenticated
                | ImportError::PermissionDenied(_)
                | ImportError::NotFound(_)
                | ImportError::RemoteRequest(_)
                | ImportError::UnsupportedFormat(_)
                | ImportError::ParseFailure(_)
        )
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileIo(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::ParseFailure(format!("CSV: {}", err))
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ParseFailure(format!("工作簿: {}", err))
    }
}

// 实现 From<reqwest::Error>
impl From<reqwest::Error> for ImportError {
    fn from(err: reqwest::Error) -> Self {
        ImportError::RemoteRequest(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::ParseFailure(format!("JSON: {}", err))
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
