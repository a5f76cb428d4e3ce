// ==========================================
// 竞品目录匹配系统 - 配置层
// ==========================================
// 职责: 导入配置加载，支持文件与环境变量覆写
// ==========================================

pub mod import_config;

// 重导出核心配置
pub use import_config::{config_keys, default_config_path, ImportConfig};
