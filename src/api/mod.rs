// ==========================================
// 竞品目录匹配系统 - API 层
// ==========================================
// 职责: 提供导入会话与重新匹配接口，供命令行或宿主程序调用
// ==========================================

pub mod error;
pub mod import_api;
pub mod preview;
pub mod rematch_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::{ImportApi, MappingStatus};
pub use preview::{column_letter, PreviewColumn, TablePreview};
pub use rematch_api::{RematchApi, RematchOptions, RematchRequest, RematchResponse};
