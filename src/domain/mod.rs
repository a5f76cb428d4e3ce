// ==========================================
// 竞品目录匹配系统 - 领域层
// ==========================================
// 职责: 原始表、列映射、标准记录、导入任务与进度
// ==========================================

pub mod job;
pub mod mapping;
pub mod progress;
pub mod record;
pub mod table;
pub mod types;

// 重导出核心类型
pub use job::{EngineOutput, ImportJob, ImportReport, SourceIdentity};
pub use mapping::{ColumnMapping, MappingOverride};
pub use progress::{ImportProgress, IMPORT_STEPS};
pub use record::{CanonicalRecord, SPEC_DELIMITER};
pub use table::{CellValue, HeaderRowIndex, RawTable};
pub use types::{FileFormat, ImportStatus, StepState};
