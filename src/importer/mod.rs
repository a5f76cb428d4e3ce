// ==========================================
// 竞品目录匹配系统 - 导入层
// ==========================================
// 职责: 外部目录数据读取、表头定位、列映射、标准记录序列化
// 支持: 远程表格, Excel, CSV
// ==========================================

// 模块声明
pub mod column_mapper;
pub mod error;
pub mod file_parser;
pub mod header_locator;
pub mod remote_sheet;
pub mod serializer;
pub mod source_reader_trait;

// 重导出核心类型
pub use column_mapper::{apply_override, ensure_complete, validate, ColumnMapper};
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, LocalFileReader, UniversalFileParser};
pub use header_locator::HeaderLocator;
pub use remote_sheet::{
    extract_spreadsheet_id, AuthSession, RemoteSheetReader, SpreadsheetMetadata, UserInfo,
};
pub use serializer::{build_records, encode, serialize, CANONICAL_HEADER};

// 重导出 Trait 接口
pub use file_parser::TableDecoder;
pub use source_reader_trait::{LoadedTable, SourceReader, TabInfo};
