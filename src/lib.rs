// ==========================================
// 竞品目录匹配系统 - 核心库
// ==========================================
// 职责: 目录导入与标准化管道
// 流程: 数据源读取 → 表头定位 → 列映射 → 标准记录序列化 → 外部匹配引擎
// 系统定位: 匹配引擎与结果存储为外部协作方，不在本库内
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 原始表、映射、任务与进度
pub mod domain;

// 导入层 - 数据源、表头定位、列映射、序列化
pub mod importer;

// 引擎层 - 导入编排与外部引擎调用
pub mod engine;

// 配置层 - 导入配置
pub mod config;

// 日志系统
pub mod logging;

// API 层 - 会话与重新匹配接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{FileFormat, ImportStatus, StepState};

// 领域实体
pub use domain::{
    CanonicalRecord, CellValue, ColumnMapping, HeaderRowIndex, ImportJob, ImportProgress,
    ImportReport, MappingOverride, RawTable, SourceIdentity,
};

// 导入层
pub use importer::{
    AuthSession, ColumnMapper, HeaderLocator, ImportError, ImportResult, LocalFileReader,
    RemoteSheetReader, SourceReader,
};

// 引擎
pub use engine::{ArtifactManager, EngineDispatcher, ImportOrchestrator, ProcessEngineDispatcher};

// 配置
pub use config::ImportConfig;

// API
pub use api::{ApiError, ImportApi, RematchApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "竞品目录匹配系统";
