// ==========================================
// 竞品目录匹配系统 - 引擎层
// ==========================================
// 职责: 导入编排、临时文件生命周期、外部匹配引擎调用
// 红线: 不计算相似度、不排序匹配结果（由外部引擎负责）
// ==========================================

pub mod artifact;
pub mod dispatcher;
pub mod orchestrator;

// 重导出核心类型
pub use artifact::{ArtifactManager, EphemeralArtifact};
pub use dispatcher::{
    bounded, parse_structured_output, run_engine_process, EngineDispatcher,
    ProcessEngineDispatcher,
};
pub use orchestrator::ImportOrchestrator;
