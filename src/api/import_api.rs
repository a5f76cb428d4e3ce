// ==========================================
// 竞品目录匹配系统 - 目录导入API
// ==========================================
// 职责: 单个导入会话的调用入口
// 流程: 加载数据源 → 建议表头行 → 推断列映射 → (调整) → 启动导入 → 查询进度
// 会话: 同一时间只持有一个会话；导入任务持有会话数据的副本
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::preview::TablePreview;
use crate::config::ImportConfig;
use crate::domain::job::{ImportJob, ImportReport, SourceIdentity};
use crate::domain::mapping::{ColumnMapping, MappingOverride};
use crate::domain::progress::ImportProgress;
use crate::domain::table::{HeaderRowIndex, RawTable};
use crate::engine::{ArtifactManager, EngineDispatcher, ImportOrchestrator};
use crate::importer::column_mapper::{apply_override, ensure_complete, ColumnMapper};
use crate::importer::error::ImportError;
use crate::importer::file_parser::LocalFileReader;
use crate::importer::header_locator::HeaderLocator;
use crate::importer::source_reader_trait::SourceReader;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, instrument};

/// 映射状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingStatus {
    pub valid: bool,
    /// 未通过校验的原因
    pub reason: Option<String>,
    pub headers: Vec<String>,
    pub mapping: ColumnMapping,
}

// 当前会话
struct ImportSession {
    title: String,
    source: SourceIdentity,
    table: RawTable,
    header_row: HeaderRowIndex,
    mapping: ColumnMapping,
    job: Option<Arc<ImportJob>>,
}

impl ImportSession {
    fn headers(&self) -> Vec<String> {
        self.table.header_labels(self.header_row).unwrap_or_default()
    }

    /// 已登记且未进入终态的任务视为占用（包括尚未 begin 的 idle 任务）
    fn is_busy(&self) -> bool {
        self.job
            .as_ref()
            .map(|job| !job.progress().status.is_terminal())
            .unwrap_or(false)
    }

    /// 表头行或映射变化后，旧任务的结果不再代表当前会话
    fn begin_edit(&mut self) -> ApiResult<()> {
        if self.is_busy() {
            return Err(ApiError::InvalidState("导入进行中，无法修改映射".to_string()));
        }
        self.job = None;
        Ok(())
    }
}

/// 目录导入API
pub struct ImportApi {
    config: ImportConfig,
    orchestrator: ImportOrchestrator,
    locator: HeaderLocator,
    mapper: ColumnMapper,
    session: Mutex<Option<ImportSession>>,
}

impl ImportApi {
    /// 创建新的ImportApi实例（使用子进程引擎）
    pub fn new(config: ImportConfig) -> Self {
        let orchestrator = ImportOrchestrator::from_config(&config);
        Self::with_orchestrator(config, orchestrator)
    }

    /// 使用指定的引擎调用实现
    pub fn with_dispatcher(config: ImportConfig, dispatcher: Box<dyn EngineDispatcher>) -> Self {
        let orchestrator = ImportOrchestrator::new(
            dispatcher,
            ArtifactManager::new(config.artifact_dir.clone()),
            config.engine_timeout(),
        );
        Self::with_orchestrator(config, orchestrator)
    }

    fn with_orchestrator(config: ImportConfig, orchestrator: ImportOrchestrator) -> Self {
        Self {
            locator: HeaderLocator::from_config(&config),
            mapper: ColumnMapper::default(),
            config,
            orchestrator,
            session: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    fn lock(&self) -> ApiResult<MutexGuard<'_, Option<ImportSession>>> {
        self.session
            .lock()
            .map_err(|e| ApiError::InternalError(format!("锁获取失败: {}", e)))
    }

    /// 在会话上执行操作；尚未加载数据时返回 InvalidState
    fn with_session<T, F>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&mut ImportSession) -> ApiResult<T>,
    {
        let mut guard = self.lock()?;
        let session = guard
            .as_mut()
            .ok_or_else(|| ApiError::InvalidState("尚未加载目录数据".to_string()))?;
        f(session)
    }

    fn preview_of(&self, session: &ImportSession) -> TablePreview {
        TablePreview::build(
            &session.title,
            &session.table,
            session.header_row,
            &session.mapping,
            self.config.preview_rows,
        )
    }

    // ==========================================
    // 数据源加载
    // ==========================================

    /// 加载本地文件
    ///
    /// # 参数
    /// - file_name: 文件名（用于判断格式）
    /// - bytes: 文件内容
    pub async fn load_local(&self, file_name: &str, bytes: Vec<u8>) -> ApiResult<TablePreview> {
        let reader = LocalFileReader::new(file_name, bytes)?;
        self.load_from(&reader, None).await
    }

    /// 加载远程表格
    ///
    /// # 参数
    /// - reader: 远程读取器（已绑定会话与表格 ID）
    /// - tab: 表名；None 表示第一个表
    pub async fn load_remote(
        &self,
        reader: &dyn SourceReader,
        tab: Option<&str>,
    ) -> ApiResult<TablePreview> {
        self.load_from(reader, tab).await
    }

    #[instrument(skip(self, reader))]
    async fn load_from(
        &self,
        reader: &dyn SourceReader,
        tab: Option<&str>,
    ) -> ApiResult<TablePreview> {
        // 读取/解码失败直接返回，不影响现有会话
        let loaded = reader.read_table(tab).await?;
        if loaded.table.is_empty() {
            return Err(ApiError::Import(ImportError::ParseFailure(format!(
                "{} 中没有数据",
                loaded.title
            ))));
        }

        let header_row = self.locator.locate(&loaded.table);
        let headers = loaded.table.header_labels(header_row).unwrap_or_default();
        let mapping = self.mapper.propose_mapping(&headers);
        info!(
            source = %loaded.source,
            rows = loaded.table.len(),
            header_row,
            model = %mapping.model,
            "目录数据已加载"
        );

        let mut guard = self.lock()?;
        if guard.as_ref().map(ImportSession::is_busy).unwrap_or(false) {
            return Err(ApiError::InvalidState("导入进行中，无法切换数据源".to_string()));
        }
        let session = ImportSession {
            title: loaded.title,
            source: loaded.source,
            table: loaded.table,
            header_row,
            mapping,
            job: None,
        };
        let preview = self.preview_of(&session);
        *guard = Some(session);
        Ok(preview)
    }

    // ==========================================
    // 表头行与映射
    // ==========================================

    /// 设置表头行，并按新表头重新推断映射（原映射作废）
    pub fn set_header_row(&self, header_row: HeaderRowIndex) -> ApiResult<TablePreview> {
        self.with_session(|session| {
            if header_row >= session.table.len() {
                return Err(ApiError::InvalidInput(format!(
                    "表头行 {} 超出范围（共 {} 行）",
                    header_row,
                    session.table.len()
                )));
            }
            session.begin_edit()?;
            session.header_row = header_row;
            session.mapping = self.mapper.propose_mapping(&session.headers());
            info!(header_row, model = %session.mapping.model, "表头行已更新");
            Ok(self.preview_of(session))
        })
    }

    /// 覆写一个映射字段
    pub fn override_mapping(&self, change: MappingOverride) -> ApiResult<MappingStatus> {
        self.with_session(|session| {
            session.begin_edit()?;
            session.mapping = apply_override(&session.mapping, change);
            Ok(Self::status_of(session))
        })
    }

    pub fn mapping_status(&self) -> ApiResult<MappingStatus> {
        self.with_session(|session| Ok(Self::status_of(session)))
    }

    fn status_of(session: &ImportSession) -> MappingStatus {
        let headers = session.headers();
        let reason = match ensure_complete(&session.mapping, &headers) {
            Ok(()) => None,
            Err(ImportError::MappingIncomplete(reason)) => Some(reason),
            Err(other) => Some(other.to_string()),
        };
        MappingStatus {
            valid: reason.is_none(),
            reason,
            headers,
            mapping: session.mapping.clone(),
        }
    }

    pub fn preview(&self) -> ApiResult<TablePreview> {
        self.with_session(|session| Ok(self.preview_of(session)))
    }

    // ==========================================
    // 导入
    // ==========================================

    /// 启动导入
    ///
    /// # 返回
    /// - Ok(ImportReport): 完成
    /// - Err(Import(MappingIncomplete)): 映射未通过校验，会话数据保留
    /// - Err(InvalidState): 未加载数据或已有任务在执行
    pub async fn start_import(&self) -> ApiResult<ImportReport> {
        let job = self.with_session(|session| {
            if session.is_busy() {
                return Err(ApiError::InvalidState("已有导入任务正在执行".to_string()));
            }
            let job = Arc::new(ImportJob::new(
                session.source.clone(),
                session.table.clone(),
                session.header_row,
                session.mapping.clone(),
            ));
            ImportOrchestrator::check_ready(&job)?;
            session.job = Some(Arc::clone(&job));
            Ok(job)
        })?;

        Ok(self.orchestrator.start_import(&job).await?)
    }

    /// 当前任务进度；尚未启动任务时为 idle
    pub fn progress(&self) -> ApiResult<ImportProgress> {
        let guard = self.lock()?;
        Ok(guard
            .as_ref()
            .and_then(|s| s.job.as_ref())
            .map(|job| job.progress())
            .unwrap_or_default())
    }

    /// 清空会话
    pub fn reset(&self) -> ApiResult<()> {
        let mut guard = self.lock()?;
        if guard.as_ref().map(ImportSession::is_busy).unwrap_or(false) {
            return Err(ApiError::InvalidState("导入进行中，无法清空会话".to_string()));
        }
        *guard = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ImportStatus;

    #[tokio::test]
    async fn test_operations_require_loaded_session() {
        let api = ImportApi::new(ImportConfig::default());

        assert!(matches!(api.set_header_row(0), Err(ApiError::InvalidState(_))));
        assert!(matches!(api.mapping_status(), Err(ApiError::InvalidState(_))));
        assert!(matches!(api.start_import().await, Err(ApiError::InvalidState(_))));
        assert_eq!(api.progress().unwrap().status, ImportStatus::Idle);
    }

    #[tokio::test]
    async fn test_load_local_suggests_header_and_mapping() {
        let api = ImportApi::new(ImportConfig::default());
        let csv = "Product Catalog 2024\nModelo,Especificación,Precio\nX100,8GB,10\n";

        let preview = api.load_local("catalog.csv", csv.as_bytes().to_vec()).await.unwrap();
        assert_eq!(preview.header_row, 1);
        assert!(preview.columns[0].is_model);
        assert!(preview.columns[1].is_specification);

        let status = api.mapping_status().unwrap();
        assert!(status.valid);
        assert_eq!(status.mapping.model, "Modelo");
    }

    #[tokio::test]
    async fn test_set_header_row_recomputes_mapping() {
        let api = ImportApi::new(ImportConfig::default());
        let csv = "Model,Spec\nSKU,Details\nX100,8GB\n";
        api.load_local("catalog.csv", csv.as_bytes().to_vec()).await.unwrap();

        api.override_mapping(MappingOverride::Specifications(vec!["Spec".to_string()]))
            .unwrap();
        api.set_header_row(1).unwrap();

        let status = api.mapping_status().unwrap();
        assert_eq!(status.mapping.model, "SKU");
        assert_eq!(status.mapping.specifications, vec!["Details".to_string()]);

        assert!(matches!(api.set_header_row(3), Err(ApiError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_incomplete_mapping_keeps_session() {
        let api = ImportApi::new(ImportConfig::default());
        api.load_local("catalog.csv", b"A,B\n1,2\n".to_vec()).await.unwrap();

        let err = api.start_import().await.unwrap_err();
        assert!(matches!(err, ApiError::Import(ImportError::MappingIncomplete(_))));
        assert_eq!(api.progress().unwrap().status, ImportStatus::Idle);

        let status = api
            .override_mapping(MappingOverride::Model("A".to_string()))
            .unwrap();
        assert!(!status.valid);
        let status = api
            .override_mapping(MappingOverride::Specifications(vec!["B".to_string()]))
            .unwrap();
        assert!(status.valid);
    }

    #[tokio::test]
    async fn test_unsupported_upload_is_rejected() {
        let api = ImportApi::new(ImportConfig::default());
        let err = api.load_local("catalog.pdf", b"%PDF".to_vec()).await.unwrap_err();
        assert!(matches!(err, ApiError::Import(ImportError::UnsupportedFormat(_))));
    }

    fn missing_engine_config(dir: &std::path::Path) -> ImportConfig {
        ImportConfig {
            engine_program: "catalog-import-missing-engine".to_string(),
            artifact_dir: dir.to_path_buf(),
            ..ImportConfig::default()
        }
    }

    #[tokio::test]
    async fn test_registered_job_blocks_second_start() {
        let api = ImportApi::new(ImportConfig::default());
        api.load_local("catalog.csv", b"Model,Spec\nX100,8GB\n".to_vec())
            .await
            .unwrap();

        // 任务已登记但尚未进入 processing
        {
            let mut guard = api.lock().unwrap();
            let session = guard.as_mut().unwrap();
            session.job = Some(Arc::new(ImportJob::new(
                session.source.clone(),
                session.table.clone(),
                session.header_row,
                session.mapping.clone(),
            )));
        }

        assert!(matches!(api.start_import().await, Err(ApiError::InvalidState(_))));
        assert!(matches!(
            api.override_mapping(MappingOverride::Model("Spec".to_string())),
            Err(ApiError::InvalidState(_))
        ));
        assert!(matches!(api.set_header_row(0), Err(ApiError::InvalidState(_))));
        assert!(matches!(api.reset(), Err(ApiError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_editing_after_failed_import_resets_progress() {
        let dir = tempfile::tempdir().unwrap();
        let api = ImportApi::new(missing_engine_config(dir.path()));
        api.load_local("catalog.csv", b"Model,Spec,Notes\nX100,8GB,new\n".to_vec())
            .await
            .unwrap();

        let err = api.start_import().await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Import(ImportError::EngineDispatchFailure { .. })
        ));
        assert_eq!(api.progress().unwrap().status, ImportStatus::Error);

        api.override_mapping(MappingOverride::Specifications(vec![
            "Spec".to_string(),
            "Notes".to_string(),
        ]))
        .unwrap();
        assert_eq!(api.progress().unwrap().status, ImportStatus::Idle);

        assert!(api.start_import().await.is_err());
        assert_eq!(api.progress().unwrap().status, ImportStatus::Error);

        api.set_header_row(0).unwrap();
        assert_eq!(api.progress().unwrap().status, ImportStatus::Idle);
    }
}
