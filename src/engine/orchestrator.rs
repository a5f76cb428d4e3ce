// ==========================================
// 竞品目录匹配系统 - 导入编排器
// ==========================================
// 状态机: idle → processing → {complete | error}
// 前置: 列映射校验通过，否则直接返回 MappingIncomplete（状态不变、不生成临时文件）
// processing 阶段严格按顺序执行:
//   (a) 统计数据行数
//   (b) 生成标准记录并序列化
//   (c) 写入临时文件
//   (d) 调用匹配引擎（有时间上限）
//   (e) 汇总结果
// 临时文件在 (d) 结束后立即删除（成功、失败、超时均删除）
// ==========================================

use crate::config::ImportConfig;
use crate::domain::job::{EngineOutput, ImportJob, ImportReport};
use crate::engine::artifact::ArtifactManager;
use crate::engine::dispatcher::{
    bounded, parse_structured_output, EngineDispatcher, ProcessEngineDispatcher,
};
use crate::importer::column_mapper::ensure_complete;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::serializer::{build_records, encode};
use chrono::Utc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

// 阶段编号（与 IMPORT_STEPS 对应）
const STEP_VALIDATE: usize = 0;
const STEP_SERIALIZE: usize = 1;
const STEP_ARTIFACT: usize = 2;
const STEP_DISPATCH: usize = 3;
const STEP_REPORT: usize = 4;

// processing 阶段的成功产出
struct StageOutcome {
    processed: usize,
    engine: EngineOutput,
    matches: serde_json::Value,
}

// ==========================================
// ImportOrchestrator - 导入编排器
// ==========================================
pub struct ImportOrchestrator {
    dispatcher: Box<dyn EngineDispatcher>,
    artifacts: ArtifactManager,
    dispatch_timeout: Duration,
}

impl ImportOrchestrator {
    /// 创建编排器
    ///
    /// # 参数
    /// - dispatcher: 引擎调用实现
    /// - artifacts: 临时文件管理
    /// - dispatch_timeout: 引擎调用上限
    pub fn new(
        dispatcher: Box<dyn EngineDispatcher>,
        artifacts: ArtifactManager,
        dispatch_timeout: Duration,
    ) -> Self {
        Self {
            dispatcher,
            artifacts,
            dispatch_timeout,
        }
    }

    /// 按配置创建（子进程引擎）
    pub fn from_config(config: &ImportConfig) -> Self {
        Self::new(
            Box::new(ProcessEngineDispatcher::from_config(config)),
            ArtifactManager::new(config.artifact_dir.clone()),
            config.engine_timeout(),
        )
    }

    pub fn artifacts(&self) -> &ArtifactManager {
        &self.artifacts
    }

    /// 启动前校验: 表头行存在且映射完整
    pub fn check_ready(job: &ImportJob) -> ImportResult<()> {
        let headers = job.table.header_labels(job.header_row).ok_or_else(|| {
            ImportError::MappingIncomplete(format!("表头行 {} 不存在", job.header_row))
        })?;
        ensure_complete(&job.mapping, &headers)
    }

    /// 执行一次导入
    ///
    /// # 返回
    /// - Ok(ImportReport): 任务进入 complete
    /// - Err(MappingIncomplete): 任务仍为 idle
    /// - Err(其他): 任务进入 error，进度中带有错误信息
    #[instrument(skip(self, job), fields(job_id = %job.job_id, source = %job.source))]
    pub async fn start_import(&self, job: &ImportJob) -> ImportResult<ImportReport> {
        Self::check_ready(job)?;

        let started = Utc::now();
        // (a) 统计数据行数
        let total = job.table.data_row_count(job.header_row);
        job.update_progress(|p| p.begin(total))?;
        info!(total_rows = total, "开始导入");

        match self.run_stages(job).await {
            Ok(outcome) => {
                let message = format!("导入完成，共处理 {} 条记录", outcome.processed);
                job.update_progress(|p| p.complete(outcome.processed, message))?;

                let elapsed_ms = (Utc::now() - started).num_milliseconds();
                info!(
                    processed = outcome.processed,
                    total_rows = total,
                    elapsed_ms,
                    "导入完成"
                );

                Ok(ImportReport {
                    job_id: job.job_id.clone(),
                    source: job.source.clone(),
                    processed_records: outcome.processed,
                    total_records: total,
                    engine: outcome.engine,
                    matches: outcome.matches,
                    elapsed_ms,
                })
            }
            Err(err) => {
                error!(error = %err, "导入失败");
                let detail = err.diagnostics().unwrap_or_else(|| err.to_string());
                if let Err(state_err) = job.update_progress(|p| p.fail(err.to_string(), Some(detail)))
                {
                    warn!(error = %state_err, "进度更新失败");
                }
                Err(err)
            }
        }
    }

    async fn run_stages(&self, job: &ImportJob) -> ImportResult<StageOutcome> {
        job.update_progress(|p| p.advance(STEP_VALIDATE))?;

        // (b) 序列化
        job.update_progress(|p| p.advance(STEP_SERIALIZE))?;
        let records = build_records(&job.table, job.header_row, &job.mapping)?;
        let bytes = encode(&records);
        let processed = records.len();
        let last_model = records.last().map(|r| r.model.clone());

        // (c) 临时文件
        job.update_progress(|p| p.advance(STEP_ARTIFACT))?;
        let artifact = self.artifacts.acquire(&bytes).await?;

        // (d) 调用引擎；无论结果如何先删除临时文件
        job.update_progress(|p| {
            p.current_product = last_model;
            p.advance(STEP_DISPATCH)
        })?;
        info!(
            records = processed,
            artifact = %artifact.path().display(),
            "调用匹配引擎"
        );
        let dispatched = bounded(
            self.dispatch_timeout,
            self.dispatcher.dispatch(artifact.path()),
        )
        .await;
        artifact.release().await;
        let engine = dispatched?;

        // (e) 汇总
        job.update_progress(|p| {
            p.processed_products = processed;
            p.advance(STEP_REPORT)
        })?;
        let matches =
            parse_structured_output(&engine.stdout).unwrap_or_else(|| serde_json::json!([]));

        Ok(StageOutcome {
            processed,
            engine,
            matches,
        })
    }
}
