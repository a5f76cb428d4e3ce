// ==========================================
// 竞品目录匹配系统 - 导入任务
// ==========================================
// 职责: 一次导入运行 = 原始表 + 表头行 + 列映射 + 数据源标识
// 生命周期: 用户触发"开始导入"时创建，进入终态时结束
// ==========================================

use crate::domain::mapping::ColumnMapping;
use crate::domain::progress::ImportProgress;
use crate::domain::table::{HeaderRowIndex, RawTable};
use crate::importer::error::ImportResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use uuid::Uuid;

// ==========================================
// SourceIdentity - 数据源标识
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceIdentity {
    Remote {
        spreadsheet_id: String,
        tab_title: String,
    },
    Local {
        file_name: String,
    },
}

impl fmt::Display for SourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceIdentity::Remote {
                spreadsheet_id,
                tab_title,
            } => write!(f, "remote:{}/{}", spreadsheet_id, tab_title),
            SourceIdentity::Local { file_name } => write!(f, "local:{}", file_name),
        }
    }
}

// ==========================================
// ImportJob - 导入任务
// ==========================================
#[derive(Debug)]
pub struct ImportJob {
    pub job_id: String,
    pub source: SourceIdentity,
    pub table: RawTable,
    pub header_row: HeaderRowIndex,
    pub mapping: ColumnMapping,
    pub created_at: DateTime<Utc>,
    progress: Mutex<ImportProgress>,
}

impl ImportJob {
    pub fn new(
        source: SourceIdentity,
        table: RawTable,
        header_row: HeaderRowIndex,
        mapping: ColumnMapping,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            source,
            table,
            header_row,
            mapping,
            created_at: Utc::now(),
            progress: Mutex::new(ImportProgress::idle()),
        }
    }

    /// 当前进度快照（只读副本）
    pub fn progress(&self) -> ImportProgress {
        self.progress
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// 在锁内修改进度
    pub(crate) fn update_progress<F>(&self, f: F) -> ImportResult<()>
    where
        F: FnOnce(&mut ImportProgress) -> ImportResult<()>,
    {
        let mut guard = self
            .progress
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

// ==========================================
// EngineOutput - 外部引擎输出
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOutput {
    /// 进程退出码（被信号终止时为 -1）
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl EngineOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

// ==========================================
// ImportReport - 导入结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub job_id: String,
    pub source: SourceIdentity,
    /// 实际写入临时文件并交给引擎的记录数
    pub processed_records: usize,
    /// 表头行之后的数据行数
    pub total_records: usize,
    pub engine: EngineOutput,
    /// 引擎输出中的结构化结果（无则为空数组）
    pub matches: serde_json::Value,
    pub elapsed_ms: i64,
}
