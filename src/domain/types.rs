// ==========================================
// 竞品目录匹配系统 - 领域类型定义
// ==========================================
// 职责: 导入状态、步骤状态、文件格式等枚举
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 导入状态 (Import Status)
// ==========================================
// 单向流转: Idle → Processing → {Complete | Error}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Idle,       // 未开始
    Processing, // 处理中
    Complete,   // 已完成（终态）
    Error,      // 失败（终态）
}

impl ImportStatus {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportStatus::Complete | ImportStatus::Error)
    }

    /// 判断是否允许流转到目标状态
    pub fn can_transition_to(&self, next: ImportStatus) -> bool {
        matches!(
            (self, next),
            (ImportStatus::Idle, ImportStatus::Processing)
                | (ImportStatus::Processing, ImportStatus::Complete)
                | (ImportStatus::Processing, ImportStatus::Error)
        )
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportStatus::Idle => write!(f, "idle"),
            ImportStatus::Processing => write!(f, "processing"),
            ImportStatus::Complete => write!(f, "complete"),
            ImportStatus::Error => write!(f, "error"),
        }
    }
}

// ==========================================
// 步骤状态 (Step State)
// ==========================================
// 相对 current_step 计算，供进度展示使用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    Complete, // 已完成
    Active,   // 进行中
    Pending,  // 未开始
}

// ==========================================
// 本地文件格式 (File Format)
// ==========================================
// 仅接受 .csv / .xlsx / .xls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Xlsx,
    Xls,
}

impl FileFormat {
    /// 根据扩展名识别格式（大小写不敏感，不含点号）
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().to_lowercase().as_str() {
            "csv" => Some(FileFormat::Csv),
            "xlsx" => Some(FileFormat::Xlsx),
            "xls" => Some(FileFormat::Xls),
            _ => None,
        }
    }

    /// 从文件名提取扩展名
    ///
    /// 无扩展名时返回空字符串
    pub fn extension_of(file_name: &str) -> String {
        std::path::Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase()
    }

    /// 是否为二进制工作簿格式
    pub fn is_workbook(&self) -> bool {
        matches!(self, FileFormat::Xlsx | FileFormat::Xls)
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Csv => write!(f, "csv"),
            FileFormat::Xlsx => write!(f, "xlsx"),
            FileFormat::Xls => write!(f, "xls"),
        }
    }
}
