// ==========================================
// 竞品目录匹配系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，包装导入层错误为调用方可读的消息
// ==========================================

use crate::importer::error::ImportError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 调用方输入错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    /// 当前会话状态不允许该操作（如尚未加载数据）
    #[error("状态不允许: {0}")]
    InvalidState(String),

    // ==========================================
    // 导入管道错误
    // ==========================================
    #[error(transparent)]
    Import(#[from] ImportError),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 用户修改输入后可以重试（不需要重新加载数据源）
    pub fn is_user_fixable(&self) -> bool {
        matches!(
            self,
            ApiError::InvalidInput(_) | ApiError::Import(ImportError::MappingIncomplete(_))
        )
    }

    /// 附带的引擎诊断输出
    pub fn diagnostics(&self) -> Option<String> {
        match self {
            ApiError::Import(err) => err.diagnostics(),
            _ => None,
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
