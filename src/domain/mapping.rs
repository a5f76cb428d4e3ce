// ==========================================
// 竞品目录匹配系统 - 列映射
// ==========================================
// 职责: 标准字段 → 源列标签
// 有效条件: model 非空且存在于表头行，
//           且至少一个 specifications 标签存在于表头行
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// ColumnMapping - 列映射
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// 型号列标签（单列）
    pub model: String,
    /// 规格列标签（多列，保持顺序）
    pub specifications: Vec<String>,
}

impl ColumnMapping {
    pub fn new<S: Into<String>>(model: impl Into<String>, specifications: Vec<S>) -> Self {
        Self {
            model: model.into(),
            specifications: specifications.into_iter().map(Into::into).collect(),
        }
    }

    /// 两个字段均未设置
    pub fn is_empty(&self) -> bool {
        self.model.trim().is_empty() && self.specifications.is_empty()
    }
}

// ==========================================
// MappingOverride - 人工覆写
// ==========================================
// 每次只替换一个字段，另一个字段保持不变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum MappingOverride {
    Model(String),
    Specifications(Vec<String>),
}
