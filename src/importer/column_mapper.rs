// ==========================================
// 竞品目录匹配系统 - 列映射器
// ==========================================
// 职责: 自动推断 model / specifications 列、人工覆写、完整性校验
// 匹配规则: 表头小写后做子串匹配（含西班牙语词根）
// ==========================================

use crate::domain::mapping::{ColumnMapping, MappingOverride};
use crate::importer::error::{ImportError, ImportResult};
use tracing::{debug, warn};

/// 型号列关键词
const MODEL_TOKENS: &[&str] = &["model", "modelo", "sku", "part"];

/// 规格列关键词
const SPEC_TOKENS: &[&str] = &[
    "spec",
    "description",
    "descripci",
    "detail",
    "feature",
    "característica",
    "caracteristica",
];

// ==========================================
// ColumnMapper - 列映射推断
// ==========================================
#[derive(Debug, Clone)]
pub struct ColumnMapper {
    model_tokens: Vec<String>,
    spec_tokens: Vec<String>,
}

impl Default for ColumnMapper {
    fn default() -> Self {
        Self::with_tokens(MODEL_TOKENS, SPEC_TOKENS)
    }
}

impl ColumnMapper {
    /// 使用自定义词表
    pub fn with_tokens(model_tokens: &[&str], spec_tokens: &[&str]) -> Self {
        let lower = |tokens: &[&str]| tokens.iter().map(|t| t.to_lowercase()).collect();
        Self {
            model_tokens: lower(model_tokens),
            spec_tokens: lower(spec_tokens),
        }
    }

    /// 根据表头推断映射
    ///
    /// # 返回
    /// - model: 第一个命中型号关键词的表头（无则为空）
    /// - specifications: 所有命中规格关键词的表头，排除已选为型号的列
    pub fn propose_mapping(&self, headers: &[String]) -> ColumnMapping {
        let model = headers
            .iter()
            .find(|h| matches_any(h, &self.model_tokens))
            .cloned()
            .unwrap_or_default();

        let mut specifications: Vec<String> = Vec::new();
        for header in headers {
            if header.trim().is_empty() || *header == model {
                continue;
            }
            if matches_any(header, &self.spec_tokens) && !specifications.contains(header) {
                specifications.push(header.clone());
            }
        }

        debug!(model = %model, specifications = ?specifications, "自动列映射");
        ColumnMapping {
            model,
            specifications,
        }
    }
}

fn matches_any(header: &str, tokens: &[String]) -> bool {
    let lower = header.trim().to_lowercase();
    !lower.is_empty() && tokens.iter().any(|t| lower.contains(t.as_str()))
}

/// 覆写单个字段，其他字段保持不变
///
/// specifications 去重并保持首次出现的顺序
pub fn apply_override(mapping: &ColumnMapping, change: MappingOverride) -> ColumnMapping {
    let mut next = mapping.clone();
    match change {
        MappingOverride::Model(model) => next.model = model,
        MappingOverride::Specifications(values) => {
            let mut specs: Vec<String> = Vec::with_capacity(values.len());
            for value in values {
                if !specs.contains(&value) {
                    specs.push(value);
                }
            }
            next.specifications = specs;
        }
    }
    next
}

/// 映射是否可用于序列化
///
/// model 已设置且存在于表头，并且至少一个 specifications 标签存在于表头
pub fn validate(mapping: &ColumnMapping, headers: &[String]) -> bool {
    missing_reason(mapping, headers).is_none()
}

/// 同 validate，失败时返回 MappingIncomplete 并附原因
pub fn ensure_complete(mapping: &ColumnMapping, headers: &[String]) -> ImportResult<()> {
    match missing_reason(mapping, headers) {
        None => Ok(()),
        Some(reason) => {
            warn!(reason = %reason, "列映射校验未通过");
            Err(ImportError::MappingIncomplete(reason))
        }
    }
}

fn missing_reason(mapping: &ColumnMapping, headers: &[String]) -> Option<String> {
    if mapping.model.trim().is_empty() {
        return Some("未选择型号列".to_string());
    }
    if !headers.iter().any(|h| *h == mapping.model) {
        return Some(format!("型号列不在表头中: {}", mapping.model));
    }
    if mapping.specifications.is_empty() {
        return Some("至少需要选择一个规格列".to_string());
    }
    if !mapping
        .specifications
        .iter()
        .any(|s| headers.iter().any(|h| h == s))
    {
        return Some("所选规格列均不在表头中".to_string());
    }
    None
}
