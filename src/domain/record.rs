// ==========================================
// 竞品目录匹配系统 - 标准记录
// ==========================================
// 每个数据行派生出 (model, specifications) 两个字段，
// 交给外部匹配引擎
// ==========================================

use serde::{Deserialize, Serialize};

/// 多个规格列取值之间的固定分隔符
pub const SPEC_DELIMITER: &str = " | ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// 型号（必填，空白行已在生成时丢弃）
    pub model: String,
    /// 规格拼接串（跳过空白取值）
    pub specifications: String,
}

impl CanonicalRecord {
    /// 由型号和若干规格取值构造；空白取值不参与拼接
    pub fn from_parts<'a, I>(model: &str, spec_values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let specifications = spec_values
            .into_iter()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join(SPEC_DELIMITER);

        Self {
            model: model.trim().to_string(),
            specifications,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_spec_values_are_elided() {
        let record = CanonicalRecord::from_parts("Y200", ["", "1TB"]);
        assert_eq!(record.model, "Y200");
        assert_eq!(record.specifications, "1TB");

        let record = CanonicalRecord::from_parts(" X100 ", ["8GB", "  ", "256GB"]);
        assert_eq!(record.model, "X100");
        assert_eq!(record.specifications, "8GB | 256GB");
    }
}
