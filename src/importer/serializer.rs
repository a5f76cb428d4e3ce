// ==========================================
// 竞品目录匹配系统 - 标准记录序列化
// ==========================================
// 输出格式（外部引擎约定，逐字节一致）:
//   第一行: model,specifications
//   之后每条记录一行: <model>,<specifications>
//   字段含逗号、双引号或换行时整体加双引号，内部双引号加倍
//   行分隔符 \n，末尾无换行，UTF-8
// 规则: 列标签只在表头行解析一次；
//       找不到的列不贡献取值（不报错）；
//       型号为空白的行丢弃；行顺序与源表一致
// ==========================================

use crate::domain::mapping::ColumnMapping;
use crate::domain::record::CanonicalRecord;
use crate::domain::table::{HeaderRowIndex, RawTable};
use crate::importer::error::{ImportError, ImportResult};
use std::borrow::Cow;
use tracing::debug;

/// 标准表头行
pub const CANONICAL_HEADER: &str = "model,specifications";

// 已解析到位置的映射
struct ResolvedColumns {
    model: Option<usize>,
    specifications: Vec<Option<usize>>,
}

fn resolve_columns(headers: &[String], mapping: &ColumnMapping) -> ResolvedColumns {
    let position = |label: &str| headers.iter().position(|h| h == label);
    ResolvedColumns {
        model: position(mapping.model.as_str()),
        specifications: mapping
            .specifications
            .iter()
            .map(|label| position(label.as_str()))
            .collect(),
    }
}

/// 生成标准记录（已丢弃型号空白的行）
pub fn build_records(
    table: &RawTable,
    header_row: HeaderRowIndex,
    mapping: &ColumnMapping,
) -> ImportResult<Vec<CanonicalRecord>> {
    let headers = table.header_labels(header_row).ok_or_else(|| {
        ImportError::SerializationFailure(format!(
            "表头行 {} 超出范围（共 {} 行）",
            header_row,
            table.len()
        ))
    })?;
    let columns = resolve_columns(&headers, mapping);

    let data_rows = table.data_rows(header_row);
    let mut records = Vec::with_capacity(data_rows.len());
    for row in data_rows {
        let model = columns
            .model
            .and_then(|idx| row.get(idx))
            .map(|c| c.as_text())
            .unwrap_or(Cow::Borrowed(""));
        if model.trim().is_empty() {
            continue;
        }

        let spec_values: Vec<Cow<'_, str>> = columns
            .specifications
            .iter()
            .filter_map(|idx| idx.and_then(|i| row.get(i)))
            .map(|c| c.as_text())
            .collect();

        records.push(CanonicalRecord::from_parts(
            &model,
            spec_values.iter().map(|v| &**v),
        ));
    }

    debug!(
        data_rows = data_rows.len(),
        records = records.len(),
        "标准记录生成完成"
    );
    Ok(records)
}

/// 按引擎约定转义单个字段
pub fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// 记录编码为引擎输入字节流
pub fn encode(records: &[CanonicalRecord]) -> Vec<u8> {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(CANONICAL_HEADER.to_string());
    for record in records {
        lines.push(format!(
            "{},{}",
            escape_field(&record.model),
            escape_field(&record.specifications)
        ));
    }
    lines.join("\n").into_bytes()
}

/// 原始表 + 表头行 + 映射 → 引擎输入字节流
pub fn serialize(
    table: &RawTable,
    header_row: HeaderRowIndex,
    mapping: &ColumnMapping,
) -> ImportResult<Vec<u8>> {
    let records = build_records(table, header_row, mapping)?;
    Ok(encode(&records))
}
