// ==========================================
// 竞品目录匹配系统 - 表格预览
// ==========================================
// 职责: 为调用方生成表头 + 前 N 行数据的只读视图
// ==========================================

use crate::domain::mapping::ColumnMapping;
use crate::domain::table::{HeaderRowIndex, RawTable};
use serde::{Deserialize, Serialize};

/// 表格风格的列名: 0 → A, 25 → Z, 26 → AA
pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewColumn {
    pub index: usize,
    pub letter: String,
    pub label: String,
    pub is_model: bool,
    pub is_specification: bool,
}

// ==========================================
// TablePreview - 预览视图
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePreview {
    pub title: String,
    pub header_row: HeaderRowIndex,
    pub columns: Vec<PreviewColumn>,
    pub rows: Vec<Vec<String>>,
    /// 表头行之后的数据行总数
    pub total_rows: usize,
    pub has_more: bool,
}

impl TablePreview {
    /// 构建预览
    ///
    /// # 参数
    /// - table: 原始表
    /// - header_row: 表头行（超出范围时列为空）
    /// - mapping: 当前映射，用于标记列
    /// - limit: 预览数据行数上限
    pub fn build(
        title: &str,
        table: &RawTable,
        header_row: HeaderRowIndex,
        mapping: &ColumnMapping,
        limit: usize,
    ) -> Self {
        let labels = table.header_labels(header_row).unwrap_or_default();
        let columns = labels
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                let is_model = !raw.is_empty() && raw == mapping.model;
                let is_specification = !raw.is_empty() && mapping.specifications.contains(&raw);
                let label = if raw.trim().is_empty() {
                    format!("Column {}", index + 1)
                } else {
                    raw
                };
                PreviewColumn {
                    index,
                    letter: column_letter(index),
                    label,
                    is_model,
                    is_specification,
                }
            })
            .collect();

        let data_rows = table.data_rows(header_row);
        let rows = data_rows
            .iter()
            .take(limit)
            .map(|row| row.iter().map(|c| c.as_text().into_owned()).collect())
            .collect();

        Self {
            title: title.to_string(),
            header_row,
            columns,
            rows,
            total_rows: data_rows.len(),
            has_more: data_rows.len() > limit,
        }
    }
}
