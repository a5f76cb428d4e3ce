// ==========================================
// 竞品目录匹配系统 - 原始表格
// ==========================================
// 职责: 数据源读取结果的统一二维结构
// 约束: 所有读取器必须把缺失单元格补齐为 Empty，
//       不允许出现破坏列位置的"空洞"
// ==========================================

use std::borrow::Cow;
use std::fmt;

/// 表头行索引（从 0 开始）
pub type HeaderRowIndex = usize;

// ==========================================
// CellValue - 单元格值
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Empty, // 受控空值标记
    Null,  // 远程接口显式返回的 null
}

impl CellValue {
    /// 由字符串构造；空字符串归一为 Empty
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value)
        }
    }

    /// 单元格的文本表示（Empty / Null 为空串）
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Text(s) => Cow::Borrowed(s.as_str()),
            CellValue::Number(n) => Cow::Owned(n.to_string()),
            CellValue::Empty | CellValue::Null => Cow::Borrowed(""),
        }
    }

    /// 去除首尾空白后是否为空
    pub fn is_blank(&self) -> bool {
        self.as_text().trim().is_empty()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::text(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

// ==========================================
// RawTable - 原始二维表
// ==========================================
// 行按读取顺序排列；在确定表头行之前没有任何行具有特殊地位
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// 由行构造，短行以 Empty 补齐到最大列数
    pub fn from_rows(mut rows: Vec<Vec<CellValue>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            if row.len() < width {
                row.resize(width, CellValue::Empty);
            }
        }
        Self { rows }
    }

    /// 由字符串行构造（测试与 CSV 读取常用）
    pub fn from_text_rows<S: Into<String>>(rows: Vec<Vec<S>>) -> Self {
        Self::from_rows(
            rows.into_iter()
                .map(|row| row.into_iter().map(CellValue::text).collect())
                .collect(),
        )
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 列数（补齐后各行一致）
    pub fn width(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    pub fn row(&self, index: usize) -> Option<&[CellValue]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// 指定行作为表头时的列标签
    ///
    /// 行不存在时返回 None
    pub fn header_labels(&self, header_row: HeaderRowIndex) -> Option<Vec<String>> {
        self.row(header_row)
            .map(|cells| cells.iter().map(|c| c.as_text().into_owned()).collect())
    }

    /// 表头行之后的数据行
    pub fn data_rows(&self, header_row: HeaderRowIndex) -> &[Vec<CellValue>] {
        let start = header_row.saturating_add(1).min(self.rows.len());
        &self.rows[start..]
    }

    /// 表头行之后的数据行数
    pub fn data_row_count(&self, header_row: HeaderRowIndex) -> usize {
        self.data_rows(header_row).len()
    }

    /// 删除整行空白的行，返回删除数量
    pub fn drop_blank_rows(&mut self) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| row.iter().any(|c| !c.is_blank()));
        before - self.rows.len()
    }
}
