// ==========================================
// 竞品目录匹配系统 - 表头行定位
// ==========================================
// 规则: 仅扫描前 N 行（默认 5）；
//       候选行 = 至少 2 个非空单元格，且平均字符数低于阈值；
//       取第一个候选，找不到时返回 0
// 结果只是建议值，调用方可覆写
// ==========================================

use crate::config::ImportConfig;
use crate::domain::table::{CellValue, HeaderRowIndex, RawTable};
use tracing::debug;

/// 默认扫描行数
pub const DEFAULT_SCAN_ROWS: usize = 5;

/// 默认平均字符数阈值（标签一般较短，标题/说明行较长）
pub const DEFAULT_MAX_AVG_LEN: usize = 35;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLocator {
    scan_rows: usize,
    max_avg_len: usize,
}

impl Default for HeaderLocator {
    fn default() -> Self {
        Self {
            scan_rows: DEFAULT_SCAN_ROWS,
            max_avg_len: DEFAULT_MAX_AVG_LEN,
        }
    }
}

impl HeaderLocator {
    pub fn new(scan_rows: usize, max_avg_len: usize) -> Self {
        Self {
            scan_rows,
            max_avg_len,
        }
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        Self::new(config.header_scan_rows, config.header_max_avg_len)
    }

    /// 定位最可能的表头行
    pub fn locate(&self, table: &RawTable) -> HeaderRowIndex {
        let found = table
            .rows()
            .iter()
            .take(self.scan_rows)
            .position(|row| self.is_candidate(row));

        debug!(
            header_row = ?found,
            scanned = table.len().min(self.scan_rows),
            "表头行定位"
        );
        found.unwrap_or(0)
    }

    fn is_candidate(&self, row: &[CellValue]) -> bool {
        let lengths: Vec<usize> = row
            .iter()
            .filter(|c| !c.is_blank())
            .map(|c| c.as_text().trim().chars().count())
            .collect();

        if lengths.len() < 2 {
            return false;
        }
        let total: usize = lengths.iter().sum();
        // 平均值 < 阈值，整数比较避免浮点
        total < self.max_avg_len * lengths.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_title_banner() {
        let table = RawTable::from_text_rows(vec![
            vec!["Product Catalog"],
            vec!["Model", "Spec A", "Spec B"],
            vec!["X100", "8GB", "Fast"],
        ]);
        assert_eq!(HeaderLocator::default().locate(&table), 1);
    }

    #[test]
    fn test_long_description_rows_are_not_headers() {
        let long = "This catalog lists every product we shipped during the last fiscal year";
        let table = RawTable::from_text_rows(vec![
            vec![long, long],
            vec!["", ""],
            vec!["SKU", "Descripción"],
        ]);
        assert_eq!(HeaderLocator::default().locate(&table), 2);
    }

    #[test]
    fn test_defaults_to_zero() {
        let table = RawTable::from_text_rows(vec![vec!["only"], vec!["single"], vec!["cells"]]);
        assert_eq!(HeaderLocator::default().locate(&table), 0);
        assert_eq!(HeaderLocator::default().locate(&RawTable::default()), 0);
    }

    #[test]
    fn test_scan_window_is_bounded() {
        let mut rows: Vec<Vec<&str>> = vec![vec!["banner"]; 5];
        rows.push(vec!["Model", "Spec"]);
        let table = RawTable::from_text_rows(rows);

        assert_eq!(HeaderLocator::default().locate(&table), 0);
        assert_eq!(HeaderLocator::new(6, 35).locate(&table), 5);
    }

    #[test]
    fn test_numeric_cells_count_as_text() {
        let table = RawTable::from_rows(vec![vec![
            CellValue::Number(2024.0),
            CellValue::text("Model"),
        ]]);
        assert_eq!(HeaderLocator::default().locate(&table), 0);
    }
}
