// ==========================================
// 竞品目录匹配系统 - 本地文件解析器
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 输出: 按位置排列的原始表（不假设表头行）
// 规则: 整行空白的行在返回前删除；
//       工作簿只读取第一个工作表
// ==========================================

use crate::domain::job::SourceIdentity;
use crate::domain::table::{CellValue, RawTable};
use crate::domain::types::FileFormat;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::source_reader_trait::{LoadedTable, SourceReader, TabInfo};
use async_trait::async_trait;
use calamine::{Data, DataType, Range, Reader, Xls, Xlsx};
use chrono::{NaiveDateTime, Timelike};
use csv::ReaderBuilder;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use tracing::{debug, info, instrument};

/// 解码结果: (表标题, 原始表)
pub type DecodedTable = (String, RawTable);

// ==========================================
// TableDecoder Trait
// ==========================================
pub trait TableDecoder: Send + Sync {
    /// 将文件字节解码为原始表
    fn decode(&self, bytes: &[u8]) -> ImportResult<DecodedTable>;
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl TableDecoder for CsvParser {
    fn decode(&self, bytes: &[u8]) -> ImportResult<DecodedTable> {
        // 去掉 UTF-8 BOM
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_reader(bytes);

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(CellValue::text).collect());
        }

        let mut table = RawTable::from_rows(rows);
        let dropped = table.drop_blank_rows();
        debug!(rows = table.len(), dropped, "CSV 解码完成");

        Ok((String::new(), table))
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser {
    format: FileFormat,
}

impl ExcelParser {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }
}

impl TableDecoder for ExcelParser {
    fn decode(&self, bytes: &[u8]) -> ImportResult<DecodedTable> {
        let cursor = Cursor::new(bytes.to_vec());
        match self.format {
            FileFormat::Xlsx => {
                let workbook: Xlsx<_> = Xlsx::new(cursor)
                    .map_err(|e| ImportError::ParseFailure(format!("xlsx: {}", e)))?;
                read_first_sheet::<Cursor<Vec<u8>>, _>(workbook)
            }
            FileFormat::Xls => {
                let workbook: Xls<_> = Xls::new(cursor)
                    .map_err(|e| ImportError::ParseFailure(format!("xls: {}", e)))?;
                read_first_sheet::<Cursor<Vec<u8>>, _>(workbook)
            }
            FileFormat::Csv => Err(ImportError::UnsupportedFormat(self.format.to_string())),
        }
    }
}

/// 读取工作簿第一个工作表
fn read_first_sheet<RS, R>(mut workbook: R) -> ImportResult<DecodedTable>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: std::fmt::Display,
{
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ImportError::ParseFailure("工作簿中没有工作表".to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::ParseFailure("工作簿中没有工作表".to_string()))?
        .map_err(|e| ImportError::ParseFailure(format!("{}: {}", sheet_name, e)))?;

    let mut table = range_to_table(&range);
    let dropped = table.drop_blank_rows();
    debug!(sheet = %sheet_name, rows = table.len(), dropped, "工作表解码完成");

    Ok((sheet_name, table))
}

/// 区域转原始表；区域不从 A 列开始时在左侧补空列，保持列位置
fn range_to_table(range: &Range<Data>) -> RawTable {
    let col_offset = range.start().map(|(_, col)| col as usize).unwrap_or(0);

    let rows = range
        .rows()
        .map(|cells| {
            let mut row = vec![CellValue::Empty; col_offset];
            row.extend(cells.iter().map(cell_value));
            row
        })
        .collect();

    RawTable::from_rows(rows)
}

/// 单元格统一转为字符串表示，空单元格保留为 Empty
fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) | Data::DateTimeIso(s) => CellValue::text(s.clone()),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) => CellValue::text(format_datetime(dt)),
            None => CellValue::text(cell.to_string()),
        },
        other => CellValue::text(other.to_string()),
    }
}

/// 日期单元格输出 ISO 格式；零点只保留日期部分
fn format_datetime(dt: NaiveDateTime) -> String {
    if dt.num_seconds_from_midnight() == 0 {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    /// 校验文件名扩展名，不支持的格式在解析前拒绝
    pub fn detect_format(file_name: &str) -> ImportResult<FileFormat> {
        let ext = FileFormat::extension_of(file_name);
        FileFormat::from_extension(&ext).ok_or_else(|| {
            ImportError::UnsupportedFormat(if ext.is_empty() {
                file_name.to_string()
            } else {
                format!(".{}", ext)
            })
        })
    }

    pub fn decoder_for(format: FileFormat) -> Box<dyn TableDecoder> {
        match format {
            FileFormat::Csv => Box::new(CsvParser),
            FileFormat::Xlsx | FileFormat::Xls => Box::new(ExcelParser::new(format)),
        }
    }

    pub fn parse(&self, file_name: &str, bytes: &[u8]) -> ImportResult<DecodedTable> {
        let format = Self::detect_format(file_name)?;
        Self::decoder_for(format).decode(bytes)
    }
}

// ==========================================
// LocalFileReader - 本地文件数据源
// ==========================================
pub struct LocalFileReader {
    file_name: String,
    format: FileFormat,
    bytes: Vec<u8>,
}

impl LocalFileReader {
    /// 由上传的文件名与字节创建
    ///
    /// 扩展名不在 .csv/.xlsx/.xls 内时立即返回 UnsupportedFormat
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> ImportResult<Self> {
        let file_name = file_name.into();
        let format = UniversalFileParser::detect_format(&file_name)?;
        Ok(Self {
            file_name,
            format,
            bytes,
        })
    }

    /// 从磁盘读取
    pub async fn from_path<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        // 先校验扩展名，再读文件
        UniversalFileParser::detect_format(&file_name)?;
        let bytes = tokio::fs::read(path).await?;
        Self::new(file_name, bytes)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    fn decode(&self) -> ImportResult<DecodedTable> {
        let (sheet, table) = UniversalFileParser::decoder_for(self.format).decode(&self.bytes)?;
        let title = if sheet.is_empty() {
            self.file_name.clone()
        } else {
            sheet
        };
        Ok((title, table))
    }
}

#[async_trait]
impl SourceReader for LocalFileReader {
    async fn list_tabs(&self) -> ImportResult<Vec<TabInfo>> {
        let (title, table) = self.decode()?;
        Ok(vec![TabInfo {
            id: 0,
            title,
            index: 0,
            row_count: table.len(),
            column_count: table.width(),
        }])
    }

    #[instrument(skip(self), fields(file = %self.file_name))]
    async fn read_table(&self, tab: Option<&str>) -> ImportResult<LoadedTable> {
        if let Some(tab) = tab {
            debug!(tab, "本地文件只读取第一个表，忽略 tab 参数");
        }

        let (_, table) = self.decode()?;
        info!(
            format = %self.format,
            rows = table.len(),
            columns = table.width(),
            "本地文件读取完成"
        );

        Ok(LoadedTable {
            title: self.file_name.clone(),
            source: SourceIdentity::Local {
                file_name: self.file_name.clone(),
            },
            table,
        })
    }
}
