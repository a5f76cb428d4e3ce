// ==========================================
// 竞品目录匹配系统 - 数据源读取 Trait
// ==========================================
// 职责: 定义远程表格与本地文件共用的读取接口（不包含实现）
// 能力集: 列出可用表 + 读取指定表
// ==========================================

use crate::domain::job::SourceIdentity;
use crate::domain::table::RawTable;
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ==========================================
// TabInfo - 表（标签页）元信息
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: i64,
    pub title: String,
    pub index: usize,
    pub row_count: usize,
    pub column_count: usize,
}

// ==========================================
// LoadedTable - 读取结果
// ==========================================
#[derive(Debug, Clone)]
pub struct LoadedTable {
    /// 展示标题（远程为表名，本地为文件名）
    pub title: String,
    pub source: SourceIdentity,
    pub table: RawTable,
}

// ==========================================
// SourceReader Trait
// ==========================================
// 实现者: RemoteSheetReader, LocalFileReader
// 编排层只依赖该接口
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// 列出可用的表
    ///
    /// # 返回
    /// - Ok(Vec<TabInfo>): 表列表（按位置排序）
    /// - Err: 授权、权限、不存在或解析错误
    async fn list_tabs(&self) -> ImportResult<Vec<TabInfo>>;

    /// 读取指定表的完整数据
    ///
    /// # 参数
    /// - tab: 表名；None 表示第一个表
    ///
    /// # 返回
    /// - Ok(LoadedTable): 已补齐空单元格的原始表
    /// - Err: 读取或解码错误
    async fn read_table(&self, tab: Option<&str>) -> ImportResult<LoadedTable>;
}
