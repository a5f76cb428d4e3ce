// ==========================================
// 竞品目录匹配系统 - 远程表格数据源
// ==========================================
// 流程: 标识提取 → 元数据（表列表） → 读取整表取值区域
// 授权: 会话对象由调用方显式传入，每次调用前检查过期
// 状态映射: 401 → AuthExpired / 403 → PermissionDenied / 404 → NotFound
// ==========================================

use crate::config::ImportConfig;
use crate::domain::job::SourceIdentity;
use crate::domain::table::{CellValue, RawTable};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::source_reader_trait::{LoadedTable, SourceReader, TabInfo};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, info, instrument};

/// 默认远程表格接口地址
pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// 会话有效期（天）
pub const SESSION_DURATION_DAYS: i64 = 7;

// 按顺序匹配，先命中者生效
static ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"/spreadsheets/d/([a-zA-Z0-9_-]+)", r"^([a-zA-Z0-9_-]+)$"]
        .iter()
        .map(|p| Regex::new(p).expect("内置标识正则无效"))
        .collect()
});

/// 从 URL 或裸标识中提取表格 ID
///
/// # 示例
/// - `https://docs.google.com/spreadsheets/d/1AbC-_x/edit#gid=0` → `1AbC-_x`
/// - `1AbC-_x` → `1AbC-_x`
pub fn extract_spreadsheet_id(input: &str) -> ImportResult<String> {
    let input = input.trim();
    ID_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(input))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ImportError::InvalidIdentifier(input.to_string()))
}

// ==========================================
// AuthSession - 授权会话
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Clone)]
pub struct AuthSession {
    access_token: String,
    expires_at: DateTime<Utc>,
    user: Option<UserInfo>,
}

impl AuthSession {
    /// 新会话，有效期 SESSION_DURATION_DAYS 天
    pub fn new(access_token: impl Into<String>, user: Option<UserInfo>) -> Self {
        Self::with_expiry(
            access_token,
            Utc::now() + Duration::days(SESSION_DURATION_DAYS),
            user,
        )
    }

    pub fn with_expiry(
        access_token: impl Into<String>,
        expires_at: DateTime<Utc>,
        user: Option<UserInfo>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
            user,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn user(&self) -> Option<&UserInfo> {
        self.user.as_ref()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// 返回可用的令牌；过期时返回 AuthExpired
    pub fn token(&self) -> ImportResult<&str> {
        if self.access_token.is_empty() || self.is_expired_at(Utc::now()) {
            return Err(ImportError::AuthExpired);
        }
        Ok(&self.access_token)
    }
}

// 令牌不进入日志
impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"****")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

// ==========================================
// 元数据与取值区域
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadsheetMetadata {
    pub id: String,
    pub title: String,
    pub locale: String,
    pub time_zone: String,
    pub tabs: Vec<TabInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeRead {
    pub range: String,
    pub major_dimension: String,
    pub table: RawTable,
    pub row_count: usize,
    pub column_count: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetDto {
    #[serde(default)]
    spreadsheet_id: String,
    #[serde(default)]
    properties: SpreadsheetPropertiesDto,
    #[serde(default)]
    sheets: Vec<SheetDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetPropertiesDto {
    #[serde(default)]
    title: String,
    #[serde(default)]
    locale: String,
    #[serde(default)]
    time_zone: String,
}

#[derive(Debug, Deserialize)]
struct SheetDto {
    properties: SheetPropertiesDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetPropertiesDto {
    #[serde(default)]
    sheet_id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    index: usize,
    #[serde(default)]
    grid_properties: GridPropertiesDto,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridPropertiesDto {
    #[serde(default)]
    row_count: usize,
    #[serde(default)]
    column_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeDto {
    #[serde(default)]
    range: String,
    #[serde(default)]
    major_dimension: Option<String>,
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// 解析元数据响应体
pub fn parse_metadata(body: &str) -> ImportResult<SpreadsheetMetadata> {
    let dto: SpreadsheetDto = serde_json::from_str(body)?;
    let mut tabs: Vec<TabInfo> = dto
        .sheets
        .into_iter()
        .map(|s| TabInfo {
            id: s.properties.sheet_id,
            title: s.properties.title,
            index: s.properties.index,
            row_count: s.properties.grid_properties.row_count,
            column_count: s.properties.grid_properties.column_count,
        })
        .collect();
    tabs.sort_by_key(|t| t.index);

    Ok(SpreadsheetMetadata {
        id: dto.spreadsheet_id,
        title: dto.properties.title,
        locale: dto.properties.locale,
        time_zone: dto.properties.time_zone,
        tabs,
    })
}

/// 解析取值区域响应体；不规则行补齐为 Empty
pub fn parse_value_range(body: &str) -> ImportResult<RangeRead> {
    let dto: ValueRangeDto = serde_json::from_str(body)?;
    let rows: Vec<Vec<CellValue>> = dto
        .values
        .iter()
        .map(|row| row.iter().map(json_cell).collect())
        .collect();
    let table = RawTable::from_rows(rows);

    Ok(RangeRead {
        range: dto.range,
        major_dimension: dto.major_dimension.unwrap_or_else(|| "ROWS".to_string()),
        row_count: table.len(),
        column_count: table.width(),
        table,
    })
}

fn json_cell(value: &serde_json::Value) -> CellValue {
    match value {
        serde_json::Value::Null => CellValue::Null,
        serde_json::Value::String(s) => CellValue::text(s.clone()),
        serde_json::Value::Number(n) => n
            .as_f64()
            .map(CellValue::Number)
            .unwrap_or_else(|| CellValue::text(n.to_string())),
        serde_json::Value::Bool(b) => CellValue::text(b.to_string()),
        other => CellValue::text(other.to_string()),
    }
}

/// 上游 HTTP 状态 → 错误类型
pub fn map_status(status: u16, message: &str) -> ImportError {
    let detail = if message.trim().is_empty() {
        format!("HTTP {}", status)
    } else {
        message.trim().to_string()
    };
    match status {
        401 => ImportError::AuthExpired,
        403 => ImportError::PermissionDenied(detail),
        404 => ImportError::NotFound(detail),
        _ => ImportError::RemoteRequest(format!("HTTP {}: {}", status, detail)),
    }
}

/// 提取上游错误体中的 error.message
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_default()
}

// ==========================================
// RemoteSheetReader - 远程表格读取器
// ==========================================
pub struct RemoteSheetReader {
    client: reqwest::Client,
    base_url: String,
    session: Option<AuthSession>,
    spreadsheet_id: String,
}

impl RemoteSheetReader {
    /// 创建读取器
    ///
    /// # 参数
    /// - config: 导入配置（接口地址、超时）
    /// - session: 授权会话；None 时所有调用返回 NotAuthenticated
    /// - identifier: 表格 URL 或裸 ID
    pub fn new(
        config: &ImportConfig,
        session: Option<AuthSession>,
        identifier: &str,
    ) -> ImportResult<Self> {
        let spreadsheet_id = extract_spreadsheet_id(identifier)?;
        let client = reqwest::Client::builder()
            .timeout(config.remote_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.remote_base_url.trim_end_matches('/').to_string(),
            session,
            spreadsheet_id,
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn token(&self) -> ImportResult<&str> {
        self.session
            .as_ref()
            .ok_or(ImportError::NotAuthenticated)?
            .token()
    }

    async fn get_body(&self, url: &str) -> ImportResult<String> {
        // 先检查会话，过期时不发请求
        let token = self.token()?;

        debug!(url, "GET (Authorization: Bearer ****)");
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = upstream_message(&body);
            error!(status = status.as_u16(), message = %message, "远程表格请求失败");
            return Err(map_status(status.as_u16(), &message));
        }
        Ok(body)
    }

    /// 获取表格元数据（标题与表列表）
    #[instrument(skip(self), fields(spreadsheet_id = %self.spreadsheet_id))]
    pub async fn fetch_metadata(&self) -> ImportResult<SpreadsheetMetadata> {
        let url = format!("{}/{}", self.base_url, self.spreadsheet_id);
        let metadata = parse_metadata(&self.get_body(&url).await?)?;
        info!(title = %metadata.title, tabs = metadata.tabs.len(), "元数据读取完成");
        Ok(metadata)
    }

    /// 读取指定表的完整取值区域；tab 为 None 时读取第一个表
    #[instrument(skip(self), fields(spreadsheet_id = %self.spreadsheet_id))]
    pub async fn read_range(&self, tab: Option<&str>) -> ImportResult<(String, RangeRead)> {
        let tab_title = match tab {
            Some(t) => t.to_string(),
            None => {
                let metadata = self.fetch_metadata().await?;
                let first = metadata
                    .tabs
                    .into_iter()
                    .next()
                    .ok_or_else(|| ImportError::NotFound("表格中没有工作表".to_string()))?;
                debug!(tab = %first.title, "未指定工作表，使用第一个");
                first.title
            }
        };

        let url = format!(
            "{}/{}/values/{}",
            self.base_url,
            self.spreadsheet_id,
            urlencoding::encode(&tab_title)
        );
        let range = parse_value_range(&self.get_body(&url).await?)?;
        info!(tab = %tab_title, rows = range.row_count, "远程表格读取完成");
        Ok((tab_title, range))
    }
}

#[async_trait]
impl SourceReader for RemoteSheetReader {
    async fn list_tabs(&self) -> ImportResult<Vec<TabInfo>> {
        Ok(self.fetch_metadata().await?.tabs)
    }

    async fn read_table(&self, tab: Option<&str>) -> ImportResult<LoadedTable> {
        let (tab_title, range) = self.read_range(tab).await?;
        Ok(LoadedTable {
            title: tab_title.clone(),
            source: SourceIdentity::Remote {
                spreadsheet_id: self.spreadsheet_id.clone(),
                tab_title,
            },
            table: range.table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_id_from_url_and_bare_token() {
        assert_eq!(
            extract_spreadsheet_id(
                "https://docs.google.com/spreadsheets/d/1AbC-_xyz/edit#gid=0"
            )
            .unwrap(),
            "1AbC-_xyz"
        );
        assert_eq!(extract_spreadsheet_id("  1AbC-_xyz  ").unwrap(), "1AbC-_xyz");
    }

    #[test]
    fn test_extract_id_rejects_unknown_input() {
        assert!(matches!(
            extract_spreadsheet_id("https://example.com/files/abc"),
            Err(ImportError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            extract_spreadsheet_id("not an id"),
            Err(ImportError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            extract_spreadsheet_id(""),
            Err(ImportError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_map_status() {
        assert!(matches!(map_status(401, ""), ImportError::AuthExpired));
        assert!(matches!(map_status(403, "no"), ImportError::PermissionDenied(_)));
        assert!(matches!(map_status(404, ""), ImportError::NotFound(_)));
        assert!(matches!(map_status(500, "boom"), ImportError::RemoteRequest(_)));
    }

    #[test]
    fn test_parse_metadata() {
        let body = r#"{
            "spreadsheetId": "abc",
            "properties": {"title": "Catalog", "locale": "es_MX", "timeZone": "America/Mexico_City"},
            "sheets": [
                {"properties": {"sheetId": 7, "title": "Second", "index": 1,
                    "gridProperties": {"rowCount": 10, "columnCount": 4}}},
                {"properties": {"sheetId": 0, "title": "First", "index": 0,
                    "gridProperties": {"rowCount": 1000, "columnCount": 26}}}
            ]
        }"#;
        let metadata = parse_metadata(body).unwrap();

        assert_eq!(metadata.id, "abc");
        assert_eq!(metadata.title, "Catalog");
        assert_eq!(metadata.time_zone, "America/Mexico_City");
        assert_eq!(metadata.tabs[0].title, "First");
        assert_eq!(metadata.tabs[1].id, 7);
        assert_eq!(metadata.tabs[1].column_count, 4);
    }

    #[test]
    fn test_parse_value_range_pads_ragged_rows() {
        let body = r#"{
            "range": "Sheet1!A1:C3",
            "values": [["Model", "RAM", "Storage"], ["X100", 8], ["Y200", null, "1TB"]]
        }"#;
        let range = parse_value_range(body).unwrap();

        assert_eq!(range.major_dimension, "ROWS");
        assert_eq!(range.row_count, 3);
        assert_eq!(range.column_count, 3);
        assert_eq!(range.table.cell(1, 1), Some(&CellValue::Number(8.0)));
        assert_eq!(range.table.cell(1, 2), Some(&CellValue::Empty));
        assert_eq!(range.table.cell(2, 1), Some(&CellValue::Null));
    }

    #[test]
    fn test_parse_value_range_without_values() {
        let range = parse_value_range(r#"{"range": "Empty!A1:Z1000"}"#).unwrap();
        assert!(range.table.is_empty());
        assert_eq!(range.column_count, 0);
    }

    #[test]
    fn test_upstream_message() {
        assert_eq!(
            upstream_message(r#"{"error": {"code": 403, "message": "The caller does not have permission"}}"#),
            "The caller does not have permission"
        );
        assert_eq!(upstream_message("<html>"), "");
    }

    #[test]
    fn test_session_expiry() {
        let expired = AuthSession::with_expiry("tok", Utc::now() - Duration::seconds(1), None);
        assert!(matches!(expired.token(), Err(ImportError::AuthExpired)));

        let fresh = AuthSession::new("tok", None);
        assert_eq!(fresh.token().unwrap(), "tok");
        assert!(!format!("{:?}", fresh).contains("tok\""));
    }

    #[tokio::test]
    async fn test_expired_session_fails_without_request() {
        let config = ImportConfig {
            // 不可达地址，若发出请求会得到 RemoteRequest 而不是 AuthExpired
            remote_base_url: "http://127.0.0.1:9".to_string(),
            ..ImportConfig::default()
        };
        let session = AuthSession::with_expiry("tok", Utc::now() - Duration::hours(1), None);
        let reader = RemoteSheetReader::new(&config, Some(session), "abc123").unwrap();

        assert!(matches!(reader.list_tabs().await, Err(ImportError::AuthExpired)));
        assert!(matches!(
            reader.read_table(Some("Sheet1")).await,
            Err(ImportError::AuthExpired)
        ));
    }

    #[tokio::test]
    async fn test_missing_session_is_not_authenticated() {
        let reader = RemoteSheetReader::new(&ImportConfig::default(), None, "abc123").unwrap();
        assert!(matches!(
            reader.fetch_metadata().await,
            Err(ImportError::NotAuthenticated)
        ));
    }
}
