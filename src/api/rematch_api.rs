// ==========================================
// 竞品目录匹配系统 - 单产品重新匹配API
// ==========================================
// 职责: 对单个产品重新调用匹配程序，返回备选匹配列表
// 约定: 程序参数 --model --specs <json> --min-score --max-results [--category] [--custom-query]
//       stdout 第一行以 { 或 [ 开头的内容为结果；没有或解析失败时为空列表
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ImportConfig;
use crate::engine::{bounded, parse_structured_output, run_engine_process};
use crate::importer::error::ImportError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, instrument};

fn default_min_score() -> u32 {
    70
}

fn default_max_results() -> u32 {
    5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RematchOptions {
    /// 自定义搜索词
    #[serde(default)]
    pub search_query: Option<String>,
    #[serde(default = "default_min_score")]
    pub min_score: u32,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

impl Default for RematchOptions {
    fn default() -> Self {
        Self {
            search_query: None,
            min_score: default_min_score(),
            max_results: default_max_results(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RematchRequest {
    pub product_id: String,
    pub model: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub specifications: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub options: RematchOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RematchResponse {
    pub product_id: String,
    pub matches: Vec<serde_json::Value>,
    pub message: String,
}

/// 单产品重新匹配API
pub struct RematchApi {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl RematchApi {
    pub fn new(config: &ImportConfig) -> Self {
        Self {
            program: config.rematch_program.clone(),
            args: config.rematch_args.clone(),
            timeout: config.engine_timeout(),
        }
    }

    /// 组装程序参数
    pub fn build_args(&self, request: &RematchRequest) -> Vec<String> {
        let specs = serde_json::Value::Object(request.specifications.clone()).to_string();

        let mut args = self.args.clone();
        args.extend([
            "--model".to_string(),
            request.model.trim().to_string(),
            "--specs".to_string(),
            specs,
            "--min-score".to_string(),
            request.options.min_score.to_string(),
            "--max-results".to_string(),
            request.options.max_results.to_string(),
        ]);

        if let Some(category) = request
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            args.push("--category".to_string());
            args.push(category.to_string());
        }
        if let Some(query) = request
            .options
            .search_query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
        {
            args.push("--custom-query".to_string());
            args.push(query.to_string());
        }
        args
    }

    /// 重新匹配单个产品
    ///
    /// # 返回
    /// - Ok(RematchResponse): 程序成功退出（matches 可能为空）
    /// - Err(InvalidInput): product_id 或 model 为空
    /// - Err(Import(EngineDispatchFailure / EngineTimeout)): 程序失败或超时
    #[instrument(skip(self, request), fields(product_id = %request.product_id))]
    pub async fn rematch(&self, request: &RematchRequest) -> ApiResult<RematchResponse> {
        if request.product_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("缺少 product_id".to_string()));
        }
        if request.model.trim().is_empty() {
            return Err(ApiError::InvalidInput("缺少 model".to_string()));
        }

        let args = self.build_args(request);
        let output = bounded(self.timeout, run_engine_process(&self.program, &args)).await?;
        if !output.success() {
            error!(exit_code = output.exit_code, "重新匹配程序执行失败");
            return Err(ImportError::EngineDispatchFailure {
                message: format!("重新匹配程序退出码 {}", output.exit_code),
                exit_code: Some(output.exit_code),
                stdout: output.stdout,
                stderr: output.stderr,
            }
            .into());
        }

        let matches = collect_matches(parse_structured_output(&output.stdout));
        let message = format!("找到 {} 个备选匹配", matches.len());
        info!(matches = matches.len(), "重新匹配完成");

        Ok(RematchResponse {
            product_id: request.product_id.clone(),
            matches,
            message,
        })
    }
}

// 数组按原样返回，单个对象包装为一个元素
fn collect_matches(value: Option<serde_json::Value>) -> Vec<serde_json::Value> {
    match value {
        Some(serde_json::Value::Array(items)) => items,
        Some(obj @ serde_json::Value::Object(_)) => vec![obj],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> RematchRequest {
        serde_json::from_value(json!({
            "product_id": "p-1",
            "model": " X100 ",
            "specifications": {"ram": "8GB"}
        }))
        .unwrap()
    }

    #[test]
    fn test_request_defaults() {
        let req = request();
        assert_eq!(req.options.min_score, 70);
        assert_eq!(req.options.max_results, 5);
        assert_eq!(req.options.search_query, None);
    }

    #[test]
    fn test_build_args() {
        let api = RematchApi::new(&ImportConfig::default());
        let mut req = request();

        let args = api.build_args(&req);
        assert_eq!(
            args,
            vec![
                "tools/single_product_matcher.py",
                "--model",
                "X100",
                "--specs",
                "{\"ram\":\"8GB\"}",
                "--min-score",
                "70",
                "--max-results",
                "5",
            ]
        );

        req.options.search_query = Some("x100 laptop".to_string());
        req.category = Some("laptops".to_string());
        let args = api.build_args(&req);
        assert_eq!(
            &args[args.len() - 4..],
            ["--category", "laptops", "--custom-query", "x100 laptop"]
        );
    }

    #[test]
    fn test_collect_matches() {
        assert_eq!(collect_matches(Some(json!([{"a": 1}, {"b": 2}]))).len(), 2);
        assert_eq!(collect_matches(Some(json!({"a": 1}))), vec![json!({"a": 1})]);
        assert!(collect_matches(Some(json!(3))).is_empty());
        assert!(collect_matches(None).is_empty());
    }

    #[tokio::test]
    async fn test_missing_fields_rejected() {
        let api = RematchApi::new(&ImportConfig::default());
        let mut req = request();
        req.model = "  ".to_string();
        assert!(matches!(api.rematch(&req).await, Err(ApiError::InvalidInput(_))));

        let mut req = request();
        req.product_id = String::new();
        assert!(matches!(api.rematch(&req).await, Err(ApiError::InvalidInput(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_rematch_parses_program_output() {
        let config = ImportConfig {
            rematch_program: "sh".to_string(),
            rematch_args: vec![
                "-c".to_string(),
                "echo searching; echo '[{\"model\": \"Z1\", \"score\": 88}]'".to_string(),
            ],
            ..ImportConfig::default()
        };
        let response = RematchApi::new(&config).rematch(&request()).await.unwrap();

        assert_eq!(response.matches, vec![json!({"model": "Z1", "score": 88})]);
        assert_eq!(response.message, "找到 1 个备选匹配");
    }
}
