// ==========================================
// 竞品目录匹配系统 - 匹配引擎调用
// ==========================================
// 约定: 外部进程以临时文件路径为最后一个位置参数；
//       完整捕获 stdout / stderr；退出码 0 视为成功
// 结构化结果: stdout 中第一行以 { 或 [ 开头的内容按 JSON 解析，
//             没有该行时结果为空（不报错）
// ==========================================

use crate::config::ImportConfig;
use crate::domain::job::EngineOutput;
use crate::importer::error::{ImportError, ImportResult};
use async_trait::async_trait;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

// ==========================================
// EngineDispatcher Trait
// ==========================================
// 实现者: ProcessEngineDispatcher（测试中可替换为模拟实现）
#[async_trait]
pub trait EngineDispatcher: Send + Sync {
    /// 将临时文件交给引擎并等待结果
    ///
    /// # 返回
    /// - Ok(EngineOutput): 退出码为 0
    /// - Err(EngineDispatchFailure): 无法启动或退出码非 0
    async fn dispatch(&self, artifact: &Path) -> ImportResult<EngineOutput>;
}

// ==========================================
// ProcessEngineDispatcher - 子进程实现
// ==========================================
pub struct ProcessEngineDispatcher {
    program: String,
    args: Vec<String>,
}

impl ProcessEngineDispatcher {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        Self::new(config.engine_program.clone(), config.engine_args.clone())
    }
}

#[async_trait]
impl EngineDispatcher for ProcessEngineDispatcher {
    #[instrument(skip(self), fields(program = %self.program))]
    async fn dispatch(&self, artifact: &Path) -> ImportResult<EngineOutput> {
        let mut args = self.args.clone();
        args.push(artifact.to_string_lossy().into_owned());

        let output = run_engine_process(&self.program, &args).await?;
        if output.success() {
            info!(stdout_len = output.stdout.len(), "匹配引擎执行成功");
            Ok(output)
        } else {
            Err(ImportError::EngineDispatchFailure {
                message: format!("引擎退出码 {}", output.exit_code),
                exit_code: Some(output.exit_code),
                stdout: output.stdout,
                stderr: output.stderr,
            })
        }
    }
}

/// 启动引擎进程并收集输出
///
/// 进程无法启动时返回 EngineDispatchFailure（exit_code 为 None）；
/// 非 0 退出码由调用方判断
pub async fn run_engine_process(program: &str, args: &[String]) -> ImportResult<EngineOutput> {
    debug!(program, ?args, "启动引擎进程");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ImportError::EngineDispatchFailure {
            message: format!("无法启动引擎进程 {}: {}", program, e),
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
        })?;

    Ok(EngineOutput {
        // 被信号终止时没有退出码
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// 为引擎调用加上时间上限，超时返回 EngineTimeout
///
/// 超时后 future 被丢弃，kill_on_drop 的子进程随之结束
pub async fn bounded<T, F>(timeout: Duration, fut: F) -> ImportResult<T>
where
    F: Future<Output = ImportResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "匹配引擎超时");
            Err(ImportError::EngineTimeout {
                timeout_secs: timeout.as_secs(),
            })
        }
    }
}

/// 提取 stdout 中的结构化结果
pub fn parse_structured_output(stdout: &str) -> Option<serde_json::Value> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with('{') || l.starts_with('['))?;

    match serde_json::from_str(line) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "引擎结构化输出解析失败");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_structured_output() {
        let stdout = "Loading catalog...\nProcessed 2 products\n  [{\"id\": 1}]\n{\"late\": true}\n";
        assert_eq!(parse_structured_output(stdout), Some(json!([{"id": 1}])));

        assert_eq!(
            parse_structured_output("{\"matches\": []}"),
            Some(json!({"matches": []}))
        );
        assert_eq!(parse_structured_output("done\n"), None);
        assert_eq!(parse_structured_output("{broken"), None);
    }

    #[tokio::test]
    async fn test_bounded_timeout() {
        let result: ImportResult<()> = bounded(Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ImportError::EngineTimeout { .. })));

        let result = bounded(Duration::from_secs(5), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_spawn_failure_has_no_exit_code() {
        let dispatcher = ProcessEngineDispatcher::new("/nonexistent/catalog-engine", Vec::new());
        let err = dispatcher.dispatch(Path::new("x.csv")).await.unwrap_err();
        assert!(matches!(
            err,
            ImportError::EngineDispatchFailure {
                exit_code: None,
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_artifact_path_is_last_argument() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.csv");
        std::fs::write(&path, "model,specifications\nX100,8GB").unwrap();

        // sh -c 脚本中追加的参数即 $0
        let dispatcher =
            ProcessEngineDispatcher::new("sh", vec!["-c".to_string(), "cat \"$0\"".to_string()]);
        let output = dispatcher.dispatch(&path).await.unwrap();

        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout, "model,specifications\nX100,8GB");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_keeps_diagnostics() {
        let dispatcher = ProcessEngineDispatcher::new(
            "sh",
            vec!["-c".to_string(), "echo partial; echo boom >&2; exit 3".to_string()],
        );
        let err = dispatcher.dispatch(Path::new("x.csv")).await.unwrap_err();

        match err {
            ImportError::EngineDispatchFailure {
                exit_code,
                stdout,
                stderr,
                ..
            } => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(stdout.trim(), "partial");
                assert_eq!(stderr.trim(), "boom");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
