// ==========================================
// 竞品目录匹配系统 - 命令行入口
// ==========================================
// 用法:
//   catalog-import <file> [--header-row N] [--model COL] [--spec COL]...
//
// 读取本地目录文件，使用建议或指定的表头行与列映射，
// 调用配置中的匹配引擎，并把导入报告以 JSON 输出到 stdout
// ==========================================

use anyhow::{anyhow, Context};
use catalog_import::api::ImportApi;
use catalog_import::config::ImportConfig;
use catalog_import::domain::MappingOverride;
use catalog_import::logging;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const USAGE: &str = "用法: catalog-import <file> [--header-row N] [--model COL] [--spec COL]...";

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    file: PathBuf,
    header_row: Option<usize>,
    model: Option<String>,
    specs: Vec<String>,
}

fn parse_args<I>(args: I) -> anyhow::Result<CliArgs>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = CliArgs::default();
    let mut file = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let mut value_of = |flag: &str| {
            args.next()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("{} 需要一个值\n{}", flag, USAGE))
        };
        match arg.as_str() {
            "--header-row" => {
                let raw = value_of("--header-row")?;
                parsed.header_row = Some(
                    raw.parse::<usize>()
                        .with_context(|| format!("--header-row 不是有效的行号: {}", raw))?,
                );
            }
            "--model" => parsed.model = Some(value_of("--model")?),
            "--spec" => parsed.specs.push(value_of("--spec")?),
            "-h" | "--help" => return Err(anyhow!(USAGE)),
            flag if flag.starts_with("--") => {
                return Err(anyhow!("未知参数: {}\n{}", flag, USAGE));
            }
            _ if file.is_none() => file = Some(PathBuf::from(&arg)),
            _ => return Err(anyhow!("只能指定一个文件\n{}", USAGE)),
        }
    }

    parsed.file = file.ok_or_else(|| anyhow!(USAGE))?;
    Ok(parsed)
}

async fn run(args: CliArgs) -> anyhow::Result<()> {
    let config = ImportConfig::load()?;
    let api = ImportApi::new(config);

    let file_name = file_name_of(&args.file)?;
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("无法读取文件: {}", args.file.display()))?;

    let preview = api.load_local(&file_name, bytes).await?;
    tracing::info!(
        title = %preview.title,
        header_row = preview.header_row,
        total_rows = preview.total_rows,
        "目录已加载"
    );

    if let Some(header_row) = args.header_row {
        api.set_header_row(header_row)?;
    }
    if let Some(model) = args.model {
        api.override_mapping(MappingOverride::Model(model))?;
    }
    if !args.specs.is_empty() {
        api.override_mapping(MappingOverride::Specifications(args.specs))?;
    }

    let status = api.mapping_status()?;
    tracing::info!(
        model = %status.mapping.model,
        specifications = ?status.mapping.specifications,
        valid = status.valid,
        "列映射"
    );

    let report = match api.start_import().await {
        Ok(report) => report,
        Err(err) => {
            if let Some(diagnostics) = err.diagnostics() {
                eprintln!("{}", diagnostics);
            }
            return Err(err.into());
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn file_name_of(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("无效的文件路径: {}", path.display()))
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} - 目录导入", catalog_import::APP_NAME);
    tracing::info!("系统版本: {}", catalog_import::VERSION);
    tracing::info!("==================================================");

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("导入失败: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args_full() {
        let parsed = parse_args(args(&[
            "catalog.xlsx",
            "--header-row",
            "2",
            "--model",
            "SKU",
            "--spec",
            "RAM",
            "--spec",
            "Storage",
        ]))
        .unwrap();

        assert_eq!(parsed.file, PathBuf::from("catalog.xlsx"));
        assert_eq!(parsed.header_row, Some(2));
        assert_eq!(parsed.model.as_deref(), Some("SKU"));
        assert_eq!(parsed.specs, vec!["RAM".to_string(), "Storage".to_string()]);
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(parse_args(args(&[])).is_err());
        assert!(parse_args(args(&["a.csv", "--header-row", "x"])).is_err());
        assert!(parse_args(args(&["a.csv", "--model"])).is_err());
        assert!(parse_args(args(&["a.csv", "--verbose"])).is_err());
        assert!(parse_args(args(&["a.csv", "b.csv"])).is_err());
    }
}
