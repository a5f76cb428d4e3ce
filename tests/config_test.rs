// ==========================================
// 导入配置测试
// ==========================================
// 测试目标: 配置文件 + 环境变量覆写 + 校验
// ==========================================


use catalog_import::config::{config_keys, ImportConfig};
use catalog_import::domain::RawTable;
use catalog_import::importer::{HeaderLocator, ImportError};
use std::collections::HashMap;
use std::path::PathBuf;
use test_helpers::write_file;

#[test]
fn test_partial_file_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "config.json",
        br#"{"engine_program": "python3", "engine_args": ["match.py"], "header_scan_rows": 3}"#,
    );

    let config = ImportConfig::from_file(&path).unwrap();

    assert_eq!(config.engine_program, "python3");
    assert_eq!(config.engine_args, vec!["match.py".to_string()]);
    assert_eq!(config.header_scan_rows, 3);
    assert_eq!(config.engine_timeout_secs, ImportConfig::default().engine_timeout_secs);
    assert!(config.validate().is_ok());
}

#[test]
fn test_malformed_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "config.json", b"{ not json");

    let err = ImportConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, ImportError::Config { .. }));
}

#[test]
fn test_overrides_from_lookup() {
    let vars: HashMap<&str, &str> = [
        (config_keys::ENGINE_PROGRAM, "  node "),
        (config_keys::ENGINE_TIMEOUT_SECS, "45"),
        (config_keys::ARTIFACT_DIR, "/tmp/catalog-artifacts"),
        (config_keys::REMOTE_BASE_URL, ""),
    ]
    .into_iter()
    .collect();

    let mut config = ImportConfig::default();
    let base_url = config.remote_base_url.clone();
    config
        .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
        .unwrap();

    assert_eq!(config.engine_program, "node");
    assert_eq!(config.engine_timeout_secs, 45);
    assert_eq!(config.artifact_dir, PathBuf::from("/tmp/catalog-artifacts"));
    // 空值不覆写
    assert_eq!(config.remote_base_url, base_url);
}

#[test]
fn test_invalid_timeout_override_rejected() {
    let mut config = ImportConfig::default();
    let err = config
        .apply_overrides(|key| {
            (key == config_keys::ENGINE_TIMEOUT_SECS).then(|| "soon".to_string())
        })
        .unwrap_err();
    assert!(matches!(err, ImportError::Config { .. }));
}

#[test]
fn test_validation_rejects_zero_limits() {
    let config = ImportConfig {
        engine_timeout_secs: 0,
        ..ImportConfig::default()
    };
    assert!(config.validate().is_err());

    let config = ImportConfig {
        engine_program: " ".to_string(),
        ..ImportConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_locator_from_config_uses_scan_window() {
    let config = ImportConfig {
        header_scan_rows: 1,
        ..ImportConfig::default()
    };
    let table = RawTable::from_text_rows(vec![
        vec!["Catalog"],
        vec!["Model", "Spec"],
        vec!["X100", "8GB"],
    ]);

    // 只扫描第一行，找不到候选行时回退到 0
    assert_eq!(HeaderLocator::from_config(&config).locate(&table), 0);
    assert_eq!(HeaderLocator::default().locate(&table), 1);
}

// 该测试二进制中唯一修改环境变量的用例
#[test]
fn test_load_reads_file_named_by_env() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "custom.json",
        br#"{"engine_program": "python3", "preview_rows": 25}"#,
    );

    std::env::set_var(config_keys::CONFIG_PATH, &path);
    let loaded = ImportConfig::load();
    std::env::remove_var(config_keys::CONFIG_PATH);

    let config = loaded.unwrap();
    assert_eq!(config.preview_rows, 25);
    assert_eq!(config.engine_program, "python3");
}
