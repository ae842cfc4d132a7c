//! 声明式配置测试

use flare_grpc_logger::{ConfigError, Level, LoggerConfig, Options};
use std::path::PathBuf;
use tonic::Code;

const SAMPLE: &str = r#"
[fields]
app = "gateway"

[methods."/pkg.Svc/Ping"]
team = "core"
app = "ping-gateway"

[levels]
Unavailable = "error"
NOT_FOUND = "debug"
"#;

#[test]
fn parses_all_sections() {
    let config = LoggerConfig::from_toml_str(SAMPLE).unwrap();

    assert_eq!(config.fields.get("app").map(String::as_str), Some("gateway"));
    assert_eq!(
        config
            .methods
            .get("/pkg.Svc/Ping")
            .and_then(|m| m.get("team"))
            .map(String::as_str),
        Some("core")
    );
    assert_eq!(config.levels.get("Unavailable"), Some(&Level::Error));
    assert_eq!(config.levels.get("NOT_FOUND"), Some(&Level::Debug));
}

#[test]
fn empty_config_produces_no_options() {
    let config = LoggerConfig::from_toml_str("").unwrap();
    assert!(config.into_options().unwrap().is_empty());
}

#[test]
fn compiled_options_apply_fields_and_levels() {
    let options = Options::evaluate(LoggerConfig::from_toml_str(SAMPLE).unwrap().into_options().unwrap());

    let ping = options.context_for("/pkg.Svc/Ping").unwrap();
    assert_eq!(ping.get("team").and_then(|v| v.as_str()), Some("core"));
    assert_eq!(ping.get("app").and_then(|v| v.as_str()), Some("ping-gateway"));

    let other = options.context_for("/pkg.Svc/Other").unwrap();
    assert_eq!(other.get("app").and_then(|v| v.as_str()), Some("gateway"));
    assert!(!other.contains_key("team"));

    assert_eq!(options.level_for(Code::Unavailable), Level::Error);
    assert_eq!(options.level_for(Code::NotFound), Level::Debug);
    // 未覆盖的状态码保持默认映射
    assert_eq!(options.level_for(Code::InvalidArgument), Level::Notice);
}

#[test]
fn method_fields_alone_seed_only_that_method() {
    let config = LoggerConfig::from_toml_str(
        r#"
[methods."/pkg.Svc/Ping"]
team = "core"
"#,
    )
    .unwrap();
    let options = Options::evaluate(config.into_options().unwrap());

    assert!(options.context_for("/pkg.Svc/Ping").is_some());
    assert!(options.context_for("/pkg.Svc/Other").is_none());
}

#[test]
fn unknown_code_name_is_rejected() {
    let config = LoggerConfig::from_toml_str(
        r#"
[levels]
Sideways = "error"
"#,
    )
    .unwrap();

    match config.into_options() {
        Err(ConfigError::UnknownCode(name)) => assert_eq!(name, "Sideways"),
        other => panic!("unexpected result: {:?}", other.map(|o| o.len())),
    }
}

#[test]
fn invalid_level_is_a_parse_error() {
    let err = LoggerConfig::from_toml_str(
        r#"
[levels]
Unavailable = "loud"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn load_from_file_reads_and_reports_missing_files() {
    let path = temp_path("grpc-logger.toml");
    std::fs::write(&path, SAMPLE).unwrap();
    let config = LoggerConfig::load_from_file(&path).unwrap();
    assert_eq!(config.fields.len(), 1);
    std::fs::remove_file(&path).unwrap();

    let err = LoggerConfig::load_from_file(&path).unwrap_err();
    match err {
        ConfigError::Io { path: reported, .. } => assert!(reported.ends_with("grpc-logger.toml")),
        other => panic!("unexpected error: {}", other),
    }
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}-{}", std::process::id(), name))
}
