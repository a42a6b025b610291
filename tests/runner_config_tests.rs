mod common;

use common::*;
use gateway_agents::workflow::{ConfigError, RunnerConfig};
use std::fs;
use std::path::PathBuf;

#[test]
fn test_default_runner_config() {
    let config = RunnerConfig::default();
    assert_eq!(config.history_limit, 256);
    assert_eq!(config.default_model, "gpt-4o-mini");
    assert_eq!(config.agents_dir, PathBuf::from("agents"));
    assert_eq!(config.gateway.timeout, 60000);
    assert!(config.gateway.retry.is_none());
}

#[test]
fn test_load_minimal_config() {
    let dir = create_test_dir();
    let path = dir.path().join("gateway-agents.yaml");
    fs::write(&path, "historyLimit: 8").unwrap();

    let config = RunnerConfig::load_file(&path).unwrap();
    assert_eq!(config.history_limit, 8);
    assert_eq!(config.default_model, "gpt-4o-mini");
}

#[test]
fn test_load_written_config() {
    let dir = create_test_dir();
    let path = write_config(dir.path());

    let config = RunnerConfig::load_file(&path).unwrap();
    assert_eq!(config.agents_dir, dir.path().join("agents"));
    assert_eq!(config.executions_dir, dir.path().join("executions"));
    assert_eq!(config.gateway.resolve_api_key().as_deref(), Some("test-key"));
}

#[test]
fn test_load_full_config() {
    let dir = create_test_dir();
    let path = dir.path().join("gateway-agents.yaml");
    fs::write(
        &path,
        r#"
gateway:
  baseUrl: https://gateway.internal/v1
  apiKeyEnv: TEAM_GATEWAY_KEY
  timeout: 15000
  headers:
    HTTP-Referer: https://example.org
  retry:
    maxAttempts: 4
    initialDelay: 250
    retryOnStatus: [429]
agentsDir: team/agents
executionsDir: team/runs
historyLimit: 32
defaultModel: mistral-small
"#,
    )
    .unwrap();

    let config = RunnerConfig::load_file(&path).unwrap();
    assert_eq!(config.gateway.base_url, "https://gateway.internal/v1");
    assert_eq!(config.gateway.api_key_env, "TEAM_GATEWAY_KEY");
    assert_eq!(config.gateway.timeout, 15000);
    assert_eq!(
        config.gateway.headers.get("HTTP-Referer").map(String::as_str),
        Some("https://example.org")
    );

    let retry = config.gateway.retry.unwrap();
    assert_eq!(retry.max_attempts, 4);
    assert_eq!(retry.initial_delay, 250);
    assert_eq!(retry.retry_on_status, vec![429]);

    assert_eq!(config.agents_dir, PathBuf::from("team/agents"));
    assert_eq!(config.executions_dir, PathBuf::from("team/runs"));
    assert_eq!(config.history_limit, 32);
    assert_eq!(config.default_model, "mistral-small");
}

#[test]
fn test_invalid_config() {
    let dir = create_test_dir();
    let path = dir.path().join("gateway-agents.yaml");
    fs::write(&path, "historyLimit: lots").unwrap();

    let err = RunnerConfig::load_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Yaml { .. }));
    assert!(err.to_string().contains("gateway-agents.yaml"));
}

#[test]
fn test_missing_config_file() {
    let dir = create_test_dir();
    let result = RunnerConfig::load(Some(&dir.path().join("absent.yaml")));
    assert!(matches!(result, Err(ConfigError::Io { .. })));
}
