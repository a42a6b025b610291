//! Runner configuration
//!
//! Configuration for the CLI and executor, loaded from `gateway-agents.yaml`.
//! Every field has a default, so the file is optional:
//!
//! ```yaml
//! gateway:
//!   baseUrl: https://gateway.example.com/v1
//!   apiKeyEnv: GATEWAY_API_KEY
//!   timeout: 60000
//!   retry:
//!     maxAttempts: 3
//!
//! agentsDir: agents
//! executionsDir: .gateway-agents/executions
//! historyLimit: 256
//! defaultModel: gpt-4o-mini
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::gateway::GatewayConfig;

/// File name looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "gateway-agents.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {file}: {error}")]
    Io {
        file: String,
        error: std::io::Error,
    },

    #[error("YAML parse error in {file}: {error}")]
    Yaml {
        file: String,
        error: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Directory of agent definition files
    #[serde(default = "default_agents_dir")]
    pub agents_dir: PathBuf,

    /// Directory execution records are written to
    #[serde(default = "default_executions_dir")]
    pub executions_dir: PathBuf,

    /// Number of execution records kept in memory
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Model used by `prompt` when none is given
    #[serde(default = "default_model")]
    pub default_model: String,
}

fn default_agents_dir() -> PathBuf {
    PathBuf::from("agents")
}

fn default_executions_dir() -> PathBuf {
    PathBuf::from(".gateway-agents/executions")
}

fn default_history_limit() -> usize {
    256
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            agents_dir: default_agents_dir(),
            executions_dir: default_executions_dir(),
            history_limit: default_history_limit(),
            default_model: default_model(),
        }
    }
}

impl RunnerConfig {
    /// Parse a config from YAML text
    pub fn from_yaml(yaml: &str, file: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|error| ConfigError::Yaml {
            file: file.to_string(),
            error,
        })
    }

    /// Load a config file
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let file = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
            file: file.clone(),
            error,
        })?;
        Self::from_yaml(&content, &file)
    }

    /// Load `path` if given, else `gateway-agents.yaml` when present, else
    /// defaults; environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::load_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply `GATEWAY_BASE_URL` over the configured base URL
    pub fn apply_env(&mut self) {
        if let Ok(base_url) = std::env::var("GATEWAY_BASE_URL") {
            if !base_url.is_empty() {
                self.gateway.base_url = base_url;
            }
        }
    }
}
