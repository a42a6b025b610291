//! API key store
//!
//! Named API keys and tool credentials kept in a YAML map, by default at
//! `<config dir>/gateway-agents/keys.yaml`. `GATEWAY_AGENTS_KEYS_FILE`
//! overrides the location. Entries are passed to runs as credentials.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::tools::Credentials;

/// Environment variable naming an alternative keys file
pub const KEYS_FILE_ENV: &str = "GATEWAY_AGENTS_KEYS_FILE";

/// Key under which the gateway API key is stored
pub const GATEWAY_KEY: &str = "gateway";

#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("Could not determine the user config directory")]
    NoConfigDir,

    #[error("IO error on {file}: {error}")]
    Io {
        file: String,
        error: std::io::Error,
    },

    #[error("Invalid keys file {file}: {error}")]
    Yaml {
        file: String,
        error: serde_yaml::Error,
    },
}

#[derive(Debug)]
pub struct KeyStore {
    path: PathBuf,
    keys: BTreeMap<String, String>,
}

impl KeyStore {
    /// Open the store at its default location
    pub fn open_default() -> Result<Self, KeyStoreError> {
        let path = std::env::var(KEYS_FILE_ENV)
            .map(PathBuf::from)
            .or_else(|_| {
                dirs::config_dir()
                    .map(|d| d.join("gateway-agents").join("keys.yaml"))
                    .ok_or(KeyStoreError::NoConfigDir)
            })?;
        Self::open(path)
    }

    /// Open the store at `path`; a missing file is an empty store
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, KeyStoreError> {
        let path = path.into();
        let file = path.display().to_string();

        let keys = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_yaml::from_str(&content)
                .map_err(|error| KeyStoreError::Yaml { file, error })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(error) => return Err(KeyStoreError::Io { file, error }),
        };

        Ok(Self { path, keys })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.keys.get(name).map(String::as_str)
    }

    /// Store a key and write the file
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), KeyStoreError> {
        self.keys.insert(name.to_string(), value.to_string());
        self.save()
    }

    /// Remove a key and write the file. Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> Result<bool, KeyStoreError> {
        let existed = self.keys.remove(name).is_some();
        if existed {
            self.save()?;
        }
        Ok(existed)
    }

    /// Key names, sorted
    pub fn list(&self) -> Vec<&str> {
        self.keys.keys().map(String::as_str).collect()
    }

    /// All entries as run credentials
    pub fn credentials(&self) -> Credentials {
        self.keys
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn save(&self) -> Result<(), KeyStoreError> {
        let file = self.path.display().to_string();
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| KeyStoreError::Io {
                file: file.clone(),
                error,
            })?;
        }
        let yaml = serde_yaml::to_string(&self.keys).map_err(|error| KeyStoreError::Yaml {
            file: file.clone(),
            error,
        })?;
        std::fs::write(&self.path, yaml).map_err(|error| KeyStoreError::Io { file, error })
    }
}

/// Mask a secret for display, keeping the last four characters
pub fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}
