//! Agent definition loader
//!
//! Load agent definitions from YAML or JSON files, singly or from a directory.

use std::path::{Path, PathBuf};

use super::AgentDefinition;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error in {file}: {error}")]
    Yaml {
        file: String,
        error: serde_yaml::Error,
    },

    #[error("JSON parse error in {file}: {error}")]
    Json {
        file: String,
        error: serde_json::Error,
    },

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),
}

pub struct AgentLoader;

impl AgentLoader {
    /// Load every `.yaml`, `.yml` and `.json` agent in `dir`, sorted by id
    pub fn load_directory(dir: &Path) -> Result<Vec<AgentDefinition>, LoadError> {
        let mut agents = Vec::new();
        for path in Self::agent_files(dir)? {
            agents.push(Self::load_file(&path)?);
        }

        agents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(agents)
    }

    /// Agent files directly inside `dir`, sorted by path
    pub fn agent_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && Self::is_agent_file(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn load_file(path: &Path) -> Result<AgentDefinition, LoadError> {
        let content = std::fs::read_to_string(path)?;
        let file = path.display().to_string();

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|error| LoadError::Yaml { file, error })
            }
            Some("json") => {
                serde_json::from_str(&content).map_err(|error| LoadError::Json { file, error })
            }
            _ => Err(LoadError::UnsupportedFile(file)),
        }
    }

    fn is_agent_file(path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml") | Some("json")
        )
    }
}
