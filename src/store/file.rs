//! File-backed store
//!
//! Agents are read from a directory of YAML/JSON definitions on every lookup,
//! so edits are picked up without a restart. Files that do not parse are
//! skipped with a warning, unless the file is named after the requested id.
//! Execution records are written as pretty JSON to `<executions_dir>/<id>.json`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{AgentStore, StoreError};
use crate::engine::result::ExecutionRecord;
use crate::workflow::{AgentDefinition, AgentLoader};

pub struct FileStore {
    agents_dir: PathBuf,
    executions_dir: PathBuf,
}

impl FileStore {
    pub fn new(agents_dir: impl Into<PathBuf>, executions_dir: impl Into<PathBuf>) -> Self {
        Self {
            agents_dir: agents_dir.into(),
            executions_dir: executions_dir.into(),
        }
    }

    pub fn agents_dir(&self) -> &Path {
        &self.agents_dir
    }

    /// Path a record with `id` is written to
    pub fn execution_path(&self, id: &str) -> PathBuf {
        self.executions_dir.join(format!("{}.json", id))
    }

    /// Scan `dir` for agents. With `wanted`, stop at the first agent with that
    /// id and fail if the file named after it is broken.
    fn scan(dir: &Path, wanted: Option<&str>) -> Result<Vec<AgentDefinition>, StoreError> {
        let mut agents = Vec::new();

        for path in AgentLoader::agent_files(dir)? {
            match AgentLoader::load_file(&path) {
                Ok(agent) => {
                    if wanted == Some(agent.id.as_str()) {
                        return Ok(vec![agent]);
                    }
                    agents.push(agent);
                }
                Err(e) => {
                    let stem = path.file_stem().and_then(|s| s.to_str());
                    if wanted.is_some() && stem == wanted {
                        return Err(e.into());
                    }
                    warn!("Skipping agent file {}: {}", path.display(), e);
                }
            }
        }

        if wanted.is_some() {
            return Ok(Vec::new());
        }
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(agents)
    }

    async fn scan_blocking(&self, wanted: Option<&str>) -> Result<Vec<AgentDefinition>, StoreError> {
        let dir = self.agents_dir.clone();
        let wanted = wanted.map(String::from);
        tokio::task::spawn_blocking(move || Self::scan(&dir, wanted.as_deref()))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    fn write_error(path: &Path, error: impl ToString) -> StoreError {
        StoreError::Write {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}

#[async_trait]
impl AgentStore for FileStore {
    async fn load_agent(&self, id: &str) -> Result<AgentDefinition, StoreError> {
        if !self.agents_dir.is_dir() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.scan_blocking(Some(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn save_execution(&self, record: &ExecutionRecord) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.executions_dir)
            .await
            .map_err(|e| Self::write_error(&self.executions_dir, e))?;

        let path = self.execution_path(&record.id);
        let json = serde_json::to_string_pretty(record).map_err(|e| Self::write_error(&path, e))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| Self::write_error(&path, e))?;

        debug!("Saved execution {} to {}", record.id, path.display());
        Ok(())
    }

    async fn list_agents(&self) -> Result<Vec<AgentDefinition>, StoreError> {
        if !self.agents_dir.is_dir() {
            return Ok(Vec::new());
        }
        self.scan_blocking(None).await
    }
}
