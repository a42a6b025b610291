//! Agent definition and execution record storage
//!
//! - `memory` - in-process store for tests and embedding
//! - `file` - agents from a directory of YAML/JSON files, executions as JSON

use async_trait::async_trait;

use crate::engine::result::ExecutionRecord;
use crate::workflow::{AgentDefinition, LoadError};

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Agent not found: {0}")]
    NotFound(String),

    #[error("Failed to load agents: {0}")]
    Load(#[from] LoadError),

    #[error("Failed to write {path}: {error}")]
    Write { path: String, error: String },

    #[error("Store task failed: {0}")]
    Task(String),
}

/// Where definitions come from and execution records go
#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn load_agent(&self, id: &str) -> Result<AgentDefinition, StoreError>;

    /// Insert or replace the record with the same execution id
    async fn save_execution(&self, record: &ExecutionRecord) -> Result<(), StoreError>;

    async fn list_agents(&self) -> Result<Vec<AgentDefinition>, StoreError>;
}
