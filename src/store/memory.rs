use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{AgentStore, StoreError};
use crate::engine::result::ExecutionRecord;
use crate::workflow::AgentDefinition;

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    agents: RwLock<HashMap<String, AgentDefinition>>,
    executions: RwLock<HashMap<String, ExecutionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agents(agents: impl IntoIterator<Item = AgentDefinition>) -> Self {
        let agents = agents.into_iter().map(|a| (a.id.clone(), a)).collect();
        Self {
            agents: RwLock::new(agents),
            executions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn add_agent(&self, agent: AgentDefinition) {
        self.agents.write().await.insert(agent.id.clone(), agent);
    }

    /// A saved execution record
    pub async fn execution(&self, id: &str) -> Option<ExecutionRecord> {
        self.executions.read().await.get(id).cloned()
    }

    pub async fn execution_count(&self) -> usize {
        self.executions.read().await.len()
    }
}

#[async_trait]
impl AgentStore for MemoryStore {
    async fn load_agent(&self, id: &str) -> Result<AgentDefinition, StoreError> {
        self.agents
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn save_execution(&self, record: &ExecutionRecord) -> Result<(), StoreError> {
        self.executions
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn list_agents(&self) -> Result<Vec<AgentDefinition>, StoreError> {
        let mut agents: Vec<AgentDefinition> = self.agents.read().await.values().cloned().collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(agents)
    }
}
