//! Execution table
//!
//! Bounded in-memory table of live and recent execution records, keyed by
//! execution id. Over capacity, the least recently used terminal record is
//! evicted; running records stay until they finish.

use lru::LruCache;
use tokio::sync::RwLock;
use tracing::debug;

use crate::engine::result::{ExecutionRecord, ExecutionStatus};

pub const DEFAULT_HISTORY_LIMIT: usize = 256;

pub struct ExecutionTable {
    records: RwLock<LruCache<String, ExecutionRecord>>,
    capacity: usize,
}

impl ExecutionTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: RwLock::new(LruCache::unbounded()),
            capacity: capacity.max(1),
        }
    }

    /// Register a new record
    pub async fn insert(&self, record: ExecutionRecord) {
        let mut records = self.records.write().await;
        records.put(record.id.clone(), record);
        self.evict(&mut records);
    }

    /// Replace the stored snapshot of a record and return the status stored.
    ///
    /// A record cancelled through the table stays cancelled, including when
    /// the run publishes its own terminal snapshot afterwards.
    pub async fn publish(&self, record: &ExecutionRecord) -> ExecutionStatus {
        let mut records = self.records.write().await;
        let mut snapshot = record.clone();
        if let Some(existing) = records.peek(&record.id) {
            if existing.status == ExecutionStatus::Cancelled {
                snapshot.status = ExecutionStatus::Cancelled;
                if !record.status.is_terminal() {
                    snapshot.end_time = existing.end_time;
                }
            }
        }
        let status = snapshot.status;
        records.put(snapshot.id.clone(), snapshot);
        self.evict(&mut records);
        status
    }

    pub async fn get(&self, id: &str) -> Option<ExecutionRecord> {
        self.records.write().await.get(id).cloned()
    }

    pub async fn is_cancelled(&self, id: &str) -> bool {
        self.records
            .read()
            .await
            .peek(id)
            .is_some_and(|r| r.status == ExecutionStatus::Cancelled)
    }

    /// Mark a running record cancelled. Returns the record after the call,
    /// or `None` if the id is unknown.
    pub async fn cancel(&self, id: &str) -> Option<ExecutionRecord> {
        let mut records = self.records.write().await;
        let record = records.get_mut(id)?;
        if record.status == ExecutionStatus::Running {
            record.status = ExecutionStatus::Cancelled;
            record.stamp_end();
        }
        Some(record.clone())
    }

    /// Snapshots of every record, most recently used first
    pub async fn records(&self) -> Vec<ExecutionRecord> {
        self.records
            .read()
            .await
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    fn evict(&self, records: &mut LruCache<String, ExecutionRecord>) {
        while records.len() > self.capacity {
            // Iteration runs most recent first
            let victim = records
                .iter()
                .rev()
                .find(|(_, r)| r.status.is_terminal())
                .map(|(id, _)| id.clone());

            match victim {
                Some(id) => {
                    debug!("Evicting execution {} from table", id);
                    records.pop(&id);
                }
                None => break,
            }
        }
    }
}

impl Default for ExecutionTable {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
