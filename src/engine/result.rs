//! Execution result types
//!
//! An `ExecutionRecord` is the per-run result of interpreting an agent once.
//! It is created when the run starts, published to the execution table after
//! every step and persisted once at the end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::workflow::{LogLevel, Step};

/// Overall state of an execution
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }
}

/// State of a single step within an execution
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// Result of one step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepExecution {
    pub step_id: String,
    pub step_name: String,
    pub status: StepStatus,

    #[serde(default)]
    pub inputs: Map<String, Value>,

    #[serde(default)]
    pub outputs: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl StepExecution {
    pub fn pending(step: &Step) -> Self {
        Self {
            step_id: step.id.clone(),
            step_name: step.display_name().to_string(),
            status: StepStatus::Pending,
            inputs: Map::new(),
            outputs: Map::new(),
            error: None,
            start_time: None,
            end_time: None,
        }
    }

    // Transitions only move forward: pending -> running -> completed | failed,
    // or pending -> skipped. Anything else is ignored.

    pub fn start(&mut self, inputs: Map<String, Value>) {
        if self.status == StepStatus::Pending {
            self.status = StepStatus::Running;
            self.inputs = inputs;
            self.start_time = Some(Utc::now());
        }
    }

    pub fn complete(&mut self, outputs: Map<String, Value>) {
        if self.status == StepStatus::Running {
            self.status = StepStatus::Completed;
            self.outputs = outputs;
            self.end_time = Some(Utc::now());
        }
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        if self.status == StepStatus::Running {
            self.status = StepStatus::Failed;
            self.error = Some(error.into());
            self.end_time = Some(Utc::now());
        }
    }

    pub fn skip(&mut self) {
        if self.status == StepStatus::Pending {
            self.status = StepStatus::Skipped;
        }
    }

    /// Wall-clock time of a step that ran, in milliseconds
    pub fn duration_ms(&self) -> Option<u64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds().max(0) as u64),
            _ => None,
        }
    }
}

/// One entry of the execution log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Counters and derived figures for one execution
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub total_steps: usize,
    pub completed_steps: usize,
    pub failed_steps: usize,
    pub skipped_steps: usize,
    pub total_tokens_used: u64,
    pub total_cost: f64,
    /// Milliseconds, averaged over steps that ran
    pub average_step_duration: f64,
    /// Completed steps as a percentage of all steps
    pub execution_efficiency: f64,
}

/// The result of interpreting an agent once
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: String,
    pub agent_id: String,
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Milliseconds between start and end
    #[serde(rename = "duration", default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    #[serde(default)]
    pub inputs: HashMap<String, Value>,

    #[serde(default)]
    pub outputs: Map<String, Value>,

    #[serde(default)]
    pub steps: Vec<StepExecution>,

    #[serde(default)]
    pub logs: Vec<LogEntry>,

    #[serde(default)]
    pub metrics: Metrics,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionRecord {
    /// A running record with one pending entry per step, in execution order
    pub fn start(
        id: impl Into<String>,
        agent_id: impl Into<String>,
        inputs: HashMap<String, Value>,
        steps: &[&Step],
    ) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            status: ExecutionStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            duration_ms: None,
            inputs,
            outputs: Map::new(),
            steps: steps.iter().map(|s| StepExecution::pending(s)).collect(),
            logs: Vec::new(),
            metrics: Metrics::default(),
            error: None,
        }
    }

    pub fn step(&self, step_id: &str) -> Option<&StepExecution> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    /// Stamp `end_time` and `duration`
    pub fn stamp_end(&mut self) {
        let end = Utc::now();
        self.duration_ms = Some((end - self.start_time).num_milliseconds().max(0) as u64);
        self.end_time = Some(end);
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }
}
