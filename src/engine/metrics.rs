//! Metrics and log aggregation for one execution
//!
//! Collects execution log entries at or above the agent's log level, mirrors
//! every entry to `tracing`, keeps running token and cost totals, and derives
//! the final `Metrics` from the step records.

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::engine::result::{ExecutionRecord, LogEntry, Metrics, StepExecution, StepStatus};
use crate::gateway::TokenUsage;
use crate::workflow::LogLevel;

#[derive(Debug)]
pub struct MetricsAggregator {
    threshold: LogLevel,
    pending: Vec<LogEntry>,
    tokens: u64,
    cost: f64,
}

impl MetricsAggregator {
    pub fn new(threshold: LogLevel) -> Self {
        Self {
            threshold,
            pending: Vec::new(),
            tokens: 0,
            cost: 0.0,
        }
    }

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>, step_id: Option<&str>) {
        self.log_with_data(level, message, step_id, None);
    }

    pub fn log_with_data(
        &mut self,
        level: LogLevel,
        message: impl Into<String>,
        step_id: Option<&str>,
        data: Option<Value>,
    ) {
        let message = message.into();
        let step = step_id.unwrap_or("-");
        match level {
            LogLevel::Debug => debug!(step_id = step, "{}", message),
            LogLevel::Info => info!(step_id = step, "{}", message),
            LogLevel::Warn => warn!(step_id = step, "{}", message),
            LogLevel::Error => error!(step_id = step, "{}", message),
        }

        if level < self.threshold {
            return;
        }

        self.pending.push(LogEntry {
            timestamp: Utc::now(),
            level,
            message,
            step_id: step_id.map(String::from),
            data,
        });
    }

    /// Add one completion's usage to the running totals
    pub fn record_usage(&mut self, usage: &TokenUsage) {
        self.tokens += usage.total_tokens;
        self.cost += usage.cost.unwrap_or(0.0);
    }

    pub fn total_tokens(&self) -> u64 {
        self.tokens
    }

    /// Move buffered log entries and running totals onto the record
    pub fn flush_into(&mut self, record: &mut ExecutionRecord) {
        record.logs.append(&mut self.pending);
        record.metrics.total_tokens_used = self.tokens;
        record.metrics.total_cost = self.cost;
    }

    /// Flush, then derive the step counters and ratios
    pub fn finalize(&mut self, record: &mut ExecutionRecord) {
        self.flush_into(record);
        record.metrics = derive_metrics(&record.steps, self.tokens, self.cost);
    }
}

/// Derive `Metrics` from step records and usage totals
pub fn derive_metrics(steps: &[StepExecution], tokens: u64, cost: f64) -> Metrics {
    let count = |status: StepStatus| steps.iter().filter(|s| s.status == status).count();

    let total = steps.len();
    let completed = count(StepStatus::Completed);

    let durations: Vec<u64> = steps.iter().filter_map(|s| s.duration_ms()).collect();
    let average = if durations.is_empty() {
        0.0
    } else {
        durations.iter().sum::<u64>() as f64 / durations.len() as f64
    };

    let efficiency = if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    };

    Metrics {
        total_steps: total,
        completed_steps: completed,
        failed_steps: count(StepStatus::Failed),
        skipped_steps: count(StepStatus::Skipped),
        total_tokens_used: tokens,
        total_cost: cost,
        average_step_duration: average,
        execution_efficiency: efficiency,
    }
}
