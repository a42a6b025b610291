//! Agent execution engine module
//!
//! This module contains:
//! - `executor` - Runs agents end to end
//! - `error` - Executor and step error types
//! - `result` - Execution record, step, log, and metrics types
//! - `resolver` - Step input resolution
//! - `dispatcher` - Routes steps to their handlers
//! - `actions` - Handlers for each step type
//! - `metrics` - Log and metrics aggregation
//! - `execution_table` - Bounded table of live and recent executions

pub mod actions;
pub mod dispatcher;
pub mod error;
pub mod execution_table;
pub mod executor;
pub mod metrics;
pub mod resolver;
pub mod result;

pub use error::{ExecutorError, StepError};
pub use execution_table::ExecutionTable;
pub use executor::Executor;
pub use result::{
    ExecutionRecord, ExecutionStatus, LogEntry, Metrics, StepExecution, StepStatus,
};
