//! Executor error types

use crate::gateway::GatewayError;
use crate::store::StoreError;

/// Errors that end an `execute_agent` call or a caller API request
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("Agent not found: {0}")]
    DefinitionNotFound(String),

    #[error("Execution not found: {0}")]
    RecordNotFound(String),

    #[error("Input validation failed: {0}")]
    ValidationFailed(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors that fail a single step; recorded on its `StepExecution`
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("Required input '{0}' is missing")]
    RequiredInputMissing(String),

    #[error("Tool not available: {0}")]
    ToolNotAvailable(String),

    #[error("Tool step '{0}' has no action")]
    MissingAction(String),

    #[error("Tool {tool} does not support action '{action}'")]
    UnknownAction { tool: String, action: String },

    #[error("Unknown transform: {0}")]
    UnknownTransform(String),

    #[error("Tool {tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("Model call failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Execution time limit of {0}s exceeded")]
    DeadlineExceeded(u64),
}

impl StepError {
    /// Whether the run must stop regardless of the error policy
    pub fn is_fatal(&self) -> bool {
        matches!(self, StepError::DeadlineExceeded(_))
    }
}
