//! Agent definition types
//!
//! This module contains all types for defining and loading agents:
//! - `definition` - AgentDefinition, Step, Variable, and Settings
//! - `context` - ExecutionContext for runtime variables
//! - `expressions` - `{variable}` interpolation and condition evaluation
//! - `validation` - Input validation against declared variables
//! - `loader` - Load agents from files and directories
//! - `runner_config` - CLI and executor configuration

pub mod context;
pub mod definition;
pub mod expressions;
pub mod loader;
pub mod runner_config;
pub mod validation;

// Re-export all public types for convenience
pub use context::ExecutionContext;
pub use definition::{
    AgentDefinition, ConditionConfig, ErrorPolicy, InputSource, LogLevel, OutputConfig,
    OutputFormat, OutputKind, PromptConfig, Settings, Step, StepInput, StepKind, StepOutput,
    ToolBinding, ToolStepConfig, TransformConfig, ValidationRule, Variable, VariableType,
};
pub use expressions::{evaluate_condition, interpolate, interpolate_with};
pub use loader::{AgentLoader, LoadError};
pub use runner_config::{ConfigError, RunnerConfig};
pub use validation::validate_inputs;
