//! Step dispatch
//!
//! Routes a step to the handler for its kind and folds `saveAs` outputs back
//! into the execution context.

use serde_json::{Map, Value};

use crate::engine::actions;
use crate::engine::error::StepError;
use crate::gateway::{ChatBackend, TokenUsage};
use crate::tools::{Credentials, ToolLog, ToolRegistry};
use crate::workflow::{ExecutionContext, Step, StepKind};

/// What a step handler can see of its run
pub struct StepEnv<'a> {
    pub ctx: &'a ExecutionContext,
    pub tools: &'a ToolRegistry,
    pub backend: &'a dyn ChatBackend,
    pub credentials: &'a Credentials,
}

/// Branch chosen by a condition step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub taken: Vec<String>,
    pub not_taken: Vec<String>,
}

/// Result of a successful step
#[derive(Debug, Default)]
pub struct StepOutcome {
    /// Values the step's declared outputs read from
    pub outputs: Map<String, Value>,

    /// Model usage to add to the run totals
    pub usage: Option<TokenUsage>,

    /// Values merged into the execution record's outputs
    pub record_outputs: Option<Map<String, Value>>,

    pub branch: Option<Branch>,
}

/// Run `step` with its resolved inputs. Handlers append log lines to `logs`
/// whether or not the step succeeds.
pub async fn dispatch(
    step: &Step,
    inputs: &Map<String, Value>,
    env: &StepEnv<'_>,
    logs: &mut Vec<ToolLog>,
) -> Result<StepOutcome, StepError> {
    match &step.kind {
        StepKind::Prompt(config) => actions::prompt::execute_prompt(config, inputs, env, logs).await,
        StepKind::Tool(config) => {
            actions::tool::execute_tool(&step.id, config, inputs, env, logs).await
        }
        StepKind::Condition(config) => actions::condition::execute_condition(config, inputs, env),
        StepKind::Transform(config) => actions::transform::execute_transform(config, inputs),
        StepKind::Output(config) => actions::output::execute_output(config, inputs, env),
    }
}

/// Copy declared outputs with `saveAs` into the context. Returns the names of
/// declared outputs the step did not produce.
pub fn apply_outputs(step: &Step, outputs: &Map<String, Value>, ctx: &mut ExecutionContext) -> Vec<String> {
    let mut missing = Vec::new();

    for declared in &step.outputs {
        match outputs.get(&declared.name) {
            Some(value) => {
                if let Some(target) = &declared.save_as {
                    ctx.set(target, value.clone());
                }
            }
            None => missing.push(declared.name.clone()),
        }
    }

    missing
}
