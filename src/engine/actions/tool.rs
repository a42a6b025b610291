//! Tool steps
//!
//! Example:
//! ```yaml
//! - id: fetch
//!   type: tool
//!   config:
//!     tool: web_scraper
//!     action: scrape
//!     parameters:
//!       url: "https://example.com/{slug}"
//!       maxLength: 2000
//! ```
//!
//! Outputs are `result` (the tool's data), `metadata`, and every top-level key
//! of an object result.

use serde_json::{Map, Value};
use tracing::debug;

use crate::engine::dispatcher::{StepEnv, StepOutcome};
use crate::engine::error::StepError;
use crate::tools::{ToolAction, ToolExecutionContext, ToolKind, ToolLog};
use crate::workflow::expressions::interpolate_value;
use crate::workflow::{LogLevel, ToolStepConfig};

pub async fn execute_tool(
    step_id: &str,
    config: &ToolStepConfig,
    inputs: &Map<String, Value>,
    env: &StepEnv<'_>,
    logs: &mut Vec<ToolLog>,
) -> Result<StepOutcome, StepError> {
    let tool = config
        .tool
        .parse::<ToolKind>()
        .ok()
        .and_then(|kind| env.tools.get(kind))
        .ok_or_else(|| StepError::ToolNotAvailable(config.tool.clone()))?;

    let action_name = config
        .action
        .as_deref()
        .filter(|a| !a.is_empty())
        .ok_or_else(|| StepError::MissingAction(step_id.to_string()))?;

    let action = action_name
        .parse::<ToolAction>()
        .ok()
        .filter(|a| tool.supports(*a))
        .ok_or_else(|| StepError::UnknownAction {
            tool: config.tool.clone(),
            action: action_name.to_string(),
        })?;

    let mut params = Map::new();
    for (key, value) in &config.parameters {
        params.insert(key.clone(), interpolate_value(value, env.ctx, inputs));
    }
    for (key, value) in inputs {
        params.insert(key.clone(), value.clone());
    }

    logs.push(ToolLog {
        level: LogLevel::Info,
        message: format!("Invoking {}.{}", tool.kind(), action),
    });
    debug!("Tool parameters: {:?}", params.keys().collect::<Vec<_>>());

    let tool_ctx = ToolExecutionContext::new(
        &env.ctx.agent_id,
        &env.ctx.execution_id,
        step_id,
        &env.ctx.variables,
        env.credentials,
    );
    let result = tool.invoke(action, &params, &tool_ctx).await;
    logs.extend(tool_ctx.drain_logs());

    if !result.success {
        return Err(StepError::ToolFailed {
            tool: config.tool.clone(),
            message: result
                .error
                .unwrap_or_else(|| "tool reported failure".to_string()),
        });
    }

    let data = result.data.unwrap_or(Value::Null);
    let mut outputs = Map::new();
    if let Value::Object(fields) = &data {
        for (key, value) in fields {
            outputs.insert(key.clone(), value.clone());
        }
    }
    outputs.insert("result".to_string(), data);
    outputs.insert(
        "metadata".to_string(),
        result.metadata.unwrap_or(Value::Null),
    );

    Ok(StepOutcome {
        outputs,
        ..Default::default()
    })
}
