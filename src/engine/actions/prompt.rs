//! Model prompt steps
//!
//! Example:
//! ```yaml
//! - id: summarize
//!   type: prompt
//!   config:
//!     prompt: "Summarize {topic} in one paragraph"
//!     model: gpt-4o-mini
//!     temperature: 0.3
//!   outputs:
//!     - name: response
//!       saveAs: summary
//! ```

use serde_json::{json, Map, Value};

use crate::engine::dispatcher::{StepEnv, StepOutcome};
use crate::engine::error::StepError;
use crate::gateway::CompletionRequest;
use crate::tools::ToolLog;
use crate::workflow::{interpolate_with, LogLevel, PromptConfig};

/// Send the interpolated prompt to the backend
pub async fn execute_prompt(
    config: &PromptConfig,
    inputs: &Map<String, Value>,
    env: &StepEnv<'_>,
    logs: &mut Vec<ToolLog>,
) -> Result<StepOutcome, StepError> {
    let prompt = interpolate_with(&config.prompt, env.ctx, inputs);

    logs.push(ToolLog {
        level: LogLevel::Info,
        message: format!("Calling model {}", config.model),
    });

    let completion = env
        .backend
        .complete(CompletionRequest {
            model: config.model.clone(),
            prompt,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
        .await?;

    logs.push(ToolLog {
        level: LogLevel::Debug,
        message: format!(
            "Model {} used {} tokens",
            completion.model, completion.usage.total_tokens
        ),
    });

    let usage = &completion.usage;
    let mut outputs = Map::new();
    outputs.insert("response".to_string(), Value::String(completion.content.clone()));
    outputs.insert("model".to_string(), Value::String(completion.model.clone()));
    outputs.insert(
        "usage".to_string(),
        json!({
            "promptTokens": usage.prompt_tokens,
            "completionTokens": usage.completion_tokens,
            "totalTokens": usage.total_tokens,
            "cost": usage.cost.unwrap_or(0.0),
        }),
    );

    Ok(StepOutcome {
        outputs,
        usage: Some(completion.usage),
        ..Default::default()
    })
}
