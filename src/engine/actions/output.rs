//! Output steps
//!
//! Formats the step's resolved inputs and merges them into the execution
//! record's outputs.

use serde_json::{Map, Value};

use crate::engine::dispatcher::{StepEnv, StepOutcome};
use crate::engine::error::StepError;
use crate::workflow::expressions::render_value;
use crate::workflow::{interpolate_with, OutputConfig, OutputFormat};

pub fn execute_output(
    config: &OutputConfig,
    inputs: &Map<String, Value>,
    env: &StepEnv<'_>,
) -> Result<StepOutcome, StepError> {
    let rendered = match config.format {
        OutputFormat::Json => serde_json::to_string_pretty(inputs)
            .map_err(|e| StepError::InvalidData(e.to_string()))?,
        OutputFormat::Text => match &config.template {
            Some(template) => interpolate_with(template, env.ctx, inputs),
            None => format_text(inputs),
        },
        OutputFormat::Markdown => format_markdown(inputs),
    };

    let mut outputs = Map::new();
    outputs.insert("output".to_string(), Value::String(rendered));

    Ok(StepOutcome {
        outputs,
        record_outputs: Some(inputs.clone()),
        ..Default::default()
    })
}

fn format_text(inputs: &Map<String, Value>) -> String {
    inputs
        .iter()
        .map(|(key, value)| format!("{}: {}", key, render_value(value)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_markdown(inputs: &Map<String, Value>) -> String {
    let mut out = String::from("# Agent Output\n");
    for (key, value) in inputs {
        out.push_str(&format!("\n## {}\n\n{}\n", key, render_value(value)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{ChatBackend, Completion, CompletionRequest, GatewayError};
    use crate::tools::{Credentials, ToolRegistry};
    use crate::workflow::ExecutionContext;
    use async_trait::async_trait;
    use serde_json::json;

    struct NoBackend;

    #[async_trait]
    impl ChatBackend for NoBackend {
        async fn complete(&self, _: CompletionRequest) -> Result<Completion, GatewayError> {
            Err(GatewayError::Request("offline".to_string()))
        }
    }

    fn render(config: &OutputConfig, inputs: &Map<String, Value>) -> StepOutcome {
        let mut ctx = ExecutionContext::default();
        ctx.set("agent", json!("summarizer"));
        let creds = Credentials::new();
        let tools = ToolRegistry::new();
        let env = StepEnv {
            ctx: &ctx,
            tools: &tools,
            backend: &NoBackend,
            credentials: &creds,
        };
        execute_output(config, inputs, &env).unwrap()
    }

    fn inputs() -> Map<String, Value> {
        let mut inputs = Map::new();
        inputs.insert("summary".to_string(), json!("short"));
        inputs.insert("count".to_string(), json!(2));
        inputs
    }

    #[test]
    fn test_json_format() {
        let outcome = render(&OutputConfig::default(), &inputs());
        let text = outcome.outputs["output"].as_str().unwrap();
        let parsed: Value = serde_json::from_str(text).unwrap();
        assert_eq!(parsed["summary"], "short");
        assert!(text.contains('\n'));
        assert_eq!(outcome.record_outputs.unwrap()["count"], json!(2));
    }

    #[test]
    fn test_text_format() {
        let config = OutputConfig {
            format: OutputFormat::Text,
            template: None,
        };
        let outcome = render(&config, &inputs());
        assert_eq!(outcome.outputs["output"], json!("count: 2\nsummary: short"));

        let config = OutputConfig {
            format: OutputFormat::Text,
            template: Some("{agent} says {summary}".to_string()),
        };
        let outcome = render(&config, &inputs());
        assert_eq!(outcome.outputs["output"], json!("summarizer says short"));
    }

    #[test]
    fn test_markdown_format() {
        let config = OutputConfig {
            format: OutputFormat::Markdown,
            template: None,
        };
        let outcome = render(&config, &inputs());
        let text = outcome.outputs["output"].as_str().unwrap();
        assert!(text.starts_with("# Agent Output\n"));
        assert!(text.contains("## summary\n\nshort\n"));
        assert!(text.contains("## count\n\n2\n"));
    }
}
