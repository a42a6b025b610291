//! Agent, Step, and Variable definitions
//!
//! This module contains the authored, read-only description of an agent: its
//! ordered steps, the variables callers must supply, the tools it binds, and
//! the settings that govern a run.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::tools::ToolKind;

// ============================================================================
// Agent
// ============================================================================

/// A complete agent definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefinition {
    /// Unique identifier used to load the agent
    pub id: String,

    /// Human-readable name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Steps to execute, ordered by `Step::order` at run time
    #[serde(default)]
    pub steps: Vec<Step>,

    /// Declared top-level inputs
    #[serde(default)]
    pub variables: Vec<Variable>,

    /// Tools referenced by tool steps
    #[serde(default)]
    pub tools: Vec<ToolBinding>,

    #[serde(default)]
    pub settings: Settings,
}

impl AgentDefinition {
    /// Steps sorted by ascending `order`. Ties keep their declared position.
    pub fn ordered_steps(&self) -> Vec<&Step> {
        let mut steps: Vec<&Step> = self.steps.iter().collect();
        steps.sort_by_key(|s| s.order);
        steps
    }

    /// Find a step by id
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Find a declared variable by name
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Additional credential keys a binding declares for `tool`
    pub fn binding_credentials(&self, tool: &str) -> Vec<String> {
        self.tools
            .iter()
            .filter(|b| b.name == tool)
            .flat_map(|b| b.required_credentials.iter().cloned())
            .collect()
    }

    /// Structural problems a run would trip over: duplicate ids and names,
    /// unknown tools, branches naming steps that do not exist.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut seen = HashSet::new();

        for step in &self.steps {
            if !seen.insert(step.id.as_str()) {
                problems.push(format!("Duplicate step id '{}'", step.id));
            }
        }

        let mut names = HashSet::new();
        for variable in &self.variables {
            if !names.insert(variable.name.as_str()) {
                problems.push(format!("Duplicate variable '{}'", variable.name));
            }
        }

        for step in &self.steps {
            match &step.kind {
                StepKind::Tool(config) => {
                    if config.tool.parse::<ToolKind>().is_err() {
                        problems.push(format!("Step '{}' uses unknown tool '{}'", step.id, config.tool));
                    }
                    if config.action.as_deref().map_or(true, str::is_empty) {
                        problems.push(format!("Step '{}' has no tool action", step.id));
                    }
                }
                StepKind::Condition(config) => {
                    for target in config.true_steps.iter().chain(&config.false_steps) {
                        if !seen.contains(target.as_str()) {
                            problems.push(format!(
                                "Step '{}' branches to unknown step '{}'",
                                step.id, target
                            ));
                        }
                    }
                }
                _ => {}
            }
        }

        problems
    }
}

/// A tool the agent references, with any extra credentials it needs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolBinding {
    pub name: String,

    #[serde(default)]
    pub required_credentials: Vec<String>,
}

// ============================================================================
// Settings
// ============================================================================

/// Execution settings for an agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Wall-clock budget for a run in seconds (0 = unlimited)
    #[serde(default = "default_max_execution_time")]
    pub max_execution_time: u64,

    #[serde(default)]
    pub error_handling: ErrorPolicy,

    /// Minimum level of entries recorded on the execution log
    #[serde(default)]
    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_execution_time: default_max_execution_time(),
            error_handling: ErrorPolicy::default(),
            log_level: LogLevel::default(),
        }
    }
}

fn default_max_execution_time() -> u64 {
    300
}

/// What the executor does after a step fails
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Halt the run; remaining steps are skipped
    #[default]
    Stop,
    /// Record the failure and proceed to the next step
    Continue,
    /// Accepted for older definitions; runs as `Stop`
    Retry,
}

impl ErrorPolicy {
    /// Whether a step failure ends the loop
    pub fn halts_on_failure(&self) -> bool {
        match self {
            ErrorPolicy::Stop | ErrorPolicy::Retry => true,
            ErrorPolicy::Continue => false,
        }
    }
}

/// Severity of an execution log entry
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

// ============================================================================
// Variables
// ============================================================================

/// A declared top-level input
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub name: String,

    #[serde(rename = "type", default)]
    pub var_type: VariableType,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRule>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    #[default]
    String,
    Number,
    Boolean,
    /// A path to a file, carried as a string
    File,
    /// Any JSON value
    Json,
}

/// Constraints applied to a supplied variable value
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
    /// Allowed values
    #[serde(default)]
    pub options: Vec<Value>,
}

// ============================================================================
// Steps
// ============================================================================

/// A single typed unit of work
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Step type and its configuration
    #[serde(flatten)]
    pub kind: StepKind,

    /// Execution position; need not be contiguous
    #[serde(default)]
    pub order: i64,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub inputs: Vec<StepInput>,

    #[serde(default)]
    pub outputs: Vec<StepOutput>,
}

fn default_enabled() -> bool {
    true
}

impl Step {
    /// Name for logs, falling back to the id
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// The closed set of step types, each with its own configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "lowercase")]
pub enum StepKind {
    Prompt(PromptConfig),
    Tool(ToolStepConfig),
    Condition(ConditionConfig),
    Transform(TransformConfig),
    Output(OutputConfig),
}

impl StepKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            StepKind::Prompt(_) => "prompt",
            StepKind::Tool(_) => "tool",
            StepKind::Condition(_) => "condition",
            StepKind::Transform(_) => "transform",
            StepKind::Output(_) => "output",
        }
    }
}

/// Configuration of a model prompt step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptConfig {
    /// Template with `{variable}` placeholders
    pub prompt: String,

    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

/// Configuration of a tool step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolStepConfig {
    pub tool: String,

    /// Required at run time; a missing action fails the step
    #[serde(default)]
    pub action: Option<String>,

    /// Static parameters; string values are interpolated
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// Configuration of a condition step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionConfig {
    pub condition: String,

    #[serde(default)]
    pub true_steps: Vec<String>,

    #[serde(default)]
    pub false_steps: Vec<String>,
}

/// Configuration of a transform step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformConfig {
    /// One of `to_json`, `from_json`, `to_uppercase`, `to_lowercase`
    pub transform: String,
}

/// Configuration of an output step
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    #[serde(default)]
    pub template: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
    Markdown,
}

/// Where a step input value comes from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    /// Context lookup by `source` key
    #[default]
    Variable,
    /// The literal `source` value
    Constant,
    /// Context lookup, same as `Variable`
    UserInput,
    /// Reserved; resolves to the default value
    PreviousStep,
    /// Reserved; resolves to the default value
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInput {
    pub name: String,

    #[serde(default)]
    pub source_type: InputSource,

    #[serde(default)]
    pub source: Value,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

/// Descriptive kind of a step output
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    #[default]
    Text,
    Json,
    File,
    Url,
    Binary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutput {
    /// Key the handler writes into its result map
    pub name: String,

    #[serde(rename = "type", default)]
    pub kind: OutputKind,

    /// Context variable the value is copied into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_as: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_deserialize() {
        let yaml = r#"
id: summarizer
name: Summarizer
variables:
  - name: topic
    type: string
    required: true
steps:
  - id: ask
    name: Ask model
    type: prompt
    order: 1
    config:
      prompt: "Summarize {topic}"
      model: gpt-4o-mini
    outputs:
      - name: response
        saveAs: summary
"#;

        let agent: AgentDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(agent.id, "summarizer");
        assert_eq!(agent.steps.len(), 1);

        let step = &agent.steps[0];
        assert!(step.enabled);
        match &step.kind {
            StepKind::Prompt(config) => {
                assert_eq!(config.model, "gpt-4o-mini");
                assert_eq!(config.max_tokens, 1024);
            }
            other => panic!("expected prompt step, got {}", other.type_name()),
        }
        assert_eq!(step.outputs[0].save_as.as_deref(), Some("summary"));
        assert_eq!(agent.settings.error_handling, ErrorPolicy::Stop);
        assert_eq!(agent.settings.max_execution_time, 300);
    }

    #[test]
    fn test_step_kinds_deserialize() {
        let yaml = r#"
id: kinds
name: Kinds
settings:
  errorHandling: continue
  logLevel: debug
steps:
  - id: t
    type: tool
    order: 3
    config:
      tool: web_search
      action: search
      parameters:
        maxResults: 3
  - id: c
    type: condition
    order: 2
    config:
      condition: "{status} == ok"
      trueSteps: [t]
  - id: x
    type: transform
    order: 1
    enabled: false
    config:
      transform: to_uppercase
  - id: o
    type: output
    order: 4
    config:
      format: markdown
"#;

        let agent: AgentDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(agent.settings.error_handling, ErrorPolicy::Continue);
        assert_eq!(agent.settings.log_level, LogLevel::Debug);

        let order: Vec<&str> = agent.ordered_steps().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(order, vec!["x", "c", "t", "o"]);
        assert!(!agent.step("x").unwrap().enabled);

        match &agent.step("o").unwrap().kind {
            StepKind::Output(config) => assert_eq!(config.format, OutputFormat::Markdown),
            other => panic!("expected output step, got {}", other.type_name()),
        }
    }

    #[test]
    fn test_retry_policy_halts() {
        assert!(ErrorPolicy::Retry.halts_on_failure());
        assert!(ErrorPolicy::Stop.halts_on_failure());
        assert!(!ErrorPolicy::Continue.halts_on_failure());
    }

    #[test]
    fn test_step_input_defaults() {
        let json = r#"{"name": "data", "source": "raw"}"#;
        let input: StepInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.source_type, InputSource::Variable);
        assert!(!input.required);
        assert_eq!(input.source, Value::String("raw".into()));
    }

    #[test]
    fn test_problems() {
        let yaml = r#"
id: broken
name: Broken
variables:
  - name: topic
    type: string
  - name: topic
    type: string
steps:
  - id: a
    type: tool
    config:
      tool: calculator
  - id: a
    type: condition
    config:
      condition: "true"
      trueSteps: [a]
      falseSteps: [ghost]
"#;
        let agent: AgentDefinition = serde_yaml::from_str(yaml).unwrap();
        let problems = agent.problems();

        assert!(problems.contains(&"Duplicate step id 'a'".to_string()));
        assert!(problems.contains(&"Duplicate variable 'topic'".to_string()));
        assert!(problems.contains(&"Step 'a' uses unknown tool 'calculator'".to_string()));
        assert!(problems.contains(&"Step 'a' has no tool action".to_string()));
        assert!(problems.contains(&"Step 'a' branches to unknown step 'ghost'".to_string()));
        assert_eq!(problems.len(), 5);
    }
}
