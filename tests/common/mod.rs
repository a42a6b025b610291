#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gateway_agents::gateway::{ChatBackend, Completion, CompletionRequest, GatewayError, TokenUsage};
use gateway_agents::{AgentDefinition, Executor, MemoryStore};
use tempfile::TempDir;

pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

pub fn write_agent(dir: &Path, filename: &str, content: &str) {
    fs::write(dir.join(filename), content).expect("Failed to write agent file");
}

/// Write a config pointing the CLI at `dir`
pub fn write_config(dir: &Path) -> std::path::PathBuf {
    let agents = dir.join("agents");
    let executions = dir.join("executions");
    fs::create_dir_all(&agents).expect("Failed to create agents dir");

    let path = dir.join("gateway-agents.yaml");
    fs::write(
        &path,
        format!(
            r#"
gateway:
  baseUrl: http://127.0.0.1:9/v1
  apiKey: test-key
agentsDir: {}
executionsDir: {}
"#,
            agents.display(),
            executions.display()
        ),
    )
    .expect("Failed to write config");
    path
}

pub fn parse_agent(yaml: &str) -> AgentDefinition {
    serde_yaml::from_str(yaml).expect("Invalid agent fixture")
}

/// Chat backend answering every prompt with fixed content and usage
pub struct MockBackend {
    content: String,
    total_tokens: u64,
    delay: Option<Duration>,
    blocking: bool,
    fail: bool,
    prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            content: "hello".to_string(),
            total_tokens: 5,
            delay: None,
            blocking: false,
            fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Hold the thread for `delay` instead of yielding to the runtime
    pub fn blocking(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            blocking: true,
            ..Self::new()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, GatewayError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());

        match self.delay {
            Some(delay) if self.blocking => std::thread::sleep(delay),
            Some(delay) => tokio::time::sleep(delay).await,
            None => {}
        }
        if self.fail {
            return Err(GatewayError::Http {
                status: 503,
                message: "unavailable".to_string(),
            });
        }

        Ok(Completion {
            model: request.model,
            content: self.content.clone(),
            usage: TokenUsage {
                prompt_tokens: 3,
                completion_tokens: self.total_tokens - 3,
                total_tokens: self.total_tokens,
                cost: Some(0.001),
            },
        })
    }
}

/// Executor over an in-memory store holding `agents`
pub fn executor_with(agents: &[&str], backend: Arc<MockBackend>) -> (Executor, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::with_agents(agents.iter().map(|y| parse_agent(y))));
    let executor = Executor::new(store.clone(), backend);
    (executor, store)
}

pub const SUMMARIZER: &str = r#"
id: summarizer
name: Summarizer
variables:
  - name: topic
    type: string
    required: true
steps:
  - id: summarize
    name: Summarize
    type: prompt
    order: 1
    config:
      prompt: "Summarize {topic}"
      model: gpt-4o-mini
    outputs:
      - name: response
        saveAs: summary
"#;

pub fn transform_only(id: &str) -> String {
    format!(
        r#"
id: {}
name: Shout
variables:
  - name: text
    type: string
    required: true
steps:
  - id: upper
    type: transform
    order: 1
    config:
      transform: to_uppercase
    inputs:
      - name: data
        sourceType: variable
        source: text
        required: true
    outputs:
      - name: result
        saveAs: shouted
  - id: out
    type: output
    order: 2
    config:
      format: text
      template: "{{shouted}}"
    inputs:
      - name: shouted
        source: shouted
"#,
        id
    )
}
