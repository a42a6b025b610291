//! Agent Executor - Runs agents and tracks their executions
//!
//! This is the main engine that:
//! 1. Loads the agent definition from the store
//! 2. Validates caller inputs against the declared variables
//! 3. Builds the run's tool registry from its credentials
//! 4. Executes steps in ascending `order` against a shared context
//! 5. Applies the error policy, condition branches and time limit
//! 6. Publishes progress to the execution table and persists the result

use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::engine::dispatcher::{apply_outputs, dispatch, StepEnv};
use crate::engine::error::{ExecutorError, StepError};
use crate::engine::execution_table::{ExecutionTable, DEFAULT_HISTORY_LIMIT};
use crate::engine::metrics::MetricsAggregator;
use crate::engine::resolver::resolve_inputs;
use crate::engine::result::{ExecutionRecord, ExecutionStatus, StepStatus};
use crate::gateway::ChatBackend;
use crate::store::{AgentStore, StoreError};
use crate::tools::{Credentials, ToolKind, ToolLog, ToolRegistry};
use crate::workflow::{validate_inputs, AgentDefinition, ErrorPolicy, ExecutionContext, LogLevel, Step};

/// The agent executor. One instance serves any number of concurrent runs.
pub struct Executor {
    store: Arc<dyn AgentStore>,
    backend: Arc<dyn ChatBackend>,
    table: ExecutionTable,
}

/// Why the step loop stopped early
enum Halt {
    Cancelled,
    Failed,
}

impl Executor {
    pub fn new(store: Arc<dyn AgentStore>, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            store,
            backend,
            table: ExecutionTable::new(DEFAULT_HISTORY_LIMIT),
        }
    }

    /// Set how many execution records are kept for polling
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.table = ExecutionTable::new(limit);
        self
    }

    /// Run an agent to completion and return its terminal record.
    ///
    /// Step failures are recorded on the returned record; only a missing
    /// definition or invalid inputs produce an `Err`.
    #[instrument(skip(self, inputs, credentials))]
    pub async fn execute_agent(
        &self,
        agent_id: &str,
        inputs: HashMap<String, Value>,
        credentials: Credentials,
    ) -> Result<ExecutionRecord, ExecutorError> {
        let definition = self.store.load_agent(agent_id).await.map_err(|e| match e {
            StoreError::NotFound(id) => ExecutorError::DefinitionNotFound(id),
            other => ExecutorError::Store(other),
        })?;

        let execution_id = uuid::Uuid::new_v4().to_string();
        let ordered = definition.ordered_steps();
        let mut record = ExecutionRecord::start(&execution_id, agent_id, inputs.clone(), &ordered);
        let mut metrics = MetricsAggregator::new(definition.settings.log_level);

        info!("Starting execution {} of agent {}", execution_id, agent_id);
        metrics.log(
            LogLevel::Info,
            format!("Execution started for agent '{}'", definition.name),
            None,
        );
        metrics.flush_into(&mut record);
        self.table.insert(record.clone()).await;

        let variables = match validate_inputs(&definition.variables, &inputs) {
            Ok(variables) => variables,
            Err(message) => {
                metrics.log(LogLevel::Error, format!("Input validation failed: {}", message), None);
                record.status = ExecutionStatus::Failed;
                record.error = Some(message.clone());
                self.finish(&mut record, &mut metrics).await;
                return Err(ExecutorError::ValidationFailed(message));
            }
        };

        if definition.settings.error_handling == ErrorPolicy::Retry {
            metrics.log(
                LogLevel::Warn,
                "Error policy 'retry' is not supported; failed steps stop the run",
                None,
            );
        }

        let tools = ToolRegistry::for_run(&credentials, |kind: ToolKind| {
            definition.binding_credentials(kind.as_str())
        });
        let mut ctx = ExecutionContext::new(agent_id, &execution_id, variables);

        let halt = self
            .run_steps(&definition, &ordered, &mut ctx, &tools, &credentials, &mut record, &mut metrics)
            .await;

        // A cancel may land while the last step is in flight
        let cancelled =
            matches!(halt, Some(Halt::Cancelled)) || self.table.is_cancelled(&execution_id).await;

        record.status = if cancelled {
            ExecutionStatus::Cancelled
        } else if record.steps.iter().any(|s| s.status == StepStatus::Failed) {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::Completed
        };

        if record.status == ExecutionStatus::Failed && record.error.is_none() {
            record.error = record
                .steps
                .iter()
                .find(|s| s.status == StepStatus::Failed)
                .map(|s| format!("Step '{}' failed: {}", s.step_name, s.error.as_deref().unwrap_or("")));
        }

        self.finish(&mut record, &mut metrics).await;
        Ok(record)
    }

    /// Run the step loop. Returns why it stopped early, if it did.
    #[allow(clippy::too_many_arguments)]
    async fn run_steps(
        &self,
        definition: &AgentDefinition,
        ordered: &[&Step],
        ctx: &mut ExecutionContext,
        tools: &ToolRegistry,
        credentials: &Credentials,
        record: &mut ExecutionRecord,
        metrics: &mut MetricsAggregator,
    ) -> Option<Halt> {
        let settings = &definition.settings;
        let deadline = (settings.max_execution_time > 0)
            .then(|| Instant::now() + Duration::from_secs(settings.max_execution_time));
        let mut branch_skipped: HashSet<String> = HashSet::new();

        for (index, step) in ordered.iter().enumerate() {
            if self.table.is_cancelled(&record.id).await {
                metrics.log(LogLevel::Warn, "Execution cancelled", None);
                return Some(Halt::Cancelled);
            }

            if !step.enabled {
                record.steps[index].skip();
                metrics.log(LogLevel::Info, "Step skipped (disabled)", Some(step.id.as_str()));
                continue;
            }

            if branch_skipped.contains(&step.id) {
                record.steps[index].skip();
                metrics.log(LogLevel::Info, "Step skipped (branch not taken)", Some(step.id.as_str()));
                self.table.publish(record).await;
                continue;
            }

            ctx.enter_step(&step.id);
            metrics.log(
                LogLevel::Info,
                format!("Starting {} step '{}'", step.kind.type_name(), step.display_name()),
                Some(step.id.as_str()),
            );

            let inputs = match resolve_inputs(step, ctx) {
                Ok(inputs) => inputs,
                Err(e) => {
                    record.steps[index].start(Map::new());
                    self.fail_step(record, metrics, index, step, &e);
                    metrics.flush_into(record);
                    self.table.publish(record).await;
                    if settings.error_handling.halts_on_failure() {
                        return Some(Halt::Failed);
                    }
                    continue;
                }
            };
            record.steps[index].start(inputs.clone());

            let env = StepEnv {
                ctx,
                tools,
                backend: self.backend.as_ref(),
                credentials,
            };
            let mut step_logs: Vec<ToolLog> = Vec::new();
            let result = match deadline {
                // Synchronous handlers would finish before a zero timeout fires
                Some(deadline) if Instant::now() >= deadline => {
                    Err(StepError::DeadlineExceeded(settings.max_execution_time))
                }
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match tokio::time::timeout(remaining, dispatch(step, &inputs, &env, &mut step_logs))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(StepError::DeadlineExceeded(settings.max_execution_time)),
                    }
                }
                None => dispatch(step, &inputs, &env, &mut step_logs).await,
            };

            for log in step_logs {
                metrics.log(log.level, log.message, Some(step.id.as_str()));
            }

            match result {
                Ok(outcome) => {
                    if let Some(usage) = &outcome.usage {
                        metrics.record_usage(usage);
                    }
                    if let Some(values) = &outcome.record_outputs {
                        for (key, value) in values {
                            record.outputs.insert(key.clone(), value.clone());
                        }
                    }
                    if let Some(branch) = &outcome.branch {
                        for id in &branch.taken {
                            branch_skipped.remove(id);
                        }
                        for id in &branch.not_taken {
                            if !branch.taken.contains(id) {
                                branch_skipped.insert(id.clone());
                            }
                        }
                    }

                    for name in apply_outputs(step, &outcome.outputs, ctx) {
                        metrics.log(
                            LogLevel::Warn,
                            format!("Declared output '{}' was not produced", name),
                            Some(step.id.as_str()),
                        );
                    }

                    record.steps[index].complete(outcome.outputs);
                    metrics.log(LogLevel::Info, "Step completed", Some(step.id.as_str()));
                }
                Err(e) => {
                    self.fail_step(record, metrics, index, step, &e);
                    if e.is_fatal() || settings.error_handling.halts_on_failure() {
                        metrics.flush_into(record);
                        self.table.publish(record).await;
                        return Some(Halt::Failed);
                    }
                }
            }

            metrics.flush_into(record);
            self.table.publish(record).await;
        }

        None
    }

    fn fail_step(
        &self,
        record: &mut ExecutionRecord,
        metrics: &mut MetricsAggregator,
        index: usize,
        step: &Step,
        error: &StepError,
    ) {
        error!("Step '{}' failed: {}", step.display_name(), error);
        record.steps[index].fail(error.to_string());
        metrics.log(
            LogLevel::Error,
            format!("Step failed: {}", error),
            Some(step.id.as_str()),
        );
    }

    /// Skip steps never reached, derive metrics, publish and persist
    async fn finish(&self, record: &mut ExecutionRecord, metrics: &mut MetricsAggregator) {
        for step in record.steps.iter_mut() {
            step.skip();
        }

        record.stamp_end();
        metrics.log(
            if record.status == ExecutionStatus::Failed {
                LogLevel::Error
            } else {
                LogLevel::Info
            },
            format!("Execution {}", status_word(record.status)),
            None,
        );
        metrics.finalize(record);

        info!(
            "Execution {} {} ({}/{} steps completed)",
            record.id,
            status_word(record.status),
            record.metrics.completed_steps,
            record.metrics.total_steps
        );

        // A cancel that landed after the loop's last check still wins
        if self.table.publish(record).await == ExecutionStatus::Cancelled
            && record.status != ExecutionStatus::Cancelled
        {
            info!("Execution {} was cancelled while finishing", record.id);
            record.status = ExecutionStatus::Cancelled;
            record.error = None;
        }
        if let Err(e) = self.store.save_execution(record).await {
            error!("Failed to persist execution {}: {}", record.id, e);
        }
    }

    /// Latest snapshot of an execution, if it is still in the table
    pub async fn get_execution_status(&self, execution_id: &str) -> Option<ExecutionRecord> {
        self.table.get(execution_id).await
    }

    /// Every execution still in the table
    pub async fn list_executions(&self) -> Vec<ExecutionRecord> {
        self.table.records().await
    }

    /// Cancel a running execution. The step in flight completes; the loop
    /// stops before the next one.
    #[instrument(skip(self))]
    pub async fn cancel_execution(&self, execution_id: &str) -> Result<ExecutionRecord, ExecutorError> {
        let record = self
            .table
            .cancel(execution_id)
            .await
            .ok_or_else(|| ExecutorError::RecordNotFound(execution_id.to_string()))?;

        if record.status == ExecutionStatus::Cancelled {
            info!("Cancelled execution {}", execution_id);
            if let Err(e) = self.store.save_execution(&record).await {
                warn!("Failed to persist cancelled execution {}: {}", execution_id, e);
            }
        }

        Ok(record)
    }

    /// Names of the built-in tools
    pub fn get_available_tools(&self) -> Vec<String> {
        ToolKind::ALL.iter().map(|k| k.to_string()).collect()
    }
}

fn status_word(status: ExecutionStatus) -> &'static str {
    match status {
        ExecutionStatus::Pending => "pending",
        ExecutionStatus::Running => "running",
        ExecutionStatus::Completed => "completed",
        ExecutionStatus::Failed => "failed",
        ExecutionStatus::Cancelled => "cancelled",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{Completion, CompletionRequest, GatewayError, TokenUsage};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoBackend;

    #[async_trait]
    impl ChatBackend for EchoBackend {
        async fn complete(&self, request: CompletionRequest) -> Result<Completion, GatewayError> {
            Ok(Completion {
                model: request.model,
                content: request.prompt,
                usage: TokenUsage {
                    total_tokens: 3,
                    ..Default::default()
                },
            })
        }
    }

    fn executor(yaml: &str) -> Executor {
        let agent: AgentDefinition = serde_yaml::from_str(yaml).unwrap();
        Executor::new(
            Arc::new(MemoryStore::with_agents(vec![agent])),
            Arc::new(EchoBackend),
        )
    }

    #[tokio::test]
    async fn test_prompt_output_saved_to_context() {
        let executor = executor(
            r#"
id: echo
name: Echo
steps:
  - id: ask
    type: prompt
    order: 1
    config:
      prompt: "About {topic}"
      model: m
    outputs:
      - name: response
        saveAs: answer
  - id: shout
    type: transform
    order: 2
    config:
      transform: to_uppercase
    inputs:
      - name: data
        source: answer
        required: true
"#,
        );

        let mut inputs = HashMap::new();
        inputs.insert("topic".to_string(), json!("rust"));
        let record = executor
            .execute_agent("echo", inputs, Credentials::new())
            .await
            .unwrap();

        assert_eq!(record.status, ExecutionStatus::Completed);
        assert_eq!(
            record.step("shout").unwrap().outputs["result"],
            json!("ABOUT RUST")
        );
        assert_eq!(record.metrics.total_tokens_used, 3);
    }

    #[tokio::test]
    async fn test_unknown_agent() {
        let executor = executor("id: a\nname: A\n");
        let err = executor
            .execute_agent("missing", HashMap::new(), Credentials::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::DefinitionNotFound(_)));
    }

    #[tokio::test]
    async fn test_cancel_during_finish_is_kept() {
        let executor = executor("id: a\nname: A\n");
        let mut record = ExecutionRecord::start("late", "a", HashMap::new(), &[]);
        executor.table.insert(record.clone()).await;
        executor.table.cancel("late").await;

        record.status = ExecutionStatus::Completed;
        let mut metrics = MetricsAggregator::new(LogLevel::Info);
        executor.finish(&mut record, &mut metrics).await;

        assert_eq!(record.status, ExecutionStatus::Cancelled);
        assert_eq!(
            executor.get_execution_status("late").await.unwrap().status,
            ExecutionStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_cancel_unknown_execution() {
        let executor = executor("id: a\nname: A\n");
        assert!(matches!(
            executor.cancel_execution("nope").await,
            Err(ExecutorError::RecordNotFound(_))
        ));
        assert_eq!(
            executor.get_available_tools(),
            vec!["web_search", "web_scraper", "code_analyzer"]
        );
    }
}
