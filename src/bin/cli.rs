use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use gateway_agents::engine::StepStatus;
use gateway_agents::gateway::CompletionRequest;
use gateway_agents::keys::{mask, GATEWAY_KEY};
use gateway_agents::prelude::*;
use serde_json::Value;
use tracing_subscriber::EnvFilter;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "gateway-agents")]
#[command(about = "Prompt, compare and run agents against chat-completion models", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file (default: ./gateway-agents.yaml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an agent by id
    Run {
        #[arg(value_name = "AGENT_ID")]
        agent_id: String,

        /// Input variable as KEY=VALUE; values are parsed as JSON when possible
        #[arg(short, long = "input", value_name = "KEY=VALUE")]
        inputs: Vec<String>,

        /// Tool credential as KEY=VALUE
        #[arg(short = 'c', long = "credential", value_name = "KEY=VALUE")]
        credentials: Vec<String>,

        /// Print the execution record as JSON
        #[arg(long)]
        json: bool,
    },

    /// List agents in the agents directory
    List,

    /// Validate agent files without running them
    Validate {
        /// Path to an agent file or directory
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// List built-in tools and whether their credentials are present
    Tools,

    /// List models offered by the gateway
    Models,

    /// Send a single prompt
    Prompt {
        #[arg(value_name = "TEXT")]
        text: String,

        /// Model to use (default: defaultModel from the configuration)
        #[arg(short, long)]
        model: Option<String>,

        #[arg(short, long, default_value_t = 0.7)]
        temperature: f32,

        #[arg(long, default_value_t = 1024)]
        max_tokens: u32,
    },

    /// Send the same prompt to several models concurrently
    Compare {
        #[arg(value_name = "TEXT")]
        text: String,

        /// Models to compare (repeat the flag)
        #[arg(short, long = "model", required = true)]
        models: Vec<String>,

        #[arg(long, default_value_t = 1024)]
        max_tokens: u32,
    },

    /// Manage stored API keys and credentials
    Keys {
        #[command(subcommand)]
        command: KeyCommands,
    },
}

#[derive(Subcommand)]
enum KeyCommands {
    /// Store a key (use `gateway` for the gateway API key)
    Set { name: String, value: String },

    /// Show a key, masked unless --reveal is given
    Get {
        name: String,

        #[arg(long)]
        reveal: bool,
    },

    /// Delete a key
    Remove { name: String },

    /// List stored key names
    List,
}

#[cfg(feature = "otel")]
fn init_otel_tracing(verbose: bool) {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::runtime::Tokio;
    use opentelemetry_sdk::trace::TracerProvider;

    let filter = if verbose {
        "gateway_agents=debug"
    } else {
        "gateway_agents=info"
    };

    let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&otlp_endpoint)
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            init_tracing(verbose);
            tracing::warn!("OTLP exporter unavailable, tracing locally only: {}", e);
            return;
        }
    };

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, Tokio)
        .build();

    let tracer = provider.tracer("gateway-agents");
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(otel_layer)
        .init();

    opentelemetry::global::set_tracer_provider(provider);
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "gateway_agents=debug"
    } else {
        "gateway_agents=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    #[cfg(feature = "otel")]
    init_otel_tracing(cli.verbose);

    #[cfg(not(feature = "otel"))]
    init_tracing(cli.verbose);

    let result = run(cli).await;

    #[cfg(feature = "otel")]
    opentelemetry::global::shutdown_tracer_provider();

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = RunnerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            agent_id,
            inputs,
            credentials,
            json,
        } => run_agent(&config, &agent_id, &inputs, &credentials, json).await,
        Commands::List => list_agents(&config).await,
        Commands::Validate { path } => validate(&path),
        Commands::Tools => list_tools(),
        Commands::Models => list_models(&config).await,
        Commands::Prompt {
            text,
            model,
            temperature,
            max_tokens,
        } => {
            let model = model.unwrap_or_else(|| config.default_model.clone());
            prompt(&config, text, model, temperature, max_tokens).await
        }
        Commands::Compare {
            text,
            models,
            max_tokens,
        } => compare(&config, &text, models, max_tokens).await,
        Commands::Keys { command } => keys(command),
    }
}

fn gateway_client(config: &RunnerConfig) -> anyhow::Result<GatewayClient> {
    let stored = KeyStore::open_default()
        .ok()
        .and_then(|keys| keys.get(GATEWAY_KEY).map(String::from));
    let key = config.gateway.resolve_api_key().or(stored);
    Ok(GatewayClient::from_config(&config.gateway, key)?)
}

/// Split `KEY=VALUE`
fn parse_pair(raw: &str) -> anyhow::Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .with_context(|| format!("Expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("Empty key in '{}'", raw);
    }
    Ok((key.to_string(), value.to_string()))
}

/// Input values are JSON when they parse as JSON, else plain strings
fn parse_input_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

async fn run_agent(
    config: &RunnerConfig,
    agent_id: &str,
    raw_inputs: &[String],
    raw_credentials: &[String],
    json: bool,
) -> anyhow::Result<bool> {
    let mut inputs = HashMap::new();
    for raw in raw_inputs {
        let (key, value) = parse_pair(raw)?;
        inputs.insert(key, parse_input_value(&value));
    }

    let mut credentials = KeyStore::open_default()
        .map(|keys| keys.credentials())
        .unwrap_or_default();
    for raw in raw_credentials {
        let (key, value) = parse_pair(raw)?;
        credentials.insert(key, value);
    }

    let store = FileStore::new(&config.agents_dir, &config.executions_dir);
    let backend = gateway_client(config)?;
    let executor = Executor::new(Arc::new(store), Arc::new(backend))
        .with_history_limit(config.history_limit);

    let record = executor.execute_agent(agent_id, inputs, credentials).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_record(&record);
    }

    Ok(record.is_success())
}

fn print_record(record: &ExecutionRecord) {
    println!("\n=== Execution Result ===\n");
    println!("Status: {:?}", record.status);
    println!("Execution ID: {}", record.id);
    if let Some(duration) = record.duration_ms {
        println!("Duration: {}ms", duration);
    }
    println!();

    for step in &record.steps {
        let mark = match step.status {
            StepStatus::Completed => "✓",
            StepStatus::Failed => "✗",
            StepStatus::Skipped => "-",
            StepStatus::Pending | StepStatus::Running => "?",
        };
        println!("  {} {} ({:?})", mark, step.step_name, step.status);
        if let Some(err) = &step.error {
            println!("      Error: {}", err);
        }
    }

    let m = &record.metrics;
    println!(
        "\nSteps: {} completed, {} failed, {} skipped of {}",
        m.completed_steps, m.failed_steps, m.skipped_steps, m.total_steps
    );
    println!("Tokens: {} (cost ${:.4})", m.total_tokens_used, m.total_cost);

    if !record.outputs.is_empty() {
        println!("\nOutputs:");
        for (key, value) in &record.outputs {
            println!("  {}: {}", key, value);
        }
    }
    if let Some(error) = &record.error {
        println!("\nError: {}", error);
    }
}

async fn list_agents(config: &RunnerConfig) -> anyhow::Result<bool> {
    let store = FileStore::new(&config.agents_dir, &config.executions_dir);
    let agents = store.list_agents().await?;

    if agents.is_empty() {
        println!("No agents found in: {}", config.agents_dir.display());
        return Ok(true);
    }

    println!("Agents in {}:\n", config.agents_dir.display());
    for agent in &agents {
        let description = agent.description.as_deref().unwrap_or("");
        println!(
            "  {} - {} ({} steps) {}",
            agent.id,
            agent.name,
            agent.steps.len(),
            description
        );
    }

    Ok(true)
}

fn validate(path: &Path) -> anyhow::Result<bool> {
    if !path.exists() {
        anyhow::bail!("Path not found: {}", path.display());
    }

    let agents = if path.is_dir() {
        AgentLoader::load_directory(path)?
    } else {
        vec![AgentLoader::load_file(path)?]
    };

    if agents.is_empty() {
        println!("No agents found in: {}", path.display());
        return Ok(true);
    }

    let mut valid = true;
    for agent in &agents {
        let problems = agent.problems();
        if problems.is_empty() {
            println!("✓ {} is valid", agent.id);
        } else {
            valid = false;
            println!("✗ {}", agent.id);
            for problem in problems {
                println!("    {}", problem);
            }
        }
    }

    Ok(valid)
}

fn list_tools() -> anyhow::Result<bool> {
    let credentials = KeyStore::open_default()
        .map(|keys| keys.credentials())
        .unwrap_or_default();

    println!("Built-in tools:\n");
    for kind in ToolKind::ALL {
        let required = kind.required_credentials();
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|c| !credentials.contains_key(*c))
            .collect();
        let status = if missing.is_empty() {
            "available".to_string()
        } else {
            format!("needs {}", missing.join(", "))
        };
        println!("  {:<14} {}", kind.as_str(), status);
    }

    Ok(true)
}

async fn list_models(config: &RunnerConfig) -> anyhow::Result<bool> {
    let client = gateway_client(config)?;
    for model in client.list_models().await? {
        println!("{}", model);
    }
    Ok(true)
}

async fn prompt(
    config: &RunnerConfig,
    text: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
) -> anyhow::Result<bool> {
    let client = gateway_client(config)?;
    let completion = client
        .complete(CompletionRequest {
            model,
            prompt: text,
            temperature,
            max_tokens,
        })
        .await?;

    println!("{}", completion.content);
    eprintln!(
        "\n[{}] {} tokens",
        completion.model, completion.usage.total_tokens
    );
    Ok(true)
}

async fn compare(
    config: &RunnerConfig,
    text: &str,
    models: Vec<String>,
    max_tokens: u32,
) -> anyhow::Result<bool> {
    let client = gateway_client(config)?;

    let requests = models.iter().map(|model| {
        client.complete(CompletionRequest {
            model: model.clone(),
            prompt: text.to_string(),
            temperature: 0.7,
            max_tokens,
        })
    });
    let results = futures::future::join_all(requests).await;

    let mut all_ok = true;
    for (model, result) in models.iter().zip(results) {
        println!("=== {} ===", model);
        match result {
            Ok(completion) => {
                println!("{}", completion.content);
                println!("({} tokens)\n", completion.usage.total_tokens);
            }
            Err(e) => {
                all_ok = false;
                println!("Error: {}\n", e);
            }
        }
    }

    Ok(all_ok)
}

fn keys(command: KeyCommands) -> anyhow::Result<bool> {
    let mut store = KeyStore::open_default()?;

    match command {
        KeyCommands::Set { name, value } => {
            store.set(&name, &value)?;
            println!("Stored key '{}' in {}", name, store.path().display());
            Ok(true)
        }
        KeyCommands::Get { name, reveal } => match store.get(&name) {
            Some(value) if reveal => {
                println!("{}", value);
                Ok(true)
            }
            Some(value) => {
                println!("{}: {}", name, mask(value));
                Ok(true)
            }
            None => {
                println!("No key named '{}'", name);
                Ok(false)
            }
        },
        KeyCommands::Remove { name } => {
            let removed = store.remove(&name)?;
            if removed {
                println!("Removed key '{}'", name);
            } else {
                println!("No key named '{}'", name);
            }
            Ok(removed)
        }
        KeyCommands::List => {
            let names = store.list();
            if names.is_empty() {
                println!("No keys stored");
            }
            for name in names {
                println!("{}", name);
            }
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_pair() {
        assert_eq!(
            parse_pair("topic=rust=fun").unwrap(),
            ("topic".to_string(), "rust=fun".to_string())
        );
        assert!(parse_pair("novalue").is_err());
        assert!(parse_pair("=x").is_err());
    }

    #[test]
    fn test_parse_input_value() {
        assert_eq!(parse_input_value("42"), json!(42));
        assert_eq!(parse_input_value("[1,2]"), json!([1, 2]));
        assert_eq!(parse_input_value("hello world"), json!("hello world"));
    }
}
