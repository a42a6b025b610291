mod common;

use common::*;
use gateway_agents::prelude::*;
use gateway_agents::workflow::{ErrorPolicy, InputSource, LogLevel, OutputFormat};
use std::fs;

#[test]
fn test_load_empty_directory() {
    let dir = create_test_dir();
    let agents = AgentLoader::load_directory(dir.path()).unwrap();
    assert!(agents.is_empty());
}

#[test]
fn test_load_single_agent() {
    let dir = create_test_dir();
    write_agent(dir.path(), "summarizer.yaml", SUMMARIZER);

    let agents = AgentLoader::load_directory(dir.path()).unwrap();

    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0].id, "summarizer");
    assert_eq!(agents[0].variables[0].name, "topic");
    assert!(agents[0].variables[0].required);
}

#[test]
fn test_load_multiple_agents_sorted_by_id() {
    let dir = create_test_dir();
    write_agent(dir.path(), "z.yaml", &transform_only("alpha"));
    write_agent(dir.path(), "a.yml", &transform_only("gamma"));
    write_agent(dir.path(), "m.yaml", &transform_only("beta"));

    let agents = AgentLoader::load_directory(dir.path()).unwrap();
    let ids: Vec<_> = agents.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["alpha", "beta", "gamma"]);
}

#[test]
fn test_ignores_non_agent_files() {
    let dir = create_test_dir();
    write_agent(dir.path(), "shout.yaml", &transform_only("shout"));
    write_agent(dir.path(), "README.md", "# Agents");
    fs::create_dir(dir.path().join("nested")).unwrap();
    write_agent(&dir.path().join("nested"), "inner.yaml", &transform_only("inner"));

    let agents = AgentLoader::load_directory(dir.path()).unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0].id, "shout");
}

#[test]
fn test_load_json_agent() {
    let dir = create_test_dir();
    write_agent(
        dir.path(),
        "report.json",
        r#"{
  "id": "report",
  "name": "Report",
  "settings": {"errorHandling": "continue", "logLevel": "debug"},
  "steps": [
    {
      "id": "render",
      "type": "output",
      "order": 1,
      "config": {"format": "markdown"},
      "inputs": [{"name": "title", "sourceType": "constant", "source": "Weekly"}]
    }
  ]
}"#,
    );

    let agent = AgentLoader::load_file(&dir.path().join("report.json")).unwrap();

    assert_eq!(agent.settings.error_handling, ErrorPolicy::Continue);
    assert_eq!(agent.settings.log_level, LogLevel::Debug);
    let StepKind::Output(config) = &agent.steps[0].kind else {
        panic!("expected an output step");
    };
    assert_eq!(config.format, OutputFormat::Markdown);
    assert_eq!(agent.steps[0].inputs[0].source_type, InputSource::Constant);
}

#[test]
fn test_settings_defaults() {
    let dir = create_test_dir();
    write_agent(dir.path(), "shout.yaml", &transform_only("shout"));

    let agent = AgentLoader::load_file(&dir.path().join("shout.yaml")).unwrap();

    assert_eq!(agent.settings.error_handling, ErrorPolicy::Stop);
    assert_eq!(agent.settings.log_level, LogLevel::Info);
    assert!(agent.steps.iter().all(|s| s.enabled));
}

#[test]
fn test_unknown_step_type_is_rejected() {
    let dir = create_test_dir();
    write_agent(
        dir.path(),
        "odd.yaml",
        r#"
id: odd
name: Odd
steps:
  - id: x
    type: teleport
    config: {}
"#,
    );

    let err = AgentLoader::load_directory(dir.path()).unwrap_err();
    assert!(err.to_string().contains("odd.yaml"));
}

#[test]
fn test_problems_on_loaded_agent() {
    let dir = create_test_dir();
    write_agent(
        dir.path(),
        "router.yaml",
        r#"
id: router
name: Router
steps:
  - id: check
    type: condition
    config:
      condition: "true"
      trueSteps: [missing]
  - id: check
    type: prompt
    config: { prompt: hi, model: m }
"#,
    );

    let agent = AgentLoader::load_file(&dir.path().join("router.yaml")).unwrap();
    let problems = agent.problems();

    assert_eq!(problems.len(), 2);
    assert!(problems.iter().any(|p| p.contains("Duplicate step id 'check'")));
    assert!(problems.iter().any(|p| p.contains("unknown step 'missing'")));
}
