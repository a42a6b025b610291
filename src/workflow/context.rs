//! Execution context for agent runs
//!
//! The context is the variable bag threaded through every step of one
//! execution. Variables are cumulative: steps add or overwrite them, nothing
//! removes them during a run.

use serde_json::Value;
use std::collections::HashMap;

/// Runtime context for one execution
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Variables visible to all subsequent steps
    pub variables: HashMap<String, Value>,

    /// Agent being executed
    pub agent_id: String,

    /// Execution ID
    pub execution_id: String,

    /// Current step ID
    pub current_step: Option<String>,
}

impl ExecutionContext {
    /// Create a context seeded with the caller's inputs
    pub fn new(
        agent_id: impl Into<String>,
        execution_id: impl Into<String>,
        variables: HashMap<String, Value>,
    ) -> Self {
        Self {
            variables,
            agent_id: agent_id.into(),
            execution_id: execution_id.into(),
            current_step: None,
        }
    }

    /// Set a variable
    pub fn set(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value);
    }

    /// Get a variable
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Look up a variable, walking into JSON objects for dotted names
    /// (`user.name`) when no variable carries the full name.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.variables.get(path) {
            return Some(value);
        }

        let mut parts = path.split('.');
        let mut current = self.variables.get(parts.next()?)?;
        for part in parts {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Merge variables from another source, overwriting existing names
    pub fn merge(&mut self, variables: &HashMap<String, Value>) {
        for (key, value) in variables {
            self.variables.insert(key.clone(), value.clone());
        }
    }

    /// Mark the step currently executing
    pub fn enter_step(&mut self, step_id: &str) {
        self.current_step = Some(step_id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_context() {
        let mut inputs = HashMap::new();
        inputs.insert("topic".to_string(), json!("rust"));
        let ctx = ExecutionContext::new("agent", "exec-1", inputs);

        assert_eq!(ctx.agent_id, "agent");
        assert_eq!(ctx.get("topic"), Some(&json!("rust")));
        assert!(ctx.current_step.is_none());
    }

    #[test]
    fn test_set_and_overwrite() {
        let mut ctx = ExecutionContext::default();
        ctx.set("status", json!("pending"));
        ctx.set("status", json!("success"));

        assert_eq!(ctx.get("status"), Some(&json!("success")));
        assert_eq!(ctx.get("missing"), None);
    }

    #[test]
    fn test_dotted_lookup() {
        let mut ctx = ExecutionContext::default();
        ctx.set("user", json!({"name": "ada", "tags": ["a", "b"]}));
        ctx.set("user.name", json!("shadowed"));

        assert_eq!(ctx.lookup("user.name"), Some(&json!("shadowed")));
        assert_eq!(ctx.lookup("user.tags.1"), Some(&json!("b")));
        assert_eq!(ctx.lookup("user.missing"), None);
    }

    #[test]
    fn test_merge() {
        let mut ctx = ExecutionContext::default();
        ctx.set("existing", json!(1));

        let mut more = HashMap::new();
        more.insert("new".to_string(), json!(2));
        more.insert("existing".to_string(), json!(3));
        ctx.merge(&more);

        assert_eq!(ctx.get("new"), Some(&json!(2)));
        assert_eq!(ctx.get("existing"), Some(&json!(3)));
    }
}
