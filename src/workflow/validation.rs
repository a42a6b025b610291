//! Validation of caller-supplied inputs against declared variables

use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

use super::definition::{ValidationRule, Variable, VariableType};

/// Validate `inputs` against `variables` and return the starting variable set.
///
/// Absent variables with a default receive it. Inputs not declared by any
/// variable pass through unchanged. The first violation is returned as a
/// human-readable message.
pub fn validate_inputs(
    variables: &[Variable],
    inputs: &HashMap<String, Value>,
) -> Result<HashMap<String, Value>, String> {
    let mut resolved = inputs.clone();

    for variable in variables {
        let supplied = inputs.get(&variable.name).filter(|v| !v.is_null());

        let value = match (supplied, &variable.default) {
            (Some(value), _) => value,
            (None, Some(default)) => {
                resolved.insert(variable.name.clone(), default.clone());
                continue;
            }
            (None, None) if variable.required => {
                return Err(format!("Required variable '{}' is missing", variable.name));
            }
            (None, None) => continue,
        };

        check_type(variable, value)?;

        if let Some(rule) = &variable.validation {
            check_rule(&variable.name, rule, value)?;
        }
    }

    Ok(resolved)
}

fn check_type(variable: &Variable, value: &Value) -> Result<(), String> {
    let ok = match variable.var_type {
        VariableType::String | VariableType::File => value.is_string(),
        VariableType::Number => value.is_number(),
        VariableType::Boolean => value.is_boolean(),
        VariableType::Json => true,
    };

    if ok {
        Ok(())
    } else {
        Err(format!(
            "Variable '{}' must be of type {}, got {}",
            variable.name,
            type_label(variable.var_type),
            value_label(value)
        ))
    }
}

fn check_rule(name: &str, rule: &ValidationRule, value: &Value) -> Result<(), String> {
    let length = match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    };

    if let (Some(min), Some(len)) = (rule.min_length, length) {
        if len < min {
            return Err(format!(
                "Variable '{}' must be at least {} characters long",
                name, min
            ));
        }
    }

    if let (Some(max), Some(len)) = (rule.max_length, length) {
        if len > max {
            return Err(format!(
                "Variable '{}' must be at most {} characters long",
                name, max
            ));
        }
    }

    if let (Some(pattern), Value::String(s)) = (&rule.pattern, value) {
        let re = Regex::new(pattern)
            .map_err(|e| format!("Variable '{}' has an invalid pattern: {}", name, e))?;
        if !re.is_match(s) {
            return Err(format!(
                "Variable '{}' does not match pattern {}",
                name, pattern
            ));
        }
    }

    if !rule.options.is_empty() && !rule.options.contains(value) {
        let allowed: Vec<String> = rule.options.iter().map(|v| v.to_string()).collect();
        return Err(format!(
            "Variable '{}' must be one of: {}",
            name,
            allowed.join(", ")
        ));
    }

    Ok(())
}

fn type_label(var_type: VariableType) -> &'static str {
    match var_type {
        VariableType::String => "string",
        VariableType::Number => "number",
        VariableType::Boolean => "boolean",
        VariableType::File => "file",
        VariableType::Json => "json",
    }
}

fn value_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn variable(name: &str, var_type: VariableType, required: bool) -> Variable {
        Variable {
            name: name.to_string(),
            var_type,
            required,
            default: None,
            validation: None,
            description: None,
        }
    }

    fn inputs(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_required_missing() {
        let vars = vec![variable("topic", VariableType::String, true)];
        let err = validate_inputs(&vars, &HashMap::new()).unwrap_err();
        assert!(err.contains("topic"));
    }

    #[test]
    fn test_required_with_default() {
        let mut var = variable("depth", VariableType::Number, true);
        var.default = Some(json!(2));
        let resolved = validate_inputs(&[var], &HashMap::new()).unwrap();
        assert_eq!(resolved.get("depth"), Some(&json!(2)));
    }

    #[test]
    fn test_type_mismatch() {
        let vars = vec![variable("count", VariableType::Number, false)];
        let err = validate_inputs(&vars, &inputs(&[("count", json!("three"))])).unwrap_err();
        assert!(err.contains("must be of type number"));
    }

    #[test]
    fn test_undeclared_inputs_pass_through() {
        let resolved = validate_inputs(&[], &inputs(&[("extra", json!(true))])).unwrap();
        assert_eq!(resolved.get("extra"), Some(&json!(true)));
    }

    #[test]
    fn test_length_and_pattern() {
        let mut var = variable("code", VariableType::String, true);
        var.validation = Some(ValidationRule {
            min_length: Some(2),
            max_length: Some(4),
            pattern: Some("^[A-Z]+$".to_string()),
            options: vec![],
        });
        let vars = vec![var];

        assert!(validate_inputs(&vars, &inputs(&[("code", json!("ABC"))])).is_ok());
        assert!(validate_inputs(&vars, &inputs(&[("code", json!("A"))]))
            .unwrap_err()
            .contains("at least 2"));
        assert!(validate_inputs(&vars, &inputs(&[("code", json!("ABCDE"))]))
            .unwrap_err()
            .contains("at most 4"));
        assert!(validate_inputs(&vars, &inputs(&[("code", json!("abc"))]))
            .unwrap_err()
            .contains("pattern"));
    }

    #[test]
    fn test_options() {
        let mut var = variable("tone", VariableType::String, false);
        var.validation = Some(ValidationRule {
            options: vec![json!("formal"), json!("casual")],
            ..Default::default()
        });
        let vars = vec![var];

        assert!(validate_inputs(&vars, &inputs(&[("tone", json!("casual"))])).is_ok());
        assert!(validate_inputs(&vars, &inputs(&[("tone", json!("angry"))])).is_err());
    }
}
