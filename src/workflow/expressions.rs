//! Placeholder interpolation and condition evaluation
//!
//! Supports:
//! - `{variable}` placeholders, resolved from step inputs first, then the context
//! - `{object.field}` paths into JSON variables
//! - conditions of the form `true`, `false`, `a == b`, `a != b`
//!
//! Unknown placeholders are left in place so the text stays readable.

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::LazyLock;

use super::context::ExecutionContext;

static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_.\-]*)\}").unwrap());

/// Render a value the way it appears inside interpolated text
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Replace `{variable}` placeholders using context variables
pub fn interpolate(template: &str, ctx: &ExecutionContext) -> String {
    interpolate_with(template, ctx, &Map::new())
}

/// Replace `{variable}` placeholders; `inputs` shadow context variables
pub fn interpolate_with(template: &str, ctx: &ExecutionContext, inputs: &Map<String, Value>) -> String {
    PLACEHOLDER_REGEX
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            inputs
                .get(name)
                .or_else(|| ctx.lookup(name))
                .map(render_value)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Interpolate every string inside a JSON value, preserving structure
pub fn interpolate_value(value: &Value, ctx: &ExecutionContext, inputs: &Map<String, Value>) -> Value {
    match value {
        Value::String(s) => Value::String(interpolate_with(s, ctx, inputs)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| interpolate_value(v, ctx, inputs))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), interpolate_value(v, ctx, inputs)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Evaluate an already interpolated condition.
///
/// Only the literals `true`/`false` and a single two-operand `==` or `!=`
/// comparison are understood; anything else is `false`.
pub fn evaluate_condition(condition: &str) -> bool {
    let condition = condition.trim();

    match condition {
        "true" => return true,
        "false" => return false,
        _ => {}
    }

    match split_comparison(condition) {
        Some((left, "==", right)) => left == right,
        Some((left, _, right)) => left != right,
        None => false,
    }
}

/// Split at the first `==` or `!=` into two unquoted operands. A second
/// operator in the right operand makes the condition unsupported.
fn split_comparison(condition: &str) -> Option<(&str, &'static str, &str)> {
    let (pos, op) = match (condition.find("=="), condition.find("!=")) {
        (Some(eq), Some(ne)) if ne < eq => (ne, "!="),
        (Some(eq), _) => (eq, "=="),
        (None, Some(ne)) => (ne, "!="),
        (None, None) => return None,
    };

    let left = &condition[..pos];
    let right = &condition[pos + op.len()..];
    if right.contains("==") || right.contains("!=") {
        return None;
    }
    Some((unquote(left.trim()), op, unquote(right.trim())))
}

fn unquote(operand: &str) -> &str {
    operand.trim_matches('"').trim_matches('\'')
}
