//! Condition steps

use serde_json::{Map, Value};

use crate::engine::dispatcher::{Branch, StepEnv, StepOutcome};
use crate::engine::error::StepError;
use crate::workflow::{evaluate_condition, interpolate_with, ConditionConfig};

/// Evaluate the condition and choose a branch
pub fn execute_condition(
    config: &ConditionConfig,
    inputs: &Map<String, Value>,
    env: &StepEnv<'_>,
) -> Result<StepOutcome, StepError> {
    let condition = interpolate_with(&config.condition, env.ctx, inputs);
    let result = evaluate_condition(&condition);

    let (taken, not_taken) = if result {
        (&config.true_steps, &config.false_steps)
    } else {
        (&config.false_steps, &config.true_steps)
    };

    let mut outputs = Map::new();
    outputs.insert("conditionResult".to_string(), Value::Bool(result));
    outputs.insert("trueSteps".to_string(), string_list(&config.true_steps));
    outputs.insert("falseSteps".to_string(), string_list(&config.false_steps));

    Ok(StepOutcome {
        outputs,
        branch: Some(Branch {
            taken: taken.clone(),
            not_taken: not_taken.clone(),
        }),
        ..Default::default()
    })
}

fn string_list(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}
