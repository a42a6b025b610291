//! Step input resolution

use serde_json::{Map, Value};

use crate::engine::error::StepError;
use crate::workflow::{ExecutionContext, InputSource, Step, StepInput};

/// Compute the concrete input values of `step`.
///
/// Unresolved inputs fall back to their default; unresolved optional inputs
/// are omitted and unresolved required inputs fail the step.
pub fn resolve_inputs(step: &Step, ctx: &ExecutionContext) -> Result<Map<String, Value>, StepError> {
    let mut resolved = Map::new();

    for input in &step.inputs {
        match resolve_input(input, ctx).or_else(|| input.default_value.clone()) {
            Some(value) => {
                resolved.insert(input.name.clone(), value);
            }
            None if input.required => {
                return Err(StepError::RequiredInputMissing(input.name.clone()));
            }
            None => {}
        }
    }

    Ok(resolved)
}

fn resolve_input(input: &StepInput, ctx: &ExecutionContext) -> Option<Value> {
    match input.source_type {
        InputSource::Variable | InputSource::UserInput => {
            let key = input.source.as_str()?;
            ctx.lookup(key).cloned()
        }
        InputSource::Constant => match &input.source {
            Value::Null => None,
            literal => Some(literal.clone()),
        },
        InputSource::PreviousStep | InputSource::File => None,
    }
}
