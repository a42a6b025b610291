//! Transform steps
//!
//! Transforms operate on the step's `data` input:
//! - `to_json` - serialize any value to a JSON string
//! - `from_json` - parse a JSON string
//! - `to_uppercase` / `to_lowercase` - change the case of a string

use serde_json::{Map, Value};
use std::str::FromStr;

use crate::engine::dispatcher::StepOutcome;
use crate::engine::error::StepError;
use crate::workflow::TransformConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    ToJson,
    FromJson,
    ToUppercase,
    ToLowercase,
}

impl FromStr for Transform {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "to_json" => Ok(Transform::ToJson),
            "from_json" => Ok(Transform::FromJson),
            "to_uppercase" => Ok(Transform::ToUppercase),
            "to_lowercase" => Ok(Transform::ToLowercase),
            other => Err(StepError::UnknownTransform(other.to_string())),
        }
    }
}

impl Transform {
    pub fn apply(&self, data: &Value) -> Result<Value, StepError> {
        match self {
            Transform::ToJson => serde_json::to_string(data)
                .map(Value::String)
                .map_err(|e| StepError::InvalidData(e.to_string())),
            Transform::FromJson => {
                let text = expect_str(data, "from_json")?;
                serde_json::from_str(text)
                    .map_err(|e| StepError::InvalidData(format!("from_json: {}", e)))
            }
            Transform::ToUppercase => {
                Ok(Value::String(expect_str(data, "to_uppercase")?.to_uppercase()))
            }
            Transform::ToLowercase => {
                Ok(Value::String(expect_str(data, "to_lowercase")?.to_lowercase()))
            }
        }
    }
}

fn expect_str<'v>(data: &'v Value, transform: &str) -> Result<&'v str, StepError> {
    data.as_str()
        .ok_or_else(|| StepError::InvalidData(format!("{} expects a string", transform)))
}

pub fn execute_transform(
    config: &TransformConfig,
    inputs: &Map<String, Value>,
) -> Result<StepOutcome, StepError> {
    let transform: Transform = config.transform.parse()?;
    let data = inputs
        .get("data")
        .ok_or_else(|| StepError::RequiredInputMissing("data".to_string()))?;

    let mut outputs = Map::new();
    outputs.insert("result".to_string(), transform.apply(data)?);

    Ok(StepOutcome {
        outputs,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_round_trip() {
        let value = json!({"items": [1, 2, {"deep": true}], "name": "x"});
        let encoded = Transform::ToJson.apply(&value).unwrap();
        assert!(encoded.is_string());
        assert_eq!(Transform::FromJson.apply(&encoded).unwrap(), value);
    }

    #[test]
    fn test_case_transforms() {
        assert_eq!(Transform::ToUppercase.apply(&json!("MiXed")).unwrap(), json!("MIXED"));
        assert_eq!(Transform::ToLowercase.apply(&json!("MiXed")).unwrap(), json!("mixed"));
        assert!(matches!(
            Transform::ToUppercase.apply(&json!(3)),
            Err(StepError::InvalidData(_))
        ));
    }

    #[test]
    fn test_unknown_transform_and_missing_data() {
        let config = TransformConfig {
            transform: "reverse".to_string(),
        };
        let mut inputs = Map::new();
        inputs.insert("data".to_string(), json!("x"));
        assert!(matches!(
            execute_transform(&config, &inputs),
            Err(StepError::UnknownTransform(ref n)) if n == "reverse"
        ));

        let config = TransformConfig {
            transform: "to_json".to_string(),
        };
        assert!(matches!(
            execute_transform(&config, &Map::new()),
            Err(StepError::RequiredInputMissing(_))
        ));
    }
}
