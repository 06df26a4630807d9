// ABOUTME: Evaluation datasets - question/reference records loaded from a
// ABOUTME: JSON array file. Only user_input and reference are mandatory.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EvalError;

/// One question with its ground-truth answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalCase {
    pub id: String,
    pub user_input: String,
    pub reference: String,

    /// Any other keys the record carried.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl EvalCase {
    pub fn new(
        id: impl Into<String>,
        user_input: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_input: user_input.into(),
            reference: reference.into(),
            metadata: Map::new(),
        }
    }
}

/// Read a dataset file.
pub async fn load_dataset(path: impl AsRef<Path>) -> Result<Vec<EvalCase>, EvalError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| EvalError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    parse_dataset(&text)
}

/// Parse a JSON array of records. Records without an `id` are numbered
/// from 1 in file order.
pub fn parse_dataset(json: &str) -> Result<Vec<EvalCase>, EvalError> {
    let records: Vec<Value> = serde_json::from_str(json)?;
    records
        .into_iter()
        .enumerate()
        .map(|(i, record)| case_from_record(i + 1, record))
        .collect()
}

fn case_from_record(position: usize, record: Value) -> Result<EvalCase, EvalError> {
    let Value::Object(mut fields) = record else {
        return Err(EvalError::Dataset(format!(
            "record {} is not a JSON object",
            position
        )));
    };

    let mut take = |key: &str| -> Result<String, EvalError> {
        match fields.remove(key) {
            Some(Value::String(s)) => Ok(s),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(other) => Err(EvalError::Dataset(format!(
                "record {}: '{}' must be a string, got {}",
                position, key, other
            ))),
            None => Err(EvalError::Dataset(format!(
                "record {} is missing '{}'",
                position, key
            ))),
        }
    };

    let user_input = take("user_input")?;
    let reference = take("reference")?;
    let id = match take("id") {
        Ok(id) => id,
        Err(_) => position.to_string(),
    };

    Ok(EvalCase {
        id,
        user_input,
        reference,
        metadata: fields,
    })
}
