//! Operation decoder.
//!
//! A chain-data payload names one contract function and its input:
//!
//! ```json
//! {"mint_sample_nft": {"to": "alice"}}
//! ```
//!
//! Anything else (zero keys, several keys, a non-object) is ambiguous and
//! rejected rather than resolved to "the first key".

use crate::error::DecodeError;

/// A decoded `{name: arguments}` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub name: String,
    pub arguments: serde_json::Value,
    /// The payload text this operation was decoded from. This is the
    /// envelope handed to the contract runtime, byte-for-byte.
    raw: String,
}

impl Operation {
    pub fn envelope(&self) -> &str {
        &self.raw
    }
}

/// Decode a chain-data payload into an [`Operation`].
pub fn decode(payload: &str) -> Result<Operation, DecodeError> {
    if payload.trim().is_empty() {
        return Err(DecodeError::Empty);
    }

    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(|e| DecodeError::InvalidJson {
            message: e.to_string(),
        })?;

    let object = match value {
        serde_json::Value::Object(map) => map,
        other => {
            return Err(DecodeError::NotAnObject {
                found: json_kind(&other),
            })
        }
    };

    if object.len() != 1 {
        return Err(DecodeError::KeyCount {
            found: object.len(),
        });
    }

    let (name, arguments) = object
        .into_iter()
        .next()
        .ok_or(DecodeError::KeyCount { found: 0 })?;

    Ok(Operation {
        name,
        arguments,
        raw: payload.to_string(),
    })
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
