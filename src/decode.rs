//! Decoding of stored payloads into the schema types.
//!
//! The records derive `Deserialize`; this module only splits JSON Lines and
//! turns serde failures into a [`SchemaError`] carrying the dotted path of the
//! offending field (`model.name`, `datasets[1].metrics.acc.score`, `[4].id`).

use crate::store::PayloadFormat;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::error::Category;
use std::fmt;

/// Path used for errors that concern the whole document
pub const ROOT_PATH: &str = "$";

/// A schema violation at a specific field path
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaError {
    pub path: String,
    pub message: String,
}

impl SchemaError {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

pub type DecodeResult<T> = Result<T, SchemaError>;

/// Decode raw payload bytes into `T`
pub fn decode<T: DeserializeOwned>(bytes: &[u8], format: PayloadFormat) -> DecodeResult<T> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| SchemaError::new(ROOT_PATH, format!("payload is not valid UTF-8: {e}")))?;

    match format {
        PayloadFormat::Json => {
            let mut deserializer = serde_json::Deserializer::from_str(text);
            let value = serde_path_to_error::deserialize(&mut deserializer).map_err(schema_error)?;
            deserializer
                .end()
                .map_err(|e| SchemaError::new(ROOT_PATH, format!("invalid JSON: {e}")))?;
            Ok(value)
        }
        PayloadFormat::JsonLines => {
            let items = split_json_lines(text)?;
            serde_path_to_error::deserialize(Value::Array(items)).map_err(schema_error)
        }
    }
}

/// Parse one JSON document per non-blank line
fn split_json_lines(text: &str) -> DecodeResult<Vec<Value>> {
    let mut items = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let item = serde_json::from_str(line).map_err(|e| {
            SchemaError::new(
                format!("[{}]", items.len()),
                format!("invalid JSON on line {}: {e}", line_no + 1),
            )
        })?;
        items.push(item);
    }
    Ok(items)
}

fn schema_error(err: serde_path_to_error::Error<serde_json::Error>) -> SchemaError {
    let inner = err.inner();
    if inner.classify() != Category::Data {
        return SchemaError::new(ROOT_PATH, format!("invalid JSON: {inner}"));
    }

    let message = inner.to_string();
    let mut path = err.path().to_string();
    if path == "." {
        path.clear();
    }

    // Missing fields are reported against the enclosing object
    if let Some(field) = missing_field(&message) {
        if path.is_empty() {
            path = field.to_string();
        } else {
            path = format!("{path}.{field}");
        }
    }
    if path.is_empty() {
        path = ROOT_PATH.to_string();
    }

    SchemaError { path, message }
}

fn missing_field(message: &str) -> Option<&str> {
    message.strip_prefix("missing field `")?.split('`').next()
}
