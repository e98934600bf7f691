//! Handle codec.
//!
//! A remote object travels as `["cp2t3id_<n>", "<display>"]`, where `<n>` is
//! unique for the lifetime of the toolkit process. Two handles with the same
//! `<n>` name the same object regardless of their display strings.

use crate::config::WireConfig;
use serde_json::Value;
use std::hash::{Hash, Hasher};

/// Identifier of one object living in the toolkit process.
#[derive(Debug, Clone)]
pub struct Handle {
    id: u64,
    display: String,
}

impl Handle {
    /// Parse a handle pair. Returns `None` for anything [`classify`] rejects.
    pub fn from_wire(value: &Value) -> Option<Self> {
        let id = classify(value)?;
        let display = value
            .get(1)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Some(Self { id, display })
    }

    /// Encode back to the pair the dispatcher expects.
    pub fn to_wire(&self) -> Value {
        Value::Array(vec![
            Value::String(self.token()),
            Value::String(self.display.clone()),
        ])
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// String form of the object as reported by the toolkit.
    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn token(&self) -> String {
        format!("{}{}", WireConfig::HANDLE_PREFIX, self.id)
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Handle {}

impl Hash for Handle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Return the remote id if `value` is a handle pair.
///
/// Total: any other shape, including a prefixed token whose tail is not a
/// decimal integer, yields `None`.
pub fn classify(value: &Value) -> Option<u64> {
    let token = value.as_array()?.first()?.as_str()?;
    let digits = token.strip_prefix(WireConfig::HANDLE_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Whether `value` crosses the wire without conversion.
pub fn is_primitive(value: &Value) -> bool {
    matches!(
        value,
        Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null
    )
}
