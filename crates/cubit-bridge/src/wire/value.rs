//! Typed view of dispatcher replies.

use super::handle::Handle;
use crate::config::WireConfig;
use crate::error::{BridgeError, Result};
use serde_json::{Map, Number, Value};
use std::fmt;

/// A value that needs no conversion between the two interpreters.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Primitive {
    /// Parse a JSON scalar or a tagged non-finite float. Returns `None` for
    /// arrays and any other object.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Primitive::None),
            Value::Bool(b) => Some(Primitive::Bool(*b)),
            Value::String(s) => Some(Primitive::Str(s.clone())),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Primitive::Int(i)),
                None => n.as_f64().map(Primitive::Float),
            },
            Value::Object(map) if map.len() == 1 => map
                .get(WireConfig::FLOAT_TAG)
                .and_then(Value::as_str)
                .and_then(non_finite_from_tag)
                .map(Primitive::Float),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Canonical JSON form. NaN and the infinities are sent tagged.
    pub fn to_json(&self) -> Value {
        match self {
            Primitive::None => Value::Null,
            Primitive::Bool(b) => Value::Bool(*b),
            Primitive::Int(i) => Value::Number((*i).into()),
            Primitive::Float(f) => match Number::from_f64(*f) {
                Some(n) => Value::Number(n),
                None => {
                    let mut tagged = Map::new();
                    tagged.insert(
                        WireConfig::FLOAT_TAG.to_string(),
                        Value::String(non_finite_tag(*f).to_string()),
                    );
                    Value::Object(tagged)
                }
            },
            Primitive::Str(s) => Value::String(s.clone()),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Primitive::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Primitive::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Primitive::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to floats, as they would in the toolkit.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Primitive::Int(i) => Some(*i as f64),
            Primitive::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Primitive::Str(s) => Some(s),
            _ => None,
        }
    }
}

fn non_finite_tag(f: f64) -> &'static str {
    if f.is_nan() {
        "nan"
    } else if f > 0.0 {
        "inf"
    } else {
        "-inf"
    }
}

fn non_finite_from_tag(tag: &str) -> Option<f64> {
    match tag {
        "nan" => Some(f64::NAN),
        "inf" => Some(f64::INFINITY),
        "-inf" => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::None => f.write_str("None"),
            Primitive::Bool(b) => write!(f, "{b}"),
            Primitive::Int(i) => write!(f, "{i}"),
            Primitive::Float(x) => write!(f, "{x}"),
            Primitive::Str(s) => f.write_str(s),
        }
    }
}

/// A decoded reply before any handle has been adopted by a proxy.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Handle(Handle),
    List(Vec<WireValue>),
    Primitive(Primitive),
}

impl WireValue {
    /// Decode a reply.
    ///
    /// Lists are decoded one level deep: each element must be a handle or a
    /// primitive. Everything else is a [`BridgeError::Decode`] carrying the
    /// offending value.
    pub fn from_json(value: Value) -> Result<Self> {
        if let Some(handle) = Handle::from_wire(&value) {
            return Ok(WireValue::Handle(handle));
        }
        if let Value::Array(items) = &value {
            let mut decoded = Vec::with_capacity(items.len());
            for item in items {
                if let Some(handle) = Handle::from_wire(item) {
                    decoded.push(WireValue::Handle(handle));
                    continue;
                }
                match Primitive::from_json(item) {
                    Some(primitive) => decoded.push(WireValue::Primitive(primitive)),
                    None => return Err(BridgeError::Decode { value: item.clone() }),
                }
            }
            return Ok(WireValue::List(decoded));
        }
        match Primitive::from_json(&value) {
            Some(primitive) => Ok(WireValue::Primitive(primitive)),
            None => Err(BridgeError::Decode { value }),
        }
    }

    pub fn as_handle(&self) -> Option<&Handle> {
        match self {
            WireValue::Handle(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            WireValue::Primitive(primitive) => Some(primitive),
            _ => None,
        }
    }
}
