//! Decoded call results.

use super::Proxy;
use crate::error::{BridgeError, Result};
use crate::wire::Primitive;
use std::fmt;

/// Result of a toolkit call after its handles were adopted by proxies.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Proxy(Proxy),
    Primitive(Primitive),
    List(Vec<Value>),
}

impl Value {
    fn unexpected(&self, expected: &'static str) -> BridgeError {
        BridgeError::UnexpectedValue {
            expected,
            found: self.to_string(),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::Primitive(Primitive::None))
    }

    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            Value::Primitive(primitive) => Some(primitive),
            _ => None,
        }
    }

    pub fn as_proxy(&self) -> Option<&Proxy> {
        match self {
            Value::Proxy(proxy) => Some(proxy),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_primitive().and_then(Primitive::as_bool)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_primitive().and_then(Primitive::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_primitive().and_then(Primitive::as_f64)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_primitive().and_then(Primitive::as_str)
    }

    pub fn into_proxy(self) -> Result<Proxy> {
        match self {
            Value::Proxy(proxy) => Ok(proxy),
            other => Err(other.unexpected("cubit object")),
        }
    }

    pub fn into_list(self) -> Result<Vec<Value>> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(other.unexpected("list")),
        }
    }

    pub fn expect_i64(&self) -> Result<i64> {
        self.as_i64().ok_or_else(|| self.unexpected("integer"))
    }

    pub fn expect_f64(&self) -> Result<f64> {
        self.as_f64().ok_or_else(|| self.unexpected("number"))
    }

    pub fn expect_bool(&self) -> Result<bool> {
        self.as_bool().ok_or_else(|| self.unexpected("boolean"))
    }

    /// A list of integers, such as entity or node ids.
    pub fn into_i64_list(self) -> Result<Vec<i64>> {
        self.into_list()?.iter().map(Value::expect_i64).collect()
    }

    /// A list of cubit objects.
    pub fn into_proxy_list(self) -> Result<Vec<Proxy>> {
        self.into_list()?.into_iter().map(Value::into_proxy).collect()
    }
}

impl From<Primitive> for Value {
    fn from(primitive: Primitive) -> Self {
        Value::Primitive(primitive)
    }
}

impl From<Proxy> for Value {
    fn from(proxy: Proxy) -> Self {
        Value::Proxy(proxy)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Proxy(proxy) => write!(f, "{proxy}"),
            Value::Primitive(primitive) => write!(f, "{primitive}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_accessors() {
        let value = Value::from(Primitive::Int(5));
        assert_eq!(value.as_i64(), Some(5));
        assert_eq!(value.as_f64(), Some(5.0));
        assert_eq!(value.expect_i64().unwrap(), 5);
        assert!(value.as_str().is_none());
        assert!(!value.is_none());
    }

    #[test]
    fn test_int_list() {
        let value = Value::List(vec![Primitive::Int(1).into(), Primitive::Int(4).into()]);
        assert_eq!(value.into_i64_list().unwrap(), vec![1, 4]);
    }

    #[test]
    fn test_mismatch_names_value() {
        let value = Value::List(vec![Primitive::Str("a".into()).into()]);
        match value.into_i64_list() {
            Err(BridgeError::UnexpectedValue { expected, found }) => {
                assert_eq!(expected, "integer");
                assert_eq!(found, "a");
            }
            other => panic!("Expected UnexpectedValue, got: {:?}", other),
        }
    }

    #[test]
    fn test_display_list() {
        let value = Value::List(vec![
            Primitive::Int(1).into(),
            Primitive::None.into(),
            Value::List(vec![]),
        ]);
        assert_eq!(value.to_string(), "[1, None, []]");
    }

    #[test]
    fn test_into_proxy_on_primitive_fails() {
        assert!(Value::from(Primitive::None).into_proxy().is_err());
    }
}
