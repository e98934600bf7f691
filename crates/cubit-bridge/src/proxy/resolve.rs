//! Outcome of resolving a named capability.

use super::{Proxy, Value};
use crate::error::{BridgeError, Result};
use crate::serializer::Arg;
use std::fmt;

/// Either a bound method or an already fetched attribute value.
#[derive(Debug, Clone)]
pub enum Resolved {
    Method(Method),
    Value(Value),
}

impl Resolved {
    pub fn is_method(&self) -> bool {
        matches!(self, Resolved::Method(_))
    }

    pub fn into_method(self) -> Result<Method> {
        match self {
            Resolved::Method(method) => Ok(method),
            Resolved::Value(value) => Err(BridgeError::UnexpectedValue {
                expected: "callable member",
                found: value.to_string(),
            }),
        }
    }

    pub fn into_value(self) -> Result<Value> {
        match self {
            Resolved::Value(value) => Ok(value),
            Resolved::Method(method) => Err(BridgeError::UnexpectedValue {
                expected: "attribute value",
                found: method.to_string(),
            }),
        }
    }
}

/// A callable member bound to its receiver.
///
/// Holds an alias of the receiver, so the remote object stays alive for as
/// long as the method does.
#[derive(Debug, Clone)]
pub struct Method {
    receiver: Proxy,
    name: String,
}

impl Method {
    pub(crate) fn new(receiver: Proxy, name: &str) -> Self {
        Self {
            receiver,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn receiver(&self) -> &Proxy {
        &self.receiver
    }

    pub fn call(&self, args: &[Arg]) -> Result<Value> {
        self.receiver.invoke(&self.name, args)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.receiver, self.name)
    }
}
