//! Message shapes, reply envelope and framing.
//!
//! Requests are JSON arrays; the first element either names a protocol verb
//! or is the handle of the receiver of a method call. Every reply is wrapped
//! in an envelope so that toolkit exceptions do not look like return values:
//!
//! ```text
//! {"ok": <value>}
//! {"error": {"type": "...", "message": "...", "traceback": "..."}}
//! ```
//!
//! Frames carry one UTF-8 JSON document each:
//!
//! ```text
//! [u32 BE: len][UTF-8 JSON bytes of len]
//! ```

use super::handle::Handle;
use crate::config::WireConfig;
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::io::{ErrorKind, Read, Write};

/// A message sent to the remote dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Startup parameters, sent once before `init`.
    Parameters(Map<String, Value>),
    Init { launch_args: Vec<String> },
    Call {
        receiver: Handle,
        method: String,
        args: Vec<Value>,
    },
    IsCallable { handle: Handle, name: String },
    IsInstance { handle: Handle, category: String },
    GetSelfDir { handle: Handle },
    Delete { handle: Handle },
}

impl Request {
    pub fn to_wire(&self) -> Value {
        match self {
            Request::Parameters(params) => json!([params]),
            Request::Init { launch_args } => json!(["init", launch_args]),
            Request::Call {
                receiver,
                method,
                args,
            } => json!([receiver.to_wire(), method, args]),
            Request::IsCallable { handle, name } => json!(["iscallable", handle.to_wire(), name]),
            Request::IsInstance { handle, category } => {
                json!(["isinstance", handle.to_wire(), category])
            }
            Request::GetSelfDir { handle } => json!(["get_self_dir", handle.to_wire()]),
            Request::Delete { handle } => json!(["delete", handle.to_wire()]),
        }
    }

    /// Parse a request as the dispatcher sees it. Returns `None` for shapes
    /// the dispatcher would reject.
    pub fn from_wire(value: &Value) -> Option<Self> {
        let items = value.as_array()?;
        let head = items.first()?;

        if let Some(params) = head.as_object() {
            return Some(Request::Parameters(params.clone()));
        }
        if let Some(receiver) = Handle::from_wire(head) {
            return Some(Request::Call {
                receiver,
                method: items.get(1)?.as_str()?.to_string(),
                args: items.get(2)?.as_array()?.clone(),
            });
        }

        let handle_at = |i: usize| items.get(i).and_then(Handle::from_wire);
        let str_at = |i: usize| items.get(i).and_then(Value::as_str).map(str::to_string);

        match head.as_str()? {
            "init" => Some(Request::Init {
                launch_args: items
                    .get(1)?
                    .as_array()?
                    .iter()
                    .map(|arg| arg.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()?,
            }),
            "iscallable" => Some(Request::IsCallable {
                handle: handle_at(1)?,
                name: str_at(2)?,
            }),
            "isinstance" => Some(Request::IsInstance {
                handle: handle_at(1)?,
                category: str_at(2)?,
            }),
            "get_self_dir" => Some(Request::GetSelfDir {
                handle: handle_at(1)?,
            }),
            "delete" => Some(Request::Delete {
                handle: handle_at(1)?,
            }),
            _ => None,
        }
    }

    /// Short name for logging.
    pub fn verb(&self) -> &str {
        match self {
            Request::Parameters(_) => "parameters",
            Request::Init { .. } => "init",
            Request::Call { method, .. } => method,
            Request::IsCallable { .. } => "iscallable",
            Request::IsInstance { .. } => "isinstance",
            Request::GetSelfDir { .. } => "get_self_dir",
            Request::Delete { .. } => "delete",
        }
    }
}

/// Exception raised inside the toolkit process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFault {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

/// Reply envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum Reply {
    #[serde(rename = "ok")]
    Ok(Value),
    #[serde(rename = "error")]
    Error(RemoteFault),
}

impl Reply {
    pub fn from_json(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| BridgeError::Protocol {
            message: format!("Malformed reply envelope: {e}"),
        })
    }

    /// The envelope as the dispatcher writes it.
    pub fn to_json(&self) -> Value {
        match self {
            Reply::Ok(value) => json!({ "ok": value }),
            Reply::Error(fault) => json!({ "error": fault }),
        }
    }

    /// Unwrap the envelope, turning toolkit exceptions into errors.
    pub fn into_result(self) -> Result<Value> {
        match self {
            Reply::Ok(value) => Ok(value),
            Reply::Error(fault) => Err(BridgeError::Remote {
                kind: fault.kind,
                message: fault.message,
                traceback: fault.traceback,
            }),
        }
    }
}

/// One entry of a `get_self_dir` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub callable: bool,
}

impl Member {
    /// Parse the `[[name, callable], ...]` reply.
    pub fn list_from_json(value: Value) -> Result<Vec<Self>> {
        let pairs: Vec<(String, bool)> =
            serde_json::from_value(value.clone()).map_err(|_| BridgeError::Decode { value })?;
        Ok(pairs
            .into_iter()
            .map(|(name, callable)| Member { name, callable })
            .collect())
    }
}

/// Read a length-prefixed frame.
///
/// Returns `None` on clean EOF (peer closed the channel).
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(BridgeError::transport("Failed to read frame header", e)),
    }

    let len = u32::from_be_bytes(len_buf) as usize;

    if len > WireConfig::MAX_MESSAGE_SIZE {
        return Err(BridgeError::Protocol {
            message: format!(
                "Message size {} exceeds maximum {}",
                len,
                WireConfig::MAX_MESSAGE_SIZE
            ),
        });
    }

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .map_err(|e| BridgeError::transport("Failed to read frame payload", e))?;

    Ok(Some(payload))
}

/// Write a length-prefixed frame and flush it.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    if payload.len() > WireConfig::MAX_MESSAGE_SIZE {
        return Err(BridgeError::Protocol {
            message: format!(
                "Message size {} exceeds maximum {}",
                payload.len(),
                WireConfig::MAX_MESSAGE_SIZE
            ),
        });
    }
    let len = payload.len() as u32;
    let write = |writer: &mut W| -> std::io::Result<()> {
        writer.write_all(&len.to_be_bytes())?;
        writer.write_all(payload)?;
        writer.flush()
    };
    write(writer).map_err(|e| BridgeError::transport("Failed to write frame", e))
}
