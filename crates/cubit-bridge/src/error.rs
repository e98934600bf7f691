//! Error types for the Cubit bridge.
//!
//! Every failure the bridge can surface is a variant of [`BridgeError`]. Decode
//! and classification errors carry the offending wire value or object so the
//! caller can see what the toolkit actually sent back.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    // Construction
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Reply decoding
    #[error("Expected cubit object or base type, got {value}")]
    Decode { value: serde_json::Value },

    #[error("The item is not a valid geometry: {object}")]
    Classification { object: String },

    #[error("Expected {expected}, got {found}")]
    UnexpectedValue {
        expected: &'static str,
        found: String,
    },

    // Channel and child process
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Channel to the toolkit process is closed")]
    ChannelClosed,

    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("Toolkit raised {kind}: {message}")]
    Remote {
        kind: String,
        message: String,
        traceback: Option<String>,
    },

    // Local file system (side-channel log)
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl BridgeError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        BridgeError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a transport error from a failed channel operation.
    pub fn transport(message: impl Into<String>, source: std::io::Error) -> Self {
        BridgeError::Transport {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Whether the connection that produced this error is unusable afterwards.
    ///
    /// Decode, classification and remote errors leave the channel in sync; the
    /// next call can proceed normally.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::Transport { .. } | BridgeError::ChannelClosed | BridgeError::Protocol { .. }
        )
    }
}

/// Attach a path to IO errors.
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| BridgeError::io_with_path(e, path))
    }
}
