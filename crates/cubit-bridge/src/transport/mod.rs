//! Channel to the toolkit interpreter.
//!
//! A [`Transport`] moves one JSON message at a time in each direction. It
//! knows nothing about handles or the reply envelope. The connection owns
//! exactly one transport and never has more than one request in flight.

pub mod dispatcher;
mod process;

pub use process::ProcessTransport;

use crate::config::LaunchConfig;
use crate::error::{BridgeError, Result};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Blocking request/response channel.
pub trait Transport: Send {
    /// Enqueue one message.
    fn send(&mut self, message: &Value) -> Result<()>;

    /// Block until the reply to the last sent message arrives.
    fn receive(&mut self) -> Result<Value>;

    /// Number of open channels: 1 while the peer is reachable, 0 once it
    /// exited or the channel was closed.
    fn channel_count(&mut self) -> usize;

    /// Close the channel and reap the peer. Idempotent.
    fn close(&mut self) -> Result<()>;
}

/// How to start the toolkit's interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl LaunchCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add an interpreter argument, placed before the bootstrap code.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Parse `python3`, `/opt/cubit/bin/python3 -E` or the execnet form
    /// `popen//python=/opt/cubit/bin/python3`.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        let spec = spec.strip_prefix(LaunchConfig::EXECNET_PREFIX).unwrap_or(spec);
        let mut parts = spec.split_whitespace();
        let program = parts.next().ok_or_else(|| BridgeError::Config {
            message: "Interpreter command is empty".to_string(),
        })?;
        Ok(Self {
            program: PathBuf::from(program),
            args: parts.map(str::to_string).collect(),
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Default for LaunchCommand {
    fn default() -> Self {
        Self::new(LaunchConfig::DEFAULT_INTERPRETER)
    }
}

impl FromStr for LaunchCommand {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_interpreter() {
        let command = LaunchCommand::parse("python3").unwrap();
        assert_eq!(command.program(), Path::new("python3"));
        assert!(command.args().is_empty());
        assert_eq!(command, LaunchCommand::default());
    }

    #[test]
    fn test_parse_execnet_spec() {
        let command: LaunchCommand = "popen//python=/opt/cubit/bin/python3".parse().unwrap();
        assert_eq!(command.program(), Path::new("/opt/cubit/bin/python3"));
    }

    #[test]
    fn test_parse_with_arguments() {
        let command = LaunchCommand::parse("  /usr/bin/python2.7 -E -s ").unwrap();
        assert_eq!(command.args(), ["-E", "-s"]);
        assert_eq!(command.to_string(), "/usr/bin/python2.7 -E -s");
    }

    #[test]
    fn test_parse_empty_is_config_error() {
        assert!(matches!(
            LaunchCommand::parse("   "),
            Err(BridgeError::Config { .. })
        ));
        assert!(LaunchCommand::parse("popen//python=").is_err());
    }
}
