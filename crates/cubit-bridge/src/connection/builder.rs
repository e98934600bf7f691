//! Builder for configuring a toolkit connection.

use super::log::{is_log_directive, DiagnosticSink, SideChannelLog, StdoutSink};
use super::session::{Channel, Session};
use super::Connection;
use crate::config::LaunchConfig;
use crate::error::{BridgeError, Result};
use crate::transport::{LaunchCommand, ProcessTransport, Transport};
use crate::wire::{Handle, Request};
use serde_json::{Map, Value as Json};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builder for configuring a [`Connection`].
///
/// # Example
///
/// ```rust,ignore
/// use cubit_bridge::Connection;
///
/// let cubit = Connection::builder()
///     .cubit_bin_path("/opt/cubit/bin")
///     .interpreter_spec("popen//python=/opt/cubit/bin/python2.7")?
///     .arg("-nographics")
///     .connect()?;
/// ```
pub struct ConnectionBuilder {
    launch_args: Vec<String>,
    interpreter: LaunchCommand,
    cubit_bin_path: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    sink: Arc<dyn DiagnosticSink>,
}

impl ConnectionBuilder {
    pub fn new() -> Self {
        Self {
            launch_args: Vec::new(),
            interpreter: LaunchCommand::default(),
            cubit_bin_path: None,
            log_dir: None,
            sink: Arc::new(StdoutSink),
        }
    }

    /// Replace the arguments passed to the toolkit's `init`.
    pub fn launch_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.launch_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Append one argument for the toolkit's `init`.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.launch_args.push(arg.into());
        self
    }

    /// Interpreter that hosts the toolkit.
    ///
    /// Default: `python3` from `PATH`
    pub fn interpreter(mut self, command: LaunchCommand) -> Self {
        self.interpreter = command;
        self
    }

    /// Interpreter given as a command line or an execnet-style
    /// `popen//python=<path>` spec.
    pub fn interpreter_spec(self, spec: &str) -> Result<Self> {
        Ok(self.interpreter(LaunchCommand::parse(spec)?))
    }

    /// Directory holding the toolkit's Python module. Required.
    pub fn cubit_bin_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cubit_bin_path = Some(path.into());
        self
    }

    /// Parent directory for the captured log.
    ///
    /// Default: the system temp directory
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Where captured toolkit output goes.
    ///
    /// Default: [`StdoutSink`]
    pub fn diagnostic_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    fn require_bin_path(&self) -> Result<&PathBuf> {
        self.cubit_bin_path.as_ref().ok_or_else(|| BridgeError::Config {
            message: "Path to the cubit binaries is not set".to_string(),
        })
    }

    /// Spawn the interpreter and initialize the toolkit in it.
    pub fn connect(self) -> Result<Connection> {
        let bin_path = self.require_bin_path()?;
        if !bin_path.exists() {
            warn!("Cubit binary path does not exist: {}", bin_path.display());
        }
        let transport = ProcessTransport::spawn(&self.interpreter)?;
        self.connect_with(Box::new(transport))
    }

    /// Initialize the toolkit over an already running transport.
    pub fn connect_with(self, transport: Box<dyn Transport>) -> Result<Connection> {
        let bin_path = self.require_bin_path()?.clone();

        let mut launch_args = self.launch_args;
        let mut params = Map::new();
        params.insert(
            "cubit_bin_path".to_string(),
            Json::String(bin_path.to_string_lossy().into_owned()),
        );

        let log = if launch_args.iter().any(|arg| is_log_directive(arg)) {
            debug!("Log directive given, toolkit output is not captured");
            None
        } else {
            let log = SideChannelLog::create(self.log_dir.as_deref())?;
            let path = log.path().to_string_lossy().into_owned();
            launch_args.push(LaunchConfig::LOG_DIRECTIVE.to_string());
            launch_args.push(path);
            Some(log)
        };

        let mut channel = Channel::new(transport);
        channel.exchange(&Request::Parameters(params))?;
        let reply = channel.exchange(&Request::Init {
            launch_args: launch_args.clone(),
        })?;
        let root = Handle::from_wire(&reply).ok_or(BridgeError::Decode { value: reply })?;
        info!("Toolkit initialized, root object {}", root.token());

        let session = Arc::new(Session::new(channel, root, log, self.sink));
        Ok(Connection::from_session(session, launch_args))
    }
}

impl Default for ConnectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_bin_path_is_config_error() {
        let result = ConnectionBuilder::new().arg("-nographics").connect();
        assert!(matches!(result, Err(BridgeError::Config { .. })));
    }

    #[test]
    fn test_interpreter_spec() {
        let builder = ConnectionBuilder::new()
            .interpreter_spec("popen//python=/opt/cubit/bin/python2.7")
            .unwrap();
        assert_eq!(
            builder.interpreter.program(),
            std::path::Path::new("/opt/cubit/bin/python2.7")
        );
        assert!(ConnectionBuilder::new().interpreter_spec("").is_err());
    }

    #[test]
    fn test_launch_args_accumulate() {
        let builder = ConnectionBuilder::new()
            .launch_args(["cubit", "-nojournal"])
            .arg("-nographics");
        assert_eq!(builder.launch_args, ["cubit", "-nojournal", "-nographics"]);
    }
}
