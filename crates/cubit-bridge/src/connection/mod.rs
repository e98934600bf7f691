//! Connection to one toolkit interpreter.
//!
//! A [`Connection`] is created once by [`ConnectionBuilder`]: the interpreter
//! is started, the startup parameters are handed over and the toolkit's
//! `init` is called. The object `init` returns becomes the root proxy.
//!
//! Closing the connection (explicitly or by dropping it) ends the child
//! process. Proxies that outlive it stay valid as values, but every call on
//! them fails with [`BridgeError::ChannelClosed`](crate::BridgeError) and
//! dropping them sends nothing.

mod builder;
mod log;
mod session;

pub use builder::ConnectionBuilder;
pub use log::{DiagnosticSink, SideChannelLog, StdoutSink};
pub(crate) use session::Session;

use crate::error::Result;
use crate::proxy::{Proxy, Value};
use crate::serializer::Arg;
use crate::wire::{Member, Request, WireValue};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// An initialized toolkit running in a child interpreter.
pub struct Connection {
    session: Arc<Session>,
    root: Proxy,
    launch_args: Vec<String>,
}

impl Connection {
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    pub(crate) fn from_session(session: Arc<Session>, launch_args: Vec<String>) -> Self {
        let root = session.root_proxy();
        Self {
            session,
            root,
            launch_args,
        }
    }

    /// The toolkit module object returned by `init`.
    pub fn root(&self) -> &Proxy {
        &self.root
    }

    /// Method call on `receiver` without turning handles into proxies.
    ///
    /// Captured log output is forwarded before this returns.
    pub fn call(&self, receiver: &Proxy, method: &str, args: &[Arg]) -> Result<WireValue> {
        self.session.check_owned(receiver)?;
        self.session.call(receiver.handle(), method, args)
    }

    /// Send a non-call message and return the unwrapped reply.
    pub fn call_raw(&self, request: &Request) -> Result<serde_json::Value> {
        self.session.call_raw(request)
    }

    /// Turn a decoded reply into proxies owned by this connection.
    pub fn adopt(&self, value: WireValue) -> Value {
        self.session.adopt(value)
    }

    pub fn is_callable(&self, receiver: &Proxy, name: &str) -> Result<bool> {
        self.session.check_owned(receiver)?;
        self.session.is_callable(receiver.handle(), name)
    }

    pub fn is_instance(&self, receiver: &Proxy, category: &str) -> Result<bool> {
        self.session.check_owned(receiver)?;
        self.session.is_instance(receiver.handle(), category)
    }

    pub fn list_members(&self, receiver: &Proxy) -> Result<Vec<Member>> {
        self.session.check_owned(receiver)?;
        self.session.list_members(receiver.handle())
    }

    /// 1 while the interpreter is reachable, 0 after it exited or was closed.
    pub fn channel_count(&self) -> usize {
        self.session.channel_count()
    }

    /// Whether toolkit output is captured and forwarded around each call.
    pub fn log_capture_enabled(&self) -> bool {
        self.session.log().is_some()
    }

    /// The captured log file, when capture is enabled.
    pub fn log_path(&self) -> Option<&Path> {
        self.session.log().map(SideChannelLog::path)
    }

    /// Arguments the toolkit was initialized with, including an added
    /// `-log <path>`.
    pub fn launch_args(&self) -> &[String] {
        &self.launch_args
    }

    /// End the interpreter. Idempotent.
    pub fn close(&self) -> Result<()> {
        self.session.close()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("root", &self.root)
            .field("launch_args", &self.launch_args)
            .field("log_path", &self.log_path())
            .finish()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(e) = self.session.close() {
            warn!("Failed to close toolkit connection: {}", e);
        }
    }
}
