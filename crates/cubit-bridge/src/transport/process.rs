//! Transport over the stdin/stdout pipes of a child interpreter.

use super::dispatcher::{BOOTSTRAP, DISPATCHER_SOURCE};
use super::{LaunchCommand, Transport};
use crate::config::LaunchConfig;
use crate::error::{BridgeError, Result};
use crate::wire::{read_frame, write_frame};
use serde_json::Value;
use std::io::BufReader;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Instant;
use tracing::{debug, info, warn};

/// A toolkit interpreter running the dispatcher loop.
#[derive(Debug)]
pub struct ProcessTransport {
    child: Child,
    /// `None` once the channel was closed from this side.
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    /// Set when the peer hung up or exited.
    disconnected: bool,
}

impl ProcessTransport {
    /// Start the interpreter and load the dispatcher into it.
    pub fn spawn(command: &LaunchCommand) -> Result<Self> {
        let mut child = Command::new(command.program())
            .args(command.args())
            .arg("-u")
            .arg("-c")
            .arg(BOOTSTRAP)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                BridgeError::transport(format!("Failed to launch interpreter `{}`", command), e)
            })?;

        let pid = child.id();
        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(BridgeError::Transport {
                    message: "Interpreter pipes were not captured".to_string(),
                    source: None,
                });
            }
        };

        let mut transport = Self {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
            disconnected: false,
        };

        transport.write_payload(DISPATCHER_SOURCE.as_bytes())?;
        info!("Spawned toolkit interpreter `{}` (PID {})", command, pid);

        Ok(transport)
    }

    /// PID of the interpreter.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    fn write_payload(&mut self, payload: &[u8]) -> Result<()> {
        let stdin = self.stdin.as_mut().ok_or(BridgeError::ChannelClosed)?;
        let result = write_frame(stdin, payload);
        if result.is_err() {
            self.disconnected = true;
        }
        result
    }
}

impl Transport for ProcessTransport {
    fn send(&mut self, message: &Value) -> Result<()> {
        let payload = serde_json::to_vec(message)?;
        self.write_payload(&payload)
    }

    fn receive(&mut self) -> Result<Value> {
        let payload = match read_frame(&mut self.stdout) {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                self.disconnected = true;
                return Err(BridgeError::Transport {
                    message: format!("Interpreter (PID {}) closed the channel", self.child.id()),
                    source: None,
                });
            }
            Err(e) => {
                self.disconnected = true;
                return Err(e);
            }
        };

        serde_json::from_slice(&payload).map_err(|e| BridgeError::Protocol {
            message: format!("Reply is not valid JSON: {e}"),
        })
    }

    fn channel_count(&mut self) -> usize {
        if self.disconnected || self.stdin.is_none() {
            return 0;
        }
        match self.child.try_wait() {
            Ok(None) => 1,
            Ok(Some(status)) => {
                debug!("Interpreter (PID {}) exited with {}", self.child.id(), status);
                self.disconnected = true;
                0
            }
            Err(e) => {
                warn!("Failed to poll interpreter (PID {}): {}", self.child.id(), e);
                self.disconnected = true;
                0
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        // EOF on stdin ends the dispatcher loop.
        let was_open = self.stdin.take().is_some();
        self.disconnected = true;

        let deadline = Instant::now() + LaunchConfig::SHUTDOWN_TIMEOUT;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    if was_open {
                        info!("Interpreter (PID {}) exited with {}", self.child.id(), status);
                    }
                    return Ok(());
                }
                Ok(None) if Instant::now() < deadline => {
                    std::thread::sleep(LaunchConfig::SHUTDOWN_POLL_INTERVAL);
                }
                Ok(None) => break,
                Err(e) => {
                    return Err(BridgeError::transport("Failed to poll interpreter", e));
                }
            }
        }

        warn!(
            "Interpreter (PID {}) did not exit within {:?}, killing it",
            self.child.id(),
            LaunchConfig::SHUTDOWN_TIMEOUT
        );
        self.child
            .kill()
            .map_err(|e| BridgeError::transport("Failed to kill interpreter", e))?;
        self.child
            .wait()
            .map_err(|e| BridgeError::transport("Failed to reap interpreter", e))?;
        Ok(())
    }
}

impl Drop for ProcessTransport {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to shut down interpreter (PID {}): {}", self.child.id(), e);
        }
    }
}
