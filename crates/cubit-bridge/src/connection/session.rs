//! Shared state behind a connection and all of its proxies.
//!
//! Everything that touches the transport goes through one mutex: a call, the
//! adoption of its result into proxies, and deletions are atomic relative to
//! each other. The same lock guards the alias registry, so a remote id that
//! is handed out again while its last proxy is being dropped keeps its object
//! alive instead of being deleted under the new proxy.

use super::log::{DiagnosticSink, SideChannelLog};
use crate::error::{BridgeError, Result};
use crate::proxy::{Claim, Proxy, Release, Value};
use crate::serializer::{encode_args, find_rejected_proxy, Arg};
use crate::transport::Transport;
use crate::wire::{Handle, Member, Reply, Request, WireValue};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, warn};

/// The transport plus the bookkeeping that must change in step with it.
pub(crate) struct Channel {
    transport: Box<dyn Transport>,
    /// Remote id -> claim shared by every live proxy with that id.
    claims: HashMap<u64, Weak<Claim>>,
    /// (remote id, member name) -> callable.
    callables: HashMap<(u64, String), bool>,
}

impl Channel {
    pub(crate) fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            claims: HashMap::new(),
            callables: HashMap::new(),
        }
    }

    pub(crate) fn channel_count(&mut self) -> usize {
        self.transport.channel_count()
    }

    /// One request/response round trip, envelope unwrapped.
    pub(crate) fn exchange(&mut self, request: &Request) -> Result<serde_json::Value> {
        if self.transport.channel_count() == 0 {
            return Err(BridgeError::ChannelClosed);
        }
        debug!("-> {}", request.verb());
        self.transport.send(&request.to_wire())?;
        let reply = self.transport.receive()?;
        Reply::from_json(reply)?.into_result()
    }

    /// Delete a remote object. A no-op once the channel is gone.
    fn delete(&mut self, handle: &Handle) -> Result<()> {
        let id = handle.id();
        self.callables.retain(|(cached, _), _| *cached != id);
        if self.channel_count() == 0 {
            debug!("Channel closed, skipping delete of {}", handle.token());
            return Ok(());
        }
        self.exchange(&Request::Delete {
            handle: handle.clone(),
        })
        .map(drop)
    }

    pub(crate) fn close(&mut self) -> Result<()> {
        self.transport.close()
    }
}

pub(crate) struct Session {
    channel: Mutex<Channel>,
    root: Handle,
    log: Option<SideChannelLog>,
    sink: Arc<dyn DiagnosticSink>,
}

impl Session {
    pub(crate) fn new(
        channel: Channel,
        root: Handle,
        log: Option<SideChannelLog>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            channel: Mutex::new(channel),
            root,
            log,
            sink,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Channel> {
        self.channel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn log(&self) -> Option<&SideChannelLog> {
        self.log.as_ref()
    }

    pub(crate) fn root_proxy(self: &Arc<Self>) -> Proxy {
        Proxy::from_claim(Arc::new(Claim::new(
            self.clone(),
            self.root.clone(),
            Release::Keep,
        )))
    }

    pub(crate) fn channel_count(&self) -> usize {
        self.lock().channel_count()
    }

    pub(crate) fn close(&self) -> Result<()> {
        self.lock().close()
    }

    /// Method call returning unadopted handles.
    pub(crate) fn call(&self, receiver: &Handle, method: &str, args: &[Arg]) -> Result<WireValue> {
        let (result, diagnostics) = {
            let mut channel = self.lock();
            self.call_locked(&mut channel, receiver, method, args)
        };
        self.forward(diagnostics);
        result
    }

    /// Method call with the result adopted under the same lock.
    pub(crate) fn invoke(
        self: &Arc<Self>,
        receiver: &Handle,
        method: &str,
        args: &[Arg],
    ) -> Result<Value> {
        let (result, diagnostics) = {
            let mut channel = self.lock();
            let (result, diagnostics) = self.call_locked(&mut channel, receiver, method, args);
            (
                result.map(|wire| self.adopt_locked(&mut channel, wire)),
                diagnostics,
            )
        };
        self.forward(diagnostics);
        result
    }

    /// Truncate the log, make the call, then collect what the call logged.
    fn call_locked(
        &self,
        channel: &mut Channel,
        receiver: &Handle,
        method: &str,
        args: &[Arg],
    ) -> (Result<WireValue>, Option<String>) {
        if let Err(e) = self.check_args(args) {
            return (Err(e), None);
        }
        if let Some(log) = &self.log {
            if let Err(e) = log.truncate_if_nonempty() {
                return (Err(e), None);
            }
        }

        let request = match encode_args(args) {
            Ok(args) => Request::Call {
                receiver: receiver.clone(),
                method: method.to_string(),
                args,
            },
            Err(e) => return (Err(e), None),
        };
        let reply = channel.exchange(&request);

        let diagnostics = self.log.as_ref().and_then(|log| match log.read() {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Failed to read toolkit log {}: {}", log.path().display(), e);
                None
            }
        });

        (reply.and_then(WireValue::from_json), diagnostics)
    }

    /// Proxies only mean something to the interpreter that created them.
    pub(crate) fn check_owned(&self, proxy: &Proxy) -> Result<()> {
        if proxy.belongs_to(self) {
            Ok(())
        } else {
            Err(foreign(proxy))
        }
    }

    fn check_args(&self, args: &[Arg]) -> Result<()> {
        match find_rejected_proxy(args, &|proxy: &Proxy| proxy.belongs_to(self)) {
            Some(proxy) => Err(foreign(proxy)),
            None => Ok(()),
        }
    }

    fn forward(&self, diagnostics: Option<String>) {
        if let Some(text) = diagnostics.filter(|text| !text.is_empty()) {
            self.sink.forward(&text);
        }
    }

    /// Send a protocol message that is not a method call.
    pub(crate) fn call_raw(&self, request: &Request) -> Result<serde_json::Value> {
        self.lock().exchange(request)
    }

    pub(crate) fn is_callable(&self, handle: &Handle, name: &str) -> Result<bool> {
        let mut channel = self.lock();
        let key = (handle.id(), name.to_string());
        if let Some(callable) = channel.callables.get(&key) {
            return Ok(*callable);
        }
        let reply = channel.exchange(&Request::IsCallable {
            handle: handle.clone(),
            name: name.to_string(),
        })?;
        let callable = reply.as_bool().ok_or(BridgeError::Decode { value: reply })?;
        channel.callables.insert(key, callable);
        Ok(callable)
    }

    pub(crate) fn is_instance(&self, handle: &Handle, category: &str) -> Result<bool> {
        let reply = self.call_raw(&Request::IsInstance {
            handle: handle.clone(),
            category: category.to_string(),
        })?;
        reply.as_bool().ok_or(BridgeError::Decode { value: reply })
    }

    pub(crate) fn list_members(&self, handle: &Handle) -> Result<Vec<Member>> {
        let reply = self.call_raw(&Request::GetSelfDir {
            handle: handle.clone(),
        })?;
        Member::list_from_json(reply)
    }

    pub(crate) fn adopt(self: &Arc<Self>, wire: WireValue) -> Value {
        let mut channel = self.lock();
        self.adopt_locked(&mut channel, wire)
    }

    fn adopt_locked(self: &Arc<Self>, channel: &mut Channel, wire: WireValue) -> Value {
        match wire {
            WireValue::Handle(handle) => Value::Proxy(self.claim_locked(channel, handle)),
            WireValue::List(items) => Value::List(
                items
                    .into_iter()
                    .map(|item| self.adopt_locked(channel, item))
                    .collect(),
            ),
            WireValue::Primitive(primitive) => Value::Primitive(primitive),
        }
    }

    /// Proxy for `handle`, sharing the claim of any live alias.
    fn claim_locked(self: &Arc<Self>, channel: &mut Channel, handle: Handle) -> Proxy {
        if handle == self.root {
            return Proxy::from_claim(Arc::new(Claim::new(self.clone(), handle, Release::Keep)));
        }
        let id = handle.id();
        if let Some(claim) = channel.claims.get(&id).and_then(Weak::upgrade) {
            return Proxy::from_claim(claim);
        }
        let claim = Arc::new(Claim::new(self.clone(), handle, Release::Delete));
        channel.claims.insert(id, Arc::downgrade(&claim));
        Proxy::from_claim(claim)
    }

    /// Called when the last alias of a deletable handle is dropped.
    pub(crate) fn release(&self, handle: &Handle) {
        let mut channel = self.lock();
        let id = handle.id();
        if let Some(existing) = channel.claims.get(&id) {
            if existing.strong_count() > 0 {
                // Handed out again since this claim died.
                return;
            }
            channel.claims.remove(&id);
        }
        debug!("Releasing {} ({})", handle.token(), handle.display());
        if let Err(e) = channel.delete(handle) {
            warn!("Failed to delete {} in toolkit: {}", handle.token(), e);
        }
    }
}

fn foreign(proxy: &Proxy) -> BridgeError {
    BridgeError::UnexpectedValue {
        expected: "cubit object of this connection",
        found: proxy.to_string(),
    }
}
