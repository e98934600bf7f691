//! Local stand-ins for toolkit objects.
//!
//! A [`Proxy`] is a cheap, cloneable reference to one remote object. All
//! proxies that carry the same remote id, whether cloned or decoded from
//! separate replies, share a single claim; the `delete` message is sent when
//! the last of them is dropped. Proxies for the root object never delete.

mod geometry;
mod resolve;
mod value;

pub use resolve::{Method, Resolved};
pub use value::Value;

use crate::connection::Session;
use crate::error::Result;
use crate::serializer::Arg;
use crate::wire::{Handle, Member};
use std::fmt;
use std::sync::Arc;

/// What happens to the remote object when the last alias goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Release {
    Delete,
    Keep,
}

/// Shared ownership of one remote id.
pub(crate) struct Claim {
    session: Arc<Session>,
    handle: Handle,
    release: Release,
}

impl Claim {
    pub(crate) fn new(session: Arc<Session>, handle: Handle, release: Release) -> Self {
        Self {
            session,
            handle,
            release,
        }
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        if self.release == Release::Delete {
            self.session.release(&self.handle);
        }
    }
}

/// A toolkit object living in the child interpreter.
#[derive(Clone)]
pub struct Proxy {
    claim: Arc<Claim>,
}

impl Proxy {
    pub(crate) fn from_claim(claim: Arc<Claim>) -> Self {
        Self { claim }
    }

    fn session(&self) -> &Arc<Session> {
        &self.claim.session
    }

    /// Whether this proxy was handed out by `session`.
    pub(crate) fn belongs_to(&self, session: &Session) -> bool {
        std::ptr::eq(Arc::as_ptr(self.session()), session)
    }

    pub fn handle(&self) -> &Handle {
        &self.claim.handle
    }

    /// Remote id of the object (unique for the lifetime of the child).
    pub fn remote_id(&self) -> u64 {
        self.claim.handle.id()
    }

    /// String form reported by the toolkit when the handle was created.
    pub fn display(&self) -> &str {
        self.claim.handle.display()
    }

    /// Whether this proxy refers to the toolkit's top-level instance.
    pub fn is_root(&self) -> bool {
        self.claim.release == Release::Keep
    }

    /// Number of live proxies sharing this proxy's claim.
    pub fn alias_count(&self) -> usize {
        Arc::strong_count(&self.claim)
    }

    /// Resolve a named capability.
    ///
    /// Callable members yield a [`Method`] to be invoked later. Anything else
    /// is fetched right away with a zero-argument call.
    pub fn resolve(&self, name: &str) -> Result<Resolved> {
        if self.session().is_callable(self.handle(), name)? {
            Ok(Resolved::Method(self.method(name)))
        } else {
            self.session()
                .invoke(self.handle(), name, &[])
                .map(Resolved::Value)
        }
    }

    /// Call `name` with positional arguments and decode the result.
    ///
    /// Skips the `iscallable` round trip. A non-callable attribute is
    /// returned as is and the arguments are ignored by the dispatcher.
    pub fn invoke(&self, name: &str, args: &[Arg]) -> Result<Value> {
        self.session().invoke(self.handle(), name, args)
    }

    /// Bind `name` without asking the toolkit whether it is callable.
    pub fn method(&self, name: &str) -> Method {
        Method::new(self.clone(), name)
    }

    /// Ask the dispatcher whether this object belongs to `category`.
    pub fn is_instance(&self, category: &str) -> Result<bool> {
        self.session().is_instance(self.handle(), category)
    }

    /// Every public member of the remote object with its callability.
    pub fn list_members(&self) -> Result<Vec<Member>> {
        self.session().list_members(self.handle())
    }

    /// Names of callable members.
    pub fn methods(&self) -> Result<Vec<String>> {
        Ok(self
            .list_members()?
            .into_iter()
            .filter(|m| m.callable)
            .map(|m| m.name)
            .collect())
    }

    /// Names of non-callable members.
    pub fn attributes(&self) -> Result<Vec<String>> {
        Ok(self
            .list_members()?
            .into_iter()
            .filter(|m| !m.callable)
            .map(|m| m.name)
            .collect())
    }

    /// The connection's root object.
    pub fn root(&self) -> Proxy {
        self.session().root_proxy()
    }

    /// Give up this alias now instead of at end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl PartialEq for Proxy {
    fn eq(&self, other: &Self) -> bool {
        self.handle() == other.handle()
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("id", &self.remote_id())
            .field("display", &self.display())
            .field("root", &self.is_root())
            .finish()
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<CubitObject>\"{}\"", self.display())
    }
}
