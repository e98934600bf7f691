//! Wire format shared with the remote dispatcher.
//!
//! # Layout
//!
//! - **handle**: the `[id_token, display]` pair that names a remote object
//! - **value**: typed view of a reply (`WireValue`, `Primitive`)
//! - **protocol**: message shapes, reply envelope and frame codec

pub mod handle;
pub mod protocol;
pub mod value;

pub use handle::{classify, is_primitive, Handle};
pub use protocol::{read_frame, write_frame, Member, RemoteFault, Reply, Request};
pub use value::{Primitive, WireValue};
