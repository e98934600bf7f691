//! Cubit Bridge - drive the Cubit toolkit from Rust.
//!
//! The toolkit only runs inside its own bundled Python interpreter. This crate
//! starts that interpreter as a child process, loads a small dispatcher into
//! it and makes every remote object appear as a local [`Proxy`]. Arguments and
//! results are translated on the way; remote objects are deleted once the
//! last proxy referring to them is dropped.
//!
//! # Example
//!
//! ```rust,ignore
//! use cubit_bridge::{args, Connection, GeometryType};
//!
//! fn main() -> cubit_bridge::Result<()> {
//!     let conn = Connection::builder()
//!         .cubit_bin_path("/opt/cubit/bin")
//!         .interpreter_spec("popen//python=/opt/cubit/bin/python2.7")?
//!         .launch_args(["cubit", "-nographics", "-nojournal"])
//!         .connect()?;
//!     let cubit = conn.root();
//!
//!     cubit.invoke("cmd", &args!["brick x 1"])?;
//!     let volume = cubit.invoke("volume", &args![1])?.into_proxy()?;
//!     assert_eq!(volume.geometry_type()?, GeometryType::Volume);
//!
//!     // Attributes are fetched right away, methods are bound for later.
//!     let surfaces = volume.resolve("surfaces")?.into_method()?.call(&[])?;
//!     println!("{} surfaces", surfaces.into_proxy_list()?.len());
//!
//!     Ok(())
//! }
//! ```

pub mod category;
pub mod config;
pub mod connection;
pub mod error;
pub mod proxy;
pub mod serializer;
pub mod transport;
pub mod wire;

// Re-export commonly used types
pub use category::{Category, FiniteElementObject, GeometryType};
pub use connection::{Connection, ConnectionBuilder, DiagnosticSink, SideChannelLog, StdoutSink};
pub use error::{BridgeError, IoResultExt, Result};
pub use proxy::{Method, Proxy, Resolved, Value};
pub use serializer::{encode, encode_args, Arg};
pub use transport::{LaunchCommand, ProcessTransport, Transport};
pub use wire::{
    classify, is_primitive, Handle, Member, Primitive, RemoteFault, Reply, Request, WireValue,
};
