//! logunify remote transport
//!
//! One TCP session per run. The connecting side retries until a peer
//! listens; the listening side accepts exactly one peer. Either side can
//! then write the record stream (mirroring a live run) or read it (replaying
//! a remote run).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod mirror;
pub mod retry;
pub mod role;
pub mod session;

pub use mirror::RemoteMirror;
pub use retry::RetryPolicy;
pub use role::RemoteRole;
pub use session::{connect_with_retry, listen_once, RemoteListener, Session, TransportError};
