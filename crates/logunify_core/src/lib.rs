//! logunify core types
//!
//! This crate contains the types shared by every stage of the
//! capture → persistence → multiplex → replay pipeline. It performs no I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod command;
pub mod event;
pub mod sink;
pub mod time;
pub mod version;

// Re-exports
pub use command::{Column, CommandDescriptor, assign_columns};
pub use event::Event;
pub use sink::{EventSink, SinkError};
pub use time::Timestamp;
pub use version::{BUILD_VERSION, VersionCheck, VersionTag};
