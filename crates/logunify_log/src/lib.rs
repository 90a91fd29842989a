//! logunify record log
//!
//! The versioned record format shared by local log files and remote
//! sessions, plus the two file-backed sinks built on top of it: the persisted
//! log store and the per-command split logs.
//!
//! A stream is one version record, then one config record per command, then
//! an unbounded sequence of event records. Records are length-prefixed
//! postcard frames, so a clean end of stream can be told apart from a
//! truncated or corrupt one.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod record;
pub mod split;
pub mod store;
pub mod stream;

pub use codec::{CodecError, RecordCodec, MAX_FRAME_LEN};
pub use record::{Record, RecordKind, RecordRef};
pub use split::{SplitLog, SplitLogError};
pub use store::{LogStore, StoreError, StoreMode};
pub use stream::{DecodeError, RecordReader, RecordWriter, StreamHeader, StreamOrigin};
