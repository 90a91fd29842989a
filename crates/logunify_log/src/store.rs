//! The persisted event log.
//!
//! A store is opened once per run, either for writing (live capture, remote
//! receive) or for reading (file replay). Without a path it is disabled and
//! every operation is a no-op.

use crate::codec::CodecError;
use crate::stream::{DecodeError, RecordReader, RecordWriter, StreamHeader, StreamOrigin};
use async_trait::async_trait;
use logunify_core::{CommandDescriptor, Event, EventSink, SinkError, VersionTag};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tracing::{debug, info};

/// How a store is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Create the file, truncating any previous content
    Write,
    /// Open an existing file
    Read,
}

/// Log store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The file could not be opened or created
    #[error("Cannot open log file {}: {source}", path.display())]
    Open {
        /// Requested path
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: std::io::Error,
    },

    /// Operation does not match the mode the store was opened in
    #[error("Log store not opened for {0}")]
    WrongMode(&'static str),

    /// Writing a record failed
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Reading a record failed
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl From<StoreError> for SinkError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Open { source, .. } => SinkError::Io(source),
            StoreError::Codec(CodecError::Io(io)) => SinkError::Io(io),
            other => SinkError::Encode(other.to_string()),
        }
    }
}

enum State {
    Disabled,
    Writing(RecordWriter<File>),
    Reading(RecordReader<File>),
    Closed,
}

/// Local log file of records
pub struct LogStore {
    path: Option<PathBuf>,
    state: State,
}

impl LogStore {
    /// Open the store at `path`, or a disabled store when `path` is `None`
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or opened
    pub async fn open(path: Option<&Path>, mode: StoreMode) -> Result<Self, StoreError> {
        let Some(path) = path else {
            return Ok(Self::disabled());
        };

        let opened = match mode {
            StoreMode::Write => {
                OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(path)
                    .await
            }
            StoreMode::Read => File::open(path).await,
        };
        let file = opened.map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        info!(path = %path.display(), ?mode, "opened log store");
        let state = match mode {
            StoreMode::Write => State::Writing(RecordWriter::new(file)),
            StoreMode::Read => State::Reading(RecordReader::new(file, StreamOrigin::LocalFile)),
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            state,
        })
    }

    /// A store with no file behind it
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            path: None,
            state: State::Disabled,
        }
    }

    /// Whether a file backs this store
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the version record and the command list
    ///
    /// # Errors
    ///
    /// Returns error if the store is in read mode or the write fails
    pub async fn write_header(
        &mut self,
        version: &VersionTag,
        commands: &[CommandDescriptor],
    ) -> Result<(), StoreError> {
        match &mut self.state {
            State::Writing(writer) => Ok(writer.write_header(version, commands).await?),
            State::Reading(_) => Err(StoreError::WrongMode("writing")),
            State::Disabled | State::Closed => Ok(()),
        }
    }

    /// Append one event
    ///
    /// # Errors
    ///
    /// Returns error if the store is in read mode or the write fails
    pub async fn write(&mut self, event: &Event) -> Result<(), StoreError> {
        match &mut self.state {
            State::Writing(writer) => Ok(writer.write_event(event).await?),
            State::Reading(_) => Err(StoreError::WrongMode("writing")),
            State::Disabled | State::Closed => Ok(()),
        }
    }

    /// Read version and configs from a store opened for reading
    ///
    /// # Errors
    ///
    /// Returns error if the store is not readable or the header is invalid
    pub async fn read_header(&mut self, expected: &VersionTag) -> Result<StreamHeader, StoreError> {
        match &mut self.state {
            State::Reading(reader) => Ok(reader.read_header(expected).await?),
            _ => Err(StoreError::WrongMode("reading")),
        }
    }

    /// Hand the event reader over, typically to the replay engine.
    ///
    /// The store is closed afterwards.
    ///
    /// # Errors
    ///
    /// Returns error if the store is not readable
    pub fn take_reader(&mut self) -> Result<RecordReader<File>, StoreError> {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Reading(reader) => Ok(reader),
            other => {
                self.state = other;
                Err(StoreError::WrongMode("reading"))
            }
        }
    }

    /// Flush and release the file; safe to call more than once
    ///
    /// # Errors
    ///
    /// Returns error if the final flush fails
    pub async fn close(&mut self) -> Result<(), StoreError> {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Writing(mut writer) => {
                writer.close().await?;
                debug!(records = writer.records_written(), "closed log store");
            }
            State::Disabled => self.state = State::Disabled,
            State::Reading(_) | State::Closed => {}
        }
        Ok(())
    }
}

#[async_trait]
impl EventSink for LogStore {
    fn name(&self) -> &str {
        "local-log"
    }

    async fn write(&mut self, event: &Event) -> Result<(), SinkError> {
        LogStore::write(self, event).await.map_err(SinkError::from)
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        self.close().await.map_err(SinkError::from)
    }
}
