//! Record readers and writers over any async byte stream.
//!
//! The same types serve local files and TCP sessions. A stream is read in
//! three phases: [`RecordReader::read_version`], [`RecordReader::read_configs`],
//! then [`RecordReader::read_event`] until it reports end of stream.

use crate::codec::{CodecError, RecordCodec};
use crate::record::{Record, RecordKind, RecordRef};
use futures::{SinkExt, StreamExt};
use logunify_core::{CommandDescriptor, Event, VersionCheck, VersionTag};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, warn};

/// Where a stream comes from; decides how decode failures are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOrigin {
    /// A persisted log file; a bad tail is the normal end of a crashed run
    LocalFile,
    /// A live peer; a decode failure may hide a corrupted session
    Remote,
}

impl StreamOrigin {
    fn report(self, error: &dyn std::fmt::Display) {
        match self {
            Self::LocalFile => {
                debug!(%error, "undecodable record in log file, treating as end of data");
            }
            Self::Remote => {
                warn!(%error, "decode failure on remote stream, session may be corrupted");
            }
        }
    }
}

/// Stream-level decode errors
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Framing or payload failure
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A record appeared where another kind was required
    #[error("Expected {expected} record, found {found}")]
    UnexpectedRecord {
        /// Kind the reader needed
        expected: RecordKind,
        /// Kind actually read
        found: RecordKind,
    },

    /// The stream ended before its version record
    #[error("Stream is empty")]
    Empty,
}

/// Version and command list at the head of a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Recorded version tag
    pub version: VersionTag,
    /// Recorded command list, in column order
    pub commands: Vec<CommandDescriptor>,
}

/// Writes records to a byte stream, one flushed frame per call.
///
/// A detached writer accepts every call and writes nothing.
pub struct RecordWriter<W> {
    inner: Option<FramedWrite<W, RecordCodec>>,
    written: u64,
}

impl<W: AsyncWrite + Unpin> RecordWriter<W> {
    /// Attach a writer to a stream
    pub fn new(writer: W) -> Self {
        Self {
            inner: Some(FramedWrite::new(writer, RecordCodec::new())),
            written: 0,
        }
    }

    /// A writer with no stream attached
    #[must_use]
    pub fn detached() -> Self {
        Self {
            inner: None,
            written: 0,
        }
    }

    /// Whether a stream is attached
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.is_some()
    }

    /// Number of records written so far
    #[must_use]
    pub const fn records_written(&self) -> u64 {
        self.written
    }

    /// Append the version record
    ///
    /// # Errors
    ///
    /// Returns error if encoding or the write fails
    pub async fn write_version(&mut self, tag: &VersionTag) -> Result<(), CodecError> {
        self.send(RecordRef::Version(tag)).await
    }

    /// Append one config record per command, in order
    ///
    /// # Errors
    ///
    /// Returns error if encoding or a write fails
    pub async fn write_configs(&mut self, commands: &[CommandDescriptor]) -> Result<(), CodecError> {
        for command in commands {
            self.send(RecordRef::Config(command)).await?;
        }
        Ok(())
    }

    /// Append version and configs
    ///
    /// # Errors
    ///
    /// Returns error if encoding or a write fails
    pub async fn write_header(
        &mut self,
        version: &VersionTag,
        commands: &[CommandDescriptor],
    ) -> Result<(), CodecError> {
        self.write_version(version).await?;
        self.write_configs(commands).await
    }

    /// Append one event record
    ///
    /// # Errors
    ///
    /// Returns error if encoding or the write fails
    pub async fn write_event(&mut self, event: &Event) -> Result<(), CodecError> {
        self.send(RecordRef::Event(event)).await
    }

    /// Flush and shut the stream down; later writes are no-ops
    ///
    /// # Errors
    ///
    /// Returns error if the final flush fails
    pub async fn close(&mut self) -> Result<(), CodecError> {
        if let Some(mut framed) = self.inner.take() {
            framed.close().await?;
        }
        Ok(())
    }

    async fn send(&mut self, record: RecordRef<'_>) -> Result<(), CodecError> {
        let Some(framed) = self.inner.as_mut() else {
            return Ok(());
        };
        framed.send(record).await?;
        self.written += 1;
        Ok(())
    }
}

/// Reads records from a byte stream
pub struct RecordReader<R> {
    framed: FramedRead<R, RecordCodec>,
    origin: StreamOrigin,
    held: Option<Record>,
    failure: Option<CodecError>,
}

impl<R: AsyncRead + Unpin> RecordReader<R> {
    /// Attach a reader to a stream
    pub fn new(reader: R, origin: StreamOrigin) -> Self {
        Self {
            framed: FramedRead::new(reader, RecordCodec::new()),
            origin,
            held: None,
            failure: None,
        }
    }

    /// Origin this reader was created with
    #[must_use]
    pub const fn origin(&self) -> StreamOrigin {
        self.origin
    }

    /// Read the leading version record
    ///
    /// # Errors
    ///
    /// Returns error if the stream is empty, undecodable, or does not start
    /// with a version record
    pub async fn read_version(&mut self) -> Result<VersionTag, DecodeError> {
        match self.next_record().await? {
            Some(Record::Version(tag)) => Ok(tag),
            Some(other) => Err(DecodeError::UnexpectedRecord {
                expected: RecordKind::Version,
                found: other.kind(),
            }),
            None => Err(DecodeError::Empty),
        }
    }

    /// Read config records until the first record of another kind.
    ///
    /// The record that ends the section is kept for [`Self::read_event`].
    /// End of stream or a decode failure also ends the section; a failure is
    /// reported by the next `read_event` call.
    pub async fn read_configs(&mut self) -> Vec<CommandDescriptor> {
        let mut commands = Vec::new();
        loop {
            match self.next_record().await {
                Ok(Some(Record::Config(command))) => commands.push(command),
                Ok(Some(other)) => {
                    self.held = Some(other);
                    break;
                }
                Ok(None) => break,
                Err(err) => {
                    self.failure = Some(err);
                    break;
                }
            }
        }
        commands
    }

    /// Read version and configs, warning when the version differs from
    /// `expected`. A mismatch never fails the read.
    ///
    /// # Errors
    ///
    /// Returns error if the version record cannot be read
    pub async fn read_header(&mut self, expected: &VersionTag) -> Result<StreamHeader, DecodeError> {
        let version = self.read_version().await?;
        if let VersionCheck::Mismatch { recorded, expected } = version.check(expected) {
            warn!(%recorded, %expected, "stream was recorded by a different version");
        }
        let commands = self.read_configs().await;
        debug!(version = %version, commands = commands.len(), "read stream header");
        Ok(StreamHeader { version, commands })
    }

    /// Read the next event; `Ok(None)` at a clean end of stream
    ///
    /// # Errors
    ///
    /// Returns error if the stream is truncated, corrupt, or carries a
    /// non-event record
    pub async fn read_event(&mut self) -> Result<Option<Event>, DecodeError> {
        let result = match self.next_record().await {
            Ok(Some(Record::Event(event))) => return Ok(Some(event)),
            Ok(None) => return Ok(None),
            Ok(Some(other)) => DecodeError::UnexpectedRecord {
                expected: RecordKind::Event,
                found: other.kind(),
            },
            Err(err) => DecodeError::Codec(err),
        };
        self.origin.report(&result);
        Err(result)
    }

    async fn next_record(&mut self) -> Result<Option<Record>, CodecError> {
        if let Some(record) = self.held.take() {
            return Ok(Some(record));
        }
        if let Some(err) = self.failure.take() {
            return Err(err);
        }
        self.framed.next().await.transpose()
    }
}
