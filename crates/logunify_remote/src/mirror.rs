//! Mirroring a live run to the remote peer.

use crate::session::{Session, TransportError};
use async_trait::async_trait;
use logunify_core::{CommandDescriptor, Event, EventSink, SinkError, VersionTag};
use logunify_log::{CodecError, RecordWriter};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tracing::info;

/// Sink that writes the record stream to the peer
pub struct RemoteMirror {
    peer: SocketAddr,
    writer: RecordWriter<TcpStream>,
}

impl RemoteMirror {
    /// Take the session's stream and send the stream header
    ///
    /// # Errors
    ///
    /// Returns error if the stream was already taken or the header write fails
    pub async fn start(
        session: &mut Session,
        version: &VersionTag,
        commands: &[CommandDescriptor],
    ) -> Result<Self, TransportError> {
        let mut writer = session.take_writer()?;
        writer
            .write_header(version, commands)
            .await
            .map_err(into_transport)?;
        info!(peer = %session.peer(), commands = commands.len(), "mirroring to remote peer");
        Ok(Self {
            peer: session.peer(),
            writer,
        })
    }

    /// Address of the peer
    #[must_use]
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }
}

fn into_transport(err: CodecError) -> TransportError {
    match err {
        CodecError::Io(io) => TransportError::Io(io),
        other => TransportError::Io(std::io::Error::other(other)),
    }
}

fn into_sink(err: CodecError) -> SinkError {
    match err {
        CodecError::Io(io) => SinkError::Io(io),
        other => SinkError::Encode(other.to_string()),
    }
}

#[async_trait]
impl EventSink for RemoteMirror {
    fn name(&self) -> &str {
        "remote-mirror"
    }

    async fn write(&mut self, event: &Event) -> Result<(), SinkError> {
        self.writer.write_event(event).await.map_err(into_sink)
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.close().await.map_err(into_sink)
    }
}
