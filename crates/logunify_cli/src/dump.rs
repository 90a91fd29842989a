//! JSON-lines sink for scripting.

use async_trait::async_trait;
use logunify_core::{Event, EventSink, SinkError};
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};

/// Writes every event as one JSON object per line
pub struct JsonLinesSink<W> {
    writer: W,
}

impl JsonLinesSink<Stdout> {
    /// Sink writing to standard output
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> JsonLinesSink<W> {
    /// Sink writing to `writer`
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl<W> EventSink for JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn name(&self) -> &str {
        "dump"
    }

    async fn write(&mut self, event: &Event) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(event).map_err(|e| SinkError::Encode(e.to_string()))?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush().await?;
        Ok(())
    }
}
