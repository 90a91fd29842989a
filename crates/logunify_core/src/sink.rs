//! The consumer side of the event pipeline.
//!
//! Every destination an event can be written to (remote mirror, local log,
//! split files, viewer, telemetry) implements [`EventSink`]. The fan-out
//! coordinator owns its sinks exclusively, so implementations take `&mut self`
//! and need no internal locking.

use crate::event::Event;
use async_trait::async_trait;

/// Sink errors
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Underlying I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The event could not be encoded
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// The consumer behind the sink is gone
    #[error("Sink closed")]
    Closed,
}

/// A destination for events
#[async_trait]
pub trait EventSink: Send {
    /// Short name used in diagnostics
    fn name(&self) -> &str;

    /// Deliver one event
    ///
    /// # Errors
    ///
    /// Returns error if the event could not be delivered
    async fn write(&mut self, event: &Event) -> Result<(), SinkError>;

    /// Called once after the last event; flushes and releases resources
    ///
    /// # Errors
    ///
    /// Returns error if the final flush fails
    async fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Column;

    struct Collect(Vec<Event>, bool);

    #[async_trait]
    impl EventSink for Collect {
        fn name(&self) -> &str {
            "collect"
        }

        async fn write(&mut self, event: &Event) -> Result<(), SinkError> {
            self.0.push(event.clone());
            Ok(())
        }

        async fn finish(&mut self) -> Result<(), SinkError> {
            self.1 = true;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sink_as_trait_object() {
        let mut sink: Box<dyn EventSink> = Box::new(Collect(Vec::new(), false));
        sink.write(&Event::now(Column::new(1), "x")).await.unwrap();
        sink.finish().await.unwrap();
        assert_eq!(sink.name(), "collect");
    }

    #[test]
    fn test_sink_error_display() {
        let err = SinkError::from(std::io::Error::other("disk full"));
        assert!(err.to_string().contains("disk full"));
        assert_eq!(SinkError::Closed.to_string(), "Sink closed");
    }
}
