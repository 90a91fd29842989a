//! Bridge from the async fan-out to the viewer thread.

use async_trait::async_trait;
use logunify_core::{Event, EventSink, SinkError};
use tokio::sync::mpsc;

/// Message delivered to the viewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerMessage {
    /// New event to append
    Event(Event),
    /// No more events will follow; redraw once more
    Update,
}

/// Sending half, held by [`ViewerSink`]
pub type ViewerSender = mpsc::UnboundedSender<ViewerMessage>;

/// Receiving half, drained by the viewer each tick
pub type ViewerReceiver = mpsc::UnboundedReceiver<ViewerMessage>;

/// Create the viewer channel
#[must_use]
pub fn viewer_channel() -> (ViewerSender, ViewerReceiver) {
    mpsc::unbounded_channel()
}

/// Sink forwarding events to the viewer
#[derive(Debug, Clone)]
pub struct ViewerSink {
    tx: ViewerSender,
}

impl ViewerSink {
    /// Create a sink sending on `tx`
    #[must_use]
    pub fn new(tx: ViewerSender) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventSink for ViewerSink {
    fn name(&self) -> &str {
        "viewer"
    }

    async fn write(&mut self, event: &Event) -> Result<(), SinkError> {
        self.tx
            .send(ViewerMessage::Event(event.clone()))
            .map_err(|_| SinkError::Closed)
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        // The viewer may already be gone after a quit
        let _ = self.tx.send(ViewerMessage::Update);
        Ok(())
    }
}
