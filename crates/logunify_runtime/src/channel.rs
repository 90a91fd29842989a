//! The event channel between producers and the coordinator.
//!
//! The channel is unbounded: a slow sink must never stall a shell process
//! by filling its stdout pipe.

use logunify_core::Event;
use tokio::sync::mpsc;

/// Producer half; cloned once per producer task
pub type EventSender = mpsc::UnboundedSender<Event>;

/// Consumer half, owned by the coordinator
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Create the event channel
#[must_use]
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use logunify_core::Column;

    #[tokio::test]
    async fn test_closes_when_all_senders_drop() {
        let (tx, mut rx) = event_channel();
        let second = tx.clone();
        tx.send(Event::now(Column::new(1), "a")).unwrap();
        second.send(Event::now(Column::new(2), "b")).unwrap();
        drop(tx);
        drop(second);

        assert_eq!(rx.recv().await.unwrap().text, "a");
        assert_eq!(rx.recv().await.unwrap().text, "b");
        assert!(rx.recv().await.is_none());
    }
}
