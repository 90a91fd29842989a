//! The single consumer of the event channel.

use crate::channel::EventReceiver;
use logunify_core::EventSink;
use tracing::{debug, info, warn};

/// Totals of a finished fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Events received from the channel
    pub events: u64,
    /// Failed sink writes and finishes, over all sinks
    pub sink_errors: u64,
}

struct Slot {
    sink: Box<dyn EventSink>,
    failed: bool,
}

/// Delivers every event to each sink in registration order
#[derive(Default)]
pub struct Coordinator {
    slots: Vec<Slot>,
}

impl Coordinator {
    /// Create a coordinator with no sinks
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink after the ones already registered
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.push(sink);
        self
    }

    /// Add a sink after the ones already registered
    pub fn push(&mut self, sink: Box<dyn EventSink>) {
        debug!(sink = sink.name(), position = self.slots.len(), "sink registered");
        self.slots.push(Slot { sink, failed: false });
    }

    /// Number of registered sinks
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no sink is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drain `rx` until every sender is gone, then finish each sink.
    ///
    /// A failing sink is reported once and keeps receiving events; it never
    /// stops delivery to the others.
    pub async fn run(mut self, mut rx: EventReceiver) -> FanoutReport {
        let mut report = FanoutReport::default();

        while let Some(event) = rx.recv().await {
            report.events += 1;
            for slot in &mut self.slots {
                if let Err(error) = slot.sink.write(&event).await {
                    report.sink_errors += 1;
                    if !slot.failed {
                        slot.failed = true;
                        warn!(sink = slot.sink.name(), %error, "sink write failed");
                    }
                }
            }
        }

        for slot in &mut self.slots {
            if let Err(error) = slot.sink.finish().await {
                report.sink_errors += 1;
                warn!(sink = slot.sink.name(), %error, "sink finish failed");
            }
        }

        info!(events = report.events, sink_errors = report.sink_errors, "fan-out finished");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::event_channel;
    use async_trait::async_trait;
    use logunify_core::{Column, Event, SinkError};
    use std::sync::{Arc, Mutex};

    type Journal = Arc<Mutex<Vec<String>>>;

    struct Recording {
        name: &'static str,
        journal: Journal,
        fail_writes: bool,
    }

    #[async_trait]
    impl EventSink for Recording {
        fn name(&self) -> &str {
            self.name
        }

        async fn write(&mut self, event: &Event) -> Result<(), SinkError> {
            self.journal
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, event.text));
            if self.fail_writes {
                return Err(SinkError::Closed);
            }
            Ok(())
        }

        async fn finish(&mut self) -> Result<(), SinkError> {
            self.journal.lock().unwrap().push(format!("{}:finish", self.name));
            Ok(())
        }
    }

    fn recording(name: &'static str, journal: &Journal, fail_writes: bool) -> Box<dyn EventSink> {
        Box::new(Recording {
            name,
            journal: Arc::clone(journal),
            fail_writes,
        })
    }

    #[tokio::test]
    async fn test_sinks_see_events_in_order() {
        let journal = Journal::default();
        let coordinator = Coordinator::new()
            .with_sink(recording("mirror", &journal, false))
            .with_sink(recording("log", &journal, false));
        assert_eq!(coordinator.len(), 2);

        let (tx, rx) = event_channel();
        tx.send(Event::now(Column::new(1), "a")).unwrap();
        tx.send(Event::now(Column::new(2), "b")).unwrap();
        drop(tx);

        let report = coordinator.run(rx).await;
        assert_eq!(report, FanoutReport { events: 2, sink_errors: 0 });
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["mirror:a", "log:a", "mirror:b", "log:b", "mirror:finish", "log:finish"]
        );
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_block_others() {
        let journal = Journal::default();
        let coordinator = Coordinator::new()
            .with_sink(recording("broken", &journal, true))
            .with_sink(recording("viewer", &journal, false));

        let (tx, rx) = event_channel();
        for text in ["1", "2", "3"] {
            tx.send(Event::now(Column::new(1), text)).unwrap();
        }
        drop(tx);

        let report = coordinator.run(rx).await;
        assert_eq!(report.events, 3);
        assert_eq!(report.sink_errors, 3);
        let journal = journal.lock().unwrap();
        assert_eq!(journal.iter().filter(|e| e.starts_with("viewer:")).count(), 4);
    }

    #[tokio::test]
    async fn test_no_sinks_still_drains() {
        let coordinator = Coordinator::new();
        assert!(coordinator.is_empty());
        let (tx, rx) = event_channel();
        tx.send(Event::now(Column::new(1), "x")).unwrap();
        drop(tx);
        assert_eq!(coordinator.run(rx).await.events, 1);
    }
}
