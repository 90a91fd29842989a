//! Reproducing the original gaps between events.

use logunify_core::Timestamp;
use std::time::Duration;

/// Replay speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    /// Emit events back to back
    #[default]
    AsFastAsPossible,
    /// Wait between events as long as the original run did
    Realtime,
}

/// Computes the wait before each event.
///
/// The first event is the reference and goes out immediately; every later
/// event waits for its distance to the previous one. Timestamps going
/// backwards give no wait.
#[derive(Debug, Clone)]
pub struct Pacer {
    pacing: Pacing,
    previous: Option<Timestamp>,
}

impl Pacer {
    /// Create a pacer
    #[must_use]
    pub const fn new(pacing: Pacing) -> Self {
        Self {
            pacing,
            previous: None,
        }
    }

    /// Wait to apply before emitting an event stamped `timestamp`
    pub fn delay_for(&mut self, timestamp: Timestamp) -> Duration {
        let previous = self.previous.replace(timestamp);
        match (self.pacing, previous) {
            (Pacing::Realtime, Some(previous)) => timestamp.duration_since(&previous),
            _ => Duration::ZERO,
        }
    }
}
