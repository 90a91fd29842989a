//! Replay engine for recorded streams.

use crate::pacing::{Pacer, Pacing};
use logunify_core::Event;
use logunify_log::RecordReader;
use std::fmt;
use tokio::io::AsyncRead;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Replay engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplayConfig {
    /// Replay speed
    pub pacing: Pacing,
    /// Maximum events to replay (0 = unlimited)
    pub max_events: usize,
}

impl ReplayConfig {
    /// Builder: set the pacing
    #[must_use]
    pub const fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Builder: stop after `max_events` events
    #[must_use]
    pub const fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }
}

/// Lifecycle of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    /// Created, not yet run
    NotStarted,
    /// Emitting events
    Streaming,
    /// Finished; cannot be restarted
    Done,
}

/// Why a replay ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// The stream ended at a record boundary
    EndOfStream,
    /// The stream was cut mid-record or held an undecodable record
    Truncated(String),
    /// The receiver went away, shutdown was requested, or the event limit
    /// was reached
    Stopped,
}

impl fmt::Display for ReplayOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndOfStream => write!(f, "end of stream"),
            Self::Truncated(reason) => write!(f, "truncated stream: {reason}"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Summary of a finished replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    /// Events delivered to the channel
    pub events: usize,
    /// How the replay ended
    pub outcome: ReplayOutcome,
}

/// Replay errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    /// The engine already ran to completion
    #[error("Replay already finished")]
    AlreadyDone,
}

/// Reads events from a record stream and emits them on the pipeline channel
pub struct ReplayEngine<R> {
    config: ReplayConfig,
    reader: Option<RecordReader<R>>,
    cancel: CancellationToken,
    state: ReplayState,
}

impl<R: AsyncRead + Unpin> ReplayEngine<R> {
    /// Create an engine over a reader positioned after the stream header
    #[must_use]
    pub fn new(reader: RecordReader<R>) -> Self {
        Self {
            config: ReplayConfig::default(),
            reader: Some(reader),
            cancel: CancellationToken::new(),
            state: ReplayState::NotStarted,
        }
    }

    /// Create with custom config
    #[must_use]
    pub fn with_config(mut self, config: ReplayConfig) -> Self {
        self.config = config;
        self
    }

    /// Stop early when `cancel` fires
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> ReplayState {
        self.state
    }

    /// Emit every remaining event on `tx`, then drop it.
    ///
    /// Decode failures end the replay quietly; the report says whether the
    /// stream ended cleanly.
    ///
    /// # Errors
    ///
    /// Returns error if the engine already ran
    pub async fn run(&mut self, tx: UnboundedSender<Event>) -> Result<ReplayReport, ReplayError> {
        let Some(mut reader) = self.reader.take() else {
            return Err(ReplayError::AlreadyDone);
        };
        self.state = ReplayState::Streaming;
        debug!(pacing = ?self.config.pacing, "replay started");

        let mut pacer = Pacer::new(self.config.pacing);
        let mut events = 0usize;
        let outcome = loop {
            if self.config.max_events > 0 && events >= self.config.max_events {
                break ReplayOutcome::Stopped;
            }

            let event = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break ReplayOutcome::Stopped,
                next = reader.read_event() => match next {
                    Ok(Some(event)) => event,
                    Ok(None) => break ReplayOutcome::EndOfStream,
                    Err(err) => break ReplayOutcome::Truncated(err.to_string()),
                },
            };

            let delay = pacer.delay_for(event.timestamp);
            if !delay.is_zero() {
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => break ReplayOutcome::Stopped,
                    () = tokio::time::sleep(delay) => {}
                }
            }

            if tx.send(event).is_err() {
                debug!("event receiver gone, stopping replay");
                break ReplayOutcome::Stopped;
            }
            events += 1;
        };

        drop(tx);
        self.state = ReplayState::Done;
        info!(events, %outcome, "replay finished");
        Ok(ReplayReport { events, outcome })
    }
}
