//! The captured-output event that flows through every stage.

use crate::command::Column;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// A chunk of output read from one command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Wall-clock time the chunk was read
    pub timestamp: Timestamp,
    /// Column of the producing command
    pub column: Column,
    /// Output text; not necessarily line aligned
    pub text: String,
}

impl Event {
    /// Create an event stamped with the current time
    #[must_use]
    pub fn now(column: Column, text: impl Into<String>) -> Self {
        Self::at(Timestamp::now(), column, text)
    }

    /// Create an event with an explicit timestamp
    #[must_use]
    pub fn at(timestamp: Timestamp, column: Column, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            column,
            text: text.into(),
        }
    }

    /// Synthetic event reporting that a command could not be started
    #[must_use]
    pub fn start_failure(column: Column, command: &str, reason: impl std::fmt::Display) -> Self {
        Self::now(column, format!("[ Error starting {command}: {reason} ]"))
    }

    /// Lines of the text with trailing newlines removed
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.trim_end_matches('\n').split('\n')
    }
}
