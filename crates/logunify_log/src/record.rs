//! Record types of a persisted or transmitted stream.

use logunify_core::{CommandDescriptor, Event, VersionTag};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One record of a stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Record {
    /// Version tag, first record of every stream
    Version(VersionTag),
    /// One command descriptor; all of them follow the version
    Config(CommandDescriptor),
    /// Captured output
    Event(Event),
}

impl Record {
    /// Kind of this record
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::Version(_) => RecordKind::Version,
            Self::Config(_) => RecordKind::Config,
            Self::Event(_) => RecordKind::Event,
        }
    }

    /// Borrowed view with the same encoding
    #[must_use]
    pub fn borrowed(&self) -> RecordRef<'_> {
        match self {
            Self::Version(tag) => RecordRef::Version(tag),
            Self::Config(command) => RecordRef::Config(command),
            Self::Event(event) => RecordRef::Event(event),
        }
    }
}

/// Borrowed record used on the write path.
///
/// Variants mirror [`Record`] one to one, so both serialize to the same bytes
/// and an event can be written without cloning it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordRef<'a> {
    /// Version tag
    Version(&'a VersionTag),
    /// Command descriptor
    Config(&'a CommandDescriptor),
    /// Captured output
    Event(&'a Event),
}

impl RecordRef<'_> {
    /// Kind of this record
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::Version(_) => RecordKind::Version,
            Self::Config(_) => RecordKind::Config,
            Self::Event(_) => RecordKind::Event,
        }
    }
}

/// Record discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Version tag
    Version,
    /// Command descriptor
    Config,
    /// Captured output
    Event,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Version => write!(f, "version"),
            Self::Config => write!(f, "config"),
            Self::Event => write!(f, "event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logunify_core::{Column, Timestamp};

    #[test]
    fn test_record_kind() {
        let event = Event::at(Timestamp::new(1, 0), Column::new(1), "x");
        assert_eq!(Record::Event(event).kind(), RecordKind::Event);
        assert_eq!(Record::Version("1".into()).kind(), RecordKind::Version);
        assert_eq!(
            Record::Config(CommandDescriptor::once("ls")).kind(),
            RecordKind::Config
        );
    }

    #[test]
    fn test_borrowed_record_encodes_identically() {
        let records = vec![
            Record::Version(VersionTag::new("0.1.0")),
            Record::Config(CommandDescriptor::looping("date", 500)),
            Record::Event(Event::at(Timestamp::new(9, 42), Column::new(2), "out\n")),
        ];
        for record in &records {
            let owned = postcard::to_allocvec(record).unwrap();
            let borrowed = postcard::to_allocvec(&record.borrowed()).unwrap();
            assert_eq!(owned, borrowed, "{} record", record.kind());
            assert_eq!(record.borrowed().kind(), record.kind());
        }
    }

    #[test]
    fn test_record_kind_display() {
        assert_eq!(RecordKind::Config.to_string(), "config");
    }
}
