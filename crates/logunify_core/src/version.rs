//! Version tag embedded at the start of every persisted stream.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version of this build, written into every stream it records
pub const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Opaque version tag carried by a stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionTag(String);

impl VersionTag {
    /// Create a tag from any string
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Tag of the running build
    #[must_use]
    pub fn current() -> Self {
        Self::new(BUILD_VERSION)
    }

    /// Borrow the raw tag
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare a recorded tag against the expected one.
    ///
    /// A mismatch never blocks replay; callers only warn about it.
    #[must_use]
    pub fn check(&self, expected: &VersionTag) -> VersionCheck {
        if self == expected {
            VersionCheck::Match
        } else {
            VersionCheck::Mismatch {
                recorded: self.clone(),
                expected: expected.clone(),
            }
        }
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionTag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// Outcome of comparing a recorded version with the running one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheck {
    /// Tags are identical
    Match,
    /// Tags differ
    Mismatch {
        /// Tag found in the stream
        recorded: VersionTag,
        /// Tag of the reader
        expected: VersionTag,
    },
}

impl VersionCheck {
    /// Whether the tags matched
    #[must_use]
    pub const fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }
}
