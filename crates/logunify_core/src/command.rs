//! Command descriptors and the column index that identifies each of them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One monitored shell command
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandDescriptor {
    /// Literal shell command, also used as the display label
    pub name: String,
    /// Restart the command after it exits
    #[serde(rename = "loop")]
    pub repeat: bool,
    /// Delay between runs when looping; zero restarts immediately
    #[serde(rename = "intervalMs")]
    pub interval_ms: u64,
}

impl CommandDescriptor {
    /// A command that runs once
    #[must_use]
    pub fn once(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repeat: false,
            interval_ms: 0,
        }
    }

    /// A command restarted after every exit, `interval_ms` apart
    #[must_use]
    pub fn looping(name: impl Into<String>, interval_ms: u64) -> Self {
        Self {
            name: name.into(),
            repeat: true,
            interval_ms,
        }
    }

    /// Delay inserted between two runs
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl fmt::Display for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (loop: {}, intervalMs: {})",
            self.name, self.repeat, self.interval_ms
        )
    }
}

/// 1-based index of a command in the configured list.
///
/// Column 0 is reserved for the synthetic time track of the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Column(u32);

impl Column {
    /// The time track
    pub const TIME: Column = Column(0);

    /// Create from a raw column number
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Column of the command at 0-based `position` in the list
    #[must_use]
    pub fn for_position(position: usize) -> Self {
        Self(u32::try_from(position + 1).unwrap_or(u32::MAX))
    }

    /// Raw column number
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// 0-based position in the command list, `None` for the time track
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }

    /// Whether this is the time track
    #[must_use]
    pub const fn is_time(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pair every descriptor with its column, `1..=N` in list order
pub fn assign_columns(
    commands: &[CommandDescriptor],
) -> impl Iterator<Item = (Column, &CommandDescriptor)> {
    commands
        .iter()
        .enumerate()
        .map(|(position, command)| (Column::for_position(position), command))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_descriptor_constructors() {
        let once = CommandDescriptor::once("uptime");
        assert!(!once.repeat);
        assert_eq!(once.interval(), Duration::ZERO);

        let looping = CommandDescriptor::looping("date", 250);
        assert!(looping.repeat);
        assert_eq!(looping.interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_descriptor_display() {
        let cmd = CommandDescriptor::looping("free -m", 1000);
        assert_eq!(cmd.to_string(), "free -m (loop: true, intervalMs: 1000)");
    }

    #[test]
    fn test_column_position_roundtrip() {
        assert_eq!(Column::for_position(0), Column::new(1));
        assert_eq!(Column::new(3).position(), Some(2));
        assert_eq!(Column::TIME.position(), None);
        assert!(Column::TIME.is_time());
    }

    #[test]
    fn test_assign_columns_in_list_order() {
        let commands = vec![
            CommandDescriptor::once("a"),
            CommandDescriptor::once("b"),
            CommandDescriptor::once("c"),
        ];
        let assigned: Vec<(u32, &str)> = assign_columns(&commands)
            .map(|(column, command)| (column.get(), command.name.as_str()))
            .collect();
        assert_eq!(assigned, vec![(1, "a"), (2, "b"), (3, "c")]);
    }

    proptest! {
        #[test]
        fn prop_columns_are_one_based_and_stable(names in proptest::collection::vec("[a-z]{1,8}", 0..32)) {
            let commands: Vec<CommandDescriptor> =
                names.iter().map(|n| CommandDescriptor::once(n.clone())).collect();
            let first: Vec<Column> = assign_columns(&commands).map(|(c, _)| c).collect();
            let second: Vec<Column> = assign_columns(&commands).map(|(c, _)| c).collect();
            prop_assert_eq!(&first, &second);
            for (i, column) in first.iter().enumerate() {
                prop_assert_eq!(column.get() as usize, i + 1);
            }
        }
    }
}
