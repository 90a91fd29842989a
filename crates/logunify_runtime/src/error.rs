//! Runtime errors.

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Fatal runtime errors; per-command failures never surface here
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// None of the candidate shells exists
    #[error("No suitable shell found (tried {})", candidates.join(", "))]
    NoShell {
        /// Paths that were probed
        candidates: Vec<String>,
    },

    /// An init command could not be spawned or exited unsuccessfully
    #[error("Init command '{command}' failed: {reason}")]
    InitFailed {
        /// The failing command
        command: String,
        /// What went wrong
        reason: String,
    },

    /// No commands were resolved, from the config or a replayed header
    #[error("No commands to run")]
    NoCommands,
}
