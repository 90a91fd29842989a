//! Shell discovery.

use crate::error::{RuntimeError, RuntimeResult};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Shells probed in order; the last two cover Android images
pub const SHELL_CANDIDATES: [&str; 4] = ["/bin/bash", "/bin/sh", "/system/bin/sh", "/vendor/bin/sh"];

/// A shell able to run a command string with `-c`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    program: PathBuf,
}

impl Shell {
    /// Use `program` without checking that it exists
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// First existing shell among [`SHELL_CANDIDATES`]
    ///
    /// # Errors
    ///
    /// Returns error if none exists
    pub fn detect() -> RuntimeResult<Self> {
        Self::probe(&SHELL_CANDIDATES)
    }

    /// First existing shell among `candidates`
    ///
    /// # Errors
    ///
    /// Returns error if none exists
    pub fn probe<P: AsRef<Path>>(candidates: &[P]) -> RuntimeResult<Self> {
        let found = candidates.iter().map(AsRef::as_ref).find(|path| path.exists());
        match found {
            Some(program) => {
                debug!(shell = %program.display(), "using shell");
                Ok(Self {
                    program: program.to_path_buf(),
                })
            }
            None => Err(RuntimeError::NoShell {
                candidates: candidates
                    .iter()
                    .map(|path| path.as_ref().display().to_string())
                    .collect(),
            }),
        }
    }

    /// Path of the shell binary
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Process running `command` through this shell.
    ///
    /// Stdout is piped, stdin and stderr are discarded, and the child is
    /// killed when its handle is dropped.
    #[must_use]
    pub fn command(&self, command: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_skips_missing() {
        let shell = Shell::probe(&["/definitely/not/a/shell", "/bin/sh"]).unwrap();
        assert_eq!(shell.program(), Path::new("/bin/sh"));
    }

    #[test]
    fn test_probe_none_found() {
        let err = Shell::probe(&["/nope/a", "/nope/b"]).unwrap_err();
        match err {
            RuntimeError::NoShell { candidates } => assert_eq!(candidates.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_command_runs_through_shell() {
        let shell = Shell::probe(&["/bin/sh"]).unwrap();
        let output = shell.command("echo $((1 + 2))").output().await.unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "3");
    }
}
