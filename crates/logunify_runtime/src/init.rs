//! One-shot setup commands run before supervision starts.

use crate::error::{RuntimeError, RuntimeResult};
use crate::shell::Shell;
use tracing::{debug, info};

/// Run `commands` one after another through `shell`.
///
/// # Errors
///
/// Returns error on the first command that cannot be spawned or exits
/// unsuccessfully; later commands are not run
pub async fn run_init(shell: &Shell, commands: &[String]) -> RuntimeResult<()> {
    for command in commands {
        info!(command = %command, "running init command");
        let output = shell
            .command(command)
            .output()
            .await
            .map_err(|err| RuntimeError::InitFailed {
                command: command.clone(),
                reason: err.to_string(),
            })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!(command = %command, "{line}");
        }
        if !output.status.success() {
            return Err(RuntimeError::InitFailed {
                command: command.clone(),
                reason: output.status.to_string(),
            });
        }
    }
    Ok(())
}
