//! Per-command supervision.
//!
//! Each command runs in its own task: spawn through the shell, read stdout
//! in chunks, emit one event per chunk, and restart after exit when the
//! command loops. Cancellation kills the child and ends the task.

use crate::channel::EventSender;
use crate::shell::Shell;
use logunify_core::{assign_columns, Column, CommandDescriptor, Event};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::ChildStdout;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Bytes read from a command's stdout per event at most
pub const READ_CHUNK: usize = 4096;

/// Wait after a failed start of a looping command with no interval
const START_FAILURE_BACKOFF: Duration = Duration::from_secs(1);

/// Decodes a byte stream into text chunk by chunk.
///
/// A multi-byte character split across two reads is held back until its
/// remaining bytes arrive; invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    /// Create an empty decoder
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Decode `bytes` after any carried bytes; may return an empty string
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut complete = 0;
        loop {
            match std::str::from_utf8(&self.pending[complete..]) {
                Ok(_) => {
                    complete = self.pending.len();
                    break;
                }
                // Only an incomplete tail is carried
                Err(err) => match err.error_len() {
                    None => {
                        complete += err.valid_up_to();
                        break;
                    }
                    Some(invalid) => complete += err.valid_up_to() + invalid,
                },
            }
        }
        let rest = self.pending.split_off(complete);
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending = rest;
        text
    }

    /// Flush carried bytes at end of stream
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(text)
    }
}

/// How a single run of a command ended
enum RunEnd {
    Exited,
    StartFailed,
    Stop,
}

/// Spawns and supervises the configured commands
#[derive(Debug, Clone)]
pub struct Supervisor {
    shell: Shell,
    tx: EventSender,
    cancel: CancellationToken,
}

impl Supervisor {
    /// Create a supervisor emitting on `tx` until `cancel` fires
    #[must_use]
    pub fn new(shell: Shell, tx: EventSender, cancel: CancellationToken) -> Self {
        Self { shell, tx, cancel }
    }

    /// Start one task per command, columns assigned in list order.
    ///
    /// The supervisor keeps its own sender; drop it after spawning so the
    /// channel closes once every task has ended.
    pub fn spawn_all(&self, commands: &[CommandDescriptor]) -> JoinSet<()> {
        let mut tasks = JoinSet::new();
        for (column, command) in assign_columns(commands) {
            let worker = self.clone();
            let command = command.clone();
            tasks.spawn(async move { worker.supervise(column, command).await });
        }
        tasks
    }

    /// Run one command until it stops looping, cancellation, or the
    /// receiver going away
    pub async fn supervise(self, column: Column, command: CommandDescriptor) {
        let mut runs = 0u64;
        loop {
            runs += 1;
            let end = self.run_once(column, &command).await;

            let delay = match end {
                RunEnd::Stop => break,
                _ if !command.repeat => break,
                RunEnd::StartFailed if command.interval_ms == 0 => START_FAILURE_BACKOFF,
                RunEnd::Exited | RunEnd::StartFailed => command.interval(),
            };

            if !delay.is_zero() {
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }
            } else if self.cancel.is_cancelled() {
                break;
            }
        }
        debug!(%column, command = %command.name, runs, "supervision ended");
    }

    async fn run_once(&self, column: Column, command: &CommandDescriptor) -> RunEnd {
        let mut child = match self.shell.command(&command.name).spawn() {
            Ok(child) => child,
            Err(err) => {
                warn!(%column, command = %command.name, error = %err, "failed to start command");
                let event = Event::start_failure(column, &command.name, err);
                return if self.tx.send(event).is_ok() {
                    RunEnd::StartFailed
                } else {
                    RunEnd::Stop
                };
            }
        };
        debug!(%column, command = %command.name, pid = ?child.id(), "command started");

        let Some(stdout) = child.stdout.take() else {
            let event = Event::start_failure(column, &command.name, "stdout not captured");
            if let Err(err) = child.kill().await {
                debug!(%column, error = %err, "kill after missing stdout failed");
            }
            return if self.tx.send(event).is_ok() {
                RunEnd::StartFailed
            } else {
                RunEnd::Stop
            };
        };

        let keep_going = self.pump(column, stdout).await;
        if !keep_going {
            if let Err(err) = child.kill().await {
                debug!(%column, error = %err, "kill after stop failed");
            }
            return RunEnd::Stop;
        }

        // stdout may close long before the process exits
        let waited = tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            waited = child.wait() => Some(waited),
        };
        match waited {
            Some(Ok(status)) => {
                debug!(%column, command = %command.name, %status, "command exited");
            }
            Some(Err(err)) => {
                warn!(%column, command = %command.name, error = %err, "wait failed");
            }
            None => {
                if let Err(err) = child.kill().await {
                    debug!(%column, error = %err, "kill after stop failed");
                }
                return RunEnd::Stop;
            }
        }
        RunEnd::Exited
    }

    /// Forward stdout until EOF; `false` when the task must stop
    async fn pump(&self, column: Column, mut stdout: ChildStdout) -> bool {
        let mut buf = vec![0u8; READ_CHUNK];
        let mut carry = Utf8Carry::new();
        loop {
            let read = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return false,
                read = stdout.read(&mut buf) => read,
            };

            let text = match read {
                Ok(0) => break,
                Ok(n) => carry.push(&buf[..n]),
                Err(err) => {
                    debug!(%column, error = %err, "stdout read failed");
                    break;
                }
            };
            if !text.is_empty() && self.tx.send(Event::now(column, text)).is_err() {
                info!(%column, "event receiver gone, stopping command");
                return false;
            }
        }

        if let Some(rest) = carry.finish() {
            if self.tx.send(Event::now(column, rest)).is_err() {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::event_channel;
    use proptest::prelude::*;
    use tokio::time::{timeout, Instant};

    fn shell() -> Shell {
        Shell::probe(&["/bin/sh"]).unwrap()
    }

    #[test]
    fn test_utf8_carry_split_character() {
        let bytes = "héllo".as_bytes();
        let mut carry = Utf8Carry::new();
        // 'é' is two bytes at 1..3; cut inside it
        assert_eq!(carry.push(&bytes[..2]), "h");
        assert_eq!(carry.push(&bytes[2..]), "éllo");
        assert!(carry.finish().is_none());
    }

    #[test]
    fn test_utf8_carry_invalid_bytes_replaced() {
        let mut carry = Utf8Carry::new();
        assert_eq!(carry.push(&[b'a', 0xFF, b'b']), "a\u{FFFD}b");
        assert_eq!(carry.push(&[0xE2, 0x82]), "");
        assert_eq!(carry.finish().as_deref(), Some("\u{FFFD}"));
    }

    proptest! {
        #[test]
        fn prop_utf8_carry_any_split(text in "\\PC{0,40}", cut in 0usize..200) {
            let bytes = text.as_bytes();
            let cut = cut.min(bytes.len());
            let mut carry = Utf8Carry::new();
            let mut out = carry.push(&bytes[..cut]);
            out.push_str(&carry.push(&bytes[cut..]));
            prop_assert!(carry.finish().is_none());
            prop_assert_eq!(out, text);
        }
    }

    #[tokio::test]
    async fn test_single_run_emits_output_then_closes() {
        let (tx, mut rx) = event_channel();
        let supervisor = Supervisor::new(shell(), tx, CancellationToken::new());
        let mut tasks = supervisor.spawn_all(&[CommandDescriptor::once("echo hi")]);
        drop(supervisor);

        let mut text = String::new();
        while let Some(event) = rx.recv().await {
            assert_eq!(event.column, Column::new(1));
            text.push_str(&event.text);
        }
        assert_eq!(text, "hi\n");
        while tasks.join_next().await.is_some() {}
    }

    #[tokio::test]
    async fn test_columns_follow_list_order() {
        let (tx, mut rx) = event_channel();
        let supervisor = Supervisor::new(shell(), tx, CancellationToken::new());
        let commands = vec![CommandDescriptor::once("echo one"), CommandDescriptor::once("echo two")];
        let _tasks = supervisor.spawn_all(&commands);
        drop(supervisor);

        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            seen.push((event.column.get(), event.text));
        }
        seen.sort();
        assert_eq!(seen, vec![(1, "one\n".to_string()), (2, "two\n".to_string())]);
    }

    #[tokio::test]
    async fn test_loop_waits_interval_between_runs() {
        let (tx, mut rx) = event_channel();
        let cancel = CancellationToken::new();
        let supervisor = Supervisor::new(shell(), tx, cancel.clone());
        let _tasks = supervisor.spawn_all(&[CommandDescriptor::looping("echo tick", 50)]);
        drop(supervisor);

        let mut arrivals = Vec::new();
        while arrivals.len() < 3 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.text, "tick\n");
            arrivals.push(Instant::now());
        }
        cancel.cancel();

        for pair in arrivals.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(50));
        }
        // All tasks stop and the channel closes
        timeout(Duration::from_secs(5), async { while rx.recv().await.is_some() {} })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancellation_kills_long_running_command() {
        let (tx, mut rx) = event_channel();
        let cancel = CancellationToken::new();
        let supervisor = Supervisor::new(shell(), tx, cancel.clone());
        let mut tasks = supervisor.spawn_all(&[CommandDescriptor::once("echo start; sleep 30")]);
        drop(supervisor);

        assert_eq!(rx.recv().await.unwrap().text, "start\n");
        cancel.cancel();

        timeout(Duration::from_secs(5), async { while tasks.join_next().await.is_some() {} })
            .await
            .unwrap();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_cancellation_kills_command_after_stdout_closed() {
        let (tx, mut rx) = event_channel();
        let cancel = CancellationToken::new();
        let supervisor = Supervisor::new(shell(), tx, cancel.clone());
        let mut tasks =
            supervisor.spawn_all(&[CommandDescriptor::once("echo start; exec >/dev/null; sleep 30")]);
        drop(supervisor);

        assert_eq!(rx.recv().await.unwrap().text, "start\n");
        cancel.cancel();

        timeout(Duration::from_secs(5), async { while tasks.join_next().await.is_some() {} })
            .await
            .unwrap();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_restarts_without_delay() {
        let (tx, mut rx) = event_channel();
        let cancel = CancellationToken::new();
        let supervisor = Supervisor::new(shell(), tx, cancel.clone());
        let mut tasks = supervisor.spawn_all(&[CommandDescriptor::looping("echo again", 0)]);
        drop(supervisor);

        let start = Instant::now();
        for _ in 0..3 {
            assert_eq!(rx.recv().await.unwrap().text, "again\n");
        }
        // No timer was armed, so paused time never moved
        assert_eq!(start.elapsed(), Duration::ZERO);

        cancel.cancel();
        while tasks.join_next().await.is_some() {}
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_failure_backs_off_one_second() {
        let (tx, mut rx) = event_channel();
        let cancel = CancellationToken::new();
        let supervisor = Supervisor::new(Shell::new("/nonexistent/shell"), tx, cancel.clone());
        let mut tasks = supervisor.spawn_all(&[CommandDescriptor::looping("uptime", 0)]);
        drop(supervisor);

        let mut arrivals = Vec::new();
        while arrivals.len() < 3 {
            let event = rx.recv().await.unwrap();
            assert!(event.text.starts_with("[ Error starting uptime: "));
            arrivals.push(Instant::now());
        }
        for pair in arrivals.windows(2) {
            assert!(pair[1] - pair[0] >= START_FAILURE_BACKOFF);
        }

        cancel.cancel();
        while tasks.join_next().await.is_some() {}
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_start_failure_emits_event() {
        let (tx, mut rx) = event_channel();
        let supervisor = Supervisor::new(
            Shell::new("/nonexistent/shell"),
            tx,
            CancellationToken::new(),
        );
        let _tasks = supervisor.spawn_all(&[CommandDescriptor::once("uptime")]);
        drop(supervisor);

        let event = rx.recv().await.unwrap();
        assert!(event.text.starts_with("[ Error starting uptime: "), "{}", event.text);
        assert!(event.text.ends_with(" ]"));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_stops_when_receiver_dropped() {
        let (tx, rx) = event_channel();
        drop(rx);
        let supervisor = Supervisor::new(shell(), tx, CancellationToken::new());
        let mut tasks = supervisor.spawn_all(&[CommandDescriptor::looping("echo x", 0)]);

        timeout(Duration::from_secs(5), async { while tasks.join_next().await.is_some() {} })
            .await
            .unwrap();
    }
}
