//! Command-line flags and their validation.

use crate::config::FlagValue;
use clap::Parser;
use logunify_remote::RemoteRole;
use logunify_replay::Pacing;
use logunify_runtime::RunOptions;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// Default TCP port for remote sessions
pub const DEFAULT_PORT: u32 = 20000;

/// Default viewer scrollback
pub const DEFAULT_MAX_LINES: i64 = 500;

/// Flag combinations that cannot run
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlagError {
    /// Both transport roles were requested
    #[error("Can only --listen or --connect")]
    ListenAndConnect,
    /// Port outside 1..=65535
    #[error("Invalid port {0}")]
    InvalidPort(u32),
    /// Split logs are named after the log file
    #[error("Logfile required when splitting log")]
    SplitLogWithoutLogfile,
    /// The dump sink replaces the viewer
    #[error("--dump cannot be combined with --ui")]
    DumpWithUi,
    /// Replay needs a log file or a remote peer to read from
    #[error("Nothing to replay: give --logfile, --listen or --connect")]
    NothingToReplay,
}

/// logunify: watch several shell commands side by side, record them, and
/// replay the recording
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "logunify", version, about, long_about = None)]
pub struct Flags {
    /// Config file to use; only required when recording, not for replaying
    #[arg(long, default_value = "./logunify.yaml")]
    pub config: PathBuf,

    /// Log file to write to, or to replay from
    #[arg(long)]
    pub logfile: Option<PathBuf>,

    /// Split log output into one file per command
    #[arg(long)]
    pub splitlog: bool,

    /// Replay log data from a file or a remote peer
    #[arg(long)]
    pub replay: bool,

    /// Replay in real time, including pauses
    #[arg(long)]
    pub realtime: bool,

    /// Listen for one incoming connection
    #[arg(long)]
    pub listen: bool,

    /// Connect to a remote host
    #[arg(long)]
    pub connect: bool,

    /// Address to connect or bind to
    #[arg(long, default_value = "")]
    pub address: String,

    /// Port to use for the remote session
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u32,

    /// Maximum lines in the viewer, 0 for unlimited scrollback
    #[arg(long, default_value_t = DEFAULT_MAX_LINES, allow_negative_numbers = true)]
    pub maxlines: i64,

    /// Enable the viewer; implied without a log file, a remote, or --dump
    #[arg(long)]
    pub ui: bool,

    /// Print every event as a JSON line on stdout instead of the viewer
    #[arg(long)]
    pub dump: bool,

    /// Write diagnostics here while the viewer owns the terminal
    #[arg(long)]
    pub trace_file: Option<PathBuf>,
}

impl Flags {
    /// Apply string overrides from the config file or environment.
    ///
    /// Unknown keys and unparsable numbers are skipped.
    pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, FlagValue>) {
        for (key, value) in overrides {
            let text = value.to_string();
            let enabled = text == "true";
            match key.as_str() {
                "address" | "addr" => self.address = text,
                "logfile" => self.logfile = Some(PathBuf::from(text)),
                "ui" => self.ui = enabled,
                "dump" => self.dump = enabled,
                "replay" => self.replay = enabled,
                "realtime" => self.realtime = enabled,
                "listen" => self.listen = enabled,
                "connect" => self.connect = enabled,
                "splitlog" => self.splitlog = enabled,
                "port" => match text.parse() {
                    Ok(port) => self.port = port,
                    Err(_) => debug!(value = %text, "ignoring unparsable port override"),
                },
                "maxLines" | "maxlines" => match text.parse() {
                    Ok(lines) => self.maxlines = lines,
                    Err(_) => debug!(value = %text, "ignoring unparsable maxlines override"),
                },
                other => debug!(key = other, "ignoring unknown flag override"),
            }
        }
    }

    /// Clamp the scrollback and imply the viewer when events would
    /// otherwise go nowhere visible
    pub fn finalize(&mut self) {
        self.maxlines = self.maxlines.max(0);
        if !(self.has_logfile() || self.has_remote() || self.dump) {
            self.ui = true;
        }
    }

    /// Reject combinations that cannot run
    ///
    /// # Errors
    ///
    /// Returns the first conflict found
    pub fn validate(&self) -> Result<(), FlagError> {
        if self.listen && self.connect {
            return Err(FlagError::ListenAndConnect);
        }
        if u16::try_from(self.port).map_or(true, |port| port == 0) {
            return Err(FlagError::InvalidPort(self.port));
        }
        if self.splitlog && !self.has_logfile() {
            return Err(FlagError::SplitLogWithoutLogfile);
        }
        if self.dump && self.ui {
            return Err(FlagError::DumpWithUi);
        }
        if self.replay && !(self.has_logfile() || self.has_remote()) {
            return Err(FlagError::NothingToReplay);
        }
        Ok(())
    }

    /// Whether a log file was given
    #[must_use]
    pub fn has_logfile(&self) -> bool {
        self.logfile
            .as_ref()
            .is_some_and(|path| !path.as_os_str().is_empty())
    }

    /// Whether a transport role was requested
    #[must_use]
    pub const fn has_remote(&self) -> bool {
        self.listen || self.connect
    }

    /// Transport role and address, if any.
    ///
    /// An empty address binds every interface when listening and dials the
    /// loopback interface when connecting.
    #[must_use]
    pub fn remote_role(&self) -> Option<RemoteRole> {
        let port = u16::try_from(self.port).ok()?;
        if self.listen {
            let host = if self.address.is_empty() { "0.0.0.0" } else { &self.address };
            Some(RemoteRole::Listen(RemoteRole::address_of(host, port)))
        } else if self.connect {
            let host = if self.address.is_empty() { "127.0.0.1" } else { &self.address };
            Some(RemoteRole::Connect(RemoteRole::address_of(host, port)))
        } else {
            None
        }
    }

    /// Inputs for resolving the fan-out plan
    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            replay: self.replay,
            remote: self.has_remote(),
            logfile: self.has_logfile(),
            split_log: self.splitlog,
            ui: self.ui,
            dump: self.dump,
        }
    }

    /// Replay pacing
    #[must_use]
    pub const fn pacing(&self) -> Pacing {
        if self.realtime { Pacing::Realtime } else { Pacing::AsFastAsPossible }
    }

    /// Viewer scrollback, 0 for unlimited
    #[must_use]
    pub fn max_lines(&self) -> usize {
        usize::try_from(self.maxlines).unwrap_or(0)
    }
}
