//! Which producers and sinks a run uses.
//!
//! The plan is resolved once at startup from the run options and never
//! changes afterwards.

use std::fmt;

/// Where events come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Supervise the configured commands
    Live,
    /// Replay a local log file
    ReplayFromFile,
    /// Replay the stream sent by the remote peer
    ReplayFromRemote,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::ReplayFromFile => write!(f, "replay from file"),
            Self::ReplayFromRemote => write!(f, "replay from remote"),
        }
    }
}

/// A destination events are fanned out to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
    /// Record stream sent to the remote peer
    RemoteMirror,
    /// Persisted local log
    LocalLog,
    /// Per-command text files
    SplitLog,
    /// Interactive viewer
    Viewer,
    /// JSON lines on stdout
    Dump,
    /// Counters and trace logging
    Telemetry,
}

/// Inputs to plan resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Replay instead of supervising commands
    pub replay: bool,
    /// A remote role is configured
    pub remote: bool,
    /// A log file path is configured
    pub logfile: bool,
    /// Split logs were requested
    pub split_log: bool,
    /// The viewer owns the terminal
    pub ui: bool,
    /// Events are dumped as JSON lines
    pub dump: bool,
}

/// Mode plus the ordered sink list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutPlan {
    mode: RunMode,
    sinks: Vec<SinkKind>,
}

impl FanoutPlan {
    /// Resolve the plan for `options`.
    ///
    /// Sinks are listed in delivery order: remote mirror, local log, split
    /// log, then the viewer, the dump, or telemetry.
    #[must_use]
    pub fn resolve(options: &RunOptions) -> Self {
        let mode = match (options.replay, options.remote) {
            (false, _) => RunMode::Live,
            (true, false) => RunMode::ReplayFromFile,
            (true, true) => RunMode::ReplayFromRemote,
        };

        let mut sinks = Vec::new();
        if mode == RunMode::Live && options.remote {
            sinks.push(SinkKind::RemoteMirror);
        }
        if mode != RunMode::ReplayFromFile && options.logfile {
            sinks.push(SinkKind::LocalLog);
        }
        if options.split_log {
            sinks.push(SinkKind::SplitLog);
        }
        sinks.push(if options.ui {
            SinkKind::Viewer
        } else if options.dump {
            SinkKind::Dump
        } else {
            SinkKind::Telemetry
        });

        Self { mode, sinks }
    }

    /// Event source of the run
    #[must_use]
    pub const fn mode(&self) -> RunMode {
        self.mode
    }

    /// Sinks in delivery order
    #[must_use]
    pub fn sinks(&self) -> &[SinkKind] {
        &self.sinks
    }

    /// Whether `kind` is part of the plan
    #[must_use]
    pub fn has(&self, kind: SinkKind) -> bool {
        self.sinks.contains(&kind)
    }

    /// Whether the run reads its events from a recorded stream
    #[must_use]
    pub const fn is_replay(&self) -> bool {
        !matches!(self.mode, RunMode::Live)
    }
}
