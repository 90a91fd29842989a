//! logunify runtime
//!
//! Everything between the producers and the sinks: shell discovery, the
//! per-command supervisors, the event channel, and the coordinator that
//! fans every event out to the sinks chosen for the run.
//!
//! ## Flow
//!
//! 1. [`Shell::detect`] picks the shell commands run through
//! 2. [`run_init`] runs one-shot setup commands
//! 3. [`Supervisor::spawn_all`] starts one task per command
//! 4. [`Coordinator::run`] drains the channel into the sinks of the
//!    resolved [`FanoutPlan`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod error;
pub mod fanout;
pub mod init;
pub mod monitor;
pub mod plan;
pub mod shell;
pub mod supervisor;

pub use channel::{event_channel, EventReceiver, EventSender};
pub use error::{RuntimeError, RuntimeResult};
pub use fanout::{Coordinator, FanoutReport};
pub use init::run_init;
pub use monitor::{ColumnMetrics, Metrics, TelemetrySink};
pub use plan::{FanoutPlan, RunMode, RunOptions, SinkKind};
pub use shell::{Shell, SHELL_CANDIDATES};
pub use supervisor::{Supervisor, Utf8Carry, READ_CHUNK};
