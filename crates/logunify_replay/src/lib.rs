//! logunify replay
//!
//! Turns a recorded stream back into events on the pipeline channel, either
//! as fast as possible or reproducing the gaps between the original
//! timestamps.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod pacing;

pub use engine::{ReplayConfig, ReplayEngine, ReplayError, ReplayOutcome, ReplayReport, ReplayState};
pub use pacing::{Pacer, Pacing};
