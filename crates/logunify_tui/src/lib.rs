//! logunify viewer
//!
//! Terminal UI showing one column per command next to a time column, with
//! rows aligned across columns and a shared scroll position.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod input;
pub mod layout;
pub mod sink;
pub mod ui;
pub mod viewer;

pub use input::{InputEvent, InputHandler, KeyBinding, KeyCombo};
pub use layout::{CalculatedLayout, Layout, TIME_COLUMN_WIDTH};
pub use sink::{viewer_channel, ViewerMessage, ViewerReceiver, ViewerSender, ViewerSink};
pub use ui::{TuiApp, TuiConfig, TuiError};
pub use viewer::{Viewer, TIME_HEADER};
