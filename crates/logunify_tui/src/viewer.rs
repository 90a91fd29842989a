//! Row-aligned column model behind the terminal viewer.
//!
//! Column 0 holds timestamps, columns `1..=N` hold the output of each
//! command. Every column always has the same number of rows: an event adds
//! one row per output line, filling the other columns with blanks, so a
//! line of output sits next to the time it was read.

use logunify_core::{Column, CommandDescriptor, Event};
use std::collections::VecDeque;
use std::ops::Range;
use tracing::trace;

/// Header of the time column
pub const TIME_HEADER: &str = "Time";

/// Aligned rows of every column plus the shared scroll position
#[derive(Debug, Clone)]
pub struct Viewer {
    headers: Vec<String>,
    columns: Vec<VecDeque<String>>,
    max_lines: usize,
    offset: usize,
    follow: bool,
}

impl Viewer {
    /// Create a viewer for `commands`, keeping at most `max_lines` rows
    /// (0 = unlimited)
    #[must_use]
    pub fn new(commands: &[CommandDescriptor], max_lines: usize) -> Self {
        let headers = std::iter::once(TIME_HEADER.to_string())
            .chain(commands.iter().map(|command| command.name.clone()))
            .collect::<Vec<_>>();
        let columns = vec![VecDeque::new(); headers.len()];
        Self {
            headers,
            columns,
            max_lines,
            offset: 0,
            follow: true,
        }
    }

    /// Column headers, time column first
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of columns including the time column
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Rows currently held
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, VecDeque::len)
    }

    /// Rows of one column
    #[must_use]
    pub fn column(&self, column: Column) -> Option<&VecDeque<String>> {
        self.columns.get(column.get() as usize)
    }

    /// Whether the view is pinned to the newest row
    #[must_use]
    pub const fn is_following(&self) -> bool {
        self.follow
    }

    /// Append an event; events for unknown columns are ignored
    pub fn add_data(&mut self, event: &Event) {
        let target = event.column.get() as usize;
        if event.column.is_time() || target >= self.columns.len() {
            trace!(column = %event.column, "event for unknown column dropped");
            return;
        }

        let stamp = event.timestamp.format_stamp();
        for (line_no, line) in event.lines().enumerate() {
            for (index, column) in self.columns.iter_mut().enumerate() {
                let cell = if index == target {
                    line.to_string()
                } else if index == 0 && line_no == 0 {
                    stamp.clone()
                } else {
                    String::new()
                };
                column.push_back(cell);
            }
        }
        self.trim();
    }

    fn trim(&mut self) {
        if self.max_lines == 0 {
            return;
        }
        let excess = self.row_count().saturating_sub(self.max_lines);
        if excess == 0 {
            return;
        }
        for column in &mut self.columns {
            column.drain(..excess);
        }
        self.offset = self.offset.saturating_sub(excess);
    }

    /// Largest top-row offset for a viewport of `height` rows
    fn max_offset(&self, height: usize) -> usize {
        self.row_count().saturating_sub(height)
    }

    /// Top row shown in a viewport of `height` rows
    #[must_use]
    pub fn offset(&self, height: usize) -> usize {
        if self.follow {
            self.max_offset(height)
        } else {
            self.offset.min(self.max_offset(height))
        }
    }

    /// Row range shown in a viewport of `height` rows
    #[must_use]
    pub fn visible(&self, height: usize) -> Range<usize> {
        let start = self.offset(height);
        start..(start + height).min(self.row_count())
    }

    /// Visible cells of `column` in a viewport of `height` rows
    pub fn visible_rows(&self, column: usize, height: usize) -> impl Iterator<Item = &str> {
        let range = self.visible(height);
        self.columns
            .get(column)
            .into_iter()
            .flat_map(move |rows| rows.range(range.clone()))
            .map(String::as_str)
    }

    /// Scroll towards older rows; leaves follow mode
    pub fn scroll_up(&mut self, rows: usize, height: usize) {
        self.offset = self.offset(height).saturating_sub(rows);
        self.follow = false;
    }

    /// Scroll towards newer rows; stops at the last page without following
    pub fn scroll_down(&mut self, rows: usize, height: usize) {
        if self.follow {
            return;
        }
        self.offset = (self.offset(height) + rows).min(self.max_offset(height));
    }

    /// Jump to the oldest row; leaves follow mode
    pub fn scroll_to_top(&mut self) {
        self.offset = 0;
        self.follow = false;
    }

    /// Jump to the newest row without following
    pub fn scroll_to_bottom(&mut self, height: usize) {
        self.offset = self.max_offset(height);
        self.follow = false;
    }

    /// Pin the view to the newest row again
    pub fn follow(&mut self) {
        self.follow = true;
    }
}
