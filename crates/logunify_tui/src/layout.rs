//! Screen areas of the viewer: the column grid and the status line.

use ratatui::layout::{Constraint, Direction, Layout as Splitter, Rect};

/// Default width of the time column, borders included
pub const TIME_COLUMN_WIDTH: u16 = 16;

/// Layout manager for calculating screen areas
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    time_width: u16,
    status_height: u16,
}

impl Layout {
    /// Create a new layout
    #[must_use]
    pub const fn new() -> Self {
        Self {
            time_width: TIME_COLUMN_WIDTH,
            status_height: 1,
        }
    }

    /// Set the time column width
    #[must_use]
    pub const fn with_time_width(mut self, width: u16) -> Self {
        self.time_width = width;
        self
    }

    /// Split the terminal into grid and status line
    #[must_use]
    pub fn calculate(&self, size: Rect) -> CalculatedLayout {
        let status_height = self.status_height.min(size.height);
        let grid_height = size.height.saturating_sub(status_height);

        CalculatedLayout {
            grid_area: Rect {
                height: grid_height,
                ..size
            },
            status_area: Rect {
                y: size.y + grid_height,
                height: status_height,
                ..size
            },
        }
    }

    /// Areas of the time column followed by `commands` equal-width columns
    #[must_use]
    pub fn columns(&self, grid: Rect, commands: usize) -> Vec<Rect> {
        let constraints = std::iter::once(Constraint::Length(self.time_width))
            .chain((0..commands).map(|_| Constraint::Fill(1)))
            .collect::<Vec<_>>();
        Splitter::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(grid)
            .to_vec()
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new()
    }
}

/// Calculated layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalculatedLayout {
    /// Bordered column grid
    pub grid_area: Rect,
    /// One-line status bar
    pub status_area: Rect,
}

impl CalculatedLayout {
    /// Rows of output visible inside a bordered column
    #[must_use]
    pub fn visible_rows(&self) -> usize {
        usize::from(self.grid_area.height.saturating_sub(2))
    }
}
