//! Terminal viewer app.

use crate::input::{InputEvent, InputHandler};
use crate::layout::{CalculatedLayout, Layout};
use crate::sink::{ViewerMessage, ViewerReceiver};
use crate::viewer::Viewer;
use logunify_core::CommandDescriptor;
use ratatui::{
    backend::CrosstermBackend,
    crossterm::{
        execute,
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    },
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::debug;

/// TUI configuration
#[derive(Debug, Clone)]
pub struct TuiConfig {
    /// Redraw interval in milliseconds
    pub tick_rate_ms: u64,
    /// Rows kept per column (0 = unlimited)
    pub max_lines: usize,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 100,
            max_lines: 500,
        }
    }
}

/// TUI errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum TuiError {
    /// Terminal setup or teardown failed
    #[error("terminal error: {0}")]
    Terminal(String),
    /// Reading input failed
    #[error("io error: {0}")]
    Io(String),
    /// Drawing failed
    #[error("render error: {0}")]
    Render(String),
}

/// Viewer application state
pub struct TuiApp {
    viewer: Viewer,
    rx: ViewerReceiver,
    input: InputHandler,
    layout: Layout,
    page: usize,
    ended: bool,
    should_quit: bool,
}

impl TuiApp {
    /// Create a viewer for `commands`, fed from `rx`
    #[must_use]
    pub fn new(commands: &[CommandDescriptor], rx: ViewerReceiver, config: &TuiConfig) -> Self {
        Self {
            viewer: Viewer::new(commands, config.max_lines),
            rx,
            input: InputHandler::new().with_timeout(Duration::from_millis(config.tick_rate_ms)),
            layout: Layout::new(),
            page: 0,
            ended: false,
            should_quit: false,
        }
    }

    /// Underlying column model
    #[must_use]
    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    /// Whether the producer side signalled its end
    #[must_use]
    pub const fn has_ended(&self) -> bool {
        self.ended
    }

    /// Whether the user asked to quit
    #[must_use]
    pub const fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Take over the terminal and run until the user quits.
    ///
    /// Blocks the calling thread.
    ///
    /// # Errors
    ///
    /// Returns error if terminal setup, drawing, or input fails
    pub fn run(&mut self) -> Result<(), TuiError> {
        enable_raw_mode().map_err(|e| TuiError::Terminal(e.to_string()))?;
        execute!(std::io::stdout(), EnterAlternateScreen)
            .map_err(|e| TuiError::Terminal(e.to_string()))?;

        let backend = CrosstermBackend::new(std::io::stdout());
        let mut terminal =
            ratatui::Terminal::new(backend).map_err(|e| TuiError::Terminal(e.to_string()))?;

        let result = self.run_inner(&mut terminal);

        disable_raw_mode().map_err(|e| TuiError::Terminal(e.to_string()))?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)
            .map_err(|e| TuiError::Terminal(e.to_string()))?;
        terminal
            .show_cursor()
            .map_err(|e| TuiError::Terminal(e.to_string()))?;

        result
    }

    fn run_inner(
        &mut self,
        terminal: &mut ratatui::Terminal<CrosstermBackend<std::io::Stdout>>,
    ) -> Result<(), TuiError> {
        loop {
            self.drain();
            terminal
                .draw(|f| self.draw(f))
                .map_err(|e| TuiError::Render(e.to_string()))?;

            if let Some(event) = self
                .input
                .next_event()
                .map_err(|e| TuiError::Io(e.to_string()))?
            {
                self.handle_input(event);
            }

            if self.should_quit {
                return Ok(());
            }
        }
    }

    /// Apply every pending message; returns how many events were added
    pub fn drain(&mut self) -> usize {
        let mut added = 0;
        loop {
            match self.rx.try_recv() {
                Ok(ViewerMessage::Event(event)) => {
                    self.viewer.add_data(&event);
                    added += 1;
                }
                Ok(ViewerMessage::Update) | Err(TryRecvError::Disconnected) => {
                    if !self.ended {
                        debug!(rows = self.viewer.row_count(), "viewer input ended");
                    }
                    self.ended = true;
                    break;
                }
                Err(TryRecvError::Empty) => break,
            }
        }
        added
    }

    /// Apply a key action
    pub fn handle_input(&mut self, event: InputEvent) {
        let page = self.page.max(1);
        match event {
            InputEvent::Quit => self.should_quit = true,
            InputEvent::Up => self.viewer.scroll_up(1, page),
            InputEvent::Down => self.viewer.scroll_down(1, page),
            InputEvent::PageUp => self.viewer.scroll_up(page, page),
            InputEvent::PageDown => self.viewer.scroll_down(page, page),
            InputEvent::Top => self.viewer.scroll_to_top(),
            InputEvent::Bottom => self.viewer.scroll_to_bottom(page),
            InputEvent::Follow => self.viewer.follow(),
            InputEvent::Unknown => {}
        }
    }

    /// Render the grid and status line
    pub fn draw(&mut self, f: &mut Frame) {
        let layout = self.layout.calculate(f.area());
        self.page = layout.visible_rows();
        self.render_grid(f, layout);
        self.render_status(f, layout);
    }

    fn render_grid(&self, f: &mut Frame, layout: CalculatedLayout) {
        let commands = self.viewer.column_count().saturating_sub(1);
        let areas = self.layout.columns(layout.grid_area, commands);

        for (index, (area, header)) in areas.iter().zip(self.viewer.headers()).enumerate() {
            let mut block = Block::default()
                .borders(Borders::ALL)
                .title(format!(" {header} "));
            if index == 0 {
                block = block.title_style(Style::default().add_modifier(Modifier::BOLD));
            }
            let lines: Vec<Line> = self
                .viewer
                .visible_rows(index, self.page)
                .map(Line::from)
                .collect();
            f.render_widget(Paragraph::new(lines).block(block), *area);
        }
    }

    fn render_status(&self, f: &mut Frame, layout: CalculatedLayout) {
        let range = self.viewer.visible(self.page);
        let status = format!(
            " {}-{} of {} | {} | {} | q quit, ↑↓ scroll, g/G top/bottom, Enter follow",
            range.start + usize::from(!range.is_empty()),
            range.end,
            self.viewer.row_count(),
            if self.viewer.is_following() { "following" } else { "scrolled" },
            if self.ended { "ended" } else { "live" },
        );
        f.render_widget(
            Paragraph::new(status).style(Style::default().add_modifier(Modifier::REVERSED)),
            layout.status_area,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::viewer_channel;
    use logunify_core::{Column, Event};
    use ratatui::backend::TestBackend;

    fn commands() -> Vec<CommandDescriptor> {
        vec![CommandDescriptor::once("dmesg"), CommandDescriptor::looping("date", 1000)]
    }

    fn screen(terminal: &ratatui::Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let width = usize::from(buffer.area.width);
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_drain_applies_events_and_update() {
        let (tx, rx) = viewer_channel();
        let mut app = TuiApp::new(&commands(), rx, &TuiConfig::default());
        tx.send(ViewerMessage::Event(Event::now(Column::new(1), "a\nb"))).unwrap();
        tx.send(ViewerMessage::Event(Event::now(Column::new(2), "c"))).unwrap();
        assert_eq!(app.drain(), 2);
        assert!(!app.has_ended());
        assert_eq!(app.viewer().row_count(), 3);

        tx.send(ViewerMessage::Update).unwrap();
        assert_eq!(app.drain(), 0);
        assert!(app.has_ended());
    }

    #[test]
    fn test_disconnect_counts_as_end() {
        let (tx, rx) = viewer_channel();
        let mut app = TuiApp::new(&commands(), rx, &TuiConfig::default());
        drop(tx);
        app.drain();
        assert!(app.has_ended());
    }

    #[test]
    fn test_draw_shows_headers_and_output() {
        let (tx, rx) = viewer_channel();
        let mut app = TuiApp::new(&commands(), rx, &TuiConfig::default());
        tx.send(ViewerMessage::Event(Event::now(Column::new(2), "Mon Oct 19"))).unwrap();
        app.drain();

        let mut terminal = ratatui::Terminal::new(TestBackend::new(80, 12)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        let text = screen(&terminal);

        assert!(text.contains("Time"));
        assert!(text.contains("dmesg"));
        assert!(text.contains("date"));
        assert!(text.contains("Mon Oct 19"));
        assert!(text.contains("following"));
    }

    #[test]
    fn test_keys_scroll_shared_offset() {
        let (tx, rx) = viewer_channel();
        let mut app = TuiApp::new(&commands(), rx, &TuiConfig::default());
        for i in 0..50 {
            tx.send(ViewerMessage::Event(Event::now(Column::new(1), format!("{i}")))).unwrap();
        }
        app.drain();

        let mut terminal = ratatui::Terminal::new(TestBackend::new(80, 12)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        // 12 rows minus status line minus borders
        assert_eq!(app.viewer().visible(9), 41..50);

        app.handle_input(InputEvent::PageUp);
        assert_eq!(app.viewer().visible(9), 32..41);
        assert!(!app.viewer().is_following());

        app.handle_input(InputEvent::Top);
        assert_eq!(app.viewer().visible(9), 0..9);

        app.handle_input(InputEvent::Follow);
        assert!(app.viewer().is_following());

        app.handle_input(InputEvent::Quit);
        assert!(app.should_quit());
    }

    #[test]
    fn test_max_lines_from_config() {
        let (tx, rx) = viewer_channel();
        let config = TuiConfig {
            max_lines: 5,
            ..TuiConfig::default()
        };
        let mut app = TuiApp::new(&commands(), rx, &config);
        for i in 0..8 {
            tx.send(ViewerMessage::Event(Event::now(Column::new(1), format!("{i}")))).unwrap();
        }
        app.drain();
        assert_eq!(app.viewer().row_count(), 5);
    }
}
