//! Keyboard handling for the viewer.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::collections::HashMap;
use std::io;
use std::time::Duration;

/// Viewer action triggered by a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Quit the viewer
    Quit,
    /// One row towards older output
    Up,
    /// One row towards newer output
    Down,
    /// One page towards older output
    PageUp,
    /// One page towards newer output
    PageDown,
    /// Oldest row
    Top,
    /// Newest row
    Bottom,
    /// Pin to the newest row
    Follow,
    /// Unbound key
    Unknown,
}

/// Key combination (key + modifiers)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    /// The key code
    pub code: KeyCode,
    /// Modifiers (ctrl, alt)
    pub modifiers: KeyModifiers,
}

impl KeyCombo {
    /// Create a new key combination.
    ///
    /// Shift is dropped for character keys since it is already part of the
    /// character.
    #[must_use]
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        let modifiers = match code {
            KeyCode::Char(_) => modifiers.difference(KeyModifiers::SHIFT),
            _ => modifiers,
        };
        Self { code, modifiers }
    }

    /// Create a plain key without modifiers
    #[must_use]
    pub fn key(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::empty(),
        }
    }

    /// Create a Ctrl+key combination
    #[must_use]
    pub fn ctrl(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::CONTROL,
        }
    }
}

/// Key to action mapping
#[derive(Debug, Clone)]
pub struct KeyBinding {
    bindings: HashMap<KeyCombo, InputEvent>,
}

impl KeyBinding {
    /// Action bound to `combo`
    #[must_use]
    pub fn get(&self, combo: &KeyCombo) -> InputEvent {
        self.bindings.get(combo).copied().unwrap_or(InputEvent::Unknown)
    }

    /// Bind `combo` to `event`, replacing any previous binding
    #[must_use]
    pub fn with(mut self, combo: KeyCombo, event: InputEvent) -> Self {
        self.bindings.insert(combo, event);
        self
    }
}

impl Default for KeyBinding {
    fn default() -> Self {
        let mut bindings = HashMap::new();

        bindings.insert(KeyCombo::key(KeyCode::Up), InputEvent::Up);
        bindings.insert(KeyCombo::key(KeyCode::Char('k')), InputEvent::Up);
        bindings.insert(KeyCombo::key(KeyCode::Down), InputEvent::Down);
        bindings.insert(KeyCombo::key(KeyCode::Char('j')), InputEvent::Down);
        bindings.insert(KeyCombo::key(KeyCode::PageUp), InputEvent::PageUp);
        bindings.insert(KeyCombo::key(KeyCode::PageDown), InputEvent::PageDown);
        bindings.insert(KeyCombo::key(KeyCode::Char('g')), InputEvent::Top);
        bindings.insert(KeyCombo::key(KeyCode::Home), InputEvent::Top);
        bindings.insert(KeyCombo::key(KeyCode::Char('G')), InputEvent::Bottom);
        bindings.insert(KeyCombo::key(KeyCode::End), InputEvent::Bottom);
        bindings.insert(KeyCombo::key(KeyCode::Enter), InputEvent::Follow);

        bindings.insert(KeyCombo::key(KeyCode::Char('q')), InputEvent::Quit);
        bindings.insert(KeyCombo::ctrl(KeyCode::Char('c')), InputEvent::Quit);

        Self { bindings }
    }
}

/// Reads key presses from the terminal
#[derive(Debug, Clone)]
pub struct InputHandler {
    bindings: KeyBinding,
    timeout: Duration,
}

impl InputHandler {
    /// Create a handler with the default bindings
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: KeyBinding::default(),
            timeout: Duration::from_millis(100),
        }
    }

    /// Create with custom key bindings
    #[must_use]
    pub fn with_bindings(bindings: KeyBinding) -> Self {
        Self {
            bindings,
            ..Self::new()
        }
    }

    /// Set poll timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Wait up to the poll timeout for a key press
    ///
    /// # Errors
    ///
    /// Returns error if reading from the terminal fails
    pub fn next_event(&self) -> Result<Option<InputEvent>, io::Error> {
        if crossterm::event::poll(self.timeout)? {
            if let Event::Key(key) = crossterm::event::read()? {
                if key.kind != KeyEventKind::Release {
                    return Ok(Some(self.map_key(key)));
                }
            }
        }
        Ok(None)
    }

    /// Map a key press to its action
    #[must_use]
    pub fn map_key(&self, key: KeyEvent) -> InputEvent {
        self.bindings.get(&KeyCombo::new(key.code, key.modifiers))
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_combo_ctrl() {
        let combo = KeyCombo::ctrl(KeyCode::Char('c'));
        assert_eq!(combo.code, KeyCode::Char('c'));
        assert_eq!(combo.modifiers, KeyModifiers::CONTROL);
    }

    #[test]
    fn test_shift_dropped_for_chars() {
        let combo = KeyCombo::new(KeyCode::Char('G'), KeyModifiers::SHIFT);
        assert_eq!(combo, KeyCombo::key(KeyCode::Char('G')));
    }

    #[test]
    fn test_default_bindings() {
        let handler = InputHandler::new();
        let press = |code, modifiers| handler.map_key(KeyEvent::new(code, modifiers));

        assert_eq!(press(KeyCode::Char('q'), KeyModifiers::empty()), InputEvent::Quit);
        assert_eq!(press(KeyCode::Char('c'), KeyModifiers::CONTROL), InputEvent::Quit);
        assert_eq!(press(KeyCode::Up, KeyModifiers::empty()), InputEvent::Up);
        assert_eq!(press(KeyCode::Char('j'), KeyModifiers::empty()), InputEvent::Down);
        assert_eq!(press(KeyCode::PageDown, KeyModifiers::empty()), InputEvent::PageDown);
        assert_eq!(press(KeyCode::Char('g'), KeyModifiers::empty()), InputEvent::Top);
        assert_eq!(press(KeyCode::Char('G'), KeyModifiers::SHIFT), InputEvent::Bottom);
        assert_eq!(press(KeyCode::Enter, KeyModifiers::empty()), InputEvent::Follow);
        assert_eq!(press(KeyCode::Char('c'), KeyModifiers::empty()), InputEvent::Unknown);
    }

    #[test]
    fn test_custom_binding() {
        let bindings = KeyBinding::default().with(KeyCombo::key(KeyCode::Esc), InputEvent::Quit);
        let handler = InputHandler::with_bindings(bindings).with_timeout(Duration::from_millis(5));
        assert_eq!(handler.timeout, Duration::from_millis(5));
        assert_eq!(
            handler.map_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::empty())),
            InputEvent::Quit
        );
    }
}
