//! Output injection seam for synthesized keyboard and mouse events.
//!
//! The mapping engine only talks to [`OutputSink`]; how the events actually
//! reach the operating system is a collaborator concern. The crate ships
//! [`TraceSink`], a dry-run implementation that reports every injected event
//! through `tracing` and translates ASCII characters to virtual-key codes.

use tracing::{debug, info};

/// Errors from the output injection layer
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// A literal-character response has no virtual-key translation
    #[error("no key code for character {0:?}")]
    UntranslatableChar(char),

    /// OS-level injection failure
    #[error("output injection failed: {0}")]
    Injection(String),
}

/// Mouse buttons addressable by click responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Synthesized keyboard/mouse event injection
///
/// All calls are synchronous and expected to complete quickly; the engine
/// treats any error as loop-terminating since a skipped release would leave
/// outputs in an untrusted state.
pub trait OutputSink: Send {
    fn press_key(&mut self, code: u16) -> Result<(), OutputError>;

    fn release_key(&mut self, code: u16) -> Result<(), OutputError>;

    /// Relative mouse translation in pixels
    fn move_mouse(&mut self, dx: f32, dy: f32) -> Result<(), OutputError>;

    fn set_mouse_button(&mut self, button: MouseButton, down: bool) -> Result<(), OutputError>;

    /// Scroll in wheel clicks, horizontal and vertical
    fn scroll(&mut self, dx: f32, dy: f32) -> Result<(), OutputError>;

    /// Platform key code for a literal character
    fn key_code_for_char(&self, ch: char) -> Result<u16, OutputError>;
}

/// Dry-run sink that logs every event instead of injecting it
///
/// Useful for profile debugging on machines where injection is unavailable.
/// Character translation accepts ASCII alphanumerics and space, where the
/// virtual-key code equals the uppercase ASCII value.
#[derive(Debug, Default)]
pub struct TraceSink {}

impl TraceSink {
    pub fn new() -> Self {
        info!("Using trace output sink, events are logged but not injected");
        Self {}
    }
}

impl OutputSink for TraceSink {
    fn press_key(&mut self, code: u16) -> Result<(), OutputError> {
        info!("key down: {:#04x}", code);
        Ok(())
    }

    fn release_key(&mut self, code: u16) -> Result<(), OutputError> {
        info!("key up: {:#04x}", code);
        Ok(())
    }

    fn move_mouse(&mut self, dx: f32, dy: f32) -> Result<(), OutputError> {
        debug!("mouse move: ({:.2}, {:.2})", dx, dy);
        Ok(())
    }

    fn set_mouse_button(&mut self, button: MouseButton, down: bool) -> Result<(), OutputError> {
        info!("mouse {:?} {}", button, if down { "down" } else { "up" });
        Ok(())
    }

    fn scroll(&mut self, dx: f32, dy: f32) -> Result<(), OutputError> {
        info!("scroll: ({}, {})", dx, dy);
        Ok(())
    }

    fn key_code_for_char(&self, ch: char) -> Result<u16, OutputError> {
        match ch {
            'a'..='z' => Ok(ch.to_ascii_uppercase() as u16),
            'A'..='Z' | '0'..='9' => Ok(ch as u16),
            ' ' => Ok(0x20),
            _ => Err(OutputError::UntranslatableChar(ch)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_letters_translate_to_uppercase_codes() {
        let sink = TraceSink::new();
        assert_eq!(sink.key_code_for_char('w').unwrap(), b'W' as u16);
        assert_eq!(sink.key_code_for_char('W').unwrap(), b'W' as u16);
        assert_eq!(sink.key_code_for_char('7').unwrap(), b'7' as u16);
        assert_eq!(sink.key_code_for_char(' ').unwrap(), 0x20);
    }

    #[test]
    fn non_ascii_characters_are_untranslatable() {
        let sink = TraceSink::new();
        assert!(matches!(
            sink.key_code_for_char('ß'),
            Err(OutputError::UntranslatableChar('ß'))
        ));
    }
}
