//! Maps logical response names to concrete output primitives.
//!
//! A response is one of: a mouse click (`"left click"`, …), a scroll
//! (`"scroll x"` / `"scroll y"`, amount from the trigger options), a named
//! virtual key from the fixed symbolic table, or a single literal character
//! translated through the sink's key-scan lookup. Anything else is an
//! [`MappingError::UnmappableResponse`], never a silent no-op.

use tracing::debug;

use super::error::MappingError;
use super::trigger::TriggerOptions;
use crate::output::{MouseButton, OutputSink};

// Windows virtual-key codes for the symbolic key table
const VK_TAB: u16 = 0x09;
const VK_RETURN: u16 = 0x0D;
const VK_SHIFT: u16 = 0x10;
const VK_CONTROL: u16 = 0x11;
const VK_MENU: u16 = 0x12;
const VK_ESCAPE: u16 = 0x1B;
const VK_SPACE: u16 = 0x20;
const VK_LSHIFT: u16 = 0xA0;
const VK_RSHIFT: u16 = 0xA1;
const VK_LCONTROL: u16 = 0xA2;
const VK_RCONTROL: u16 = 0xA3;

#[derive(Debug, Clone, PartialEq)]
enum ResolvedResponse {
    Mouse(MouseButton),
    Scroll { horizontal: bool },
    Key(u16),
}

/// Translates responses and invokes the output sink
pub struct ActionDispatcher {
    sink: Box<dyn OutputSink>,
}

impl ActionDispatcher {
    pub fn new(sink: Box<dyn OutputSink>) -> Self {
        Self { sink }
    }

    /// Emits the "down" half of a response
    pub fn press(&mut self, response: &str, options: &TriggerOptions) -> Result<(), MappingError> {
        debug!("press {:?}", response);
        match self.resolve(response)? {
            ResolvedResponse::Mouse(button) => self.sink.set_mouse_button(button, true)?,
            ResolvedResponse::Scroll { horizontal } => {
                if horizontal {
                    self.sink.scroll(options.amount, 0.0)?;
                } else {
                    self.sink.scroll(0.0, options.amount)?;
                }
            }
            ResolvedResponse::Key(code) => self.sink.press_key(code)?,
        }
        Ok(())
    }

    /// Emits the "up" half of a response; scrolls have none
    pub fn release(&mut self, response: &str, _options: &TriggerOptions) -> Result<(), MappingError> {
        debug!("release {:?}", response);
        match self.resolve(response)? {
            ResolvedResponse::Mouse(button) => self.sink.set_mouse_button(button, false)?,
            ResolvedResponse::Scroll { .. } => {}
            ResolvedResponse::Key(code) => self.sink.release_key(code)?,
        }
        Ok(())
    }

    pub fn move_mouse(&mut self, dx: f32, dy: f32) -> Result<(), MappingError> {
        self.sink.move_mouse(dx, dy)?;
        Ok(())
    }

    fn resolve(&self, response: &str) -> Result<ResolvedResponse, MappingError> {
        match response {
            "left click" => return Ok(ResolvedResponse::Mouse(MouseButton::Left)),
            "middle click" => return Ok(ResolvedResponse::Mouse(MouseButton::Middle)),
            "right click" => return Ok(ResolvedResponse::Mouse(MouseButton::Right)),
            "scroll x" => return Ok(ResolvedResponse::Scroll { horizontal: true }),
            "scroll y" => return Ok(ResolvedResponse::Scroll { horizontal: false }),
            _ => {}
        }
        if let Some(code) = named_key(response) {
            return Ok(ResolvedResponse::Key(code));
        }

        // Not symbolic: treat a single character as literal ASCII
        let mut chars = response.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Ok(ResolvedResponse::Key(self.sink.key_code_for_char(ch)?)),
            _ => Err(MappingError::UnmappableResponse(response.to_string())),
        }
    }
}

/// Fixed symbolic key table
///
/// Carries the `VK_*` spellings plus friendly aliases.
fn named_key(name: &str) -> Option<u16> {
    match name {
        "VK_SHIFT" | "shift" => Some(VK_SHIFT),
        "VK_CONTROL" | "ctrl" => Some(VK_CONTROL),
        "VK_LSHIFT" => Some(VK_LSHIFT),
        "VK_RSHIFT" => Some(VK_RSHIFT),
        "VK_LCONTROL" => Some(VK_LCONTROL),
        "VK_RCONTROL" => Some(VK_RCONTROL),
        "VK_SPACE" | "space" => Some(VK_SPACE),
        "VK_MENU" | "alt" => Some(VK_MENU),
        "VK_ESCAPE" | "escape" => Some(VK_ESCAPE),
        "VK_TAB" | "tab" => Some(VK_TAB),
        "VK_RETURN" | "enter" => Some(VK_RETURN),
        _ => None,
    }
}
