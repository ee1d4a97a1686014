//! Raw controller samples and the previous/current pair a profile owns.

use std::collections::HashMap;
use std::mem;

use super::ControllerError;

/// Raw per-poll snapshot of a controller
///
/// Buttons are the hardware bitmask exploded into bit order; axes carry the
/// raw signed integer readings keyed by the descriptor's axis names.
/// Immutable once captured.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerSample {
    pub buttons: Vec<bool>,
    pub axes: HashMap<String, i32>,
}

impl ControllerSample {
    /// Explodes a button bitmask, least significant bit at index 0
    pub fn from_bitmask(mask: u16, button_count: usize, axes: HashMap<String, i32>) -> Self {
        let buttons = (0..button_count).map(|bit| mask & (1 << bit) != 0).collect();
        Self { buttons, axes }
    }

    pub fn button(&self, index: usize) -> bool {
        self.buttons.get(index).copied().unwrap_or(false)
    }

    pub fn axis(&self, name: &str) -> i32 {
        self.axes.get(name).copied().unwrap_or(0)
    }
}

/// The two samples edge detection needs
///
/// Mutated only by [`ControllerRuntimeState::advance`]. The very first poll
/// seeds both slots with the same sample, so no spurious edges fire on
/// startup.
#[derive(Debug, Clone, Default)]
pub struct ControllerRuntimeState {
    previous: ControllerSample,
    current: ControllerSample,
    primed: bool,
}

impl ControllerRuntimeState {
    pub fn advance(&mut self, sample: ControllerSample) {
        if self.primed {
            self.previous = mem::replace(&mut self.current, sample);
        } else {
            self.previous = sample.clone();
            self.current = sample;
            self.primed = true;
        }
    }

    pub fn previous(&self) -> &ControllerSample {
        &self.previous
    }

    pub fn current(&self) -> &ControllerSample {
        &self.current
    }
}

/// Device polling collaborator
///
/// One synchronous blocking read of the controller's full state. The engine
/// performs no reconnect or retry; a failed poll terminates the loop.
pub trait DevicePoll: Send {
    fn poll(&mut self, controller_id: u32) -> Result<ControllerSample, ControllerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitmask_explodes_in_bit_order() {
        let sample = ControllerSample::from_bitmask(0b1001_0000_0000_0101, 16, HashMap::new());
        assert!(sample.button(0));
        assert!(!sample.button(1));
        assert!(sample.button(2));
        assert!(sample.button(12));
        assert!(sample.button(15));
        assert_eq!(sample.buttons.len(), 16);
    }

    #[test]
    fn first_poll_leaves_previous_equal_to_current() {
        let sample = ControllerSample::from_bitmask(0b1, 4, HashMap::new());
        let mut state = ControllerRuntimeState::default();
        state.advance(sample.clone());
        assert_eq!(state.previous(), state.current());
        assert_eq!(state.current(), &sample);
    }

    #[test]
    fn later_polls_shift_current_into_previous() {
        let first = ControllerSample::from_bitmask(0b0, 4, HashMap::new());
        let second = ControllerSample::from_bitmask(0b1, 4, HashMap::new());
        let mut state = ControllerRuntimeState::default();
        state.advance(first.clone());
        state.advance(second.clone());
        assert_eq!(state.previous(), &first);
        assert_eq!(state.current(), &second);
    }

    #[test]
    fn out_of_range_button_reads_released() {
        let sample = ControllerSample::from_bitmask(0b1, 2, HashMap::new());
        assert!(!sample.button(10));
        assert_eq!(sample.axis("missing"), 0);
    }
}
