// canvas.rs — click-to-toggle-play on the 3D canvas
//
// A press followed by a release with no movement in between is a click;
// anything that moved was a look-around drag and must not toggle playback.

use super::{ControlAction, PointerButton, PointerEvent};

#[derive(Debug, Default)]
pub struct CanvasPlayerControls {
    should_toggle_play: bool,
}

impl CanvasPlayerControls {
    pub fn new() -> Self {
        Self::default()
    }

    /// `host_has_controls` is false for chrome-less players, where clicks
    /// never toggle playback.
    pub fn handle_pointer(&mut self, event: &PointerEvent, host_has_controls: bool) -> Option<ControlAction> {
        match event {
            PointerEvent::Down { button, .. } => {
                self.should_toggle_play = host_has_controls && *button == PointerButton::Primary;
                None
            }
            PointerEvent::Move { .. } => {
                self.should_toggle_play = false;
                None
            }
            PointerEvent::Up { .. } => {
                let toggle = std::mem::take(&mut self.should_toggle_play);
                toggle.then_some(ControlAction::TogglePlay)
            }
            PointerEvent::Wheel { .. } => None,
        }
    }
}
