// controls — camera control strategies and the table that picks one

mod canvas;
mod hmd;
mod orbit;
mod xr;

pub use canvas::CanvasPlayerControls;
pub use hmd::HmdControls;
pub use orbit::{device_orientation_quat, OrbitOrientationControls};
pub use xr::{ShuttleButton, ShuttleSphere, XrControllerControls};

use crate::camera::Camera;
use crate::capability::{CapabilityResult, XrSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    HmdOrientation,
    OrbitAndDeviceOrientation,
    ImmersiveSessionControllers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Pointer input in physical pixels relative to the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { button: PointerButton, x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up { button: PointerButton, x: f32, y: f32 },
    /// Positive scrolls in (narrower field of view).
    Wheel { delta: f32 },
}

/// Angles in degrees as reported by motion sensors.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeviceOrientation {
    pub alpha: f32,
    pub beta: f32,
    pub gamma: f32,
    /// Screen rotation relative to the device's natural orientation.
    pub screen: f32,
}

/// Something a control asks the player to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    TogglePlay,
    ExitImmersive,
}

/// Per-tick data from sources the controls do not own.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameInputs<'a> {
    pub xr_session: Option<&'a dyn XrSession>,
}

pub trait CameraControls {
    fn kind(&self) -> StrategyKind;

    /// Called once per rendered frame.
    fn update(&mut self, camera: &mut Camera, inputs: &FrameInputs<'_>) -> Option<ControlAction>;

    /// Returns true when the event was used.
    fn handle_pointer(&mut self, _event: &PointerEvent, _viewport: (u32, u32)) -> bool {
        false
    }

    fn handle_orientation(&mut self, _orientation: DeviceOrientation) {}

    /// Start using the motion sensor after permission arrived late.
    fn enable_orientation(&mut self) {}

    /// In-scene buttons to draw on top of the screen.
    fn shuttle(&self) -> Vec<ShuttleSphere> {
        Vec::new()
    }

    /// Release input subscriptions. Later updates are no-ops.
    fn dispose(&mut self);
}

/// First matching rule wins.
pub fn select_strategy(caps: &CapabilityResult) -> StrategyKind {
    if caps.xr_immersive_supported {
        StrategyKind::ImmersiveSessionControllers
    } else if caps.has_hardware_display() {
        StrategyKind::HmdOrientation
    } else {
        StrategyKind::OrbitAndDeviceOrientation
    }
}

pub fn build_controls(kind: StrategyKind, caps: &CapabilityResult, half_view: bool) -> Box<dyn CameraControls> {
    let orbit = || OrbitOrientationControls::new(half_view, caps.orientation_available);
    match kind {
        StrategyKind::ImmersiveSessionControllers => Box::new(XrControllerControls::new(orbit())),
        StrategyKind::HmdOrientation => match caps.legacy_display.clone() {
            Some(display) => Box::new(HmdControls::new(display)),
            None => Box::new(orbit()),
        },
        StrategyKind::OrbitAndDeviceOrientation => Box::new(orbit()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CardboardDisplay;
    use std::rc::Rc;

    #[test]
    fn immersive_beats_everything() {
        let caps = CapabilityResult {
            xr_immersive_supported: true,
            orientation_available: true,
            ..Default::default()
        };
        assert_eq!(select_strategy(&caps), StrategyKind::ImmersiveSessionControllers);
    }

    #[test]
    fn polyfilled_display_is_not_an_hmd() {
        let caps = CapabilityResult {
            legacy_display: Some(Rc::new(CardboardDisplay::default())),
            ..Default::default()
        };
        assert_eq!(select_strategy(&caps), StrategyKind::OrbitAndDeviceOrientation);
    }

    #[test]
    fn built_controls_match_the_selected_kind() {
        let caps = CapabilityResult::default();
        for kind in [StrategyKind::ImmersiveSessionControllers, StrategyKind::OrbitAndDeviceOrientation] {
            assert_eq!(build_controls(kind, &caps, false).kind(), kind);
        }
        // no display to track: falls back to orbit
        assert_eq!(
            build_controls(StrategyKind::HmdOrientation, &caps, false).kind(),
            StrategyKind::OrbitAndDeviceOrientation
        );
    }
}
