// orbit.rs — drag-to-look with optional device orientation

use std::f32::consts::FRAC_PI_2;

use glam::{EulerRot, Quat};

use super::{CameraControls, ControlAction, DeviceOrientation, FrameInputs, PointerButton, PointerEvent, StrategyKind};
use crate::camera::Camera;

const MAX_PITCH: f32 = 85.0;
const HALF_VIEW_MAX_YAW: f32 = 90.0;
const MIN_FOV: f32 = 30.0;
const MAX_FOV: f32 = 110.0;
const WHEEL_FOV_STEP: f32 = 2.5;

pub struct OrbitOrientationControls {
    /// Degrees, positive turns left.
    pub yaw: f32,
    /// Degrees, positive looks up.
    pub pitch: f32,
    half_view: bool,
    orientation_enabled: bool,
    orientation: Option<DeviceOrientation>,
    dragging: bool,
    last_pointer: Option<(f32, f32)>,
    pending_fov_delta: f32,
    /// Camera field of view as of the last update, for drag scaling.
    fov: f32,
    disposed: bool,
}

impl OrbitOrientationControls {
    pub fn new(half_view: bool, orientation_enabled: bool) -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            half_view,
            orientation_enabled,
            orientation: None,
            dragging: false,
            last_pointer: None,
            pending_fov_delta: 0.0,
            fov: crate::camera::DEFAULT_FOV,
            disposed: false,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Turn a pixel drag into yaw/pitch using the camera's field of view, so
    /// the image under the pointer follows it.
    fn drag(&mut self, dx: f32, dy: f32, viewport: (u32, u32), fov: f32) {
        let width = viewport.0 as f32;
        let height = viewport.1 as f32;
        if width <= 0.0 || height <= 0.0 {
            return;
        }

        let v_f = fov.to_radians();
        let aspect = width / height;
        let h_f = 2.0 * ((v_f / 2.0).tan() * aspect).atan();

        let yaw_per_px_deg = (h_f / width).to_degrees();
        let pitch_per_px_deg = (v_f / height).to_degrees();

        self.yaw += dx * yaw_per_px_deg;
        self.pitch += dy * pitch_per_px_deg;
        self.clamp();
    }

    fn clamp(&mut self) {
        self.pitch = self.pitch.clamp(-MAX_PITCH, MAX_PITCH);
        if self.half_view {
            self.yaw = self.yaw.clamp(-HALF_VIEW_MAX_YAW, HALF_VIEW_MAX_YAW);
        } else {
            self.yaw = (self.yaw + 180.0).rem_euclid(360.0) - 180.0;
        }
    }

    pub fn orientation_active(&self) -> bool {
        self.orientation_enabled && self.orientation.is_some()
    }

    pub(crate) fn apply(&mut self, camera: &mut Camera) {
        if self.pending_fov_delta != 0.0 {
            camera.fov = (camera.fov - self.pending_fov_delta).clamp(MIN_FOV, MAX_FOV);
            self.pending_fov_delta = 0.0;
        }
        self.fov = camera.fov;

        let yaw = Quat::from_rotation_y(self.yaw.to_radians());
        camera.rotation = match self.orientation {
            // Dragging only turns the horizon while the sensor owns pitch.
            Some(sensor) if self.orientation_active() => yaw * device_orientation_quat(sensor),
            _ => Quat::from_euler(EulerRot::YXZ, self.yaw.to_radians(), self.pitch.to_radians(), 0.0),
        };
    }

    pub(crate) fn pointer(&mut self, event: &PointerEvent, viewport: (u32, u32)) -> bool {
        if self.disposed {
            return false;
        }

        match *event {
            PointerEvent::Down { button: PointerButton::Primary, x, y } => {
                self.dragging = true;
                self.last_pointer = Some((x, y));
                true
            }
            PointerEvent::Down { .. } => false,
            PointerEvent::Up { .. } => {
                let was_dragging = self.dragging;
                self.dragging = false;
                self.last_pointer = None;
                was_dragging
            }
            PointerEvent::Move { x, y } => {
                if !self.dragging {
                    return false;
                }
                if let Some((lx, ly)) = self.last_pointer {
                    self.drag(x - lx, y - ly, viewport, self.fov);
                }
                self.last_pointer = Some((x, y));
                true
            }
            PointerEvent::Wheel { delta } => {
                self.pending_fov_delta += delta * WHEEL_FOV_STEP;
                true
            }
        }
    }
}

/// Sensor angles to a camera rotation: alpha about Z, beta about X', gamma
/// about Y'', then from "device flat on a table" to "looking through it".
pub fn device_orientation_quat(o: DeviceOrientation) -> Quat {
    let alpha = o.alpha.to_radians();
    let beta = o.beta.to_radians();
    let gamma = o.gamma.to_radians();
    let screen = o.screen.to_radians();

    Quat::from_euler(EulerRot::YXZ, alpha, beta, -gamma)
        * Quat::from_rotation_x(-FRAC_PI_2)
        * Quat::from_rotation_z(-screen)
}

impl CameraControls for OrbitOrientationControls {
    fn kind(&self) -> StrategyKind {
        StrategyKind::OrbitAndDeviceOrientation
    }

    fn update(&mut self, camera: &mut Camera, _inputs: &FrameInputs<'_>) -> Option<ControlAction> {
        if !self.disposed {
            self.apply(camera);
        }
        None
    }

    fn handle_pointer(&mut self, event: &PointerEvent, viewport: (u32, u32)) -> bool {
        self.pointer(event, viewport)
    }

    fn handle_orientation(&mut self, orientation: DeviceOrientation) {
        if self.orientation_enabled && !self.disposed {
            self.orientation = Some(orientation);
        }
    }

    fn enable_orientation(&mut self) {
        if !self.disposed {
            self.orientation_enabled = true;
        }
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.dragging = false;
        self.last_pointer = None;
        self.orientation = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn drag(controls: &mut OrbitOrientationControls, dx: f32, dy: f32) {
        let viewport = (1000, 500);
        controls.handle_pointer(&PointerEvent::Down { button: PointerButton::Primary, x: 500.0, y: 250.0 }, viewport);
        controls.handle_pointer(&PointerEvent::Move { x: 500.0 + dx, y: 250.0 + dy }, viewport);
        controls.handle_pointer(&PointerEvent::Up { button: PointerButton::Primary, x: 500.0 + dx, y: 250.0 + dy }, viewport);
    }

    #[test]
    fn dragging_right_turns_left() {
        let mut controls = OrbitOrientationControls::new(false, false);
        let mut camera = Camera::new(2.0);
        drag(&mut controls, 100.0, 0.0);
        controls.update(&mut camera, &FrameInputs::default());
        assert!(controls.yaw > 0.0);
        assert!(camera.world_direction().x < 0.0);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut controls = OrbitOrientationControls::new(false, false);
        drag(&mut controls, 0.0, 100_000.0);
        assert_eq!(controls.pitch, MAX_PITCH);
    }

    #[test]
    fn half_view_limits_yaw() {
        let mut controls = OrbitOrientationControls::new(true, false);
        drag(&mut controls, 100_000.0, 0.0);
        assert_eq!(controls.yaw, HALF_VIEW_MAX_YAW);
    }

    #[test]
    fn full_view_wraps_yaw() {
        let mut controls = OrbitOrientationControls::new(false, false);
        controls.yaw = 170.0;
        controls.yaw += 20.0;
        controls.clamp();
        assert!((controls.yaw + 170.0).abs() < 1e-3);
    }

    #[test]
    fn secondary_button_does_not_drag() {
        let mut controls = OrbitOrientationControls::new(false, false);
        let used = controls.handle_pointer(
            &PointerEvent::Down { button: PointerButton::Secondary, x: 0.0, y: 0.0 },
            (100, 100),
        );
        assert!(!used);
        assert!(!controls.is_dragging());
    }

    #[test]
    fn wheel_narrows_fov_within_bounds() {
        let mut controls = OrbitOrientationControls::new(false, false);
        let mut camera = Camera::new(1.0);
        controls.handle_pointer(&PointerEvent::Wheel { delta: 1000.0 }, (100, 100));
        controls.update(&mut camera, &FrameInputs::default());
        assert_eq!(camera.fov, MIN_FOV);
    }

    #[test]
    fn upright_device_looks_at_horizon() {
        // portrait, held upright, facing north
        let q = device_orientation_quat(DeviceOrientation { alpha: 0.0, beta: 90.0, gamma: 0.0, screen: 0.0 });
        let dir = q * Vec3::NEG_Z;
        assert!(dir.y.abs() < 1e-4, "{dir:?}");
        assert!((dir.z + 1.0).abs() < 1e-4, "{dir:?}");
    }

    #[test]
    fn orientation_ignored_when_disabled() {
        let mut controls = OrbitOrientationControls::new(false, false);
        controls.handle_orientation(DeviceOrientation { beta: 10.0, ..Default::default() });
        assert!(!controls.orientation_active());
    }

    #[test]
    fn late_permission_turns_the_sensor_on() {
        let mut controls = OrbitOrientationControls::new(false, false);
        let mut camera = Camera::new(1.0);
        controls.enable_orientation();
        // flat on a table, screen up: the camera looks at the floor
        controls.handle_orientation(DeviceOrientation::default());
        controls.update(&mut camera, &FrameInputs::default());
        assert!(controls.orientation_active());
        assert!(camera.world_direction().y < -0.99);
    }
}
