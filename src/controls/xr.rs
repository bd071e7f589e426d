// xr.rs — immersive session head pose and tracked controllers
//
// Outside a running session this behaves like the orbit controls. Inside
// one, the head pose drives the camera and pressing select/squeeze shows two
// in-scene buttons (play/pause, exit) that controllers can point at. The
// renderer draws them from `CameraControls::shuttle`.

use glam::Vec3;

use super::{
    CameraControls, ControlAction, DeviceOrientation, FrameInputs, OrbitOrientationControls, PointerEvent, StrategyKind,
};
use crate::camera::Camera;
use crate::capability::{ControllerState, Pose};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuttleButton {
    PlayPause,
    Exit,
}

const BUTTON_RADIUS: f32 = 0.1;

struct ShuttleTarget {
    button: ShuttleButton,
    center: Vec3,
}

/// Button spheres, two metres down and four ahead of the session origin.
const TARGETS: [ShuttleTarget; 2] = [
    ShuttleTarget {
        button: ShuttleButton::PlayPause,
        center: Vec3::new(-0.4, -2.0, -4.0),
    },
    ShuttleTarget {
        button: ShuttleButton::Exit,
        center: Vec3::new(0.4, -2.0, -4.0),
    },
];

/// A shuttle button as the renderer should draw it, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShuttleSphere {
    pub button: ShuttleButton,
    pub center: Vec3,
    pub radius: f32,
    pub highlighted: bool,
}

pub struct XrControllerControls {
    orbit: OrbitOrientationControls,
    pressed: Vec<bool>,
    /// Controller pressed and still looking for a button to hit.
    armed: Vec<bool>,
    buttons_visible: bool,
    highlighted: Option<ShuttleButton>,
    disposed: bool,
}

impl XrControllerControls {
    pub fn new(orbit: OrbitOrientationControls) -> Self {
        Self {
            orbit,
            pressed: Vec::new(),
            armed: Vec::new(),
            buttons_visible: false,
            highlighted: None,
            disposed: false,
        }
    }

    pub fn buttons_visible(&self) -> bool {
        self.buttons_visible
    }

    pub fn highlighted(&self) -> Option<ShuttleButton> {
        self.highlighted
    }

    /// Spheres to draw this frame. Empty while no controller is pressed.
    pub fn shuttle_spheres(&self) -> Vec<ShuttleSphere> {
        if !self.buttons_visible {
            return Vec::new();
        }
        TARGETS
            .iter()
            .map(|target| ShuttleSphere {
                button: target.button,
                center: target.center,
                radius: BUTTON_RADIUS,
                highlighted: self.highlighted == Some(target.button),
            })
            .collect()
    }

    fn track_controllers(&mut self, controllers: &[ControllerState]) -> Option<ControlAction> {
        self.pressed.resize(controllers.len(), false);
        self.armed.resize(controllers.len(), false);

        let mut action = None;
        let mut highlighted = None;
        let mut any_pressed = false;

        for (i, controller) in controllers.iter().enumerate() {
            let pressed = controller.select_pressed || controller.squeeze_pressed;
            any_pressed |= pressed;

            if pressed && !self.pressed[i] {
                self.armed[i] = true;
            } else if !pressed {
                self.armed[i] = false;
            }
            self.pressed[i] = pressed;

            if !self.armed[i] {
                continue;
            }

            if let Some(button) = cast_ray(&controller.pose) {
                highlighted = Some(button);
                // One action per press.
                self.armed[i] = false;
                action.get_or_insert(match button {
                    ShuttleButton::PlayPause => ControlAction::TogglePlay,
                    ShuttleButton::Exit => ControlAction::ExitImmersive,
                });
            }
        }

        self.buttons_visible = any_pressed;
        self.highlighted = if any_pressed { highlighted } else { None };
        action
    }
}

/// Nearest shuttle button along the controller's forward ray.
fn cast_ray(pose: &Pose) -> Option<ShuttleButton> {
    let origin = pose.position;
    let dir = (pose.orientation * Vec3::NEG_Z).normalize();

    TARGETS
        .iter()
        .filter_map(|target| {
            let oc = target.center - origin;
            let t = oc.dot(dir);
            if t < 0.0 {
                return None;
            }
            let miss_sq = oc.length_squared() - t * t;
            let r_sq = BUTTON_RADIUS * BUTTON_RADIUS;
            (miss_sq <= r_sq).then(|| (t - (r_sq - miss_sq).sqrt(), target.button))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, button)| button)
}

impl CameraControls for XrControllerControls {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ImmersiveSessionControllers
    }

    fn update(&mut self, camera: &mut Camera, inputs: &FrameInputs<'_>) -> Option<ControlAction> {
        if self.disposed {
            return None;
        }

        let Some(session) = inputs.xr_session.filter(|s| s.is_active()) else {
            self.buttons_visible = false;
            self.highlighted = None;
            self.orbit.apply(camera);
            return None;
        };

        if let Some(pose) = session.head_pose() {
            camera.rotation = pose.orientation;
            camera.position = pose.position;
        }
        self.track_controllers(&session.controllers())
    }

    fn handle_pointer(&mut self, event: &PointerEvent, viewport: (u32, u32)) -> bool {
        !self.disposed && self.orbit.pointer(event, viewport)
    }

    fn handle_orientation(&mut self, orientation: DeviceOrientation) {
        self.orbit.handle_orientation(orientation);
    }

    fn enable_orientation(&mut self) {
        self.orbit.enable_orientation();
    }

    fn shuttle(&self) -> Vec<ShuttleSphere> {
        self.shuttle_spheres()
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.orbit.dispose();
        self.pressed.clear();
        self.armed.clear();
        self.buttons_visible = false;
        self.highlighted = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::XrSession;
    use glam::Quat;

    #[derive(Debug)]
    struct FakeSession {
        controllers: Vec<ControllerState>,
    }

    impl XrSession for FakeSession {
        fn head_pose(&self) -> Option<Pose> {
            Some(Pose {
                orientation: Quat::from_rotation_y(0.25),
                position: Vec3::new(0.0, 1.6, 0.0),
            })
        }
        fn controllers(&self) -> Vec<ControllerState> {
            self.controllers.clone()
        }
        fn is_active(&self) -> bool {
            true
        }
        fn end(&mut self) {}
    }

    fn aimed_at(x: f32, pressed: bool) -> ControllerState {
        ControllerState {
            pose: Pose {
                orientation: Quat::IDENTITY,
                position: Vec3::new(x, -2.0, 0.0),
            },
            select_pressed: pressed,
            squeeze_pressed: false,
        }
    }

    fn tick(controls: &mut XrControllerControls, session: &FakeSession) -> Option<ControlAction> {
        let mut camera = Camera::new(1.0);
        let inputs = FrameInputs { xr_session: Some(session) };
        controls.update(&mut camera, &inputs)
    }

    #[test]
    fn head_pose_drives_camera() {
        let mut controls = XrControllerControls::new(OrbitOrientationControls::new(false, false));
        let session = FakeSession { controllers: vec![] };
        let mut camera = Camera::new(1.0);
        controls.update(&mut camera, &FrameInputs { xr_session: Some(&session) });
        assert_eq!(camera.position, Vec3::new(0.0, 1.6, 0.0));
    }

    #[test]
    fn pointing_at_play_toggles_once_per_press() {
        let mut controls = XrControllerControls::new(OrbitOrientationControls::new(false, false));
        let held = FakeSession { controllers: vec![aimed_at(-0.4, true)] };

        assert_eq!(tick(&mut controls, &held), Some(ControlAction::TogglePlay));
        assert_eq!(controls.highlighted(), Some(ShuttleButton::PlayPause));
        assert_eq!(tick(&mut controls, &held), None);

        let released = FakeSession { controllers: vec![aimed_at(-0.4, false)] };
        assert_eq!(tick(&mut controls, &released), None);
        assert!(!controls.buttons_visible());
        assert_eq!(tick(&mut controls, &held), Some(ControlAction::TogglePlay));
    }

    #[test]
    fn pointing_at_exit_ends_the_session() {
        let mut controls = XrControllerControls::new(OrbitOrientationControls::new(false, false));
        let session = FakeSession { controllers: vec![aimed_at(0.4, true)] };
        assert_eq!(tick(&mut controls, &session), Some(ControlAction::ExitImmersive));
    }

    #[test]
    fn pointing_elsewhere_only_shows_buttons() {
        let mut controls = XrControllerControls::new(OrbitOrientationControls::new(false, false));
        let session = FakeSession { controllers: vec![aimed_at(3.0, true)] };
        assert_eq!(tick(&mut controls, &session), None);
        assert!(controls.buttons_visible());
        assert_eq!(controls.highlighted(), None);
    }

    #[test]
    fn shuttle_spheres_follow_the_press() {
        let mut controls = XrControllerControls::new(OrbitOrientationControls::new(false, false));
        assert!(controls.shuttle().is_empty());

        tick(&mut controls, &FakeSession { controllers: vec![aimed_at(0.4, true)] });
        let spheres = controls.shuttle();
        assert_eq!(spheres.len(), 2);
        let lit: Vec<_> = spheres.iter().filter(|s| s.highlighted).map(|s| s.button).collect();
        assert_eq!(lit, [ShuttleButton::Exit]);
        assert!(spheres.iter().all(|s| s.center.y == -2.0 && s.radius == BUTTON_RADIUS));

        tick(&mut controls, &FakeSession { controllers: vec![aimed_at(0.4, false)] });
        assert!(controls.shuttle().is_empty());
    }
}
