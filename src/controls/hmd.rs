// hmd.rs — orientation-only tracking from a legacy VR display

use super::{CameraControls, ControlAction, FrameInputs, StrategyKind};
use crate::camera::Camera;
use crate::capability::DisplayHandle;

pub struct HmdControls {
    display: Option<DisplayHandle>,
}

impl HmdControls {
    pub fn new(display: DisplayHandle) -> Self {
        log::debug!("tracking head orientation from {}", display.name());
        Self {
            display: Some(display),
        }
    }
}

impl CameraControls for HmdControls {
    fn kind(&self) -> StrategyKind {
        StrategyKind::HmdOrientation
    }

    fn update(&mut self, camera: &mut Camera, _inputs: &FrameInputs<'_>) -> Option<ControlAction> {
        // No positional tracking: the camera stays at the sphere's centre.
        if let Some(orientation) = self.display.as_ref().and_then(|d| d.orientation()) {
            camera.rotation = orientation;
        }
        None
    }

    fn dispose(&mut self) {
        self.display = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::VrDisplay;
    use crate::error::ProbeError;
    use glam::Quat;
    use std::rc::Rc;

    #[derive(Debug)]
    struct FixedHmd(Quat);

    impl VrDisplay for FixedHmd {
        fn name(&self) -> String {
            "fixed".into()
        }
        fn is_polyfilled(&self) -> bool {
            false
        }
        fn orientation(&self) -> Option<Quat> {
            Some(self.0)
        }
        fn request_present(&self) -> Result<(), ProbeError> {
            Ok(())
        }
        fn exit_present(&self) {}
        fn is_presenting(&self) -> bool {
            false
        }
    }

    #[test]
    fn copies_display_orientation() {
        let pose = Quat::from_rotation_y(0.5);
        let mut controls = HmdControls::new(Rc::new(FixedHmd(pose)));
        let mut camera = Camera::new(1.0);
        controls.update(&mut camera, &FrameInputs::default());
        assert!(camera.rotation.abs_diff_eq(pose, 1e-6));
    }

    #[test]
    fn disposed_controls_leave_camera_alone() {
        let mut controls = HmdControls::new(Rc::new(FixedHmd(Quat::from_rotation_x(0.3))));
        controls.dispose();
        let mut camera = Camera::new(1.0);
        controls.update(&mut camera, &FrameInputs::default());
        assert_eq!(camera.rotation, Quat::IDENTITY);
    }
}
