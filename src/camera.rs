// camera.rs — perspective camera, render layers and per-eye views

use glam::{Mat3, Mat4, Quat, Vec3};

use crate::mesh::EyeLayer;

pub const DEFAULT_FOV: f32 = 70.0;
pub const NEAR: f32 = 1.0;
pub const FAR: f32 = 2000.0;

/// Half the interpupillary distance, in scene units.
const EYE_OFFSET: f32 = 0.032;

const DEFAULT_LAYER: u32 = 1;

#[derive(Debug, Clone)]
pub struct Camera {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub rotation: Quat,
    /// Bit 0 is the shared layer, bit n is eye layer n.
    pub layers: u32,
}

/// One viewport worth of drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeView {
    /// Normalized `[x, y, width, height]`.
    pub viewport: [f32; 4],
    pub view_proj: Mat4,
    pub layers: u32,
}

impl Camera {
    pub fn new(aspect: f32) -> Self {
        Self {
            fov: DEFAULT_FOV,
            aspect,
            near: NEAR,
            far: FAR,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            layers: DEFAULT_LAYER,
        }
    }

    pub fn enable_layer(&mut self, layer: EyeLayer) {
        self.layers |= 1 << layer.index();
    }

    /// Direction the camera looks in, in world space.
    pub fn world_direction(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn rotation_matrix(&self) -> Mat3 {
        Mat3::from_quat(self.rotation)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), aspect.max(f32::EPSILON), self.near, self.far)
    }

    /// Single full-surface view. Stereo content shows the left eye.
    pub fn mono_view(&self) -> EyeView {
        EyeView {
            viewport: [0.0, 0.0, 1.0, 1.0],
            view_proj: self.projection_matrix(self.aspect) * self.view_matrix(),
            layers: self.layers,
        }
    }

    /// Side-by-side views, left eye first.
    pub fn stereo_views(&self) -> [EyeView; 2] {
        let projection = self.projection_matrix(self.aspect * 0.5);
        let right = self.rotation * Vec3::X;

        let eye = |layer: EyeLayer, offset: f32, x: f32| {
            let view = Mat4::from_rotation_translation(self.rotation, self.position + right * offset).inverse();
            EyeView {
                viewport: [x, 0.0, 0.5, 1.0],
                view_proj: projection * view,
                layers: DEFAULT_LAYER | (1 << layer.index()),
            }
        };

        [
            eye(EyeLayer::Left, -EYE_OFFSET, 0.0),
            eye(EyeLayer::Right, EYE_OFFSET, 0.5),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_down_negative_z_by_default() {
        let cam = Camera::new(16.0 / 9.0);
        assert!((cam.world_direction() - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn mono_view_sees_left_eye_once_enabled() {
        let mut cam = Camera::new(1.0);
        assert_eq!(cam.mono_view().layers, 0b001);
        cam.enable_layer(EyeLayer::Left);
        assert_eq!(cam.mono_view().layers, 0b011);
    }

    #[test]
    fn stereo_views_have_disjoint_eye_layers() {
        let cam = Camera::new(2.0);
        let [left, right] = cam.stereo_views();
        assert_eq!(left.layers & right.layers, DEFAULT_LAYER);
        assert_eq!(left.viewport[0], 0.0);
        assert_eq!(right.viewport[0], 0.5);
    }
}
