// mesh.rs — screen geometry for every supported projection
//
// All builders return plain vertex data; uploading is the renderer's job.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Mat3, Mat4, Vec2, Vec3};

use crate::projection::Projection;

/// Radius of the screen sphere and edge length of the screen cube.
pub const SCREEN_RADIUS: f32 = 256.0;

/// Rows of pixels dropped along every discontinuous EAC face edge.
pub const EAC_CONTINUITY_PX: f32 = 2.0;

const MIN_WIDTH_SEGMENTS: i32 = 3;
const MIN_HEIGHT_SEGMENTS: i32 = 2;

/// Which eye a mesh is drawn for. Unset means both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EyeLayer {
    Left,
    Right,
}

impl EyeLayer {
    pub fn index(self) -> u32 {
        match self {
            EyeLayer::Left => 1,
            EyeLayer::Right => 2,
        }
    }
}

/// How the fragment stage turns interpolated UVs into texture coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UvWarp {
    Linear,
    /// Per-face arctangent correction for equi-angular cubemaps.
    EquiAngular {
        map: Mat3,
        face_size: Vec2,
        video_size: Vec2,
        inset_px: f32,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

/// One drawable piece of the movie screen.
#[derive(Debug, Clone)]
pub struct ScreenMesh {
    pub geometry: Geometry,
    pub transform: Mat4,
    pub layer: Option<EyeLayer>,
    pub warp: UvWarp,
}

impl ScreenMesh {
    fn new(geometry: Geometry, transform: Mat4) -> Self {
        Self {
            geometry,
            transform,
            layer: None,
            warp: UvWarp::Linear,
        }
    }

    fn on_layer(mut self, layer: EyeLayer) -> Self {
        self.layer = Some(layer);
        self
    }

    /// The camera layer bit this mesh lives on; bit 0 when shared by both eyes.
    pub fn layer_bit(&self) -> u32 {
        self.layer.map_or(1, |layer| 1 << layer.index())
    }

    /// Visible to a camera whose layer mask contains this mesh's layer.
    pub fn visible_in(&self, mask: u32) -> bool {
        mask & self.layer_bit() != 0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GeometryParams {
    pub projection: Projection,
    /// Sphere subdivisions; values below the minimum are clamped.
    pub detail: i32,
    pub radius: f32,
    /// Source video size in pixels, `(0, 0)` when unknown.
    pub video_size: (u32, u32),
}

impl GeometryParams {
    pub fn new(projection: Projection, detail: i32) -> Self {
        Self {
            projection,
            detail,
            radius: SCREEN_RADIUS,
            video_size: (0, 0),
        }
    }

    pub fn with_video_size(mut self, width: u32, height: u32) -> Self {
        self.video_size = (width, height);
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SphereParams {
    pub radius: f32,
    pub width_segments: i32,
    pub height_segments: i32,
    pub phi_start: f32,
    pub phi_length: f32,
    pub theta_start: f32,
    pub theta_length: f32,
}

impl SphereParams {
    pub fn full(radius: f32, detail: i32) -> Self {
        Self {
            radius,
            width_segments: detail,
            height_segments: detail,
            phi_start: 0.0,
            phi_length: 2.0 * PI,
            theta_start: 0.0,
            theta_length: PI,
        }
    }

    /// The back half is dropped: longitude sweeps π..2π.
    pub fn half(radius: f32, detail: i32) -> Self {
        Self {
            phi_start: PI,
            phi_length: PI,
            ..Self::full(radius, detail)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Packing {
    LeftRight,
    /// Left eye in the top half.
    TopBottom,
    /// Left eye in the bottom half, as 180° over-under masters are laid out.
    BottomTop,
}

/// Build the screen for a projection. Unsupported tags give no meshes.
pub fn build_screen(params: &GeometryParams) -> Vec<ScreenMesh> {
    let radius = params.radius;
    let detail = params.detail;

    match params.projection {
        Projection::Equirect => vec![equirect_screen(SphereParams::full(radius, detail))],
        Projection::EquirectStereoLr => stereo_spheres(radius, detail, Packing::LeftRight),
        Projection::EquirectStereoTb => stereo_spheres(radius, detail, Packing::TopBottom),
        Projection::HalfEquirectMono => {
            vec![ScreenMesh::new(half_sphere(radius, detail), Mat4::IDENTITY)]
        }
        Projection::HalfEquirectStereoLr => stereo_half_spheres(radius, detail, Packing::LeftRight),
        Projection::HalfEquirectStereoTb => stereo_half_spheres(radius, detail, Packing::BottomTop),
        Projection::Cube => vec![cube_screen(radius)],
        Projection::Eac => vec![eac_screen(radius, params.video_size, Mat3::IDENTITY, Mat3::IDENTITY)],
        Projection::EacStereoLr => {
            let scale = mat3_rows([[0.0, 0.5, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
            let left = mat3_rows([[0.0, -0.5, 0.5], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
            let right = mat3_rows([[0.0, -0.5, 1.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
            vec![
                eac_screen(radius, params.video_size, left, scale).on_layer(EyeLayer::Left),
                eac_screen(radius, params.video_size, right, scale).on_layer(EyeLayer::Right),
            ]
        }
        Projection::None | Projection::Auto => Vec::new(),
    }
}

/// UV sphere with the given sweep. Segment counts are clamped to 3×2.
pub fn build_sphere(params: &SphereParams) -> Geometry {
    let lon = params.width_segments.max(MIN_WIDTH_SEGMENTS) as usize;
    let lat = params.height_segments.max(MIN_HEIGHT_SEGMENTS) as usize;
    let theta_end = (params.theta_start + params.theta_length).min(PI);

    let mut positions = Vec::with_capacity((lat + 1) * (lon + 1));
    let mut uvs = Vec::with_capacity((lat + 1) * (lon + 1));
    let mut indices = Vec::with_capacity(lat * lon * 6);

    for i in 0..=lat {
        let v = i as f32 / lat as f32;
        let theta = params.theta_start + v * params.theta_length;
        let y = params.radius * theta.cos();
        let sin_t = theta.sin();

        for j in 0..=lon {
            let u = j as f32 / lon as f32;
            let phi = params.phi_start + u * params.phi_length;

            let x = -params.radius * phi.cos() * sin_t;
            let z = params.radius * phi.sin() * sin_t;

            positions.push([x, y, z]);
            uvs.push([u, 1.0 - v]);
        }
    }

    let row = lon + 1;
    for i in 0..lat {
        for j in 0..lon {
            let a = (i * row + j + 1) as u32;
            let b = (i * row + j) as u32;
            let c = ((i + 1) * row + j) as u32;
            let d = ((i + 1) * row + j + 1) as u32;

            // Degenerate pole triangles are skipped.
            if i != 0 || params.theta_start > 0.0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if i != lat - 1 || theta_end < PI {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    Geometry {
        positions,
        uvs,
        indices,
    }
}

/// Axis-aligned cube, one quad per face, faces ordered +X −X +Y −Y +Z −Z.
/// Each face's vertices run top-left, top-right, bottom-left, bottom-right.
pub fn build_box(size: f32) -> Geometry {
    let mut geometry = Geometry::default();
    let faces: [(usize, usize, usize, f32, f32, f32, f32, f32); 6] = [
        (2, 1, 0, -1.0, -1.0, size, size, size),
        (2, 1, 0, 1.0, -1.0, size, size, -size),
        (0, 2, 1, 1.0, 1.0, size, size, size),
        (0, 2, 1, 1.0, -1.0, size, size, -size),
        (0, 1, 2, 1.0, -1.0, size, size, size),
        (0, 1, 2, -1.0, -1.0, size, size, -size),
    ];

    for (u, v, w, udir, vdir, width, height, depth) in faces {
        let base = geometry.positions.len() as u32;
        for iy in 0..=1 {
            let y = iy as f32 * height - height / 2.0;
            for ix in 0..=1 {
                let x = ix as f32 * width - width / 2.0;
                let mut vertex = [0.0f32; 3];
                vertex[u] = x * udir;
                vertex[v] = y * vdir;
                vertex[w] = depth / 2.0;
                geometry.positions.push(vertex);
                geometry.uvs.push([ix as f32, 1.0 - iy as f32]);
            }
        }

        let (a, b, c, d) = (base, base + 2, base + 3, base + 1);
        geometry.indices.extend_from_slice(&[a, b, d, b, c, d]);
    }

    geometry
}

fn equirect_transform() -> Mat4 {
    // Inside-out sphere, turned so zero yaw faces the centre of the frame.
    Mat4::from_rotation_y(-FRAC_PI_2) * Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0))
}

fn equirect_screen(params: SphereParams) -> ScreenMesh {
    ScreenMesh::new(build_sphere(&params), equirect_transform())
}

fn stereo_spheres(radius: f32, detail: i32, packing: Packing) -> Vec<ScreenMesh> {
    [EyeLayer::Left, EyeLayer::Right]
        .into_iter()
        .map(|eye| {
            let mut geometry = build_sphere(&SphereParams::full(radius, detail));
            pack_uvs(&mut geometry.uvs, packing, eye);
            ScreenMesh::new(geometry, equirect_transform()).on_layer(eye)
        })
        .collect()
}

fn half_sphere(radius: f32, detail: i32) -> Geometry {
    let mut geometry = build_sphere(&SphereParams::half(radius, detail));
    for p in &mut geometry.positions {
        p[0] = -p[0];
    }
    geometry
}

fn stereo_half_spheres(radius: f32, detail: i32, packing: Packing) -> Vec<ScreenMesh> {
    [EyeLayer::Left, EyeLayer::Right]
        .into_iter()
        .map(|eye| {
            let mut geometry = half_sphere(radius, detail);
            pack_uvs(&mut geometry.uvs, packing, eye);
            ScreenMesh::new(geometry, Mat4::IDENTITY).on_layer(eye)
        })
        .collect()
}

/// Squeeze UVs into the half of the frame that belongs to `eye`.
/// Left eye: left half for side-by-side, top or bottom half for over-under.
fn pack_uvs(uvs: &mut [[f32; 2]], packing: Packing, eye: EyeLayer) {
    for uv in uvs {
        match (packing, eye) {
            (Packing::LeftRight, EyeLayer::Left) => uv[0] *= 0.5,
            (Packing::LeftRight, EyeLayer::Right) => uv[0] = uv[0] * 0.5 + 0.5,
            (Packing::TopBottom, EyeLayer::Left) => uv[1] = uv[1] * 0.5 + 0.5,
            (Packing::TopBottom, EyeLayer::Right) => uv[1] *= 0.5,
            (Packing::BottomTop, EyeLayer::Left) => uv[1] *= 0.5,
            (Packing::BottomTop, EyeLayer::Right) => uv[1] = uv[1] * 0.5 + 0.5,
        }
    }
}

const THIRD: f32 = 1.0 / 3.0;
const TWO_THIRDS: f32 = 2.0 / 3.0;

type FaceQuad = [Vec2; 4];

/// 3×2 cubemap layout, keyed in box face order (+X −X +Y −Y +Z −Z).
fn cube_faces() -> [FaceQuad; 6] {
    let v = Vec2::new;
    let left = [v(1.0, 0.0), v(1.0, 0.5), v(TWO_THIRDS, 0.5), v(TWO_THIRDS, 0.0)];
    let back = [v(TWO_THIRDS, 0.0), v(TWO_THIRDS, 0.5), v(THIRD, 0.5), v(THIRD, 0.0)];
    let top = [v(1.0, 1.0), v(TWO_THIRDS, 1.0), v(TWO_THIRDS, 0.5), v(1.0, 0.5)];
    let bottom = [v(0.0, 0.0), v(THIRD, 0.0), v(THIRD, 0.5), v(0.0, 0.5)];
    let front = [v(THIRD, 0.5), v(THIRD, 1.0), v(0.0, 1.0), v(0.0, 0.5)];
    let right = [v(TWO_THIRDS, 0.5), v(TWO_THIRDS, 1.0), v(THIRD, 1.0), v(THIRD, 0.5)];
    [left, back, top, bottom, front, right]
}

fn cube_screen(radius: f32) -> ScreenMesh {
    let mut geometry = build_box(radius);
    for (face, quad) in cube_faces().iter().enumerate() {
        // top-left, top-right, bottom-left, bottom-right
        for (corner, source) in [2usize, 1, 3, 0].into_iter().enumerate() {
            geometry.uvs[face * 4 + corner] = quad[source].to_array();
        }
    }
    ScreenMesh::new(geometry, Mat4::from_rotation_y(-PI))
}

/// EAC layout, keyed in box face order (+X −X +Y −Y +Z −Z). The layout is
/// mirrored relative to `cube_faces` because the faces are sampled from inside.
fn eac_faces() -> [FaceQuad; 6] {
    let v = Vec2::new;
    let right = [v(0.0, 0.5), v(THIRD, 0.5), v(THIRD, 1.0), v(0.0, 1.0)];
    let front = [v(THIRD, 0.5), v(TWO_THIRDS, 0.5), v(TWO_THIRDS, 1.0), v(THIRD, 1.0)];
    let left = [v(TWO_THIRDS, 0.5), v(1.0, 0.5), v(1.0, 1.0), v(TWO_THIRDS, 1.0)];
    let bottom = [v(THIRD, 0.0), v(THIRD, 0.5), v(0.0, 0.5), v(0.0, 0.0)];
    let back = [v(THIRD, 0.5), v(THIRD, 0.0), v(TWO_THIRDS, 0.0), v(TWO_THIRDS, 0.5)];
    let top = [v(1.0, 0.0), v(1.0, 0.5), v(TWO_THIRDS, 0.5), v(TWO_THIRDS, 0.0)];
    [right, left, top, bottom, front, back]
}

/// Pull every face's horizontal edges in by `inset_px` rows and compress x
/// by the same amount, so seams never sample the neighbouring face.
fn inset_face(quad: &mut FaceQuad, inset_px: f32, video_height: f32) {
    if video_height <= 0.0 || inset_px <= 0.0 {
        return;
    }

    let low = quad.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
    let high = quad.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);
    let step = inset_px / video_height;

    for p in quad.iter_mut() {
        if (p.y - low).abs() < f32::EPSILON {
            p.y += step;
        }
        if (p.y - high).abs() < f32::EPSILON {
            p.y -= step;
        }
        p.x = p.x / video_height * (video_height - inset_px * 2.0) + step;
    }
}

fn eac_screen(radius: f32, video_size: (u32, u32), map: Mat3, scale: Mat3) -> ScreenMesh {
    let (width, height) = video_size;
    let known = width > 0 && height > 0;
    let inset_px = if known { EAC_CONTINUITY_PX } else { 0.0 };
    let video = if known {
        Vec2::new(width as f32, height as f32)
    } else {
        Vec2::ONE
    };

    let mut geometry = build_box(radius);
    for (face, mut quad) in eac_faces().into_iter().enumerate() {
        inset_face(&mut quad, inset_px, video.y);
        for (corner, source) in [2usize, 3, 1, 0].into_iter().enumerate() {
            geometry.uvs[face * 4 + corner] = quad[source].to_array();
        }
    }

    let mut mesh = ScreenMesh::new(geometry, Mat4::from_rotation_y(-PI));
    mesh.warp = UvWarp::EquiAngular {
        map,
        face_size: scale.transform_vector2(Vec2::new(THIRD, 0.5)),
        video_size: scale.transform_vector2(video),
        inset_px,
    };
    mesh
}

/// Build a matrix from rows, the way the layouts above are written down.
fn mat3_rows(rows: [[f32; 3]; 3]) -> Mat3 {
    Mat3::from_cols_array_2d(&rows).transpose()
}

/// CPU mirror of the EAC fragment warp in `shader_screen.wgsl`.
pub fn eac_warp(uv: Vec2, face_size: Vec2, video_size: Vec2, inset_px: f32) -> Vec2 {
    let modulo = uv - face_size * (uv / face_size).floor();
    let corner = uv - modulo + Vec2::new(0.0, inset_px / video_size.y);
    let face = face_size - Vec2::new(0.0, inset_px * 2.0 / video_size.y);

    let p = (uv - corner) / face - Vec2::splat(0.5);
    let q = Vec2::new(
        2.0 / PI * (2.0 * p.x).atan() + 0.5,
        2.0 / PI * (2.0 * p.y).atan() + 0.5,
    );

    corner + q * face
}
