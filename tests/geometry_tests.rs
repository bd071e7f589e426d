use vr_player::mesh::{build_screen, EyeLayer, GeometryParams, UvWarp};
use vr_player::Projection;

fn screen(projection: Projection, detail: i32) -> Vec<vr_player::mesh::ScreenMesh> {
    build_screen(&GeometryParams::new(projection, detail).with_video_size(3840, 2160))
}

#[test]
fn stereo_eyes_live_on_disjoint_layers() {
    for projection in [
        Projection::EquirectStereoLr,
        Projection::EquirectStereoTb,
        Projection::HalfEquirectStereoLr,
        Projection::HalfEquirectStereoTb,
        Projection::EacStereoLr,
    ] {
        let meshes = screen(projection, 16);
        assert_eq!(meshes.len(), 2, "{projection}");
        assert_eq!(meshes[0].layer, Some(EyeLayer::Left));
        assert_eq!(meshes[1].layer, Some(EyeLayer::Right));
        assert_eq!(meshes[0].layer_bit() & meshes[1].layer_bit(), 0, "{projection}");
    }
}

#[test]
fn left_right_packing_splits_u() {
    let meshes = screen(Projection::EquirectStereoLr, 16);
    assert!(meshes[0].geometry.uvs.iter().all(|uv| uv[0] <= 0.5));
    assert!(meshes[1].geometry.uvs.iter().all(|uv| uv[0] >= 0.5));
}

fn v_range(mesh: &vr_player::mesh::ScreenMesh) -> (f32, f32) {
    mesh.geometry
        .uvs
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), uv| (lo.min(uv[1]), hi.max(uv[1])))
}

#[test]
fn full_sphere_top_bottom_puts_the_left_eye_on_top() {
    let meshes = screen(Projection::EquirectStereoTb, 8);
    // UV origin is the bottom-left corner
    assert_eq!(v_range(&meshes[0]), (0.5, 1.0));
    assert_eq!(v_range(&meshes[1]), (0.0, 0.5));
}

#[test]
fn half_sphere_top_bottom_puts_the_left_eye_below() {
    let meshes = screen(Projection::HalfEquirectStereoTb, 8);
    assert_eq!(v_range(&meshes[0]), (0.0, 0.5));
    assert_eq!(v_range(&meshes[1]), (0.5, 1.0));
}

#[test]
fn mono_projections_are_shared_by_both_eyes() {
    for projection in [Projection::Equirect, Projection::Cube, Projection::Eac, Projection::HalfEquirectMono] {
        let meshes = screen(projection, 16);
        assert_eq!(meshes.len(), 1, "{projection}");
        assert_eq!(meshes[0].layer, None);
        // visible to a left-eye camera and to a right-eye camera
        assert!(meshes[0].visible_in(1 | 1 << EyeLayer::Left.index()));
        assert!(meshes[0].visible_in(1 | 1 << EyeLayer::Right.index()));
    }
}

#[test]
fn a_mono_camera_sees_only_the_left_eye() {
    let meshes = screen(Projection::EquirectStereoLr, 16);
    let mono_mask = 1 | 1 << EyeLayer::Left.index();
    assert!(meshes[0].visible_in(mono_mask));
    assert!(!meshes[1].visible_in(mono_mask));
}

#[test]
fn non_positive_detail_is_clamped() {
    for detail in [0, -5] {
        let meshes = screen(Projection::Equirect, detail);
        let geometry = &meshes[0].geometry;
        assert!(!geometry.indices.is_empty());
        assert!(geometry.indices.iter().all(|&i| (i as usize) < geometry.positions.len()));
    }
}

#[test]
fn none_and_auto_build_nothing() {
    assert!(screen(Projection::None, 32).is_empty());
    assert!(screen(Projection::Auto, 32).is_empty());
}

#[test]
fn only_eac_uses_the_equi_angular_warp() {
    assert!(matches!(screen(Projection::Eac, 8)[0].warp, UvWarp::EquiAngular { .. }));
    assert!(matches!(screen(Projection::Cube, 8)[0].warp, UvWarp::Linear));
    assert!(matches!(screen(Projection::Equirect, 8)[0].warp, UvWarp::Linear));
}

#[test]
fn cube_uvs_stay_inside_the_frame() {
    let meshes = screen(Projection::Cube, 8);
    for uv in &meshes[0].geometry.uvs {
        assert!((0.0..=1.0).contains(&uv[0]) && (0.0..=1.0).contains(&uv[1]), "{uv:?}");
    }
}
