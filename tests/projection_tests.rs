use vr_player::Projection;

#[test]
fn names_are_case_insensitive() {
    for name in ["360_lr", "360_Lr", "360_LR"] {
        assert_eq!(Projection::resolve(name), Some(Projection::EquirectStereoLr), "{name}");
    }
    assert_eq!(Projection::resolve("eac_lr"), Some(Projection::EacStereoLr));
    assert_eq!(Projection::resolve("180_mono"), Some(Projection::HalfEquirectMono));
}

#[test]
fn aliases_match_anywhere_in_the_name() {
    assert_eq!(Projection::resolve("Sphere"), Some(Projection::Equirect));
    assert_eq!(Projection::resolve("SPHERE"), Some(Projection::Equirect));
    assert_eq!(Projection::resolve("Cube"), Some(Projection::Cube));
    assert_eq!(Projection::resolve("360_CUBE"), Some(Projection::Cube));
    assert_eq!(Projection::resolve("equirectangular"), Some(Projection::Equirect));
}

#[test]
fn bare_180_is_side_by_side() {
    assert_eq!(Projection::resolve("180"), Some(Projection::HalfEquirectStereoLr));
}

#[test]
fn auto_hint_equirectangular_matches_360() {
    let from_alias = Projection::Auto.resolve_auto(Some("equirectangular"));
    let from_name = Projection::Auto.resolve_auto(Some("360"));
    assert_eq!(from_alias, from_name);
    assert_eq!(from_alias, Projection::Equirect);
}

#[test]
fn stereo_and_half_sphere_flags() {
    assert!(Projection::HalfEquirectStereoTb.is_stereo());
    assert!(Projection::HalfEquirectStereoTb.is_half_sphere());
    assert!(!Projection::Eac.is_stereo());
    assert!(!Projection::Cube.is_half_sphere());
    assert!(!Projection::None.is_renderable());
    assert!(!Projection::Auto.is_renderable());
    assert!(Projection::HalfEquirectMono.is_renderable());
}

#[test]
fn parse_and_display_agree() {
    let parsed: Projection = "180_tb".parse().unwrap();
    assert_eq!(parsed.to_string(), "180_TB");
}
