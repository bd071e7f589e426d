// projection.rs — projection tags and name resolution

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// How the flat video frame is packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Projection {
    Equirect,
    EquirectStereoLr,
    EquirectStereoTb,
    Cube,
    Eac,
    EacStereoLr,
    HalfEquirectMono,
    HalfEquirectStereoLr,
    HalfEquirectStereoTb,
    None,
    Auto,
}

/// Names accepted by `resolve`, in match order. `180` is the historical
/// spelling of `180_LR`.
const CANONICAL: &[(&str, Projection)] = &[
    ("360", Projection::Equirect),
    ("360_LR", Projection::EquirectStereoLr),
    ("360_TB", Projection::EquirectStereoTb),
    ("360_CUBE", Projection::Cube),
    ("EAC", Projection::Eac),
    ("EAC_LR", Projection::EacStereoLr),
    ("NONE", Projection::None),
    ("AUTO", Projection::Auto),
    ("180", Projection::HalfEquirectStereoLr),
    ("180_LR", Projection::HalfEquirectStereoLr),
    ("180_TB", Projection::HalfEquirectStereoTb),
    ("180_MONO", Projection::HalfEquirectMono),
];

/// Substring aliases, checked before the canonical names.
const ALIASES: &[(&str, Projection)] = &[
    ("sphere", Projection::Equirect),
    ("cube", Projection::Cube),
    ("equirectangular", Projection::Equirect),
];

/// Everything a user may pass, for error messages.
pub const VALID_PROJECTIONS: &[&str] = &[
    "360",
    "360_LR",
    "360_TB",
    "360_CUBE",
    "EAC",
    "EAC_LR",
    "NONE",
    "AUTO",
    "Sphere",
    "Cube",
    "equirectangular",
    "180",
    "180_LR",
    "180_TB",
    "180_MONO",
];

impl Projection {
    /// Normalize a user supplied name or alias. `None` means unrecognized.
    pub fn resolve(input: &str) -> Option<Projection> {
        let name = input.trim();
        if name.is_empty() {
            return None;
        }

        let lower = name.to_ascii_lowercase();
        for (alias, projection) in ALIASES {
            if lower.contains(alias) {
                return Some(*projection);
            }
        }

        CANONICAL
            .iter()
            .find(|(canonical, _)| canonical.eq_ignore_ascii_case(name))
            .map(|(_, projection)| *projection)
    }

    /// Replace `Auto` with the projection named by the source metadata.
    /// Never returns `Auto`: a missing, unknown or `AUTO` hint means `None`.
    pub fn resolve_auto(self, hint: Option<&str>) -> Projection {
        if self != Projection::Auto {
            return self;
        }

        match hint.and_then(Projection::resolve) {
            Some(Projection::Auto) | None => Projection::None,
            Some(concrete) => concrete,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equirect => "360",
            Self::EquirectStereoLr => "360_LR",
            Self::EquirectStereoTb => "360_TB",
            Self::Cube => "360_CUBE",
            Self::Eac => "EAC",
            Self::EacStereoLr => "EAC_LR",
            Self::HalfEquirectMono => "180_MONO",
            Self::HalfEquirectStereoLr => "180_LR",
            Self::HalfEquirectStereoTb => "180_TB",
            Self::None => "NONE",
            Self::Auto => "AUTO",
        }
    }

    pub fn is_stereo(&self) -> bool {
        matches!(
            self,
            Self::EquirectStereoLr
                | Self::EquirectStereoTb
                | Self::EacStereoLr
                | Self::HalfEquirectStereoLr
                | Self::HalfEquirectStereoTb
        )
    }

    /// 180° projections limit how far the user may look around.
    pub fn is_half_sphere(&self) -> bool {
        matches!(
            self,
            Self::HalfEquirectMono | Self::HalfEquirectStereoLr | Self::HalfEquirectStereoTb
        )
    }

    /// Whether a mesh is built for this projection at all.
    pub fn is_renderable(&self) -> bool {
        !matches!(self, Self::None | Self::Auto)
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Projection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Projection::resolve(s)
            .ok_or_else(|| ConfigError::UnknownProjection(s.to_string(), VALID_PROJECTIONS.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_win_over_canonical_names() {
        assert_eq!(Projection::resolve("my_cube_video"), Some(Projection::Cube));
        assert_eq!(Projection::resolve("Equirectangular"), Some(Projection::Equirect));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(Projection::resolve("  360_tb "), Some(Projection::EquirectStereoTb));
    }

    #[test]
    fn empty_and_garbage_are_unrecognized() {
        assert_eq!(Projection::resolve(""), None);
        assert_eq!(Projection::resolve("360_XY"), None);
        assert_eq!(Projection::resolve("3600"), None);
    }

    #[test]
    fn auto_never_resolves_to_auto() {
        assert_eq!(Projection::Auto.resolve_auto(Some("AUTO")), Projection::None);
        assert_eq!(Projection::Auto.resolve_auto(Some("auto")), Projection::None);
        assert_eq!(Projection::Auto.resolve_auto(None), Projection::None);
        assert_eq!(Projection::Auto.resolve_auto(Some("bogus")), Projection::None);
        assert_eq!(Projection::Auto.resolve_auto(Some("EAC")), Projection::Eac);
    }

    #[test]
    fn concrete_projection_ignores_hint() {
        assert_eq!(Projection::Cube.resolve_auto(Some("360")), Projection::Cube);
    }

    #[test]
    fn every_canonical_name_roundtrips() {
        for (name, projection) in CANONICAL {
            let resolved = Projection::resolve(name).unwrap();
            assert_eq!(resolved, *projection, "{name}");
            assert_eq!(Projection::resolve(resolved.as_str()), Some(resolved));
        }
    }

    #[test]
    fn from_str_reports_valid_names() {
        let err = "wat".parse::<Projection>().unwrap_err();
        assert!(err.to_string().contains("360_CUBE"));
    }
}
