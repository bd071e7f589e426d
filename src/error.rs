// error.rs — error taxonomy for the player, the device probes and the GPU backend

use thiserror::Error;

/// User-visible failures. Shown as an overlay by the host; flat playback
/// keeps going underneath.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VrError {
    /// Platform or GPU cannot do 360 at all.
    #[error("360 not supported on this device")]
    NotSupported,

    /// A VR API exists but only an outdated revision of it.
    #[error("360 is out of date")]
    OutOfDate,

    /// The VR API is present but enumerated no display.
    #[error("no 360 display found")]
    NoDeviceFound,

    /// The video frames could not be fed into the GPU texture.
    #[error("360 HLS video not supported on this device")]
    HlsCorsNotSupported,
}

impl VrError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotSupported => "web-vr-not-supported",
            Self::OutOfDate => "web-vr-out-of-date",
            Self::NoDeviceFound => "web-vr-no-device",
            Self::HlsCorsNotSupported => "web-vr-hls-cors-not-supported",
        }
    }

    pub fn headline(&self) -> String {
        self.to_string()
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::NotSupported => "Your device does not support 360 playback.",
            Self::OutOfDate => "Your device supports 360 but not the latest version.",
            Self::NoDeviceFound => "No VR display was found. Falling back to drag controls.",
            Self::HlsCorsNotSupported => {
                "Your device does not allow this video to be used as a 360 texture."
            }
        }
    }
}

/// Failures reported by a `RenderBackend`.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Frame data cannot be sampled by the GPU (blocked, protected or corrupt).
    #[error("video frame cannot be uploaded to the texture: {0}")]
    TextureBlocked(String),

    #[error("surface lost")]
    SurfaceLost,

    #[error("out of GPU memory")]
    OutOfMemory,

    #[error("render backend: {0}")]
    Backend(String),
}

/// A device API probe that failed outright (as opposed to answering "no").
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("device API unavailable: {0}")]
    Unavailable(String),

    #[error("permission denied")]
    PermissionDenied,
}

/// Failures of the host's ambisonic decoder. Audio falls back to plain
/// stereo; video is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmbisonicError {
    #[error("ambisonic decoder failed to initialize: {0}")]
    Initialize(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("unknown projection {0:?}; valid projections are {1}")]
    UnknownProjection(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(VrError::OutOfDate.code(), "web-vr-out-of-date");
        assert_eq!(
            VrError::HlsCorsNotSupported.code(),
            "web-vr-hls-cors-not-supported"
        );
    }
}
