// config.rs — player options and command line

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OmnitoneOptions {
    /// Order in which the decoder reads the four first-order channels.
    pub channel_map: Vec<u8>,
    pub ambisonic_order: u8,
}

impl Default for OmnitoneOptions {
    fn default() -> Self {
        Self {
            channel_map: vec![0, 1, 2, 3],
            ambisonic_order: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VrOptions {
    pub projection: String,
    pub sphere_detail: i32,
    pub force_cardboard: bool,
    pub disable_toggle_play: bool,
    pub omnitone: bool,
    pub omnitone_options: OmnitoneOptions,
    /// Device-orientation input. Unset means "on for mobile hosts".
    pub motion_controls: Option<bool>,
    pub debug: bool,
}

impl Default for VrOptions {
    fn default() -> Self {
        Self {
            projection: "AUTO".to_string(),
            sphere_detail: 32,
            force_cardboard: false,
            disable_toggle_play: false,
            omnitone: false,
            omnitone_options: OmnitoneOptions::default(),
            motion_controls: None,
            debug: false,
        }
    }
}

impl VrOptions {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Default log filter for `env_logger` when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }

    /// Command line flags win over the file.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(projection) = &args.projection {
            self.projection = projection.clone();
        }
        if let Some(detail) = args.sphere_detail {
            self.sphere_detail = detail;
        }
        self.force_cardboard |= args.force_cardboard;
        self.disable_toggle_play |= args.disable_toggle_play;
        self.debug |= args.debug;
        if args.no_motion_controls {
            self.motion_controls = Some(false);
        }
    }
}

/// Metadata a source can carry next to the media, `<media>.json`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MediaInfo {
    pub projection: Option<String>,
}

impl MediaInfo {
    pub fn sidecar_for(media: &Path) -> Option<Self> {
        let path = media.with_extension("json");
        let text = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&text) {
            Ok(info) => Some(info),
            Err(err) => {
                log::warn!("ignoring {}: {err}", path.display());
                None
            }
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "vr_player", about = "360°/180° and stereoscopic video player")]
pub struct Args {
    /// Image, or directory of numbered frames, to play.
    pub media: Option<PathBuf>,

    /// JSON options file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Projection name or alias (360, 360_LR, 180_TB, EAC, Sphere, ...).
    #[arg(long)]
    pub projection: Option<String>,

    /// Projection from the source's metadata, used when projection is AUTO.
    #[arg(long)]
    pub source_projection: Option<String>,

    #[arg(long)]
    pub sphere_detail: Option<i32>,

    /// Frame rate for frame sequences.
    #[arg(long, default_value_t = 30.0)]
    pub fps: f32,

    #[arg(long)]
    pub force_cardboard: bool,

    #[arg(long)]
    pub disable_toggle_play: bool,

    #[arg(long)]
    pub no_motion_controls: bool,

    #[arg(long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let opts = VrOptions::from_json("{}").unwrap();
        assert_eq!(opts, VrOptions::default());
        assert_eq!(opts.projection, "AUTO");
        assert_eq!(opts.sphere_detail, 32);
    }

    #[test]
    fn camel_case_keys_are_read() {
        let opts = VrOptions::from_json(
            r#"{"projection":"360_TB","sphereDetail":64,"forceCardboard":true,
                "omnitone":true,"omnitoneOptions":{"channelMap":[2,0,1,3]},"debug":true}"#,
        )
        .unwrap();
        assert_eq!(opts.projection, "360_TB");
        assert_eq!(opts.sphere_detail, 64);
        assert!(opts.force_cardboard);
        assert_eq!(opts.omnitone_options.channel_map, vec![2, 0, 1, 3]);
        assert_eq!(opts.omnitone_options.ambisonic_order, 1);
        assert_eq!(opts.log_filter(), "debug");
    }

    #[test]
    fn args_override_file() {
        let mut opts = VrOptions::default();
        let args = Args::parse_from(["vr_player", "--projection", "EAC", "--sphere-detail", "8", "--no-motion-controls"]);
        opts.apply_args(&args);
        assert_eq!(opts.projection, "EAC");
        assert_eq!(opts.sphere_detail, 8);
        assert_eq!(opts.motion_controls, Some(false));
    }

    #[test]
    fn sidecar_metadata_is_found_next_to_media() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("clip.png");
        std::fs::write(dir.path().join("clip.json"), r#"{"projection":"equirectangular"}"#).unwrap();
        let info = MediaInfo::sidecar_for(&media).unwrap();
        assert_eq!(info.projection.as_deref(), Some("equirectangular"));
    }
}
