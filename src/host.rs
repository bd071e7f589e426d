// host.rs — what the player needs from the media playback host

use crate::ambisonic::AmbisonicDecoder;
use crate::buttons::{ButtonKind, ControlButton};
use crate::error::VrError;

/// How much media data is available, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    Nothing,
    Metadata,
    CurrentData,
    FutureData,
    EnoughData,
}

/// A borrowed RGBA8 frame.
#[derive(Debug, Clone, Copy)]
pub struct VideoFrame<'a> {
    pub width: u32,
    pub height: u32,
    pub rgba: &'a [u8],
}

impl VideoFrame<'_> {
    pub fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.rgba.len() as u64 == self.width as u64 * self.height as u64 * 4
    }
}

/// State of one connected gamepad.
#[derive(Debug, Clone, PartialEq)]
pub struct GamepadSnapshot {
    /// Changes whenever the pad reports new state. Zero means never.
    pub timestamp: f64,
    pub buttons: Vec<bool>,
}

/// The playback host: owns the video, the player chrome and the audio graph.
pub trait MediaHost {
    /// Size of the player area in pixels.
    fn player_size(&self) -> (u32, u32);

    /// Size of the whole window, used while an immersive session presents.
    fn window_size(&self) -> (u32, u32) {
        self.player_size()
    }

    /// Intrinsic size of the video, `(0, 0)` before metadata.
    fn video_size(&self) -> (u32, u32);

    fn ready_state(&self) -> ReadyState;

    fn current_frame(&self) -> Option<VideoFrame<'_>>;

    /// Projection named by the source's own metadata, used to resolve AUTO.
    fn projection_hint(&self) -> Option<String>;

    fn paused(&self) -> bool;
    fn play(&mut self);
    fn pause(&mut self);

    /// Whether the player shows its own control bar.
    fn has_controls(&self) -> bool {
        true
    }

    fn is_mobile(&self) -> bool {
        false
    }

    /// True when an ad break reused the main video element.
    fn video_element_recycled(&self) -> bool {
        false
    }

    /// Show or hide the flat video underneath the 3D canvas.
    fn set_video_visible(&mut self, visible: bool);

    fn show_error(&mut self, error: VrError);

    fn add_control(&mut self, button: Box<dyn ControlButton>);
    fn remove_control(&mut self, kind: ButtonKind) -> Option<Box<dyn ControlButton>>;
    fn has_control(&self, kind: ButtonKind) -> bool;

    fn gamepads(&self) -> Vec<Option<GamepadSnapshot>> {
        Vec::new()
    }

    /// Ambisonic decoder wired to the video's audio, if the host has one.
    fn ambisonic_decoder(&mut self) -> Option<Box<dyn AmbisonicDecoder>> {
        None
    }
}
