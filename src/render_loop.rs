// render_loop.rs — one animation tick: texture, controls, audio, draw, gamepads, reschedule

use crate::camera::EyeView;
use crate::controls::{ControlAction, FrameInputs, ShuttleSphere};
use crate::error::{RenderError, VrError};
use crate::host::{GamepadSnapshot, MediaHost, ReadyState, VideoFrame};
use crate::mesh::ScreenMesh;
use crate::session::{PlayerContext, Session, VrPlayer};

/// Identifies a scheduled tick so it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Which clock drives the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSource {
    XrSession,
    LegacyDisplay,
    Window,
}

pub trait FrameScheduler {
    fn request_frame(&mut self, source: FrameSource) -> FrameHandle;
    /// Cancelling a handle that already fired is a no-op.
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// How a frame reaches the screen. Exactly one per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPath {
    /// Plain single-view render.
    Direct,
    /// Side-by-side split while a legacy display presents, single view otherwise.
    StereoEffect,
    /// Per-eye render driven by the immersive session while one is running.
    XrSession,
}

/// The GPU side: owns the video texture and the screen meshes.
pub trait RenderBackend {
    fn attach(&mut self, meshes: &[ScreenMesh]) -> Result<(), RenderError>;
    fn detach(&mut self);
    fn resize(&mut self, width: u32, height: u32);
    /// Replace the video texture contents with `frame`.
    fn upload_frame(&mut self, frame: &VideoFrame<'_>) -> Result<(), RenderError>;
    /// Write this frame's camera views. `shuttle` lists the in-scene
    /// buttons to draw over the screen, usually none.
    fn draw(&mut self, views: &[EyeView], shuttle: &[ShuttleSphere]) -> Result<(), RenderError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PadState {
    timestamp: f64,
    pressed: bool,
}

/// Turns gamepad button presses into play/pause toggles.
///
/// A pad only counts when its timestamp moved since the last poll, and a
/// held button toggles once, on the released to pressed edge.
#[derive(Debug, Default)]
pub struct GamepadPoller {
    pads: Vec<Option<PadState>>,
}

impl GamepadPoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of toggles this poll produced.
    pub fn poll(&mut self, gamepads: &[Option<GamepadSnapshot>]) -> usize {
        self.pads.resize(gamepads.len(), None);

        let mut toggles = 0;
        for (slot, pad) in self.pads.iter_mut().zip(gamepads) {
            let Some(pad) = pad else {
                *slot = None;
                continue;
            };
            if pad.timestamp == 0.0 || slot.is_some_and(|prev| prev.timestamp == pad.timestamp) {
                continue;
            }

            let pressed = pad.buttons.iter().any(|&b| b);
            let was_pressed = slot.is_some_and(|prev| prev.pressed);
            if pressed && !was_pressed {
                toggles += 1;
            }
            *slot = Some(PadState {
                timestamp: pad.timestamp,
                pressed,
            });
        }
        toggles
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No session: a stale callback after `reset`.
    Idle,
    Rendered,
    /// 3D was torn down and playback paused.
    Failed(VrError),
}

pub(crate) fn toggle_play(host: &mut dyn MediaHost) {
    if host.paused() {
        host.play();
    } else {
        host.pause();
    }
}

impl Session {
    pub(crate) fn frame_source(&self) -> FrameSource {
        if self.immersive.as_ref().is_some_and(|xr| xr.is_active()) {
            FrameSource::XrSession
        } else if self.caps.legacy_display.is_some() {
            FrameSource::LegacyDisplay
        } else {
            FrameSource::Window
        }
    }

    pub(crate) fn views(&self) -> Vec<EyeView> {
        let stereo = match self.output_path {
            OutputPath::Direct => false,
            OutputPath::StereoEffect => self.caps.legacy_display.as_ref().is_some_and(|d| d.is_presenting()),
            OutputPath::XrSession => self.immersive.as_ref().is_some_and(|xr| xr.is_active()),
        };
        if stereo {
            self.camera.stereo_views().to_vec()
        } else {
            vec![self.camera.mono_view()]
        }
    }

    /// Cancel whatever tick is pending and ask the current source for a new one.
    pub(crate) fn reschedule(&mut self, ctx: &mut PlayerContext<'_>) {
        if let Some(handle) = self.animation_handle.take() {
            ctx.scheduler.cancel_frame(handle);
        }
        self.animation_handle = Some(ctx.scheduler.request_frame(self.frame_source()));
    }

    /// Everything up to and including the draw call.
    fn render(&mut self, ctx: &mut PlayerContext<'_>) -> Result<Option<ControlAction>, RenderError> {
        if ctx.host.ready_state() == ReadyState::EnoughData {
            if let Some(frame) = ctx.host.current_frame() {
                match ctx.backend.upload_frame(&frame) {
                    Ok(()) => {}
                    Err(err @ RenderError::TextureBlocked(_)) => return Err(err),
                    Err(err) => log::warn!("frame upload skipped: {err}"),
                }
            }
        }

        let inputs = FrameInputs {
            xr_session: self.immersive.as_deref(),
        };
        let action = self.controls.update(&mut self.camera, &inputs);

        if let Some(omni) = self.omni.as_mut() {
            omni.update(&self.camera);
        }

        match ctx.backend.draw(&self.views(), &self.controls.shuttle()) {
            Ok(()) => {}
            Err(err @ RenderError::TextureBlocked(_)) => return Err(err),
            Err(err) => log::warn!("frame dropped: {err}"),
        }
        Ok(action)
    }
}

impl VrPlayer {
    /// One animation frame. Called by the host when a handle from
    /// `FrameScheduler::request_frame` fires.
    pub fn tick(&mut self, ctx: &mut PlayerContext<'_>) -> TickOutcome {
        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Idle;
        };
        // this tick is the callback the handle stood for
        session.animation_handle = None;

        let action = match session.render(ctx) {
            Ok(action) => action,
            Err(err) => {
                log::error!("{err}");
                self.reset(ctx);
                ctx.host.pause();
                ctx.host.show_error(VrError::HlsCorsNotSupported);
                return TickOutcome::Failed(VrError::HlsCorsNotSupported);
            }
        };

        let toggles = session.gamepads.poll(&ctx.host.gamepads());
        for _ in 0..toggles {
            toggle_play(ctx.host);
        }

        session.camera_vector = session.camera.world_direction();

        match action {
            Some(ControlAction::TogglePlay) => toggle_play(ctx.host),
            Some(ControlAction::ExitImmersive) => self.exit_immersive(ctx),
            None => {}
        }

        if let Some(session) = self.session.as_mut() {
            session.reschedule(ctx);
        }
        TickOutcome::Rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad(timestamp: f64, pressed: bool) -> Option<GamepadSnapshot> {
        Some(GamepadSnapshot {
            timestamp,
            buttons: vec![false, pressed],
        })
    }

    #[test]
    fn held_button_toggles_once() {
        let mut poller = GamepadPoller::new();
        assert_eq!(poller.poll(&[pad(1.0, false)]), 0);
        assert_eq!(poller.poll(&[pad(2.0, true)]), 1);
        assert_eq!(poller.poll(&[pad(3.0, true)]), 0);
        assert_eq!(poller.poll(&[pad(3.0, true)]), 0);
        assert_eq!(poller.poll(&[pad(4.0, false)]), 0);
        assert_eq!(poller.poll(&[pad(5.0, true)]), 1);
    }

    #[test]
    fn unchanged_timestamp_is_ignored() {
        let mut poller = GamepadPoller::new();
        poller.poll(&[pad(7.0, false)]);
        // state changed but the pad did not report it
        assert_eq!(poller.poll(&[pad(7.0, true)]), 0);
    }

    #[test]
    fn pads_are_tracked_independently() {
        let mut poller = GamepadPoller::new();
        assert_eq!(poller.poll(&[pad(1.0, true), None, pad(1.0, true)]), 2);
        assert_eq!(poller.poll(&[pad(2.0, true), None, pad(2.0, false)]), 0);
    }

    #[test]
    fn zero_timestamp_never_toggles() {
        let mut poller = GamepadPoller::new();
        assert_eq!(poller.poll(&[pad(0.0, true)]), 0);
    }
}
