// session.rs — VrPlayer: init/reset across media changes, ad breaks and resizes

use glam::Vec3;

use crate::ambisonic::OmnitoneController;
use crate::buttons::{BigPlayButton, BigVrPlayButton, ButtonAction, ButtonKind, CardboardButton, ControlButton, VrEntryButton};
use crate::camera::Camera;
use crate::capability::{CapabilityDetector, CapabilityResult, DetectorConfig, DeviceApis, Permission, XrSession};
use crate::config::VrOptions;
use crate::controls::{
    build_controls, select_strategy, CameraControls, CanvasPlayerControls, ControlAction, DeviceOrientation,
    PointerEvent, StrategyKind,
};
use crate::error::{ConfigError, VrError};
use crate::host::MediaHost;
use crate::mesh::{build_screen, EyeLayer, GeometryParams, ScreenMesh};
use crate::projection::{Projection, VALID_PROJECTIONS};
use crate::render_loop::{toggle_play, FrameHandle, FrameScheduler, GamepadPoller, OutputPath, RenderBackend};

/// Smallest width or height the camera aspect is computed from.
const MIN_VIEW_SIZE: u32 = 300;

/// The collaborators every lifecycle call needs, borrowed for that call.
pub struct PlayerContext<'a> {
    pub host: &'a mut dyn MediaHost,
    pub backend: &'a mut dyn RenderBackend,
    pub devices: &'a dyn DeviceApis,
    pub scheduler: &'a mut dyn FrameScheduler,
}

/// Snapshot of the player's lifecycle state.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub initialized: bool,
    pub current_projection: Projection,
    pub default_projection: Projection,
    /// World-space direction the camera looked in on the last tick.
    pub camera_vector: Vec3,
    pub animation_handle: Option<FrameHandle>,
}

/// Everything `init` acquires. Dropped as a whole by `reset`.
pub(crate) struct Session {
    pub(crate) camera: Camera,
    pub(crate) meshes: Vec<ScreenMesh>,
    pub(crate) caps: CapabilityResult,
    pub(crate) strategy: StrategyKind,
    pub(crate) controls: Box<dyn CameraControls>,
    pub(crate) canvas_controls: Option<CanvasPlayerControls>,
    pub(crate) output_path: OutputPath,
    pub(crate) immersive: Option<Box<dyn XrSession>>,
    pub(crate) omni: Option<OmnitoneController>,
    /// Audio was suspended at init; resume it on the next `on_playing`.
    pub(crate) resume_audio_on_playing: bool,
    /// Motion controls were requested for this session.
    pub(crate) motion_controls: bool,
    pub(crate) gamepads: GamepadPoller,
    pub(crate) camera_vector: Vec3,
    pub(crate) animation_handle: Option<FrameHandle>,
    /// Drawing surface size in pixels, for pointer scaling.
    pub(crate) surface_size: (u32, u32),
}

pub struct VrPlayer {
    options: VrOptions,
    default_projection: Projection,
    current_projection: Projection,
    pub(crate) session: Option<Session>,
    reinit_on_playing: bool,
    disposed: bool,
}

impl VrPlayer {
    pub fn new(options: VrOptions) -> Self {
        let projection = match Projection::resolve(&options.projection) {
            Some(projection) => projection,
            None => {
                log_invalid_projection(&options.projection);
                Projection::None
            }
        };
        Self {
            options,
            default_projection: projection,
            current_projection: projection,
            session: None,
            reinit_on_playing: false,
            disposed: false,
        }
    }

    pub fn options(&self) -> &VrOptions {
        &self.options
    }

    /// Change both the current and the default projection. Takes effect on
    /// the next `init`. Unknown names keep the previous projection.
    pub fn set_projection(&mut self, name: &str) -> Result<(), ConfigError> {
        let Some(projection) = Projection::resolve(name) else {
            log_invalid_projection(name);
            return Err(ConfigError::UnknownProjection(name.to_string(), VALID_PROJECTIONS.join(", ")));
        };
        self.current_projection = projection;
        self.default_projection = projection;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            initialized: self.session.is_some(),
            current_projection: self.current_projection,
            default_projection: self.default_projection,
            camera_vector: self.session.as_ref().map_or(Vec3::ZERO, |s| s.camera_vector),
            animation_handle: self.session.as_ref().and_then(|s| s.animation_handle),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn strategy(&self) -> Option<StrategyKind> {
        self.session.as_ref().map(|s| s.strategy)
    }

    pub fn output_path(&self) -> Option<OutputPath> {
        self.session.as_ref().map(|s| s.output_path)
    }

    pub fn capabilities(&self) -> Option<&CapabilityResult> {
        self.session.as_ref().map(|s| &s.caps)
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.session.as_ref().map(|s| &s.camera)
    }

    pub fn meshes(&self) -> &[ScreenMesh] {
        self.session.as_ref().map(|s| s.meshes.as_slice()).unwrap_or_default()
    }

    pub fn is_immersive(&self) -> bool {
        self.session
            .as_ref()
            .and_then(|s| s.immersive.as_ref())
            .is_some_and(|xr| xr.is_active())
    }

    /// Build the 3D scene for the current media. Always starts from a clean
    /// slate. A projection of NONE leaves the flat video untouched.
    ///
    /// Errors are also shown on the host; flat playback continues.
    pub fn init(&mut self, ctx: &mut PlayerContext<'_>) -> Result<(), VrError> {
        if self.disposed {
            log::warn!("init called on a disposed player");
            return Ok(());
        }

        self.reset(ctx);
        self.current_projection = self.default_projection;

        let hint = ctx.host.projection_hint();
        let projection = self.current_projection.resolve_auto(hint.as_deref());
        self.current_projection = projection;
        log::debug!("projection {} resolved from hint {:?}", projection, hint);

        if !projection.is_renderable() {
            log::debug!("projection is NONE, not initializing");
            return Ok(());
        }

        let (width, height) = ctx.host.player_size();
        let mut camera = Camera::new(width.max(1) as f32 / height.max(1) as f32);
        // mono output shows the left eye of stereo content
        camera.enable_layer(EyeLayer::Left);

        let (video_w, video_h) = ctx.host.video_size();
        let params = GeometryParams::new(projection, self.options.sphere_detail).with_video_size(video_w, video_h);
        let meshes = build_screen(&params);
        if meshes.is_empty() {
            log::debug!("no geometry for {projection}, not initializing");
            return Ok(());
        }

        if let Err(err) = ctx.backend.attach(&meshes) {
            log::error!("could not attach the 3D canvas: {err}");
            ctx.host.show_error(VrError::NotSupported);
            return Err(VrError::NotSupported);
        }
        ctx.host.set_video_visible(false);

        if let Some(mut button) = ctx.host.remove_control(ButtonKind::BigPlay) {
            button.dispose();
        }
        ctx.host.add_control(Box::new(BigVrPlayButton));

        let is_mobile = ctx.host.is_mobile();
        let wants_cardboard = self.options.force_cardboard || is_mobile;
        if wants_cardboard {
            add_control_once(ctx.host, Box::new(CardboardButton::default()));
        }

        let motion_controls = self.options.motion_controls.unwrap_or(is_mobile);
        let detector = CapabilityDetector::new(DetectorConfig {
            cardboard_polyfill: wants_cardboard,
            motion_controls,
        });
        let caps = pollster::block_on(detector.detect(ctx.devices));

        if caps.xr_immersive_supported {
            add_control_once(ctx.host, Box::new(VrEntryButton::default()));
        }
        if caps.has_hardware_display() {
            // real headsets need the button to start presenting
            add_control_once(ctx.host, Box::new(CardboardButton::default()));
        }
        if caps.legacy_display.is_none() && !caps.xr_immersive_supported {
            log::debug!("no VR display found, using orbit controls");
        }
        if caps.legacy_api_outdated && !caps.xr_immersive_supported && !caps.has_hardware_display() {
            ctx.host.show_error(VrError::OutOfDate);
        }

        let strategy = select_strategy(&caps);
        let controls = build_controls(strategy, &caps, projection.is_half_sphere());
        let canvas_controls = (strategy == StrategyKind::OrbitAndDeviceOrientation && !self.options.disable_toggle_play)
            .then(CanvasPlayerControls::new);

        let output_path = if caps.xr_immersive_supported {
            OutputPath::XrSession
        } else if caps.legacy_display.is_some() {
            OutputPath::StereoEffect
        } else {
            OutputPath::Direct
        };

        let omni = if self.options.omnitone {
            match ctx.host.ambisonic_decoder() {
                Some(decoder) => Some(OmnitoneController::new(decoder, &self.options.omnitone_options)),
                None => {
                    log::warn!("ambisonic decoding requested but the host has no decoder");
                    None
                }
            }
        } else {
            None
        };
        let resume_audio_on_playing = omni.as_ref().is_some_and(|omni| omni.audio_suspended());
        if resume_audio_on_playing {
            log::debug!("audio output suspended, pausing until playback resumes");
            ctx.host.pause();
        }

        self.session = Some(Session {
            camera,
            meshes,
            caps,
            strategy,
            controls,
            canvas_controls,
            output_path,
            immersive: None,
            omni,
            resume_audio_on_playing,
            motion_controls,
            gamepads: GamepadPoller::new(),
            camera_vector: Vec3::NEG_Z,
            animation_handle: None,
            surface_size: (width, height),
        });

        self.handle_resize(ctx);
        if let Some(session) = self.session.as_mut() {
            session.reschedule(ctx);
        }

        log::info!("360 playback ready: {projection}, {strategy:?} via {output_path:?}");
        Ok(())
    }

    /// Release everything `init` acquired. Safe to call at any time, any
    /// number of times.
    pub fn reset(&mut self, ctx: &mut PlayerContext<'_>) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        if let Some(handle) = session.animation_handle.take() {
            ctx.scheduler.cancel_frame(handle);
        }
        if let Some(omni) = session.omni.as_mut() {
            omni.dispose();
        }
        session.controls.dispose();
        if let Some(mut xr) = session.immersive.take() {
            xr.end();
        }
        if let Some(display) = session.caps.legacy_display.as_ref().filter(|d| d.is_presenting()) {
            display.exit_present();
        }

        ctx.backend.detach();

        if !ctx.host.has_control(ButtonKind::BigPlay) {
            ctx.host.add_control(Box::new(BigPlayButton));
        }
        for kind in [ButtonKind::BigVrPlay, ButtonKind::Cardboard, ButtonKind::VrEntry] {
            if let Some(mut button) = ctx.host.remove_control(kind) {
                button.dispose();
            }
        }
        ctx.host.set_video_visible(true);

        self.current_projection = self.default_projection;
        log::debug!("3D session torn down");
    }

    /// `reset` and refuse further `init` calls.
    pub fn dispose(&mut self, ctx: &mut PlayerContext<'_>) {
        self.reset(ctx);
        self.disposed = true;
    }

    pub fn on_loaded_metadata(&mut self, ctx: &mut PlayerContext<'_>) -> Result<(), VrError> {
        self.init(ctx)
    }

    /// An ad that reuses the main video element takes the texture away;
    /// tear down now and rebuild once content plays again.
    pub fn on_ad_start(&mut self, ctx: &mut PlayerContext<'_>) {
        if !ctx.host.video_element_recycled() {
            log::debug!("video element not recycled for this ad, no need to reset");
            return;
        }
        log::debug!("video element recycled for this ad, resetting");
        self.reset(ctx);
        self.reinit_on_playing = true;
    }

    pub fn on_playing(&mut self, ctx: &mut PlayerContext<'_>) -> Result<(), VrError> {
        if std::mem::take(&mut self.reinit_on_playing) {
            return self.init(ctx);
        }
        if let Some(session) = self.session.as_mut() {
            if std::mem::take(&mut session.resume_audio_on_playing) {
                if let Some(omni) = session.omni.as_mut() {
                    omni.resume_audio();
                }
            }
        }
        Ok(())
    }

    pub fn on_fullscreen_change(&mut self, ctx: &mut PlayerContext<'_>) {
        self.handle_resize(ctx);
    }

    pub fn on_window_resize(&mut self, ctx: &mut PlayerContext<'_>) {
        self.handle_resize(ctx);
    }

    /// Resize the surface and recompute the camera aspect, synchronously.
    pub fn handle_resize(&mut self, ctx: &mut PlayerContext<'_>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let immersive = session.immersive.as_ref().is_some_and(|xr| xr.is_active());
        let (width, height) = if immersive {
            let (w, h) = ctx.host.window_size();
            ctx.backend.resize(w, h);
            session.surface_size = (w, h);
            // one eye's worth of the window
            (w / 2, h)
        } else {
            let (w, h) = ctx.host.player_size();
            ctx.backend.resize(w, h);
            session.surface_size = (w, h);
            (w, h)
        };

        let width = width.max(MIN_VIEW_SIZE);
        let height = height.max(MIN_VIEW_SIZE);
        session.camera.aspect = width as f32 / height as f32;
    }

    /// Start presenting on the legacy display (cardboard button).
    pub fn activate_display(&mut self, ctx: &mut PlayerContext<'_>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(display) = session.caps.legacy_display.clone() else {
            ctx.host.show_error(VrError::NoDeviceFound);
            return;
        };
        if display.is_presenting() {
            return;
        }
        match display.request_present() {
            Ok(()) => log::debug!("presenting on {}", display.name()),
            Err(err) => {
                log::warn!("{} refused to present: {err}", display.name());
                return;
            }
        }
        self.handle_resize(ctx);
    }

    pub fn deactivate_display(&mut self, ctx: &mut PlayerContext<'_>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(display) = session.caps.legacy_display.clone().filter(|d| d.is_presenting()) else {
            return;
        };
        display.exit_present();
        self.handle_resize(ctx);
    }

    /// Ask the device for an immersive session (VR button).
    pub fn enter_immersive(&mut self, ctx: &mut PlayerContext<'_>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.caps.xr_immersive_supported || session.immersive.as_ref().is_some_and(|xr| xr.is_active()) {
            return;
        }

        match pollster::block_on(ctx.devices.request_immersive_session()) {
            Ok(xr) => {
                log::info!("immersive session started");
                session.immersive = Some(xr);
            }
            Err(err) => {
                log::warn!("immersive session request failed: {err}");
                ctx.host.show_error(VrError::NoDeviceFound);
                return;
            }
        }

        self.handle_resize(ctx);
        if let Some(session) = self.session.as_mut() {
            session.reschedule(ctx);
        }
    }

    /// End the immersive session. Playback pauses with it.
    pub fn exit_immersive(&mut self, ctx: &mut PlayerContext<'_>) {
        let Some(mut xr) = self.session.as_mut().and_then(|s| s.immersive.take()) else {
            return;
        };
        xr.end();
        ctx.host.pause();
        log::info!("immersive session ended");

        self.handle_resize(ctx);
        if let Some(session) = self.session.as_mut() {
            session.reschedule(ctx);
        }
    }

    pub fn toggle_play(&mut self, ctx: &mut PlayerContext<'_>) {
        toggle_play(ctx.host);
    }

    /// Route a pointer event to the camera controls and the click-to-play
    /// handler. Returns true when something used it.
    pub fn handle_pointer(&mut self, event: &PointerEvent, ctx: &mut PlayerContext<'_>) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let used = session.controls.handle_pointer(event, session.surface_size);

        let has_controls = ctx.host.has_controls();
        let clicked = session
            .canvas_controls
            .as_mut()
            .and_then(|canvas| canvas.handle_pointer(event, has_controls));
        if clicked == Some(ControlAction::TogglePlay) {
            toggle_play(ctx.host);
            return true;
        }
        used
    }

    pub fn handle_orientation(&mut self, orientation: DeviceOrientation) {
        if let Some(session) = self.session.as_mut() {
            session.controls.handle_orientation(orientation);
        }
    }

    /// Carry out what an activated control button asked for.
    pub fn apply_button(&mut self, action: ButtonAction, ctx: &mut PlayerContext<'_>) {
        match action {
            ButtonAction::TogglePlay => toggle_play(ctx.host),
            ButtonAction::TogglePlayWithOrientation => {
                self.request_orientation(ctx);
                toggle_play(ctx.host);
            }
            ButtonAction::ActivateDisplay => {
                let presenting = self
                    .session
                    .as_ref()
                    .and_then(|s| s.caps.legacy_display.as_ref())
                    .is_some_and(|d| d.is_presenting());
                if presenting {
                    self.deactivate_display(ctx);
                } else {
                    self.activate_display(ctx);
                }
            }
            ButtonAction::EnterImmersive => {
                if self.is_immersive() {
                    self.exit_immersive(ctx);
                } else {
                    self.enter_immersive(ctx);
                }
            }
        }
    }

    /// Ask for the motion sensor again from a user gesture. Only orbit
    /// sessions that wanted motion controls but did not get them ask.
    fn request_orientation(&mut self, ctx: &mut PlayerContext<'_>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.caps.orientation_available || !session.motion_controls || !ctx.devices.orientation_sensor() {
            return;
        }
        match pollster::block_on(ctx.devices.request_orientation_permission()) {
            Ok(Permission::Granted | Permission::NotRequired) => {
                log::debug!("device orientation enabled");
                session.caps.orientation_available = true;
                session.controls.enable_orientation();
            }
            Ok(Permission::Denied) => log::debug!("device orientation permission denied"),
            Err(err) => log::debug!("device orientation permission failed: {err}"),
        }
    }
}

fn add_control_once(host: &mut dyn MediaHost, button: Box<dyn ControlButton>) {
    if !host.has_control(button.kind()) {
        host.add_control(button);
    }
}

fn log_invalid_projection(name: &str) {
    log::error!(
        "unknown projection {name:?}, please pass a valid projection: {}",
        VALID_PROJECTIONS.join(", ")
    );
}
