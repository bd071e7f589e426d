#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Mat3;
use vr_player::ambisonic::AmbisonicDecoder;
use vr_player::buttons::{BigPlayButton, ButtonKind, ControlButton};
use vr_player::camera::EyeView;
use vr_player::capability::{
    ControllerState, DeviceApis, DisplayHandle, Permission, Pose, ProbeFuture, VrDisplay, XrSession,
};
use vr_player::config::OmnitoneOptions;
use vr_player::controls::ShuttleSphere;
use vr_player::error::{AmbisonicError, ProbeError, RenderError, VrError};
use vr_player::host::{GamepadSnapshot, MediaHost, ReadyState, VideoFrame};
use vr_player::mesh::ScreenMesh;
use vr_player::render_loop::{FrameHandle, FrameScheduler, FrameSource, RenderBackend};
use vr_player::PlayerContext;

#[derive(Debug)]
pub struct MockHost {
    pub player_size: (u32, u32),
    pub video_size: (u32, u32),
    pub ready: ReadyState,
    pub hint: Option<String>,
    pub paused: bool,
    pub video_visible: bool,
    pub mobile: bool,
    pub recycled: bool,
    pub errors: Vec<VrError>,
    pub controls: Vec<Box<dyn ControlButton>>,
    pub gamepads: Vec<Option<GamepadSnapshot>>,
    pub frame: Vec<u8>,
    /// Handed to the player once, on the first `ambisonic_decoder` call.
    pub decoder: Option<FakeDecoder>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self {
            player_size: (1280, 720),
            video_size: (4, 2),
            ready: ReadyState::EnoughData,
            hint: None,
            paused: true,
            video_visible: true,
            mobile: false,
            recycled: false,
            errors: Vec::new(),
            controls: vec![Box::new(BigPlayButton)],
            gamepads: Vec::new(),
            frame: vec![128; 4 * 2 * 4],
            decoder: None,
        }
    }
}

impl MockHost {
    pub fn kinds(&self) -> Vec<ButtonKind> {
        self.controls.iter().map(|b| b.kind()).collect()
    }
}

impl MediaHost for MockHost {
    fn player_size(&self) -> (u32, u32) {
        self.player_size
    }

    fn video_size(&self) -> (u32, u32) {
        self.video_size
    }

    fn ready_state(&self) -> ReadyState {
        self.ready
    }

    fn current_frame(&self) -> Option<VideoFrame<'_>> {
        Some(VideoFrame {
            width: self.video_size.0,
            height: self.video_size.1,
            rgba: &self.frame,
        })
    }

    fn projection_hint(&self) -> Option<String> {
        self.hint.clone()
    }

    fn paused(&self) -> bool {
        self.paused
    }

    fn play(&mut self) {
        self.paused = false;
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn is_mobile(&self) -> bool {
        self.mobile
    }

    fn video_element_recycled(&self) -> bool {
        self.recycled
    }

    fn set_video_visible(&mut self, visible: bool) {
        self.video_visible = visible;
    }

    fn show_error(&mut self, error: VrError) {
        self.errors.push(error);
    }

    fn add_control(&mut self, button: Box<dyn ControlButton>) {
        self.controls.push(button);
    }

    fn remove_control(&mut self, kind: ButtonKind) -> Option<Box<dyn ControlButton>> {
        let index = self.controls.iter().position(|b| b.kind() == kind)?;
        Some(self.controls.remove(index))
    }

    fn has_control(&self, kind: ButtonKind) -> bool {
        self.controls.iter().any(|b| b.kind() == kind)
    }

    fn gamepads(&self) -> Vec<Option<GamepadSnapshot>> {
        self.gamepads.clone()
    }

    fn ambisonic_decoder(&mut self) -> Option<Box<dyn AmbisonicDecoder>> {
        self.decoder
            .take()
            .map(|decoder| Box::new(decoder) as Box<dyn AmbisonicDecoder>)
    }
}

#[derive(Debug, Default)]
pub struct DecoderLog {
    pub rotations: usize,
    pub resumed: bool,
    pub bypassed: bool,
}

#[derive(Debug, Default)]
pub struct FakeDecoder {
    pub suspended: bool,
    pub log: Rc<RefCell<DecoderLog>>,
}

impl AmbisonicDecoder for FakeDecoder {
    fn initialize(&mut self, _options: &OmnitoneOptions) -> Result<(), AmbisonicError> {
        Ok(())
    }

    fn set_rotation(&mut self, _rotation: Mat3) {
        self.log.borrow_mut().rotations += 1;
    }

    fn bypass(&mut self) {
        self.log.borrow_mut().bypassed = true;
    }

    fn is_suspended(&self) -> bool {
        self.suspended
    }

    fn resume(&mut self) {
        self.suspended = false;
        self.log.borrow_mut().resumed = true;
    }
}

#[derive(Debug, Default)]
pub struct MockBackend {
    pub fail_attach: bool,
    pub block_uploads: bool,
    pub attached_meshes: usize,
    pub attach_calls: usize,
    pub detach_calls: usize,
    pub uploads: usize,
    pub resizes: Vec<(u32, u32)>,
    pub drawn_views: Vec<usize>,
    pub drawn_shuttles: Vec<Vec<ShuttleSphere>>,
}

impl RenderBackend for MockBackend {
    fn attach(&mut self, meshes: &[ScreenMesh]) -> Result<(), RenderError> {
        self.attach_calls += 1;
        if self.fail_attach {
            return Err(RenderError::Backend("no GPU".into()));
        }
        self.attached_meshes = meshes.len();
        Ok(())
    }

    fn detach(&mut self) {
        self.detach_calls += 1;
        self.attached_meshes = 0;
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.resizes.push((width, height));
    }

    fn upload_frame(&mut self, _frame: &VideoFrame<'_>) -> Result<(), RenderError> {
        if self.block_uploads {
            return Err(RenderError::TextureBlocked("cross-origin".into()));
        }
        self.uploads += 1;
        Ok(())
    }

    fn draw(&mut self, views: &[EyeView], shuttle: &[ShuttleSphere]) -> Result<(), RenderError> {
        self.drawn_views.push(views.len());
        self.drawn_shuttles.push(shuttle.to_vec());
        Ok(())
    }
}

#[derive(Debug)]
pub struct FakeXr {
    pub active: bool,
    pub controllers: Rc<RefCell<Vec<ControllerState>>>,
}

impl XrSession for FakeXr {
    fn head_pose(&self) -> Option<Pose> {
        Some(Pose::default())
    }

    fn controllers(&self) -> Vec<ControllerState> {
        self.controllers.borrow().clone()
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn end(&mut self) {
        self.active = false;
    }
}

pub struct MockDevices {
    pub xr_supported: bool,
    pub xr_session_available: bool,
    /// Controllers of every session this mock hands out.
    pub xr_controllers: Rc<RefCell<Vec<ControllerState>>>,
    pub displays: Vec<DisplayHandle>,
    pub outdated: bool,
    /// Make the immersive support probe fail instead of answering.
    pub xr_probe_error: bool,
    /// Make display enumeration fail instead of answering.
    pub display_probe_error: bool,
    pub orientation_sensor: bool,
    pub permission: Result<Permission, ProbeError>,
    pub permission_requests: Cell<usize>,
}

impl Default for MockDevices {
    fn default() -> Self {
        Self {
            xr_supported: false,
            xr_session_available: false,
            xr_controllers: Rc::default(),
            displays: Vec::new(),
            outdated: false,
            xr_probe_error: false,
            display_probe_error: false,
            orientation_sensor: false,
            permission: Ok(Permission::NotRequired),
            permission_requests: Cell::new(0),
        }
    }
}

impl DeviceApis for MockDevices {
    fn immersive_vr_supported(&self) -> ProbeFuture<'_, bool> {
        Box::pin(async move {
            if self.xr_probe_error {
                Err(ProbeError::Unavailable("xr runtime crashed".into()))
            } else {
                Ok(self.xr_supported)
            }
        })
    }

    fn legacy_displays(&self) -> ProbeFuture<'_, Vec<DisplayHandle>> {
        Box::pin(async move {
            if self.display_probe_error {
                Err(ProbeError::Unavailable("display enumeration failed".into()))
            } else {
                Ok(self.displays.clone())
            }
        })
    }

    fn legacy_api_outdated(&self) -> bool {
        self.outdated
    }

    fn orientation_sensor(&self) -> bool {
        self.orientation_sensor
    }

    fn request_orientation_permission(&self) -> ProbeFuture<'_, Permission> {
        self.permission_requests.set(self.permission_requests.get() + 1);
        let answer = self.permission.clone();
        Box::pin(async move { answer })
    }

    fn request_immersive_session(&self) -> ProbeFuture<'_, Box<dyn XrSession>> {
        Box::pin(async move {
            if self.xr_session_available {
                Ok(Box::new(FakeXr {
                    active: true,
                    controllers: self.xr_controllers.clone(),
                }) as Box<dyn XrSession>)
            } else {
                Err(ProbeError::PermissionDenied)
            }
        })
    }
}

#[derive(Debug, Default)]
pub struct MockScheduler {
    next: u64,
    pub pending: Vec<(FrameHandle, FrameSource)>,
    pub cancelled: Vec<FrameHandle>,
}

impl MockScheduler {
    /// Pop the pending tick, as the host would when it fires.
    pub fn fire(&mut self) -> Option<(FrameHandle, FrameSource)> {
        self.pending.pop()
    }
}

impl FrameScheduler for MockScheduler {
    fn request_frame(&mut self, source: FrameSource) -> FrameHandle {
        self.next += 1;
        let handle = FrameHandle(self.next);
        self.pending.push((handle, source));
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.cancelled.push(handle);
        self.pending.retain(|(pending, _)| *pending != handle);
    }
}

/// A hardware headset: not polyfilled, presents on request.
#[derive(Debug, Default)]
pub struct FakeHeadset {
    presenting: std::cell::Cell<bool>,
}

impl VrDisplay for FakeHeadset {
    fn name(&self) -> String {
        "Test Headset".to_string()
    }

    fn is_polyfilled(&self) -> bool {
        false
    }

    fn orientation(&self) -> Option<glam::Quat> {
        Some(glam::Quat::IDENTITY)
    }

    fn request_present(&self) -> Result<(), ProbeError> {
        self.presenting.set(true);
        Ok(())
    }

    fn exit_present(&self) {
        self.presenting.set(false);
    }

    fn is_presenting(&self) -> bool {
        self.presenting.get()
    }
}

pub fn headset() -> DisplayHandle {
    Rc::new(FakeHeadset::default())
}

#[derive(Default)]
pub struct Harness {
    pub host: MockHost,
    pub backend: MockBackend,
    pub devices: MockDevices,
    pub scheduler: MockScheduler,
}

impl Harness {
    pub fn ctx(&mut self) -> PlayerContext<'_> {
        PlayerContext {
            host: &mut self.host,
            backend: &mut self.backend,
            devices: &self.devices,
            scheduler: &mut self.scheduler,
        }
    }
}
