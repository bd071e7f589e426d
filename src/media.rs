// media.rs — desktop media host: stills and numbered frame sequences played from disk

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TryRecvError};
use std::thread;

use image::io::Reader as ImageReader;
use image::{GenericImageView, RgbaImage};

use vr_player::buttons::{BigPlayButton, ButtonAction, ButtonKind, ControlButton};
use vr_player::capability::{DeviceApis, DisplayHandle, Permission, ProbeFuture, XrSession};
use vr_player::config::MediaInfo;
use vr_player::error::{ProbeError, VrError};
use vr_player::host::{MediaHost, ReadyState, VideoFrame};
use vr_player::render_loop::{FrameHandle, FrameScheduler, FrameSource};

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Decoded frames held by the host, the one under the playhead included.
const MAX_RETAINED_FRAMES: usize = 16;

/// Frames ahead of the playhead that count as "enough".
const BUFFER_AHEAD_FRAMES: usize = 8;

/// Frames the decoder may run ahead of the host before it blocks.
const DECODE_QUEUE: usize = 2;

enum LoadEvent {
    Metadata {
        width: u32,
        height: u32,
        frame_count: usize,
        projection: Option<String>,
    },
    Frame(RgbaImage),
    Finished,
    Failed(String),
}

/// What `DesktopHost::poll_loader` saw, for the event loop to forward.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    LoadedMetadata,
    LoadFailed(String),
}

/// A clip streamed from the decoder. Frames are numbered by decode order,
/// which keeps counting across loops, so `first_seq` only ever grows.
struct Clip {
    path: PathBuf,
    width: u32,
    height: u32,
    frame_count: usize,
    fps: f32,
    /// Window of decoded frames starting at `first_seq`.
    frames: VecDeque<RgbaImage>,
    first_seq: usize,
    finished: bool,
    projection: Option<String>,
}

impl Clip {
    fn new(path: PathBuf, fps: f32) -> Self {
        Self {
            path,
            width: 0,
            height: 0,
            frame_count: 0,
            fps: fps.max(1.0),
            frames: VecDeque::new(),
            first_seq: 0,
            finished: false,
            projection: None,
        }
    }

    fn seq_at(&self, position: f64) -> usize {
        (position * self.fps as f64) as usize
    }

    /// Sequence number of the newest decoded frame.
    fn last_seq(&self) -> Option<usize> {
        (!self.frames.is_empty()).then(|| self.first_seq + self.frames.len() - 1)
    }

    fn frame_at(&self, position: f64) -> Option<&RgbaImage> {
        let last = self.last_seq()?;
        let seq = self.seq_at(position).clamp(self.first_seq, last);
        self.frames.get(seq - self.first_seq)
    }

    /// Drop frames the playhead has passed. The newest frame always stays.
    fn release_behind(&mut self, position: f64) {
        let seq = self.seq_at(position);
        while self.first_seq < seq && self.frames.len() > 1 {
            self.frames.pop_front();
            self.first_seq += 1;
        }
    }
}

pub struct DesktopHost {
    player_size: (u32, u32),
    clip: Option<Clip>,
    loader: Option<Receiver<LoadEvent>>,
    paused: bool,
    /// Playhead in seconds.
    position: f64,
    video_visible: bool,
    controls: Vec<Box<dyn ControlButton>>,
    errors: Vec<VrError>,
    /// Overrides the projection a clip's sidecar names.
    source_projection: Option<String>,
}

impl DesktopHost {
    pub fn new(player_size: (u32, u32), source_projection: Option<String>) -> Self {
        Self {
            player_size,
            clip: None,
            loader: None,
            paused: true,
            position: 0.0,
            video_visible: true,
            controls: vec![Box::new(BigPlayButton)],
            errors: Vec::new(),
            source_projection,
        }
    }

    pub fn set_player_size(&mut self, width: u32, height: u32) {
        self.player_size = (width, height);
    }

    /// Start decoding `path` in the background. Replaces any clip being loaded.
    pub fn open(&mut self, path: PathBuf, fps: f32, max_dimension: u32) {
        let (tx, rx) = sync_channel(DECODE_QUEUE);
        start_load_media(path.clone(), max_dimension, tx);
        self.attach_loader(path, fps, rx);
    }

    fn attach_loader(&mut self, path: PathBuf, fps: f32, rx: Receiver<LoadEvent>) {
        // dropping the old receiver stops the old decoder at its next send
        self.loader = Some(rx);
        self.clip = Some(Clip::new(path, fps));
        self.position = 0.0;
        self.errors.clear();
    }

    /// Drain the loader channel until the frame window is full. Returns at
    /// most one event per call.
    pub fn poll_loader(&mut self) -> Option<HostEvent> {
        loop {
            if self.clip.as_ref()?.frames.len() >= MAX_RETAINED_FRAMES {
                return None;
            }
            let event = match self.loader.as_ref()?.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    self.loader = None;
                    return None;
                }
            };
            let clip = self.clip.as_mut()?;
            match event {
                LoadEvent::Metadata {
                    width,
                    height,
                    frame_count,
                    projection,
                } => {
                    clip.width = width;
                    clip.height = height;
                    clip.frame_count = frame_count;
                    clip.projection = projection;
                    log::info!("{}: {width}x{height}, {frame_count} frame(s)", clip.path.display());
                    return Some(HostEvent::LoadedMetadata);
                }
                LoadEvent::Frame(frame) => clip.frames.push_back(frame),
                LoadEvent::Finished => {
                    clip.finished = true;
                    log::debug!("{} fully decoded", clip.path.display());
                }
                LoadEvent::Failed(reason) => {
                    self.loader = None;
                    return Some(HostEvent::LoadFailed(reason));
                }
            }
        }
    }

    /// True until the first frame of the clip is decoded.
    pub fn is_loading(&self) -> bool {
        self.clip
            .as_ref()
            .is_some_and(|clip| clip.frames.is_empty() && self.loader.is_some())
    }

    pub fn media_path(&self) -> Option<&Path> {
        self.clip.as_ref().map(|clip| clip.path.as_path())
    }

    /// Move the playhead and release the frames it passed. Never runs past
    /// the newest decoded frame, so a slow decoder stalls playback.
    pub fn advance(&mut self, dt_secs: f64) {
        if self.paused {
            return;
        }
        let Some(clip) = self.clip.as_mut() else {
            return;
        };
        let Some(last) = clip.last_seq() else {
            return;
        };
        self.position = (self.position + dt_secs).min(last as f64 / clip.fps as f64);
        clip.release_behind(self.position);
    }

    pub fn is_video_visible(&self) -> bool {
        self.video_visible
    }

    pub fn controls(&self) -> impl Iterator<Item = &dyn ControlButton> {
        self.controls.iter().map(|button| button.as_ref())
    }

    /// Press the registered button of `kind`.
    pub fn activate(&mut self, kind: ButtonKind) -> Option<ButtonAction> {
        self.controls
            .iter_mut()
            .find(|button| button.kind() == kind)
            .map(|button| button.handle_activation())
    }

    pub fn errors(&self) -> &[VrError] {
        &self.errors
    }

    pub fn dismiss_errors(&mut self) {
        self.errors.clear();
    }
}

impl MediaHost for DesktopHost {
    fn player_size(&self) -> (u32, u32) {
        self.player_size
    }

    fn video_size(&self) -> (u32, u32) {
        self.clip.as_ref().map_or((0, 0), |clip| (clip.width, clip.height))
    }

    fn ready_state(&self) -> ReadyState {
        let Some(clip) = self.clip.as_ref() else {
            return ReadyState::Nothing;
        };
        if clip.frame_count == 0 {
            return ReadyState::Nothing;
        }
        let Some(last) = clip.last_seq() else {
            return ReadyState::Metadata;
        };
        if clip.finished || last >= clip.seq_at(self.position) + BUFFER_AHEAD_FRAMES {
            ReadyState::EnoughData
        } else {
            ReadyState::CurrentData
        }
    }

    fn current_frame(&self) -> Option<VideoFrame<'_>> {
        let clip = self.clip.as_ref()?;
        let frame = clip.frame_at(self.position)?;
        Some(VideoFrame {
            width: frame.width(),
            height: frame.height(),
            rgba: frame.as_raw(),
        })
    }

    fn projection_hint(&self) -> Option<String> {
        self.source_projection
            .clone()
            .or_else(|| self.clip.as_ref().and_then(|clip| clip.projection.clone()))
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

    fn set_video_visible(&mut self, visible: bool) {
        self.video_visible = visible;
    }

    fn show_error(&mut self, error: VrError) {
        log::warn!("[{}] {}", error.code(), error.message());
        if !self.errors.contains(&error) {
            self.errors.push(error);
        }
    }

    fn add_control(&mut self, button: Box<dyn ControlButton>) {
        self.controls.push(button);
    }

    fn remove_control(&mut self, kind: ButtonKind) -> Option<Box<dyn ControlButton>> {
        let index = self.controls.iter().position(|button| button.kind() == kind)?;
        Some(self.controls.remove(index))
    }

    fn has_control(&self, kind: ButtonKind) -> bool {
        self.controls.iter().any(|button| button.kind() == kind)
    }
}

/// Desktop runtimes expose no headset APIs and no motion sensor.
#[derive(Debug, Default)]
pub struct DesktopDevices;

impl DeviceApis for DesktopDevices {
    fn immersive_vr_supported(&self) -> ProbeFuture<'_, bool> {
        Box::pin(async { Ok(false) })
    }

    fn legacy_displays(&self) -> ProbeFuture<'_, Vec<DisplayHandle>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn orientation_sensor(&self) -> bool {
        false
    }

    fn request_orientation_permission(&self) -> ProbeFuture<'_, Permission> {
        Box::pin(async { Ok(Permission::NotRequired) })
    }

    fn request_immersive_session(&self) -> ProbeFuture<'_, Box<dyn XrSession>> {
        Box::pin(async { Err(ProbeError::Unavailable("no XR runtime on this platform".into())) })
    }
}

/// Ticks on window redraws. Only one tick is ever pending.
#[derive(Debug, Default)]
pub struct WindowScheduler {
    next_id: u64,
    pending: Option<(FrameHandle, FrameSource)>,
}

impl WindowScheduler {
    /// Consume the pending tick, if any.
    pub fn take_due(&mut self) -> Option<FrameHandle> {
        self.pending.take().map(|(handle, _)| handle)
    }
}

impl FrameScheduler for WindowScheduler {
    fn request_frame(&mut self, source: FrameSource) -> FrameHandle {
        self.next_id += 1;
        let handle = FrameHandle(self.next_id);
        // every source is the window's redraw on desktop
        self.pending = Some((handle, source));
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending.is_some_and(|(pending, _)| pending == handle) {
            self.pending = None;
        }
    }
}

/// Decode `path` on a worker thread. A still is sent once; a frame folder
/// is decoded round and round until the host drops the receiver.
fn start_load_media(path: PathBuf, max_dimension: u32, tx: SyncSender<LoadEvent>) {
    thread::spawn(move || {
        log::info!("loading {} in the background", path.display());

        let files = match frame_files(&path) {
            Ok(files) if !files.is_empty() => files,
            Ok(_) => {
                let _ = tx.send(LoadEvent::Failed(format!("no images in {}", path.display())));
                return;
            }
            Err(err) => {
                let _ = tx.send(LoadEvent::Failed(format!("{}: {err}", path.display())));
                return;
            }
        };

        let projection = MediaInfo::sidecar_for(&path).and_then(|info| info.projection);

        for (seq, file) in files.iter().cycle().enumerate() {
            let frame = match decode_frame(file, max_dimension) {
                Ok(frame) => frame,
                Err(err) => {
                    let _ = tx.send(LoadEvent::Failed(format!("{}: {err}", file.display())));
                    return;
                }
            };
            if seq == 0 {
                let metadata = LoadEvent::Metadata {
                    width: frame.width(),
                    height: frame.height(),
                    frame_count: files.len(),
                    projection: projection.clone(),
                };
                if tx.send(metadata).is_err() {
                    return;
                }
            }
            // the host moved on to another clip
            if tx.send(LoadEvent::Frame(frame)).is_err() {
                return;
            }
            if files.len() == 1 {
                let _ = tx.send(LoadEvent::Finished);
                return;
            }
        }
    });
}

/// A single image, or every image in a directory sorted by name.
fn frame_files(path: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn decode_frame(path: &Path, max_dimension: u32) -> Result<RgbaImage, image::ImageError> {
    let file = File::open(path).map_err(image::ImageError::IoError)?;
    let mut reader = ImageReader::new(BufReader::new(file)).with_guessed_format()?;
    reader.no_limits();
    let img = reader.decode()?;

    // scale down to what the GPU can sample
    let (src_w, src_h) = img.dimensions();
    if src_w > max_dimension || src_h > max_dimension {
        let scale = max_dimension as f32 / src_w.max(src_h) as f32;
        let new_w = ((src_w as f32 * scale) as u32).max(1);
        let new_h = ((src_h as f32 * scale) as u32).max(1);
        log::warn!(
            "{}: {src_w}x{src_h} exceeds the GPU limit of {max_dimension}, scaling to {new_w}x{new_h}",
            path.display()
        );
        return Ok(img
            .resize(new_w, new_h, image::imageops::FilterType::Lanczos3)
            .to_rgba8());
    }
    Ok(img.to_rgba8())
}
