// main.rs — desktop 360 player: winit window, wgpu renderer, egui menu and status bar

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide the console in release builds

mod media;
mod renderer;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use clap::Parser;
use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, Window, WindowBuilder},
};

use media::{DesktopDevices, DesktopHost, HostEvent, WindowScheduler};
use renderer::Renderer;
use vr_player::buttons::{ButtonAction, ButtonKind};
use vr_player::controls::{PointerButton, PointerEvent, StrategyKind};
use vr_player::error::RenderError;
use vr_player::host::{MediaHost, ReadyState};
use vr_player::render_loop::{OutputPath, RenderBackend, TickOutcome};
use vr_player::{Args, PlayerContext, Projection, VrError, VrOptions, VrPlayer};

const MEDIA_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Menu order.
const PROJECTIONS: [Projection; 11] = [
    Projection::Auto,
    Projection::Equirect,
    Projection::EquirectStereoLr,
    Projection::EquirectStereoTb,
    Projection::Cube,
    Projection::Eac,
    Projection::EacStereoLr,
    Projection::HalfEquirectMono,
    Projection::HalfEquirectStereoLr,
    Projection::HalfEquirectStereoTb,
    Projection::None,
];

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut options = match &args.config {
        Some(path) => VrOptions::load(path).with_context(|| format!("reading {}", path.display()))?,
        None => VrOptions::default(),
    };
    options.apply_args(&args);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(options.log_filter())).init();

    let event_loop = EventLoop::new();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("VR Player")
            .with_inner_size(LogicalSize::new(1280, 720))
            .build(&event_loop)
            .context("creating the window")?,
    );

    let renderer = pollster::block_on(Renderer::new(window.clone()))?;
    let size = renderer.size;
    let mut app = App {
        player: VrPlayer::new(options),
        host: DesktopHost::new((size.width, size.height), args.source_projection.clone()),
        renderer,
        devices: DesktopDevices,
        scheduler: WindowScheduler::default(),
        fps: args.fps,
        cursor: PhysicalPosition::new(0.0, 0.0),
        is_fullscreen: false,
        show_fps: false,
        status: None,
        frame_stats: FrameStats::new(),
        last_tick: Instant::now(),
    };
    if let Some(path) = args.media.clone() {
        app.open(path);
    }

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        match event {
            Event::WindowEvent { event, .. } => {
                // egui sees every event first
                let response = app.renderer.egui_state.on_event(&app.renderer.egui_ctx, &event);
                if response.consumed {
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => {
                        let (player, mut ctx) = app.split();
                        player.dispose(&mut ctx);
                        *control_flow = ControlFlow::Exit;
                    }

                    WindowEvent::Resized(new_size) => app.resize(new_size.width, new_size.height),

                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        app.resize(new_inner_size.width, new_inner_size.height)
                    }

                    WindowEvent::KeyboardInput { input, .. } => {
                        if input.state == ElementState::Pressed {
                            if let Some(key) = input.virtual_keycode {
                                app.handle_key(key, &window);
                            }
                        }
                    }

                    WindowEvent::CursorMoved { position, .. } => {
                        app.cursor = position;
                        app.pointer(PointerEvent::Move {
                            x: position.x as f32,
                            y: position.y as f32,
                        });
                    }

                    WindowEvent::MouseInput { state, button, .. } => {
                        let button = match button {
                            MouseButton::Left => PointerButton::Primary,
                            MouseButton::Right => PointerButton::Secondary,
                            MouseButton::Middle => PointerButton::Middle,
                            MouseButton::Other(_) => return,
                        };
                        let (x, y) = (app.cursor.x as f32, app.cursor.y as f32);
                        app.pointer(match state {
                            ElementState::Pressed => PointerEvent::Down { button, x, y },
                            ElementState::Released => PointerEvent::Up { button, x, y },
                        });
                    }

                    WindowEvent::MouseWheel { delta, .. } => {
                        let scroll = match delta {
                            MouseScrollDelta::LineDelta(_, y) => y,
                            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 20.0,
                        };
                        app.pointer(PointerEvent::Wheel { delta: scroll });
                    }

                    WindowEvent::DroppedFile(path) => app.open(path),

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => match app.redraw(&window) {
                Ok(()) => {}
                Err(RenderError::SurfaceLost) => app.renderer.recover_surface(),
                Err(RenderError::OutOfMemory) => {
                    log::error!("out of GPU memory, exiting");
                    *control_flow = ControlFlow::Exit;
                }
                Err(err) => log::warn!("render error: {err}"),
            },

            Event::MainEventsCleared => {
                window.request_redraw();
            }

            _ => {}
        }
    })
}

struct App {
    player: VrPlayer,
    host: DesktopHost,
    renderer: Renderer,
    devices: DesktopDevices,
    scheduler: WindowScheduler,
    fps: f32,
    cursor: PhysicalPosition<f64>,
    is_fullscreen: bool,
    show_fps: bool,
    /// Last load problem, shown in the status bar.
    status: Option<String>,
    frame_stats: FrameStats,
    last_tick: Instant,
}

impl App {
    fn split(&mut self) -> (&mut VrPlayer, PlayerContext<'_>) {
        (
            &mut self.player,
            PlayerContext {
                host: &mut self.host,
                backend: &mut self.renderer,
                devices: &self.devices,
                scheduler: &mut self.scheduler,
            },
        )
    }

    fn open(&mut self, path: PathBuf) {
        self.status = None;
        let max_dimension = self.renderer.max_texture_dimension();
        self.host.open(path, self.fps, max_dimension);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.host.set_player_size(width, height);
        self.renderer.resize(width, height);
        let (player, mut ctx) = self.split();
        player.on_window_resize(&mut ctx);
    }

    fn pointer(&mut self, event: PointerEvent) {
        let (player, mut ctx) = self.split();
        player.handle_pointer(&event, &mut ctx);
    }

    fn handle_key(&mut self, key: VirtualKeyCode, window: &Window) {
        match key {
            VirtualKeyCode::O => {
                if let Some(path) = pick_media() {
                    self.open(path);
                }
            }
            VirtualKeyCode::F11 => self.toggle_fullscreen(window),
            VirtualKeyCode::Space => {
                let (player, mut ctx) = self.split();
                player.toggle_play(&mut ctx);
            }
            VirtualKeyCode::C => self.apply_button(ButtonAction::ActivateDisplay),
            VirtualKeyCode::V => self.apply_button(ButtonAction::EnterImmersive),
            VirtualKeyCode::Escape => {
                let (player, mut ctx) = self.split();
                if player.is_immersive() {
                    player.exit_immersive(&mut ctx);
                } else {
                    player.deactivate_display(&mut ctx);
                }
            }
            _ => {}
        }
    }

    fn toggle_fullscreen(&mut self, window: &Window) {
        self.is_fullscreen = !self.is_fullscreen;
        if self.is_fullscreen {
            window.set_fullscreen(Some(Fullscreen::Borderless(None)));
        } else {
            window.set_fullscreen(None);
        }
        let (player, mut ctx) = self.split();
        player.on_fullscreen_change(&mut ctx);
    }

    fn apply_button(&mut self, action: ButtonAction) {
        let (player, mut ctx) = self.split();
        player.apply_button(action, &mut ctx);
    }

    fn set_projection(&mut self, projection: Projection) {
        if self.player.set_projection(projection.as_str()).is_err() {
            return;
        }
        if self.host.ready_state() < ReadyState::Metadata {
            return;
        }
        let (player, mut ctx) = self.split();
        if let Err(err) = player.init(&mut ctx) {
            log::debug!("reinit with {projection}: {err}");
        }
    }

    fn poll_media(&mut self) {
        while let Some(event) = self.host.poll_loader() {
            match event {
                HostEvent::LoadedMetadata => {
                    let (player, mut ctx) = self.split();
                    if let Err(err) = player.on_loaded_metadata(&mut ctx) {
                        log::debug!("3D unavailable for this media: {err}");
                    }
                }
                HostEvent::LoadFailed(reason) => {
                    log::error!("{reason}");
                    self.status = Some(reason);
                }
            }
        }
    }

    fn redraw(&mut self, window: &Window) -> Result<(), RenderError> {
        let now = Instant::now();
        self.host.advance(now.duration_since(self.last_tick).as_secs_f64());
        self.last_tick = now;
        self.frame_stats.record(now);

        self.poll_media();

        if self.scheduler.take_due().is_some() {
            let (player, mut ctx) = self.split();
            if let TickOutcome::Failed(err) = player.tick(&mut ctx) {
                log::warn!("3D stopped: {err}");
            }
        } else if self.host.is_video_visible() {
            // the flat video still needs fresh frames
            if let Some(frame) = self.host.current_frame() {
                if let Err(err) = self.renderer.upload_frame(&frame) {
                    log::trace!("flat frame skipped: {err}");
                }
            }
        }

        let view = self.ui_view();
        let mut commands = Vec::new();
        self.renderer
            .render_with_ui(window, |ctx| draw_ui(ctx, &view, &mut commands))?;

        for command in commands {
            self.run(command, window);
        }
        Ok(())
    }

    fn ui_view(&self) -> UiView {
        let state = self.player.state();
        UiView {
            media: self.host.media_path().map(|p| p.display().to_string()),
            loading: self.host.is_loading(),
            paused: self.host.paused(),
            projection: state.current_projection,
            selected: state.default_projection,
            strategy: self.player.strategy(),
            output: self.player.output_path(),
            buttons: self.host.controls().map(|b| (b.kind(), b.build_label())).collect(),
            errors: self.host.errors().to_vec(),
            status: self.status.clone(),
            fps: self.frame_stats.fps,
            show_fps: self.show_fps,
            is_fullscreen: self.is_fullscreen,
        }
    }

    fn run(&mut self, command: UiCommand, window: &Window) {
        match command {
            UiCommand::Open(path) => self.open(path),
            UiCommand::Exit => {
                let (player, mut ctx) = self.split();
                player.dispose(&mut ctx);
                std::process::exit(0);
            }
            UiCommand::SetProjection(projection) => self.set_projection(projection),
            UiCommand::ToggleFullscreen => self.toggle_fullscreen(window),
            UiCommand::ToggleFps => self.show_fps = !self.show_fps,
            UiCommand::Button(kind) => {
                if let Some(action) = self.host.activate(kind) {
                    self.apply_button(action);
                }
            }
            UiCommand::DismissErrors => self.host.dismiss_errors(),
        }
    }
}

struct FrameStats {
    since: Instant,
    frames: u32,
    fps: f32,
}

impl FrameStats {
    fn new() -> Self {
        Self {
            since: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    fn record(&mut self, now: Instant) {
        self.frames += 1;
        let elapsed = now.duration_since(self.since).as_secs_f32();
        if elapsed >= 1.0 {
            self.fps = self.frames as f32 / elapsed;
            self.frames = 0;
            self.since = now;
        }
    }
}

/// Everything the UI shows, captured before the frame so drawing borrows nothing.
struct UiView {
    media: Option<String>,
    loading: bool,
    paused: bool,
    projection: Projection,
    selected: Projection,
    strategy: Option<StrategyKind>,
    output: Option<OutputPath>,
    buttons: Vec<(ButtonKind, String)>,
    errors: Vec<VrError>,
    status: Option<String>,
    fps: f32,
    show_fps: bool,
    is_fullscreen: bool,
}

enum UiCommand {
    Open(PathBuf),
    Exit,
    SetProjection(Projection),
    ToggleFullscreen,
    ToggleFps,
    Button(ButtonKind),
    DismissErrors,
}

fn pick_media() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("Images", &MEDIA_EXTENSIONS)
        .pick_file()
}

fn draw_ui(ctx: &egui::Context, view: &UiView, commands: &mut Vec<UiCommand>) {
    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open image…").clicked() {
                    ui.close_menu();
                    if let Some(path) = pick_media() {
                        commands.push(UiCommand::Open(path));
                    }
                }
                if ui.button("Open frame folder…").clicked() {
                    ui.close_menu();
                    if let Some(path) = rfd::FileDialog::new().pick_folder() {
                        commands.push(UiCommand::Open(path));
                    }
                }
                if ui.button("Exit").clicked() {
                    commands.push(UiCommand::Exit);
                }
            });

            ui.menu_button("View", |ui| {
                let label = if view.is_fullscreen { "Exit fullscreen" } else { "Fullscreen" };
                if ui.button(label).clicked() {
                    commands.push(UiCommand::ToggleFullscreen);
                    ui.close_menu();
                }
                let mut show_fps = view.show_fps;
                if ui.checkbox(&mut show_fps, "Show FPS").clicked() {
                    commands.push(UiCommand::ToggleFps);
                    ui.close_menu();
                }
            });

            ui.menu_button("Projection", |ui| {
                for projection in PROJECTIONS {
                    if ui.radio(view.selected == projection, projection.as_str()).clicked() {
                        commands.push(UiCommand::SetProjection(projection));
                        ui.close_menu();
                    }
                }
            });
        });
    });

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            for (kind, label) in &view.buttons {
                if ui.button(label).clicked() {
                    commands.push(UiCommand::Button(*kind));
                }
            }
            if !view.buttons.is_empty() {
                ui.separator();
            }

            if view.loading {
                ui.label(egui::RichText::new("Loading…").color(egui::Color32::YELLOW));
                ui.label("|");
            }
            if let Some(status) = &view.status {
                ui.label(egui::RichText::new(status).color(egui::Color32::RED));
                ui.label("|");
            }

            ui.label(view.media.as_deref().unwrap_or("No media"));
            ui.label("|");
            ui.label(if view.paused { "Paused" } else { "Playing" });
            ui.label("|");
            ui.label(format!("Projection: {}", view.projection));
            if let Some(strategy) = view.strategy {
                ui.label("|");
                ui.label(format!("Controls: {strategy:?}"));
            }
            if let Some(output) = view.output {
                ui.label("|");
                ui.label(format!("Output: {output:?}"));
            }

            if view.show_fps {
                ui.label("|");
                ui.label(egui::RichText::new(format!("FPS: {:.1}", view.fps)).color(egui::Color32::GREEN));
            }
        });
    });

    if let Some(error) = view.errors.first() {
        egui::Window::new(error.headline())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label(error.message());
                ui.label(egui::RichText::new(error.code()).weak().small());
                if ui.button("Dismiss").clicked() {
                    commands.push(UiCommand::DismissErrors);
                }
            });
    }
}
