// main.rs — 穹顶/平面投影查看器: 窗口、事件循环、控制面板与状态栏

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // 在 Release 模式下隐藏控制台窗口

mod camera;
mod config;
mod error;
mod fusion;
mod gesture;
mod i18n;
mod material;
mod mesh;
mod orbit;
mod projection;
mod renderer;
mod reset;
mod runtime;
mod sensor;

use config::{CliArgs, ViewerConfig};
use error::ViewerError;
use fusion::SensorMailbox;
use gesture::{wheel_delta_pixels, GestureSource, TouchOutcome, TouchTracker};
use projection::{ProjectionMode, SceneInputs};
use renderer::Renderer;
use runtime::{DomeScene, FrameState};

use glam::Vec2;
use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, Window, WindowBuilder},
};

use image::io::Reader as ImageReader;
use image::GenericImageView;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// The collaborator UI: owns the inputs pushed into the scene each frame.
struct ControlPanel {
    inputs: SceneInputs,
    show_fps: bool,
    vsync: bool,
    fullscreen: bool,
    lang: String,
    is_loading: bool,
}

impl ControlPanel {
    fn new(config: &ViewerConfig, lang: String) -> Self {
        Self {
            inputs: SceneInputs {
                mode: config.scene.mode,
                dome_tilt: config.scene.dome_tilt.clamp(-90, 90),
                motion_enabled: config.scene.motion_enabled,
                ..SceneInputs::default()
            },
            show_fps: false,
            vsync: config.display.vsync,
            fullscreen: false,
            lang,
            is_loading: false,
        }
    }

    fn request_reset(&mut self) {
        self.inputs.reset_signal += 1;
    }

    fn toggle_fullscreen(&mut self, window: &Window) {
        self.fullscreen = !self.fullscreen;
        if self.fullscreen {
            window.set_fullscreen(Some(Fullscreen::Borderless(None)));
        } else {
            window.set_fullscreen(None);
        }
    }
}

/// Actions the UI asks for that need the renderer or the loader.
#[derive(Default)]
struct UiRequests {
    open_image: Option<PathBuf>,
    clear_frame: bool,
    exit: bool,
}

/// Read-only state shown in the panel and the status bar.
struct StatusView<'a> {
    frame: &'a FrameState,
    scene: &'a DomeScene,
    mailbox: &'a SensorMailbox,
    fps: f32,
}

struct FpsCounter {
    last: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            last: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    fn frame(&mut self) {
        self.frames += 1;
        let elapsed = self.last.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            self.fps = self.frames as f32 / elapsed;
            self.frames = 0;
            self.last = Instant::now();
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), ViewerError> {
    let args = CliArgs::from_env();
    let config = ViewerConfig::resolve(args.config.as_deref())?;

    let lang = i18n::resolve_lang(args.lang.as_deref(), &config.display.lang);
    i18n::init(lang.clone());

    let event_loop = EventLoop::new();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(i18n::tr("app.title"))
            .with_inner_size(LogicalSize::new(1280, 720))
            .build(&event_loop)?,
    );

    let mut renderer = pollster::block_on(Renderer::new(window.clone(), config.display.vsync))?;

    let mailbox = SensorMailbox::new();
    if args.sensor_stdin {
        sensor::spawn_stdin_sensor(mailbox.clone())?;
        log::info!("{}", i18n::tr("log.sensor_stdin"));
    }

    let mut panel = ControlPanel::new(&config, lang);
    let mut scene = DomeScene::new(
        panel.inputs,
        config.geometry.clone(),
        &config.controls,
        mailbox.clone(),
    );
    let wheel_line_pixels = config.controls.wheel_line_pixels;

    // 交互状态
    let mut mouse_pressed = false;
    let mut last_mouse_pos: Option<PhysicalPosition<f64>> = None;
    let mut touches = TouchTracker::default();
    let mut fps = FpsCounter::new();

    // 异步加载通道
    let (tx, rx): (Sender<image::RgbaImage>, Receiver<image::RgbaImage>) = channel();
    if let Some(path) = args.image {
        panel.is_loading = true;
        start_load_image(path, tx.clone());
    }

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        // 检查是否有新加载的图片
        if let Ok(rgba) = rx.try_recv() {
            renderer.upload_frame(rgba);
            panel.is_loading = false;
        }

        match event {
            Event::WindowEvent { event, .. } => {
                // 先让 egui 处理事件
                let response = renderer.egui_state.on_event(&renderer.egui_ctx, &event);

                // 触摸抬起即使被 egui 吃掉也要交给 TouchTracker
                if let WindowEvent::Touch(touch) = &event {
                    let position = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                    let outcome = touches.route(
                        touch.id,
                        touch.phase,
                        position,
                        response.consumed,
                        scene.runtime_mut(),
                    );
                    if let TouchOutcome::Drag(delta) = outcome {
                        scene.on_drag(delta);
                    }
                    return;
                }

                if response.consumed {
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => {
                        *control_flow = ControlFlow::Exit;
                    }

                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                    }

                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        renderer.resize(*new_inner_size);
                    }

                    // 键盘快捷键
                    WindowEvent::KeyboardInput { input, .. } => {
                        if input.state != ElementState::Pressed {
                            return;
                        }
                        match input.virtual_keycode {
                            Some(VirtualKeyCode::O) => {
                                if let Some(path) = pick_image() {
                                    panel.is_loading = true;
                                    start_load_image(path, tx.clone());
                                }
                            }
                            Some(VirtualKeyCode::F11) => panel.toggle_fullscreen(&window),
                            Some(VirtualKeyCode::R) => panel.request_reset(),
                            Some(VirtualKeyCode::M) => {
                                panel.inputs.motion_enabled = !panel.inputs.motion_enabled;
                            }
                            Some(VirtualKeyCode::P) => {
                                panel.inputs.mode = panel.inputs.mode.toggled();
                            }
                            Some(VirtualKeyCode::Delete) => renderer.clear_frame(),
                            _ => {}
                        }
                    }

                    // 鼠标交互
                    WindowEvent::MouseInput { state, button, .. } => {
                        if button == MouseButton::Left {
                            mouse_pressed = state == ElementState::Pressed;
                            if !mouse_pressed {
                                last_mouse_pos = None;
                            }
                        }
                    }

                    WindowEvent::CursorMoved { position, .. } => {
                        if mouse_pressed {
                            if let Some(last_pos) = last_mouse_pos {
                                let dx = (position.x - last_pos.x) as f32;
                                let dy = (position.y - last_pos.y) as f32;
                                scene.on_drag(Vec2::new(dx, dy));
                            }
                            last_mouse_pos = Some(position);
                        }
                    }

                    WindowEvent::MouseWheel { delta, .. } => {
                        scene
                            .runtime_mut()
                            .on_zoom_delta(wheel_delta_pixels(&delta, wheel_line_pixels));
                    }

                    WindowEvent::DroppedFile(path) => {
                        panel.is_loading = true;
                        start_load_image(path, tx.clone());
                    }

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => {
                fps.frame();

                panel.inputs.has_frame_source = renderer.has_frame();
                scene.apply_inputs(panel.inputs);
                renderer.sync_surface_mesh(scene.mesh(), scene.mesh_generation());
                renderer.set_vsync(panel.vsync);

                let frame = scene.render_tick();

                let mut requests = UiRequests::default();
                let status = StatusView {
                    frame: &frame,
                    scene: &scene,
                    mailbox: &mailbox,
                    fps: fps.fps,
                };
                let render_result = renderer.render_with_ui(&window, &frame, |ctx| {
                    draw_ui(ctx, &mut panel, &mut requests, &status, &window);
                });

                if let Some(path) = requests.open_image {
                    panel.is_loading = true;
                    start_load_image(path, tx.clone());
                }
                if requests.clear_frame {
                    renderer.clear_frame();
                }
                if requests.exit {
                    *control_flow = ControlFlow::Exit;
                }

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => *control_flow = ControlFlow::Exit,
                    Err(e) => log::error!("render error: {e:?}"),
                }
            }

            Event::MainEventsCleared => {
                window.request_redraw();
            }

            _ => {}
        }
    })
}

fn pick_image() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter(i18n::tr("file.filter.images"), &IMAGE_EXTENSIONS)
        .pick_file()
}

fn decode_image(path: &Path) -> Result<image::RgbaImage, ViewerError> {
    let reader = BufReader::new(File::open(path)?);
    let mut reader = ImageReader::new(reader).with_guessed_format()?;
    reader.no_limits();
    let img = reader.decode()?;

    let (w, h) = img.dimensions();
    log::info!(
        "{}",
        i18n::tr_with("log.image_loaded_size", &[("w", w.to_string()), ("h", h.to_string())])
    );
    Ok(img.to_rgba8())
}

fn start_load_image(path: PathBuf, tx: Sender<image::RgbaImage>) {
    thread::spawn(move || {
        log::info!(
            "{}",
            i18n::tr_with("log.loading_image_bg", &[("path", path.display().to_string())])
        );

        match decode_image(&path) {
            Ok(rgba) => {
                if tx.send(rgba).is_err() {
                    log::error!("{}", i18n::tr("error.send_to_main_failed"));
                }
            }
            Err(e) => log::error!(
                "{}",
                i18n::tr_with("error.load_image", &[("err", e.to_string())])
            ),
        }
    });
}

fn mode_label(mode: ProjectionMode) -> String {
    match mode {
        ProjectionMode::Dome => i18n::tr("mode.dome"),
        ProjectionMode::Flat => i18n::tr("mode.flat"),
    }
}

fn draw_ui(
    ctx: &egui::Context,
    panel: &mut ControlPanel,
    requests: &mut UiRequests,
    status: &StatusView,
    window: &Window,
) {
    let frame = status.frame;

    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            // File
            ui.menu_button(i18n::tr("menu.file"), |ui| {
                if ui.button(i18n::tr("menu.open_image")).clicked() {
                    ui.close_menu();
                    requests.open_image = pick_image();
                }
                if ui.button(i18n::tr("menu.clear_frame")).clicked() {
                    requests.clear_frame = true;
                    ui.close_menu();
                }
                ui.separator();
                if ui.button(i18n::tr("menu.exit")).clicked() {
                    requests.exit = true;
                }
            });

            // View
            ui.menu_button(i18n::tr("menu.view"), |ui| {
                let fullscreen_label = if panel.fullscreen {
                    i18n::tr("view.fullscreen.exit")
                } else {
                    i18n::tr("view.fullscreen.enter")
                };
                if ui.button(fullscreen_label).clicked() {
                    panel.toggle_fullscreen(window);
                    ui.close_menu();
                }

                ui.separator();
                if ui.checkbox(&mut panel.show_fps, i18n::tr("view.show_fps")).clicked() {
                    ui.close_menu();
                }
                ui.checkbox(&mut panel.vsync, i18n::tr("view.enable_vsync"));
            });

            // Language
            ui.menu_button(i18n::tr("menu.language"), |ui| {
                for (code, name) in i18n::LANGUAGES {
                    if ui.radio_value(&mut panel.lang, code.to_string(), name).clicked() {
                        i18n::init(panel.lang.clone());
                        window.set_title(&i18n::tr("app.title"));
                        ui.close_menu();
                    }
                }
            });
        });
    });

    egui::SidePanel::left("controls")
        .resizable(false)
        .show(ctx, |ui| {
            ui.heading(i18n::tr("panel.projection"));
            for mode in [ProjectionMode::Dome, ProjectionMode::Flat] {
                ui.radio_value(&mut panel.inputs.mode, mode, mode_label(mode));
            }

            ui.separator();
            ui.add_enabled(
                panel.inputs.mode == ProjectionMode::Dome,
                egui::Slider::new(&mut panel.inputs.dome_tilt, -90..=90)
                    .text(i18n::tr("panel.tilt"))
                    .suffix("°"),
            );

            ui.separator();
            ui.checkbox(&mut panel.inputs.motion_enabled, i18n::tr("panel.motion"));
            if ui.button(i18n::tr("panel.reset")).clicked() {
                panel.request_reset();
            }

            ui.separator();
            if ui.button(i18n::tr("menu.open_image")).clicked() {
                requests.open_image = pick_image();
            }
            let has_frame = frame.material.kind == material::MaterialKind::VideoTexture;
            if ui
                .add_enabled(has_frame, egui::Button::new(i18n::tr("menu.clear_frame")))
                .clicked()
            {
                requests.clear_frame = true;
            }
        });

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if panel.is_loading {
                ui.label(
                    egui::RichText::new(i18n::tr("status.loading_image"))
                        .color(egui::Color32::YELLOW),
                );
                ui.label("|");
            }

            ui.label(i18n::tr_with("status.mode", &[("mode", mode_label(frame.mode))]));
            ui.label("|");
            ui.label(i18n::tr_with(
                "status.fov",
                &[("fov", format!("{:.1}", frame.pose.fov()))],
            ));

            if frame.mode == ProjectionMode::Dome {
                ui.label("|");
                ui.label(i18n::tr_with(
                    "status.tilt",
                    &[("tilt", status.scene.inputs().dome_tilt.to_string())],
                ));
            }

            let (yaw, pitch, _) = frame.pose.orientation.to_euler(glam::EulerRot::YXZ);
            ui.label("|");
            ui.label(i18n::tr_with(
                "status.yaw",
                &[("yaw", format!("{:.1}", yaw.to_degrees()))],
            ));
            ui.label("|");
            ui.label(i18n::tr_with(
                "status.pitch",
                &[("pitch", format!("{:.1}", pitch.to_degrees()))],
            ));

            ui.label("|");
            let control = match (status.mailbox.is_attached(), status.mailbox.latest()) {
                (false, _) => i18n::tr("status.control.orbit"),
                (true, Some(_)) => i18n::tr("status.control.motion"),
                (true, None) => i18n::tr("status.control.waiting"),
            };
            ui.label(control);

            if panel.show_fps {
                ui.label("|");
                ui.label(
                    egui::RichText::new(format!("FPS: {:.1}", status.fps))
                        .color(egui::Color32::GREEN),
                );
            }
        });
    });
}
