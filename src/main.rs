use orientview::capture::PngSequenceSink;
use orientview::cli::Args;
use orientview::frame_buffer::{BYTES_PER_PIXEL, FrameData, FrameSink};
use orientview::route;
use orientview::{EditMode, FrameTimings, RenderMode, Renderer, Settings, Stabilization};

use anyhow::Context;
use clap::Parser;
use eframe::{egui, glow};
use glam::Vec2;
use image::RgbaImage;
use log::{debug, error, info, warn};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Nominal video frame interval used for the spare time estimate
const VIDEO_FRAME_MS: f64 = 1000.0 / 30.0;

/// Moving test pattern standing in for a video decoder.
struct TestPattern {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl TestPattern {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
        }
    }

    /// Colour bars scrolling horizontally with a bright sweep line.
    fn render(&mut self, time: f64) {
        let (w, h) = (self.width as usize, self.height as usize);
        let shift = (time * 120.0) as usize;
        let sweep = ((time * 0.5).fract() * h as f64) as usize;

        for (y, row) in self.pixels.chunks_exact_mut(w * BYTES_PER_PIXEL).enumerate() {
            for (x, px) in row.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
                let bar = ((x + shift) * 8 / w.max(1)) % 8;
                let shade = (255 - y * 128 / h.max(1)) as u8;
                let [r, g, b] = [bar & 1, (bar >> 1) & 1, (bar >> 2) & 1].map(|c| c as u8 * shade);
                if y.abs_diff(sweep) < 3 {
                    px.copy_from_slice(&[255, 255, 255, 255]);
                } else {
                    px.copy_from_slice(&[r, g, b, 255]);
                }
            }
        }
    }

    fn frame(&self) -> FrameData<'_> {
        FrameData::packed(&self.pixels, self.width, self.height)
    }
}

/// Light grid used when no map image is given
fn generated_map() -> RgbaImage {
    RgbaImage::from_fn(1024, 1024, |x, y| {
        if x % 64 == 0 || y % 64 == 0 {
            image::Rgba([170, 190, 170, 255])
        } else {
            image::Rgba([235, 240, 225, 255])
        }
    })
}

/// Closed loop around the map centre, in map pixels (Y up)
fn generated_route() -> Vec<Vec2> {
    (0..=96)
        .map(|i| {
            let t = i as f32 / 96.0 * std::f32::consts::TAU;
            Vec2::new(300.0 * t.cos(), 200.0 * (2.0 * t).sin())
        })
        .collect()
}

fn load_map(path: Option<&Path>) -> anyhow::Result<RgbaImage> {
    match path {
        Some(path) => {
            let image = image::open(path)
                .with_context(|| format!("Failed to open map image {}", path.display()))?
                .to_rgba8();
            info!("Map image {}: {}x{}", path.display(), image.width(), image.height());
            Ok(image)
        }
        None => Ok(generated_map()),
    }
}

/// GL-side state, touched only from the paint callback.
struct Compositor {
    renderer: Option<Renderer>,
    sink: Option<PngSequenceSink>,
    /// Configured window size, kept for the whole capture
    capture_size: (u32, u32),
    last_encode_ms: f64,
}

/// Renderer size for a viewport. A capture keeps its fixed size and the
/// preview is scaled by `present`.
fn target_size(viewport: (u32, u32), capture_size: Option<(u32, u32)>) -> (u32, u32) {
    capture_size.unwrap_or(viewport)
}

/// Per-frame input handed to the paint callback
struct FrameInput {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    timings: FrameTimings,
    stabilization: Stabilization,
    edit_mode: EditMode,
}

impl Compositor {
    fn paint(&mut self, input: &FrameInput, info: &egui::PaintCallbackInfo, painter: &egui_glow::Painter) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        let viewport = info.viewport_in_pixels();
        let (width, height) = target_size(
            (viewport.width_px.max(1) as u32, viewport.height_px.max(1) as u32),
            self.sink.is_some().then_some(self.capture_size),
        );
        let size = renderer.output_size();
        if (size.width, size.height) != (width, height)
            && let Err(e) = renderer.resize_window(width, height)
        {
            warn!("Resize to {}x{} failed: {}", width, height, e);
            return;
        }

        renderer.start_rendering(&input.timings);
        renderer.upload_frame_data(&FrameData::packed(&input.pixels, input.width, input.height));
        renderer.render_all(&input.stabilization, input.edit_mode);
        renderer.stop_rendering();

        if let Some(sink) = self.sink.as_mut() {
            let started = Instant::now();
            if let Err(e) = sink.consume(renderer.get_rendered_frame()) {
                error!("Capture failed, disabling: {:#}", e);
                self.sink = None;
            }
            self.last_encode_ms = started.elapsed().as_secs_f64() * 1000.0;
        }

        renderer.present(
            painter.intermediate_fbo(),
            [
                viewport.left_px,
                viewport.from_bottom_px,
                viewport.width_px,
                viewport.height_px,
            ],
        );
    }
}

struct OrientViewApp {
    compositor: Arc<Mutex<Compositor>>,
    pattern: TestPattern,
    start_time: Instant,
    last_frame: Instant,
    edit_mode: EditMode,
    wobble: bool,
    render_mode: RenderMode,
}

impl OrientViewApp {
    fn new(
        gl: Arc<glow::Context>,
        args: &Args,
        settings: &Settings,
    ) -> anyhow::Result<Self> {
        let map = load_map(args.map.as_deref())?;
        let route_points = match &args.route {
            Some(path) => route::load_route_points(path)?,
            None => generated_route(),
        };

        let mut renderer = Renderer::new(
            gl,
            (args.video_width, args.video_height),
            &map,
            &route_points,
            settings,
        )?;

        let sink = match &args.capture_dir {
            Some(dir) => {
                // Encoders want top-down rows
                renderer.set_flip_output(true);
                renderer.set_is_encoding(true);
                Some(PngSequenceSink::new(dir, "frame", false)?)
            }
            None => None,
        };

        info!("Shaders available: {}", renderer.shader_names().join(", "));

        Ok(Self {
            compositor: Arc::new(Mutex::new(Compositor {
                renderer: Some(renderer),
                sink,
                capture_size: (settings.window.width, settings.window.height),
                last_encode_ms: 0.0,
            })),
            pattern: TestPattern::new(args.video_width, args.video_height),
            start_time: Instant::now(),
            last_frame: Instant::now(),
            edit_mode: EditMode::None,
            wobble: args.wobble,
            render_mode: RenderMode::default(),
        })
    }

    /// F1 telemetry, F2 render mode, F3 full clear, F4 edit target,
    /// arrows move, +/- scale, Q/E rotate the edit target.
    fn handle_input(&mut self, ctx: &egui::Context) {
        let Ok(mut compositor) = self.compositor.lock() else {
            return;
        };
        let Some(renderer) = compositor.renderer.as_mut() else {
            return;
        };

        ctx.input(|input| {
            if input.key_pressed(egui::Key::F1) {
                renderer.toggle_show_info_panel();
            }
            if input.key_pressed(egui::Key::F2) {
                self.render_mode = self.render_mode.next();
                renderer.set_render_mode(self.render_mode);
            }
            if input.key_pressed(egui::Key::F3) {
                renderer.request_full_clear();
            }
            if input.key_pressed(egui::Key::F4) {
                self.edit_mode = match self.edit_mode {
                    EditMode::None => EditMode::Video,
                    EditMode::Video => EditMode::Map,
                    EditMode::Map => EditMode::MapWidth,
                    EditMode::MapWidth => EditMode::None,
                };
                debug!("Edit target: {}", self.edit_mode.as_str());
            }

            let step = if input.modifiers.shift { 10.0 } else { 1.0 };
            let dx = (input.key_down(egui::Key::ArrowRight) as i32
                - input.key_down(egui::Key::ArrowLeft) as i32) as f64
                * step;
            let dy = (input.key_down(egui::Key::ArrowUp) as i32
                - input.key_down(egui::Key::ArrowDown) as i32) as f64
                * step;
            let zoom = (input.key_down(egui::Key::Plus) as i32
                - input.key_down(egui::Key::Minus) as i32) as f64;
            let turn = (input.key_down(egui::Key::Q) as i32 - input.key_down(egui::Key::E) as i32)
                as f64;

            let panel = match self.edit_mode {
                EditMode::None => None,
                EditMode::Video => Some(renderer.video_panel_mut()),
                EditMode::Map => Some(renderer.map_panel_mut()),
                EditMode::MapWidth => {
                    let map = renderer.map_panel_mut();
                    map.relative_width = (map.relative_width + dx * 0.001).clamp(0.0, 1.0);
                    None
                }
            };
            if let Some(panel) = panel {
                panel.user_x += dx;
                panel.user_y += dy;
                panel.user_angle += turn * step * 0.5;
                panel.user_scale = (panel.user_scale * (1.0 + zoom * 0.01)).max(0.01);
            }
        });
    }
}

impl eframe::App for OrientViewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_input(ctx);

        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame).as_secs_f64() * 1000.0;
        self.last_frame = now;
        let current_time = now.duration_since(self.start_time).as_secs_f64();

        let decode_start = Instant::now();
        self.pattern.render(current_time);
        let decode_time = decode_start.elapsed().as_secs_f64() * 1000.0;

        let stabilization = if self.wobble {
            Stabilization {
                x: 0.02 * (current_time * 0.7).sin(),
                y: 0.015 * (current_time * 1.1).cos(),
                angle: 2.0 * (current_time * 0.4).sin(),
            }
        } else {
            Stabilization::default()
        };

        let (render_time, encode_time) = match self.compositor.lock() {
            Ok(compositor) => (
                compositor
                    .renderer
                    .as_ref()
                    .map_or(0.0, |r| r.telemetry().last_render_time()),
                compositor.last_encode_ms,
            ),
            Err(_) => (0.0, 0.0),
        };

        let input = Arc::new(FrameInput {
            pixels: self.pattern.pixels.clone(),
            width: self.pattern.width,
            height: self.pattern.height,
            timings: FrameTimings {
                current_time,
                frame_time,
                spare_time: VIDEO_FRAME_MS - (decode_time + render_time + encode_time),
                decode_time,
                stabilize_time: 0.0,
                encode_time,
            },
            stabilization,
            edit_mode: self.edit_mode,
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let rect = ui.available_rect_before_wrap();
                let compositor = Arc::clone(&self.compositor);
                ui.painter().add(egui::PaintCallback {
                    rect,
                    callback: Arc::new(egui_glow::CallbackFn::new(move |info, painter| {
                        if let Ok(mut compositor) = compositor.lock() {
                            compositor.paint(&input, &info, painter);
                        }
                    })),
                });
            });

        ctx.request_repaint();
    }

    fn on_exit(&mut self, _gl: Option<&glow::Context>) {
        // Release GL objects while the context is still current
        if let Ok(mut compositor) = self.compositor.lock() {
            if let Some(sink) = &compositor.sink {
                info!("Captured {} frames", sink.frames_written());
            }
            compositor.renderer = None;
            debug!("Renderer resources cleaned up");
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Console logging, RUST_LOG overrides the verbosity flags
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level()))
        .filter_module("egui", log::LevelFilter::Info)
        .format_timestamp_millis()
        .init();

    info!("OrientView preview starting...");
    debug!("Command-line args: {:?}", args);

    let settings = Settings::load(&args.settings)
        .with_context(|| format!("Failed to load settings {}", args.settings.display()))?;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(format!(
                "OrientView v{} • F1 info • F2 mode • F3 clear • F4 edit",
                env!("CARGO_PKG_VERSION")
            ))
            .with_inner_size([settings.window.width as f32, settings.window.height as f32])
            .with_resizable(true),
        ..Default::default()
    };

    eframe::run_native(
        "OrientView",
        native_options,
        Box::new(move |cc| {
            let gl = cc
                .gl
                .clone()
                .ok_or_else(|| anyhow::anyhow!("OpenGL context not available"))?;
            let app = OrientViewApp::new(gl, &args, &settings)?;
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("{}", e))?;

    info!("Application exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_follows_viewport() {
        assert_eq!(target_size((1000, 600), None), (1000, 600));
    }

    #[test]
    fn test_capture_keeps_configured_size() {
        assert_eq!(target_size((1000, 600), Some((1280, 720))), (1280, 720));
    }
}
