//! Frame compositor.
//!
//! Per frame, strictly in this order:
//! `start_rendering` -> `upload_frame_data` -> `render_all` -> `stop_rendering`
//! -> optional `get_rendered_frame` -> optional `present`.
//!
//! All drawing goes into an offscreen live target so the encoder and the
//! preview see the same pixels. GL objects are owned here and released once,
//! in `Drop`.

use std::sync::Arc;
use std::time::Instant;

use eframe::glow::{self, HasContext};
use glam::Vec2;
use image::RgbaImage;
use log::{debug, info, trace};

use crate::error::RendererError;
use crate::frame_buffer::{FrameBuffer, FrameData, FrameView};
use crate::modes::{EditMode, RenderMode};
use crate::overlay::Overlay;
use crate::panel::{OutputSize, Panel, PanelState, ScissorRect, Stabilization};
use crate::render_target::RenderTargets;
use crate::route::{RoutePath, route_transform};
use crate::settings::Settings;
use crate::shaders::ShaderLibrary;
use crate::telemetry::{FrameTimings, Telemetry};

/// Dual-panel compositor.
pub struct Renderer {
    gl: Arc<glow::Context>,
    shaders: ShaderLibrary,
    video_panel: Panel,
    map_panel: Panel,
    route: RoutePath,
    overlay: Overlay,
    targets: RenderTargets,
    frame_buffer: FrameBuffer,
    telemetry: Telemetry,
    output: OutputSize,
    multisamples: i32,
    render_mode: RenderMode,
    flip_output: bool,
    is_encoding: bool,
    full_clear: FullClear,
    render_timer: Instant,
}

impl Renderer {
    /// Build panels, targets and overlay. Fails without leaving GL objects behind.
    ///
    /// `video_size` is the decoder frame size; frames are uploaded later.
    pub fn new(
        gl: Arc<glow::Context>,
        video_size: (u32, u32),
        map_image: &RgbaImage,
        route_points: &[Vec2],
        settings: &Settings,
    ) -> Result<Self, RendererError> {
        info!(
            "Initializing renderer: video {}x{}, map {}x{}, window {}x{}",
            video_size.0,
            video_size.1,
            map_image.width(),
            map_image.height(),
            settings.window.width,
            settings.window.height
        );

        let appearance = &settings.appearance;
        let shaders = ShaderLibrary::with_directory(&settings.shaders.directory);
        let output = OutputSize::new(settings.window.width, settings.window.height);
        let multisamples = settings.window.multisamples;

        let mut video_state = PanelState::new(video_size.0, video_size.1);
        video_state.user_scale = appearance.video_panel_scale;
        video_state.clear_color = appearance.video_panel_background_color;
        video_state.clear_enabled = !settings.stabilizer.disable_video_clear;

        let mut map_state = PanelState::new(map_image.width(), map_image.height());
        map_state.user_scale = appearance.map_panel_scale;
        map_state.clear_color = appearance.map_panel_background_color;
        map_state.relative_width = appearance.map_panel_width;

        let targets = RenderTargets::create(&gl, output.width, output.height, multisamples)?;

        let video_panel = match Panel::new(
            &gl,
            &shaders,
            &settings.shaders.video_panel_shader,
            video_state,
            None,
        ) {
            Ok(panel) => panel,
            Err(e) => {
                targets.destroy(&gl);
                return Err(e);
            }
        };

        let map_panel = match Panel::new(
            &gl,
            &shaders,
            &settings.shaders.map_panel_shader,
            map_state,
            Some(map_image.as_raw()),
        ) {
            Ok(panel) => panel,
            Err(e) => {
                video_panel.destroy(&gl);
                targets.destroy(&gl);
                return Err(e);
            }
        };

        let overlay = match Overlay::new(&gl, output) {
            Ok(overlay) => overlay,
            Err(e) => {
                map_panel.destroy(&gl);
                video_panel.destroy(&gl);
                targets.destroy(&gl);
                return Err(e);
            }
        };

        Ok(Self {
            gl,
            shaders,
            video_panel,
            map_panel,
            route: RoutePath::new(route_points),
            overlay,
            targets,
            frame_buffer: FrameBuffer::new(output.width, output.height),
            telemetry: Telemetry::new(settings.telemetry_alpha, appearance.show_info_panel),
            output,
            multisamples,
            render_mode: RenderMode::default(),
            flip_output: false,
            is_encoding: false,
            full_clear: FullClear { requested: true },
            render_timer: Instant::now(),
        })
    }

    /// Recreate targets and the capture buffer for a new window size.
    ///
    /// On error the previous targets stay in place and the call can be retried.
    pub fn resize_window(&mut self, width: u32, height: u32) -> Result<(), RendererError> {
        let output = OutputSize::new(width, height);
        let targets = RenderTargets::create(&self.gl, width, height, self.multisamples)?;
        if let Err(e) = self.overlay.resize(&self.gl, output) {
            targets.destroy(&self.gl);
            return Err(e);
        }

        std::mem::replace(&mut self.targets, targets).destroy(&self.gl);
        self.frame_buffer.allocate(width, height);
        self.output = output;
        self.full_clear.request();

        debug!("Renderer resized to {}x{}", width, height);
        Ok(())
    }

    /// Begin a frame: restart the timer, feed telemetry, bind the live target.
    pub fn start_rendering(&mut self, timings: &FrameTimings) {
        self.render_timer = Instant::now();
        self.telemetry.begin_frame(timings);
        self.overlay.canvas.clear();

        let gl = &self.gl;
        self.targets.live().bind(gl);
        reset_host_state(gl);
        unsafe {
            gl.clear(glow::DEPTH_BUFFER_BIT | glow::STENCIL_BUFFER_BIT);
        }
    }

    /// Upload the current decoded frame into the video panel texture.
    pub fn upload_frame_data(&self, frame: &FrameData) {
        self.video_panel.upload_frame(&self.gl, frame);
    }

    /// Draw panels and overlays into the live target.
    pub fn render_all(&mut self, stabilization: &Stabilization, edit_mode: EditMode) {
        let gl = Arc::clone(&self.gl);
        self.targets.live().bind(&gl);
        reset_host_state(&gl);

        // Whole target once, before any scissor
        if let Some([r, g, b, a]) = self.full_clear.take(
            self.render_mode,
            &self.video_panel.state,
            &self.map_panel.state,
        ) {
            unsafe {
                gl.clear_color(r, g, b, a);
                gl.clear(glow::COLOR_BUFFER_BIT);
            }
        }

        if self.render_mode.draws_video() {
            self.render_video_panel(&gl, stabilization);
        }

        if self.render_mode.draws_map() {
            self.render_map_panel(&gl);
            self.render_route();
            if self.render_mode.clips_map() {
                let border = self.map_panel.state.map_border_x(self.output);
                self.overlay.canvas.draw_divider(border);
            }
        }

        if self.telemetry.is_visible() {
            let rows = self.telemetry.info_rows(
                self.is_encoding,
                edit_mode,
                self.render_mode,
                self.video_panel.state.user_scale,
                self.map_panel.state.user_scale,
            );
            self.overlay.canvas.draw_info_panel(&rows);
        }

        self.overlay.composite(&gl, self.output, self.flip_output);

        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
    }

    fn render_video_panel(&mut self, gl: &glow::Context, stabilization: &Stabilization) {
        let map_relative_width = self.map_panel.state.relative_width;
        let offset_x = self.video_panel.state.layout_video(
            self.output,
            self.render_mode,
            map_relative_width,
            stabilization,
            self.flip_output,
        );

        let scissor = self
            .video_panel
            .state
            .clipping_enabled
            .then(|| self.video_panel.state.video_scissor(self.output, offset_x));
        draw_panel(gl, &self.video_panel, scissor);
    }

    fn render_map_panel(&mut self, gl: &glow::Context) {
        let state = &mut self.map_panel.state;
        state.layout_map(self.output, self.flip_output);
        state.clipping_enabled = self.render_mode.clips_map();

        let scissor = state
            .clipping_enabled
            .then(|| state.map_scissor(self.output));
        draw_panel(gl, &self.map_panel, scissor);
    }

    fn render_route(&mut self) {
        let clip = self
            .map_panel
            .state
            .clipping_enabled
            .then(|| self.map_panel.state.map_border_x(self.output));
        let transform = route_transform(self.output, &self.map_panel.state);
        self.overlay.canvas.draw_route(&self.route, transform, clip);
    }

    /// End the frame and latch its render time (reported at the next start).
    pub fn stop_rendering(&mut self) {
        let elapsed = self.render_timer.elapsed().as_secs_f64() * 1000.0;
        self.telemetry.latch_render_time(elapsed);
        trace!("Frame rendered in {:.2} ms", elapsed);
    }

    /// Read the composited frame into the capture buffer.
    ///
    /// Rows are bottom-up unless flip output is set. The view is valid until
    /// the next capture.
    pub fn get_rendered_frame(&mut self) -> FrameView<'_> {
        let gl = &self.gl;
        let source = self.targets.capture_source();
        source.resolve(gl);

        let (w, h) = (self.output.width as i32, self.output.height as i32);
        unsafe {
            gl.pixel_store_i32(glow::PACK_ALIGNMENT, 1);
            gl.read_pixels(
                0,
                0,
                w,
                h,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelPackData::Slice(Some(self.frame_buffer.pixels_mut())),
            );
            gl.pixel_store_i32(glow::PACK_ALIGNMENT, 4);
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, None);
        }

        self.frame_buffer.view()
    }

    /// Show the live target in `viewport` (x, y, width, height) of `destination`
    /// (`None` = default framebuffer), scaled with linear filtering.
    pub fn present(&self, destination: Option<glow::Framebuffer>, viewport: [i32; 4]) {
        let gl = &self.gl;
        let source = self.targets.capture_source();
        source.resolve(gl);

        let [x, y, width, height] = viewport;
        let (src_w, src_h) = (self.output.width as i32, self.output.height as i32);
        // Flipped output is top-down; flip back for display
        let (dst_y0, dst_y1) = if self.flip_output {
            (y + height, y)
        } else {
            (y, y + height)
        };
        unsafe {
            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, destination);
            gl.blit_framebuffer(
                0,
                0,
                src_w,
                src_h,
                x,
                dst_y0,
                x + width,
                dst_y1,
                glow::COLOR_BUFFER_BIT,
                glow::LINEAR,
            );
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, None);
            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, None);
            gl.bind_framebuffer(glow::FRAMEBUFFER, destination);
        }
    }

    pub fn output_size(&self) -> OutputSize {
        self.output
    }

    pub fn video_panel(&self) -> &PanelState {
        &self.video_panel.state
    }

    pub fn video_panel_mut(&mut self) -> &mut PanelState {
        &mut self.video_panel.state
    }

    pub fn map_panel(&self) -> &PanelState {
        &self.map_panel.state
    }

    pub fn map_panel_mut(&mut self) -> &mut PanelState {
        &mut self.map_panel.state
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) {
        if mode != self.render_mode {
            debug!("Render mode: {}", mode.as_str());
            self.full_clear.request();
        }
        self.render_mode = mode;
    }

    pub fn flip_output(&self) -> bool {
        self.flip_output
    }

    pub fn set_flip_output(&mut self, flip: bool) {
        self.flip_output = flip;
    }

    pub fn is_encoding(&self) -> bool {
        self.is_encoding
    }

    pub fn set_is_encoding(&mut self, encoding: bool) {
        self.is_encoding = encoding;
    }

    pub fn show_info_panel(&self) -> bool {
        self.telemetry.is_visible()
    }

    pub fn toggle_show_info_panel(&mut self) {
        self.telemetry.toggle_visible();
    }

    pub fn request_full_clear(&mut self) {
        self.full_clear.request();
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn shader_names(&self) -> Vec<String> {
        self.shaders.names()
    }
}

/// Pending whole-target clear, consumed by the next `render_all`.
#[derive(Debug, Default)]
struct FullClear {
    requested: bool,
}

impl FullClear {
    fn request(&mut self) {
        self.requested = true;
    }

    /// Clear colour if a clear is pending; the request is consumed.
    fn take(
        &mut self,
        mode: RenderMode,
        video: &PanelState,
        map: &PanelState,
    ) -> Option<[f32; 4]> {
        std::mem::take(&mut self.requested).then(|| full_clear_color(mode, video, map))
    }
}

/// Background of the first panel the mode draws, with zero alpha.
fn full_clear_color(mode: RenderMode, video: &PanelState, map: &PanelState) -> [f32; 4] {
    let [r, g, b] = if mode.draws_video() {
        video.clear_color
    } else {
        map.clear_color
    };
    [r, g, b, 0.0]
}

/// Capabilities the host may leave enabled (egui paint callbacks set both).
const HOST_CAPABILITIES: [u32; 2] = [glow::SCISSOR_TEST, glow::BLEND];

fn reset_host_state(gl: &glow::Context) {
    for capability in HOST_CAPABILITIES {
        unsafe { gl.disable(capability) };
    }
}

/// Scissor (optional), clear (if enabled), draw, unscissor.
fn draw_panel(gl: &glow::Context, panel: &Panel, scissor: Option<ScissorRect>) {
    let state = &panel.state;
    unsafe {
        if let Some(rect) = scissor {
            gl.enable(glow::SCISSOR_TEST);
            gl.scissor(rect.x, rect.y, rect.width, rect.height);
        }

        if state.clear_enabled {
            let [r, g, b] = state.clear_color;
            gl.clear_color(r, g, b, 0.0);
            gl.clear(glow::COLOR_BUFFER_BIT);
        }

        panel.bind_and_draw(gl);

        gl.disable(glow::SCISSOR_TEST);
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let gl = &self.gl;
        self.overlay.destroy(gl);
        self.map_panel.destroy(gl);
        self.video_panel.destroy(gl);
        self.targets.destroy(gl);
        trace!("Renderer dropped and GL resources released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panels() -> (PanelState, PanelState) {
        let mut video = PanelState::new(1280, 720);
        video.clear_color = [0.2, 0.2, 0.2];
        let mut map = PanelState::new(1024, 1024);
        map.clear_color = [0.9, 0.8, 0.7];
        (video, map)
    }

    #[test]
    fn test_full_clear_color_follows_first_drawn_panel() {
        let (video, map) = panels();
        assert_eq!(full_clear_color(RenderMode::All, &video, &map), [0.2, 0.2, 0.2, 0.0]);
        assert_eq!(full_clear_color(RenderMode::Video, &video, &map), [0.2, 0.2, 0.2, 0.0]);
        assert_eq!(full_clear_color(RenderMode::Map, &video, &map), [0.9, 0.8, 0.7, 0.0]);
    }

    #[test]
    fn test_full_clear_consumed_once() {
        let (video, map) = panels();
        let mut clear = FullClear::default();
        assert_eq!(clear.take(RenderMode::All, &video, &map), None);

        clear.request();
        clear.request();
        assert_eq!(
            clear.take(RenderMode::Map, &video, &map),
            Some([0.9, 0.8, 0.7, 0.0])
        );
        assert_eq!(clear.take(RenderMode::Map, &video, &map), None);
    }

    #[test]
    fn test_host_scissor_and_blend_reset() {
        assert!(HOST_CAPABILITIES.contains(&glow::SCISSOR_TEST));
        assert!(HOST_CAPABILITIES.contains(&glow::BLEND));
    }
}
