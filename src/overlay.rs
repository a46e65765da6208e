//! Vector overlays: route, map divider and the info panel.
//!
//! Everything is rasterized on the CPU into a window-sized premultiplied RGBA
//! canvas (tiny-skia for shapes, cosmic-text for glyphs), then uploaded once
//! per frame and blended over the live target. Drawing order on the canvas is
//! the compositing order: route, divider, info panel.

use cosmic_text::{
    Attrs as TextAttrs, Buffer, Color as TextColor, Family, FontSystem, Metrics, Shaping,
    SwashCache, Weight,
};
use eframe::glow::{self, HasContext};
use glam::Affine2;
use log::trace;
use tiny_skia::{
    FillRule, LineCap, LineJoin, Mask, Paint, Path, PathBuilder, Pixmap, Rect, Stroke, Transform,
};

use crate::error::RendererError;
use crate::frame_buffer::FrameData;
use crate::panel::{OutputSize, Panel, PanelState};
use crate::route::{self, ROUTE_COLOR, ROUTE_WIDTH, RoutePath};
use crate::shaders::{OVERLAY_SHADER, overlay_source};
use crate::telemetry::{InfoRow, Tone};

const FONT_SIZE: f32 = 11.0;
const LINE_HEIGHT: f32 = 13.0;
const LINE_SPACING: f32 = LINE_HEIGHT + 1.0;

const TEXT_X: f32 = 10.0;
const TEXT_Y: f32 = 6.0;
const COLUMN_MARGIN: f32 = 15.0;
const BACKGROUND_RADIUS: f32 = 10.0;
/// Panel height in lines, including the blank spacer rows
const PANEL_LINES: f32 = 15.0;

const BACKGROUND_COLOR: [u8; 4] = [20, 20, 20, 220];
const TEXT_ALPHA: u8 = 200;

/// Window-sized CPU canvas.
pub struct OverlayCanvas {
    pixmap: Pixmap,
    font_system: FontSystem,
    swash_cache: SwashCache,
    /// Something was drawn since the last clear
    dirty: bool,
    /// Route clip mask for the map column, keyed on its width
    column_mask: Option<(i32, Mask)>,
    /// Label and value column widths, measured once
    column_widths: Option<(f32, f32)>,
}

impl OverlayCanvas {
    pub fn new(width: u32, height: u32) -> Result<Self, RendererError> {
        Ok(Self {
            pixmap: allocate(width, height)?,
            font_system: FontSystem::new(),
            swash_cache: SwashCache::new(),
            dirty: false,
            column_mask: None,
            column_widths: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Premultiplied RGBA, top row first
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// Match the window size. Contents are undefined afterwards; call `clear`.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RendererError> {
        if self.pixmap.width() != width || self.pixmap.height() != height {
            self.pixmap = allocate(width, height)?;
            self.column_mask = None;
            trace!("Overlay canvas resized to {}x{}", width, height);
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
        self.dirty = false;
    }

    /// Stroke the route with the map transform, optionally clipped to the
    /// map column `[0, clip_width)`.
    pub fn draw_route(&mut self, route: &RoutePath, transform: Affine2, clip_width: Option<i32>) {
        let Some(path) = route.path() else {
            return;
        };

        let mask = match clip_width {
            Some(width) => {
                // Empty column, nothing visible
                if !self.update_column_mask(width) {
                    return;
                }
                self.column_mask.as_ref().map(|(_, mask)| mask)
            }
            None => None,
        };

        let mut paint = Paint::default();
        paint.set_color_rgba8(ROUTE_COLOR[0], ROUTE_COLOR[1], ROUTE_COLOR[2], ROUTE_COLOR[3]);
        paint.anti_alias = true;

        let stroke = Stroke {
            width: ROUTE_WIDTH,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Default::default()
        };

        self.pixmap.stroke_path(
            path,
            &paint,
            &stroke,
            route::to_skia_transform(transform),
            mask,
        );
        self.dirty = true;
    }

    /// Rebuild the clip mask only when the column width changes.
    fn update_column_mask(&mut self, width: i32) -> bool {
        if let Some((cached, _)) = &self.column_mask
            && *cached == width
        {
            return true;
        }
        self.column_mask = self.build_column_mask(width).map(|mask| (width, mask));
        self.column_mask.is_some()
    }

    fn build_column_mask(&self, width: i32) -> Option<Mask> {
        let rect = Rect::from_xywh(0.0, 0.0, width as f32, self.pixmap.height() as f32)?;
        let mut mask = Mask::new(self.pixmap.width(), self.pixmap.height())?;
        mask.fill_path(
            &PathBuilder::from_rect(rect),
            FillRule::Winding,
            false,
            Transform::identity(),
        );
        Some(mask)
    }

    /// 1 px black vertical line at `x`, full height
    pub fn draw_divider(&mut self, x: i32) {
        let Some(rect) = Rect::from_xywh(x as f32, 0.0, 1.0, self.pixmap.height() as f32) else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(0, 0, 0, 255);
        paint.anti_alias = false;
        self.pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        self.dirty = true;
    }

    /// Rounded translucent panel in the top-left corner with label/value columns.
    pub fn draw_info_panel(&mut self, rows: &[InfoRow]) {
        let (label_width, value_width) = self.column_widths();

        let background_width =
            TEXT_X + BACKGROUND_RADIUS + label_width + COLUMN_MARGIN + value_width + 10.0;
        let background_height = LINE_SPACING * PANEL_LINES + TEXT_Y + 3.0;

        if let Some(background) = rounded_rect(
            -BACKGROUND_RADIUS,
            -BACKGROUND_RADIUS,
            background_width,
            background_height,
            BACKGROUND_RADIUS,
        ) {
            let mut fill = Paint::default();
            let [r, g, b, a] = BACKGROUND_COLOR;
            fill.set_color_rgba8(r, g, b, a);
            fill.anti_alias = true;
            self.pixmap
                .fill_path(&background, &fill, FillRule::Winding, Transform::identity(), None);

            let mut outline = Paint::default();
            outline.set_color_rgba8(0, 0, 0, 255);
            outline.anti_alias = true;
            let stroke = Stroke {
                width: 1.0,
                ..Default::default()
            };
            self.pixmap
                .stroke_path(&background, &outline, &stroke, Transform::identity(), None);
        }

        let value_x = TEXT_X + label_width + COLUMN_MARGIN;
        let mut y = TEXT_Y;
        for row in rows {
            if !row.is_separator() {
                self.draw_text(&row.label, TEXT_X, y, label_width, Tone::Normal);
                self.draw_text(&row.value, value_x, y, value_width, row.tone);
            }
            y += LINE_SPACING;
        }
        self.dirty = true;
    }

    fn column_widths(&mut self) -> (f32, f32) {
        if let Some(widths) = self.column_widths {
            return widths;
        }
        let widths = (
            self.measure_text("video scale:"),
            self.measure_text("99:99:99.999"),
        );
        self.column_widths = Some(widths);
        widths
    }

    fn text_buffer(&mut self, text: &str, width: f32) -> Buffer {
        let metrics = Metrics::new(FONT_SIZE, LINE_HEIGHT);
        let mut buffer = Buffer::new(&mut self.font_system, metrics);
        buffer.set_size(&mut self.font_system, Some(width), None);

        let attrs = TextAttrs::new().family(Family::SansSerif).weight(Weight::BOLD);
        buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);
        buffer.shape_until_scroll(&mut self.font_system, false);
        buffer
    }

    /// Advance width of a single line, in pixels
    pub fn measure_text(&mut self, text: &str) -> f32 {
        let buffer = self.text_buffer(text, 4096.0);
        let mut max_x = 0.0f32;
        for run in buffer.layout_runs() {
            for glyph in run.glyphs.iter() {
                max_x = max_x.max(glyph.x + glyph.w);
            }
        }
        max_x.ceil()
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, width: f32, tone: Tone) {
        // Generous box so the value column never wraps
        let buffer = self.text_buffer(text, width.max(1.0) * 2.0);

        let color = match tone {
            Tone::Normal => TextColor::rgba(255, 255, 255, TEXT_ALPHA),
            Tone::Good => TextColor::rgba(0, 255, 0, TEXT_ALPHA),
            Tone::Bad => TextColor::rgba(255, 0, 0, TEXT_ALPHA),
        };

        let Self {
            pixmap,
            font_system,
            swash_cache,
            ..
        } = self;

        let mut paint = Paint::default();
        paint.anti_alias = false;

        buffer.draw(font_system, swash_cache, color, |gx, gy, w, h, color| {
            if color.a() == 0 {
                return;
            }
            let Some(rect) = Rect::from_xywh(x + gx as f32, y + gy as f32, w as f32, h as f32)
            else {
                return;
            };
            paint.set_color_rgba8(color.r(), color.g(), color.b(), color.a());
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        });
    }
}

fn allocate(width: u32, height: u32) -> Result<Pixmap, RendererError> {
    Pixmap::new(width, height).ok_or(RendererError::Canvas { width, height })
}

/// Rounded rectangle outline with circular corners (cubic approximation).
fn rounded_rect(x: f32, y: f32, w: f32, h: f32, r: f32) -> Option<Path> {
    let r = r.min(w / 2.0).min(h / 2.0);
    // Control point distance for a quarter circle
    let k = r * 0.552_284_8;
    let (right, bottom) = (x + w, y + h);

    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(right - r, y);
    pb.cubic_to(right - r + k, y, right, y + r - k, right, y + r);
    pb.line_to(right, bottom - r);
    pb.cubic_to(right, bottom - r + k, right - r + k, bottom, right - r, bottom);
    pb.line_to(x + r, bottom);
    pb.cubic_to(x + r - k, bottom, x, bottom - r + k, x, bottom - r);
    pb.line_to(x, y + r);
    pb.cubic_to(x, y + r - k, x + r - k, y, x + r, y);
    pb.close();
    pb.finish()
}

/// Canvas plus the GL quad that blends it over the live target.
pub struct Overlay {
    pub canvas: OverlayCanvas,
    panel: Panel,
}

impl Overlay {
    pub fn new(gl: &glow::Context, output: OutputSize) -> Result<Self, RendererError> {
        let canvas = OverlayCanvas::new(output.width, output.height)?;
        let panel = create_panel(gl, output)?;
        Ok(Self { canvas, panel })
    }

    /// Match a new window size. The old quad is kept if the new one fails.
    pub fn resize(&mut self, gl: &glow::Context, output: OutputSize) -> Result<(), RendererError> {
        if self.panel.state.texture_width() == output.w()
            && self.panel.state.texture_height() == output.h()
        {
            return Ok(());
        }
        let panel = create_panel(gl, output)?;
        if let Err(e) = self.canvas.resize(output.width, output.height) {
            panel.destroy(gl);
            return Err(e);
        }
        std::mem::replace(&mut self.panel, panel).destroy(gl);
        Ok(())
    }

    /// Upload and blend the canvas over the bound framebuffer. No-op when nothing was drawn.
    pub fn composite(&mut self, gl: &glow::Context, output: OutputSize, flip: bool) {
        if !self.canvas.is_dirty() {
            return;
        }

        self.panel.upload_frame(
            gl,
            &FrameData::packed(self.canvas.data(), self.canvas.width(), self.canvas.height()),
        );
        // Canvas rows are top-down, quad UV v=0 is the top edge
        self.panel.state.layout_fullscreen(output, flip);

        unsafe {
            gl.enable(glow::BLEND);
            gl.blend_func(glow::ONE, glow::ONE_MINUS_SRC_ALPHA);
            self.panel.bind_and_draw(gl);
            gl.disable(glow::BLEND);
        }
    }

    pub fn destroy(&self, gl: &glow::Context) {
        self.panel.destroy(gl);
    }
}

fn create_panel(gl: &glow::Context, output: OutputSize) -> Result<Panel, RendererError> {
    let state = PanelState::new(output.width, output.height);
    Panel::from_source(gl, OVERLAY_SHADER, &overlay_source(), state, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn pixel(canvas: &OverlayCanvas, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * canvas.width() + x) * 4) as usize;
        let d = canvas.data();
        [d[i], d[i + 1], d[i + 2], d[i + 3]]
    }

    fn horizontal_route() -> RoutePath {
        RoutePath::new(&[Vec2::new(10.0, -50.0), Vec2::new(190.0, -50.0)])
    }

    #[test]
    fn test_zero_size_canvas_fails() {
        assert!(matches!(
            OverlayCanvas::new(0, 10),
            Err(RendererError::Canvas { width: 0, height: 10 })
        ));
    }

    #[test]
    fn test_route_stroke_colour() {
        let mut canvas = OverlayCanvas::new(200, 100).unwrap();
        canvas.clear();
        assert!(!canvas.is_dirty());

        canvas.draw_route(&horizontal_route(), Affine2::IDENTITY, None);
        assert!(canvas.is_dirty());

        // Premultiplied (200, 0, 0, 128)
        let [r, g, b, a] = pixel(&canvas, 100, 50);
        assert!((a as i32 - 128).abs() <= 1);
        assert!((r as i32 - 100).abs() <= 1);
        assert_eq!((g, b), (0, 0));

        // Stroke half width is 7.5
        assert_eq!(pixel(&canvas, 100, 50 + 10)[3], 0);
    }

    #[test]
    fn test_route_clipped_to_map_column() {
        let mut canvas = OverlayCanvas::new(200, 100).unwrap();
        canvas.clear();
        canvas.draw_route(&horizontal_route(), Affine2::IDENTITY, Some(60));
        assert!(pixel(&canvas, 30, 50)[3] > 0);
        assert_eq!(pixel(&canvas, 100, 50)[3], 0);
    }

    #[test]
    fn test_column_mask_reused_until_width_or_size_changes() {
        let mut canvas = OverlayCanvas::new(200, 100).unwrap();
        let cached_width = |c: &OverlayCanvas| c.column_mask.as_ref().map(|(w, _)| *w);

        canvas.draw_route(&horizontal_route(), Affine2::IDENTITY, Some(60));
        assert_eq!(cached_width(&canvas), Some(60));
        canvas.clear();
        canvas.draw_route(&horizontal_route(), Affine2::IDENTITY, Some(60));
        assert_eq!(cached_width(&canvas), Some(60));
        assert_eq!(pixel(&canvas, 100, 50)[3], 0);

        canvas.draw_route(&horizontal_route(), Affine2::IDENTITY, Some(120));
        assert_eq!(cached_width(&canvas), Some(120));
        assert!(pixel(&canvas, 100, 50)[3] > 0);

        canvas.resize(300, 100).unwrap();
        assert_eq!(cached_width(&canvas), None);
    }

    #[test]
    fn test_zero_width_column_hides_route() {
        let mut canvas = OverlayCanvas::new(200, 100).unwrap();
        canvas.clear();
        canvas.draw_route(&horizontal_route(), Affine2::IDENTITY, Some(0));
        assert!(!canvas.is_dirty());
    }

    #[test]
    fn test_column_widths_measured_once() {
        let mut canvas = OverlayCanvas::new(400, 300).unwrap();
        assert!(canvas.column_widths.is_none());
        canvas.draw_info_panel(&[]);
        let (label, value) = canvas.column_widths.unwrap();
        assert_eq!(label, canvas.measure_text("video scale:"));
        assert_eq!(value, canvas.measure_text("99:99:99.999"));
        canvas.draw_info_panel(&[]);
        assert_eq!(canvas.column_widths, Some((label, value)));
    }

    #[test]
    fn test_empty_route_draws_nothing() {
        let mut canvas = OverlayCanvas::new(50, 50).unwrap();
        canvas.clear();
        canvas.draw_route(&RoutePath::new(&[Vec2::ONE]), Affine2::IDENTITY, None);
        assert!(!canvas.is_dirty());
        assert!(canvas.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_divider_single_column() {
        let mut canvas = OverlayCanvas::new(20, 10).unwrap();
        canvas.clear();
        canvas.draw_divider(6);
        assert_eq!(pixel(&canvas, 6, 0), [0, 0, 0, 255]);
        assert_eq!(pixel(&canvas, 6, 9), [0, 0, 0, 255]);
        assert_eq!(pixel(&canvas, 5, 5)[3], 0);
        assert_eq!(pixel(&canvas, 7, 5)[3], 0);
    }

    #[test]
    fn test_clear_resets_canvas() {
        let mut canvas = OverlayCanvas::new(20, 10).unwrap();
        canvas.draw_divider(3);
        canvas.clear();
        assert!(!canvas.is_dirty());
        assert!(canvas.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_resize_keeps_same_size() {
        let mut canvas = OverlayCanvas::new(20, 10).unwrap();
        canvas.draw_divider(3);
        canvas.resize(20, 10).unwrap();
        assert_eq!(pixel(&canvas, 3, 0)[3], 255);
        canvas.resize(40, 30).unwrap();
        assert_eq!((canvas.width(), canvas.height()), (40, 30));
        assert!(canvas.resize(0, 30).is_err());
    }

    #[test]
    fn test_info_panel_background() {
        let mut canvas = OverlayCanvas::new(400, 300).unwrap();
        canvas.clear();
        canvas.draw_info_panel(&[]);
        assert!(canvas.is_dirty());
        // Inside the panel, away from text and outline
        assert!((pixel(&canvas, 5, 20)[3] as i32 - 220).abs() <= 1);
        // Far outside
        assert_eq!(pixel(&canvas, 390, 290)[3], 0);
    }

    #[test]
    fn test_rounded_rect_bounds() {
        let path = rounded_rect(-10.0, -10.0, 100.0, 50.0, 10.0).unwrap();
        let b = path.bounds();
        assert_eq!((b.left(), b.top(), b.right(), b.bottom()), (-10.0, -10.0, 90.0, 40.0));
    }
}
