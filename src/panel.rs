//! Textured, transformable rectangle (video feed, map image, overlay canvas).
//!
//! A [`Panel`] owns one texture, one static quad (VBO + VAO) and one shader
//! program. Its [`PanelState`] holds the transform inputs and is pure data:
//! the vertex matrix is recomputed from scratch every frame from the base,
//! user and automatic offsets, never accumulated.
//!
//! Coordinate conventions:
//! - panel space is Y-up with the origin at the output centre (ortho projection)
//! - the quad is sized in texture pixels and centred on the origin, so scale and
//!   rotation pivot around the panel's visual centre
//! - angles are degrees, counter-clockwise positive

use eframe::glow::{self, HasContext};
use glam::{Mat4, Vec3};
use log::{debug, trace, warn};

use crate::error::RendererError;
use crate::frame_buffer::FrameData;
use crate::modes::RenderMode;
use crate::shaders::{ShaderLibrary, ShaderSource, compile_program};

/// Output size in pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputSize {
    pub width: u32,
    pub height: u32,
}

impl OutputSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn w(&self) -> f64 {
        self.width as f64
    }

    pub fn h(&self) -> f64 {
        self.height as f64
    }
}

/// Per-frame stabilization correction for the video panel.
///
/// `x`/`y` are fractions of the texture size, `angle` is degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Stabilization {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
}

/// GL scissor box (bottom-left origin)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScissorRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Transform and compositing state of a panel.
#[derive(Clone, Debug)]
pub struct PanelState {
    texture_width: f64,
    texture_height: f64,
    texel_width: f64,
    texel_height: f64,

    /// Base placement from configuration
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    /// Map panel only: fraction of output width reserved for the map
    pub relative_width: f64,

    /// Interactive edits, independent of automatic correction
    pub user_x: f64,
    pub user_y: f64,
    pub user_angle: f64,
    pub user_scale: f64,

    pub clipping_enabled: bool,
    pub clear_enabled: bool,
    /// RGB, cleared with alpha 0
    pub clear_color: [f32; 3],

    // Derived every frame
    scale: f64,
    vertex_matrix: Mat4,
}

impl PanelState {
    pub fn new(texture_width: u32, texture_height: u32) -> Self {
        let texture_width = texture_width.max(1) as f64;
        let texture_height = texture_height.max(1) as f64;
        Self {
            texture_width,
            texture_height,
            texel_width: 1.0 / texture_width,
            texel_height: 1.0 / texture_height,
            x: 0.0,
            y: 0.0,
            angle: 0.0,
            relative_width: 1.0,
            user_x: 0.0,
            user_y: 0.0,
            user_angle: 0.0,
            user_scale: 1.0,
            clipping_enabled: false,
            clear_enabled: true,
            clear_color: [0.0, 0.0, 0.0],
            scale: 1.0,
            vertex_matrix: Mat4::IDENTITY,
        }
    }

    pub fn texture_width(&self) -> f64 {
        self.texture_width
    }

    pub fn texture_height(&self) -> f64 {
        self.texture_height
    }

    pub fn texel_width(&self) -> f64 {
        self.texel_width
    }

    pub fn texel_height(&self) -> f64 {
        self.texel_height
    }

    /// Scale computed by the last layout call
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn vertex_matrix(&self) -> Mat4 {
        self.vertex_matrix
    }

    /// Lay out the video panel for this frame.
    ///
    /// `map_relative_width` is the map column width; the video takes the rest
    /// of the output unless `mode` is `Video`. Returns the horizontal offset of
    /// the video region centre, needed for the scissor box.
    ///
    /// Stabilization: X offset is added, Y offset is subtracted and the angle is
    /// subtracted (counter-rotation).
    pub fn layout_video(
        &mut self,
        output: OutputSize,
        mode: RenderMode,
        map_relative_width: f64,
        stabilization: &Stabilization,
        flip: bool,
    ) -> f64 {
        let (available_width, offset_x) = if mode == RenderMode::Video {
            (output.w(), 0.0)
        } else {
            let available = (1.0 - map_relative_width) * output.w();
            (available, output.w() / 2.0 - available / 2.0)
        };

        self.scale = fit_scale(
            available_width,
            output.h(),
            self.texture_width,
            self.texture_height,
        ) * self.user_scale;

        let translate_x = offset_x
            + self.x
            + self.user_x
            + stabilization.x * self.texture_width * self.scale;
        let translate_y =
            self.y + self.user_y - stabilization.y * self.texture_height * self.scale;
        let angle = self.angle + self.user_angle - stabilization.angle;

        self.vertex_matrix = compose_matrix(output, flip, translate_x, translate_y, angle, self.scale);
        offset_x
    }

    /// Lay out the map panel for this frame. No automatic correction.
    pub fn layout_map(&mut self, output: OutputSize, flip: bool) {
        self.scale = fit_scale(output.w(), output.h(), self.texture_width, self.texture_height)
            * self.user_scale;

        self.vertex_matrix = compose_matrix(
            output,
            flip,
            self.x + self.user_x,
            self.y + self.user_y,
            self.angle + self.user_angle,
            self.scale,
        );
    }

    /// Full-output placement with no fit, used for the overlay canvas.
    pub fn layout_fullscreen(&mut self, output: OutputSize, flip: bool) {
        self.scale = 1.0;
        self.vertex_matrix = compose_matrix(output, flip, 0.0, 0.0, 0.0, 1.0);
    }

    /// Screen-space bounding box of the unrotated video panel, after `layout_video`.
    pub fn video_scissor(&self, output: OutputSize, offset_x: f64) -> ScissorRect {
        let panel_width = self.scale * self.texture_width;
        let panel_height = self.scale * self.texture_height;
        let left_margin = (output.w() - panel_width) / 2.0;
        let bottom_margin = (output.h() - panel_height) / 2.0;

        ScissorRect {
            x: (left_margin + offset_x + self.x + self.user_x + 0.5) as i32,
            y: (bottom_margin + self.y + self.user_y + 0.5) as i32,
            width: (panel_width + 0.5) as i32,
            height: (panel_height + 0.5) as i32,
        }
    }

    /// X coordinate of the map/video boundary, in pixels.
    pub fn map_border_x(&self, output: OutputSize) -> i32 {
        (self.relative_width * output.w() + 0.5) as i32
    }

    /// Map column scissor for `All` mode.
    pub fn map_scissor(&self, output: OutputSize) -> ScissorRect {
        ScissorRect {
            x: 0,
            y: 0,
            width: self.map_border_x(output),
            height: output.height as i32,
        }
    }
}

/// Fit a texture into an area by width, falling back to height when it overflows.
pub fn fit_scale(area_width: f64, area_height: f64, texture_width: f64, texture_height: f64) -> f64 {
    let mut scale = area_width / texture_width;
    if scale * texture_height > area_height {
        scale = area_height / texture_height;
    }
    scale
}

/// Ortho projection centred on the output, Y optionally flipped for encoders
/// that expect top-down rows.
pub fn ortho_projection(output: OutputSize, flip: bool) -> Mat4 {
    let half_w = output.width as f32 / 2.0;
    let half_h = output.height as f32 / 2.0;
    if flip {
        Mat4::orthographic_rh_gl(-half_w, half_w, half_h, -half_h, 0.0, 1.0)
    } else {
        Mat4::orthographic_rh_gl(-half_w, half_w, -half_h, half_h, 0.0, 1.0)
    }
}

/// projection * translate * rotate(z) * scale
fn compose_matrix(
    output: OutputSize,
    flip: bool,
    translate_x: f64,
    translate_y: f64,
    angle_degrees: f64,
    scale: f64,
) -> Mat4 {
    ortho_projection(output, flip)
        * Mat4::from_translation(Vec3::new(translate_x as f32, translate_y as f32, 0.0))
        * Mat4::from_rotation_z((angle_degrees as f32).to_radians())
        * Mat4::from_scale(Vec3::splat(scale as f32))
}

/// Quad vertex data: 4 positions (xyz) then 4 UVs.
///
/// ```text
/// 1 2
/// 4 3
/// ```
pub fn quad_vertices(width: f32, height: f32) -> [f32; 20] {
    let hw = width / 2.0;
    let hh = height / 2.0;
    #[rustfmt::skip]
    let vertices = [
        -hw,  hh, 0.0, // 1
         hw,  hh, 0.0, // 2
         hw, -hh, 0.0, // 3
        -hw, -hh, 0.0, // 4

        0.0, 0.0, // 1
        1.0, 0.0, // 2
        1.0, 1.0, // 3
        0.0, 1.0, // 4
    ];
    vertices
}

/// Byte offset of the UV block in the quad buffer
const UV_OFFSET: i32 = 12 * std::mem::size_of::<f32>() as i32;

/// Shader inputs resolved once at creation
struct ShaderInputs {
    vertex_position: u32,
    vertex_texture_coordinate: u32,
    vertex_matrix: glow::UniformLocation,
    texture_sampler: glow::UniformLocation,
    // Optional, feature disabled when absent
    texture_width: Option<glow::UniformLocation>,
    texture_height: Option<glow::UniformLocation>,
    texel_width: Option<glow::UniformLocation>,
    texel_height: Option<glow::UniformLocation>,
}

impl ShaderInputs {
    fn resolve(gl: &glow::Context, program: glow::Program, name: &str) -> Result<Self, RendererError> {
        let missing = |input: &'static str| RendererError::MissingShaderInput {
            name: name.to_string(),
            input,
        };

        unsafe {
            let vertex_position = gl
                .get_attrib_location(program, "vertexPosition")
                .ok_or_else(|| missing("vertexPosition"))?;
            let vertex_texture_coordinate = gl
                .get_attrib_location(program, "vertexTextureCoordinate")
                .ok_or_else(|| missing("vertexTextureCoordinate"))?;
            let vertex_matrix = gl
                .get_uniform_location(program, "vertexMatrix")
                .ok_or_else(|| missing("vertexMatrix"))?;
            let texture_sampler = gl
                .get_uniform_location(program, "textureSampler")
                .ok_or_else(|| missing("textureSampler"))?;

            let optional = |uniform: &str| {
                let location = gl.get_uniform_location(program, uniform);
                if location.is_none() {
                    debug!("Shader '{}' has no {} uniform", name, uniform);
                }
                location
            };

            Ok(Self {
                vertex_position,
                vertex_texture_coordinate,
                vertex_matrix,
                texture_sampler,
                texture_width: optional("textureWidth"),
                texture_height: optional("textureHeight"),
                texel_width: optional("texelWidth"),
                texel_height: optional("texelHeight"),
            })
        }
    }
}

/// GPU-resident panel
pub struct Panel {
    pub state: PanelState,
    shader_name: String,
    program: glow::Program,
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    texture: glow::Texture,
    inputs: ShaderInputs,
}

impl Panel {
    /// Compile the named shader, upload the static quad and allocate the texture.
    ///
    /// `pixels` is tightly packed RGBA8 of the texture size, or `None` to
    /// allocate storage only (video frames arrive later). On error every GL
    /// object created so far is deleted.
    pub fn new(
        gl: &glow::Context,
        shaders: &ShaderLibrary,
        shader_name: &str,
        state: PanelState,
        pixels: Option<&[u8]>,
    ) -> Result<Self, RendererError> {
        let program = shaders.compile(gl, shader_name)?;
        Self::with_program(gl, program, shader_name, state, pixels)
    }

    /// Same as `new`, for a program built outside the shader library.
    pub fn from_source(
        gl: &glow::Context,
        shader_name: &str,
        source: &ShaderSource,
        state: PanelState,
        pixels: Option<&[u8]>,
    ) -> Result<Self, RendererError> {
        let program = compile_program(gl, shader_name, source)?;
        Self::with_program(gl, program, shader_name, state, pixels)
    }

    /// Takes ownership of `program`; it is deleted on error.
    fn with_program(
        gl: &glow::Context,
        program: glow::Program,
        shader_name: &str,
        state: PanelState,
        pixels: Option<&[u8]>,
    ) -> Result<Self, RendererError> {
        let inputs = match ShaderInputs::resolve(gl, program, shader_name) {
            Ok(inputs) => inputs,
            Err(e) => {
                unsafe { gl.delete_program(program) };
                return Err(e);
            }
        };

        let width = state.texture_width as i32;
        let height = state.texture_height as i32;

        let (vao, vbo) = match upload_vertex_data(gl, &inputs, width as f32, height as f32) {
            Ok(objects) => objects,
            Err(e) => {
                unsafe { gl.delete_program(program) };
                return Err(e);
            }
        };

        let texture = match create_texture(gl, width, height, pixels) {
            Ok(texture) => texture,
            Err(e) => {
                unsafe {
                    gl.delete_vertex_array(vao);
                    gl.delete_buffer(vbo);
                    gl.delete_program(program);
                }
                return Err(e);
            }
        };

        trace!(
            "Panel created: {}x{} texture, shader '{}'",
            width, height, shader_name
        );

        Ok(Self {
            state,
            shader_name: shader_name.to_string(),
            program,
            vao,
            vbo,
            texture,
            inputs,
        })
    }

    pub fn shader_name(&self) -> &str {
        &self.shader_name
    }

    /// Upload a decoded frame into the texture. Frames of another size are skipped.
    pub fn upload_frame(&self, gl: &glow::Context, frame: &FrameData) {
        if frame.width as f64 != self.state.texture_width
            || frame.height as f64 != self.state.texture_height
        {
            warn!(
                "Frame size {}x{} does not match panel texture {}x{}, skipping upload",
                frame.width, frame.height, self.state.texture_width, self.state.texture_height
            );
            return;
        }
        if !frame.is_complete() {
            warn!("Frame data shorter than {} rows, skipping upload", frame.height);
            return;
        }

        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(self.texture));
            gl.pixel_store_i32(glow::UNPACK_ROW_LENGTH, frame.row_length_pixels() as i32);
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.tex_sub_image_2d(
                glow::TEXTURE_2D,
                0,
                0,
                0,
                frame.width as i32,
                frame.height as i32,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(frame.data)),
            );
            gl.pixel_store_i32(glow::UNPACK_ROW_LENGTH, 0);
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 4);
            gl.bind_texture(glow::TEXTURE_2D, None);
        }
    }

    /// One triangle-fan draw of the static quad with the current vertex matrix.
    pub fn bind_and_draw(&self, gl: &glow::Context) {
        let state = &self.state;
        let inputs = &self.inputs;

        unsafe {
            gl.use_program(Some(self.program));

            gl.uniform_matrix_4_f32_slice(
                Some(&inputs.vertex_matrix),
                false,
                &state.vertex_matrix.to_cols_array(),
            );
            gl.uniform_1_i32(Some(&inputs.texture_sampler), 0);

            if let Some(loc) = &inputs.texture_width {
                gl.uniform_1_f32(Some(loc), state.texture_width as f32);
            }
            if let Some(loc) = &inputs.texture_height {
                gl.uniform_1_f32(Some(loc), state.texture_height as f32);
            }
            if let Some(loc) = &inputs.texel_width {
                gl.uniform_1_f32(Some(loc), state.texel_width as f32);
            }
            if let Some(loc) = &inputs.texel_height {
                gl.uniform_1_f32(Some(loc), state.texel_height as f32);
            }

            gl.active_texture(glow::TEXTURE0);
            gl.bind_texture(glow::TEXTURE_2D, Some(self.texture));

            gl.bind_vertex_array(Some(self.vao));
            gl.draw_arrays(glow::TRIANGLE_FAN, 0, 4);
            gl.bind_vertex_array(None);

            gl.bind_texture(glow::TEXTURE_2D, None);
            gl.use_program(None);
        }
    }

    /// Release texture, quad and program together.
    pub fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_texture(self.texture);
            gl.delete_vertex_array(self.vao);
            gl.delete_buffer(self.vbo);
            gl.delete_program(self.program);
        }
    }
}

fn upload_vertex_data(
    gl: &glow::Context,
    inputs: &ShaderInputs,
    width: f32,
    height: f32,
) -> Result<(glow::VertexArray, glow::Buffer), RendererError> {
    let vertices = quad_vertices(width, height);

    unsafe {
        let vao = gl
            .create_vertex_array()
            .map_err(|e| RendererError::Gl(format!("Failed to create VAO: {}", e)))?;
        let vbo = match gl.create_buffer() {
            Ok(vbo) => vbo,
            Err(e) => {
                gl.delete_vertex_array(vao);
                return Err(RendererError::Gl(format!("Failed to create VBO: {}", e)));
            }
        };

        gl.bind_vertex_array(Some(vao));
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
        gl.buffer_data_u8_slice(
            glow::ARRAY_BUFFER,
            bytemuck::cast_slice(&vertices),
            glow::STATIC_DRAW,
        );

        gl.enable_vertex_attrib_array(inputs.vertex_position);
        gl.vertex_attrib_pointer_f32(inputs.vertex_position, 3, glow::FLOAT, false, 0, 0);
        gl.enable_vertex_attrib_array(inputs.vertex_texture_coordinate);
        gl.vertex_attrib_pointer_f32(
            inputs.vertex_texture_coordinate,
            2,
            glow::FLOAT,
            false,
            0,
            UV_OFFSET,
        );

        gl.bind_vertex_array(None);
        gl.bind_buffer(glow::ARRAY_BUFFER, None);

        Ok((vao, vbo))
    }
}

/// RGBA8 texture, linear filtering, clamp to edge.
pub(crate) fn create_texture(
    gl: &glow::Context,
    width: i32,
    height: i32,
    pixels: Option<&[u8]>,
) -> Result<glow::Texture, RendererError> {
    unsafe {
        let texture = gl
            .create_texture()
            .map_err(|e| RendererError::Gl(format!("Failed to create texture: {}", e)))?;
        gl.bind_texture(glow::TEXTURE_2D, Some(texture));

        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);

        gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::RGBA8 as i32,
            width,
            height,
            0,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            glow::PixelUnpackData::Slice(pixels),
        );
        gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 4);

        gl.bind_texture(glow::TEXTURE_2D, None);
        Ok(texture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    const HD: OutputSize = OutputSize {
        width: 1920,
        height: 1080,
    };

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// Transform a panel-space point to output pixels (Y-up, origin at centre)
    fn to_pixels(m: Mat4, x: f32, y: f32) -> (f32, f32) {
        let clip = m * Vec4::new(x, y, 0.0, 1.0);
        (clip.x * 1920.0 / 2.0, clip.y * 1080.0 / 2.0)
    }

    #[test]
    fn test_fit_scale_uniform() {
        let mut state = PanelState::new(3840, 2160);
        state.layout_video(HD, RenderMode::Video, 0.3, &Stabilization::default(), false);
        assert!(approx(state.scale(), 0.5));
    }

    #[test]
    fn test_fit_scale_width_bound() {
        let mut state = PanelState::new(4000, 1000);
        state.layout_video(HD, RenderMode::Video, 0.3, &Stabilization::default(), false);
        // 1920/4000 = 0.48; 0.48*1000 = 480 fits in 1080, no height reduction
        assert!(approx(state.scale(), 0.48));
    }

    #[test]
    fn test_fit_scale_height_bound() {
        // 1920/1000 = 1.92 -> 1.92*2000 overflows 1080 -> 1080/2000
        assert!(approx(fit_scale(1920.0, 1080.0, 1000.0, 2000.0), 0.54));
    }

    #[test]
    fn test_user_scale_multiplies_fit() {
        let mut state = PanelState::new(3840, 2160);
        state.user_scale = 3.0;
        state.layout_video(HD, RenderMode::Video, 0.3, &Stabilization::default(), false);
        assert!(approx(state.scale(), 1.5));
    }

    #[test]
    fn test_video_region_in_all_mode() {
        let mut state = PanelState::new(1000, 100);
        let offset = state.layout_video(HD, RenderMode::All, 0.25, &Stabilization::default(), false);
        // Video region is 1440 wide, centred 240 px right of output centre
        assert!(approx(offset, 240.0));
        assert!(approx(state.scale(), 1.44));

        let (cx, cy) = to_pixels(state.vertex_matrix(), 0.0, 0.0);
        assert!((cx - 240.0).abs() < 1e-3);
        assert!(cy.abs() < 1e-3);
    }

    #[test]
    fn test_stabilization_signs() {
        let mut state = PanelState::new(1920, 1080);
        let stab = Stabilization {
            x: 0.1,
            y: 0.1,
            angle: 0.0,
        };
        state.layout_video(HD, RenderMode::Video, 0.3, &stab, false);
        let (cx, cy) = to_pixels(state.vertex_matrix(), 0.0, 0.0);
        // X added, Y subtracted
        assert!((cx - 192.0).abs() < 1e-2);
        assert!((cy + 108.0).abs() < 1e-2);
    }

    #[test]
    fn test_stabilization_angle_counter_rotates() {
        let mut state = PanelState::new(1920, 1080);
        state.user_angle = 10.0;
        let stab = Stabilization {
            x: 0.0,
            y: 0.0,
            angle: 10.0,
        };
        state.layout_video(HD, RenderMode::Video, 0.3, &stab, false);
        // Net rotation zero: the right edge midpoint stays on the X axis
        let (x, y) = to_pixels(state.vertex_matrix(), 960.0, 0.0);
        assert!((x - 960.0).abs() < 1e-2);
        assert!(y.abs() < 1e-2);
    }

    #[test]
    fn test_flip_inverts_y() {
        let mut state = PanelState::new(1920, 1080);
        state.user_y = 100.0;
        state.layout_map(HD, false);
        let (_, up) = to_pixels(state.vertex_matrix(), 0.0, 0.0);
        state.layout_map(HD, true);
        let (_, down) = to_pixels(state.vertex_matrix(), 0.0, 0.0);
        assert!((up - 100.0).abs() < 1e-3);
        assert!((down + 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_map_layout_ignores_relative_width() {
        let mut state = PanelState::new(4000, 1000);
        state.relative_width = 0.2;
        state.user_scale = 2.0;
        state.layout_map(HD, false);
        assert!(approx(state.scale(), 0.96));
    }

    #[test]
    fn test_video_scissor_rounding() {
        let mut state = PanelState::new(1920, 1080);
        state.user_scale = 0.5;
        state.user_x = 10.4;
        state.user_y = -3.6;
        let offset = state.layout_video(HD, RenderMode::Video, 0.3, &Stabilization::default(), false);
        let rect = state.video_scissor(HD, offset);
        assert_eq!(
            rect,
            ScissorRect {
                x: 490,
                y: 266,
                width: 960,
                height: 540
            }
        );
    }

    #[test]
    fn test_map_border_and_scissor() {
        let mut state = PanelState::new(100, 100);
        state.relative_width = 0.3;
        assert_eq!(state.map_border_x(HD), 576);
        assert_eq!(
            state.map_scissor(HD),
            ScissorRect {
                x: 0,
                y: 0,
                width: 576,
                height: 1080
            }
        );
    }

    #[test]
    fn test_quad_vertices_centred() {
        let v = quad_vertices(200.0, 100.0);
        assert_eq!(&v[0..3], &[-100.0, 50.0, 0.0]);
        assert_eq!(&v[6..9], &[100.0, -50.0, 0.0]);
        assert_eq!(&v[12..20], &[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
        assert_eq!(UV_OFFSET, 48);
    }

    #[test]
    fn test_texel_size() {
        let state = PanelState::new(640, 480);
        assert!(approx(state.texel_width(), 1.0 / 640.0));
        assert!(approx(state.texel_height(), 1.0 / 480.0));
    }
}
