use std::collections::HashMap;
use std::fs;
use std::path::Path;

use eframe::glow::{self, HasContext};

use crate::error::{RendererError, ShaderStage};

/// Embedded panel vertex shader. Quad in texture pixels, transformed by `vertexMatrix`.
const PANEL_VERTEX_SHADER: &str = r#"
#version 330 core

in vec3 vertexPosition;
in vec2 vertexTextureCoordinate;

uniform mat4 vertexMatrix;

out vec2 textureCoordinate;

void main() {
    textureCoordinate = vertexTextureCoordinate;
    gl_Position = vertexMatrix * vec4(vertexPosition, 1.0);
}
"#;

/// Embedded passthrough fragment shader
const PANEL_FRAGMENT_SHADER: &str = r#"
#version 330 core

in vec2 textureCoordinate;
out vec4 fragColor;

uniform sampler2D textureSampler;

void main() {
    fragColor = vec4(texture(textureSampler, textureCoordinate).rgb, 1.0);
}
"#;

/// Embedded unsharp mask fragment shader (uses the optional texel uniforms)
const SHARPEN_FRAGMENT_SHADER: &str = r#"
#version 330 core

in vec2 textureCoordinate;
out vec4 fragColor;

uniform sampler2D textureSampler;
uniform float texelWidth;
uniform float texelHeight;

void main() {
    vec2 dx = vec2(texelWidth, 0.0);
    vec2 dy = vec2(0.0, texelHeight);

    vec3 center = texture(textureSampler, textureCoordinate).rgb;
    vec3 blur = (texture(textureSampler, textureCoordinate - dx).rgb
        + texture(textureSampler, textureCoordinate + dx).rgb
        + texture(textureSampler, textureCoordinate - dy).rgb
        + texture(textureSampler, textureCoordinate + dy).rgb) * 0.25;

    fragColor = vec4(clamp(center + (center - blur) * 0.8, 0.0, 1.0), 1.0);
}
"#;

/// Overlay composite shader. Canvas pixels are premultiplied alpha.
const OVERLAY_VERTEX_SHADER: &str = r#"
#version 330 core

in vec3 vertexPosition;
in vec2 vertexTextureCoordinate;

uniform mat4 vertexMatrix;

out vec2 textureCoordinate;

void main() {
    textureCoordinate = vertexTextureCoordinate;
    gl_Position = vertexMatrix * vec4(vertexPosition, 1.0);
}
"#;

const OVERLAY_FRAGMENT_SHADER: &str = r#"
#version 330 core

in vec2 textureCoordinate;
out vec4 fragColor;

uniform sampler2D textureSampler;

void main() {
    fragColor = texture(textureSampler, textureCoordinate);
}
"#;

/// Name of the built-in overlay program, used in logs and errors only
pub const OVERLAY_SHADER: &str = "overlay";

/// Overlay composite sources. Not registered in `ShaderLibrary`.
pub fn overlay_source() -> ShaderSource {
    ShaderSource {
        vertex: OVERLAY_VERTEX_SHADER.to_string(),
        fragment: OVERLAY_FRAGMENT_SHADER.to_string(),
    }
}

/// Vertex + fragment source pair
#[derive(Clone, Debug)]
pub struct ShaderSource {
    pub vertex: String,
    pub fragment: String,
}

/// Named shader pairs: embedded defaults, optionally overridden from disk.
///
/// On-disk shaders are `<dir>/<name>.vert` + `<dir>/<name>.frag`; a pair is
/// only registered when both files exist.
#[derive(Clone)]
pub struct ShaderLibrary {
    shaders: HashMap<String, ShaderSource>,
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderLibrary {
    /// Embedded shaders only
    pub fn new() -> Self {
        let mut library = Self {
            shaders: HashMap::new(),
        };
        library.load_embedded_shaders();
        library
    }

    /// Embedded shaders, then overrides from `dir` if it exists
    pub fn with_directory(dir: &Path) -> Self {
        let mut library = Self::new();
        if let Err(e) = library.load_shader_directory(dir) {
            log::info!("{}, using embedded shaders only", e);
        }
        library
    }

    /// Load all `.vert`/`.frag` pairs from a directory
    pub fn load_shader_directory(&mut self, shader_dir: &Path) -> Result<(), String> {
        if !shader_dir.exists() {
            return Err(format!("Shader directory does not exist: {:?}", shader_dir));
        }

        for entry in fs::read_dir(shader_dir).map_err(|e| e.to_string())? {
            let entry = entry.map_err(|e| e.to_string())?;
            let path = entry.path();

            if path.extension().and_then(|s| s.to_str()) == Some("vert")
                && let Some(name) = path.file_stem().and_then(|s| s.to_str())
            {
                let fragment_path = path.with_extension("frag");
                let sources = fs::read_to_string(&path)
                    .and_then(|v| fs::read_to_string(&fragment_path).map(|f| (v, f)));
                match sources {
                    Ok((vertex, fragment)) => {
                        self.shaders
                            .insert(name.to_string(), ShaderSource { vertex, fragment });
                        log::info!("Loaded shader: {}", name);
                    }
                    Err(e) => {
                        log::warn!("Failed to read shader pair {:?}: {}", path, e);
                    }
                }
            }
        }

        Ok(())
    }

    fn load_embedded_shaders(&mut self) {
        self.shaders.insert(
            "default".to_string(),
            ShaderSource {
                vertex: PANEL_VERTEX_SHADER.to_string(),
                fragment: PANEL_FRAGMENT_SHADER.to_string(),
            },
        );
        self.shaders.insert(
            "sharpen".to_string(),
            ShaderSource {
                vertex: PANEL_VERTEX_SHADER.to_string(),
                fragment: SHARPEN_FRAGMENT_SHADER.to_string(),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&ShaderSource> {
        self.shaders.get(name)
    }

    /// Registered shader names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shaders.keys().cloned().collect();
        names.sort();
        names
    }

    /// Compile and link the named pair.
    pub fn compile(&self, gl: &glow::Context, name: &str) -> Result<glow::Program, RendererError> {
        let source = self.get(name).ok_or_else(|| RendererError::ShaderSource {
            name: name.to_string(),
        })?;
        compile_program(gl, name, source)
    }
}

fn compile_stage(
    gl: &glow::Context,
    name: &str,
    stage: ShaderStage,
    source: &str,
) -> Result<glow::Shader, RendererError> {
    let kind = match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    };

    unsafe {
        let shader = gl
            .create_shader(kind)
            .map_err(|e| RendererError::Gl(format!("Failed to create {} shader: {}", stage, e)))?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);

        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(RendererError::ShaderCompile {
                name: name.to_string(),
                stage,
                log,
            });
        }

        Ok(shader)
    }
}

/// Compile both stages and link. Nothing is leaked on failure.
pub fn compile_program(
    gl: &glow::Context,
    name: &str,
    source: &ShaderSource,
) -> Result<glow::Program, RendererError> {
    let vertex_shader = compile_stage(gl, name, ShaderStage::Vertex, &source.vertex)?;
    let fragment_shader = match compile_stage(gl, name, ShaderStage::Fragment, &source.fragment) {
        Ok(shader) => shader,
        Err(e) => {
            unsafe { gl.delete_shader(vertex_shader) };
            return Err(e);
        }
    };

    unsafe {
        let program = match gl.create_program() {
            Ok(p) => p,
            Err(e) => {
                gl.delete_shader(vertex_shader);
                gl.delete_shader(fragment_shader);
                return Err(RendererError::Gl(format!("Failed to create program: {}", e)));
            }
        };
        gl.attach_shader(program, vertex_shader);
        gl.attach_shader(program, fragment_shader);
        gl.link_program(program);

        let linked = gl.get_program_link_status(program);
        let log = if linked {
            String::new()
        } else {
            gl.get_program_info_log(program)
        };

        gl.detach_shader(program, vertex_shader);
        gl.detach_shader(program, fragment_shader);
        gl.delete_shader(vertex_shader);
        gl.delete_shader(fragment_shader);

        if !linked {
            gl.delete_program(program);
            return Err(RendererError::ShaderLink {
                name: name.to_string(),
                log,
            });
        }

        log::trace!("Shader program '{}' linked", name);
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_shaders() {
        let library = ShaderLibrary::new();
        assert_eq!(library.names(), vec!["default", "sharpen"]);

        let default = library.get("default").unwrap();
        for input in ["vertexPosition", "vertexTextureCoordinate", "vertexMatrix"] {
            assert!(default.vertex.contains(input));
        }
        assert!(default.fragment.contains("textureSampler"));
        assert!(library.get("sharpen").unwrap().fragment.contains("texelWidth"));
    }

    #[test]
    fn test_overlay_not_in_library() {
        let library = ShaderLibrary::new();
        assert!(library.get(OVERLAY_SHADER).is_none());

        let overlay = overlay_source();
        assert!(overlay.vertex.contains("vertexMatrix"));
        assert!(overlay.fragment.contains("textureSampler"));
    }

    #[test]
    fn test_missing_directory_keeps_embedded() {
        let library = ShaderLibrary::with_directory(Path::new("/nonexistent/orientview/shaders"));
        assert!(library.get("default").is_some());
    }

    #[test]
    fn test_directory_pairs() {
        let dir = std::env::temp_dir().join(format!("orientview_shaders_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("custom.vert"), "// vert").unwrap();
        fs::write(dir.join("custom.frag"), "// frag").unwrap();
        fs::write(dir.join("default.vert"), "// override vert").unwrap();
        fs::write(dir.join("default.frag"), "// override frag").unwrap();
        // Vertex stage without a fragment stage is skipped
        fs::write(dir.join("orphan.vert"), "// orphan").unwrap();
        fs::write(dir.join("overlay.vert"), "// user vert").unwrap();
        fs::write(dir.join("overlay.frag"), "// user frag").unwrap();

        let library = ShaderLibrary::with_directory(&dir);
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(library.get("custom").unwrap().fragment, "// frag");
        assert_eq!(library.get("default").unwrap().vertex, "// override vert");
        assert!(library.get("orphan").is_none());
        // A user pair named like the overlay never replaces the built-in one
        assert_ne!(overlay_source().vertex, "// user vert");
    }
}
