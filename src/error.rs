//! Renderer error taxonomy.
//!
//! Every variant is fatal for the operation that returned it. Initialization
//! errors leave no renderer behind; `RenderTarget` from a resize can be
//! retried with another size.

/// Shader stage, for compile error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

#[derive(Debug)]
pub enum RendererError {
    /// No shader pair registered under this name
    ShaderSource { name: String },
    ShaderCompile {
        name: String,
        stage: ShaderStage,
        log: String,
    },
    ShaderLink { name: String, log: String },
    /// Required attribute or uniform not found in a linked program
    MissingShaderInput { name: String, input: &'static str },
    /// GL object creation failed
    Gl(String),
    RenderTarget {
        width: u32,
        height: u32,
        reason: String,
    },
    /// Overlay canvas could not be allocated
    Canvas { width: u32, height: u32 },
}

impl std::fmt::Display for RendererError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RendererError::ShaderSource { name } => write!(f, "Shader not found: {}", name),
            RendererError::ShaderCompile { name, stage, log } => {
                write!(f, "{} shader '{}' compilation failed: {}", stage, name, log)
            }
            RendererError::ShaderLink { name, log } => {
                write!(f, "Shader program '{}' linking failed: {}", name, log)
            }
            RendererError::MissingShaderInput { name, input } => {
                write!(f, "Shader program '{}' has no '{}' input", name, input)
            }
            RendererError::Gl(msg) => write!(f, "OpenGL error: {}", msg),
            RendererError::RenderTarget {
                width,
                height,
                reason,
            } => write!(
                f,
                "Could not create {}x{} render target: {}",
                width, height, reason
            ),
            RendererError::Canvas { width, height } => {
                write!(f, "Could not allocate {}x{} overlay canvas", width, height)
            }
        }
    }
}

impl std::error::Error for RendererError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let e = RendererError::ShaderCompile {
            name: "default".to_string(),
            stage: ShaderStage::Fragment,
            log: "0:1 syntax error".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "fragment shader 'default' compilation failed: 0:1 syntax error"
        );

        let e = RendererError::MissingShaderInput {
            name: "map".to_string(),
            input: "vertexMatrix",
        };
        assert_eq!(e.to_string(), "Shader program 'map' has no 'vertexMatrix' input");

        let e = RendererError::RenderTarget {
            width: 0,
            height: 720,
            reason: "zero size".to_string(),
        };
        assert_eq!(e.to_string(), "Could not create 0x720 render target: zero size");
    }
}
