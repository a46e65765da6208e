//! OrientView - dual-panel video + map compositor library
//!
//! Composites a stabilized video panel and a map panel with a route overlay
//! and a telemetry panel into an offscreen OpenGL target, and captures the
//! result for encoding.

// Pure data and math
pub mod frame_buffer;
pub mod modes;
pub mod moving_average;
pub mod settings;
pub mod telemetry;

// GL and canvas
pub mod error;
pub mod overlay;
pub mod panel;
pub mod render_target;
pub mod renderer;
pub mod route;
pub mod shaders;

// Host side
pub mod capture;
pub mod cli;

pub use error::RendererError;
pub use frame_buffer::{FrameBuffer, FrameData, FrameSink, FrameView};
pub use modes::{EditMode, RenderMode};
pub use panel::{OutputSize, PanelState, Stabilization};
pub use renderer::Renderer;
pub use settings::Settings;
pub use telemetry::FrameTimings;
