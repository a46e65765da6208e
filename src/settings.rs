//! Compositor configuration, read once at initialization.
//!
//! Stored as JSON. Missing fields fall back to `Default`, so partial files
//! written by older versions keep working.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Output window / capture target
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    /// MSAA sample count for the live target (0 = no multisampling)
    pub multisamples: i32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            multisamples: 4,
        }
    }
}

/// Panel layout and look
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppearanceSettings {
    pub show_info_panel: bool,
    /// Fraction of the output width reserved for the map in `All` mode
    pub map_panel_width: f64,
    pub video_panel_scale: f64,
    pub map_panel_scale: f64,
    pub video_panel_background_color: [f32; 3],
    pub map_panel_background_color: [f32; 3],
}

impl Default for AppearanceSettings {
    fn default() -> Self {
        Self {
            show_info_panel: false,
            map_panel_width: 0.3,
            video_panel_scale: 1.0,
            map_panel_scale: 1.0,
            video_panel_background_color: [0.0, 0.0, 0.0],
            map_panel_background_color: [1.0, 1.0, 1.0],
        }
    }
}

/// Shader selection per panel
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ShaderSettings {
    pub video_panel_shader: String,
    pub map_panel_shader: String,
    /// Directory with `<name>.vert`/`<name>.frag` overrides
    pub directory: PathBuf,
}

impl Default for ShaderSettings {
    fn default() -> Self {
        Self {
            video_panel_shader: "default".to_string(),
            map_panel_shader: "default".to_string(),
            directory: PathBuf::from("data/shaders"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StabilizerSettings {
    /// Leave the video background uncleared so stabilized frames smear into trails
    pub disable_video_clear: bool,
}

/// Complete renderer configuration
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub window: WindowSettings,
    pub appearance: AppearanceSettings,
    pub shaders: ShaderSettings,
    pub stabilizer: StabilizerSettings,
    /// Smoothing factor shared by all telemetry averages
    pub telemetry_alpha: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window: WindowSettings::default(),
            appearance: AppearanceSettings::default(),
            shaders: ShaderSettings::default(),
            stabilizer: StabilizerSettings::default(),
            telemetry_alpha: 0.1,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Load from file; a missing file yields defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            log::info!("Settings file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = Settings::from_json(
            r#"{ "window": { "multisamples": 0 }, "appearance": { "map_panel_width": 0.4 } }"#,
        )
        .unwrap();

        assert_eq!(settings.window.multisamples, 0);
        assert_eq!(settings.window.width, 1280);
        assert!((settings.appearance.map_panel_width - 0.4).abs() < 1e-9);
        assert_eq!(settings.shaders.video_panel_shader, "default");
        assert!(!settings.stabilizer.disable_video_clear);
        assert!((settings.telemetry_alpha - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut settings = Settings::default();
        settings.appearance.show_info_panel = true;
        settings.shaders.map_panel_shader = "sharpen".to_string();

        let parsed = Settings::from_json(&settings.to_json().unwrap()).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_missing_file_is_default() {
        let settings = Settings::load(Path::new("/nonexistent/orientview.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }
}
