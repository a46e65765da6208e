//! Render and edit mode enums.

use serde::{Deserialize, Serialize};

/// Which panels are drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum RenderMode {
    /// Map on the left, video on the rest, map clipped to its column
    #[default]
    All,
    Video,
    Map,
}

impl RenderMode {
    pub fn draws_video(self) -> bool {
        matches!(self, RenderMode::All | RenderMode::Video)
    }

    /// Map panel, route overlay
    pub fn draws_map(self) -> bool {
        matches!(self, RenderMode::All | RenderMode::Map)
    }

    /// Map shares the frame with the video and must not overdraw it
    pub fn clips_map(self) -> bool {
        self == RenderMode::All
    }

    /// Next mode in All -> Video -> Map -> All order
    pub fn next(self) -> Self {
        match self {
            RenderMode::All => RenderMode::Video,
            RenderMode::Video => RenderMode::Map,
            RenderMode::Map => RenderMode::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::All => "both",
            RenderMode::Video => "video",
            RenderMode::Map => "map",
        }
    }
}

/// Current interactive edit target. Shown in telemetry only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum EditMode {
    #[default]
    None,
    Video,
    Map,
    MapWidth,
}

impl EditMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditMode::None => "none",
            EditMode::Video => "video",
            EditMode::Map => "map",
            EditMode::MapWidth => "map width",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_selection() {
        assert!(RenderMode::All.draws_video() && RenderMode::All.draws_map());
        assert!(RenderMode::Video.draws_video());
        assert!(!RenderMode::Video.draws_map());
        assert!(!RenderMode::Map.draws_video());
        assert!(RenderMode::Map.draws_map());
    }

    #[test]
    fn test_map_clipping_follows_mode() {
        assert!(RenderMode::All.clips_map());
        assert!(!RenderMode::Map.clips_map());
        assert!(!RenderMode::Video.clips_map());
    }

    #[test]
    fn test_cycle_and_names() {
        let mut mode = RenderMode::All;
        let names: Vec<&str> = (0..3)
            .map(|_| {
                let name = mode.as_str();
                mode = mode.next();
                name
            })
            .collect();
        assert_eq!(names, vec!["both", "video", "map"]);
        assert_eq!(mode, RenderMode::All);
        assert_eq!(EditMode::MapWidth.as_str(), "map width");
    }
}
