//! Route polyline drawn over the map panel.
//!
//! Points are stored in map image space with Y negated (canvas is Y-down),
//! and the path is built once. Each frame it is stroked through
//! [`route_transform`], which mirrors the map panel placement in canvas space.

use std::path::Path as FsPath;

use anyhow::Context;
use glam::{Affine2, Vec2};
use tiny_skia::{Path, PathBuilder, Transform};

use crate::panel::{OutputSize, PanelState};

/// Stroke width in map pixels
pub const ROUTE_WIDTH: f32 = 15.0;
/// Route colour, RGBA8
pub const ROUTE_COLOR: [u8; 4] = [200, 0, 0, 128];

/// Immutable route path.
#[derive(Clone, Debug, Default)]
pub struct RoutePath {
    points: Vec<Vec2>,
    path: Option<Path>,
}

impl RoutePath {
    /// Build from route points. Fewer than two points give an empty path.
    pub fn new(route_points: &[Vec2]) -> Self {
        let points: Vec<Vec2> = route_points.iter().map(|p| Vec2::new(p.x, -p.y)).collect();

        let path = if points.len() < 2 {
            None
        } else {
            let mut builder = PathBuilder::new();
            builder.move_to(points[0].x, points[0].y);
            for p in &points[1..] {
                builder.line_to(p.x, p.y);
            }
            builder.finish()
        };

        log::debug!("Route path built from {} points", route_points.len());
        Self { points, path }
    }

    /// Path vertices in drawing order
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_none()
    }

    /// Drawable path, `None` when there is nothing to stroke
    pub fn path(&self) -> Option<&Path> {
        self.path.as_ref()
    }
}

/// Parse route points from a JSON array of `[x, y]` pairs.
pub fn parse_route_json(json: &str) -> serde_json::Result<Vec<Vec2>> {
    let pairs: Vec<[f32; 2]> = serde_json::from_str(json)?;
    Ok(pairs.into_iter().map(Vec2::from).collect())
}

pub fn load_route_points(path: &FsPath) -> anyhow::Result<Vec<Vec2>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read route file {}", path.display()))?;
    let points = parse_route_json(&json)
        .with_context(|| format!("Invalid route file {}", path.display()))?;
    log::info!("Loaded {} route points from {}", points.len(), path.display());
    Ok(points)
}

/// Map panel placement in top-left-origin canvas space:
/// translate `(w/2 + x + user_x, h/2 - y - user_y)`, scale, rotate `-(angle + user_angle)`.
///
/// Uses the scale computed by the last map layout.
pub fn route_transform(output: OutputSize, map: &PanelState) -> Affine2 {
    let translation = Vec2::new(
        (output.w() / 2.0 + map.x + map.user_x) as f32,
        (output.h() / 2.0 - map.y - map.user_y) as f32,
    );
    let angle = -((map.angle + map.user_angle) as f32).to_radians();

    Affine2::from_translation(translation)
        * Affine2::from_scale(Vec2::splat(map.scale() as f32))
        * Affine2::from_angle(angle)
}

/// glam affine to tiny-skia row form
pub fn to_skia_transform(affine: Affine2) -> Transform {
    let m = affine.matrix2;
    let t = affine.translation;
    Transform::from_row(m.x_axis.x, m.x_axis.y, m.y_axis.x, m.y_axis.y, t.x, t.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HD: OutputSize = OutputSize {
        width: 1920,
        height: 1080,
    };

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-2
    }

    #[test]
    fn test_points_negate_y() {
        let route = RoutePath::new(&[Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0)]);
        assert_eq!(
            route.points(),
            &[Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(10.0, -10.0)]
        );

        let path = route.path().unwrap();
        let visited: Vec<(f32, f32)> = path.points().iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(visited, vec![(0.0, 0.0), (10.0, 0.0), (10.0, -10.0)]);
    }

    #[test]
    fn test_short_routes_are_empty() {
        assert!(RoutePath::new(&[]).is_empty());
        assert!(RoutePath::new(&[Vec2::new(5.0, 5.0)]).is_empty());
        assert!(RoutePath::default().path().is_none());
    }

    #[test]
    fn test_transform_centres_origin() {
        let mut map = PanelState::new(1920, 1080);
        map.layout_map(HD, false);
        let t = route_transform(HD, &map);
        assert!(close(t.transform_point2(Vec2::ZERO), Vec2::new(960.0, 540.0)));
        // Route Y-up point (0, 100) is stored as (0, -100) and lands above centre
        assert!(close(t.transform_point2(Vec2::new(0.0, -100.0)), Vec2::new(960.0, 440.0)));
    }

    #[test]
    fn test_transform_follows_user_edits() {
        let mut map = PanelState::new(3840, 2160);
        map.user_x = 20.0;
        map.user_y = 10.0;
        map.user_angle = 90.0;
        map.layout_map(HD, false);
        let t = route_transform(HD, &map);

        // Scale 0.5, rotated 90 degrees counter-clockwise on screen
        let p = t.transform_point2(Vec2::new(100.0, 0.0));
        assert!(close(p, Vec2::new(980.0, 480.0)));
    }

    #[test]
    fn test_transform_matches_panel_vertex_matrix() {
        let mut map = PanelState::new(1000, 1000);
        map.x = -30.0;
        map.user_angle = 30.0;
        map.user_scale = 0.7;
        map.layout_map(HD, false);

        // Map pixel (u, v) with v Y-up relative to texture centre
        let (u, v) = (120.0f32, 80.0f32);
        let clip = map.vertex_matrix() * glam::Vec4::new(u, v, 0.0, 1.0);
        let gl_px = Vec2::new((clip.x + 1.0) * 960.0, (1.0 - clip.y) * 540.0);

        let canvas = route_transform(HD, &map).transform_point2(Vec2::new(u, -v));
        assert!(close(gl_px, canvas));
    }

    #[test]
    fn test_parse_route_json() {
        let points = parse_route_json("[[0, 0], [10.5, -2], [3, 4]]").unwrap();
        assert_eq!(points, vec![Vec2::ZERO, Vec2::new(10.5, -2.0), Vec2::new(3.0, 4.0)]);
        assert!(parse_route_json("[]").unwrap().is_empty());
        assert!(parse_route_json("[[1, 2, 3]]").is_err());
    }

    #[test]
    fn test_skia_transform_layout() {
        let affine = Affine2::from_translation(Vec2::new(5.0, 6.0)) * Affine2::from_scale(Vec2::new(2.0, 3.0));
        let t = to_skia_transform(affine);
        assert_eq!((t.sx, t.sy, t.tx, t.ty), (2.0, 3.0, 5.0, 6.0));
        assert_eq!((t.kx, t.ky), (0.0, 0.0));
    }
}
