//! Screen space to normalized absolute pointer space

use crate::types::Point;
use serde::{Deserialize, Serialize};

/// Upper bound of the normalized absolute coordinate range
pub const NORMALIZED_MAX: u16 = 65535;

/// Bounding box of all monitors combined. The origin is negative when a
/// monitor sits left of or above the primary one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualDesktop {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl VirtualDesktop {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.width <= 1 || self.height <= 1
    }
}

/// Converts between screen pixels and the 0..=65535 injection space for one
/// snapshot of the virtual desktop. Build a new mapper per gesture.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateMapper {
    desktop: VirtualDesktop,
}

impl CoordinateMapper {
    pub fn new(desktop: VirtualDesktop) -> Self {
        Self { desktop }
    }

    pub fn desktop(&self) -> VirtualDesktop {
        self.desktop
    }

    /// A degenerate box (width or height <= 1) maps every point to (0, 0).
    pub fn to_normalized(&self, screen_x: f64, screen_y: f64) -> (u16, u16) {
        if self.desktop.is_degenerate() {
            return (0, 0);
        }
        (
            normalize_axis(screen_x, self.desktop.x, self.desktop.width),
            normalize_axis(screen_y, self.desktop.y, self.desktop.height),
        )
    }

    /// Inverse of [`to_normalized`](Self::to_normalized), within one pixel.
    pub fn to_screen(&self, u: u16, v: u16) -> (i32, i32) {
        if self.desktop.is_degenerate() {
            return (self.desktop.x, self.desktop.y);
        }
        (
            denormalize_axis(u, self.desktop.x, self.desktop.width),
            denormalize_axis(v, self.desktop.y, self.desktop.height),
        )
    }

    /// Linear path from `start` to `end` in `steps` points, `start` excluded
    /// and `end` included. Each point is normalized on its own, so rounding
    /// drift between neighbours is expected.
    pub fn interpolate(&self, start: Point, end: Point, steps: u32) -> Vec<(u16, u16)> {
        interpolate_points(start, end, steps)
            .into_iter()
            .map(|p| self.to_normalized(p.x, p.y))
            .collect()
    }
}

/// `p_i = start + (end - start) * i / n` for `i = 1..=n`. `n` of 0 is treated as 1.
pub fn interpolate_points(start: Point, end: Point, steps: u32) -> Vec<Point> {
    let n = steps.max(1);
    (1..=n)
        .map(|i| {
            let t = i as f64 / n as f64;
            Point::new(
                start.x + (end.x - start.x) * t,
                start.y + (end.y - start.y) * t,
            )
        })
        .collect()
}

fn normalize_axis(value: f64, origin: i32, extent: i32) -> u16 {
    let span = (extent - 1) as f64;
    let scaled = ((value - origin as f64) * NORMALIZED_MAX as f64 / span).round();
    scaled.clamp(0.0, NORMALIZED_MAX as f64) as u16
}

fn denormalize_axis(value: u16, origin: i32, extent: i32) -> i32 {
    let span = (extent - 1) as f64;
    origin + (value as f64 * span / NORMALIZED_MAX as f64).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corners_map_to_range_ends() {
        let mapper = CoordinateMapper::new(VirtualDesktop::new(0, 0, 1920, 1080));
        assert_eq!(mapper.to_normalized(0.0, 0.0), (0, 0));
        assert_eq!(mapper.to_normalized(1919.0, 1079.0), (65535, 65535));
    }

    #[test]
    fn test_negative_origin_and_clamping() {
        let mapper = CoordinateMapper::new(VirtualDesktop::new(-1920, -200, 3840, 1280));
        assert_eq!(mapper.to_normalized(-1920.0, -200.0), (0, 0));
        assert_eq!(mapper.to_normalized(-5000.0, 99999.0), (0, 65535));
        let (u, _) = mapper.to_normalized(0.0, 0.0);
        assert!((32760..=32790).contains(&u), "u was {u}");
    }

    #[test]
    fn test_round_trip_within_one_pixel() {
        let desktops = [
            VirtualDesktop::new(0, 0, 1920, 1080),
            VirtualDesktop::new(-1280, -300, 4480, 1440),
            VirtualDesktop::new(0, 0, 2, 2),
            VirtualDesktop::new(100, 50, 7, 3),
        ];
        for desktop in desktops {
            let mapper = CoordinateMapper::new(desktop);
            let xs = (desktop.x..desktop.x + desktop.width).step_by(13);
            for x in xs {
                for y in (desktop.y..desktop.y + desktop.height).step_by(11) {
                    let (u, v) = mapper.to_normalized(x as f64, y as f64);
                    let (sx, sy) = mapper.to_screen(u, v);
                    assert!((sx - x).abs() <= 1, "{desktop:?}: x {x} -> {u} -> {sx}");
                    assert!((sy - y).abs() <= 1, "{desktop:?}: y {y} -> {v} -> {sy}");
                }
            }
        }
    }

    #[test]
    fn test_degenerate_box_maps_to_origin() {
        let mapper = CoordinateMapper::new(VirtualDesktop::new(0, 0, 1, 1080));
        assert_eq!(mapper.to_normalized(0.0, 0.0), (0, 0));
        assert_eq!(mapper.to_normalized(500.0, 700.0), (0, 0));
        let mapper = CoordinateMapper::new(VirtualDesktop::new(10, 10, 800, 0));
        assert_eq!(mapper.to_normalized(400.0, 5.0), (0, 0));
    }

    #[test]
    fn test_interpolation_includes_end_excludes_start() {
        let points = interpolate_points(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 5);
        assert_eq!(points.len(), 5);
        for (point, expected) in points.iter().zip([20.0, 40.0, 60.0, 80.0, 100.0]) {
            assert!((point.x - expected).abs() < 1e-9);
            assert_eq!(point.y, 0.0);
        }
        assert_eq!(
            interpolate_points(Point::new(1.0, 1.0), Point::new(9.0, 9.0), 0),
            vec![Point::new(9.0, 9.0)]
        );
    }
}
