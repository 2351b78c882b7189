//! Conversion between minimap pixels and relative map coordinates
//!
//! Relative coordinates divide both axes by the minimap width: the vertical
//! axis is scaled by the aspect ratio so one unit means the same distance
//! horizontally and vertically.

use serde::Serialize;

/// Point in relative map space; inside the minimap both axes fall in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RelPoint {
    pub x: f64,
    pub y: f64,
}

impl RelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &RelPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_within_unit(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }
}

/// Maps points of one reference frame (normally the cropped minimap)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    width: u32,
    height: u32,
    aspect_ratio: f64,
}

impl CoordinateMapper {
    /// `dimensions` must be non-zero and `aspect_ratio` positive
    pub fn new(dimensions: (u32, u32), aspect_ratio: f64) -> Self {
        Self {
            width: dimensions.0,
            height: dimensions.1,
            aspect_ratio,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    /// Pixel to relative. Points outside the frame give values outside [0, 1];
    /// nothing is clamped.
    pub fn to_relative(&self, point: (u32, u32)) -> RelPoint {
        RelPoint {
            x: f64::from(point.0) / f64::from(self.width),
            y: f64::from(point.1) / (self.aspect_ratio * f64::from(self.height)),
        }
    }

    /// Relative to pixel, rounded to the nearest pixel
    pub fn to_absolute(&self, point: RelPoint) -> (i64, i64) {
        (
            (point.x * f64::from(self.width)).round() as i64,
            (point.y * self.aspect_ratio * f64::from(self.height)).round() as i64,
        )
    }
}

pub fn to_relative(point: (u32, u32), dimensions: (u32, u32), aspect_ratio: f64) -> RelPoint {
    CoordinateMapper::new(dimensions, aspect_ratio).to_relative(point)
}

pub fn to_absolute(point: RelPoint, dimensions: (u32, u32), aspect_ratio: f64) -> (i64, i64) {
    CoordinateMapper::new(dimensions, aspect_ratio).to_absolute(point)
}

/// A registered location in relative map space, owned by routine logic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Waypoint {
    pub label: String,
    pub position: RelPoint,
}

impl Waypoint {
    pub fn new(label: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            label: label.into(),
            position: RelPoint::new(x, y),
        }
    }
}

/// Closest waypoint to `target`; the first one wins on equal distance
pub fn nearest_waypoint(waypoints: &[Waypoint], target: RelPoint) -> Option<&Waypoint> {
    let mut best: Option<(&Waypoint, f64)> = None;
    for waypoint in waypoints {
        let d = waypoint.position.distance(&target);
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((waypoint, d)),
        }
    }
    best.map(|(waypoint, _)| waypoint)
}
