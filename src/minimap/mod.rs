//! Minimap geometry: calibration against the corner template and conversion
//! between minimap pixels and resolution-independent relative coordinates.

pub mod calibrator;
pub mod coords;

pub use calibrator::{MinimapCalibrator, MinimapGeometry, MinimapInsets, Verification};
pub use coords::{CoordinateMapper, RelPoint, Waypoint, nearest_waypoint, to_absolute, to_relative};
