// Template matching data types
use serde::Serialize;
use std::path::Path;

use crate::capture::{ColorModel, Raster};
use crate::error::{PerceptionError, PerceptionResult};

/// A named reference image, loaded once and never modified
#[derive(Clone, Debug)]
pub struct Template {
    /// Template label (e.g., "player", "minimap_corner")
    pub name: String,
    raster: Raster,
}

/// A single match result
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Match {
    /// X coordinate of the top-left corner in the searched frame
    pub x: u32,
    /// Y coordinate of the top-left corner in the searched frame
    pub y: u32,
    /// Width of the matched template
    pub width: u32,
    /// Height of the matched template
    pub height: u32,
    /// Normalized correlation coefficient (-1.0 to 1.0)
    pub confidence: f32,
}

impl Template {
    pub fn new(name: impl Into<String>, raster: Raster) -> Self {
        Self {
            name: name.into(),
            raster,
        }
    }

    /// Load a template image from disk in the given color model
    pub fn load(path: impl AsRef<Path>, model: ColorModel) -> PerceptionResult<Self> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|source| PerceptionError::AssetLoad {
            path: path.to_path_buf(),
            source,
        })?;

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self::new(name, Raster::from_dynamic(image, model)))
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    pub fn color_model(&self) -> ColorModel {
        self.raster.color_model()
    }
}

impl Match {
    pub fn bottom_right(&self) -> (u32, u32) {
        (self.x + self.width, self.y + self.height)
    }

    /// Center of the matched area, the point reported for marker positions.
    /// Half pixels round to even.
    pub fn center(&self) -> (u32, u32) {
        let half = |origin: u32, size: u32| (f64::from(origin) + f64::from(size) / 2.0).round_ties_even() as u32;
        (half(self.x, self.width), half(self.y, self.height))
    }

    pub fn meets(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }
}

impl std::fmt::Display for Match {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({},{}) {}x{} - {}%",
            self.x,
            self.y,
            self.width,
            self.height,
            (self.confidence * 100.0) as i32
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: u32, y: u32, width: u32, height: u32) -> Match {
        Match {
            x,
            y,
            width,
            height,
            confidence: 1.0,
        }
    }

    #[test]
    fn test_center_rounds_half_pixels_to_even() {
        // 7 px wide: 0 + 3.5 -> 4, 1 + 3.5 -> 4, 2 + 3.5 -> 6
        assert_eq!(at(0, 1, 7, 7).center(), (4, 4));
        assert_eq!(at(2, 3, 7, 5).center(), (6, 6));
        // Even sizes have no half pixel
        assert_eq!(at(50, 40, 8, 8).center(), (54, 44));
    }

    #[test]
    fn test_bottom_right_and_threshold() {
        let m = at(10, 20, 5, 6);
        assert_eq!(m.bottom_right(), (15, 26));
        assert!(m.meets(1.0));
        assert!(!m.meets(1.01));
    }
}
