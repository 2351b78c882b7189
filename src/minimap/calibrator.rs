//! Minimap calibration: find the minimap on screen and derive its interior

use serde::Serialize;

use super::coords::CoordinateMapper;
use crate::capture::{Frame, PixelRect};
use crate::error::PerceptionResult;
use crate::template_matching::{Template, TemplateMatcher};

/// Border thickness around the minimap interior, in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MinimapInsets {
    /// Distance from the top of the capture to the interior (includes the title bar)
    pub top_border: u32,
    /// Thickness of the left, right and bottom borders
    pub side_border: u32,
    /// Lower bound for the interior's right and bottom edges
    pub min_corner: u32,
}

impl Default for MinimapInsets {
    fn default() -> Self {
        Self {
            top_border: 21,
            side_border: 8,
            min_corner: 75,
        }
    }
}

/// Calibrated interior rectangle of the minimap plus its width/height ratio
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MinimapGeometry {
    pub interior: PixelRect,
    pub aspect_ratio: f64,
    /// Confidence of the corner match this geometry came from
    pub confidence: f32,
}

impl PartialEq for MinimapGeometry {
    fn eq(&self, other: &Self) -> bool {
        self.interior == other.interior && self.aspect_ratio == other.aspect_ratio
    }
}

impl MinimapGeometry {
    /// Derive the interior from the bottom-right corner of the corner-template match
    pub fn from_corner(bottom_right: (u32, u32), insets: MinimapInsets, confidence: f32) -> Option<Self> {
        let left = insets.side_border;
        let top = insets.top_border;
        let right = insets.min_corner.max(bottom_right.0.saturating_sub(insets.side_border));
        let bottom = insets.min_corner.max(bottom_right.1.saturating_sub(insets.side_border));
        if right <= left || bottom <= top {
            return None;
        }

        let interior = PixelRect::new(left, top, right - left, bottom - top);
        Some(Self {
            interior,
            aspect_ratio: f64::from(interior.width) / f64::from(interior.height),
            confidence,
        })
    }

    /// Mapper for points expressed in the cropped minimap
    pub fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::new((self.interior.width, self.interior.height), self.aspect_ratio)
    }
}

/// Result of re-checking an established calibration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verification {
    Confirmed,
    Moved(MinimapGeometry),
    Missed { consecutive: u32 },
    Invalidated,
    Uncalibrated,
}

pub struct MinimapCalibrator {
    corner: Template,
    matcher: TemplateMatcher,
    insets: MinimapInsets,
    threshold: f32,
    invalidate_after_misses: u32,
    geometry: Option<MinimapGeometry>,
    misses: u32,
}

impl MinimapCalibrator {
    pub fn new(corner: Template, insets: MinimapInsets, threshold: f32, invalidate_after_misses: u32) -> Self {
        Self {
            corner,
            matcher: TemplateMatcher::new(),
            insets,
            threshold,
            invalidate_after_misses: invalidate_after_misses.max(1),
            geometry: None,
            misses: 0,
        }
    }

    pub fn geometry(&self) -> Option<MinimapGeometry> {
        self.geometry
    }

    pub fn is_calibrated(&self) -> bool {
        self.geometry.is_some()
    }

    pub fn invalidate(&mut self) {
        if self.geometry.take().is_some() {
            log::info!("🗺️ Minimap calibration cleared");
        }
        self.misses = 0;
    }

    /// Find the minimap corner in `frame` without touching stored state
    pub fn locate(&self, frame: &Frame) -> PerceptionResult<Option<MinimapGeometry>> {
        let Some(corner) = self.matcher.match_best(frame, &self.corner)? else {
            return Ok(None);
        };
        if !corner.meets(self.threshold) {
            log::debug!(
                "🗺️ Minimap corner below threshold: {:.3} < {:.3}",
                corner.confidence,
                self.threshold
            );
            return Ok(None);
        }

        let (width, height) = frame.dimensions();
        let geometry = MinimapGeometry::from_corner(corner.bottom_right(), self.insets, corner.confidence)
            .filter(|g| g.interior.fits_within(width, height));
        if geometry.is_none() {
            log::debug!("🗺️ Minimap corner at {} gives no usable interior in {}x{}", corner, width, height);
        }
        Ok(geometry)
    }

    /// Calibrate from `frame`. On failure any earlier geometry is kept as is.
    pub fn calibrate(&mut self, frame: &Frame) -> PerceptionResult<Option<MinimapGeometry>> {
        let Some(geometry) = self.locate(frame)? else {
            return Ok(None);
        };
        if self.geometry != Some(geometry) {
            log::info!(
                "🗺️ Minimap calibrated: interior {:?}, ratio {:.3} (confidence {:.3})",
                geometry.interior,
                geometry.aspect_ratio,
                geometry.confidence
            );
        }
        self.geometry = Some(geometry);
        self.misses = 0;
        Ok(Some(geometry))
    }

    /// Re-check the stored geometry against a new frame.
    ///
    /// A confident corner elsewhere replaces the geometry; repeated misses drop it.
    pub fn verify(&mut self, frame: &Frame) -> PerceptionResult<Verification> {
        let Some(current) = self.geometry else {
            return Ok(Verification::Uncalibrated);
        };

        match self.locate(frame)? {
            Some(found) if found == current => {
                self.misses = 0;
                Ok(Verification::Confirmed)
            }
            Some(found) => {
                log::info!(
                    "🗺️ Minimap moved: {:?} -> {:?}",
                    current.interior,
                    found.interior
                );
                self.geometry = Some(found);
                self.misses = 0;
                Ok(Verification::Moved(found))
            }
            None => {
                self.misses += 1;
                if self.misses >= self.invalidate_after_misses {
                    log::warn!(
                        "⚠️ Minimap not confirmed for {} checks, recalibrating",
                        self.misses
                    );
                    self.geometry = None;
                    self.misses = 0;
                    Ok(Verification::Invalidated)
                } else {
                    Ok(Verification::Missed {
                        consecutive: self.misses,
                    })
                }
            }
        }
    }
}
