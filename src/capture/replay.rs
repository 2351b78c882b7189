//! Recorded frame playback for offline runs and tests

use std::collections::VecDeque;
use std::path::Path;

use super::types::{CaptureRegion, ColorModel, Frame, FrameSource, PixelRect, Raster};
use crate::error::{PerceptionError, PerceptionResult};

/// Serves pre-recorded frames in order. An empty slot (`None`) plays back as a
/// failed capture, which lets callers script capture outages.
pub struct ReplaySource {
    frames: VecDeque<Option<Raster>>,
    looping: bool,
}

impl ReplaySource {
    pub fn new(frames: Vec<Option<Raster>>, looping: bool) -> Self {
        Self {
            frames: frames.into(),
            looping,
        }
    }

    pub fn from_rasters(rasters: Vec<Raster>, looping: bool) -> Self {
        Self::new(rasters.into_iter().map(Some).collect(), looping)
    }

    /// Load screenshots from disk as RGB frames
    pub fn from_files<P: AsRef<Path>>(paths: &[P], looping: bool) -> PerceptionResult<Self> {
        let mut rasters = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let image = image::open(path).map_err(|source| PerceptionError::AssetLoad {
                path: path.to_path_buf(),
                source,
            })?;
            log::debug!(
                "🎞️ Loaded replay frame {} ({}x{})",
                path.display(),
                image.width(),
                image.height()
            );
            rasters.push(Raster::from_dynamic(image, ColorModel::Rgb));
        }
        Ok(Self::from_rasters(rasters, looping))
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for ReplaySource {
    fn capture(&mut self, region: Option<CaptureRegion>) -> Option<Frame> {
        let slot = self.frames.pop_front()?;
        if self.looping {
            self.frames.push_back(slot.clone());
        }
        let Some(raster) = slot else {
            log::warn!("⚠️ Replay slot has no frame, skipping cycle");
            return None;
        };

        // Recorded frames start at the screen origin
        let raster = match region {
            Some(r) if r.left >= 0 && r.top >= 0 => {
                match raster.crop(PixelRect::new(r.left as u32, r.top as u32, r.width, r.height)) {
                    Ok(cropped) => cropped,
                    Err(e) => {
                        log::warn!("⚠️ Replay frame does not cover {:?}: {}", r, e);
                        return None;
                    }
                }
            }
            Some(r) => {
                log::warn!("⚠️ Replay frames cannot serve negative region {:?}", r);
                return None;
            }
            None => raster,
        };
        Some(Frame::new(raster))
    }
}
