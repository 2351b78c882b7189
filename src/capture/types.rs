// Core capture types and the frame source trait
use image::{DynamicImage, GrayImage, RgbImage, imageops};
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::error::{PerceptionError, PerceptionResult};

/// Screen rectangle in absolute display pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CaptureRegion {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Rectangle in pixel coordinates of a particular image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Check if this rectangle lies entirely inside an image of the given size
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0 && self.height > 0 && self.right() <= width && self.bottom() <= height
    }
}

/// Pixel layout shared by frames and templates before they are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColorModel {
    Gray,
    Rgb,
}

impl ColorModel {
    pub fn channels(&self) -> u8 {
        match self {
            ColorModel::Gray => 1,
            ColorModel::Rgb => 3,
        }
    }
}

/// Owned pixel grid in one of the supported color models
#[derive(Debug, Clone, PartialEq)]
pub enum Raster {
    Gray(GrayImage),
    Rgb(RgbImage),
}

impl Raster {
    pub fn from_dynamic(image: DynamicImage, model: ColorModel) -> Self {
        match model {
            ColorModel::Gray => Raster::Gray(image.to_luma8()),
            ColorModel::Rgb => Raster::Rgb(image.to_rgb8()),
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            Raster::Gray(img) => img.width(),
            Raster::Rgb(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Raster::Gray(img) => img.height(),
            Raster::Rgb(img) => img.height(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn color_model(&self) -> ColorModel {
        match self {
            Raster::Gray(_) => ColorModel::Gray,
            Raster::Rgb(_) => ColorModel::Rgb,
        }
    }

    pub fn channels(&self) -> u8 {
        self.color_model().channels()
    }

    /// Convert to the requested color model (no copy when already there)
    pub fn into_model(self, model: ColorModel) -> Self {
        match (self, model) {
            (Raster::Rgb(img), ColorModel::Gray) => Raster::Gray(imageops::grayscale(&img)),
            (Raster::Gray(img), ColorModel::Rgb) => {
                Raster::Rgb(DynamicImage::ImageLuma8(img).to_rgb8())
            }
            (raster, _) => raster,
        }
    }

    pub fn crop(&self, rect: PixelRect) -> PerceptionResult<Self> {
        let (width, height) = self.dimensions();
        if !rect.fits_within(width, height) {
            return Err(PerceptionError::RegionOutOfBounds {
                rect,
                width,
                height,
            });
        }
        Ok(match self {
            Raster::Gray(img) => {
                Raster::Gray(imageops::crop_imm(img, rect.x, rect.y, rect.width, rect.height).to_image())
            }
            Raster::Rgb(img) => {
                Raster::Rgb(imageops::crop_imm(img, rect.x, rect.y, rect.width, rect.height).to_image())
            }
        })
    }

    /// Split into one grayscale plane per channel
    pub fn planes(&self) -> Vec<GrayImage> {
        match self {
            Raster::Gray(img) => vec![img.clone()],
            Raster::Rgb(img) => (0..3)
                .map(|c| {
                    GrayImage::from_fn(img.width(), img.height(), |x, y| {
                        image::Luma([img.get_pixel(x, y)[c]])
                    })
                })
                .collect(),
        }
    }
}

/// Immutable still image of the screen, stamped at capture time
#[derive(Debug, Clone)]
pub struct Frame {
    raster: Raster,
    captured_at: Instant,
}

impl Frame {
    pub fn new(raster: Raster) -> Self {
        Self {
            raster,
            captured_at: Instant::now(),
        }
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.raster.dimensions()
    }

    pub fn color_model(&self) -> ColorModel {
        self.raster.color_model()
    }

    /// Same frame in another color model, keeping the capture timestamp
    pub fn into_model(self, model: ColorModel) -> Self {
        Self {
            raster: self.raster.into_model(model),
            captured_at: self.captured_at,
        }
    }

    /// Sub-frame of `rect`, keeping the capture timestamp
    pub fn crop(&self, rect: PixelRect) -> PerceptionResult<Self> {
        Ok(Self {
            raster: self.raster.crop(rect)?,
            captured_at: self.captured_at,
        })
    }
}

/// Bounded backoff for transient capture failures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per capture call, at least 1
    pub max_attempts: u32,
    /// Pause after each failed attempt
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

// Display backend used by `ScreenCapture`; one call is one capture attempt
pub trait DisplayGrabber: Send {
    fn grab(&mut self, region: Option<CaptureRegion>) -> PerceptionResult<Frame>;
}

// Anything that can produce frames of the screen (live display, recorded files)
pub trait FrameSource: Send {
    /// Capture `region`, or the whole configured display when `None`.
    ///
    /// Transient failures are logged and reported as `None`; callers skip the cycle.
    fn capture(&mut self, region: Option<CaptureRegion>) -> Option<Frame>;
}
