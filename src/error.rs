use std::path::PathBuf;
use thiserror::Error;

use crate::capture::{CaptureRegion, PixelRect};

/// A specialized `Result` type for perception operations.
pub type PerceptionResult<T> = Result<T, PerceptionError>;

/// The error type for capture, matching, calibration and the perception loop.
#[derive(Debug, Error)]
pub enum PerceptionError {
    #[error("Screen capture failed: {source}")]
    Capture {
        #[from]
        source: xcap::XCapError,
    },

    #[error("No monitor available for capture region {region:?}")]
    MonitorNotFound { region: Option<CaptureRegion> },

    #[error("Capture region {region:?} is not inside monitor '{monitor}'")]
    RegionOffMonitor {
        region: CaptureRegion,
        monitor: String,
    },

    #[error("Captured buffer does not match its {width}x{height} dimensions")]
    MalformedCapture { width: u32, height: u32 },

    #[error("Rectangle {rect:?} exceeds image bounds ({width}x{height})")]
    RegionOutOfBounds {
        rect: PixelRect,
        width: u32,
        height: u32,
    },

    #[error(
        "Template '{template}' has {template_channels} channel(s) but the frame has {frame_channels}; convert both to the same color model first"
    )]
    ChannelMismatch {
        template: String,
        template_channels: u8,
        frame_channels: u8,
    },

    #[error("Template '{template}' has no pixels")]
    EmptyTemplate { template: String },

    #[error("Template '{template}' is uniform and cannot be correlated")]
    FlatTemplate { template: String },

    #[error("Failed to load template asset {path:?}: {source}")]
    AssetLoad {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Perception task failed to complete: {source}")]
    JoinError {
        #[from]
        source: tokio::task::JoinError,
    },
}

impl PerceptionError {
    /// Errors that point at a programming or configuration defect rather than a
    /// transient screen condition. These end the perception loop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PerceptionError::ChannelMismatch { .. }
                | PerceptionError::EmptyTemplate { .. }
                | PerceptionError::FlatTemplate { .. }
                | PerceptionError::AssetLoad { .. }
                | PerceptionError::JoinError { .. }
        )
    }
}
