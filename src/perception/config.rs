//! Configuration for the perception loop

use std::time::Duration;

use crate::capture::{CaptureRegion, ColorModel, RetryPolicy};
use crate::minimap::MinimapInsets;

#[derive(Debug, Clone)]
pub struct PerceptionConfig {
    /// Whether cycles run at all; Pause/Resume flip this at runtime
    pub enabled: bool,
    /// Time between perception cycles
    pub tick_interval: Duration,
    /// Screen area to capture; `None` captures the whole primary display
    pub capture_region: Option<CaptureRegion>,
    /// Backoff for failed captures
    pub capture_retry: RetryPolicy,
    /// Color model that frames are converted to before matching
    pub color_model: ColorModel,
    /// Minimap border thickness
    pub insets: MinimapInsets,
    /// Minimum confidence for the minimap corner (0.0 to 1.0)
    pub calibration_threshold: f32,
    /// Re-check the minimap every N cycles (`None` disables re-checks)
    pub reverify_every: Option<u64>,
    /// Consecutive failed re-checks before the calibration is dropped
    pub invalidate_after_misses: u32,
    pub player_threshold: f32,
    pub rune_threshold: f32,
    pub rune_buff_threshold: f32,
    pub elite_threshold: f32,
    /// Height of the buff bar as a fraction of the frame height, measured from the top
    pub buff_bar_fraction: f32,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval: Duration::from_millis(50),
            capture_region: None,
            capture_retry: RetryPolicy::default(),
            color_model: ColorModel::Gray,
            insets: MinimapInsets::default(),
            calibration_threshold: 0.8,
            reverify_every: Some(100),
            invalidate_after_misses: 3,
            player_threshold: 0.8,
            rune_threshold: 0.9,
            rune_buff_threshold: 0.9,
            elite_threshold: 0.9,
            buff_bar_fraction: 0.125,
        }
    }
}

impl PerceptionConfig {
    pub fn with_region(mut self, region: CaptureRegion) -> Self {
        self.capture_region = Some(region);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Raise every match threshold to 0.95, leaving timing and capture settings alone
    pub fn with_precise_thresholds(mut self) -> Self {
        self.calibration_threshold = 0.95;
        self.player_threshold = 0.95;
        self.rune_threshold = 0.95;
        self.rune_buff_threshold = 0.95;
        self.elite_threshold = 0.95;
        self
    }
}

/// Configuration preset for high-precision marker localization
pub fn create_precise_config() -> PerceptionConfig {
    PerceptionConfig::default().with_precise_thresholds()
}

/// Configuration preset for offline replay: no capture backoff, fast ticks
pub fn create_replay_config() -> PerceptionConfig {
    PerceptionConfig {
        tick_interval: Duration::from_millis(10),
        capture_retry: RetryPolicy {
            max_attempts: 1,
            backoff: Duration::ZERO,
        },
        ..PerceptionConfig::default()
    }
}
