//! Live display capture backed by `xcap`

use image::{DynamicImage, RgbaImage};
use std::time::Instant;
use xcap::Monitor;

use super::types::{CaptureRegion, DisplayGrabber, FrameSource, Frame, PixelRect, Raster, RetryPolicy};
use crate::error::{PerceptionError, PerceptionResult};

/// Grabs the primary display (or the monitor under a region) through `xcap`
#[derive(Debug, Default, Clone, Copy)]
pub struct XcapGrabber;

impl XcapGrabber {
    fn select_monitor(region: Option<CaptureRegion>) -> PerceptionResult<Monitor> {
        match region {
            Some(r) => Ok(Monitor::from_point(r.left, r.top)?),
            None => Monitor::all()?
                .into_iter()
                .find(|m| m.is_primary())
                .ok_or(PerceptionError::MonitorNotFound { region }),
        }
    }

    /// Translate an absolute screen region into the monitor's image space
    fn monitor_rect(monitor: &Monitor, region: CaptureRegion) -> PerceptionResult<PixelRect> {
        let dx = i64::from(region.left) - i64::from(monitor.x());
        let dy = i64::from(region.top) - i64::from(monitor.y());
        let fits = dx >= 0
            && dy >= 0
            && dx + i64::from(region.width) <= i64::from(monitor.width())
            && dy + i64::from(region.height) <= i64::from(monitor.height());
        if !fits {
            return Err(PerceptionError::RegionOffMonitor {
                region,
                monitor: monitor.name().to_string(),
            });
        }
        Ok(PixelRect::new(dx as u32, dy as u32, region.width, region.height))
    }

    fn grab_display(region: Option<CaptureRegion>) -> PerceptionResult<Frame> {
        let start = Instant::now();
        let monitor = Self::select_monitor(region)?;
        let captured = monitor.capture_image()?;

        // Rebuild through raw bytes so the buffer type is always this crate's `image`
        let (width, height) = captured.dimensions();
        let rgba = RgbaImage::from_raw(width, height, captured.into_raw())
            .ok_or(PerceptionError::MalformedCapture { width, height })?;
        let raster = Raster::Rgb(DynamicImage::ImageRgba8(rgba).to_rgb8());

        let raster = match region {
            Some(r) => raster.crop(Self::monitor_rect(&monitor, r)?)?,
            None => raster,
        };

        log::debug!(
            "📸 Captured {}x{} from '{}' in {}ms",
            raster.width(),
            raster.height(),
            monitor.name(),
            start.elapsed().as_millis()
        );
        Ok(Frame::new(raster))
    }
}

impl DisplayGrabber for XcapGrabber {
    fn grab(&mut self, region: Option<CaptureRegion>) -> PerceptionResult<Frame> {
        Self::grab_display(region)
    }
}

/// Screen capture with bounded retry around a display backend
pub struct ScreenCapture<G = XcapGrabber> {
    grabber: G,
    retry: RetryPolicy,
    /// Set while consecutive captures fail, so a streak is reported once
    failing: bool,
}

impl ScreenCapture {
    pub fn new(retry: RetryPolicy) -> Self {
        Self::with_grabber(XcapGrabber, retry)
    }
}

impl<G: DisplayGrabber> ScreenCapture<G> {
    pub fn with_grabber(grabber: G, retry: RetryPolicy) -> Self {
        Self {
            grabber,
            retry,
            failing: false,
        }
    }
}

impl<G: DisplayGrabber> FrameSource for ScreenCapture<G> {
    fn capture(&mut self, region: Option<CaptureRegion>) -> Option<Frame> {
        let attempts = self.retry.attempts();
        for attempt in 1..=attempts {
            match self.grabber.grab(region) {
                Ok(frame) => {
                    if self.failing {
                        log::info!("✅ Screen capture recovered on attempt {}", attempt);
                        self.failing = false;
                    }
                    return Some(frame);
                }
                Err(e) => {
                    if self.failing {
                        log::debug!("⚠️ Capture attempt {}/{} failed: {}", attempt, attempts, e);
                    } else {
                        log::warn!(
                            "⚠️ Error while taking screenshot, retrying in {:?}: {}",
                            self.retry.backoff,
                            e
                        );
                        self.failing = true;
                    }
                    std::thread::sleep(self.retry.backoff);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use crate::test_support::{canvas, gray_frame};

    /// Fails a fixed number of grabs, then succeeds
    struct FlakyGrabber {
        failures_left: u32,
        calls: Arc<AtomicU32>,
    }

    impl DisplayGrabber for FlakyGrabber {
        fn grab(&mut self, region: Option<CaptureRegion>) -> PerceptionResult<Frame> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(PerceptionError::MonitorNotFound { region });
            }
            Ok(gray_frame(canvas(4, 4, 9)))
        }
    }

    fn flaky(failures: u32, max_attempts: u32, backoff: Duration) -> (ScreenCapture<FlakyGrabber>, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let grabber = FlakyGrabber {
            failures_left: failures,
            calls: Arc::clone(&calls),
        };
        let retry = RetryPolicy { max_attempts, backoff };
        (ScreenCapture::with_grabber(grabber, retry), calls)
    }

    #[test]
    fn test_retry_recovers_within_attempts() {
        let (mut capture, calls) = flaky(2, 3, Duration::ZERO);

        let frame = capture.capture(None);
        assert!(frame.is_some(), "Third attempt succeeds");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!capture.failing, "Recovery ends the failure streak");
    }

    #[test]
    fn test_exhausted_attempts_return_none() {
        let (mut capture, calls) = flaky(10, 3, Duration::ZERO);

        assert!(capture.capture(None).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 3, "Attempts are bounded by the policy");
        assert!(capture.failing);

        // A later call is a new bounded round in the same streak
        assert!(capture.capture(None).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert!(capture.failing);
    }

    #[test]
    fn test_backoff_sleeps_after_each_failure() {
        let (mut capture, calls) = flaky(10, 2, Duration::from_millis(20));

        let start = Instant::now();
        assert!(capture.capture(None).is_none());
        assert!(
            start.elapsed() >= Duration::from_millis(40),
            "Expected two backoffs, took {:?}",
            start.elapsed()
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let (mut capture, calls) = flaky(0, 0, Duration::ZERO);
        assert!(capture.capture(None).is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
