// Capture module - frame acquisition from the live display or recordings.
// Frames are immutable once produced; every consumer gets its own copy.

pub mod replay;
pub mod screen;
pub mod types;


pub use replay::ReplaySource;
pub use screen::{ScreenCapture, XcapGrabber};
pub use types::{CaptureRegion, ColorModel, DisplayGrabber, Frame, FrameSource, PixelRect, Raster, RetryPolicy};
