/// Template matching module for marker detection in screen frames
///
/// This module provides:
/// - Zero-mean normalized cross-correlation with confidence in [-1, 1]
/// - Best-match, all-matches and presence queries with caller-supplied thresholds
/// - Fail-fast validation of color models and degenerate templates
pub mod matcher;
pub mod types;

pub use matcher::TemplateMatcher;
pub use types::{Match, Template};
