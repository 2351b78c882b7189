//! Template matching implementation
//!
//! Zero-mean normalized cross-correlation, evaluated at every offset where the
//! template fits inside the frame. Raw products come from imageproc's
//! cross-correlation; window statistics come from integral images.

use image::{ImageBuffer, Luma};
use imageproc::integral_image::{integral_image, integral_squared_image};
use imageproc::template_matching::{MatchTemplateMethod, find_extremes, match_template_parallel};

use super::types::{Match, Template};
use crate::capture::Frame;
use crate::error::{PerceptionError, PerceptionResult};

type Integral = ImageBuffer<Luma<u64>, Vec<u64>>;
type Scores = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Windows with less variance than this are treated as flat
const FLAT_VARIANCE: f64 = 1e-9;

/// Stateless template matcher; safe to share between threads
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateMatcher;

impl TemplateMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Find the single highest-confidence location of `template` in `frame`.
    ///
    /// Returns `Ok(None)` when the frame is smaller than the template. Ties go to
    /// the first location in raster order.
    pub fn match_best(&self, frame: &Frame, template: &Template) -> PerceptionResult<Option<Match>> {
        let Some(correlator) = Correlator::new(frame, template)? else {
            return Ok(None);
        };

        let (out_w, out_h) = correlator.output_dimensions();
        let scores: Scores =
            ImageBuffer::from_fn(out_w, out_h, |x, y| Luma([correlator.score_at(x, y)]));
        let extremes = find_extremes(&scores);

        let best = correlator.to_match(
            extremes.max_value_location.0,
            extremes.max_value_location.1,
            extremes.max_value,
        );
        log::debug!("🔍 Best '{}' match at {}", template.name, best);
        Ok(Some(best))
    }

    /// Find every location whose confidence reaches `threshold`, in raster order.
    ///
    /// Overlapping windows are not merged; use `Match::center` for reporting.
    pub fn match_all(
        &self,
        frame: &Frame,
        template: &Template,
        threshold: f32,
    ) -> PerceptionResult<Vec<Match>> {
        let Some(correlator) = Correlator::new(frame, template)? else {
            return Ok(Vec::new());
        };

        let (out_w, out_h) = correlator.output_dimensions();
        let mut matches = Vec::new();
        for y in 0..out_h {
            for x in 0..out_w {
                let score = correlator.score_at(x, y);
                if score >= threshold {
                    matches.push(correlator.to_match(x, y, score));
                }
            }
        }

        if !matches.is_empty() {
            log::debug!(
                "✅ Found {} '{}' locations >= {:.2}",
                matches.len(),
                template.name,
                threshold
            );
        }
        Ok(matches)
    }

    /// Whether any location reaches `threshold`; stops at the first hit.
    pub fn exists(&self, frame: &Frame, template: &Template, threshold: f32) -> PerceptionResult<bool> {
        let Some(correlator) = Correlator::new(frame, template)? else {
            return Ok(false);
        };

        let (out_w, out_h) = correlator.output_dimensions();
        let found = (0..out_h)
            .any(|y| (0..out_w).any(|x| correlator.score_at(x, y) >= threshold));
        Ok(found)
    }
}

/// Precomputed state for correlating one template against one frame
struct Correlator {
    sums: Vec<Integral>,
    squares: Vec<Integral>,
    /// Raw cross-correlation map per plane, one value per valid offset
    cross: Vec<Scores>,
    /// Template mean per plane
    template_means: Vec<f64>,
    template_norm: f64,
    template_width: u32,
    template_height: u32,
    frame_width: u32,
    frame_height: u32,
}

impl Correlator {
    fn new(frame: &Frame, template: &Template) -> PerceptionResult<Option<Self>> {
        let (template_width, template_height) = (template.width(), template.height());
        if template_width == 0 || template_height == 0 {
            return Err(PerceptionError::EmptyTemplate {
                template: template.name.clone(),
            });
        }

        let frame_raster = frame.raster();
        if frame_raster.channels() != template.raster().channels() {
            return Err(PerceptionError::ChannelMismatch {
                template: template.name.clone(),
                template_channels: template.raster().channels(),
                frame_channels: frame_raster.channels(),
            });
        }

        let pixel_count = f64::from(template_width * template_height);
        let template_planes = template.raster().planes();
        let mut template_means = Vec::with_capacity(template_planes.len());
        let mut norm_sq = 0.0;
        for plane in &template_planes {
            let (sum, sum_sq) = plane.as_raw().iter().fold((0.0, 0.0), |(s, sq), &v| {
                let v = f64::from(v);
                (s + v, sq + v * v)
            });
            norm_sq += (sum_sq - sum * sum / pixel_count).max(0.0);
            template_means.push(sum / pixel_count);
        }
        if norm_sq <= FLAT_VARIANCE {
            return Err(PerceptionError::FlatTemplate {
                template: template.name.clone(),
            });
        }

        let (frame_width, frame_height) = frame.dimensions();
        if template_width > frame_width || template_height > frame_height {
            log::debug!(
                "⚠️ Template '{}' {}x{} larger than frame {}x{}, no match possible",
                template.name,
                template_width,
                template_height,
                frame_width,
                frame_height
            );
            return Ok(None);
        }

        let frame_planes = frame_raster.planes();
        let sums = frame_planes.iter().map(|p| integral_image::<_, u64>(p)).collect();
        let squares = frame_planes
            .iter()
            .map(|p| integral_squared_image::<_, u64>(p))
            .collect();
        let cross = frame_planes
            .iter()
            .zip(&template_planes)
            .map(|(f, t)| match_template_parallel(f, t, MatchTemplateMethod::CrossCorrelation))
            .collect();

        Ok(Some(Self {
            sums,
            squares,
            cross,
            template_means,
            template_norm: norm_sq.sqrt(),
            template_width,
            template_height,
            frame_width,
            frame_height,
        }))
    }

    fn output_dimensions(&self) -> (u32, u32) {
        (
            self.frame_width - self.template_width + 1,
            self.frame_height - self.template_height + 1,
        )
    }

    fn to_match(&self, x: u32, y: u32, confidence: f32) -> Match {
        Match {
            x,
            y,
            width: self.template_width,
            height: self.template_height,
            confidence,
        }
    }

    /// Sum over the template-sized window at (x, y) of a padded integral image
    fn window_sum(&self, integral: &Integral, x: u32, y: u32) -> f64 {
        let (w, h) = (self.template_width, self.template_height);
        let at = |px: u32, py: u32| integral.get_pixel(px, py)[0];
        let total = (at(x + w, y + h) + at(x, y)) - (at(x + w, y) + at(x, y + h));
        total as f64
    }

    /// Zero-mean correlation at (x, y): sum(I*T) - mean(T) * sum(I), over the
    /// template norm times the window's standard deviation term
    fn score_at(&self, x: u32, y: u32) -> f32 {
        let n = f64::from(self.template_width * self.template_height);

        let mut numerator = 0.0;
        let mut window_var = 0.0;
        for (idx, cross) in self.cross.iter().enumerate() {
            let sum = self.window_sum(&self.sums[idx], x, y);
            let sum_sq = self.window_sum(&self.squares[idx], x, y);
            window_var += (sum_sq - sum * sum / n).max(0.0);
            numerator += f64::from(cross.get_pixel(x, y)[0]) - self.template_means[idx] * sum;
        }

        if window_var <= FLAT_VARIANCE {
            return 0.0;
        }
        (numerator / (self.template_norm * window_var.sqrt())).clamp(-1.0, 1.0) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Raster;
    use crate::test_support::{canvas, gray_frame, gray_template, noise, paste, patterned};
    use image::{GrayImage, Rgb, RgbImage};

    #[test]
    fn test_presence_detection_full_hd() {
        let player = patterned(8, 8, 2);
        let mut screen = canvas(1920, 1080, 60);
        paste(&mut screen, &player, 400, 300);

        let matcher = TemplateMatcher::new();
        let best = matcher
            .match_best(&gray_frame(screen), &gray_template("player", player))
            .unwrap()
            .expect("frame is larger than template");

        assert!(best.confidence >= 0.99, "Expected near-perfect match, got {:.4}", best.confidence);
        assert!(best.x.abs_diff(400) <= 1, "Expected x around 400, got {}", best.x);
        assert!(best.y.abs_diff(300) <= 1, "Expected y around 300, got {}", best.y);
        assert_eq!(best.bottom_right(), (best.x + 8, best.y + 8));
    }

    #[test]
    fn test_rgb_template_in_rgb_frame() {
        let template_rgb = RgbImage::from_fn(6, 5, |x, y| {
            Rgb([noise(x, y, 11), noise(x, y, 12), noise(x, y, 13)])
        });
        let mut screen = RgbImage::from_pixel(60, 40, Rgb([10, 200, 30]));
        image::imageops::replace(&mut screen, &template_rgb, 21, 17);

        let frame = Frame::new(Raster::Rgb(screen));
        let template = Template::new("icon", Raster::Rgb(template_rgb));
        let best = TemplateMatcher::new().match_best(&frame, &template).unwrap().unwrap();

        assert_eq!((best.x, best.y), (21, 17));
        assert!(best.confidence > 0.99);
    }

    #[test]
    fn test_channel_mismatch_fails_fast() {
        let frame = Frame::new(Raster::Rgb(RgbImage::from_pixel(30, 30, Rgb([1, 2, 3]))));
        let template = gray_template("player", patterned(5, 5, 2));
        let matcher = TemplateMatcher::new();

        assert!(matches!(
            matcher.match_best(&frame, &template),
            Err(PerceptionError::ChannelMismatch { template_channels: 1, frame_channels: 3, .. })
        ));
        assert!(matcher.match_all(&frame, &template, 0.8).is_err());
        assert!(matcher.exists(&frame, &template, 0.8).is_err());
    }

    #[test]
    fn test_frame_smaller_than_template() {
        let frame = gray_frame(patterned(6, 20, 7));
        let template = gray_template("wide", patterned(10, 4, 8));
        let matcher = TemplateMatcher::new();

        assert!(matcher.match_best(&frame, &template).unwrap().is_none());
        assert!(matcher.match_all(&frame, &template, 0.0).unwrap().is_empty());
        assert!(!matcher.exists(&frame, &template, -1.0).unwrap());
    }

    #[test]
    fn test_degenerate_templates_rejected() {
        let frame = gray_frame(patterned(20, 20, 7));
        let matcher = TemplateMatcher::new();

        let empty = gray_template("empty", GrayImage::new(0, 0));
        assert!(matches!(
            matcher.match_best(&frame, &empty),
            Err(PerceptionError::EmptyTemplate { .. })
        ));

        let flat = gray_template("flat", canvas(4, 4, 128));
        assert!(matches!(
            matcher.exists(&frame, &flat, 0.5),
            Err(PerceptionError::FlatTemplate { .. })
        ));
    }

    #[test]
    fn test_flat_frame_scores_zero() {
        let frame = gray_frame(canvas(30, 30, 77));
        let template = gray_template("rune", patterned(7, 7, 3));
        let matcher = TemplateMatcher::new();

        let best = matcher.match_best(&frame, &template).unwrap().unwrap();
        assert_eq!(best.confidence, 0.0);
        assert_eq!((best.x, best.y), (0, 0), "Ties resolve to the first offset");
        assert!(!matcher.exists(&frame, &template, 0.1).unwrap());
    }

    #[test]
    fn test_match_all_reports_every_copy() {
        let rune = patterned(7, 7, 3);
        let mut screen = canvas(80, 60, 20);
        paste(&mut screen, &rune, 10, 10);
        paste(&mut screen, &rune, 40, 25);

        let matches = TemplateMatcher::new()
            .match_all(&gray_frame(screen), &gray_template("rune", rune), 0.95)
            .unwrap();

        let centers: Vec<(u32, u32)> = matches.iter().map(|m| m.center()).collect();
        // 25 + 3.5 rounds to the even row 28
        assert_eq!(centers, vec![(14, 14), (44, 28)]);
        assert!(matches.iter().all(|m| m.confidence >= 0.95));
    }

    #[test]
    fn test_threshold_monotonicity() {
        let marker = patterned(8, 8, 2);
        let mut degraded = marker.clone();
        for (i, pixel) in degraded.pixels_mut().enumerate() {
            if i % 5 == 0 {
                pixel[0] = 255 - pixel[0];
            }
        }
        let mut screen = patterned(90, 70, 99);
        paste(&mut screen, &marker, 12, 9);
        paste(&mut screen, &degraded, 60, 40);

        let frame = gray_frame(screen);
        let template = gray_template("player", marker);
        let matcher = TemplateMatcher::new();

        let counts: Vec<usize> = [0.8, 0.85, 0.9, 0.95]
            .iter()
            .map(|&t| matcher.match_all(&frame, &template, t).unwrap().len())
            .collect();

        assert!(counts.windows(2).all(|w| w[0] >= w[1]), "Counts increased: {counts:?}");
        assert!(counts[3] >= 1, "Exact copy must survive the strictest threshold");
    }

    #[test]
    fn test_exists_agrees_with_match_all() {
        let marker = patterned(6, 6, 4);
        let mut with_marker = patterned(40, 30, 50);
        paste(&mut with_marker, &marker, 20, 11);
        let frames = [gray_frame(with_marker), gray_frame(patterned(40, 30, 51))];
        let template = gray_template("buff", marker);
        let matcher = TemplateMatcher::new();

        for frame in &frames {
            for threshold in [0.3, 0.8, 0.95, 0.999] {
                let any = matcher.exists(frame, &template, threshold).unwrap();
                let all = matcher.match_all(frame, &template, threshold).unwrap();
                assert_eq!(any, !all.is_empty(), "Disagreement at threshold {threshold}");
            }
        }
    }

    #[test]
    fn test_scores_match_direct_correlation() {
        let frame_img = patterned(24, 18, 21);
        let template_img = patterned(5, 4, 22);
        let frame = gray_frame(frame_img.clone());
        let template = gray_template("tpl", template_img.clone());

        let direct = |ox: u32, oy: u32| -> f64 {
            let (tw, th) = template_img.dimensions();
            let n = f64::from(tw * th);
            let window: Vec<f64> = (0..th)
                .flat_map(|y| (0..tw).map(move |x| (x, y)))
                .map(|(x, y)| f64::from(frame_img.get_pixel(ox + x, oy + y)[0]))
                .collect();
            let tpl: Vec<f64> = template_img.as_raw().iter().map(|&v| f64::from(v)).collect();
            let wm = window.iter().sum::<f64>() / n;
            let tm = tpl.iter().sum::<f64>() / n;
            let num: f64 = window.iter().zip(&tpl).map(|(w, t)| (w - wm) * (t - tm)).sum();
            let wn: f64 = window.iter().map(|w| (w - wm).powi(2)).sum::<f64>().sqrt();
            let tn: f64 = tpl.iter().map(|t| (t - tm).powi(2)).sum::<f64>().sqrt();
            num / (wn * tn)
        };

        let all = TemplateMatcher::new().match_all(&frame, &template, -1.0).unwrap();
        assert_eq!(all.len(), 20 * 15, "Every offset is scored");
        for m in all.iter().step_by(7) {
            let expected = direct(m.x, m.y);
            assert!(
                (f64::from(m.confidence) - expected).abs() < 1e-4,
                "Score at ({},{}) was {} but direct correlation gives {}",
                m.x,
                m.y,
                m.confidence,
                expected
            );
        }
    }
}
