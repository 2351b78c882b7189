//! One synchronous perception cycle: capture, calibrate, locate markers, publish

use std::sync::Arc;

use crate::capture::{Frame, FrameSource, PixelRect};
use crate::error::PerceptionResult;
use crate::minimap::{MinimapCalibrator, MinimapGeometry, Verification, Waypoint, nearest_waypoint};
use crate::template_matching::TemplateMatcher;

use super::config::PerceptionConfig;
use super::state::{PerceptionState, StateWriter};
use super::templates::TemplateSet;
use super::types::TickOutcome;

pub struct PerceptionEngine {
    source: Box<dyn FrameSource>,
    templates: Arc<TemplateSet>,
    matcher: TemplateMatcher,
    calibrator: MinimapCalibrator,
    config: PerceptionConfig,
    waypoints: Vec<Waypoint>,
    state: PerceptionState,
    writer: StateWriter,
    pending_logged: bool,
}

impl PerceptionEngine {
    pub fn new(
        source: Box<dyn FrameSource>,
        templates: Arc<TemplateSet>,
        config: PerceptionConfig,
        writer: StateWriter,
    ) -> Self {
        let calibrator = MinimapCalibrator::new(
            templates.minimap_corner.clone(),
            config.insets,
            config.calibration_threshold,
            config.invalidate_after_misses,
        );
        Self {
            source,
            templates,
            matcher: TemplateMatcher::new(),
            calibrator,
            config,
            waypoints: Vec::new(),
            state: PerceptionState::default(),
            writer,
            pending_logged: false,
        }
    }

    pub fn config(&self) -> &PerceptionConfig {
        &self.config
    }

    /// Last state this engine published
    pub fn state(&self) -> &PerceptionState {
        &self.state
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Replace the waypoints used to label rune positions. Takes effect on the next cycle.
    pub fn set_waypoints(&mut self, waypoints: Vec<Waypoint>) {
        log::debug!("📍 {} waypoints registered", waypoints.len());
        self.waypoints = waypoints;
    }

    /// Forget the minimap geometry; the next cycle calibrates from scratch.
    /// The rune position was relative to that geometry and is dropped with it.
    pub fn recalibrate(&mut self) {
        self.calibrator.invalidate();
        self.clear_rune();
        self.state.calibrated = false;
        self.state.minimap = None;
        self.writer.publish(self.state.clone());
    }

    pub fn tick(&mut self) -> PerceptionResult<TickOutcome> {
        let Some(frame) = self.source.capture(self.config.capture_region) else {
            return Ok(TickOutcome::NoFrame);
        };
        let frame = frame.into_model(self.templates.color_model());

        let Some(geometry) = self.resolve_geometry(&frame)? else {
            return self.publish_pending(&frame);
        };
        let minimap = match frame.crop(geometry.interior) {
            Ok(minimap) => minimap,
            Err(e) => {
                log::warn!("⚠️ Minimap no longer fits the frame, recalibrating: {}", e);
                self.calibrator.invalidate();
                return self.publish_pending(&frame);
            }
        };
        if self.pending_logged {
            log::info!("🗺️ Minimap located, perceiving");
            self.pending_logged = false;
        }

        self.update_player(&minimap, geometry)?;
        self.update_rune(&minimap, geometry)?;
        self.update_rune_buff(&frame)?;
        self.update_alert(&frame)?;

        self.state.calibrated = true;
        self.state.minimap = Some(geometry);
        self.state.tick += 1;
        self.writer.publish(self.state.clone());
        Ok(TickOutcome::Perceived)
    }

    fn resolve_geometry(&mut self, frame: &Frame) -> PerceptionResult<Option<MinimapGeometry>> {
        if !self.calibrator.is_calibrated() {
            return self.calibrator.calibrate(frame);
        }

        let tick = self.state.tick;
        let due = self
            .config
            .reverify_every
            .is_some_and(|every| every > 0 && tick > 0 && tick % every == 0);
        if due {
            match self.calibrator.verify(frame)? {
                Verification::Invalidated => return Ok(None),
                Verification::Missed { consecutive } => {
                    log::debug!("🗺️ Minimap corner not confirmed ({} in a row)", consecutive);
                }
                _ => {}
            }
        }
        Ok(self.calibrator.geometry())
    }

    /// Publish a cycle without minimap geometry. Screen-wide flags are still
    /// evaluated; rune fields need the minimap and are cleared.
    fn publish_pending(&mut self, frame: &Frame) -> PerceptionResult<TickOutcome> {
        if !self.pending_logged {
            log::info!("🗺️ Waiting for the minimap to calibrate...");
            self.pending_logged = true;
        }
        self.clear_rune();
        self.update_rune_buff(frame)?;
        self.update_alert(frame)?;

        self.state.calibrated = false;
        self.state.minimap = None;
        self.state.tick += 1;
        self.writer.publish(self.state.clone());
        Ok(TickOutcome::CalibrationPending)
    }

    fn clear_rune(&mut self) {
        if self.state.rune_active {
            log::info!("💎 Rune gone");
        }
        self.state.rune_active = false;
        self.state.rune_position = None;
        self.state.rune_waypoint = None;
    }

    fn update_player(&mut self, minimap: &Frame, geometry: MinimapGeometry) -> PerceptionResult<()> {
        let found = self
            .matcher
            .match_best(minimap, &self.templates.player)?
            .filter(|m| m.meets(self.config.player_threshold));

        match found {
            Some(player) => {
                self.state.player_position = Some(geometry.mapper().to_relative(player.center()));
                self.state.player_missed_ticks = 0;
            }
            None => {
                self.state.player_missed_ticks = self.state.player_missed_ticks.saturating_add(1);
                if self.state.player_missed_ticks == 1 {
                    log::debug!("👤 Player marker lost, keeping last position");
                }
            }
        }
        Ok(())
    }

    fn update_rune(&mut self, minimap: &Frame, geometry: MinimapGeometry) -> PerceptionResult<()> {
        let runes = self
            .matcher
            .match_all(minimap, &self.templates.rune, self.config.rune_threshold)?;

        let Some(rune) = runes.first() else {
            self.clear_rune();
            return Ok(());
        };

        let position = geometry.mapper().to_relative(rune.center());
        let waypoint = nearest_waypoint(&self.waypoints, position).cloned();
        if !self.state.rune_active {
            match &waypoint {
                Some(w) => log::info!(
                    "💎 Rune appeared at ({:.3}, {:.3}) near '{}'",
                    position.x,
                    position.y,
                    w.label
                ),
                None => log::info!("💎 Rune appeared at ({:.3}, {:.3})", position.x, position.y),
            }
        }
        self.state.rune_active = true;
        self.state.rune_position = Some(position);
        self.state.rune_waypoint = waypoint;
        Ok(())
    }

    fn update_rune_buff(&mut self, frame: &Frame) -> PerceptionResult<()> {
        let active = match self.buff_bar(frame) {
            Some(bar) => {
                let bar = frame.crop(bar)?;
                self.matcher
                    .exists(&bar, &self.templates.rune_buff, self.config.rune_buff_threshold)?
            }
            None => false,
        };
        if active != self.state.rune_buff_active {
            log::info!("✨ Rune buff {}", if active { "active" } else { "expired" });
        }
        self.state.rune_buff_active = active;
        Ok(())
    }

    fn update_alert(&mut self, frame: &Frame) -> PerceptionResult<()> {
        let active = self
            .matcher
            .exists(frame, &self.templates.elite, self.config.elite_threshold)?;
        if active && !self.state.alert_active {
            log::warn!("🚨 Elite boss warning on screen");
        } else if !active && self.state.alert_active {
            log::info!("🚨 Elite boss warning cleared");
        }
        self.state.alert_active = active;
        Ok(())
    }

    /// Top strip of the frame where buff icons are drawn
    fn buff_bar(&self, frame: &Frame) -> Option<PixelRect> {
        let (width, height) = frame.dimensions();
        let fraction = self.config.buff_bar_fraction.clamp(0.0, 1.0);
        let rows = (height as f32 * fraction).round() as u32;
        (rows > 0 && width > 0).then(|| PixelRect::new(0, 0, width, rows.min(height)))
    }
}
