// Async scheduler around the perception engine
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::time::{Interval, MissedTickBehavior};

use crate::error::PerceptionResult;

use super::engine::PerceptionEngine;
use super::types::{PerceptionCommand, TickOutcome};

fn ticker(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

pub struct PerceptionLoop {
    engine: Arc<Mutex<PerceptionEngine>>,
    command_rx: mpsc::Receiver<PerceptionCommand>,
    interval: Duration,
    is_running: bool,
    should_exit: bool,
}

impl PerceptionLoop {
    pub fn new(engine: PerceptionEngine, command_rx: mpsc::Receiver<PerceptionCommand>) -> Self {
        let interval = engine.config().tick_interval;
        let is_running = engine.config().enabled;
        Self {
            engine: Arc::new(Mutex::new(engine)),
            command_rx,
            interval,
            is_running,
            should_exit: false,
        }
    }

    /// Shared handle to the engine, e.g. for inspecting it after `run` returns
    pub fn engine(&self) -> Arc<Mutex<PerceptionEngine>> {
        Arc::clone(&self.engine)
    }

    async fn process_command(&mut self, command: PerceptionCommand) -> Option<Duration> {
        match command {
            PerceptionCommand::Pause => {
                if self.is_running {
                    log::info!("⏸️ Perception paused");
                }
                self.is_running = false;
            }
            PerceptionCommand::Resume => {
                if !self.is_running {
                    log::info!("▶️ Perception resumed");
                }
                self.is_running = true;
            }
            PerceptionCommand::Shutdown => {
                log::info!("🛑 Perception shutdown requested");
                self.should_exit = true;
            }
            PerceptionCommand::UpdateInterval(period) => {
                log::debug!("⏱️ Perception interval updated to {:?}", period);
                self.interval = period;
                return Some(period);
            }
            PerceptionCommand::SetWaypoints(waypoints) => {
                self.engine.lock().await.set_waypoints(waypoints);
            }
            PerceptionCommand::Recalibrate => {
                log::info!("🗺️ Recalibration requested");
                self.engine.lock().await.recalibrate();
            }
        }
        None
    }

    /// Handle every queued command. Returns the new tick period if it changed.
    async fn drain_commands(&mut self) -> Option<Duration> {
        let mut new_period = None;
        loop {
            match self.command_rx.try_recv() {
                Ok(command) => {
                    if let Some(period) = self.process_command(command).await {
                        new_period = Some(period);
                    }
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    if !self.should_exit {
                        log::info!("🛑 Command channel closed, stopping perception");
                    }
                    self.should_exit = true;
                    break;
                }
            }
        }
        new_period
    }

    /// Run cycles until shutdown or a hard error
    pub async fn run(mut self) -> PerceptionResult<()> {
        log::info!("🚀 Perception loop started (interval {:?})", self.interval);
        let mut interval = ticker(self.interval);

        loop {
            interval.tick().await;

            if let Some(period) = self.drain_commands().await {
                interval = ticker(period);
            }
            if self.should_exit {
                break;
            }
            if !self.is_running {
                continue;
            }

            let engine = Arc::clone(&self.engine);
            let result = tokio::task::spawn_blocking(move || engine.blocking_lock().tick()).await?;
            match result {
                Ok(TickOutcome::Perceived) => {}
                Ok(outcome) => log::trace!("Perception cycle: {:?}", outcome),
                Err(e) if e.is_fatal() => {
                    log::error!("❌ Perception loop stopped: {}", e);
                    return Err(e);
                }
                Err(e) => log::warn!("⚠️ Perception cycle failed: {}", e),
            }
        }

        log::info!("👋 Perception loop ended");
        Ok(())
    }
}
