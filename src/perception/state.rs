//! The published perception record and its single-writer channel

use serde::Serialize;
use tokio::sync::watch;

use crate::minimap::{MinimapGeometry, RelPoint, Waypoint};

/// Everything the perception loop currently knows about the screen.
///
/// Positions are relative minimap coordinates. Rune and alert flags are
/// edge-triggered: they are true only while the marker is visible.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerceptionState {
    pub calibrated: bool,
    pub minimap: Option<MinimapGeometry>,
    /// Last confidently detected player position; kept while the marker is missing
    pub player_position: Option<RelPoint>,
    /// Cycles since the player marker was last seen
    pub player_missed_ticks: u32,
    pub rune_active: bool,
    pub rune_position: Option<RelPoint>,
    /// Registered waypoint closest to the active rune
    pub rune_waypoint: Option<Waypoint>,
    pub rune_buff_active: bool,
    pub alert_active: bool,
    /// Completed perception cycles
    pub tick: u64,
}

/// Publishing half of the state channel. Only the perception engine holds one.
#[derive(Debug)]
pub struct StateWriter {
    tx: watch::Sender<PerceptionState>,
}

impl StateWriter {
    /// Replace the published record; readers never see a partial update
    pub fn publish(&self, state: PerceptionState) {
        self.tx.send_replace(state);
    }

    pub fn subscribe(&self) -> StateReader {
        StateReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read handle for consumers; clone freely
#[derive(Debug, Clone)]
pub struct StateReader {
    rx: watch::Receiver<PerceptionState>,
}

impl StateReader {
    /// Consistent copy of the latest published record
    pub fn snapshot(&self) -> PerceptionState {
        self.rx.borrow().clone()
    }

    /// Wait for the next publication. Returns false once the writer is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

pub fn perception_state_channel() -> (StateWriter, StateReader) {
    let (tx, rx) = watch::channel(PerceptionState::default());
    (StateWriter { tx }, StateReader { rx })
}
