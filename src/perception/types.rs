// Commands and cycle outcomes for the perception loop
use std::time::Duration;

use crate::minimap::Waypoint;

#[derive(Debug, Clone)]
pub enum PerceptionCommand {
    Pause,
    Resume,
    Shutdown,
    UpdateInterval(Duration),
    SetWaypoints(Vec<Waypoint>), // Replaces the candidate set for rune lookups
    Recalibrate,                 // Drop the minimap geometry and find it again
}

/// What a single perception cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Capture failed; state left untouched
    NoFrame,
    /// No usable minimap in the frame; published with `calibrated = false`
    CalibrationPending,
    Perceived,
}
