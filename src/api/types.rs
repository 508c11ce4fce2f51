//! Types shared by the session-facing APIs

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{BeaconDistance, BeaconId, PositionEstimate, BEACONS_PER_SOLVE};
use crate::pipeline::SessionState;
use crate::ranging::RangingError;
use crate::validation::error::PositioningError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("ranging source failed: {0}")]
    Ranging(#[from] RangingError),

    #[error("invalid callback handle {0}")]
    InvalidHandle(u32),

    #[error("session worker has stopped")]
    WorkerStopped,

    #[error("session worker panicked")]
    WorkerPanicked,
}

/// Emitted on every successful solve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    /// Counts solves within the session, starting at 1
    pub sequence: u64,
    pub estimate: PositionEstimate,
    pub nearest_beacon: BeaconId,
    pub distances: [BeaconDistance; BEACONS_PER_SOLVE],
}

/// Diagnostics delivered to event callbacks
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Whole tick dropped, per-beacon state untouched
    TickRejected { error: PositioningError },
    /// Samples kept, no new estimate this tick
    SolveSkipped { reason: PositioningError },
    StateChanged { old_state: SessionState, new_state: SessionState },
    /// The staged anchor feed became active
    RegistryLoaded { anchors: usize },
}

/// Rendering of position updates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

