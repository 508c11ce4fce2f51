use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::algorithms::CenterOfGravityFix;
use crate::core::{BeaconDistance, PositionEstimate, BEACONS_PER_SOLVE};
use crate::validation::error::{ErrorKind, PositioningError};

/// Lifecycle of a positioning session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No sample accepted yet
    Idle,
    /// Collecting samples, or the registry is still pending
    Accumulating,
    /// Tracked windows are full enough and anchors are loaded; solves run
    Ready,
}

/// Result of an accepted tick. Rejected ticks surface as `Err` instead.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Samples stored, windows not yet deep enough to solve
    Accumulating {
        distances: [BeaconDistance; BEACONS_PER_SOLVE],
    },
    Solved {
        distances: [BeaconDistance; BEACONS_PER_SOLVE],
        fix: CenterOfGravityFix,
    },
    /// Samples stored but the solve could not run; the prior estimate stands
    SolveSkipped {
        distances: [BeaconDistance; BEACONS_PER_SOLVE],
        reason: PositioningError,
    },
}

impl TickOutcome {
    pub fn distances(&self) -> &[BeaconDistance; BEACONS_PER_SOLVE] {
        match self {
            TickOutcome::Accumulating { distances }
            | TickOutcome::Solved { distances, .. }
            | TickOutcome::SolveSkipped { distances, .. } => distances,
        }
    }

    pub fn estimate(&self) -> Option<PositionEstimate> {
        match self {
            TickOutcome::Solved { fix, .. } => Some(fix.position),
            _ => None,
        }
    }
}

/// Running counters for one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub accepted_ticks: u64,
    pub rejected_ticks: u64,
    pub solves: u64,
    pub skipped_solves: u64,
    /// Rejections and skipped solves by cause
    pub failures: HashMap<ErrorKind, u64>,
}

impl SessionStats {
    pub fn record_outcome(&mut self, outcome: &TickOutcome) {
        self.accepted_ticks += 1;
        match outcome {
            TickOutcome::Solved { .. } => self.solves += 1,
            TickOutcome::SolveSkipped { reason, .. } => {
                self.skipped_solves += 1;
                *self.failures.entry(reason.kind()).or_insert(0) += 1;
            }
            TickOutcome::Accumulating { .. } => {}
        }
    }

    pub fn record_rejection(&mut self, error: &PositioningError) {
        self.rejected_ticks += 1;
        *self.failures.entry(error.kind()).or_insert(0) += 1;
    }

    pub fn failures_of(&self, kind: ErrorKind) -> u64 {
        self.failures.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_ticks(&self) -> u64 {
        self.accepted_ticks + self.rejected_ticks
    }
}
