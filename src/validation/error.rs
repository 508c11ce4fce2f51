use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::BeaconId;

/// Why a single beacon reading was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleIssue {
    /// The scanner reported RSSI 0
    NoSignal,
    /// The distance model returned the invalid marker
    NegativeDistance,
    /// Distance overflowed or the calibration produced NaN
    NonFiniteDistance,
}

/// Every failure the positioning core can report.
///
/// None of these are fatal: the session keeps its last good state and skips
/// the offending tick or solve.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PositioningError {
    #[error("invalid sample from beacon {beacon_id}: {issue:?} (rssi {rssi:?})")]
    InvalidSample {
        beacon_id: BeaconId,
        /// Raw reading, absent when the bad value was a distance handed in directly
        rssi: Option<i32>,
        issue: SampleIssue,
    },

    #[error("beacon {beacon_id} has no registered anchor")]
    UnknownBeacon { beacon_id: BeaconId },

    #[error("degenerate anchor geometry: nearest beacon {nearest_beacon} is {distance_to_cog} from the centroid")]
    DegenerateGeometry {
        nearest_beacon: BeaconId,
        distance_to_cog: f64,
    },

    #[error("insufficient beacons: {visible} visible, {required} required")]
    InsufficientBeacons { visible: usize, required: usize },

    #[error("anchor registry has not been loaded yet")]
    RegistryPending,

    #[error("filter residual covariance {residual_covariance} is not positive")]
    FilterDivergence { residual_covariance: f64 },
}

/// Coarse classification used for diagnostics counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidSample,
    UnknownBeacon,
    DegenerateGeometry,
    InsufficientBeacons,
    RegistryPending,
    FilterDivergence,
}

impl PositioningError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PositioningError::InvalidSample { .. } => ErrorKind::InvalidSample,
            PositioningError::UnknownBeacon { .. } => ErrorKind::UnknownBeacon,
            PositioningError::DegenerateGeometry { .. } => ErrorKind::DegenerateGeometry,
            PositioningError::InsufficientBeacons { .. } => ErrorKind::InsufficientBeacons,
            PositioningError::RegistryPending => ErrorKind::RegistryPending,
            PositioningError::FilterDivergence { .. } => ErrorKind::FilterDivergence,
        }
    }

    /// Whether the whole tick is dropped, as opposed to only its solve
    pub fn drops_tick(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidSample | ErrorKind::InsufficientBeacons | ErrorKind::FilterDivergence
        )
    }
}

pub type PositioningResult<T> = Result<T, PositioningError>;
