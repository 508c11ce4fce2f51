//! BLE Beacon Indoor Positioning
//!
//! Turns per-beacon RSSI readings into a smoothed 2D position: RSSI is
//! converted to a distance, each beacon's recent distances are Kalman-smoothed,
//! and three anchors are combined with a nearest-beacon / center-of-gravity
//! heuristic.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod validation;
pub mod anchors;
pub mod pipeline;
pub mod ranging;
pub mod utils;
pub mod api;

// Re-export commonly used types
pub use core::{AnchorPayload, AnchorPoint, BeaconDistance, BeaconId, BeaconSample, PositionEstimate};
pub use algorithms::{estimate_distance, CenterOfGravitySolver, DistanceModel};
pub use processing::{DistanceSmoother, FilterState, KalmanFilter, ScalarKalmanFilter, SampleWindow};
pub use validation::{PositioningError, PositioningResult};
pub use anchors::{parse_anchor_feed, AnchorRegistry, FeedError};
pub use pipeline::{PositioningSession, SessionState, SessionStats, TickOutcome};
pub use ranging::{RangingError, RangingSource, ReplaySource};
pub use utils::{ConfigError, ConfigurationManager, DistanceSource, PositioningConfig};
pub use api::{CallbackPositioningApi, OutputFormat, PositionUpdate, SessionEvent, SessionWorker};
