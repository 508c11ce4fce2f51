//! Abstraction over whatever delivers ranging bundles.
//!
//! Beacon scanning itself happens outside this crate. A [`RangingSource`]
//! hands over one bundle of `(beacon_id, rssi)` readings per ranging cycle;
//! [`ReplaySource`] plays back recorded or scripted bundles.

pub mod replay;

pub use replay::ReplaySource;

use thiserror::Error;

use crate::core::BeaconSample;

#[derive(Debug, Error)]
pub enum RangingError {
    #[error("failed to read ranging recording '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed ranging recording: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("ranging source disconnected")]
    Disconnected,
}

pub type RangingResult<T> = Result<T, RangingError>;

/// One ranging cycle's worth of readings
pub type RangingBundle = Vec<BeaconSample>;

/// Source of ranging bundles
pub trait RangingSource {
    /// Next bundle, `Ok(None)` once the source is exhausted
    fn next_bundle(&mut self) -> RangingResult<Option<RangingBundle>>;

    fn status(&self) -> RangingStatus;

    fn is_connected(&self) -> bool;

    /// Rewind or reconnect
    fn reset(&mut self) -> RangingResult<()>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangingStatus {
    pub connected: bool,
    pub bundles_delivered: u64,
    pub error_count: u32,
}

impl RangingStatus {
    pub fn is_healthy(&self) -> bool {
        self.connected && self.error_count < 10
    }
}
