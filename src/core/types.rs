//! Core data types for the positioning system

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Beacon major number, used as the anchor lookup key
pub type BeaconId = u16;

/// One raw ranging reading delivered by the beacon scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconSample {
    pub beacon_id: BeaconId,
    /// Received signal strength in dBm, 0 when the scanner had no reading
    pub rssi: i32,
}

impl BeaconSample {
    pub fn new(beacon_id: BeaconId, rssi: i32) -> Self {
        Self { beacon_id, rssi }
    }

    pub fn has_signal(&self) -> bool {
        self.rssi != 0
    }
}

/// Display metadata attached to an anchor. Never interpreted by the core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorPayload {
    pub name: String,
    pub developer: String,
    pub advisor: String,
    pub tool: String,
    pub motivation: String,
    pub summary: String,
}

/// Beacon with a fixed position on the floor plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorPoint {
    pub beacon_id: BeaconId,
    pub x: f64,
    pub z: f64,
    #[serde(default)]
    pub payload: AnchorPayload,
}

impl AnchorPoint {
    pub fn new(beacon_id: BeaconId, x: f64, z: f64) -> Self {
        Self {
            beacon_id,
            x,
            z,
            payload: AnchorPayload::default(),
        }
    }

    pub fn with_payload(mut self, payload: AnchorPayload) -> Self {
        self.payload = payload;
        self
    }

    /// Planar coordinate, z mapped onto the second axis
    pub fn planar(&self) -> Point2<f64> {
        Point2::new(self.x, self.z)
    }
}

/// Solved 2D position of the receiver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionEstimate {
    pub x: f64,
    pub y: f64,
}

impl PositionEstimate {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_point(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }
}

impl From<Point2<f64>> for PositionEstimate {
    fn from(point: Point2<f64>) -> Self {
        Self::new(point.x, point.y)
    }
}

/// Per-beacon distances produced by an accepted tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeaconDistance {
    pub beacon_id: BeaconId,
    /// Latest distance converted from RSSI (meters)
    pub raw_distance: f64,
    /// Kalman-smoothed distance over the beacon's sample window (meters)
    pub filtered_distance: f64,
}
