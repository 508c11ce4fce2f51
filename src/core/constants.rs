//! Physical constants and system parameters

/// Expected RSSI at one meter for the deployed beacons (dBm)
pub const DEFAULT_CALIBRATED_POWER_DBM: f64 = -59.0;

/// Divisor applied after the exponential RSSI ratio conversion
pub const DISTANCE_SCALE_DIVISOR: f64 = 20.0;

/// Marker returned by the distance model for a reading with no signal
pub const INVALID_DISTANCE: f64 = -1.0;

/// Maximum raw distance samples kept per beacon
pub const SAMPLE_WINDOW_CAPACITY: usize = 6;

/// Samples a window must hold before its beacon takes part in a solve
pub const MIN_SAMPLES_TO_SOLVE: usize = 5;

/// Number of concurrently visible beacons the solver combines
pub const BEACONS_PER_SOLVE: usize = 3;

/// Fixed measurement-noise assumption for RSSI-derived distances
pub const DEFAULT_OBSERVATION_NOISE: f64 = 0.1;

/// Prior used at the start of every window replay
pub const DEFAULT_INITIAL_ESTIMATE: f64 = 0.0;
pub const DEFAULT_INITIAL_COVARIANCE: f64 = 1.0;

/// Coordinate units per meter of estimated distance
pub const DEFAULT_COORDINATE_UNITS_PER_METER: f64 = 1.0;

/// Anchors compiled into the floor deployment before the metadata feed arrives
/// (major id, x, z)
pub const SEED_ANCHORS: [(u16, f64, f64); 3] = [
    (4660, 0.0, 0.0),
    (4663, -0.64, 0.0),
    (4661, -0.64, -0.57),
];
