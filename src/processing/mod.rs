//! Signal processing: per-beacon sample windows and Kalman smoothing

pub mod kalman;
pub mod window;

pub use kalman::{DistanceSmoother, FilterState, KalmanFilter, KalmanInput, ScalarKalmanFilter};
pub use window::SampleWindow;
