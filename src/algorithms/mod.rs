//! Core positioning algorithms

pub mod distance;
pub mod center_of_gravity;

pub use distance::{estimate_distance, is_valid_distance, DistanceModel};
pub use center_of_gravity::{CenterOfGravityFix, CenterOfGravitySolver};
