//! RSSI to distance conversion

use crate::core::{DEFAULT_CALIBRATED_POWER_DBM, DISTANCE_SCALE_DIVISOR, INVALID_DISTANCE};

/// Convert an RSSI reading into an estimated distance in meters.
///
/// Returns [`INVALID_DISTANCE`] when `rssi` is 0, which the scanner uses for
/// "no reading". Otherwise computes `10^(rssi / calibrated_power) / 20`.
pub fn estimate_distance(calibrated_power_dbm: f64, rssi: i32) -> f64 {
    if rssi == 0 {
        return INVALID_DISTANCE;
    }
    let ratio = f64::from(rssi) / calibrated_power_dbm;
    10f64.powf(ratio) / DISTANCE_SCALE_DIVISOR
}

/// True for any distance the pipeline may feed into a window
pub fn is_valid_distance(distance: f64) -> bool {
    distance.is_finite() && distance >= 0.0
}

/// Distance model bound to one calibration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceModel {
    pub calibrated_power_dbm: f64,
}

impl Default for DistanceModel {
    fn default() -> Self {
        Self {
            calibrated_power_dbm: DEFAULT_CALIBRATED_POWER_DBM,
        }
    }
}

impl DistanceModel {
    pub fn new(calibrated_power_dbm: f64) -> Self {
        Self { calibrated_power_dbm }
    }

    pub fn estimate(&self, rssi: i32) -> f64 {
        estimate_distance(self.calibrated_power_dbm, rssi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_rssi_is_invalid() {
        assert_eq!(estimate_distance(-59.0, 0), INVALID_DISTANCE);
        assert!(!is_valid_distance(estimate_distance(-59.0, 0)));
    }

    #[test]
    fn test_rssi_equal_to_calibration() {
        // ratio 1 -> 10 / 20
        let d = estimate_distance(-59.0, -59);
        assert!((d - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_weaker_signal_is_farther() {
        let model = DistanceModel::default();
        assert!(model.estimate(-80) > model.estimate(-60));
    }

    proptest! {
        #[test]
        fn prop_zero_rssi_always_sentinel(power in -120.0f64..-1.0) {
            prop_assert_eq!(estimate_distance(power, 0), INVALID_DISTANCE);
        }

        #[test]
        fn prop_matches_closed_form(power in -100.0f64..-30.0, rssi in -110i32..-1) {
            let expected = 10f64.powf(rssi as f64 / power) / 20.0;
            prop_assert_eq!(estimate_distance(power, rssi), expected);
            prop_assert!(is_valid_distance(expected));
        }
    }
}
