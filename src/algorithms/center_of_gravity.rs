//! Nearest-beacon / center-of-gravity position heuristic.
//!
//! Not a trilateration: the receiver is placed on the segment between the
//! closest anchor and the centroid of the three anchors, at the closest
//! anchor's estimated range. The point may overshoot past the centroid when
//! that range exceeds the anchor-to-centroid distance.

use nalgebra::{distance, Point2};

use crate::algorithms::distance::is_valid_distance;
use crate::core::{AnchorPoint, BeaconId, PositionEstimate, DEFAULT_COORDINATE_UNITS_PER_METER};
use crate::validation::error::{PositioningError, PositioningResult, SampleIssue};

/// Centroid distances at or below this are treated as coincident
const COINCIDENT_EPSILON: f64 = 1e-12;

/// Result of one solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterOfGravityFix {
    pub position: PositionEstimate,
    /// Anchor picked as nearest by the tie-break rule
    pub nearest_beacon: BeaconId,
    /// Fraction of the anchor-to-centroid segment travelled; > 1 means overshoot
    pub segment_fraction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterOfGravitySolver {
    /// Scale from meters of estimated range to floor-plan units
    pub coordinate_units_per_meter: f64,
}

impl Default for CenterOfGravitySolver {
    fn default() -> Self {
        Self {
            coordinate_units_per_meter: DEFAULT_COORDINATE_UNITS_PER_METER,
        }
    }
}

impl CenterOfGravitySolver {
    pub fn new(coordinate_units_per_meter: f64) -> Self {
        Self { coordinate_units_per_meter }
    }

    pub fn solve(
        &self,
        a: &AnchorPoint,
        b: &AnchorPoint,
        c: &AnchorPoint,
        dist_a: f64,
        dist_b: f64,
        dist_c: f64,
    ) -> PositioningResult<CenterOfGravityFix> {
        for (anchor, d) in [(a, dist_a), (b, dist_b), (c, dist_c)] {
            if !is_valid_distance(d) {
                let issue = if d.is_finite() {
                    SampleIssue::NegativeDistance
                } else {
                    SampleIssue::NonFiniteDistance
                };
                return Err(PositioningError::InvalidSample {
                    beacon_id: anchor.beacon_id,
                    rssi: None,
                    issue,
                });
            }
        }

        let (pa, pb, pc) = (a.planar(), b.planar(), c.planar());
        let cog = Point2::from((pa.coords + pb.coords + pc.coords) / 3.0);

        let (nearest, nearest_point, nearest_distance) = if dist_a < dist_b && dist_a < dist_c {
            (a, pa, dist_a)
        } else if dist_b < dist_c {
            (b, pb, dist_b)
        } else {
            (c, pc, dist_c)
        };

        let distance_to_cog = distance(&cog, &nearest_point);
        if distance_to_cog <= COINCIDENT_EPSILON {
            return Err(PositioningError::DegenerateGeometry {
                nearest_beacon: nearest.beacon_id,
                distance_to_cog,
            });
        }

        let t = nearest_distance * self.coordinate_units_per_meter / distance_to_cog;
        let position = nearest_point + (cog - nearest_point) * t;

        Ok(CenterOfGravityFix {
            position: position.into(),
            nearest_beacon: nearest.beacon_id,
            segment_fraction: t,
        })
    }
}

/// Solve with the default unit scale
pub fn solve(
    a: &AnchorPoint,
    b: &AnchorPoint,
    c: &AnchorPoint,
    dist_a: f64,
    dist_b: f64,
    dist_c: f64,
) -> PositioningResult<PositionEstimate> {
    CenterOfGravitySolver::default()
        .solve(a, b, c, dist_a, dist_b, dist_c)
        .map(|fix| fix.position)
}
