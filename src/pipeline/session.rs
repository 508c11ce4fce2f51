//! Per-session positioning pipeline.
//!
//! A [`PositioningSession`] owns every piece of per-beacon state: the sample
//! windows, the smoothed filter states, the anchor registry and the last good
//! estimate. Each ranging bundle is processed to completion before the next.
//! A tick either commits all of its samples or none of them.

use std::collections::HashMap;
use tracing::{debug, info, trace};

use crate::algorithms::{is_valid_distance, CenterOfGravityFix, CenterOfGravitySolver, DistanceModel};
use crate::anchors::AnchorRegistry;
use crate::core::{
    AnchorPoint, BeaconDistance, BeaconId, BeaconSample, PositionEstimate, BEACONS_PER_SOLVE,
};
use crate::pipeline::state::{SessionState, SessionStats, TickOutcome};
use crate::processing::{DistanceSmoother, FilterState, SampleWindow};
use crate::utils::config::{ConfigurationManager, DistanceSource, PositioningConfig};
use crate::validation::error::{PositioningError, PositioningResult, SampleIssue};

/// Sample accepted for one tracked beacon, not yet committed
struct StagedSample {
    beacon_id: BeaconId,
    raw_distance: f64,
    window: SampleWindow,
    filter: FilterState,
}

pub struct PositioningSession {
    config: PositioningConfig,
    model: DistanceModel,
    smoother: DistanceSmoother,
    solver: CenterOfGravitySolver,
    registry: AnchorRegistry,
    windows: HashMap<BeaconId, SampleWindow>,
    filters: HashMap<BeaconId, FilterState>,
    last_estimate: Option<PositionEstimate>,
    last_fix: Option<CenterOfGravityFix>,
    state: SessionState,
    stats: SessionStats,
}

impl Default for PositioningSession {
    fn default() -> Self {
        Self::new(PositioningConfig::default(), AnchorRegistry::default())
    }
}

impl PositioningSession {
    pub fn new(config: PositioningConfig, registry: AnchorRegistry) -> Self {
        let smoother = DistanceSmoother {
            initial_estimate: config.initial_estimate,
            initial_covariance: config.initial_covariance,
            process_noise: config.process_noise,
            observation_noise: config.observation_noise,
        };

        Self {
            model: DistanceModel::new(config.calibrated_power_dbm),
            solver: CenterOfGravitySolver::new(config.coordinate_units_per_meter),
            smoother,
            registry,
            config,
            windows: HashMap::new(),
            filters: HashMap::new(),
            last_estimate: None,
            last_fix: None,
            state: SessionState::Idle,
            stats: SessionStats::default(),
        }
    }

    /// Session with the manager's parameters and anchors
    pub fn from_config(manager: &ConfigurationManager) -> Self {
        Self::new(manager.positioning().clone(), manager.build_registry())
    }

    /// Process one ranging bundle.
    ///
    /// `Err` means the tick was dropped and no per-beacon state changed.
    /// `Ok` means the samples were committed; whether a solve ran is in the
    /// returned outcome.
    pub fn process_tick(&mut self, bundle: &[BeaconSample]) -> PositioningResult<TickOutcome> {
        match self.ingest(bundle) {
            Ok(outcome) => {
                self.stats.record_outcome(&outcome);
                Ok(outcome)
            }
            Err(err) => {
                debug!(error = %err, "tick dropped");
                self.stats.record_rejection(&err);
                if self.state == SessionState::Ready {
                    self.state = SessionState::Accumulating;
                }
                Err(err)
            }
        }
    }

    /// Hand over a fetched anchor feed; it is merged on the next accepted tick
    pub fn stage_anchor_feed(&mut self, feed: Vec<AnchorPoint>) -> bool {
        self.registry.stage_feed(feed)
    }

    fn ingest(&mut self, bundle: &[BeaconSample]) -> PositioningResult<TickOutcome> {
        let tracked = select_tracked(bundle)?;

        let mut staged = Vec::with_capacity(BEACONS_PER_SOLVE);
        for sample in tracked {
            staged.push(self.stage(sample)?);
        }

        let mut distances = [BeaconDistance {
            beacon_id: 0,
            raw_distance: 0.0,
            filtered_distance: 0.0,
        }; BEACONS_PER_SOLVE];
        let mut ready = true;
        for (slot, sample) in distances.iter_mut().zip(staged) {
            *slot = BeaconDistance {
                beacon_id: sample.beacon_id,
                raw_distance: sample.raw_distance,
                filtered_distance: sample.filter.estimate(),
            };
            ready &= sample.window.len() >= self.config.min_samples_to_solve;
            self.windows.insert(sample.beacon_id, sample.window);
            self.filters.insert(sample.beacon_id, sample.filter);
        }
        trace!(?distances, "tick committed");

        if let Some(active) = self.registry.materialize() {
            info!(active, "anchor feed materialized into active tracking");
        }

        if !ready {
            self.state = SessionState::Accumulating;
            return Ok(TickOutcome::Accumulating { distances });
        }
        if !self.registry.is_loaded() {
            self.state = SessionState::Accumulating;
            return Ok(TickOutcome::SolveSkipped {
                distances,
                reason: PositioningError::RegistryPending,
            });
        }

        self.state = SessionState::Ready;
        match self.solve(&distances) {
            Ok(fix) => {
                debug!(x = fix.position.x, y = fix.position.y, nearest = fix.nearest_beacon, "position solved");
                self.last_estimate = Some(fix.position);
                self.last_fix = Some(fix);
                Ok(TickOutcome::Solved { distances, fix })
            }
            Err(reason) => {
                debug!(%reason, "solve skipped");
                Ok(TickOutcome::SolveSkipped { distances, reason })
            }
        }
    }

    /// Validate and convert one sample, then filter it against a copy of its window
    fn stage(&self, sample: BeaconSample) -> PositioningResult<StagedSample> {
        if !sample.has_signal() {
            return Err(PositioningError::InvalidSample {
                beacon_id: sample.beacon_id,
                rssi: Some(sample.rssi),
                issue: SampleIssue::NoSignal,
            });
        }

        let raw_distance = self.model.estimate(sample.rssi);
        if !is_valid_distance(raw_distance) {
            let issue = if raw_distance.is_finite() {
                SampleIssue::NegativeDistance
            } else {
                SampleIssue::NonFiniteDistance
            };
            return Err(PositioningError::InvalidSample {
                beacon_id: sample.beacon_id,
                rssi: Some(sample.rssi),
                issue,
            });
        }

        let mut window = self
            .windows
            .get(&sample.beacon_id)
            .cloned()
            .unwrap_or_else(|| SampleWindow::with_capacity(self.config.window_capacity));
        window.push(raw_distance);
        let filter = self.smoother.replay(&window)?;

        Ok(StagedSample {
            beacon_id: sample.beacon_id,
            raw_distance,
            window,
            filter,
        })
    }

    fn solve(&self, distances: &[BeaconDistance; BEACONS_PER_SOLVE]) -> PositioningResult<CenterOfGravityFix> {
        let a = self.registry.resolve(distances[0].beacon_id)?;
        let b = self.registry.resolve(distances[1].beacon_id)?;
        let c = self.registry.resolve(distances[2].beacon_id)?;

        let pick = |d: &BeaconDistance| match self.config.distance_source {
            DistanceSource::Filtered => d.filtered_distance,
            DistanceSource::Raw => d.raw_distance,
        };

        self.solver
            .solve(a, b, c, pick(&distances[0]), pick(&distances[1]), pick(&distances[2]))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn last_estimate(&self) -> Option<PositionEstimate> {
        self.last_estimate
    }

    pub fn last_fix(&self) -> Option<&CenterOfGravityFix> {
        self.last_fix.as_ref()
    }

    pub fn filter_state(&self, beacon_id: BeaconId) -> Option<&FilterState> {
        self.filters.get(&beacon_id)
    }

    pub fn window(&self, beacon_id: BeaconId) -> Option<&SampleWindow> {
        self.windows.get(&beacon_id)
    }

    /// Beacons with at least one accepted sample
    pub fn tracked_beacons(&self) -> Vec<BeaconId> {
        let mut ids: Vec<BeaconId> = self.filters.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn registry(&self) -> &AnchorRegistry {
        &self.registry
    }

    pub fn config(&self) -> &PositioningConfig {
        &self.config
    }
}

/// First three distinct beacons in bundle order
fn select_tracked(bundle: &[BeaconSample]) -> PositioningResult<[BeaconSample; BEACONS_PER_SOLVE]> {
    let mut distinct: Vec<BeaconSample> = Vec::with_capacity(BEACONS_PER_SOLVE);
    for sample in bundle {
        if !distinct.iter().any(|s| s.beacon_id == sample.beacon_id) {
            distinct.push(*sample);
        }
    }

    if distinct.len() < BEACONS_PER_SOLVE {
        return Err(PositioningError::InsufficientBeacons {
            visible: distinct.len(),
            required: BEACONS_PER_SOLVE,
        });
    }
    Ok([distinct[0], distinct[1], distinct[2]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::seed_anchors;
    use crate::validation::error::ErrorKind;

    fn triangle_registry() -> AnchorRegistry {
        AnchorRegistry::from_anchors(vec![
            AnchorPoint::new(1, 0.0, 0.0),
            AnchorPoint::new(2, 2.0, 0.0),
            AnchorPoint::new(3, 1.0, 2.0),
        ])
    }

    fn bundle() -> Vec<BeaconSample> {
        vec![
            BeaconSample::new(1, -60),
            BeaconSample::new(2, -65),
            BeaconSample::new(3, -70),
        ]
    }

    #[test]
    fn test_estimate_after_fifth_tick() {
        let mut session = PositioningSession::new(PositioningConfig::default(), triangle_registry());
        assert_eq!(session.state(), SessionState::Idle);

        for tick in 1..=4 {
            let outcome = session.process_tick(&bundle()).unwrap();
            assert!(matches!(outcome, TickOutcome::Accumulating { .. }), "tick {}", tick);
            assert_eq!(session.state(), SessionState::Accumulating);
        }
        assert!(session.last_estimate().is_none());

        let outcome = session.process_tick(&bundle()).unwrap();
        let fix = match outcome {
            TickOutcome::Solved { fix, .. } => fix,
            other => panic!("expected a solve, got {:?}", other),
        };
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(fix.nearest_beacon, 1);
        assert_eq!(session.last_estimate(), Some(fix.position));

        // five identical samples from prior (0, 1) with R = 0.1: x = z * 50 / 51
        let distances = outcome.distances();
        let expected = distances[0].raw_distance * 50.0 / 51.0;
        assert!((distances[0].filtered_distance - expected).abs() < 1e-9);

        // at scale 1 the fix sits that far from the nearest anchor
        let from_anchor = fix.position.to_point().coords.norm();
        assert!((from_anchor - distances[0].filtered_distance).abs() < 1e-9);

        let outcome = session.process_tick(&bundle()).unwrap();
        assert!(outcome.estimate().is_some());
        assert_eq!(session.stats().solves, 2);
    }

    #[test]
    fn test_window_collapse_pauses_solving() {
        let mut session = PositioningSession::new(PositioningConfig::default(), triangle_registry());

        let mut solved = Vec::new();
        for tick in 1..=6 {
            if let Some(estimate) = session.process_tick(&bundle()).unwrap().estimate() {
                solved.push((tick, estimate));
            }
        }
        assert_eq!(solved.iter().map(|(t, _)| *t).collect::<Vec<_>>(), vec![5, 6]);
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.window(1).map(|w| w.len()), Some(6));
        let tick_five = solved[0].1;
        let tick_six = solved[1].1;

        // The seventh push overflows: each window keeps its last sample plus the new one.
        for (tick, expected_len) in [(7, 2), (8, 3), (9, 4)] {
            let outcome = session.process_tick(&bundle()).unwrap();
            assert!(matches!(outcome, TickOutcome::Accumulating { .. }), "tick {}", tick);
            assert_eq!(session.state(), SessionState::Accumulating, "tick {}", tick);
            for beacon in 1..=3 {
                assert_eq!(session.window(beacon).map(|w| w.len()), Some(expected_len));
            }
            assert_eq!(session.last_estimate(), Some(tick_six), "tick {}", tick);
        }

        let outcome = session.process_tick(&bundle()).unwrap();
        let estimate = match outcome {
            TickOutcome::Solved { fix, .. } => fix.position,
            other => panic!("expected a solve on tick 10, got {:?}", other),
        };
        assert_eq!(session.state(), SessionState::Ready);
        // five identical samples again, so the same fix as tick 5
        assert!((estimate.x - tick_five.x).abs() < 1e-12);
        assert!((estimate.y - tick_five.y).abs() < 1e-12);
        assert_eq!(session.last_estimate(), Some(estimate));
        assert_eq!(session.stats().solves, 3);
        assert_eq!(session.stats().accepted_ticks, 10);
    }

    #[test]
    fn test_no_signal_tick_leaves_state_unchanged() {
        let mut session = PositioningSession::new(PositioningConfig::default(), triangle_registry());
        for _ in 0..3 {
            session.process_tick(&bundle()).unwrap();
        }
        let filter_before = session.filter_state(2).cloned();
        let window_before = session.window(1).cloned();

        let err = session
            .process_tick(&[
                BeaconSample::new(1, -60),
                BeaconSample::new(2, 0),
                BeaconSample::new(3, -70),
            ])
            .unwrap_err();

        assert_eq!(
            err,
            PositioningError::InvalidSample {
                beacon_id: 2,
                rssi: Some(0),
                issue: SampleIssue::NoSignal,
            }
        );
        assert_eq!(session.filter_state(2).cloned(), filter_before);
        // beacon 1 was valid but the whole tick is dropped
        assert_eq!(session.window(1).cloned(), window_before);
        assert_eq!(session.stats().failures_of(ErrorKind::InvalidSample), 1);
    }

    #[test]
    fn test_rejected_tick_downgrades_ready() {
        let mut session = PositioningSession::new(PositioningConfig::default(), triangle_registry());
        for _ in 0..5 {
            session.process_tick(&bundle()).unwrap();
        }
        assert_eq!(session.state(), SessionState::Ready);
        let estimate = session.last_estimate();

        assert!(session.process_tick(&[BeaconSample::new(1, -60)]).is_err());
        assert_eq!(session.state(), SessionState::Accumulating);
        assert_eq!(session.last_estimate(), estimate);
    }

    #[test]
    fn test_rejected_first_tick_stays_idle() {
        let mut session = PositioningSession::default();
        let err = session
            .process_tick(&[BeaconSample::new(1, -60), BeaconSample::new(1, -61), BeaconSample::new(2, -62)])
            .unwrap_err();
        assert_eq!(err, PositioningError::InsufficientBeacons { visible: 2, required: 3 });
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.tracked_beacons().is_empty());
    }

    #[test]
    fn test_extra_beacons_beyond_three_ignored() {
        let mut session = PositioningSession::new(PositioningConfig::default(), triangle_registry());
        let mut samples = bundle();
        samples.push(BeaconSample::new(9, 0));
        session.process_tick(&samples).unwrap();
        assert_eq!(session.tracked_beacons(), vec![1, 2, 3]);
    }

    #[test]
    fn test_unknown_beacon_skips_solve() {
        let mut session = PositioningSession::default();
        let mut last = None;
        for _ in 0..5 {
            last = Some(session.process_tick(&bundle()).unwrap());
        }
        match last {
            Some(TickOutcome::SolveSkipped { reason, .. }) => {
                assert_eq!(reason, PositioningError::UnknownBeacon { beacon_id: 1 })
            }
            other => panic!("expected skipped solve, got {:?}", other),
        }
        assert!(session.last_estimate().is_none());
        assert_eq!(session.stats().skipped_solves, 1);
    }

    #[test]
    fn test_pending_registry_waits_for_feed() {
        let config = PositioningConfig {
            await_anchor_feed: true,
            ..Default::default()
        };
        let mut session = PositioningSession::new(config, AnchorRegistry::awaiting_feed(seed_anchors()));

        for _ in 0..4 {
            session.process_tick(&bundle()).unwrap();
        }
        let outcome = session.process_tick(&bundle()).unwrap();
        assert!(matches!(
            outcome,
            TickOutcome::SolveSkipped { reason: PositioningError::RegistryPending, .. }
        ));
        assert_eq!(session.state(), SessionState::Accumulating);

        assert!(session.stage_anchor_feed(vec![
            AnchorPoint::new(1, 0.0, 0.0),
            AnchorPoint::new(2, 2.0, 0.0),
            AnchorPoint::new(3, 1.0, 2.0),
        ]));
        let outcome = session.process_tick(&bundle()).unwrap();
        assert!(outcome.estimate().is_some());
        assert!(session.registry().is_loaded());
        assert_eq!(session.registry().len(), 6);
    }

    #[test]
    fn test_raw_distance_source() {
        let config = PositioningConfig {
            distance_source: DistanceSource::Raw,
            ..Default::default()
        };
        let mut session = PositioningSession::new(config, triangle_registry());
        let mut outcome = None;
        for _ in 0..5 {
            outcome = Some(session.process_tick(&bundle()).unwrap());
        }
        let outcome = outcome.unwrap();
        let fix = session.last_fix().unwrap();
        let from_anchor = fix.position.to_point().coords.norm();
        assert!((from_anchor - outcome.distances()[0].raw_distance).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_geometry_keeps_prior_estimate() {
        let registry = AnchorRegistry::from_anchors(vec![
            AnchorPoint::new(1, 0.5, 0.5),
            AnchorPoint::new(2, 0.5, 0.5),
            AnchorPoint::new(3, 0.5, 0.5),
        ]);
        let mut session = PositioningSession::new(PositioningConfig::default(), registry);
        let mut outcome = None;
        for _ in 0..5 {
            outcome = Some(session.process_tick(&bundle()).unwrap());
        }
        assert!(matches!(
            outcome,
            Some(TickOutcome::SolveSkipped { reason: PositioningError::DegenerateGeometry { .. }, .. })
        ));
        assert!(session.last_estimate().is_none());
    }

    #[test]
    fn test_zero_noise_prior_diverges_without_mutation() {
        let config = PositioningConfig {
            observation_noise: 0.0,
            initial_covariance: 0.0,
            ..Default::default()
        };
        let mut session = PositioningSession::new(config, triangle_registry());
        let err = session.process_tick(&bundle()).unwrap_err();
        assert!(matches!(err, PositioningError::FilterDivergence { .. }));
        assert!(session.filter_state(1).is_none());
        assert!(session.window(1).is_none());
    }
}
