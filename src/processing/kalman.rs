use nalgebra::{Cholesky, DMatrix};
use std::ops::{Add, Mul, Sub};

use crate::core::{DEFAULT_INITIAL_COVARIANCE, DEFAULT_INITIAL_ESTIMATE, DEFAULT_OBSERVATION_NOISE};
use crate::validation::error::{PositioningError, PositioningResult};

/// Numeric type a linear Kalman filter can run over.
///
/// Implemented for plain scalars, which is what the distance filters use, and
/// for dense matrices so the same filter can carry a multi-dimensional state.
pub trait KalmanInput:
    Clone + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self>
{
    fn transposed(&self) -> Self;

    /// Inverse of a covariance-like value. `None` unless it is positive definite.
    fn inverted(&self) -> Option<Self>;

    /// `I - self`
    fn identity_complement(&self) -> Self;

    /// Scalar summary used in diagnostics
    fn trace(&self) -> f64;
}

impl KalmanInput for f64 {
    fn transposed(&self) -> Self {
        *self
    }

    fn inverted(&self) -> Option<Self> {
        if *self > 0.0 && self.is_finite() {
            Some(1.0 / *self)
        } else {
            None
        }
    }

    fn identity_complement(&self) -> Self {
        1.0 - *self
    }

    fn trace(&self) -> f64 {
        *self
    }
}

impl KalmanInput for DMatrix<f64> {
    fn transposed(&self) -> Self {
        self.transpose()
    }

    fn inverted(&self) -> Option<Self> {
        if !self.is_square() {
            return None;
        }
        Cholesky::new(self.clone()).map(|c| c.inverse())
    }

    fn identity_complement(&self) -> Self {
        DMatrix::<f64>::identity(self.nrows(), self.ncols()) - self
    }

    fn trace(&self) -> f64 {
        if self.is_square() {
            self.diagonal().sum()
        } else {
            f64::NAN
        }
    }
}

/// Linear Kalman filter state. `predict` and `update` return a new state and
/// leave `self` untouched, so a filter can be replayed deterministically.
#[derive(Debug, Clone, PartialEq)]
pub struct KalmanFilter<T: KalmanInput> {
    /// x̂
    pub state_estimate: T,
    /// P
    pub error_covariance: T,
}

impl<T: KalmanInput> KalmanFilter<T> {
    pub fn new(state_estimate: T, error_covariance: T) -> Self {
        Self {
            state_estimate,
            error_covariance,
        }
    }

    /// x = F x + B u, P = F P Fᵀ + Q
    pub fn predict(
        &self,
        transition: &T,
        control_model: &T,
        control_vector: &T,
        process_noise: &T,
    ) -> Self {
        let state_estimate = transition.clone() * self.state_estimate.clone()
            + control_model.clone() * control_vector.clone();
        let error_covariance = transition.clone() * self.error_covariance.clone() * transition.transposed()
            + process_noise.clone();

        Self {
            state_estimate,
            error_covariance,
        }
    }

    /// Fold one measurement into the state.
    ///
    /// Fails with [`PositioningError::FilterDivergence`] when the residual
    /// covariance `H P Hᵀ + R` cannot be inverted.
    pub fn update(
        &self,
        measurement: &T,
        observation_model: &T,
        observation_noise: &T,
    ) -> PositioningResult<Self> {
        let observation_transposed = observation_model.transposed();

        let residual = measurement.clone() - observation_model.clone() * self.state_estimate.clone();
        let residual_covariance = observation_model.clone()
            * self.error_covariance.clone()
            * observation_transposed.clone()
            + observation_noise.clone();

        let residual_covariance_inv = residual_covariance.inverted().ok_or_else(|| {
            PositioningError::FilterDivergence {
                residual_covariance: residual_covariance.trace(),
            }
        })?;

        let gain = self.error_covariance.clone() * observation_transposed * residual_covariance_inv;

        let state_estimate = self.state_estimate.clone() + gain.clone() * residual;
        let error_covariance =
            (gain * observation_model.clone()).identity_complement() * self.error_covariance.clone();

        Ok(Self {
            state_estimate,
            error_covariance,
        })
    }
}

/// One-dimensional filter used per beacon
pub type ScalarKalmanFilter = KalmanFilter<f64>;

/// Smoothed distance carried for one beacon between ticks
pub type FilterState = ScalarKalmanFilter;

impl ScalarKalmanFilter {
    pub fn estimate(&self) -> f64 {
        self.state_estimate
    }
}

/// Random-walk distance filter parameters.
///
/// Transition and observation models are both 1 with no control input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceSmoother {
    pub initial_estimate: f64,
    pub initial_covariance: f64,
    pub process_noise: f64,
    pub observation_noise: f64,
}

impl Default for DistanceSmoother {
    fn default() -> Self {
        Self {
            initial_estimate: DEFAULT_INITIAL_ESTIMATE,
            initial_covariance: DEFAULT_INITIAL_COVARIANCE,
            process_noise: 0.0,
            observation_noise: DEFAULT_OBSERVATION_NOISE,
        }
    }
}

impl DistanceSmoother {
    pub fn prior(&self) -> FilterState {
        FilterState::new(self.initial_estimate, self.initial_covariance)
    }

    /// One predict followed by one update
    pub fn step(&self, state: &FilterState, measurement: f64) -> PositioningResult<FilterState> {
        state
            .predict(&1.0, &0.0, &0.0, &self.process_noise)
            .update(&measurement, &1.0, &self.observation_noise)
    }

    /// Run the filter from the prior over `samples` in order
    pub fn replay<'a, I>(&self, samples: I) -> PositioningResult<FilterState>
    where
        I: IntoIterator<Item = &'a f64>,
    {
        samples
            .into_iter()
            .try_fold(self.prior(), |state, &sample| self.step(&state, sample))
    }
}
