use crate::error::EstimatorError;
use crate::matrix::Matrix;
use crate::numeric::Scalar;
use serde::{Deserialize, Serialize};

/// Selects the predict/update recursion of the [`LinearStateEstimator`](super::LinearStateEstimator).
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recursion {
    /// Reproduces the update equations of the telemetry scripts the estimator was
    /// calibrated against:
    ///
    /// - the predicted measurement is `H·x_pred + R`,
    /// - the state is never propagated through `A`/`B`/`u` before the innovation,
    /// - the posterior covariance is not carried into the next `P_pred`.
    ///
    /// Only the equations are covered. What enters the measurement vector is decided
    /// by the caller, e.g. [`SecondChannel`](crate::pipeline::SecondChannel) in the pipeline.
    #[default]
    Faithful,
    /// The standard Kalman recursion: `x_pred = A·x + B·u`, `P_pred = A·P·Aᵀ + Q`,
    /// with the posterior covariance feeding the next prediction.
    Textbook,
}

/// The model matrices of a linear state estimator with `n` states,
/// `m` control inputs and `k` observations.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMatrices<T> {
    /// State transition matrix (n×n).
    pub a: Matrix<T>,
    /// Control matrix (n×m).
    pub b: Matrix<T>,
    /// Control vector (m×1).
    pub u: Matrix<T>,
    /// Process noise covariance (n×n).
    pub q: Matrix<T>,
    /// Observation matrix (k×n).
    pub h: Matrix<T>,
    /// Measurement noise covariance (k×k).
    pub r: Matrix<T>,
}

impl<T> ModelMatrices<T>
where
    T: Scalar,
{
    /// Bundles the model matrices after checking they are mutually conformant.
    pub fn new(
        a: Matrix<T>,
        b: Matrix<T>,
        u: Matrix<T>,
        q: Matrix<T>,
        h: Matrix<T>,
        r: Matrix<T>,
    ) -> Result<Self, EstimatorError> {
        let model = Self { a, b, u, q, h, r };
        model.validate()?;
        Ok(model)
    }

    /// The number of states, `n`.
    #[inline(always)]
    pub fn states(&self) -> usize {
        self.a.rows()
    }

    /// The number of control inputs, `m`.
    #[inline(always)]
    pub fn controls(&self) -> usize {
        self.b.cols()
    }

    /// The number of observations, `k`.
    #[inline(always)]
    pub fn observations(&self) -> usize {
        self.h.rows()
    }

    /// Checks the shapes of all matrices against each other.
    pub fn validate(&self) -> Result<(), EstimatorError> {
        let n = self.a.rows();
        self.a.expect_shape("A", (n, n))?;
        self.q.expect_shape("Q", (n, n))?;

        let m = self.b.cols();
        self.b.expect_shape("B", (n, m))?;
        self.u.expect_shape("u", (m, 1))?;

        let k = self.h.rows();
        self.h.expect_shape("H", (k, n))?;
        self.r.expect_shape("R", (k, k))?;
        Ok(())
    }
}

/// Per-step replacements for the time-varying model matrices.
///
/// Any matrix given here replaces the stored one and stays in effect for later steps.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOverrides<T> {
    pub a: Option<Matrix<T>>,
    pub b: Option<Matrix<T>>,
    pub u: Option<Matrix<T>>,
    pub r: Option<Matrix<T>>,
}

impl<T> Default for StepOverrides<T> {
    fn default() -> Self {
        Self {
            a: None,
            b: None,
            u: None,
            r: None,
        }
    }
}

impl<T> StepOverrides<T> {
    /// No overrides; the stored model is used as-is.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_transition(mut self, a: Matrix<T>) -> Self {
        self.a = Some(a);
        self
    }

    pub fn with_control(mut self, b: Matrix<T>, u: Matrix<T>) -> Self {
        self.b = Some(b);
        self.u = Some(u);
        self
    }

    pub fn with_measurement_noise(mut self, r: Matrix<T>) -> Self {
        self.r = Some(r);
        self
    }
}

/// The diagnostic bundle returned by each filter step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDiagnostics<T> {
    /// The state estimate before the step.
    pub x_prior: Matrix<T>,
    /// The state covariance before the step.
    pub p_prior: Matrix<T>,
    /// The posterior state estimate.
    pub x_post: Matrix<T>,
    /// The posterior state covariance.
    pub p_post: Matrix<T>,
    /// The predicted measurement.
    ///
    /// Under [`Recursion::Faithful`] this is the k×k matrix obtained by adding
    /// `H·x_pred` to every column of `R`; under [`Recursion::Textbook`] it is `H·x_pred` (k×1).
    pub z_pred: Matrix<T>,
    /// The innovation `y` (k×1).
    pub innovation: Matrix<T>,
    /// The innovation covariance `s` (k×k).
    pub innovation_covariance: Matrix<T>,
    /// The Kalman gain `k` (n×k).
    pub gain: Matrix<T>,
}

/// The state owned by a single estimator instance.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FilterState<T> {
    /// Predicted (prior) state estimate, n×1.
    pub x_pred: Matrix<T>,
    /// Predicted state covariance, n×n.
    pub p_pred: Matrix<T>,
    /// Posterior estimate of the most recent step.
    pub x: Option<Matrix<T>>,
    /// Posterior covariance of the most recent step.
    pub p: Option<Matrix<T>>,
}
