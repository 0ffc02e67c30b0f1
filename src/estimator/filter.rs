use crate::error::EstimatorError;
use crate::estimator::types::*;
use crate::matrix::Matrix;
use crate::numeric::{IsNaN, Scalar};
use tracing::debug;

/// The default relative pivot threshold below which the innovation covariance is
/// treated as singular.
pub const DEFAULT_SINGULAR_THRESHOLD: f64 = 1e-12;

/// A discrete-time linear Kalman filter whose transition, control and
/// measurement noise matrices may be replaced on every step.
#[derive(Debug, Clone)]
pub struct LinearStateEstimator<T> {
    model: ModelMatrices<T>,
    state: FilterState<T>,
    recursion: Recursion,
    /// Relative pivot threshold used when inverting the innovation covariance.
    singular_threshold: T,
}

impl<T> LinearStateEstimator<T>
where
    T: Scalar,
{
    /// Initializes a new instance of the [`LinearStateEstimator`] struct.
    ///
    /// ## Arguments
    /// * `model` - The initial model matrices; they become the defaults for every step.
    /// * `x0` - The initial state estimate (n×1).
    /// * `p0` - The initial state covariance (n×n).
    ///
    /// ## Errors
    /// Returns [`EstimatorError::ShapeMismatch`] if any matrix is not conformant.
    pub fn new(model: ModelMatrices<T>, x0: Matrix<T>, p0: Matrix<T>) -> Result<Self, EstimatorError> {
        model.validate()?;
        let n = model.states();
        x0.expect_shape("x0", (n, 1))?;
        p0.expect_shape("P0", (n, n))?;

        Ok(Self {
            model,
            state: FilterState {
                x_pred: x0,
                p_pred: p0,
                x: None,
                p: None,
            },
            recursion: Recursion::default(),
            singular_threshold: T::lit(DEFAULT_SINGULAR_THRESHOLD),
        })
    }

    /// Selects the predict/update recursion.
    pub fn with_recursion(mut self, recursion: Recursion) -> Self {
        self.recursion = recursion;
        self
    }

    /// Sets the relative pivot threshold used to detect a singular innovation covariance.
    pub fn with_singular_threshold(mut self, threshold: T) -> Self {
        self.singular_threshold = threshold;
        self
    }

    pub fn recursion(&self) -> Recursion {
        self.recursion
    }

    /// The current model matrices, including any persisted overrides.
    pub fn model(&self) -> &ModelMatrices<T> {
        &self.model
    }

    /// The predicted state estimate `x_pred` (n×1).
    pub fn state(&self) -> &Matrix<T> {
        &self.state.x_pred
    }

    /// The predicted state covariance `P_pred` (n×n).
    pub fn covariance(&self) -> &Matrix<T> {
        &self.state.p_pred
    }

    /// Obtains the current estimate of the state at `index`, or `None` if the
    /// index exceeds the number of states.
    pub fn estimate(&self, index: usize) -> Option<T> {
        self.state.x_pred.try_get(index, 0)
    }

    /// The posterior estimate and covariance of the most recent successful step.
    pub fn posterior(&self) -> Option<(&Matrix<T>, &Matrix<T>)> {
        match (&self.state.x, &self.state.p) {
            (Some(x), Some(p)) => Some((x, p)),
            _ => None,
        }
    }

    /// Performs one predict/update cycle with the measurement `z`.
    ///
    /// Overrides replace the stored model matrices before the cycle runs and
    /// remain the defaults afterwards. If the innovation covariance cannot be
    /// inverted, the filter state is left exactly as it was before the call.
    ///
    /// ## Arguments
    /// * `z` - The measurement vector (k×1).
    /// * `overrides` - Replacement `A`, `B`, `u` and `R` matrices for this step.
    ///
    /// ## Errors
    /// * [`EstimatorError::ShapeMismatch`] if `z` or an override has the wrong shape.
    ///   Nothing is modified in that case.
    /// * [`EstimatorError::SingularMatrix`] if the innovation covariance is not invertible.
    pub fn step(
        &mut self,
        z: &Matrix<T>,
        overrides: StepOverrides<T>,
    ) -> Result<StepDiagnostics<T>, EstimatorError> {
        self.apply_overrides(z, overrides)?;

        let x_prior = self.state.x_pred.clone();
        let p_prior = self.state.p_pred.clone();

        let ModelMatrices { a, b, u, q, h, r } = &self.model;

        // In the faithful recursion the transition is only applied to the covariance.
        let x_pred = match self.recursion {
            Recursion::Faithful => x_prior.clone(),
            Recursion::Textbook => a.mul(&x_prior)?.add(&b.mul(u)?)?,
        };

        let hx = h.mul(&x_pred)?;
        let z_pred = match self.recursion {
            Recursion::Faithful => Self::add_to_columns(&hx, r),
            Recursion::Textbook => hx.clone(),
        };

        let p_pred = a.mul(&p_prior)?.mul(&a.transpose())?.add(q)?;

        let h_t = h.transpose();
        let innovation = z.sub(&hx)?;
        let innovation_covariance = h.mul(&p_pred)?.mul(&h_t)?.add(r)?;
        let s_inv = innovation_covariance.try_inverse("innovation covariance", self.singular_threshold)?;
        let gain = p_pred.mul(&h_t)?.mul(&s_inv)?;

        let x_post = x_pred.add(&gain.mul(&innovation)?)?;
        let identity = Matrix::identity(self.model.states());
        let p_post = identity.sub(&gain.mul(h)?)?.mul(&p_pred)?;

        debug!(innovation = ?innovation, gain = ?gain, "estimator step");

        self.state.x_pred = x_post.clone();
        self.state.p_pred = match self.recursion {
            Recursion::Faithful => p_pred,
            Recursion::Textbook => p_post.clone(),
        };
        self.state.x = Some(x_post.clone());
        self.state.p = Some(p_post.clone());
        self.panic_if_nan();

        Ok(StepDiagnostics {
            x_prior,
            p_prior,
            x_post,
            p_post,
            z_pred,
            innovation,
            innovation_covariance,
            gain,
        })
    }

    /// Validates the measurement and all overrides, then adopts the overrides.
    fn apply_overrides(
        &mut self,
        z: &Matrix<T>,
        overrides: StepOverrides<T>,
    ) -> Result<(), EstimatorError> {
        let n = self.model.states();
        let k = self.model.observations();
        z.expect_shape("z", (k, 1))?;

        if let Some(a) = &overrides.a {
            a.expect_shape("A", (n, n))?;
        }
        if let Some(r) = &overrides.r {
            r.expect_shape("R", (k, k))?;
        }

        let b = overrides.b.as_ref().unwrap_or(&self.model.b);
        b.expect_shape("B", (n, b.cols()))?;
        let u = overrides.u.as_ref().unwrap_or(&self.model.u);
        u.expect_shape("u", (b.cols(), 1))?;

        let StepOverrides { a, b, u, r } = overrides;
        if let Some(a) = a {
            self.model.a = a;
        }
        if let Some(b) = b {
            self.model.b = b;
        }
        if let Some(u) = u {
            self.model.u = u;
        }
        if let Some(r) = r {
            self.model.r = r;
        }
        Ok(())
    }

    /// Adds the k×1 column `column` to every column of the k×k matrix `matrix`.
    fn add_to_columns(column: &Matrix<T>, matrix: &Matrix<T>) -> Matrix<T> {
        let mut out = matrix.clone();
        for row in 0..matrix.rows() {
            for col in 0..matrix.cols() {
                out.set(row, col, column.get(row, 0) + matrix.get(row, col));
            }
        }
        out
    }

    #[allow(unused)]
    fn panic_if_nan(&self) {
        #[cfg(debug_assertions)]
        if self.state.x_pred.as_slice().iter().any(IsNaN::is_nan) {
            panic!("NaN detected in state estimate")
        }
    }
}
