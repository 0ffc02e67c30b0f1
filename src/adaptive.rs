//! Measurement noise estimated from the local scatter of the most recent samples.

use crate::error::EstimatorError;
use crate::matrix::Matrix;
use crate::numeric::Scalar;

/// The number of samples a [`SampleWindow`] holds.
pub const WINDOW_CAPACITY: usize = 3;

/// A sliding window over the three most recent raw samples of one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleWindow<T> {
    samples: [T; WINDOW_CAPACITY],
    /// Index of the slot the next sample is written to.
    head: usize,
    len: usize,
}

impl<T> Default for SampleWindow<T>
where
    T: Scalar,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SampleWindow<T>
where
    T: Scalar,
{
    pub fn new() -> Self {
        Self {
            samples: [T::zero(); WINDOW_CAPACITY],
            head: 0,
            len: 0,
        }
    }

    /// Appends a sample, evicting the oldest one once the window is full.
    pub fn push(&mut self, sample: T) {
        self.samples[self.head] = sample;
        self.head = (self.head + 1) % WINDOW_CAPACITY;
        self.len = (self.len + 1).min(WINDOW_CAPACITY);
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.len == WINDOW_CAPACITY
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// The most recent sample.
    pub fn latest(&self) -> Option<T> {
        self.nth_newest(0)
    }

    /// The sample before the most recent one.
    pub fn previous(&self) -> Option<T> {
        self.nth_newest(1)
    }

    fn nth_newest(&self, age: usize) -> Option<T> {
        if age >= self.len {
            return None;
        }
        let index = (self.head + WINDOW_CAPACITY - 1 - age) % WINDOW_CAPACITY;
        Some(self.samples[index])
    }

    /// Iterates the samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len).rev().filter_map(move |age| self.nth_newest(age))
    }

    /// The arithmetic mean of the samples, or `None` if the window is empty.
    pub fn mean(&self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let sum = self.iter().fold(T::zero(), |acc, v| acc + v);
        Some(sum / T::lit(self.len as f64))
    }
}

/// Derives a measurement noise covariance from the scatter of two sample windows.
///
/// The estimate is the population (co)variance over each full window:
///
/// ```text
/// R11 = mean((a - mean(a))²)
/// R22 = mean((b - mean(b))²)
/// R12 = mean((a - mean(a)) · (b - mean(b)))
/// ```
///
/// The result is symmetric by construction but not necessarily positive definite;
/// a near-constant window yields a singular matrix.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct AdaptiveCovarianceEstimator;

impl AdaptiveCovarianceEstimator {
    /// Estimates the 2×2 covariance `[[R11, R12], [R12, R22]]`.
    ///
    /// Returns `None` until both windows are full.
    pub fn estimate<T>(&self, window_a: &SampleWindow<T>, window_b: &SampleWindow<T>) -> Option<Matrix<T>>
    where
        T: Scalar,
    {
        if !window_a.is_full() || !window_b.is_full() {
            return None;
        }

        let mean_a = window_a.mean()?;
        let mean_b = window_b.mean()?;
        let n = T::lit(WINDOW_CAPACITY as f64);

        let (mut r11, mut r22, mut r12) = (T::zero(), T::zero(), T::zero());
        for (a, b) in window_a.iter().zip(window_b.iter()) {
            let da = a - mean_a;
            let db = b - mean_b;
            r11 = r11 + da * da;
            r22 = r22 + db * db;
            r12 = r12 + da * db;
        }

        let mut r = Matrix::zeros(2, 2);
        r.set(0, 0, r11 / n);
        r.set(1, 1, r22 / n);
        r.set_symmetric(0, 1, r12 / n);
        Some(r)
    }

    /// Estimates the 1×1 variance of a single full window.
    pub fn estimate_scalar<T>(&self, window: &SampleWindow<T>) -> Option<Matrix<T>>
    where
        T: Scalar,
    {
        if !window.is_full() {
            return None;
        }
        let mean = window.mean()?;
        let sum = window
            .iter()
            .fold(T::zero(), |acc, v| acc + (v - mean) * (v - mean));
        Some(Matrix::scalar(1, sum / T::lit(WINDOW_CAPACITY as f64)))
    }
}

/// The time-varying kinematic model of the acceleration/velocity configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicModel<T> {
    /// `[[1, Δt], [0, 1]]`
    pub a: Matrix<T>,
    /// `[[Δt²/2], [Δt]]`
    pub b: Matrix<T>,
    /// The change in acceleration since the previous sample (1×1).
    pub u: Matrix<T>,
}

impl<T> DynamicModel<T>
where
    T: Scalar,
{
    /// Builds the model from the local sample spacing.
    ///
    /// ## Arguments
    /// * `index` - The index of the current sample, used for error reporting.
    /// * `t_prev` - The timestamp of the previous sample.
    /// * `t_now` - The timestamp of the current sample.
    /// * `a_prev` - The previous acceleration sample.
    /// * `a_now` - The current acceleration sample.
    ///
    /// ## Errors
    /// Returns [`EstimatorError::NonMonotonicTime`] if `t_now <= t_prev`.
    pub fn from_spacing(
        index: usize,
        t_prev: T,
        t_now: T,
        a_prev: T,
        a_now: T,
    ) -> Result<Self, EstimatorError> {
        let dt = t_now - t_prev;
        if !(dt > T::zero()) {
            return Err(EstimatorError::non_monotonic(index, t_prev, t_now));
        }

        let half = T::lit(0.5);
        let mut a = Matrix::identity(2);
        a.set(0, 1, dt);

        Ok(Self {
            a,
            b: Matrix::column(&[half * dt * dt, dt]),
            u: Matrix::scalar(1, a_now - a_prev),
        })
    }
}
