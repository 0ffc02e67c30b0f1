/// Errors raised by the estimator, the adaptive covariance path and the apogee detector.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EstimatorError {
    /// A matrix or vector does not have the shape its role requires.
    ///
    /// This is a configuration error; the estimator never broadcasts or reshapes.
    #[error("shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// The role of the offending matrix, e.g. `"R"` or `"z"`.
        what: &'static str,
        /// The expected `(rows, columns)`.
        expected: (usize, usize),
        /// The actual `(rows, columns)`.
        actual: (usize, usize),
    },

    /// A matrix that must be inverted is singular or too ill-conditioned.
    #[error("{what} is singular or ill-conditioned")]
    SingularMatrix {
        /// The role of the matrix, e.g. `"innovation covariance"`.
        what: &'static str,
    },

    /// Two consecutive timestamps were not strictly increasing.
    #[error("non-increasing timestamp at index {index}: {previous} followed by {current}")]
    NonMonotonicTime {
        /// The index of the later sample.
        index: usize,
        /// The earlier timestamp.
        previous: f64,
        /// The later timestamp.
        current: f64,
    },

    /// A scalar parameter is outside its valid range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// The parameter name.
        name: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}

impl EstimatorError {
    pub(crate) fn shape(what: &'static str, expected: (usize, usize), actual: (usize, usize)) -> Self {
        Self::ShapeMismatch {
            what,
            expected,
            actual,
        }
    }

    pub(crate) fn non_monotonic<T>(index: usize, previous: T, current: T) -> Self
    where
        T: num_traits::ToPrimitive,
    {
        Self::NonMonotonicTime {
            index,
            previous: previous.to_f64().unwrap_or(f64::NAN),
            current: current.to_f64().unwrap_or(f64::NAN),
        }
    }
}
