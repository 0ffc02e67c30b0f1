use core::fmt::Debug;
use nalgebra::RealField;
use num_traits::Float;

/// The scalar type the estimator operates on, i.e. `f32` or `f64`.
///
/// Both `Float` and `RealField` provide methods such as `abs` and `sqrt`;
/// generic code calls them as `Float::abs(x)`.
pub trait Scalar: Float + RealField + Debug + Default + Send + Sync + 'static {
    /// Converts a literal into the scalar type.
    fn lit(value: f64) -> Self;

    /// Converts the value to `f64` for reporting.
    fn as_f64(self) -> f64;
}

impl Scalar for f32 {
    #[inline(always)]
    fn lit(value: f64) -> Self {
        value as f32
    }

    #[inline(always)]
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Scalar for f64 {
    #[inline(always)]
    fn lit(value: f64) -> Self {
        value
    }

    #[inline(always)]
    fn as_f64(self) -> f64 {
        self
    }
}

pub trait IsNaN {
    /// Determines whether the value is NaN.
    fn is_nan(&self) -> bool;
}

impl<T> IsNaN for T
where
    T: Scalar,
{
    #[inline(always)]
    fn is_nan(&self) -> bool {
        Float::is_nan(*self)
    }
}
