//! A linear Kalman state estimator with per-step model replacement.

mod filter;
mod types;

pub use filter::{LinearStateEstimator, DEFAULT_SINGULAR_THRESHOLD};
pub use types::{ModelMatrices, Recursion, StepDiagnostics, StepOverrides};
