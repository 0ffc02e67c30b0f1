//! Adaptive linear state estimation and apogee detection for rocket telemetry.
//!
//! The crate provides three building blocks and a driver that wires them together:
//!
//! * [`LinearStateEstimator`] - a discrete-time Kalman filter whose transition, control
//!   and measurement noise matrices can be swapped on every step,
//! * [`AdaptiveCovarianceEstimator`] - a measurement noise estimate from the scatter of
//!   the last three samples,
//! * [`ApogeeDetector`] - a flattened-global-minimum detector on a filtered signal,
//! * [`ApogeePipeline`] - the per-sample driver.

// Enable no_std mode.
#![cfg_attr(not(feature = "std"), no_std)]
// Ensure allow(unsafe_code) / forbid(unsafe_code) markers.
#![cfg_attr(feature = "unsafe", allow(unsafe_code))]
#![cfg_attr(not(feature = "unsafe"), forbid(unsafe_code))]
// Only enables the `doc_cfg` feature when the `docsrs` configuration attribute is defined.
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

pub mod adaptive;
pub mod apogee;
mod error;
pub mod estimator;
mod macros;
mod matrix;
mod numeric;
pub mod pipeline;
pub mod rc_filter;
mod readings;

pub use crate::adaptive::{AdaptiveCovarianceEstimator, DynamicModel, SampleWindow};
pub use crate::apogee::{ApogeeDetector, ApogeeEvent, DetectorConfig};
pub use crate::error::EstimatorError;
pub use crate::estimator::{
    LinearStateEstimator, ModelMatrices, Recursion, StepDiagnostics, StepOverrides,
};
pub use crate::matrix::Matrix;
pub use crate::numeric::*;
pub use crate::pipeline::{
    ApogeePipeline, FilterMode, FlightTrack, PipelineConfig, PipelineStep, SecondChannel,
    SingularPolicy, StepOutcome,
};
pub use crate::readings::{AccelerometerReading, FlightSample};
