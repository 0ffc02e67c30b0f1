//! First-order RC low-pass smoothing of individual telemetry channels.
//!
//! This is a light pre-processing alternative to the Kalman path; each channel
//! keeps a single "last output" slot inside a [`FilterBank`].

use crate::error::EstimatorError;
use crate::numeric::Scalar;
use alloc::vec;
use alloc::vec::Vec;
use num_traits::Float;

/// The coefficients of a discrete first-order RC low-pass filter.
///
/// The filter output is `input · x + feedback · y_prev`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RcCoefficients<T> {
    /// Weight of the new input sample, `Ts / (Ts + RC)`.
    pub input: T,
    /// Weight of the previous output, `RC / (Ts + RC)`.
    pub feedback: T,
}

impl<T> RcCoefficients<T>
where
    T: Scalar,
{
    /// Computes the coefficients for a cutoff frequency and a sample time.
    ///
    /// ## Arguments
    /// * `cutoff_hz` - The cutoff frequency in Hz.
    /// * `sample_time` - The sample time in seconds.
    pub fn new(cutoff_hz: T, sample_time: T) -> Result<Self, EstimatorError> {
        if !(cutoff_hz > T::zero()) {
            return Err(EstimatorError::InvalidParameter {
                name: "cutoff_hz",
                reason: "must be positive",
            });
        }
        if !(sample_time > T::zero()) {
            return Err(EstimatorError::InvalidParameter {
                name: "sample_time",
                reason: "must be positive",
            });
        }

        let two_pi = T::lit(core::f64::consts::TAU);
        let rc = Float::recip(two_pi * cutoff_hz);
        let denominator = sample_time + rc;
        Ok(Self {
            input: sample_time / denominator,
            feedback: rc / denominator,
        })
    }
}

/// Computes the mean spacing of consecutive timestamps.
///
/// ## Errors
/// Returns [`EstimatorError::InvalidParameter`] with fewer than two timestamps or
/// when the mean spacing is not positive.
pub fn average_sample_time<T>(times: &[T]) -> Result<T, EstimatorError>
where
    T: Scalar,
{
    if times.len() < 2 {
        return Err(EstimatorError::InvalidParameter {
            name: "times",
            reason: "at least two timestamps are required",
        });
    }

    let total = times
        .windows(2)
        .fold(T::zero(), |acc, pair| acc + (pair[1] - pair[0]));
    let mean = total / T::lit((times.len() - 1) as f64);
    if !(mean > T::zero()) {
        return Err(EstimatorError::InvalidParameter {
            name: "times",
            reason: "mean sample time must be positive",
        });
    }
    Ok(mean)
}

/// A set of RC filters sharing one coefficient pair, one state slot per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterBank<T> {
    coefficients: RcCoefficients<T>,
    last_output: Vec<T>,
}

impl<T> FilterBank<T>
where
    T: Scalar,
{
    /// Creates a bank of `channels` filters, all starting from zero.
    pub fn new(coefficients: RcCoefficients<T>, channels: usize) -> Self {
        Self {
            coefficients,
            last_output: vec![T::zero(); channels],
        }
    }

    pub fn coefficients(&self) -> &RcCoefficients<T> {
        &self.coefficients
    }

    pub fn channels(&self) -> usize {
        self.last_output.len()
    }

    /// The most recent output of a channel.
    pub fn last_output(&self, channel: usize) -> Option<T> {
        self.last_output.get(channel).copied()
    }

    /// Filters one sample of a channel.
    ///
    /// ## Panics
    /// Panics if `channel` is out of range.
    pub fn update(&mut self, channel: usize, input: T) -> T {
        let slot = &mut self.last_output[channel];
        let out = self.coefficients.input * input + self.coefficients.feedback * *slot;
        *slot = out;
        out
    }

    /// Resets every channel to zero.
    pub fn reset(&mut self) {
        self.last_output.iter_mut().for_each(|slot| *slot = T::zero());
    }

    /// Resets a single channel to zero.
    pub fn reset_channel(&mut self, channel: usize) {
        self.last_output[channel] = T::zero();
    }

    /// Filters a whole column, starting the channel from zero.
    pub fn filter_column(&mut self, channel: usize, column: &[T]) -> Vec<T> {
        self.reset_channel(channel);
        column.iter().map(|&v| self.update(channel, v)).collect()
    }
}
