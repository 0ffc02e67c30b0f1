//! Drives raw telemetry samples through the estimator and the apogee detector in lock-step.

use crate::adaptive::{AdaptiveCovarianceEstimator, DynamicModel, SampleWindow};
use crate::apogee::{ApogeeDetector, ApogeeEvent, DetectorConfig, SLOPE_SPAN};
use crate::error::EstimatorError;
use crate::estimator::{
    LinearStateEstimator, ModelMatrices, Recursion, StepDiagnostics, StepOverrides,
    DEFAULT_SINGULAR_THRESHOLD,
};
use crate::matrix::Matrix;
use crate::numeric::Scalar;
use crate::readings::FlightSample;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Which channel the estimator tracks.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// One state: the barometric pressure, with a fixed measurement noise.
    #[default]
    Pressure,
    /// Two states: total acceleration and velocity, with a per-step kinematic
    /// model and a measurement noise estimated from the last three samples.
    Acceleration,
}

/// What to do when the innovation covariance cannot be inverted.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingularPolicy {
    /// Keep the filter state, report the current estimate and continue.
    #[default]
    SkipUpdate,
    /// Fail the sample with [`EstimatorError::SingularMatrix`].
    Abort,
}

/// The second entry of the measurement vector in [`FilterMode::Acceleration`].
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondChannel {
    /// Measure `[acceleration, velocity]`, matching the velocity state.
    #[default]
    Velocity,
    /// Measure `[acceleration, time]`, as the recorded flight scripts did.
    /// The innovation of the second state then compares time against velocity.
    Time,
}

/// Configuration of an [`ApogeePipeline`].
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "T: Scalar + Deserialize<'de>"))]
pub struct PipelineConfig<T> {
    pub mode: FilterMode,
    pub recursion: Recursion,
    pub second_channel: SecondChannel,
    /// Diagonal of the process noise covariance `Q`.
    pub process_noise: T,
    /// The measurement noise `R` of the pressure channel.
    pub pressure_noise: T,
    /// Diagonal of the initial state covariance `P0`.
    pub initial_covariance: T,
    /// Relative pivot threshold for inverting the innovation covariance.
    pub singular_threshold: T,
    pub singular_policy: SingularPolicy,
    pub detector: DetectorConfig<T>,
}

impl<T> Default for PipelineConfig<T>
where
    T: Scalar,
{
    fn default() -> Self {
        Self {
            mode: FilterMode::default(),
            recursion: Recursion::default(),
            second_channel: SecondChannel::default(),
            process_noise: T::lit(0.0001),
            pressure_noise: T::lit(0.1),
            initial_covariance: T::one(),
            singular_threshold: T::lit(DEFAULT_SINGULAR_THRESHOLD),
            singular_policy: SingularPolicy::default(),
            detector: DetectorConfig::default(),
        }
    }
}

impl<T> PipelineConfig<T>
where
    T: Scalar,
{
    /// Checks that all noise terms and thresholds are in range.
    pub fn validate(&self) -> Result<(), EstimatorError> {
        let non_negative = [
            ("process_noise", self.process_noise),
            ("pressure_noise", self.pressure_noise),
            ("initial_covariance", self.initial_covariance),
            ("detector.min_gap", self.detector.min_gap),
            ("detector.local_min_tolerance", self.detector.local_min_tolerance),
        ];
        for (name, value) in non_negative {
            if !(value >= T::zero()) {
                return Err(EstimatorError::InvalidParameter {
                    name,
                    reason: "must be non-negative",
                });
            }
        }

        let positive = [
            ("singular_threshold", self.singular_threshold),
            ("detector.slope_threshold", self.detector.slope_threshold),
        ];
        for (name, value) in positive {
            if !(value > T::zero()) {
                return Err(EstimatorError::InvalidParameter {
                    name,
                    reason: "must be positive",
                });
            }
        }
        Ok(())
    }
}

/// How the estimator handled a sample.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome<T> {
    /// Not enough history for the adaptive path; the raw value was passed through.
    Bootstrap,
    /// The estimator ran a full predict/update cycle.
    Filtered(StepDiagnostics<T>),
    /// The innovation covariance was singular and the update was skipped.
    Skipped,
}

/// The result of feeding one sample into the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineStep<T> {
    /// The index of the sample.
    pub index: usize,
    pub time: T,
    /// The raw value of the tracked channel.
    pub raw: T,
    /// The filtered value appended to the history.
    pub filtered: T,
    pub outcome: StepOutcome<T>,
    /// An apogee confirmed by this sample. Events lag the sample by three
    /// samples, since the detector needs a look-ahead.
    pub event: Option<ApogeeEvent<T>>,
}

/// The history of a processed flight.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightTrack<T> {
    pub times: Vec<T>,
    pub raw: Vec<T>,
    pub filtered: Vec<T>,
    pub events: Vec<ApogeeEvent<T>>,
}

impl<T> Default for FlightTrack<T> {
    fn default() -> Self {
        Self {
            times: Vec::new(),
            raw: Vec::new(),
            filtered: Vec::new(),
            events: Vec::new(),
        }
    }
}

impl<T> FlightTrack<T>
where
    T: Copy,
{
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// The filtered series as `(time, value)` pairs.
    pub fn filtered_pairs(&self) -> impl Iterator<Item = (T, T)> + '_ {
        self.times.iter().copied().zip(self.filtered.iter().copied())
    }

    /// The first detected apogee.
    pub fn first_apogee(&self) -> Option<&ApogeeEvent<T>> {
        self.events.first()
    }
}

/// Threads samples through the adaptive covariance estimate, the linear state
/// estimator and the apogee detector.
#[derive(Debug, Clone)]
pub struct ApogeePipeline<T> {
    config: PipelineConfig<T>,
    /// Constructed from the first sample.
    estimator: Option<LinearStateEstimator<T>>,
    covariance: AdaptiveCovarianceEstimator,
    acceleration_window: SampleWindow<T>,
    velocity_window: SampleWindow<T>,
    detector: ApogeeDetector<T>,
    track: FlightTrack<T>,
}

impl<T> ApogeePipeline<T>
where
    T: Scalar,
{
    /// Initializes a new instance of the [`ApogeePipeline`] struct.
    ///
    /// ## Errors
    /// Returns [`EstimatorError::InvalidParameter`] if the configuration is out of range.
    pub fn new(config: PipelineConfig<T>) -> Result<Self, EstimatorError> {
        config.validate()?;
        Ok(Self {
            config,
            estimator: None,
            covariance: AdaptiveCovarianceEstimator,
            acceleration_window: SampleWindow::new(),
            velocity_window: SampleWindow::new(),
            detector: ApogeeDetector::new(config.detector),
            track: FlightTrack::default(),
        })
    }

    /// Processes a complete recording.
    pub fn run<I>(config: PipelineConfig<T>, samples: I) -> Result<FlightTrack<T>, EstimatorError>
    where
        I: IntoIterator<Item = FlightSample<T>>,
    {
        let mut pipeline = Self::new(config)?;
        for sample in samples {
            pipeline.push(sample)?;
        }
        Ok(pipeline.finish())
    }

    pub fn config(&self) -> &PipelineConfig<T> {
        &self.config
    }

    /// The estimator, once the first sample has been seen.
    pub fn estimator(&self) -> Option<&LinearStateEstimator<T>> {
        self.estimator.as_ref()
    }

    pub fn track(&self) -> &FlightTrack<T> {
        &self.track
    }

    pub fn events(&self) -> &[ApogeeEvent<T>] {
        self.detector.events()
    }

    /// The most recent velocity sample, measured or integrated.
    pub fn velocity(&self) -> Option<T> {
        self.velocity_window.latest()
    }

    /// Consumes the pipeline and returns the processed history.
    pub fn finish(mut self) -> FlightTrack<T> {
        self.track.events = self.detector.events().to_vec();
        self.track
    }

    /// Feeds one sample through the pipeline.
    ///
    /// On error nothing is recorded and the pipeline stays usable.
    ///
    /// ## Errors
    /// * [`EstimatorError::NonMonotonicTime`] if the sample does not advance time.
    /// * [`EstimatorError::SingularMatrix`] under [`SingularPolicy::Abort`].
    pub fn push(&mut self, sample: FlightSample<T>) -> Result<PipelineStep<T>, EstimatorError> {
        let index = self.track.len();
        let previous_time = self.track.times.last().copied();
        if let Some(previous) = previous_time {
            if !(sample.time > previous) {
                return Err(EstimatorError::non_monotonic(index, previous, sample.time));
            }
        }

        let fresh_estimator = self.estimator.is_none();
        let result = match self.config.mode {
            FilterMode::Pressure => self.filter_pressure(&sample),
            FilterMode::Acceleration => self.filter_acceleration(index, previous_time, &sample),
        };
        let (raw, filtered, outcome) = match result {
            Ok(output) => output,
            Err(err) => {
                if fresh_estimator {
                    self.estimator = None;
                }
                return Err(err);
            }
        };

        debug!(index, time = ?sample.time, raw = ?raw, filtered = ?filtered, "sample processed");

        self.track.times.push(sample.time);
        self.track.raw.push(raw);
        self.track.filtered.push(filtered);

        let event = match self.track.len().checked_sub(SLOPE_SPAN + 1) {
            Some(candidate) => {
                self.detector
                    .observe(candidate, &self.track.filtered, &self.track.times)?
            }
            None => None,
        };

        Ok(PipelineStep {
            index,
            time: sample.time,
            raw,
            filtered,
            outcome,
            event,
        })
    }

    fn filter_pressure(
        &mut self,
        sample: &FlightSample<T>,
    ) -> Result<(T, T, StepOutcome<T>), EstimatorError> {
        let raw = sample.pressure;
        if self.estimator.is_none() {
            self.estimator = Some(self.build_pressure_estimator(raw)?);
        }

        let (filtered, outcome) = self.update(Matrix::column(&[raw]), StepOverrides::none())?;
        Ok((raw, filtered, outcome))
    }

    fn filter_acceleration(
        &mut self,
        index: usize,
        previous_time: Option<T>,
        sample: &FlightSample<T>,
    ) -> Result<(T, T, StepOutcome<T>), EstimatorError> {
        let raw = sample.acceleration;
        let velocity = match (sample.velocity, previous_time) {
            (Some(velocity), _) => velocity,
            (None, Some(previous)) => self.integrate_velocity(previous, sample),
            (None, None) => T::zero(),
        };

        let mut acceleration_window = self.acceleration_window.clone();
        let mut velocity_window = self.velocity_window.clone();
        acceleration_window.push(raw);
        velocity_window.push(velocity);

        if self.estimator.is_none() {
            self.estimator = Some(self.build_acceleration_estimator(raw, velocity)?);
        }

        let estimate = self
            .covariance
            .estimate(&acceleration_window, &velocity_window);
        let (filtered, outcome) = match (estimate, previous_time, self.acceleration_window.latest()) {
            (Some(r), Some(t_prev), Some(a_prev)) => {
                let model = DynamicModel::from_spacing(index, t_prev, sample.time, a_prev, raw)?;
                let overrides = StepOverrides::none()
                    .with_transition(model.a)
                    .with_control(model.b, model.u)
                    .with_measurement_noise(r);
                let second = match self.config.second_channel {
                    SecondChannel::Velocity => velocity,
                    SecondChannel::Time => sample.time,
                };
                self.update(Matrix::column(&[raw, second]), overrides)?
            }
            _ => (raw, StepOutcome::Bootstrap),
        };

        self.acceleration_window = acceleration_window;
        self.velocity_window = velocity_window;
        Ok((raw, filtered, outcome))
    }

    /// Trapezoidal integration of the acceleration channel.
    fn integrate_velocity(&self, previous_time: T, sample: &FlightSample<T>) -> T {
        let v_prev = self.velocity_window.latest().unwrap_or_else(T::zero);
        let a_prev = self.acceleration_window.latest().unwrap_or(sample.acceleration);
        let dt = sample.time - previous_time;
        v_prev + T::lit(0.5) * (a_prev + sample.acceleration) * dt
    }

    /// Runs one estimator step and applies the singular policy.
    fn update(
        &mut self,
        z: Matrix<T>,
        overrides: StepOverrides<T>,
    ) -> Result<(T, StepOutcome<T>), EstimatorError> {
        let Some(estimator) = self.estimator.as_mut() else {
            return Err(EstimatorError::InvalidParameter {
                name: "estimator",
                reason: "not initialized",
            });
        };

        match estimator.step(&z, overrides) {
            Ok(diagnostics) => {
                let filtered = diagnostics
                    .x_post
                    .try_get(0, 0)
                    .ok_or(EstimatorError::shape("x", (1, 1), diagnostics.x_post.shape()))?;
                Ok((filtered, StepOutcome::Filtered(diagnostics)))
            }
            Err(EstimatorError::SingularMatrix { what })
                if self.config.singular_policy == SingularPolicy::SkipUpdate =>
            {
                warn!(what, "update skipped");
                let estimate = estimator
                    .estimate(0)
                    .ok_or(EstimatorError::shape("x", (1, 1), estimator.state().shape()))?;
                Ok((estimate, StepOutcome::Skipped))
            }
            Err(err) => Err(err),
        }
    }

    fn build_pressure_estimator(&self, x0: T) -> Result<LinearStateEstimator<T>, EstimatorError> {
        let model = ModelMatrices::new(
            Matrix::identity(1),
            Matrix::zeros(1, 1),
            Matrix::zeros(1, 1),
            Matrix::scalar(1, self.config.process_noise),
            Matrix::identity(1),
            Matrix::scalar(1, self.config.pressure_noise),
        )?;
        self.build_estimator(model, Matrix::column(&[x0]))
    }

    fn build_acceleration_estimator(
        &self,
        acceleration: T,
        velocity: T,
    ) -> Result<LinearStateEstimator<T>, EstimatorError> {
        // R is replaced by the adaptive estimate on every step.
        let model = ModelMatrices::new(
            Matrix::identity(2),
            Matrix::zeros(2, 1),
            Matrix::zeros(1, 1),
            Matrix::scalar(2, self.config.process_noise),
            Matrix::identity(2),
            Matrix::identity(2),
        )?;
        self.build_estimator(model, Matrix::column(&[acceleration, velocity]))
    }

    fn build_estimator(
        &self,
        model: ModelMatrices<T>,
        x0: Matrix<T>,
    ) -> Result<LinearStateEstimator<T>, EstimatorError> {
        let p0 = Matrix::scalar(model.states(), self.config.initial_covariance);
        Ok(LinearStateEstimator::new(model, x0, p0)?
            .with_recursion(self.config.recursion)
            .with_singular_threshold(self.config.singular_threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    /// Pressure falls to a minimum at t = 10 s and rises again.
    fn parabolic_flight(spacing: f64, duration: f64) -> Vec<FlightSample<f64>> {
        let count = (duration / spacing) as usize + 1;
        (0..count)
            .map(|i| {
                let t = i as f64 * spacing;
                FlightSample::new(t, 900.0 + 0.01 * (t - 10.0) * (t - 10.0), 9.81)
            })
            .collect()
    }

    fn acceleration_config() -> PipelineConfig<f64> {
        PipelineConfig {
            mode: FilterMode::Acceleration,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_pressure_first_sample_passes_through() {
        let mut pipeline = ApogeePipeline::new(PipelineConfig::default()).unwrap();
        let step = pipeline
            .push(FlightSample::new(0.0, 1013.25, 9.81))
            .unwrap();
        assert_eq!(step.filtered, 1013.25);
        assert!(matches!(step.outcome, StepOutcome::Filtered(_)));
    }

    #[test]
    fn test_single_apogee_in_parabolic_flight() {
        let track = ApogeePipeline::run(PipelineConfig::default(), parabolic_flight(0.5, 20.0))
            .unwrap();
        assert_eq!(track.len(), 41);
        assert_eq!(track.events.len(), 1);
        let apogee = track.first_apogee().unwrap();
        assert!((apogee.time - 10.0).abs() <= 1.0, "{apogee:?}");
        assert!((apogee.value - 900.0).abs() < 0.1);
    }

    #[test]
    fn test_streaming_matches_batch_scan() {
        let track = ApogeePipeline::run(PipelineConfig::default(), parabolic_flight(0.5, 20.0))
            .unwrap();
        let mut detector = ApogeeDetector::new(DetectorConfig::default());
        let batch = detector.scan(&track.filtered, &track.times).unwrap();
        assert_eq!(batch, track.events);
    }

    #[test]
    fn test_event_is_reported_three_samples_late() {
        let mut pipeline = ApogeePipeline::new(PipelineConfig::default()).unwrap();
        let mut reported = None;
        for sample in parabolic_flight(0.5, 20.0) {
            let step = pipeline.push(sample).unwrap();
            if let Some(event) = step.event {
                reported = Some((step.index, event));
            }
        }
        let (index, event) = reported.unwrap();
        assert_eq!(pipeline.track().times[index - SLOPE_SPAN], event.time);
    }

    #[test]
    fn test_rejects_non_monotonic_time() {
        let mut pipeline = ApogeePipeline::new(PipelineConfig::default()).unwrap();
        pipeline.push(FlightSample::new(1.0, 1000.0, 9.81)).unwrap();
        let result = pipeline.push(FlightSample::new(1.0, 999.0, 9.81));
        assert!(matches!(
            result,
            Err(EstimatorError::NonMonotonicTime { index: 1, .. })
        ));
        assert_eq!(pipeline.track().len(), 1);
        assert!(pipeline.push(FlightSample::new(1.1, 999.0, 9.81)).is_ok());
    }

    #[test]
    fn test_acceleration_bootstrap_passes_raw_values() {
        let mut pipeline = ApogeePipeline::new(acceleration_config()).unwrap();
        let samples = [
            FlightSample::new(0.0, 1000.0, 12.5).with_velocity(0.0),
            FlightSample::new(0.1, 999.0, 14.0).with_velocity(1.3),
            FlightSample::new(0.2, 998.0, 13.1).with_velocity(2.7),
        ];

        let first = pipeline.push(samples[0]).unwrap();
        let second = pipeline.push(samples[1]).unwrap();
        assert_eq!(first.filtered, 12.5);
        assert_eq!(second.filtered, 14.0);
        assert_eq!(first.outcome, StepOutcome::Bootstrap);
        assert_eq!(second.outcome, StepOutcome::Bootstrap);

        let third = pipeline.push(samples[2]).unwrap();
        let StepOutcome::Filtered(diagnostics) = third.outcome else {
            panic!("expected a filter step, got {:?}", third.outcome);
        };
        assert_eq!(diagnostics.x_prior, Matrix::column(&[12.5, 0.0]));
        assert_eq!(third.filtered, diagnostics.x_post.get(0, 0));

        let model = pipeline.estimator().unwrap().model();
        assert_eq!(
            model.a,
            Matrix::from_rows(&[&[1.0, 0.2 - 0.1], &[0.0, 1.0]]).unwrap()
        );
        assert!((model.u.get(0, 0) - (13.1 - 14.0)).abs() < 1e-12);
        assert!(model.r.is_symmetric(0.0));
    }

    fn third_step_innovation(second_channel: SecondChannel) -> Matrix<f64> {
        let config = PipelineConfig {
            second_channel,
            ..acceleration_config()
        };
        let mut pipeline = ApogeePipeline::new(config).unwrap();
        pipeline
            .push(FlightSample::new(0.0, 1000.0, 12.5).with_velocity(0.0))
            .unwrap();
        pipeline
            .push(FlightSample::new(0.1, 999.0, 14.0).with_velocity(1.3))
            .unwrap();
        let step = pipeline
            .push(FlightSample::new(0.2, 998.0, 13.1).with_velocity(2.7))
            .unwrap();
        match step.outcome {
            StepOutcome::Filtered(diagnostics) => diagnostics.innovation,
            other => panic!("expected a filter step, got {other:?}"),
        }
    }

    #[test]
    fn test_second_channel_velocity() {
        let innovation = third_step_innovation(SecondChannel::Velocity);
        assert!((innovation.get(0, 0) - (13.1 - 12.5)).abs() < 1e-12);
        assert_eq!(innovation.get(1, 0), 2.7);
    }

    #[test]
    fn test_second_channel_time() {
        let innovation = third_step_innovation(SecondChannel::Time);
        assert!((innovation.get(0, 0) - (13.1 - 12.5)).abs() < 1e-12);
        assert_eq!(innovation.get(1, 0), 0.2);
    }

    #[test]
    fn test_second_channel_changes_filtered_acceleration() {
        let run = |second_channel| {
            let config = PipelineConfig {
                second_channel,
                ..acceleration_config()
            };
            let samples = (0..10).map(|i| {
                let t = i as f64 * 0.1;
                let jitter = if i % 2 == 0 { 0.4 } else { -0.3 };
                FlightSample::new(t, 1000.0, 12.0 + jitter).with_velocity(t * 12.0 + jitter)
            });
            ApogeePipeline::run(config, samples).unwrap().filtered
        };
        let by_velocity = run(SecondChannel::Velocity);
        let by_time = run(SecondChannel::Time);
        assert_eq!(by_velocity[..2], by_time[..2]);
        assert_ne!(by_velocity[2..], by_time[2..]);
    }

    #[test]
    fn test_degenerate_windows_skip_update() {
        let config = PipelineConfig {
            process_noise: 0.0,
            initial_covariance: 0.0,
            ..acceleration_config()
        };
        let mut pipeline = ApogeePipeline::new(config).unwrap();
        for i in 0..3 {
            let step = pipeline
                .push(FlightSample::new(i as f64, 1000.0, 1.0).with_velocity(2.0))
                .unwrap();
            if i == 2 {
                assert_eq!(step.outcome, StepOutcome::Skipped);
                assert_eq!(step.filtered, 1.0);
            }
        }
        assert_eq!(pipeline.track().len(), 3);
    }

    #[test]
    fn test_degenerate_windows_abort() {
        let config = PipelineConfig {
            process_noise: 0.0,
            initial_covariance: 0.0,
            singular_policy: SingularPolicy::Abort,
            ..acceleration_config()
        };
        let mut pipeline = ApogeePipeline::new(config).unwrap();
        pipeline
            .push(FlightSample::new(0.0, 1000.0, 1.0).with_velocity(2.0))
            .unwrap();
        pipeline
            .push(FlightSample::new(1.0, 1000.0, 1.0).with_velocity(2.0))
            .unwrap();
        let result = pipeline.push(FlightSample::new(2.0, 1000.0, 1.0).with_velocity(2.0));
        assert!(matches!(result, Err(EstimatorError::SingularMatrix { .. })));
        assert_eq!(pipeline.track().len(), 2);
    }

    #[test]
    fn test_velocity_is_integrated_when_missing() {
        let mut pipeline = ApogeePipeline::new(acceleration_config()).unwrap();
        pipeline.push(FlightSample::new(0.0, 1000.0, 2.0)).unwrap();
        assert_eq!(pipeline.velocity(), Some(0.0));
        pipeline.push(FlightSample::new(0.5, 1000.0, 2.0)).unwrap();
        assert_eq!(pipeline.velocity(), Some(1.0));
        pipeline.push(FlightSample::new(1.0, 1000.0, 4.0)).unwrap();
        assert_eq!(pipeline.velocity(), Some(2.5));
    }

    #[test]
    fn test_acceleration_mode_stays_finite() {
        let samples: Vec<_> = (0..60)
            .map(|i| {
                let t = i as f64 * 0.05;
                let a = 9.81 + (t * 3.0).sin() * 2.0 + if i % 2 == 0 { 0.3 } else { -0.2 };
                FlightSample::new(t, 1000.0 - t, a).with_velocity(t * 4.0 + (t * 7.0).cos())
            })
            .collect();
        let track = ApogeePipeline::run(acceleration_config(), samples).unwrap();
        assert_eq!(track.len(), 60);
        assert!(track.filtered.iter().all(|v| v.is_finite()));
        assert_eq!(track.filtered_pairs().count(), 60);
    }

    #[test]
    fn test_config_validation() {
        let config = PipelineConfig {
            pressure_noise: -0.1,
            ..PipelineConfig::<f64>::default()
        };
        assert!(matches!(
            ApogeePipeline::new(config),
            Err(EstimatorError::InvalidParameter { name: "pressure_noise", .. })
        ));
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: PipelineConfig<f64> = serde_json::from_str(
            r#"{ "mode": "acceleration", "detector": { "min_gap": 5.0 } }"#,
        )
        .unwrap();
        assert_eq!(config.mode, FilterMode::Acceleration);
        assert_eq!(config.detector.min_gap, 5.0);
        assert_eq!(config.detector.slope_threshold, 0.05);
        assert_eq!(config.pressure_noise, 0.1);
        assert_eq!(config.recursion, Recursion::Faithful);
        assert_eq!(config.second_channel, SecondChannel::Velocity);

        let scripted: PipelineConfig<f64> =
            serde_json::from_str(r#"{ "second_channel": "time" }"#).unwrap();
        assert_eq!(scripted.second_channel, SecondChannel::Time);
        assert_eq!(vec![config.singular_policy], vec![SingularPolicy::SkipUpdate]);
    }
}
