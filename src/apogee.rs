//! Apogee detection on a filtered pressure (or analogous) signal.
//!
//! An apogee is reported at a sample that is a local minimum of its three-sample
//! neighbourhood, sits on a flat stretch of the signal (both the three-sample
//! look-back and look-ahead slopes stay below a threshold), beats every previously
//! reported event, and lies at least a minimum time gap after the last event.

use crate::error::EstimatorError;
use crate::impl_uniform_struct;
use crate::numeric::Scalar;
use alloc::vec::Vec;
use num_traits::Float;
use serde::{Deserialize, Serialize};
use tracing::info;
use uniform_array_derive::UniformArray;

/// The number of samples the slope look-back and look-ahead span.
pub const SLOPE_SPAN: usize = 3;

/// A detected apogee.
#[derive(UniformArray, Clone, PartialEq, Debug)]
#[cfg_attr(test, ensure_uniform_type::ensure_uniform_type)]
#[repr(C)]
pub struct ApogeeEvent<T> {
    /// The sample time of the event.
    pub time: T,
    /// The filtered value at the event.
    pub value: T,
}

impl<T> ApogeeEvent<T> {
    /// Initializes a new [`ApogeeEvent`] instance.
    #[inline(always)]
    pub const fn new(time: T, value: T) -> Self {
        Self { time, value }
    }
}

impl_uniform_struct!(ApogeeEvent, T, 2, [time, value]);

/// Tuning of the [`ApogeeDetector`].
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "T: Scalar + Deserialize<'de>"))]
pub struct DetectorConfig<T> {
    /// Both slopes must be strictly below this magnitude, in value units per time unit.
    pub slope_threshold: T,
    /// The minimum time between two reported events.
    pub min_gap: T,
    /// How far above the smallest neighbour a sample may be and still count as a
    /// local minimum. Zero demands exact equality.
    pub local_min_tolerance: T,
}

impl<T> Default for DetectorConfig<T>
where
    T: Scalar,
{
    fn default() -> Self {
        Self {
            slope_threshold: T::lit(0.05),
            min_gap: T::lit(2.0),
            local_min_tolerance: T::zero(),
        }
    }
}

/// An incremental scanner for flattened global minima of a filtered signal.
#[derive(Debug, Clone)]
pub struct ApogeeDetector<T> {
    config: DetectorConfig<T>,
    last_event_time: T,
    global_min_value: T,
    events: Vec<ApogeeEvent<T>>,
}

impl<T> Default for ApogeeDetector<T>
where
    T: Scalar,
{
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

impl<T> ApogeeDetector<T>
where
    T: Scalar,
{
    /// Initializes a new instance of the [`ApogeeDetector`] struct.
    pub fn new(config: DetectorConfig<T>) -> Self {
        Self {
            config,
            last_event_time: T::neg_infinity(),
            global_min_value: T::infinity(),
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &DetectorConfig<T> {
        &self.config
    }

    /// All events reported so far, in detection order.
    pub fn events(&self) -> &[ApogeeEvent<T>] {
        &self.events
    }

    /// The first reported event; for a single ascent this is the flight apogee.
    pub fn first_event(&self) -> Option<&ApogeeEvent<T>> {
        self.events.first()
    }

    /// Forgets all reported events.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    /// Determines whether `index` has a full look-back and look-ahead in a sequence of `len` samples.
    #[inline]
    pub fn is_evaluable(index: usize, len: usize) -> bool {
        index >= SLOPE_SPAN && index < len.saturating_sub(SLOPE_SPAN)
    }

    /// Evaluates the sample at `index`.
    ///
    /// Indices without a three-sample look-back and look-ahead are skipped.
    ///
    /// ## Arguments
    /// * `index` - The sample to evaluate.
    /// * `filtered` - The filtered values available so far.
    /// * `times` - The sample times; must have the same length as `filtered`.
    ///
    /// ## Errors
    /// Returns [`EstimatorError::ShapeMismatch`] if the slices differ in length and
    /// [`EstimatorError::NonMonotonicTime`] if the times around `index` are not strictly increasing.
    pub fn observe(
        &mut self,
        index: usize,
        filtered: &[T],
        times: &[T],
    ) -> Result<Option<ApogeeEvent<T>>, EstimatorError> {
        if filtered.len() != times.len() {
            return Err(EstimatorError::shape(
                "sample times",
                (filtered.len(), 1),
                (times.len(), 1),
            ));
        }
        if !Self::is_evaluable(index, filtered.len()) {
            return Ok(None);
        }

        for i in (index - SLOPE_SPAN + 1)..=(index + SLOPE_SPAN) {
            if !(times[i] > times[i - 1]) {
                return Err(EstimatorError::non_monotonic(i, times[i - 1], times[i]));
            }
        }

        let value = filtered[index];
        let time = times[index];

        let before = index - SLOPE_SPAN;
        let after = index + SLOPE_SPAN;
        let prev_slope = (value - filtered[before]) / (time - times[before]);
        let next_slope = (filtered[after] - value) / (times[after] - time);

        let local_min = filtered[index - 1..=index + 1]
            .iter()
            .fold(T::infinity(), |acc, &v| Float::min(acc, v));
        let is_local_min = value <= local_min + self.config.local_min_tolerance;
        let is_flattish = Float::abs(prev_slope) < self.config.slope_threshold
            && Float::abs(next_slope) < self.config.slope_threshold;
        let is_new_global_min = value < self.global_min_value;

        if !(is_local_min && is_flattish && is_new_global_min) {
            return Ok(None);
        }
        if time - self.last_event_time < self.config.min_gap {
            return Ok(None);
        }

        info!(time = ?time, value = ?value, "apogee detected");
        let event = ApogeeEvent::new(time, value);
        self.last_event_time = time;
        self.global_min_value = value;
        self.events.push(event.clone());
        Ok(Some(event))
    }

    /// Evaluates every index of a complete sequence in order.
    ///
    /// Returns the events emitted by this scan.
    pub fn scan(&mut self, filtered: &[T], times: &[T]) -> Result<Vec<ApogeeEvent<T>>, EstimatorError> {
        let mut emitted = Vec::new();
        for index in 0..filtered.len() {
            if let Some(event) = self.observe(index, filtered, times)? {
                emitted.push(event);
            }
        }
        Ok(emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use proptest::prelude::*;

    const VALLEY: [f64; 15] = [
        5.0, 5.0, 5.0, 4.0, 3.0, 2.0, 1.0, 1.0, 1.0, 2.0, 3.0, 4.0, 5.0, 5.0, 5.0,
    ];

    fn times(count: usize, spacing: f64) -> Vec<f64> {
        (0..count).map(|i| i as f64 * spacing).collect()
    }

    #[test]
    fn test_valley_unit_spacing_is_too_steep() {
        // At unit spacing every three-sample slope around the valley is at least 1/3.
        let mut detector = ApogeeDetector::default();
        let events = detector.scan(&VALLEY, &times(VALLEY.len(), 1.0)).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_valley_reports_single_event() {
        let mut detector = ApogeeDetector::default();
        let events = detector.scan(&VALLEY, &times(VALLEY.len(), 30.0)).unwrap();
        assert_eq!(events, vec![ApogeeEvent::new(180.0, 1.0)]);
        assert_eq!(detector.first_event(), Some(&ApogeeEvent::new(180.0, 1.0)));
    }

    #[test]
    fn test_valley_with_relaxed_threshold() {
        let mut detector = ApogeeDetector::new(DetectorConfig {
            slope_threshold: 0.7,
            ..DetectorConfig::default()
        });
        let events = detector.scan(&VALLEY, &times(VALLEY.len(), 1.0)).unwrap();
        assert_eq!(events, vec![ApogeeEvent::new(7.0, 1.0)]);
    }

    #[test]
    fn test_out_of_range_indices_are_skipped() {
        let mut detector = ApogeeDetector::default();
        let filtered = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let t = times(filtered.len(), 10.0);
        for index in [0, 1, 2, 4, 5, 6, 7, 100] {
            assert_eq!(detector.observe(index, &filtered, &t).unwrap(), None);
        }
        assert!(detector.observe(3, &filtered, &t).unwrap().is_some());
    }

    #[test]
    fn test_indices_near_usize_max_are_skipped() {
        let mut detector = ApogeeDetector::default();
        let filtered = [0.0; 7];
        let t = times(filtered.len(), 1.0);
        for index in [usize::MAX, usize::MAX - 1, usize::MAX - SLOPE_SPAN] {
            assert_eq!(detector.observe(index, &filtered, &t).unwrap(), None);
        }
        assert!(!ApogeeDetector::<f64>::is_evaluable(usize::MAX, usize::MAX));
        assert!(ApogeeDetector::<f64>::is_evaluable(3, 7));
        assert!(!ApogeeDetector::<f64>::is_evaluable(3, 6));
    }

    #[test]
    fn test_exact_equality_versus_tolerance() {
        let filtered = [2.0, 2.0, 2.0, 1.0005, 1.0, 2.0, 2.0, 2.0];
        let t = times(filtered.len(), 100.0);

        let mut strict = ApogeeDetector::default();
        assert_eq!(strict.observe(3, &filtered, &t).unwrap(), None);

        let mut tolerant = ApogeeDetector::new(DetectorConfig {
            local_min_tolerance: 0.001,
            ..DetectorConfig::default()
        });
        assert!(tolerant.observe(3, &filtered, &t).unwrap().is_some());
    }

    #[test]
    fn test_min_gap_suppresses_close_events() {
        // The deeper minimum at index 5 follows the first event too closely.
        let filtered = [3.0, 3.0, 3.0, 2.0, 2.0, 1.0, 1.0, 1.0, 1.0];
        let t = times(filtered.len(), 1.0);
        let mut detector = ApogeeDetector::new(DetectorConfig {
            slope_threshold: 10.0,
            min_gap: 3.0,
            local_min_tolerance: 0.0,
        });
        let events = detector.scan(&filtered, &t).unwrap();
        assert_eq!(events, vec![ApogeeEvent::new(3.0, 2.0)]);
    }

    #[test]
    fn test_non_monotonic_time() {
        let filtered = [0.0; 7];
        let t = [0.0, 1.0, 2.0, 3.0, 3.0, 5.0, 6.0];
        let mut detector = ApogeeDetector::default();
        assert!(matches!(
            detector.observe(3, &filtered, &t),
            Err(EstimatorError::NonMonotonicTime { index: 4, .. })
        ));
    }

    #[test]
    fn test_length_mismatch() {
        let mut detector = ApogeeDetector::<f64>::default();
        assert!(detector.observe(3, &[0.0; 7], &[0.0; 6]).is_err());
    }

    #[test]
    fn test_reset() {
        let mut detector = ApogeeDetector::default();
        detector.scan(&VALLEY, &times(VALLEY.len(), 30.0)).unwrap();
        assert_eq!(detector.events().len(), 1);
        detector.reset();
        assert!(detector.events().is_empty());
        assert_eq!(detector.scan(&VALLEY, &times(VALLEY.len(), 30.0)).unwrap().len(), 1);
    }

    #[test]
    fn test_event_fields() {
        let event = ApogeeEvent::new(12.5_f32, 870.0);
        assert_eq!(event.len(), 2);
        assert_eq!(event[0], 12.5);
        assert_eq!(event.fields(), [12.5, 870.0]);
    }

    proptest! {
        #[test]
        fn prop_events_are_ordered_and_spaced(
            values in prop::collection::vec(-10.0_f64..10.0, 7..200),
            spacing in 0.01_f64..5.0,
            min_gap in 0.0_f64..10.0,
            slope_threshold in 0.01_f64..50.0,
        ) {
            let t = times(values.len(), spacing);
            let mut detector = ApogeeDetector::new(DetectorConfig {
                slope_threshold,
                min_gap,
                local_min_tolerance: 0.0,
            });
            let events = detector.scan(&values, &t).unwrap();
            for pair in events.windows(2) {
                prop_assert!(pair[1].time > pair[0].time);
                prop_assert!(pair[1].value < pair[0].value);
                prop_assert!(pair[1].time - pair[0].time >= min_gap);
            }
        }
    }
}
