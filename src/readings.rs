use crate::impl_uniform_struct;
use crate::numeric::Scalar;
use core::fmt::{Debug, Formatter};
use core::ops::Mul;
use num_traits::Float;
use uniform_array_derive::UniformArray;

/// A tri-axis accelerometer reading.
#[derive(UniformArray)]
#[cfg_attr(test, ensure_uniform_type::ensure_uniform_type)]
#[repr(C)]
pub struct AccelerometerReading<T> {
    /// The acceleration along the x-axis, in meters per second squared.
    pub x: T,
    /// The acceleration along the y-axis, in meters per second squared.
    pub y: T,
    /// The acceleration along the z-axis, in meters per second squared.
    pub z: T,
}

impl<T> AccelerometerReading<T> {
    /// Initializes a new [`AccelerometerReading`] instance.
    #[inline(always)]
    pub const fn new(x: T, y: T, z: T) -> Self {
        Self { x, y, z }
    }

    /// The magnitude of the acceleration vector, i.e. the total acceleration.
    pub fn total(&self) -> T
    where
        T: Scalar,
    {
        Float::sqrt(self.x * self.x + self.y * self.y + self.z * self.z)
    }
}

impl<T> Default for AccelerometerReading<T>
where
    T: Default,
{
    #[inline]
    fn default() -> Self {
        Self::new(Default::default(), Default::default(), Default::default())
    }
}

impl<T> Clone for AccelerometerReading<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self {
            x: self.x.clone(),
            y: self.y.clone(),
            z: self.z.clone(),
        }
    }
}

impl<T> Debug for AccelerometerReading<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("AccelerometerReading")
            .field(&self.x)
            .field(&self.y)
            .field(&self.z)
            .finish()
    }
}

impl<T> Mul<T> for AccelerometerReading<T>
where
    T: Mul<T, Output = T> + Clone,
{
    type Output = AccelerometerReading<T>;

    fn mul(self, rhs: T) -> Self::Output {
        Self {
            x: self.x * rhs.clone(),
            y: self.y * rhs.clone(),
            z: self.z * rhs,
        }
    }
}

impl_uniform_struct!(AccelerometerReading, T, 3, [x, y, z]);

/// One telemetry sample as handed over by the ingestion layer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FlightSample<T> {
    /// The sample time; must be strictly increasing across samples.
    pub time: T,
    /// The barometric pressure.
    pub pressure: T,
    /// The total (scalar) acceleration.
    pub acceleration: T,
    /// The vertical velocity, if the sensor suite provides one.
    ///
    /// When absent, velocity is integrated from the acceleration channel.
    pub velocity: Option<T>,
}

impl<T> FlightSample<T> {
    /// Initializes a new [`FlightSample`] without a velocity channel.
    pub const fn new(time: T, pressure: T, acceleration: T) -> Self {
        Self {
            time,
            pressure,
            acceleration,
            velocity: None,
        }
    }

    /// Attaches a measured velocity.
    pub fn with_velocity(mut self, velocity: T) -> Self {
        self.velocity = Some(velocity);
        self
    }

    /// Builds a sample whose scalar acceleration is the magnitude of a tri-axis reading.
    pub fn from_axes(time: T, pressure: T, reading: &AccelerometerReading<T>) -> Self
    where
        T: Scalar,
    {
        Self::new(time, pressure, reading.total())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_len() {
        let reading = AccelerometerReading::<f32>::default();
        assert_eq!(reading.len(), 3);
    }

    #[test]
    fn test_index() {
        let reading = AccelerometerReading::<f32> {
            x: 1.0,
            y: 2.0,
            z: 3.0,
        };

        assert_eq!(reading[0], 1.0);
        assert_eq!(reading[1], 2.0);
        assert_eq!(reading[2], 3.0);
    }

    #[test]
    fn test_total() {
        let reading = AccelerometerReading::new(3.0_f64, 4.0, 12.0);
        assert_eq!(reading.total(), 13.0);
        assert_eq!((reading * 2.0).total(), 26.0);
    }

    #[test]
    fn test_sample_from_axes() {
        let sample = FlightSample::from_axes(0.5_f64, 1013.25, &AccelerometerReading::new(0.0, 0.0, 9.5));
        assert_eq!(sample.acceleration, 9.5);
        assert_eq!(sample.velocity, None);
        assert_eq!(sample.with_velocity(1.0).velocity, Some(1.0));
    }
}
