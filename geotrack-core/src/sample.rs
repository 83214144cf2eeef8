//! Position Samples
//!
//! A [`PositionSample`] is a single resolved fix as delivered by a
//! [`GeolocationPlatform`](crate::GeolocationPlatform). Samples are plain
//! values: once produced they are never mutated, and they carry no
//! platform-specific objects, so callers can build them as literal fixtures.

use serde::{Deserialize, Serialize};

/// A single position fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSample {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,

    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,

    /// Radius of 95% confidence horizontal uncertainty, in meters
    pub accuracy_meters: f64,

    /// Altitude in meters, if the fix has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_meters: Option<f64>,

    /// Altitude uncertainty in meters; only present together with altitude
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_accuracy_meters: Option<f64>,

    /// Direction of travel in degrees clockwise from true north, [0, 360)
    ///
    /// Absent when the device is stationary or the heading is unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_degrees: Option<f64>,

    /// Ground speed in meters per second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_meters_per_second: Option<f64>,

    /// Capture time (milliseconds since epoch)
    ///
    /// Not guaranteed to be monotonic across samples of one session.
    pub captured_at_epoch_ms: i64,
}

/// Reason a sample failed [`PositionSample::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFault {
    LatitudeOutOfRange,
    LongitudeOutOfRange,
    InvalidAccuracy,
    AltitudeAccuracyWithoutAltitude,
    HeadingOutOfRange,
    NegativeSpeed,
}

impl std::fmt::Display for SampleFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleFault::LatitudeOutOfRange => write!(f, "Latitude out of range"),
            SampleFault::LongitudeOutOfRange => write!(f, "Longitude out of range"),
            SampleFault::InvalidAccuracy => write!(f, "Accuracy must be a finite value >= 0"),
            SampleFault::AltitudeAccuracyWithoutAltitude => {
                write!(f, "Altitude accuracy present without altitude")
            }
            SampleFault::HeadingOutOfRange => write!(f, "Heading out of range"),
            SampleFault::NegativeSpeed => write!(f, "Negative speed"),
        }
    }
}

impl std::error::Error for SampleFault {}

impl PositionSample {
    /// Create a sample with only the required fields set.
    pub fn new(latitude: f64, longitude: f64, accuracy_meters: f64, captured_at_epoch_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters,
            altitude_meters: None,
            altitude_accuracy_meters: None,
            heading_degrees: None,
            speed_meters_per_second: None,
            captured_at_epoch_ms,
        }
    }

    /// Set altitude and its (optional) accuracy.
    pub fn with_altitude(mut self, altitude_meters: f64, accuracy_meters: Option<f64>) -> Self {
        self.altitude_meters = Some(altitude_meters);
        self.altitude_accuracy_meters = accuracy_meters;
        self
    }

    /// Set heading in degrees.
    pub fn with_heading(mut self, heading_degrees: f64) -> Self {
        self.heading_degrees = Some(heading_degrees);
        self
    }

    /// Set speed in meters per second.
    pub fn with_speed(mut self, speed_meters_per_second: f64) -> Self {
        self.speed_meters_per_second = Some(speed_meters_per_second);
        self
    }

    /// Get position as (latitude, longitude) tuple.
    pub fn position(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    /// Speed converted to km/h, if known.
    pub fn speed_kmh(&self) -> Option<f64> {
        self.speed_meters_per_second.map(|s| s * 3.6)
    }

    /// Check the field ranges of this sample.
    pub fn validate(&self) -> Result<(), SampleFault> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(SampleFault::LatitudeOutOfRange);
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(SampleFault::LongitudeOutOfRange);
        }
        if !self.accuracy_meters.is_finite() || self.accuracy_meters < 0.0 {
            return Err(SampleFault::InvalidAccuracy);
        }
        if self.altitude_accuracy_meters.is_some() && self.altitude_meters.is_none() {
            return Err(SampleFault::AltitudeAccuracyWithoutAltitude);
        }
        if let Some(heading) = self.heading_degrees {
            if !(0.0..360.0).contains(&heading) {
                return Err(SampleFault::HeadingOutOfRange);
            }
        }
        if let Some(speed) = self.speed_meters_per_second {
            // NaN fails this comparison too
            if !(speed >= 0.0) {
                return Err(SampleFault::NegativeSpeed);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_optional_fields() {
        let sample = PositionSample::new(51.5, -0.1, 8.0, 1000)
            .with_altitude(35.0, Some(12.0))
            .with_heading(270.0)
            .with_speed(5.0);

        assert_eq!(sample.position(), (51.5, -0.1));
        assert_eq!(sample.altitude_meters, Some(35.0));
        assert_eq!(sample.altitude_accuracy_meters, Some(12.0));
        assert_eq!(sample.heading_degrees, Some(270.0));
        assert_eq!(sample.speed_kmh(), Some(18.0));
        assert!(sample.validate().is_ok());
    }

    #[test]
    fn test_validate_ranges() {
        assert_eq!(
            PositionSample::new(90.5, 0.0, 5.0, 0).validate(),
            Err(SampleFault::LatitudeOutOfRange)
        );
        assert_eq!(
            PositionSample::new(0.0, -180.1, 5.0, 0).validate(),
            Err(SampleFault::LongitudeOutOfRange)
        );
        assert_eq!(
            PositionSample::new(0.0, 0.0, -1.0, 0).validate(),
            Err(SampleFault::InvalidAccuracy)
        );
        assert_eq!(
            PositionSample::new(0.0, 0.0, f64::NAN, 0).validate(),
            Err(SampleFault::InvalidAccuracy)
        );
        assert_eq!(
            PositionSample::new(0.0, 0.0, 5.0, 0).with_heading(360.0).validate(),
            Err(SampleFault::HeadingOutOfRange)
        );
        assert_eq!(
            PositionSample::new(0.0, 0.0, 5.0, 0).with_speed(-0.5).validate(),
            Err(SampleFault::NegativeSpeed)
        );

        let mut sample = PositionSample::new(0.0, 0.0, 5.0, 0);
        sample.altitude_accuracy_meters = Some(3.0);
        assert_eq!(
            sample.validate(),
            Err(SampleFault::AltitudeAccuracyWithoutAltitude)
        );
    }

    #[test]
    fn test_boundaries_are_valid() {
        assert!(PositionSample::new(-90.0, 180.0, 0.0, 0).validate().is_ok());
        assert!(PositionSample::new(90.0, -180.0, 0.0, 0)
            .with_heading(0.0)
            .with_speed(0.0)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_serializes_camel_case_and_skips_absent() {
        let sample = PositionSample::new(10.0, 20.0, 5.0, 42).with_speed(1.5);
        let json = serde_json::to_value(&sample).unwrap();

        assert_eq!(json["accuracyMeters"], 5.0);
        assert_eq!(json["speedMetersPerSecond"], 1.5);
        assert_eq!(json["capturedAtEpochMs"], 42);
        assert!(json.get("altitudeMeters").is_none());
        assert!(json.get("headingDegrees").is_none());

        let back: PositionSample = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample);
    }
}
