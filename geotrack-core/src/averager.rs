//! Multi-Sample Averaging
//!
//! Reduces the variance of a position estimate by taking several fresh fixes
//! in sequence and averaging them.
//!
//! Latitude and longitude are averaged arithmetically. That is only valid for
//! the small displacements expected within a few seconds; there is no
//! spherical correction.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LocationError;
use crate::platform::{GeolocationPlatform, PositionOptions};
use crate::sample::PositionSample;
use crate::source::PositionSource;

/// Default number of fixes to average
pub const DEFAULT_SAMPLE_COUNT: usize = 3;

/// Default spacing between fixes
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(2000);

/// Averaged estimate over several sequential fixes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AveragedPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,

    /// Every fix that went into the average, in acquisition order
    pub samples: Vec<PositionSample>,

    /// Time the average was computed (milliseconds since epoch)
    pub computed_at_epoch_ms: i64,
}

impl AveragedPosition {
    fn from_samples(samples: Vec<PositionSample>, computed_at_epoch_ms: i64) -> Self {
        let n = samples.len() as f64;
        let (lat_sum, lon_sum, acc_sum) = samples.iter().fold((0.0, 0.0, 0.0), |acc, s| {
            (
                acc.0 + s.latitude,
                acc.1 + s.longitude,
                acc.2 + s.accuracy_meters,
            )
        });

        Self {
            latitude: lat_sum / n,
            longitude: lon_sum / n,
            accuracy_meters: acc_sum / n,
            samples,
            computed_at_epoch_ms,
        }
    }

    /// The averaged estimate as a sample stamped with the computation time.
    pub fn to_sample(&self) -> PositionSample {
        PositionSample::new(
            self.latitude,
            self.longitude,
            self.accuracy_meters,
            self.computed_at_epoch_ms,
        )
    }
}

/// Takes `count` fresh fixes `interval` apart and averages them.
///
/// Every request uses [`PositionOptions::single_fix`]. The first failure
/// aborts the whole reading: samples collected so far are discarded and no
/// further requests are made. Retrying is left to the caller.
pub struct MultiSampleAverager<P: GeolocationPlatform + ?Sized> {
    source: PositionSource<P>,
}

impl<P: GeolocationPlatform + ?Sized> MultiSampleAverager<P> {
    pub fn new(source: PositionSource<P>) -> Self {
        Self { source }
    }

    /// Average `count` fixes. A `count` of 0 is treated as 1.
    pub async fn read(
        &self,
        count: usize,
        interval: Duration,
    ) -> Result<AveragedPosition, LocationError> {
        let count = count.max(1);
        let options = PositionOptions::single_fix();
        let platform = self.source.platform();
        let mut samples = Vec::with_capacity(count);

        for i in 0..count {
            let sample = self.source.request_once(&options).await?;
            platform.debug(&format!(
                "Reading {}/{}: {:.6}, {:.6} ±{:.1}m",
                i + 1,
                count,
                sample.latitude,
                sample.longitude,
                sample.accuracy_meters
            ));
            samples.push(sample);

            if i + 1 < count {
                platform.sleep(interval).await;
            }
        }

        Ok(AveragedPosition::from_samples(
            samples,
            platform.current_time_ms(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PositionError;
    use crate::fake::FakePlatform;
    use futures::executor::block_on;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn averager(platform: FakePlatform) -> MultiSampleAverager<FakePlatform> {
        MultiSampleAverager::new(PositionSource::new(platform))
    }

    #[test]
    fn test_averages_three_fixes() {
        let platform = FakePlatform::new().with_time(5_000);
        platform.push_fix(PositionSample::new(10.0, 20.0, 5.0, 1));
        platform.push_fix(PositionSample::new(10.001, 20.001, 7.0, 2));
        platform.push_fix(PositionSample::new(9.999, 19.999, 6.0, 3));
        let averager = averager(platform);

        let result = block_on(averager.read(3, Duration::from_millis(2000))).unwrap();

        assert!(close(result.latitude, 10.0));
        assert!(close(result.longitude, 20.0));
        assert!(close(result.accuracy_meters, 6.0));
        assert_eq!(result.samples.len(), 3);
        assert_eq!(result.computed_at_epoch_ms, 5_000);

        let platform = averager.source.platform();
        // Sleeps only between fixes, not after the last one
        assert_eq!(platform.sleeps(), vec![Duration::from_millis(2000); 2]);
        assert!(platform
            .requests()
            .iter()
            .all(|o| *o == PositionOptions::single_fix()));
    }

    #[test]
    fn test_failure_aborts_without_further_requests() {
        let platform = FakePlatform::new();
        platform.push_fix(PositionSample::new(10.0, 20.0, 5.0, 1));
        platform.push_error(PositionError::timeout("no fix"));
        platform.push_fix(PositionSample::new(9.999, 19.999, 6.0, 3));
        let averager = averager(platform);

        let result = block_on(averager.read(3, Duration::from_millis(100)));

        assert_eq!(result, Err(LocationError::Timeout));
        let platform = averager.source.platform();
        assert_eq!(platform.requests().len(), 2);
        assert_eq!(platform.pending_responses(), 1);
    }

    #[test]
    fn test_first_failure_is_propagated_unchanged() {
        let platform = FakePlatform::new();
        platform.push_error(PositionError::permission_denied("denied"));
        let averager = averager(platform);

        assert_eq!(
            block_on(averager.read(DEFAULT_SAMPLE_COUNT, DEFAULT_SAMPLE_INTERVAL)),
            Err(LocationError::PermissionDenied)
        );
        assert!(averager.source.platform().sleeps().is_empty());
    }

    #[test]
    fn test_zero_count_reads_once() {
        let platform = FakePlatform::new();
        platform.push_fix(PositionSample::new(1.0, 2.0, 3.0, 1));
        let averager = averager(platform);

        let result = block_on(averager.read(0, Duration::from_millis(10))).unwrap();
        assert_eq!(result.samples.len(), 1);
        assert_eq!(result.to_sample().position(), (1.0, 2.0));
    }

    #[test]
    fn test_source_shortcut() {
        let platform = FakePlatform::new();
        platform.push_fix(PositionSample::new(1.0, 2.0, 4.0, 1));
        platform.push_fix(PositionSample::new(3.0, 4.0, 8.0, 2));
        let source = PositionSource::new(platform);

        let result =
            block_on(source.get_multiple_readings(2, Duration::from_millis(50))).unwrap();
        assert!(close(result.latitude, 2.0));
        assert!(close(result.longitude, 3.0));
        assert!(close(result.accuracy_meters, 6.0));
    }
}
