//! Simulated positioning
//!
//! `SimulatedPlatform` reports a constant fix. Useful for demos, for running
//! the HTTP API on machines without a receiver, and for tests.

use std::str::FromStr;
use std::time::Duration;

use futures::future::BoxFuture;
use geotrack_core::platform::{
    ErrorCallback, SuccessCallback, WatchErrorCallback, WatchSuccessCallback,
};
use geotrack_core::{GeolocationPlatform, PositionOptions, PositionSample, WatchHandle};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;

use crate::native::{self, WatchRegistry};

/// Accuracy used when `--simulate` gives no accuracy
pub const DEFAULT_SIMULATED_ACCURACY: f64 = 5.0;

/// Period between fixes on a simulated watch
pub const DEFAULT_WATCH_PERIOD: Duration = Duration::from_secs(1);

/// Position reported by the simulated platform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatedFix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_accuracy")]
    pub accuracy_meters: f64,
}

fn default_accuracy() -> f64 {
    DEFAULT_SIMULATED_ACCURACY
}

impl SimulatedFix {
    pub fn sample_at(&self, captured_at_epoch_ms: i64) -> PositionSample {
        PositionSample::new(
            self.latitude,
            self.longitude,
            self.accuracy_meters,
            captured_at_epoch_ms,
        )
    }
}

/// Parses `LAT,LON` or `LAT,LON,ACC`
impl FromStr for SimulatedFix {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(format!("expected LAT,LON[,ACC], got '{}'", s));
        }

        let number = |name: &str, value: &str| {
            value
                .parse::<f64>()
                .map_err(|_| format!("invalid {} '{}'", name, value))
        };
        let latitude = number("latitude", parts[0])?;
        let longitude = number("longitude", parts[1])?;
        let accuracy_meters = match parts.get(2) {
            Some(acc) => number("accuracy", acc)?,
            None => DEFAULT_SIMULATED_ACCURACY,
        };

        let fix = SimulatedFix {
            latitude,
            longitude,
            accuracy_meters,
        };
        fix.sample_at(0)
            .validate()
            .map_err(|fault| fault.to_string())?;
        Ok(fix)
    }
}

/// Constant-position platform
pub struct SimulatedPlatform {
    fix: SimulatedFix,
    secure: bool,
    period: Duration,
    runtime: Handle,
    watches: WatchRegistry,
}

impl SimulatedPlatform {
    pub fn new(fix: SimulatedFix, runtime: Handle) -> Self {
        Self {
            fix,
            secure: true,
            period: DEFAULT_WATCH_PERIOD,
            runtime,
            watches: WatchRegistry::new(),
        }
    }

    /// Treat the context as insecure (every request then fails as unavailable).
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }
}

impl Drop for SimulatedPlatform {
    fn drop(&mut self) {
        self.watches.cancel_all();
    }
}

impl GeolocationPlatform for SimulatedPlatform {
    fn is_supported(&self) -> bool {
        true
    }

    fn is_secure_context(&self) -> bool {
        self.secure
    }

    fn get_current_position(
        &self,
        _options: &PositionOptions,
        on_success: SuccessCallback,
        _on_error: ErrorCallback,
    ) {
        on_success(self.fix.sample_at(native::now_ms()));
    }

    fn watch_position(
        &self,
        _options: &PositionOptions,
        mut on_success: WatchSuccessCallback,
        _on_error: WatchErrorCallback,
    ) -> WatchHandle {
        let (handle, token) = self.watches.register();
        let fix = self.fix;
        let period = self.period;

        self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => on_success(fix.sample_at(native::now_ms())),
                }
            }
        });
        handle
    }

    fn clear_watch(&self, handle: WatchHandle) {
        self.watches.cancel(handle);
    }

    fn current_time_ms(&self) -> i64 {
        native::now_ms()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        native::sleep(duration)
    }

    fn debug(&self, msg: &str) {
        log::debug!("{}", msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotrack_core::{AccuracyTier, LocationError, PositionSource, TrackingSession};

    #[test]
    fn test_parse_fix() {
        let fix: SimulatedFix = "52.37, 4.89".parse().unwrap();
        assert_eq!(fix.latitude, 52.37);
        assert_eq!(fix.longitude, 4.89);
        assert_eq!(fix.accuracy_meters, DEFAULT_SIMULATED_ACCURACY);

        let fix: SimulatedFix = "-33.9,151.2,42".parse().unwrap();
        assert_eq!(fix.accuracy_meters, 42.0);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("52.37".parse::<SimulatedFix>().is_err());
        assert!("a,b".parse::<SimulatedFix>().is_err());
        assert!("1,2,3,4".parse::<SimulatedFix>().is_err());
        assert!("95,0".parse::<SimulatedFix>().is_err());
        assert!("0,0,-1".parse::<SimulatedFix>().is_err());
    }

    #[tokio::test]
    async fn test_request_once() {
        let fix = SimulatedFix {
            latitude: 1.5,
            longitude: 2.5,
            accuracy_meters: 15.0,
        };
        let source = PositionSource::new(SimulatedPlatform::new(fix, Handle::current()));

        let sample = source.request_once(&PositionOptions::default()).await.unwrap();
        assert_eq!(sample.position(), (1.5, 2.5));
        assert_eq!(source.assess(&sample).tier, AccuracyTier::High);
    }

    #[tokio::test]
    async fn test_insecure_is_unavailable() {
        let fix: SimulatedFix = "1,2".parse().unwrap();
        let source = PositionSource::new(
            SimulatedPlatform::new(fix, Handle::current()).with_secure(false),
        );

        assert_eq!(
            source.request_once(&PositionOptions::default()).await,
            Err(LocationError::Unavailable)
        );
    }

    #[tokio::test]
    async fn test_average_of_constant_fix() {
        let fix: SimulatedFix = "10,20,8".parse().unwrap();
        let source = PositionSource::new(SimulatedPlatform::new(fix, Handle::current()));

        let reading = source
            .get_multiple_readings(3, Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(reading.samples.len(), 3);
        assert_eq!(reading.latitude, 10.0);
        assert_eq!(reading.accuracy_meters, 8.0);
    }

    #[tokio::test]
    async fn test_watch_ticks_until_stopped() {
        let fix: SimulatedFix = "1,2".parse().unwrap();
        let platform =
            SimulatedPlatform::new(fix, Handle::current()).with_period(Duration::from_millis(10));
        let source = PositionSource::new(platform);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let mut session = TrackingSession::new(source.clone());
        session.start(
            move |sample| {
                let _ = tx.send(sample);
            },
            |_| {},
        );

        for _ in 0..3 {
            tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
        }

        session.stop();
        assert_eq!(source.platform().watches.len(), 0);
    }
}
