//! Geotrack Core
//!
//! Platform-independent location acquisition and accuracy assessment.
//!
//! This crate turns noisy, asynchronous positioning signals into a stable
//! location estimate with an accuracy classification and actionable
//! diagnostics. It performs no I/O: the host supplies a
//! [`GeolocationPlatform`] (gpsd on a native server, a scripted fake in
//! tests) and the core drives it.
//!
//! # Components
//!
//! - [`platform`] - [`GeolocationPlatform`] trait and request options
//! - [`source`] - [`PositionSource`]: callbacks normalized into `Result`s
//! - [`accuracy`] - [`classify`]: pure accuracy tiering and diagnostics
//! - [`averager`] - [`MultiSampleAverager`]: averaged multi-fix readings
//! - [`session`] - [`TrackingSession`]: start/stop continuous tracking
//!
//! # Example
//!
//! ```rust,ignore
//! use geotrack_core::{PositionSource, TrackingSession};
//!
//! let source = PositionSource::new(platform);
//!
//! let reading = source.get_multiple_readings(3, Duration::from_secs(2)).await?;
//! println!("{:.6}, {:.6} ±{:.1}m", reading.latitude, reading.longitude, reading.accuracy_meters);
//!
//! let mut session = TrackingSession::new(source.clone());
//! session.start(
//!     move |sample| println!("{:?}", source.assess(&sample).tier),
//!     |error| eprintln!("{}", error),
//! );
//! // ...
//! session.stop();
//! ```

pub mod accuracy;
pub mod averager;
pub mod error;
pub mod platform;
pub mod sample;
pub mod session;
pub mod source;

#[cfg(test)]
mod fake;

pub use accuracy::{classify, AccuracyAssessment, AccuracyTier};
pub use averager::{
    AveragedPosition, MultiSampleAverager, DEFAULT_SAMPLE_COUNT, DEFAULT_SAMPLE_INTERVAL,
};
pub use error::{LocationError, PositionError};
pub use platform::{GeolocationPlatform, PositionOptions, WatchHandle};
pub use sample::{PositionSample, SampleFault};
pub use session::{SessionState, TrackingSession};
pub use source::PositionSource;
