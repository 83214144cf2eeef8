//! Position Source
//!
//! [`PositionSource`] is the single point of contact with the platform's
//! positioning capability. It turns the platform's two-channel callback
//! interface into a `Result`:
//!
//! - [`PositionSource::request_once`] resolves exactly once with a sample or a
//!   [`LocationError`]
//! - [`PositionSource::start_watch`] forwards samples and normalized errors to
//!   caller-supplied handlers until [`PositionSource::stop_watch`]
//!
//! # Example
//!
//! ```rust,ignore
//! use geotrack_core::{PositionOptions, PositionSource};
//!
//! let source = PositionSource::new(platform);
//! source.check_availability()?;
//!
//! let sample = source.request_once(&PositionOptions::default()).await?;
//! let assessment = source.assess(&sample);
//! println!("{} ({})", sample.accuracy_meters, assessment.tier);
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::channel::oneshot;

use crate::accuracy::{classify, AccuracyAssessment};
use crate::averager::{AveragedPosition, MultiSampleAverager};
use crate::error::{LocationError, PositionError};
use crate::platform::{GeolocationPlatform, PositionOptions, WatchHandle};
use crate::sample::PositionSample;

type ResultSlot = Arc<Mutex<Option<oneshot::Sender<Result<PositionSample, LocationError>>>>>;

/// Normalizing wrapper around a [`GeolocationPlatform`].
///
/// Cheap to clone; clones share the same platform.
pub struct PositionSource<P: GeolocationPlatform + ?Sized> {
    platform: Arc<P>,
}

impl<P: GeolocationPlatform + ?Sized> Clone for PositionSource<P> {
    fn clone(&self) -> Self {
        Self {
            platform: Arc::clone(&self.platform),
        }
    }
}

impl<P: GeolocationPlatform> PositionSource<P> {
    /// Create a source owning `platform`.
    pub fn new(platform: P) -> Self {
        Self {
            platform: Arc::new(platform),
        }
    }
}

impl<P: GeolocationPlatform + ?Sized> PositionSource<P> {
    /// Create a source from an already shared platform.
    pub fn from_shared(platform: Arc<P>) -> Self {
        Self { platform }
    }

    /// Access the underlying platform.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Whether the execution context counts as secure transport.
    pub fn is_secure_context(&self) -> bool {
        self.platform.is_secure_context()
    }

    /// Check that positioning can be attempted at all.
    ///
    /// Fails when the platform has no positioning capability or the context is
    /// not secure. Does not acquire a position.
    pub fn check_availability(&self) -> Result<(), LocationError> {
        if !self.platform.is_supported() {
            self.platform.debug("Geolocation capability not present");
            return Err(LocationError::Unavailable);
        }
        if !self.platform.is_secure_context() {
            self.platform.debug("Geolocation refused: insecure context");
            return Err(LocationError::Unavailable);
        }
        Ok(())
    }

    /// Request a single fix.
    ///
    /// Suspends until the platform calls back. Resolves exactly once even if a
    /// misbehaving platform calls both callbacks; resolves with
    /// [`LocationError::Unknown`] if it drops both without calling either.
    pub async fn request_once(
        &self,
        options: &PositionOptions,
    ) -> Result<PositionSample, LocationError> {
        self.check_availability()?;

        let (tx, rx) = oneshot::channel();
        let slot: ResultSlot = Arc::new(Mutex::new(Some(tx)));
        let error_slot = Arc::clone(&slot);

        self.platform.get_current_position(
            options,
            Box::new(move |sample| {
                let result = match sample.validate() {
                    Ok(()) => Ok(sample),
                    Err(_) => Err(LocationError::PositionUnavailable),
                };
                resolve(&slot, result);
            }),
            Box::new(move |error| resolve(&error_slot, Err(LocationError::from(&error)))),
        );

        match rx.await {
            Ok(result) => {
                if let Err(e) = &result {
                    self.platform
                        .debug(&format!("Position request failed: {}", e.kind()));
                }
                result
            }
            Err(oneshot::Canceled) => {
                self.platform
                    .debug("Position request dropped without a callback");
                Err(LocationError::Unknown)
            }
        }
    }

    /// Start a continuous subscription.
    ///
    /// `on_sample` is called for every valid fix, in whatever order the
    /// platform delivers them. `on_error` may be called any number of times
    /// and does not end the subscription. If positioning is unavailable,
    /// `on_error` is called once with [`LocationError::Unavailable`] and `None`
    /// is returned.
    pub fn start_watch<S, E>(
        &self,
        options: &PositionOptions,
        mut on_sample: S,
        mut on_error: E,
    ) -> Option<WatchHandle>
    where
        S: FnMut(PositionSample) + Send + 'static,
        E: FnMut(LocationError) + Send + 'static,
    {
        if let Err(e) = self.check_availability() {
            on_error(e);
            return None;
        }

        // Both platform callbacks may report errors, so they share the handler
        let on_error = Arc::new(Mutex::new(on_error));
        let invalid_sample_error = Arc::clone(&on_error);

        let handle = self.platform.watch_position(
            options,
            Box::new(move |sample: PositionSample| match sample.validate() {
                Ok(()) => on_sample(sample),
                Err(_) => {
                    let mut handler = invalid_sample_error
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner);
                    (*handler)(LocationError::PositionUnavailable);
                }
            }),
            Box::new(move |error: PositionError| {
                let mut handler = on_error.lock().unwrap_or_else(PoisonError::into_inner);
                (*handler)(LocationError::from(&error));
            }),
        );

        self.platform
            .debug(&format!("Started position watch {}", handle.id()));
        Some(handle)
    }

    /// Cancel a subscription. No-op for `None` or an already cancelled handle.
    pub fn stop_watch(&self, handle: Option<WatchHandle>) {
        if let Some(handle) = handle {
            self.platform.clear_watch(handle);
            self.platform
                .debug(&format!("Stopped position watch {}", handle.id()));
        }
    }

    /// Classify a sample against this source's transport security.
    pub fn assess(&self, sample: &PositionSample) -> AccuracyAssessment {
        classify(sample, self.platform.is_secure_context())
    }

    /// Average `count` sequential fixes taken `interval` apart.
    ///
    /// See [`MultiSampleAverager`].
    pub async fn get_multiple_readings(
        &self,
        count: usize,
        interval: Duration,
    ) -> Result<AveragedPosition, LocationError> {
        MultiSampleAverager::new(self.clone())
            .read(count, interval)
            .await
    }
}

fn resolve(slot: &ResultSlot, result: Result<PositionSample, LocationError>) {
    let sender = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(sender) = sender {
        // Receiver gone means the caller stopped waiting
        let _ = sender.send(result);
    }
}
