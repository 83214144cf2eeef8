//! Platform Abstraction for Position Acquisition
//!
//! This module defines the [`GeolocationPlatform`] trait which abstracts the
//! host's positioning capability. The core never performs I/O itself; every
//! fix, timer and log line goes through an implementation of this trait.
//!
//! # Implementations
//!
//! - Native server: gpsd over TCP, or a simulated constant source
//! - Tests: a scripted fake that answers from fixtures
//!
//! # Callback model
//!
//! The platform mirrors the classic dual-callback geolocation primitive:
//! every request takes a success callback and an error callback. For a
//! one-shot request the platform calls exactly one of them, once. For a watch
//! it may call either of them any number of times, from any thread, until the
//! watch is cleared.

use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::PositionError;
use crate::sample::PositionSample;

/// One-shot success callback.
pub type SuccessCallback = Box<dyn FnOnce(PositionSample) + Send>;

/// One-shot error callback.
pub type ErrorCallback = Box<dyn FnOnce(PositionError) + Send>;

/// Watch success callback, called once per fix.
pub type WatchSuccessCallback = Box<dyn FnMut(PositionSample) + Send>;

/// Watch error callback; errors do not end the watch.
pub type WatchErrorCallback = Box<dyn FnMut(PositionError) + Send>;

/// Handle identifying a platform watch subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchHandle(pub u32);

impl WatchHandle {
    pub fn id(&self) -> u32 {
        self.0
    }
}

/// Options for a position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionOptions {
    /// Request the best available precision (may cost latency and power)
    pub enable_high_accuracy: bool,

    /// Fail with a timeout if no fix arrives within this window
    pub timeout_ms: u64,

    /// Accept a cached fix no older than this; 0 forces a fresh fix
    pub maximum_age_ms: u64,
}

impl PositionOptions {
    /// Fresh high-accuracy fix, as used for averaged readings.
    pub const fn single_fix() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout_ms: 30_000,
            maximum_age_ms: 0,
        }
    }

    /// Continuous tracking: tolerates fixes up to 10s old.
    pub const fn tracking() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout_ms: 30_000,
            maximum_age_ms: 10_000,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn maximum_age(&self) -> Duration {
        Duration::from_millis(self.maximum_age_ms)
    }
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self::single_fix()
    }
}

/// Host positioning capability.
///
/// Implementations must be usable from any thread; callbacks may be invoked
/// synchronously from within the request call or later from another task.
pub trait GeolocationPlatform: Send + Sync {
    // -------------------------------------------------------------------------
    // Capability
    // -------------------------------------------------------------------------

    /// Whether the host has a positioning capability at all.
    fn is_supported(&self) -> bool;

    /// Whether the execution context is secure (encrypted or loopback).
    fn is_secure_context(&self) -> bool;

    // -------------------------------------------------------------------------
    // Position queries
    // -------------------------------------------------------------------------

    /// Request a single fix. Exactly one callback is invoked, once.
    fn get_current_position(
        &self,
        options: &PositionOptions,
        on_success: SuccessCallback,
        on_error: ErrorCallback,
    );

    /// Start a continuous subscription.
    fn watch_position(
        &self,
        options: &PositionOptions,
        on_success: WatchSuccessCallback,
        on_error: WatchErrorCallback,
    ) -> WatchHandle;

    /// Cancel a subscription. Unknown or already cleared handles are ignored.
    fn clear_watch(&self, handle: WatchHandle);

    // -------------------------------------------------------------------------
    // Utility
    // -------------------------------------------------------------------------

    /// Current wall-clock time in milliseconds since epoch.
    fn current_time_ms(&self) -> i64;

    /// Suspend the calling task for `duration` without blocking the host.
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;

    /// Log a debug message.
    fn debug(&self, msg: &str);
}
