//! Tracking Session
//!
//! A [`TrackingSession`] owns at most one continuous subscription. Sessions are
//! plain values owned by their caller; any number may coexist, each with its
//! own subscription.
//!
//! # State machine
//!
//! ```text
//! Idle --start--> Active --stop--> Idle
//! ```
//!
//! `start` while active returns the existing handle. `stop` while idle does
//! nothing. Errors reported by the platform never end a session; only `stop`
//! (or dropping the session) does.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::LocationError;
use crate::platform::{GeolocationPlatform, PositionOptions, WatchHandle};
use crate::sample::PositionSample;
use crate::source::PositionSource;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Active,
}

/// Counters shared with the forwarding callbacks
#[derive(Debug, Default)]
struct SessionCounters {
    samples: AtomicU64,
    errors: AtomicU64,
}

/// Continuous position tracking with explicit start/stop.
pub struct TrackingSession<P: GeolocationPlatform + ?Sized> {
    source: PositionSource<P>,
    options: PositionOptions,
    handle: Option<WatchHandle>,
    /// Cleared on stop so late platform callbacks are dropped
    live: Arc<AtomicBool>,
    counters: Arc<SessionCounters>,
}

impl<P: GeolocationPlatform + ?Sized> TrackingSession<P> {
    /// Create an idle session using [`PositionOptions::tracking`].
    pub fn new(source: PositionSource<P>) -> Self {
        Self {
            source,
            options: PositionOptions::tracking(),
            handle: None,
            live: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(SessionCounters::default()),
        }
    }

    pub fn state(&self) -> SessionState {
        if self.handle.is_some() {
            SessionState::Active
        } else {
            SessionState::Idle
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// Handle of the current subscription, if active.
    pub fn handle(&self) -> Option<WatchHandle> {
        self.handle
    }

    /// Options used for the subscription.
    pub fn options(&self) -> &PositionOptions {
        &self.options
    }

    /// Samples forwarded since the session was created.
    pub fn samples_received(&self) -> u64 {
        self.counters.samples.load(Ordering::Relaxed)
    }

    /// Errors forwarded since the session was created.
    pub fn errors_received(&self) -> u64 {
        self.counters.errors.load(Ordering::Relaxed)
    }

    /// Start tracking.
    ///
    /// Returns the existing handle if already active; the new handlers are
    /// ignored in that case. Returns `None` and stays idle if positioning is
    /// unavailable (after `on_error` has been called once).
    pub fn start<S, E>(&mut self, mut on_sample: S, mut on_error: E) -> Option<WatchHandle>
    where
        S: FnMut(PositionSample) + Send + 'static,
        E: FnMut(LocationError) + Send + 'static,
    {
        if let Some(handle) = self.handle {
            return Some(handle);
        }

        // Fresh gate per subscription: a previous subscription's stragglers
        // must not leak into this one
        let live = Arc::new(AtomicBool::new(true));
        self.live = Arc::clone(&live);
        let sample_gate = Arc::clone(&live);
        let error_gate = live;
        let sample_counters = Arc::clone(&self.counters);
        let error_counters = Arc::clone(&self.counters);

        let handle = self.source.start_watch(
            &self.options,
            move |sample| {
                if sample_gate.load(Ordering::Acquire) {
                    sample_counters.samples.fetch_add(1, Ordering::Relaxed);
                    on_sample(sample);
                }
            },
            move |error| {
                if error_gate.load(Ordering::Acquire) {
                    error_counters.errors.fetch_add(1, Ordering::Relaxed);
                    on_error(error);
                }
            },
        );

        match handle {
            Some(handle) => self.handle = Some(handle),
            None => self.live.store(false, Ordering::Release),
        }
        handle
    }

    /// Stop tracking. No-op when idle.
    ///
    /// Callbacks the platform delivers after this returns are discarded.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.live.store(false, Ordering::Release);
            self.source.stop_watch(Some(handle));
        }
    }
}

impl<P: GeolocationPlatform + ?Sized> Drop for TrackingSession<P> {
    fn drop(&mut self) {
        self.stop();
    }
}
