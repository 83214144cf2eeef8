//! Scripted platform for unit tests.
//!
//! One-shot requests are answered synchronously from a queue of scripted
//! responses; when the queue is empty both callbacks are dropped. Watches keep
//! their callbacks even after being cleared so tests can simulate a fix that
//! was already in flight when the watch was cancelled.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt};

use crate::error::PositionError;
use crate::platform::{
    ErrorCallback, GeolocationPlatform, PositionOptions, SuccessCallback, WatchErrorCallback,
    WatchHandle, WatchSuccessCallback,
};
use crate::sample::PositionSample;

struct Watch {
    options: PositionOptions,
    on_success: WatchSuccessCallback,
    on_error: WatchErrorCallback,
    cleared: bool,
}

#[derive(Default)]
struct FakeState {
    responses: VecDeque<Result<PositionSample, PositionError>>,
    requests: Vec<PositionOptions>,
    sleeps: Vec<Duration>,
    watches: HashMap<u32, Watch>,
    watch_order: Vec<u32>,
    cleared: Vec<WatchHandle>,
    next_watch: u32,
}

pub(crate) struct FakePlatform {
    supported: bool,
    secure: bool,
    time_ms: i64,
    state: Mutex<FakeState>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            supported: true,
            secure: true,
            time_ms: 1_700_000_000_000,
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn unsupported(mut self) -> Self {
        self.supported = false;
        self
    }

    pub fn insecure(mut self) -> Self {
        self.secure = false;
        self
    }

    pub fn with_time(mut self, time_ms: i64) -> Self {
        self.time_ms = time_ms;
        self
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn push_fix(&self, sample: PositionSample) {
        self.state().responses.push_back(Ok(sample));
    }

    pub fn push_error(&self, error: PositionError) {
        self.state().responses.push_back(Err(error));
    }

    pub fn pending_responses(&self) -> usize {
        self.state().responses.len()
    }

    pub fn requests(&self) -> Vec<PositionOptions> {
        self.state().requests.clone()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.state().sleeps.clone()
    }

    /// Number of watches ever created
    pub fn watch_count(&self) -> usize {
        self.state().watch_order.len()
    }

    pub fn active_watches(&self) -> usize {
        self.state().watches.values().filter(|w| !w.cleared).count()
    }

    pub fn watch_options(&self) -> Vec<PositionOptions> {
        let state = self.state();
        state
            .watch_order
            .iter()
            .map(|id| state.watches[id].options)
            .collect()
    }

    pub fn cleared(&self) -> Vec<WatchHandle> {
        self.state().cleared.clone()
    }

    pub fn emit_fix(&self, handle: WatchHandle, sample: PositionSample) {
        if let Some(watch) = self.state().watches.get_mut(&handle.0) {
            (watch.on_success)(sample);
        }
    }

    pub fn emit_error(&self, handle: WatchHandle, error: PositionError) {
        if let Some(watch) = self.state().watches.get_mut(&handle.0) {
            (watch.on_error)(error);
        }
    }
}

impl GeolocationPlatform for FakePlatform {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn is_secure_context(&self) -> bool {
        self.secure
    }

    fn get_current_position(
        &self,
        options: &PositionOptions,
        on_success: SuccessCallback,
        on_error: ErrorCallback,
    ) {
        let response = {
            let mut state = self.state();
            state.requests.push(*options);
            state.responses.pop_front()
        };
        match response {
            Some(Ok(sample)) => on_success(sample),
            Some(Err(error)) => on_error(error),
            None => {}
        }
    }

    fn watch_position(
        &self,
        options: &PositionOptions,
        on_success: WatchSuccessCallback,
        on_error: WatchErrorCallback,
    ) -> WatchHandle {
        let mut state = self.state();
        state.next_watch += 1;
        let id = state.next_watch;
        state.watches.insert(
            id,
            Watch {
                options: *options,
                on_success,
                on_error,
                cleared: false,
            },
        );
        state.watch_order.push(id);
        WatchHandle(id)
    }

    fn clear_watch(&self, handle: WatchHandle) {
        let mut state = self.state();
        state.cleared.push(handle);
        if let Some(watch) = state.watches.get_mut(&handle.0) {
            watch.cleared = true;
        }
    }

    fn current_time_ms(&self) -> i64 {
        self.time_ms
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        self.state().sleeps.push(duration);
        future::ready(()).boxed()
    }

    fn debug(&self, _msg: &str) {}
}
