//! Shared plumbing for the native (tokio) platforms.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use geotrack_core::WatchHandle;
use tokio_util::sync::CancellationToken;

/// Wall-clock time in milliseconds since epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Boxed tokio sleep, as required by `GeolocationPlatform::sleep`.
pub fn sleep(duration: Duration) -> BoxFuture<'static, ()> {
    tokio::time::sleep(duration).boxed()
}

/// Active watch tasks, keyed by handle.
///
/// Each watch task runs until its token is cancelled.
pub struct WatchRegistry {
    next_id: AtomicU32,
    tokens: Mutex<HashMap<u32, CancellationToken>>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU32::new(1),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate a handle and the token its task should watch.
    pub fn register(&self) -> (WatchHandle, CancellationToken) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, token.clone());
        (WatchHandle(id), token)
    }

    /// Cancel a watch. Returns false if the handle was unknown.
    pub fn cancel(&self, handle: WatchHandle) -> bool {
        let token = self
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle.0);
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn cancel_all(&self) {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, token) in tokens.drain() {
            token.cancel();
        }
    }
}

impl Default for WatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_unique() {
        let registry = WatchRegistry::new();
        let (h1, _) = registry.register();
        let (h2, _) = registry.register();
        assert_ne!(h1, h2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let registry = WatchRegistry::new();
        let (handle, token) = registry.register();

        assert!(registry.cancel(handle));
        assert!(token.is_cancelled());
        assert!(!registry.cancel(handle));
        assert!(!registry.cancel(WatchHandle(999)));
    }

    #[test]
    fn test_cancel_all() {
        let registry = WatchRegistry::new();
        let (_, a) = registry.register();
        let (_, b) = registry.register();

        registry.cancel_all();
        assert!(a.is_cancelled() && b.is_cancelled());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_now_ms_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(now_ms() > 1_577_836_800_000);
    }
}
