//! gpsd implementation of GeolocationPlatform.
//!
//! This module provides `GpsdPlatform` which implements
//! `geotrack_core::GeolocationPlatform` on top of a gpsd daemon, using tokio
//! TCP streams.
//!
//! Every one-shot request and every watch opens its own gpsd connection. The
//! most recent fix is cached so requests with a non-zero maximum age can be
//! answered without waiting for the receiver.
//!
//! # Usage
//!
//! ```rust,ignore
//! use geotrack_core::PositionSource;
//! use geotrack_server::gpsd::GpsdPlatform;
//!
//! let platform = GpsdPlatform::new(&settings.gpsd, tokio::runtime::Handle::current());
//! let source = PositionSource::new(platform);
//! let sample = source.request_once(&Default::default()).await?;
//! ```

use std::io;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use geotrack_core::platform::{
    ErrorCallback, SuccessCallback, WatchErrorCallback, WatchSuccessCallback,
};
use geotrack_core::{GeolocationPlatform, PositionError, PositionOptions, PositionSample, WatchHandle};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::config::GpsdSettings;
use crate::native::{self, WatchRegistry};

pub mod report;

use report::{parse_line, Report, WATCH_COMMAND};

/// Failure talking to gpsd
#[derive(Debug, Error)]
pub enum GpsdError {
    #[error("Failed to connect to gpsd at {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("gpsd connection error: {0}")]
    Io(#[from] io::Error),

    #[error("gpsd closed the connection")]
    Closed,

    #[error("gpsd reported an error: {0}")]
    Daemon(String),
}

impl GpsdError {
    /// Platform-level error reported to the core.
    pub fn to_position_error(&self) -> PositionError {
        match self {
            GpsdError::Connect { source, .. } | GpsdError::Io(source)
                if source.kind() == io::ErrorKind::PermissionDenied =>
            {
                PositionError::permission_denied(self.to_string())
            }
            GpsdError::Connect { .. } | GpsdError::Io(_) | GpsdError::Closed => {
                PositionError::position_unavailable(self.to_string())
            }
            GpsdError::Daemon(_) => PositionError::new(0, self.to_string()),
        }
    }
}

/// Most recent fix, for `maximum_age` handling
#[derive(Clone, Default)]
struct FixCache {
    inner: Arc<Mutex<Option<(PositionSample, Instant)>>>,
}

impl FixCache {
    fn store(&self, sample: &PositionSample) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((sample.clone(), Instant::now()));
    }

    /// Cached fix no older than `max_age`. A zero age never hits.
    fn fresh(&self, max_age: Duration) -> Option<PositionSample> {
        if max_age.is_zero() {
            return None;
        }
        let cached = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match cached.as_ref() {
            Some((sample, at)) if at.elapsed() <= max_age => Some(sample.clone()),
            _ => None,
        }
    }
}

/// A JSON-mode connection to gpsd
struct GpsdConnection {
    lines: Lines<BufReader<OwnedReadHalf>>,
    // Closing the write half would end the session
    _writer: OwnedWriteHalf,
}

impl GpsdConnection {
    async fn connect(address: &str) -> Result<Self, GpsdError> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(|source| GpsdError::Connect {
                address: address.to_string(),
                source,
            })?;
        let (reader, mut writer) = stream.into_split();
        writer.write_all(WATCH_COMMAND.as_bytes()).await?;
        log::debug!("Connected to gpsd at {}", address);

        Ok(Self {
            lines: BufReader::new(reader).lines(),
            _writer: writer,
        })
    }

    /// Wait for the next TPV report carrying a usable fix.
    async fn next_fix(&mut self) -> Result<PositionSample, GpsdError> {
        loop {
            let line = self.lines.next_line().await?.ok_or(GpsdError::Closed)?;
            match parse_line(&line) {
                Ok(Report::Tpv(tpv)) => match tpv.to_sample(native::now_ms()) {
                    Some(sample) => return Ok(sample),
                    None => log::trace!("TPV without usable fix (mode {})", tpv.mode),
                },
                Ok(Report::Error { message }) => return Err(GpsdError::Daemon(message)),
                Ok(Report::Other) => {}
                Err(e) => log::debug!("Ignoring unparsable gpsd line: {}", e),
            }
        }
    }
}

/// Whether `address` (host:port) points at the local machine.
pub fn is_loopback_address(address: &str) -> bool {
    let host = if address.parse::<IpAddr>().is_ok() {
        address
    } else {
        match address.rsplit_once(':') {
            Some((host, port)) if port.parse::<u16>().is_ok() => host,
            _ => address,
        }
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');

    host.eq_ignore_ascii_case("localhost")
        || host.parse::<IpAddr>().map(|ip| ip.is_loopback()).unwrap_or(false)
}

/// gpsd-backed positioning for the native server.
pub struct GpsdPlatform {
    address: String,
    secure: bool,
    reconnect_delay: Duration,
    runtime: Handle,
    cache: FixCache,
    watches: WatchRegistry,
}

impl GpsdPlatform {
    /// Create a platform for the gpsd daemon described by `settings`.
    ///
    /// The context counts as secure when gpsd is on a loopback address, unless
    /// `settings.assume_secure` says otherwise.
    pub fn new(settings: &GpsdSettings, runtime: Handle) -> Self {
        let address = settings.address();
        let secure = settings
            .assume_secure
            .unwrap_or_else(|| is_loopback_address(&address));

        Self {
            address,
            secure,
            reconnect_delay: settings.reconnect_delay(),
            runtime,
            cache: FixCache::default(),
            watches: WatchRegistry::new(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn first_fix(address: &str) -> Result<PositionSample, GpsdError> {
        let mut connection = GpsdConnection::connect(address).await?;
        connection.next_fix().await
    }

    async fn run_watch(
        address: String,
        options: PositionOptions,
        reconnect_delay: Duration,
        cache: FixCache,
        token: CancellationToken,
        mut on_success: WatchSuccessCallback,
        mut on_error: WatchErrorCallback,
    ) {
        if let Some(sample) = cache.fresh(options.maximum_age()) {
            on_success(sample);
        }

        loop {
            let result = tokio::select! {
                _ = token.cancelled() => break,
                result = Self::stream_fixes(&address, &options, &cache, &mut on_success, &mut on_error) => result,
            };
            if let Err(e) = result {
                log::warn!("gpsd watch interrupted: {}", e);
                on_error(e.to_position_error());
            }

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(reconnect_delay) => {}
            }
        }
        log::debug!("gpsd watch on {} finished", address);
    }

    /// Deliver fixes until the connection fails.
    ///
    /// A timeout without a fix is reported but does not end the stream.
    async fn stream_fixes(
        address: &str,
        options: &PositionOptions,
        cache: &FixCache,
        on_success: &mut WatchSuccessCallback,
        on_error: &mut WatchErrorCallback,
    ) -> Result<(), GpsdError> {
        let mut connection = GpsdConnection::connect(address).await?;
        loop {
            match tokio::time::timeout(options.timeout(), connection.next_fix()).await {
                Ok(Ok(sample)) => {
                    cache.store(&sample);
                    on_success(sample);
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => on_error(PositionError::timeout(format!(
                    "No fix from gpsd within {}ms",
                    options.timeout_ms
                ))),
            }
        }
    }
}

impl Drop for GpsdPlatform {
    fn drop(&mut self) {
        self.watches.cancel_all();
    }
}

impl GeolocationPlatform for GpsdPlatform {
    fn is_supported(&self) -> bool {
        true
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
        let address = self.address.clone();
        let cache = self.cache.clone();
        let options = *options;

        self.runtime.spawn(async move {
            if let Some(sample) = cache.fresh(options.maximum_age()) {
                log::debug!("Answering from cached fix");
                on_success(sample);
                return;
            }

            match tokio::time::timeout(options.timeout(), Self::first_fix(&address)).await {
                Ok(Ok(sample)) => {
                    cache.store(&sample);
                    on_success(sample);
                }
                Ok(Err(e)) => {
                    log::debug!("gpsd request failed: {}", e);
                    on_error(e.to_position_error());
                }
                Err(_) => on_error(PositionError::timeout(format!(
                    "No fix from gpsd within {}ms",
                    options.timeout_ms
                ))),
            }
        });
    }

    fn watch_position(
        &self,
        options: &PositionOptions,
        on_success: WatchSuccessCallback,
        on_error: WatchErrorCallback,
    ) -> WatchHandle {
        let (handle, token) = self.watches.register();
        self.runtime.spawn(Self::run_watch(
            self.address.clone(),
            *options,
            self.reconnect_delay,
            self.cache.clone(),
            token,
            on_success,
            on_error,
        ));
        handle
    }

    fn clear_watch(&self, handle: WatchHandle) {
        if !self.watches.cancel(handle) {
            log::trace!("clear_watch: unknown handle {}", handle.id());
        }
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
