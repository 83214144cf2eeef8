//! HTTP and WebSocket API
//!
//! | Route | Result |
//! |-------|--------|
//! | `GET /api/v1/location/availability` | [`Availability`] |
//! | `GET /api/v1/location` | [`FixReport`] |
//! | `GET /api/v1/location/average` | [`AverageReport`] |
//! | `GET /api/v1/location/stream` | WebSocket of [`StreamEvent`]s |
//!
//! Failures are returned as `{"kind": ..., "message": ...}`.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use geotrack_core::{
    AccuracyAssessment, GeolocationPlatform, LocationError, PositionOptions, PositionSample,
    PositionSource, TrackingSession,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_graceful_shutdown::{SubsystemBuilder, SubsystemHandle, Toplevel};

use crate::config::AveragingSettings;
use crate::output::{AverageReport, Availability, FixReport};

/// Upper limit on `count` for one averaging request
pub const MAX_AVERAGE_COUNT: usize = 20;

/// Upper limit on `intervalMs` for one averaging request
pub const MAX_AVERAGE_INTERVAL: Duration = Duration::from_secs(10);

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(3);

pub type SharedSource = PositionSource<dyn GeolocationPlatform>;

#[derive(Clone)]
pub struct AppState {
    pub source: SharedSource,
    pub averaging: AveragingSettings,
}

impl AppState {
    pub fn new(source: SharedSource, averaging: AveragingSettings) -> Self {
        Self { source, averaging }
    }
}

/// A [`LocationError`] as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub LocationError);

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            LocationError::Unavailable | LocationError::PositionUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            LocationError::PermissionDenied => StatusCode::FORBIDDEN,
            LocationError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            LocationError::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LocationError> for ApiError {
    fn from(error: LocationError) -> Self {
        ApiError(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            kind: self.0.kind(),
            message: self.0.user_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocateQuery {
    pub high_accuracy: Option<bool>,
    pub timeout_ms: Option<u64>,
    pub max_cached_age_ms: Option<u64>,
}

impl LocateQuery {
    fn options(&self) -> PositionOptions {
        let defaults = PositionOptions::single_fix();
        PositionOptions {
            enable_high_accuracy: self.high_accuracy.unwrap_or(defaults.enable_high_accuracy),
            timeout_ms: self.timeout_ms.unwrap_or(defaults.timeout_ms),
            maximum_age_ms: self.max_cached_age_ms.unwrap_or(defaults.maximum_age_ms),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AverageQuery {
    pub count: Option<usize>,
    pub interval_ms: Option<u64>,
}

impl AverageQuery {
    /// Count and interval for this request, capped to keep a request short.
    fn resolve(&self, defaults: &AveragingSettings) -> (usize, Duration) {
        let count = self.count.unwrap_or(defaults.count).min(MAX_AVERAGE_COUNT);
        let interval = self
            .interval_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| defaults.interval())
            .min(MAX_AVERAGE_INTERVAL);
        (count, interval)
    }
}

/// Message pushed over the stream socket
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StreamEvent {
    Sample {
        sample: PositionSample,
        assessment: AccuracyAssessment,
    },
    Error {
        kind: &'static str,
        message: String,
    },
}

impl From<LocationError> for StreamEvent {
    fn from(error: LocationError) -> Self {
        StreamEvent::Error {
            kind: error.kind(),
            message: error.user_message(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/location", get(locate))
        .route("/api/v1/location/availability", get(availability))
        .route("/api/v1/location/average", get(average))
        .route("/api/v1/location/stream", get(stream))
        .with_state(state)
}

async fn availability(State(state): State<AppState>) -> Json<Availability> {
    let result = state.source.check_availability();
    Json(Availability {
        available: result.is_ok(),
        secure_context: state.source.is_secure_context(),
        error: result.err(),
    })
}

async fn locate(
    State(state): State<AppState>,
    Query(query): Query<LocateQuery>,
) -> Result<Json<FixReport>, ApiError> {
    let sample = state.source.request_once(&query.options()).await?;
    let assessment = state.source.assess(&sample);
    Ok(Json(FixReport { sample, assessment }))
}

async fn average(
    State(state): State<AppState>,
    Query(query): Query<AverageQuery>,
) -> Result<Json<AverageReport>, ApiError> {
    let (count, interval) = query.resolve(&state.averaging);
    let reading = state.source.get_multiple_readings(count, interval).await?;
    let assessment = state.source.assess(&reading.to_sample());
    Ok(Json(AverageReport {
        reading,
        assessment,
    }))
}

async fn stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| run_stream(socket, state.source))
}

/// Feed one socket from its own tracking session until either side goes away.
async fn run_stream(mut socket: WebSocket, source: SharedSource) {
    let (tx, mut rx) = mpsc::unbounded_channel::<StreamEvent>();
    let error_tx = tx.clone();
    let assessor = source.clone();

    let mut session = TrackingSession::new(source);
    let handle = session.start(
        move |sample| {
            let assessment = assessor.assess(&sample);
            let _ = tx.send(StreamEvent::Sample { sample, assessment });
        },
        move |error| {
            let _ = error_tx.send(StreamEvent::from(error));
        },
    );
    log::debug!("Stream client connected (watch {:?})", handle.map(|h| h.id()));

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else {
                    // Subscription never started; nothing more will arrive
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                };
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        log::warn!("Cannot encode stream event: {}", e);
                        continue;
                    }
                };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    session.stop();
    log::debug!(
        "Stream client disconnected after {} samples, {} errors",
        session.samples_received(),
        session.errors_received()
    );
}

async fn run_http(
    subsys: SubsystemHandle,
    bind: SocketAddr,
    state: AppState,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Cannot listen on {}", bind))?;
    log::info!("HTTP API listening on http://{}", listener.local_addr()?);

    let token = subsys.create_cancellation_token();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(token.cancelled_owned())
        .await?;

    log::info!("HTTP API stopped");
    Ok(())
}

/// Run the HTTP API until Ctrl-C or SIGTERM.
pub async fn serve(bind: SocketAddr, state: AppState) -> anyhow::Result<()> {
    Toplevel::new(move |s| async move {
        s.start(SubsystemBuilder::new("http", move |subsys| {
            run_http(subsys, bind, state)
        }));
    })
    .catch_signals()
    .handle_shutdown_requests(SHUTDOWN_TIMEOUT)
    .await
    .map_err(|e| anyhow!("{:?}", e))
}
