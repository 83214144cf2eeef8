//! Location Error Taxonomy
//!
//! Platforms report failures as a raw [`PositionError`] (numeric code plus a
//! platform message). [`PositionSource`](crate::PositionSource) normalizes
//! those into [`LocationError`], which carries one fixed, user-readable
//! message per kind.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Platform code: the user or system refused location access.
pub const PERMISSION_DENIED: u16 = 1;
/// Platform code: no position could be determined (e.g. no signal).
pub const POSITION_UNAVAILABLE: u16 = 2;
/// Platform code: no fix was obtained within the requested timeout.
pub const TIMEOUT: u16 = 3;

/// Raw failure as reported by a platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionError {
    pub code: u16,
    pub message: String,
}

impl PositionError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(PERMISSION_DENIED, message)
    }

    pub fn position_unavailable(message: impl Into<String>) -> Self {
        Self::new(POSITION_UNAVAILABLE, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TIMEOUT, message)
    }
}

impl std::fmt::Display for PositionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "position error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for PositionError {}

/// Normalized location failure.
///
/// The `Display` text of each variant is the message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LocationError {
    /// Capability absent, or the execution context is not secure
    #[error("Geolocation is not supported, or this page is not loaded in a secure context.")]
    Unavailable,

    #[error("Location access denied. Please allow location access or enable location services.")]
    PermissionDenied,

    #[error("Location information is unavailable. Check GPS/location settings.")]
    PositionUnavailable,

    #[error("Location request timed out. Please try again.")]
    Timeout,

    #[error("An unknown error occurred while retrieving location.")]
    Unknown,
}

impl LocationError {
    /// Stable machine-readable name of this error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            LocationError::Unavailable => "unavailable",
            LocationError::PermissionDenied => "permissionDenied",
            LocationError::PositionUnavailable => "positionUnavailable",
            LocationError::Timeout => "timeout",
            LocationError::Unknown => "unknown",
        }
    }

    /// Fixed user-facing message for this error kind.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

impl From<&PositionError> for LocationError {
    fn from(error: &PositionError) -> Self {
        match error.code {
            PERMISSION_DENIED => LocationError::PermissionDenied,
            POSITION_UNAVAILABLE => LocationError::PositionUnavailable,
            TIMEOUT => LocationError::Timeout,
            _ => LocationError::Unknown,
        }
    }
}

impl From<PositionError> for LocationError {
    fn from(error: PositionError) -> Self {
        LocationError::from(&error)
    }
}
