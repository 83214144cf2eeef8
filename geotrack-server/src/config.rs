//! Server settings
//!
//! Settings are read from a JSON file. Every field has a default, so an empty
//! object (or no file at all) gives a working configuration talking to a
//! local gpsd.
//!
//! ```json
//! {
//!   "gpsd": { "host": "127.0.0.1", "port": 2947, "reconnectDelayMs": 2000 },
//!   "http": { "bind": "127.0.0.1:6504" },
//!   "averaging": { "count": 3, "intervalMs": 2000 }
//! }
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::simulated::SimulatedFix;

pub const DEFAULT_GPSD_HOST: &str = "127.0.0.1";
pub const DEFAULT_GPSD_PORT: u16 = 2947;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 2000;
pub const DEFAULT_HTTP_BIND: &str = "127.0.0.1:6504";

const CONFIG_FILE_NAME: &str = "geotrack.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GpsdSettings {
    pub host: String,
    pub port: u16,
    /// Overrides the loopback rule for the secure-context check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assume_secure: Option<bool>,
    /// Wait before a watch reconnects after losing gpsd
    pub reconnect_delay_ms: u64,
}

impl Default for GpsdSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_GPSD_HOST.to_string(),
            port: DEFAULT_GPSD_PORT,
            assume_secure: None,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
        }
    }
}

impl GpsdSettings {
    /// `host:port`, with IPv6 literals bracketed.
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HttpSettings {
    pub bind: SocketAddr,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 6504)),
        }
    }
}

/// Defaults for multi-sample readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AveragingSettings {
    pub count: usize,
    pub interval_ms: u64,
}

impl Default for AveragingSettings {
    fn default() -> Self {
        Self {
            count: geotrack_core::DEFAULT_SAMPLE_COUNT,
            interval_ms: geotrack_core::DEFAULT_SAMPLE_INTERVAL.as_millis() as u64,
        }
    }
}

impl AveragingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub gpsd: GpsdSettings,
    pub http: HttpSettings,
    pub averaging: AveragingSettings,
    /// When set, report this constant fix instead of talking to gpsd
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation: Option<SimulatedFix>,
}

impl Settings {
    /// Per-user config file location, e.g. `~/.config/geotrack/geotrack.json`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "geotrack")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load settings.
    ///
    /// An explicit `path` must exist. Without one the default location is
    /// tried, and a missing file there just means defaults.
    pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    log::debug!("No config file, using defaults");
                    Ok(Settings::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Settings, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded config from {}", path.display());
        Ok(settings)
    }
}
