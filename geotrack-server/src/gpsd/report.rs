//! gpsd JSON reports
//!
//! gpsd streams one JSON object per line once `?WATCH` is enabled. Only the
//! `TPV` (time-position-velocity) and `ERROR` classes matter here; `VERSION`,
//! `DEVICES`, `WATCH`, `SKY` and friends are ignored.
//!
//! # TPV fields used
//!
//! | Field | Meaning | Sample field |
//! |-------|---------|--------------|
//! | mode | 0/1 = no fix, 2 = 2D, 3 = 3D | (fix gate) |
//! | lat, lon | degrees | latitude, longitude |
//! | eph (or epx/epy) | horizontal error, meters | accuracy_meters |
//! | altMSL / alt / altHAE | meters | altitude_meters |
//! | epv | vertical error, meters | altitude_accuracy_meters |
//! | track | degrees from true north | heading_degrees |
//! | speed | m/s | speed_meters_per_second |
//! | time | ISO-8601 UTC | captured_at_epoch_ms |

use geotrack_core::PositionSample;
use serde::Deserialize;

/// Command that switches a gpsd connection into JSON streaming mode
pub const WATCH_COMMAND: &str = "?WATCH={\"enable\":true,\"json\":true};\n";

/// Minimum TPV mode carrying a usable position (2D fix)
pub const MODE_2D: u8 = 2;

/// 3D fix: altitude is meaningful
pub const MODE_3D: u8 = 3;

/// One line of gpsd output.
#[derive(Debug, Deserialize)]
#[serde(tag = "class")]
pub enum Report {
    #[serde(rename = "TPV")]
    Tpv(Tpv),
    #[serde(rename = "ERROR")]
    Error { message: String },
    #[serde(other)]
    Other,
}

/// Time-position-velocity report
#[derive(Debug, Default, Deserialize)]
pub struct Tpv {
    #[serde(default)]
    pub mode: u8,
    pub time: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt: Option<f64>,
    #[serde(rename = "altMSL")]
    pub alt_msl: Option<f64>,
    #[serde(rename = "altHAE")]
    pub alt_hae: Option<f64>,
    pub eph: Option<f64>,
    pub epx: Option<f64>,
    pub epy: Option<f64>,
    pub epv: Option<f64>,
    pub track: Option<f64>,
    pub speed: Option<f64>,
}

impl Tpv {
    /// Horizontal error estimate: `eph`, else the larger of `epx`/`epy`.
    pub fn horizontal_error(&self) -> Option<f64> {
        self.eph.or(match (self.epx, self.epy) {
            (Some(x), Some(y)) => Some(x.max(y)),
            (Some(x), None) => Some(x),
            (None, Some(y)) => Some(y),
            (None, None) => None,
        })
    }

    /// Convert to a sample; `None` if the report carries no usable fix.
    ///
    /// `fallback_time_ms` stamps reports without a parseable `time`.
    pub fn to_sample(&self, fallback_time_ms: i64) -> Option<PositionSample> {
        if self.mode < MODE_2D {
            return None;
        }
        let latitude = self.lat?;
        let longitude = self.lon?;
        let accuracy = self.horizontal_error()?;

        let captured_at = self
            .time
            .as_deref()
            .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.timestamp_millis())
            .unwrap_or(fallback_time_ms);

        let mut sample = PositionSample::new(latitude, longitude, accuracy, captured_at);

        if self.mode >= MODE_3D {
            if let Some(altitude) = self.alt_msl.or(self.alt).or(self.alt_hae) {
                sample = sample.with_altitude(altitude, self.epv);
            }
        }

        sample.speed_meters_per_second = self.speed;

        // gpsd keeps reporting the last track while stationary
        let moving = self.speed.map_or(true, |s| s > 0.0);
        if moving {
            sample.heading_degrees = self.track.map(|t| t.rem_euclid(360.0));
        }

        Some(sample)
    }
}

/// Parse one line of gpsd output.
pub fn parse_line(line: &str) -> Result<Report, serde_json::Error> {
    serde_json::from_str(line.trim())
}
