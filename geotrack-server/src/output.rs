//! Text and JSON rendering for the command line.

use geotrack_core::{AccuracyAssessment, AveragedPosition, LocationError, PositionSample};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON document per result
    Json,
}

/// A fix together with its diagnostics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixReport {
    pub sample: PositionSample,
    pub assessment: AccuracyAssessment,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AverageReport {
    pub reading: AveragedPosition,
    pub assessment: AccuracyAssessment,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub available: bool,
    pub secure_context: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<LocationError>,
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
}

fn push_assessment(out: &mut Vec<String>, assessment: &AccuracyAssessment) {
    out.push(format!("Tier:        {}", assessment.tier));
    for warning in &assessment.warnings {
        out.push(format!("  warning: {}", warning));
    }
    for info in &assessment.info {
        out.push(format!("  info:    {}", info));
    }
    for recommendation in &assessment.recommendations {
        out.push(format!("  hint:    {}", recommendation));
    }
}

pub fn render_fix(report: &FixReport, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return to_json(report);
    }

    let sample = &report.sample;
    let mut out = vec![
        format!(
            "Position:    {:.6}, {:.6}",
            sample.latitude, sample.longitude
        ),
        format!("Accuracy:    ±{:.1}m", sample.accuracy_meters),
    ];
    if let Some(altitude) = sample.altitude_meters {
        match sample.altitude_accuracy_meters {
            Some(acc) => out.push(format!("Altitude:    {:.1}m ±{:.1}m", altitude, acc)),
            None => out.push(format!("Altitude:    {:.1}m", altitude)),
        }
    }
    if let Some(time) = chrono::DateTime::from_timestamp_millis(sample.captured_at_epoch_ms) {
        out.push(format!("Captured:    {}", time.to_rfc3339()));
    }
    push_assessment(&mut out, &report.assessment);
    out.join("\n")
}

pub fn render_average(report: &AverageReport, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return to_json(report);
    }

    let reading = &report.reading;
    let mut out = vec![format!(
        "Averaged {} readings: {:.6}, {:.6} ±{:.1}m",
        reading.samples.len(),
        reading.latitude,
        reading.longitude,
        reading.accuracy_meters
    )];
    for (i, sample) in reading.samples.iter().enumerate() {
        out.push(format!(
            "  #{}: {:.6}, {:.6} ±{:.1}m",
            i + 1,
            sample.latitude,
            sample.longitude,
            sample.accuracy_meters
        ));
    }
    push_assessment(&mut out, &report.assessment);
    out.join("\n")
}

pub fn render_availability(availability: &Availability, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return to_json(availability);
    }
    match &availability.error {
        None => format!(
            "Location available (secure context: {})",
            if availability.secure_context { "yes" } else { "no" }
        ),
        Some(error) => format!("Location not available: {}", error.user_message()),
    }
}

/// One line per tracked sample, for `watch`
pub fn render_watch_line(report: &FixReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string(report).unwrap_or_default(),
        OutputFormat::Text => format!(
            "{:.6}, {:.6} ±{:.1}m [{}]",
            report.sample.latitude,
            report.sample.longitude,
            report.sample.accuracy_meters,
            report.assessment.tier
        ),
    }
}
