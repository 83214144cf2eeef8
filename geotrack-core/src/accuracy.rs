//! Accuracy Assessment
//!
//! Maps a [`PositionSample`] to a qualitative [`AccuracyTier`] together with
//! human-readable warnings, info lines and recommendations.
//!
//! [`classify`] is pure: the result depends only on the sample and on whether
//! the page/transport is secure. No I/O, no shared state.
//!
//! # Tiers
//!
//! | Accuracy (m) | Tier |
//! |--------------|------|
//! | ≤ 5 | Excellent |
//! | ≤ 10 | Very high |
//! | ≤ 20 | High |
//! | ≤ 50 | Medium |
//! | ≤ 100 | Low |
//! | otherwise | Very low |
//!
//! Tier edges coincide with the message bands of [`classify`], so a 10 m fix
//! is both "Very high" and "excellent accuracy".

use serde::{Deserialize, Serialize};

use crate::sample::PositionSample;

/// Altitude uncertainty above which a warning is added (meters)
pub const POOR_ALTITUDE_ACCURACY_METERS: f64 = 50.0;

/// Qualitative bucket of horizontal accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccuracyTier {
    Excellent,
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

impl AccuracyTier {
    /// Tier for a horizontal accuracy radius. Each tier includes its upper edge.
    pub fn from_accuracy(accuracy_meters: f64) -> Self {
        if accuracy_meters <= 5.0 {
            AccuracyTier::Excellent
        } else if accuracy_meters <= 10.0 {
            AccuracyTier::VeryHigh
        } else if accuracy_meters <= 20.0 {
            AccuracyTier::High
        } else if accuracy_meters <= 50.0 {
            AccuracyTier::Medium
        } else if accuracy_meters <= 100.0 {
            AccuracyTier::Low
        } else {
            AccuracyTier::VeryLow
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AccuracyTier::Excellent => "Excellent",
            AccuracyTier::VeryHigh => "Very high",
            AccuracyTier::High => "High",
            AccuracyTier::Medium => "Medium",
            AccuracyTier::Low => "Low",
            AccuracyTier::VeryLow => "Very low",
        }
    }
}

impl std::fmt::Display for AccuracyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Result of [`classify`]. Recomputed per sample, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyAssessment {
    pub tier: AccuracyTier,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
    pub recommendations: Vec<String>,
}

impl AccuracyAssessment {
    fn new(tier: AccuracyTier) -> Self {
        Self {
            tier,
            warnings: Vec::new(),
            info: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

/// Assess the accuracy of a sample.
///
/// Every rule is evaluated independently; messages are appended in a fixed
/// order so identical input always yields identical output.
pub fn classify(sample: &PositionSample, is_secure_transport: bool) -> AccuracyAssessment {
    let accuracy = sample.accuracy_meters;
    let mut assessment = AccuracyAssessment::new(AccuracyTier::from_accuracy(accuracy));

    // Horizontal accuracy bands (mutually exclusive)
    if accuracy > 100.0 {
        assessment
            .warnings
            .push("poor accuracy — may be network-based".to_string());
        assessment
            .recommendations
            .push("move outdoors with clear sky view".to_string());
    } else if accuracy > 50.0 {
        assessment
            .warnings
            .push("low accuracy — weak signal".to_string());
        assessment
            .recommendations
            .push("move to open area/near window".to_string());
    } else if accuracy > 20.0 {
        assessment.info.push("moderate accuracy".to_string());
        assessment
            .recommendations
            .push("wait for signal to settle or move to open area".to_string());
    } else if accuracy > 10.0 {
        assessment.info.push("good accuracy".to_string());
    } else {
        assessment.info.push("excellent accuracy".to_string());
    }

    if let Some(altitude_accuracy) = sample.altitude_accuracy_meters {
        if altitude_accuracy > POOR_ALTITUDE_ACCURACY_METERS {
            assessment.warnings.push(format!(
                "altitude accuracy poor (expected): ±{:.0}m",
                altitude_accuracy
            ));
        }
    }

    if let Some(kmh) = sample.speed_kmh() {
        if kmh > 0.0 {
            assessment.info.push(format!("speed: {:.1} km/h", kmh));
        }
    }

    if let Some(heading) = sample.heading_degrees {
        assessment.info.push(format!("heading: {:.1}°", heading));
    }

    if accuracy > 20.0 {
        assessment
            .recommendations
            .push("enable assisted positioning (A-GPS) in location settings".to_string());
        assessment
            .recommendations
            .push("enable high-accuracy mode".to_string());
    }

    if !is_secure_transport {
        assessment
            .warnings
            .push("not using a secure transport — accuracy may be limited".to_string());
        assessment
            .recommendations
            .push("use a secure transport for maximum accuracy".to_string());
    }

    assessment
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(accuracy: f64) -> PositionSample {
        PositionSample::new(52.37, 4.89, accuracy, 1_700_000_000_000)
    }

    #[test]
    fn test_tier_upper_edges_are_inclusive() {
        assert_eq!(AccuracyTier::from_accuracy(0.0), AccuracyTier::Excellent);
        assert_eq!(AccuracyTier::from_accuracy(5.0), AccuracyTier::Excellent);
        assert_eq!(AccuracyTier::from_accuracy(5.01), AccuracyTier::VeryHigh);
        assert_eq!(AccuracyTier::from_accuracy(10.0), AccuracyTier::VeryHigh);
        assert_eq!(AccuracyTier::from_accuracy(10.001), AccuracyTier::High);
        assert_eq!(AccuracyTier::from_accuracy(20.0), AccuracyTier::High);
        assert_eq!(AccuracyTier::from_accuracy(50.0), AccuracyTier::Medium);
        assert_eq!(AccuracyTier::from_accuracy(100.0), AccuracyTier::Low);
        assert_eq!(AccuracyTier::from_accuracy(100.5), AccuracyTier::VeryLow);
        assert_eq!(AccuracyTier::from_accuracy(5000.0), AccuracyTier::VeryLow);
    }

    #[test]
    fn test_ten_meters_is_very_high() {
        let assessment = classify(&sample(10.0), true);
        assert_eq!(assessment.tier, AccuracyTier::VeryHigh);
        assert_eq!(assessment.info, vec!["excellent accuracy"]);
    }

    #[test]
    fn test_tiers_are_ordered_best_first() {
        assert!(AccuracyTier::Excellent < AccuracyTier::VeryHigh);
        assert!(AccuracyTier::Low < AccuracyTier::VeryLow);
    }

    #[test]
    fn test_poor_accuracy_without_altitude() {
        let assessment = classify(&sample(150.0), true);

        assert_eq!(assessment.tier, AccuracyTier::VeryLow);
        assert_eq!(assessment.warnings, vec!["poor accuracy — may be network-based"]);
        assert!(assessment
            .recommendations
            .iter()
            .any(|r| r.contains("move outdoors")));
        assert_eq!(
            assessment.recommendations,
            vec![
                "move outdoors with clear sky view",
                "enable assisted positioning (A-GPS) in location settings",
                "enable high-accuracy mode",
            ]
        );
        assert!(assessment.info.is_empty());
    }

    #[test]
    fn test_moving_sample_on_secure_transport() {
        let assessment = classify(&sample(8.0).with_speed(5.0), true);

        assert_eq!(assessment.tier, AccuracyTier::VeryHigh);
        assert_eq!(assessment.info, vec!["excellent accuracy", "speed: 18.0 km/h"]);
        assert!(!assessment.warnings.iter().any(|w| w.contains("secure transport")));
        assert!(assessment.recommendations.is_empty());
    }

    #[test]
    fn test_band_messages() {
        // 100m is "low", not "poor"
        let at_100 = classify(&sample(100.0), true);
        assert_eq!(at_100.tier, AccuracyTier::Low);
        assert_eq!(at_100.warnings, vec!["low accuracy — weak signal"]);
        assert_eq!(at_100.recommendations[0], "move to open area/near window");

        let at_50 = classify(&sample(50.0), true);
        assert_eq!(at_50.tier, AccuracyTier::Medium);
        assert_eq!(at_50.info, vec!["moderate accuracy"]);
        assert_eq!(
            at_50.recommendations[0],
            "wait for signal to settle or move to open area"
        );
        assert_eq!(at_50.recommendations.len(), 3);

        let at_20 = classify(&sample(20.0), true);
        assert_eq!(at_20.tier, AccuracyTier::High);
        assert_eq!(at_20.info, vec!["good accuracy"]);
        assert!(at_20.recommendations.is_empty());

        let at_5 = classify(&sample(5.0), true);
        assert_eq!(at_5.tier, AccuracyTier::Excellent);
        assert_eq!(at_5.info, vec!["excellent accuracy"]);
    }

    #[test]
    fn test_message_order() {
        let s = sample(30.0)
            .with_altitude(120.0, Some(80.0))
            .with_speed(2.5)
            .with_heading(92.4);
        let assessment = classify(&s, false);

        assert_eq!(assessment.tier, AccuracyTier::Medium);
        assert_eq!(
            assessment.info,
            vec!["moderate accuracy", "speed: 9.0 km/h", "heading: 92.4°"]
        );
        assert_eq!(
            assessment.warnings,
            vec![
                "altitude accuracy poor (expected): ±80m",
                "not using a secure transport — accuracy may be limited",
            ]
        );
        assert_eq!(
            assessment.recommendations,
            vec![
                "wait for signal to settle or move to open area",
                "enable assisted positioning (A-GPS) in location settings",
                "enable high-accuracy mode",
                "use a secure transport for maximum accuracy",
            ]
        );
    }

    #[test]
    fn test_stationary_sample_has_no_speed_info() {
        let assessment = classify(&sample(3.0).with_speed(0.0), true);
        assert_eq!(assessment.tier, AccuracyTier::Excellent);
        assert_eq!(assessment.info, vec!["excellent accuracy"]);
    }

    #[test]
    fn test_good_altitude_accuracy_has_no_warning() {
        let assessment = classify(&sample(3.0).with_altitude(10.0, Some(50.0)), true);
        assert!(assessment.warnings.is_empty());
    }

    #[test]
    fn test_classify_is_deterministic() {
        let s = sample(64.0).with_heading(10.0).with_speed(1.0);
        let first = classify(&s, false);
        let second = classify(&s, false);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
