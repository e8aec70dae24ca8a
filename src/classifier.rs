//! Single-radius area score.
//!
//! Counts every supplied incident within one radius of the user and maps the
//! count onto the four safety levels. No recency filtering happens here; pass
//! an already time-filtered slice if the widget shows a time range.

use crate::geo_utils::distance_km;
use crate::{IncidentReport, Positioned, SafetyAssessment, SafetyLevel, UserLocation};

/// Configuration for the area score.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ClassifierConfig {
    /// Search radius in kilometers (default: 2.0)
    pub radius_km: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { radius_km: 2.0 }
    }
}

/// Classify the user's surroundings by incident count.
///
/// | Incidents within radius | Level | `is_safe` |
/// |---|---|---|
/// | 0 | Safe | true |
/// | 1-2 | Moderate | true |
/// | 3-5 | Caution | false |
/// | 6+ | Danger | false |
///
/// `nearest_incident_distance_km` is measured over all incidents, not just
/// those inside the radius, and is `None` when `incidents` is empty.
///
/// # Example
///
/// ```rust
/// use chrono::Utc;
/// use crime_safety::{classify, ClassifierConfig, SafetyLevel, UserLocation};
///
/// let user = UserLocation::new(14.6760, 121.0437, Utc::now());
/// let assessment = classify(&user, &[], &ClassifierConfig::default());
///
/// assert_eq!(assessment.level, SafetyLevel::Safe);
/// assert_eq!(assessment.nearest_incident_distance_km, None);
/// ```
pub fn classify(
    user: &UserLocation,
    incidents: &[IncidentReport],
    config: &ClassifierConfig,
) -> SafetyAssessment {
    let origin = user.position();
    let radius_km = config.radius_km;

    let mut count: u32 = 0;
    let mut nearest: Option<f64> = None;

    for incident in incidents {
        let distance = distance_km(&origin, &incident.position());
        if distance <= radius_km {
            count += 1;
        }
        if nearest.map_or(true, |n| distance < n) {
            nearest = Some(distance);
        }
    }

    let (level, message) = match count {
        0 => (
            SafetyLevel::Safe,
            format!("No reported crimes within {radius_km}km. This area appears to be safe."),
        ),
        1..=2 => (
            SafetyLevel::Moderate,
            format!(
                "{count} crime{} reported within {radius_km}km. Exercise normal caution.",
                if count > 1 { "s" } else { "" }
            ),
        ),
        3..=5 => (
            SafetyLevel::Caution,
            format!("{count} crimes reported within {radius_km}km. Increased caution advised."),
        ),
        _ => (
            SafetyLevel::Danger,
            format!("{count} crimes reported within {radius_km}km. High caution recommended."),
        ),
    };

    SafetyAssessment {
        is_safe: level.is_safe(),
        level,
        nearest_incident_distance_km: nearest,
        incidents_nearby: count,
        message,
        display_color: level.score_color().to_string(),
    }
}
