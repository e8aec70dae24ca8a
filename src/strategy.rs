//! Choosing between the two safety classifiers.
//!
//! The area-score widget and the map safety card classify the same data with
//! different rules. [`SafetyStrategy`] names the two so callers pick one
//! explicitly, and enforces that no classification happens without a location.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::classifier::{classify, ClassifierConfig};
use crate::density::{analyze, DensityConfig};
use crate::{IncidentReport, SafetyAssessment, UserLocation};

/// Errors that prevent a safety assessment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssessmentError {
    /// No user location (permission denied or fix unavailable).
    #[error("user location unavailable; cannot classify area safety")]
    LocationUnavailable,
}

/// A safety classification strategy.
#[derive(Debug, Clone)]
pub enum SafetyStrategy {
    /// Single-radius incident count; all supplied incidents count.
    Simple(ClassifierConfig),
    /// Recency window plus nested danger/caution/moderate zones.
    DensityWeighted(DensityConfig),
}

impl Default for SafetyStrategy {
    fn default() -> Self {
        SafetyStrategy::Simple(ClassifierConfig::default())
    }
}

impl SafetyStrategy {
    /// Assess the area around `user`.
    ///
    /// `now` is only read by [`SafetyStrategy::DensityWeighted`].
    ///
    /// # Errors
    ///
    /// Returns [`AssessmentError::LocationUnavailable`] when `user` is `None`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chrono::Utc;
    /// use crime_safety::{AssessmentError, SafetyStrategy};
    ///
    /// let result = SafetyStrategy::default().assess(None, &[], Utc::now());
    /// assert_eq!(result, Err(AssessmentError::LocationUnavailable));
    /// ```
    pub fn assess(
        &self,
        user: Option<&UserLocation>,
        incidents: &[IncidentReport],
        now: DateTime<Utc>,
    ) -> Result<SafetyAssessment, AssessmentError> {
        let user = user.ok_or(AssessmentError::LocationUnavailable)?;

        Ok(match self {
            SafetyStrategy::Simple(config) => classify(user, incidents, config),
            SafetyStrategy::DensityWeighted(config) => analyze(user, incidents, now, config),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            SafetyStrategy::Simple(_) => "simple",
            SafetyStrategy::DensityWeighted(_) => "density-weighted",
        }
    }
}
