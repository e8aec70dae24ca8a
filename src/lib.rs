//! # Crime Safety
//!
//! Area safety scoring and crime-density analysis for citizen-safety mobile clients.
//!
//! This library provides:
//! - Great-circle geometry over incident reports (distance, bearing, clustering)
//! - Time-window filtering with an explicitly injected "now"
//! - Two independent safety classifiers (single-radius count and recency/density weighted)
//! - Per-incident map marker styling and heatmap intensity aggregation
//!
//! Every operation is a pure function over already-fetched data. Fetching incidents,
//! reading the device location and rendering the map all live outside this crate.
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel marker/heatmap computation with rayon
//! - **`feed`** - Enable normalization of raw incident payloads
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeDelta, Utc};
//! use crime_safety::{classify, ClassifierConfig, IncidentReport, SafetyLevel, UserLocation};
//!
//! let now = Utc::now();
//! let user = UserLocation::new(14.6760, 121.0437, now);
//!
//! let incidents = vec![
//!     IncidentReport::new(14.6770, 121.0440, now - TimeDelta::days(3)),
//!     IncidentReport::new(14.6800, 121.0450, now - TimeDelta::days(12)),
//! ];
//!
//! let assessment = classify(&user, &incidents, &ClassifierConfig::default());
//! assert_eq!(assessment.level, SafetyLevel::Moderate);
//! assert!(assessment.is_safe);
//! ```

use chrono::{DateTime, Utc};
use std::fmt;

// Geometry primitives (distance, bearing, clustering)
pub mod geo_utils;
pub use geo_utils::{CompassDirection, NearestMatch};

// Time-range selection and date filtering
pub mod time_window;
pub use time_window::{cutoff_for, days_between, filter_since, parse_timestamp, TimeFilterOption};

// Single-radius "area score" classification
pub mod classifier;
pub use classifier::{classify, ClassifierConfig};

// Recency + density weighted analysis and marker styling
pub mod density;
pub use density::{
    analyze, color_for, crime_markers, intensity_at, marker_for, recency_weight,
    CrimeMarker, DensityConfig,
};

#[cfg(feature = "parallel")]
pub use density::crime_markers_parallel;

// Strategy selection across both classifiers
pub mod strategy;
pub use strategy::{AssessmentError, SafetyStrategy};

// Heatmap aggregation
pub mod heatmap;
pub use heatmap::{
    aggregate_heat_points, generate_heatmap, query_heatmap_cell, CellQueryResult, HeatPoint,
    HeatmapBounds, HeatmapCell, HeatmapConfig, HeatmapResult,
};

#[cfg(feature = "parallel")]
pub use heatmap::generate_heatmap_parallel;

// Service-area boundary
pub mod boundary;
pub use boundary::{BoundaryError, MapRegion, ServiceArea};

// Raw payload normalization
#[cfg(feature = "feed")]
pub mod feed;

#[cfg(feature = "feed")]
pub use feed::{parse_incident_feed, FeedBatch, FeedError};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("CrimeSafetyRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use crime_safety::GpsPoint;
/// let point = GpsPoint::new(14.6760, 121.0437); // Quezon City
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box of a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self { min_lat, max_lat, min_lng, max_lng })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// Check whether a point lies inside the bounds (edges inclusive).
    pub fn contains(&self, point: &GpsPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lng
            && point.longitude <= self.max_lng
    }
}

/// Anything with a geographic position.
///
/// Lets the geometry helpers in [`geo_utils`] work over incidents, user
/// locations and bare points alike.
pub trait Positioned {
    fn position(&self) -> GpsPoint;
}

impl Positioned for GpsPoint {
    fn position(&self) -> GpsPoint {
        *self
    }
}

/// A single reported crime event.
///
/// Produced by the data-access layer (see the `feed` feature) and never
/// mutated afterwards. Coordinates are expected to be in range; the geometry
/// functions do not re-validate them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncidentReport {
    pub latitude: f64,
    pub longitude: f64,
    pub occurred_at: DateTime<Utc>,
}

impl IncidentReport {
    pub fn new(latitude: f64, longitude: f64, occurred_at: DateTime<Utc>) -> Self {
        Self { latitude, longitude, occurred_at }
    }
}

impl Positioned for IncidentReport {
    fn position(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// A point-in-time reading of the user's position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub observed_at: DateTime<Utc>,
}

impl UserLocation {
    pub fn new(latitude: f64, longitude: f64, observed_at: DateTime<Utc>) -> Self {
        Self { latitude, longitude, observed_at }
    }
}

impl Positioned for UserLocation {
    fn position(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// Four-tier safety classification, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum SafetyLevel {
    Safe,
    Moderate,
    Caution,
    Danger,
}

impl SafetyLevel {
    /// Two-tier simplification: Safe and Moderate count as safe.
    pub fn is_safe(self) -> bool {
        matches!(self, SafetyLevel::Safe | SafetyLevel::Moderate)
    }

    /// Color used by the area-score widget.
    pub fn score_color(self) -> &'static str {
        match self {
            SafetyLevel::Safe => "#10B981",
            SafetyLevel::Moderate => "#F59E0B",
            SafetyLevel::Caution => "#F97316",
            SafetyLevel::Danger => "#EF4444",
        }
    }

    /// Color used by the map safety card.
    pub fn map_color(self) -> &'static str {
        match self {
            SafetyLevel::Safe => "#27AE60",
            SafetyLevel::Moderate => "#F1C40F",
            SafetyLevel::Caution => "#F39C12",
            SafetyLevel::Danger => "#E74C3C",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SafetyLevel::Safe => "safe",
            SafetyLevel::Moderate => "moderate",
            SafetyLevel::Caution => "caution",
            SafetyLevel::Danger => "danger",
        }
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying a location.
///
/// Created fresh by every classification call.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SafetyAssessment {
    /// Two-tier verdict (true for Safe and Moderate)
    pub is_safe: bool,
    pub level: SafetyLevel,
    /// Distance to the closest considered incident; `None` when there were none
    pub nearest_incident_distance_km: Option<f64>,
    /// Incident count behind the verdict
    pub incidents_nearby: u32,
    pub message: String,
    pub display_color: String,
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    use super::*;
    use chrono::Local;
    use log::{debug, info, warn};

    /// Incident as it crosses the FFI boundary (timestamp in Unix milliseconds).
    #[derive(Debug, Clone, Copy, uniffi::Record)]
    pub struct FfiIncident {
        pub latitude: f64,
        pub longitude: f64,
        pub occurred_at_ms: i64,
    }

    impl From<&IncidentReport> for FfiIncident {
        fn from(incident: &IncidentReport) -> Self {
            Self {
                latitude: incident.latitude,
                longitude: incident.longitude,
                occurred_at_ms: incident.occurred_at.timestamp_millis(),
            }
        }
    }

    /// Closest incident to a location.
    #[derive(Debug, Clone, uniffi::Record)]
    pub struct NearestIncident {
        pub incident: FfiIncident,
        pub distance_km: f64,
        pub direction: CompassDirection,
    }

    fn to_incidents(incidents: &[FfiIncident]) -> Vec<IncidentReport> {
        let converted: Vec<IncidentReport> = incidents
            .iter()
            .filter_map(|i| {
                let occurred_at = DateTime::<Utc>::from_timestamp_millis(i.occurred_at_ms)?;
                Some(IncidentReport::new(i.latitude, i.longitude, occurred_at))
            })
            .collect();
        if converted.len() != incidents.len() {
            debug!(
                "[CrimeSafetyRust] Dropped {} incidents with out-of-range timestamps",
                incidents.len() - converted.len()
            );
        }
        converted
    }

    fn to_user(location: Option<GpsPoint>, now: DateTime<Utc>) -> Option<UserLocation> {
        location.map(|p| UserLocation::new(p.latitude, p.longitude, now))
    }

    /// Classify the user's area with the single-radius area score.
    /// Returns `None` when no location is available.
    #[uniffi::export]
    pub fn ffi_classify(
        user: Option<GpsPoint>,
        incidents: Vec<FfiIncident>,
        config: ClassifierConfig,
    ) -> Option<SafetyAssessment> {
        init_logging();
        let now = Utc::now();
        info!("[CrimeSafetyRust] classify called with {} incidents", incidents.len());
        let strategy = SafetyStrategy::Simple(config);
        strategy
            .assess(to_user(user, now).as_ref(), &to_incidents(&incidents), now)
            .ok()
    }

    /// Analyze the user's area with recency and density weighting.
    /// Returns `None` when no location is available.
    #[uniffi::export]
    pub fn ffi_analyze(
        user: Option<GpsPoint>,
        incidents: Vec<FfiIncident>,
        config: DensityConfig,
    ) -> Option<SafetyAssessment> {
        init_logging();
        let now = Utc::now();
        info!("[CrimeSafetyRust] analyze called with {} incidents", incidents.len());
        let strategy = SafetyStrategy::DensityWeighted(config);
        let result = strategy.assess(to_user(user, now).as_ref(), &to_incidents(&incidents), now);
        if let Ok(ref assessment) = result {
            info!(
                "[CrimeSafetyRust] Area is {} ({} incidents nearby)",
                assessment.level, assessment.incidents_nearby
            );
        }
        result.ok()
    }

    /// Compute render data for every incident of a (recent) set.
    #[uniffi::export]
    pub fn ffi_crime_markers(incidents: Vec<FfiIncident>, config: DensityConfig) -> Vec<CrimeMarker> {
        init_logging();
        let now = Utc::now();
        let incidents = to_incidents(&incidents);

        let start = std::time::Instant::now();

        #[cfg(feature = "parallel")]
        let markers = crime_markers_parallel(&incidents, now, &config);

        #[cfg(not(feature = "parallel"))]
        let markers = crime_markers(&incidents, now, &config);

        info!(
            "[CrimeSafetyRust] Styled {} markers in {:?}",
            markers.len(),
            start.elapsed()
        );
        markers
    }

    /// Heat intensity (0.0-1.0) at a query point.
    #[uniffi::export]
    pub fn ffi_intensity_at(
        latitude: f64,
        longitude: f64,
        incidents: Vec<FfiIncident>,
        radius_km: f64,
    ) -> f64 {
        init_logging();
        intensity_at(latitude, longitude, &to_incidents(&incidents), radius_km, Utc::now())
    }

    /// Keep incidents inside the selected time range, evaluated in device local time.
    #[uniffi::export]
    pub fn ffi_filter_by_time(
        incidents: Vec<FfiIncident>,
        filter: TimeFilterOption,
    ) -> Vec<FfiIncident> {
        init_logging();
        let cutoff = cutoff_for(filter, &Local::now());
        let kept = filter_since(&to_incidents(&incidents), cutoff, |i| Some(i.occurred_at));
        debug!(
            "[CrimeSafetyRust] {} kept {} of {} incidents",
            filter.label(),
            kept.len(),
            incidents.len()
        );
        kept.iter().map(FfiIncident::from).collect()
    }

    /// Closest incident to a location, with compass direction.
    #[uniffi::export]
    pub fn ffi_nearest_incident(
        from: GpsPoint,
        incidents: Vec<FfiIncident>,
    ) -> Option<NearestIncident> {
        init_logging();
        let incidents = to_incidents(&incidents);
        geo_utils::nearest_point(&from, &incidents).map(|m| NearestIncident {
            incident: FfiIncident::from(m.item),
            distance_km: m.distance_km,
            direction: m.direction,
        })
    }

    /// Generate a heatmap grid for the map overlay.
    #[uniffi::export]
    pub fn ffi_generate_heatmap(
        incidents: Vec<FfiIncident>,
        config: HeatmapConfig,
    ) -> HeatmapResult {
        init_logging();
        let incidents = to_incidents(&incidents);
        let start = std::time::Instant::now();
        let heatmap = generate_heatmap_parallel(&incidents, Utc::now(), &config);
        info!(
            "[CrimeSafetyRust] Heatmap: {} cells from {} incidents in {:?}",
            heatmap.cells.len(),
            incidents.len(),
            start.elapsed()
        );
        heatmap
    }

    /// Query the heatmap at a tapped location.
    #[uniffi::export]
    pub fn ffi_query_heatmap_cell(
        heatmap: HeatmapResult,
        latitude: f64,
        longitude: f64,
    ) -> Option<CellQueryResult> {
        query_heatmap_cell(&heatmap, latitude, longitude)
    }

    /// Weighted heat points for a client-side heat layer.
    #[uniffi::export]
    pub fn ffi_heat_points(incidents: Vec<FfiIncident>) -> Vec<HeatPoint> {
        init_logging();
        aggregate_heat_points(&to_incidents(&incidents))
    }

    /// Initial map framing for a service-area outline.
    /// Returns `None` if the outline is not a usable polygon.
    #[uniffi::export]
    pub fn ffi_service_area_region(ring: Vec<GpsPoint>) -> Option<MapRegion> {
        init_logging();
        match ServiceArea::from_ring(&ring) {
            Ok(area) => Some(area.map_region()),
            Err(e) => {
                warn!("[CrimeSafetyRust] Invalid service area: {}", e);
                None
            }
        }
    }

    /// Get default area-score configuration.
    #[uniffi::export]
    pub fn default_classifier_config() -> ClassifierConfig {
        init_logging();
        ClassifierConfig::default()
    }

    /// Get default density-analysis configuration.
    #[uniffi::export]
    pub fn default_density_config() -> DensityConfig {
        init_logging();
        DensityConfig::default()
    }

    /// Get default heatmap configuration.
    #[uniffi::export]
    pub fn default_heatmap_config() -> HeatmapConfig {
        init_logging();
        HeatmapConfig::default()
    }
}

// ============================================================================
// Tests
// ============================================================================
