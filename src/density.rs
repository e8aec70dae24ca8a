//! # Density Analysis
//!
//! Recency- and density-aware safety analysis for the map view.
//!
//! Unlike the single-radius area score in [`crate::classifier`], this analysis:
//! - ignores incidents older than a recency window (90 days by default)
//! - counts incidents in three nested zones (500 m / 1 km / 2 km)
//! - produces per-incident render data ([`CrimeMarker`]) whose size and opacity
//!   grow with local density (incidents within 200 m)
//! - scores heat intensity at arbitrary points with recency decay
//!
//! The two classifiers deliberately use different thresholds and palettes and
//! are not interchangeable. See [`crate::SafetyStrategy`] for choosing between
//! them.

use chrono::{DateTime, TimeDelta, Utc};
use log::debug;
use rstar::{RTree, RTreeObject, AABB};

use crate::geo_utils::{distance_km, is_within_radius, meters_to_degrees};
use crate::time_window::{days_between, filter_since};
use crate::{GpsPoint, IncidentReport, Positioned, SafetyAssessment, SafetyLevel, UserLocation};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Recent markers are red, older ones orange.
const RECENT_RGB: (u8, u8, u8) = (231, 76, 60);
const OLDER_RGB: (u8, u8, u8) = (243, 156, 18);

/// Configuration for density analysis.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct DensityConfig {
    /// Innermost zone radius in kilometers (default: 0.5)
    pub danger_radius_km: f64,
    /// Middle zone radius in kilometers (default: 1.0)
    pub caution_radius_km: f64,
    /// Outer zone radius in kilometers (default: 2.0)
    pub moderate_radius_km: f64,
    /// Incidents older than this many days are ignored by [`analyze`] (default: 90)
    pub recent_window_days: u32,
    /// Neighbourhood radius for local density, exclusive (default: 0.2)
    pub density_radius_km: f64,
    /// Markers younger than this many days render as recent (default: 30)
    pub recent_marker_days: u32,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            danger_radius_km: 0.5,
            caution_radius_km: 1.0,
            moderate_radius_km: 2.0,
            recent_window_days: 90,
            density_radius_km: 0.2,
            recent_marker_days: 30,
        }
    }
}

// =============================================================================
// Area Analysis
// =============================================================================

/// Analyze the user's surroundings using recent incidents in nested zones.
///
/// Rules, first match wins:
///
/// | Rule | Level | `incidents_nearby` |
/// |---|---|---|
/// | ≥ 3 within danger radius | Danger | danger count |
/// | ≥ 5 within caution radius, or ≥ 1 within danger radius | Caution | caution count |
/// | ≥ 3 within moderate radius | Moderate | moderate count |
/// | otherwise | Safe | moderate count |
///
/// When no incident falls inside the recency window the result is Safe with
/// no nearest distance, however many older incidents exist.
///
/// # Example
///
/// ```rust
/// use chrono::{TimeDelta, Utc};
/// use crime_safety::{analyze, DensityConfig, IncidentReport, SafetyLevel, UserLocation};
///
/// let now = Utc::now();
/// let user = UserLocation::new(14.6760, 121.0437, now);
/// let incidents: Vec<IncidentReport> = (1..=3)
///     .map(|i| IncidentReport::new(14.6760 + i as f64 * 0.001, 121.0437, now - TimeDelta::days(5)))
///     .collect();
///
/// let assessment = analyze(&user, &incidents, now, &DensityConfig::default());
/// assert_eq!(assessment.level, SafetyLevel::Danger);
/// assert_eq!(assessment.incidents_nearby, 3);
/// ```
pub fn analyze(
    user: &UserLocation,
    incidents: &[IncidentReport],
    now: DateTime<Utc>,
    config: &DensityConfig,
) -> SafetyAssessment {
    let cutoff = now
        .checked_sub_signed(TimeDelta::days(i64::from(config.recent_window_days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let recent = filter_since(incidents, cutoff, |i| Some(i.occurred_at));

    debug!(
        "[DensityAnalyzer] {} of {} incidents within {} days",
        recent.len(),
        incidents.len(),
        config.recent_window_days
    );

    if recent.is_empty() {
        return assessment(
            SafetyLevel::Safe,
            None,
            0,
            "No crime data available for your area.".to_string(),
        );
    }

    let origin = user.position();
    let mut distances: Vec<f64> = recent
        .iter()
        .map(|i| distance_km(&origin, &i.position()))
        .collect();
    distances.sort_by(f64::total_cmp);

    let nearest = distances.first().copied();
    let within = |radius_km: f64| distances.partition_point(|&d| d <= radius_km) as u32;

    let danger_count = within(config.danger_radius_km);
    let caution_count = within(config.caution_radius_km);
    let moderate_count = within(config.moderate_radius_km);

    if danger_count >= 3 {
        return assessment(
            SafetyLevel::Danger,
            nearest,
            danger_count,
            format!(
                "⚠️ High crime area: {} incidents within {}",
                danger_count,
                radius_label(config.danger_radius_km)
            ),
        );
    }

    if caution_count >= 5 || danger_count >= 1 {
        return assessment(
            SafetyLevel::Caution,
            nearest,
            caution_count,
            format!(
                "⚠️ Exercise caution: {} incidents within {}",
                caution_count,
                radius_label(config.caution_radius_km)
            ),
        );
    }

    if moderate_count >= 3 {
        return assessment(
            SafetyLevel::Moderate,
            nearest,
            moderate_count,
            format!(
                "⚠️ Moderate safety: {} incidents within {}",
                moderate_count,
                radius_label(config.moderate_radius_km)
            ),
        );
    }

    assessment(
        SafetyLevel::Safe,
        nearest,
        moderate_count,
        "✓ Area appears safe. Stay vigilant.".to_string(),
    )
}

fn assessment(
    level: SafetyLevel,
    nearest: Option<f64>,
    incidents_nearby: u32,
    message: String,
) -> SafetyAssessment {
    SafetyAssessment {
        is_safe: level.is_safe(),
        level,
        nearest_incident_distance_km: nearest,
        incidents_nearby,
        message,
        display_color: level.map_color().to_string(),
    }
}

/// "500m", "1km", "2km"
fn radius_label(radius_km: f64) -> String {
    if radius_km < 1.0 {
        format!("{}m", (radius_km * 1000.0).round() as i64)
    } else {
        format!("{radius_km}km")
    }
}

// =============================================================================
// Marker Styling
// =============================================================================

/// Render data for one incident on the map.
///
/// Pure data: the rendering layer decides how to draw a circle of `radius`
/// filled with `fill_color`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct CrimeMarker {
    pub latitude: f64,
    pub longitude: f64,
    /// Circle radius in display units (50 + 20 per neighbouring incident)
    pub radius: f64,
    /// Incidents of the recent set within the density radius, including this one
    pub density: u32,
    /// Younger than `recent_marker_days`
    pub is_recent: bool,
    pub opacity: f64,
    /// CSS `rgba(...)` color with `opacity` applied
    pub fill_color: String,
}

/// Render data for `incident` given the recent set it belongs to.
pub fn marker_for(
    incident: &IncidentReport,
    recent_set: &[IncidentReport],
    now: DateTime<Utc>,
    config: &DensityConfig,
) -> CrimeMarker {
    let origin = incident.position();
    let density = recent_set
        .iter()
        .filter(|c| distance_km(&origin, &c.position()) < config.density_radius_km)
        .count() as u32;

    style_marker(incident, density, now, config)
}

/// Fill color for `incident`; see [`marker_for`].
pub fn color_for(
    incident: &IncidentReport,
    recent_set: &[IncidentReport],
    now: DateTime<Utc>,
    config: &DensityConfig,
) -> String {
    marker_for(incident, recent_set, now, config).fill_color
}

fn style_marker(
    incident: &IncidentReport,
    density: u32,
    now: DateTime<Utc>,
    config: &DensityConfig,
) -> CrimeMarker {
    let days_ago = days_between(incident.occurred_at, now);
    let is_recent = days_ago < u64::from(config.recent_marker_days);
    let d = f64::from(density);

    let (opacity, (r, g, b)) = if is_recent {
        ((0.2 + 0.1 * d).min(0.9), RECENT_RGB)
    } else {
        ((0.15 + 0.08 * d).min(0.7), OLDER_RGB)
    };

    CrimeMarker {
        latitude: incident.latitude,
        longitude: incident.longitude,
        radius: 50.0 + 20.0 * d,
        density,
        is_recent,
        opacity,
        fill_color: format!("rgba({r}, {g}, {b}, {opacity:.2})"),
    }
}

// =============================================================================
// Batched Marker Styling (R-tree)
// =============================================================================

/// Incident position indexed for neighbour search.
#[derive(Debug, Clone, Copy)]
struct IndexedIncident {
    lat: f64,
    lng: f64,
}

impl RTreeObject for IndexedIncident {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lat, self.lng])
    }
}

fn build_rtree(incidents: &[IncidentReport]) -> RTree<IndexedIncident> {
    let indexed: Vec<IndexedIncident> = incidents
        .iter()
        .map(|i| IndexedIncident { lat: i.latitude, lng: i.longitude })
        .collect();
    RTree::bulk_load(indexed)
}

/// Below this `cos(latitude)` the longitude span of a search box degenerates.
const MIN_INDEXED_COS_LAT: f64 = 0.1;

/// Local density via the R-tree. The search box is padded well past the
/// density radius; the exact haversine test decides membership, so the count
/// matches the linear scan in [`marker_for`].
///
/// Boxes crossing the antimeridian are split in two. Near the poles, or when
/// the box would reach a pole or span every longitude, every indexed incident
/// is tested.
fn indexed_density(tree: &RTree<IndexedIncident>, origin: &GpsPoint, radius_km: f64) -> u32 {
    let is_neighbour =
        |c: &&IndexedIncident| distance_km(origin, &GpsPoint::new(c.lat, c.lng)) < radius_km;

    let search_meters = radius_km * 1000.0 * 1.5;
    let lat_half_width = search_meters / 111_320.0;
    let lng_half_width = meters_to_degrees(search_meters, origin.latitude);

    let crosses_pole = origin.latitude.abs() + lat_half_width >= 90.0;
    if origin.latitude.to_radians().cos() < MIN_INDEXED_COS_LAT
        || crosses_pole
        || lng_half_width >= 180.0
    {
        return tree.iter().filter(is_neighbour).count() as u32;
    }

    longitude_spans(origin.longitude, lng_half_width)
        .into_iter()
        .map(|(min_lng, max_lng)| {
            let search = AABB::from_corners(
                [origin.latitude - lat_half_width, min_lng],
                [origin.latitude + lat_half_width, max_lng],
            );
            tree.locate_in_envelope(&search).filter(is_neighbour).count() as u32
        })
        .sum()
}

/// Disjoint longitude ranges covering `center ± half_width`, wrapped at ±180°.
fn longitude_spans(center: f64, half_width: f64) -> Vec<(f64, f64)> {
    let (min, max) = (center - half_width, center + half_width);
    let mut spans = vec![(min.max(-180.0), max.min(180.0))];
    if min < -180.0 {
        spans.push((min + 360.0, 180.0));
    }
    if max > 180.0 {
        spans.push((-180.0, max - 360.0));
    }
    spans
}

/// Markers for every incident of `recent_set`, in input order.
///
/// Same output as calling [`marker_for`] per incident, without the quadratic
/// scan.
pub fn crime_markers(
    recent_set: &[IncidentReport],
    now: DateTime<Utc>,
    config: &DensityConfig,
) -> Vec<CrimeMarker> {
    let tree = build_rtree(recent_set);

    recent_set
        .iter()
        .map(|incident| {
            let density = indexed_density(&tree, &incident.position(), config.density_radius_km);
            style_marker(incident, density, now, config)
        })
        .collect()
}

/// Parallel version of [`crime_markers`]. Output order matches input order.
#[cfg(feature = "parallel")]
pub fn crime_markers_parallel(
    recent_set: &[IncidentReport],
    now: DateTime<Utc>,
    config: &DensityConfig,
) -> Vec<CrimeMarker> {
    let tree = build_rtree(recent_set);

    recent_set
        .par_iter()
        .map(|incident| {
            let density = indexed_density(&tree, &incident.position(), config.density_radius_km);
            style_marker(incident, density, now, config)
        })
        .collect()
}

// =============================================================================
// Heat Intensity
// =============================================================================

/// Weight of an incident in heat intensity by age in (ceiling) days.
///
/// `< 7` → 1.0, `< 30` → 0.7, `< 90` → 0.4, otherwise 0.1.
pub fn recency_weight(days_ago: u64) -> f64 {
    match days_ago {
        0..=6 => 1.0,
        7..=29 => 0.7,
        30..=89 => 0.4,
        _ => 0.1,
    }
}

/// Heat intensity in `[0, 1]` at a query point.
///
/// Sums [`recency_weight`] over every incident within `radius_km` (no recency
/// pre-filter) and divides by 10, capped at 1.0. Ten fresh incidents saturate.
///
/// # Example
///
/// ```rust
/// use chrono::{TimeDelta, Utc};
/// use crime_safety::{intensity_at, IncidentReport};
///
/// let now = Utc::now();
/// let incidents = vec![IncidentReport::new(14.6760, 121.0437, now - TimeDelta::days(10))];
///
/// let intensity = intensity_at(14.6760, 121.0437, &incidents, 1.0, now);
/// assert!((intensity - 0.07).abs() < 1e-9);
/// ```
pub fn intensity_at(
    latitude: f64,
    longitude: f64,
    incidents: &[IncidentReport],
    radius_km: f64,
    now: DateTime<Utc>,
) -> f64 {
    let center = GpsPoint::new(latitude, longitude);

    let total_weight: f64 = incidents
        .iter()
        .filter(|i| is_within_radius(&center, &i.position(), radius_km))
        .map(|i| recency_weight(days_between(i.occurred_at, now)))
        .sum();

    (total_weight / 10.0).min(1.0)
}
