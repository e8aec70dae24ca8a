//! # Geographic Utilities
//!
//! Geometry primitives shared by the classifiers and the heatmap. Nothing in
//! here knows about crime or safety.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`distance_km`] | Haversine distance in kilometers, rounded to 2 decimals |
//! | [`is_within_radius`] | Inclusive radius membership |
//! | [`bearing_direction`] | Eight-way compass sector from one point to another |
//! | [`nearest_point`] | Closest candidate with distance and direction |
//! | [`cluster_by_proximity`] | Greedy seed-based clustering |
//! | [`points_within_radius`] | All candidates inside a radius |
//! | [`format_distance`] | Human-readable distance ("500 m", "1.5 km") |
//!
//! ## Example
//!
//! ```rust
//! use crime_safety::{GpsPoint, geo_utils};
//!
//! let city_hall = GpsPoint::new(14.6760, 121.0437);
//! let one_degree_north = GpsPoint::new(15.6760, 121.0437);
//!
//! let d = geo_utils::distance_km(&city_hall, &one_degree_north);
//! assert!((110.0..=112.0).contains(&d));
//! ```
//!
//! ## Algorithm Notes
//!
//! Distances use the haversine formula on a sphere of radius 6371 km and are
//! rounded to 0.01 km. Every threshold comparison in the crate is made against
//! the rounded value, so a point 2.004 km away is "within 2 km".
//!
//! Coordinates are not validated: out-of-range input produces a number, not an
//! error. Validation belongs to whoever builds the [`crate::IncidentReport`]s.

use crate::{Bounds, GpsPoint, Positioned};
use std::fmt;

/// Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance between two points in kilometers, rounded to 2 decimal places.
///
/// Symmetric, and zero for identical points.
///
/// # Example
///
/// ```rust
/// use crime_safety::{GpsPoint, geo_utils};
///
/// let p = GpsPoint::new(14.6760, 121.0437);
/// assert_eq!(geo_utils::distance_km(&p, &p), 0.0);
/// ```
pub fn distance_km(from: &GpsPoint, to: &GpsPoint) -> f64 {
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    round_hundredths(EARTH_RADIUS_KM * c)
}

#[inline]
fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// True iff `point` is at most `radius_km` from `center` (boundary inclusive).
#[inline]
pub fn is_within_radius(center: &GpsPoint, point: &GpsPoint, radius_km: f64) -> bool {
    distance_km(center, point) <= radius_km
}

/// All points within `radius_km` of `center`, in input order.
pub fn points_within_radius<'a, T: Positioned>(
    center: &GpsPoint,
    points: &'a [T],
    radius_km: f64,
) -> Vec<&'a T> {
    points
        .iter()
        .filter(|p| is_within_radius(center, &p.position(), radius_km))
        .collect()
}

/// Convert meters to approximate degrees at a given latitude.
///
/// Uses the longitude scale at `latitude`, so the result is a longitude
/// half-width for a search box. The scale is clamped at `cos = 0.1` (about
/// 84°); closer to the poles the result under-covers and callers must not
/// rely on it.
#[inline]
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let lat_rad = latitude.to_radians();
    let meters_per_degree = 111_320.0 * lat_rad.cos().max(0.1);
    meters / meters_per_degree
}

/// Format a distance for display.
///
/// Below one kilometer the value is shown in whole meters, otherwise in
/// kilometers with one decimal.
///
/// ```rust
/// use crime_safety::geo_utils::format_distance;
///
/// assert_eq!(format_distance(0.5), "500 m");
/// assert_eq!(format_distance(1.46), "1.5 km");
/// ```
pub fn format_distance(distance_km: f64) -> String {
    if distance_km < 1.0 {
        format!("{} m", (distance_km * 1000.0).round() as i64)
    } else {
        format!("{:.1} km", distance_km)
    }
}

// =============================================================================
// Direction
// =============================================================================

/// Eight-way compass sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum CompassDirection {
    North,
    Northeast,
    East,
    Southeast,
    South,
    Southwest,
    West,
    Northwest,
}

impl CompassDirection {
    const SECTORS: [CompassDirection; 8] = [
        CompassDirection::North,
        CompassDirection::Northeast,
        CompassDirection::East,
        CompassDirection::Southeast,
        CompassDirection::South,
        CompassDirection::Southwest,
        CompassDirection::West,
        CompassDirection::Northwest,
    ];

    /// Sector containing a bearing in degrees (any value, normalized to `[0, 360)`).
    ///
    /// Each sector is 45° wide and centered on its direction, so North covers
    /// `[337.5, 360) ∪ [0, 22.5)`.
    pub fn from_degrees(degrees: f64) -> Self {
        let normalized = degrees.rem_euclid(360.0);
        let index = ((normalized + 22.5) / 45.0).floor() as usize % 8;
        Self::SECTORS[index]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompassDirection::North => "North",
            CompassDirection::Northeast => "Northeast",
            CompassDirection::East => "East",
            CompassDirection::Southeast => "Southeast",
            CompassDirection::South => "South",
            CompassDirection::Southwest => "Southwest",
            CompassDirection::West => "West",
            CompassDirection::Northwest => "Northwest",
        }
    }
}

impl fmt::Display for CompassDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compass direction from `from` to `to`.
///
/// Uses the planar angle `atan2(Δlon, Δlat)`, which is adequate at city scale.
///
/// # Degenerate input
///
/// When `from == to` the bearing is undefined. `atan2(0, 0)` is `0`, so this
/// returns [`CompassDirection::North`]; callers must not read meaning into it.
pub fn bearing_direction(from: &GpsPoint, to: &GpsPoint) -> CompassDirection {
    let d_lat = to.latitude - from.latitude;
    let d_lon = to.longitude - from.longitude;
    CompassDirection::from_degrees(d_lon.atan2(d_lat).to_degrees())
}

// =============================================================================
// Nearest Point
// =============================================================================

/// Closest candidate found by [`nearest_point`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestMatch<'a, T> {
    pub item: &'a T,
    pub distance_km: f64,
    pub direction: CompassDirection,
}

/// Find the candidate closest to `from`.
///
/// Linear scan with a strict `<`, so the first of several equidistant
/// candidates wins. Returns `None` for an empty slice.
pub fn nearest_point<'a, T: Positioned>(
    from: &GpsPoint,
    candidates: &'a [T],
) -> Option<NearestMatch<'a, T>> {
    let mut best: Option<(&'a T, f64)> = None;

    for candidate in candidates {
        let distance = distance_km(from, &candidate.position());
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((candidate, distance)),
        }
    }

    best.map(|(item, distance_km)| NearestMatch {
        item,
        distance_km,
        direction: bearing_direction(from, &item.position()),
    })
}

// =============================================================================
// Clustering
// =============================================================================

/// Greedy single-pass clustering.
///
/// Points are visited in input order. Each point not yet clustered seeds a new
/// cluster and absorbs every later unclustered point within
/// `cluster_radius_km` of the seed (inclusive). Membership is measured against
/// the seed only, not against other members, so the result depends on input
/// order and is not transitive.
///
/// # Example
///
/// ```rust
/// use crime_safety::{GpsPoint, geo_utils};
///
/// let points = vec![
///     GpsPoint::new(14.6760, 121.0437),
///     GpsPoint::new(14.6769, 121.0437), // ~100 m north
///     GpsPoint::new(14.7660, 121.0437), // ~10 km north
/// ];
///
/// let clusters = geo_utils::cluster_by_proximity(&points, 0.5);
/// assert_eq!(clusters.len(), 2);
/// assert_eq!(clusters[0].len(), 2);
/// ```
pub fn cluster_by_proximity<T: Positioned>(points: &[T], cluster_radius_km: f64) -> Vec<Vec<&T>> {
    let mut clusters = Vec::new();
    let mut used = vec![false; points.len()];

    for i in 0..points.len() {
        if used[i] {
            continue;
        }
        used[i] = true;

        let seed = points[i].position();
        let mut cluster = vec![&points[i]];

        for j in (i + 1)..points.len() {
            if used[j] {
                continue;
            }
            if distance_km(&seed, &points[j].position()) <= cluster_radius_km {
                cluster.push(&points[j]);
                used[j] = true;
            }
        }

        clusters.push(cluster);
    }

    clusters
}

// =============================================================================
// Bounds / Center
// =============================================================================

/// Bounding box of a set of positioned items. `None` for empty input.
pub fn compute_bounds<T: Positioned>(points: &[T]) -> Option<Bounds> {
    let positions: Vec<GpsPoint> = points.iter().map(Positioned::position).collect();
    Bounds::from_points(&positions)
}

/// Arithmetic centroid of a set of positioned items. `None` for empty input.
///
/// Fine for city-scale data; meaningless across the antimeridian.
pub fn compute_center<T: Positioned>(points: &[T]) -> Option<GpsPoint> {
    if points.is_empty() {
        return None;
    }

    let n = points.len() as f64;
    let (sum_lat, sum_lng) = points.iter().fold((0.0, 0.0), |(lat, lng), p| {
        let pos = p.position();
        (lat + pos.latitude, lng + pos.longitude)
    });

    Some(GpsPoint::new(sum_lat / n, sum_lng / n))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_distance_same_point() {
        let p = GpsPoint::new(14.6760, 121.0437);
        assert_eq!(distance_km(&p, &p), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = GpsPoint::new(14.6760, 121.0437);
        let b = GpsPoint::new(14.5995, 120.9842);
        assert_eq!(distance_km(&a, &b), distance_km(&b, &a));
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        let a = GpsPoint::new(14.6760, 121.0437);
        let b = GpsPoint::new(15.6760, 121.0437);
        let d = distance_km(&a, &b);
        assert!((110.0..=112.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_distance_is_rounded() {
        let a = GpsPoint::new(14.6760, 121.0437);
        let b = GpsPoint::new(14.6801, 121.0492);
        let d = distance_km(&a, &b);
        assert_eq!(d, (d * 100.0).round() / 100.0);
    }

    #[test]
    fn test_distance_triangle_inequality() {
        let a = GpsPoint::new(14.6760, 121.0437);
        let b = GpsPoint::new(14.6500, 121.0500);
        let c = GpsPoint::new(14.6300, 121.0100);
        let direct = distance_km(&a, &c);
        let via_b = distance_km(&a, &b) + distance_km(&b, &c);
        // Rounding can cost at most 0.005 per leg
        assert!(direct <= via_b + 0.015);
    }

    #[test]
    fn test_is_within_radius_inclusive() {
        let center = GpsPoint::new(0.0, 0.0);
        let point = GpsPoint::new(0.009, 0.0); // ~1.00 km
        let d = distance_km(&center, &point);
        assert!(is_within_radius(&center, &point, d));
        assert!(!is_within_radius(&center, &point, d - 0.01));
    }

    #[test]
    fn test_points_within_radius_keeps_order() {
        let center = GpsPoint::new(14.6760, 121.0437);
        let points = vec![
            GpsPoint::new(14.6770, 121.0437),
            GpsPoint::new(14.9000, 121.0437),
            GpsPoint::new(14.6750, 121.0437),
        ];
        let inside = points_within_radius(&center, &points, 1.0);
        assert_eq!(inside, vec![&points[0], &points[2]]);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = GpsPoint::new(0.0, 0.0);
        assert_eq!(bearing_direction(&origin, &GpsPoint::new(1.0, 0.0)), CompassDirection::North);
        assert_eq!(bearing_direction(&origin, &GpsPoint::new(0.0, 1.0)), CompassDirection::East);
        assert_eq!(bearing_direction(&origin, &GpsPoint::new(-1.0, 0.0)), CompassDirection::South);
        assert_eq!(bearing_direction(&origin, &GpsPoint::new(0.0, -1.0)), CompassDirection::West);
        assert_eq!(bearing_direction(&origin, &GpsPoint::new(1.0, 1.0)), CompassDirection::Northeast);
        assert_eq!(bearing_direction(&origin, &GpsPoint::new(-1.0, -1.0)), CompassDirection::Southwest);
    }

    #[test]
    fn test_bearing_same_point_is_north() {
        let p = GpsPoint::new(14.6760, 121.0437);
        assert_eq!(bearing_direction(&p, &p), CompassDirection::North);
    }

    #[test]
    fn test_compass_sector_boundaries() {
        assert_eq!(CompassDirection::from_degrees(337.5), CompassDirection::North);
        assert_eq!(CompassDirection::from_degrees(337.4), CompassDirection::Northwest);
        assert_eq!(CompassDirection::from_degrees(22.4), CompassDirection::North);
        assert_eq!(CompassDirection::from_degrees(22.5), CompassDirection::Northeast);
        assert_eq!(CompassDirection::from_degrees(-90.0), CompassDirection::West);
        assert_eq!(CompassDirection::from_degrees(180.0), CompassDirection::South);
    }

    #[test]
    fn test_nearest_point_empty() {
        let from = GpsPoint::new(14.6760, 121.0437);
        let empty: Vec<GpsPoint> = vec![];
        assert!(nearest_point(&from, &empty).is_none());
    }

    #[test]
    fn test_nearest_point_first_wins_ties() {
        let from = GpsPoint::new(0.0, 0.0);
        let candidates = vec![
            GpsPoint::new(0.0, 0.05),
            GpsPoint::new(0.01, 0.0),
            GpsPoint::new(-0.01, 0.0),
        ];
        let nearest = nearest_point(&from, &candidates).unwrap();
        assert!(std::ptr::eq(nearest.item, &candidates[1]));
        assert_eq!(nearest.direction, CompassDirection::North);
        assert!(approx_eq(nearest.distance_km, 1.11, 0.001));
    }

    #[test]
    fn test_cluster_by_proximity() {
        let points = vec![
            GpsPoint::new(14.6760, 121.0437),
            GpsPoint::new(14.6769, 121.0437), // ~0.1 km from the first
            GpsPoint::new(14.7660, 121.0437), // ~10 km away
        ];
        let clusters = cluster_by_proximity(&points, 0.5);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0], vec![&points[0], &points[1]]);
        assert_eq!(clusters[1], vec![&points[2]]);
    }

    #[test]
    fn test_cluster_is_seed_based() {
        // 0.4 km steps: b is within 0.5 of a, c is within 0.5 of b but not of a
        let a = GpsPoint::new(0.0, 0.0);
        let b = GpsPoint::new(0.0036, 0.0);
        let c = GpsPoint::new(0.0072, 0.0);
        let points = vec![a, b, c];
        let clusters = cluster_by_proximity(&points, 0.5);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0], vec![&a, &b]);
        assert_eq!(clusters[1], vec![&c]);
    }

    #[test]
    fn test_cluster_empty() {
        let empty: Vec<GpsPoint> = vec![];
        assert!(cluster_by_proximity(&empty, 0.5).is_empty());
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.0), "0 m");
        assert_eq!(format_distance(0.25), "250 m");
        assert_eq!(format_distance(1.0), "1.0 km");
        assert_eq!(format_distance(12.34), "12.3 km");
    }

    #[test]
    fn test_compute_center() {
        let points = vec![GpsPoint::new(14.60, 121.00), GpsPoint::new(14.62, 121.02)];
        let center = compute_center(&points).unwrap();
        assert!(approx_eq(center.latitude, 14.61, 0.0001));
        assert!(approx_eq(center.longitude, 121.01, 0.0001));
        assert!(compute_center::<GpsPoint>(&[]).is_none());
    }

    #[test]
    fn test_compute_bounds() {
        let points = vec![
            GpsPoint::new(14.60, 121.03),
            GpsPoint::new(14.62, 121.01),
        ];
        let bounds = compute_bounds(&points).unwrap();
        assert_eq!(bounds.min_lat, 14.60);
        assert_eq!(bounds.max_lat, 14.62);
        assert_eq!(bounds.min_lng, 121.01);
        assert_eq!(bounds.max_lng, 121.03);
    }

    #[test]
    fn test_meters_to_degrees() {
        let deg = meters_to_degrees(111_320.0, 0.0);
        assert!(approx_eq(deg, 1.0, 0.01));
        assert!(meters_to_degrees(111_320.0, 45.0) > 1.0);
    }
}
