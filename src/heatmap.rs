//! Heatmap generation for the crime map.
//!
//! Two views of the same incidents:
//! - [`aggregate_heat_points`]: one weighted point per distinct location, for
//!   client-side heat layers
//! - [`generate_heatmap`]: a sparse grid of cells, each scored with
//!   [`intensity_at`](crate::density::intensity_at), for tile rendering and
//!   tap-to-inspect
//!
//! Both are pure data. Colors and blur are up to the renderer.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::collections::HashMap;

use crate::density::intensity_at;
use crate::time_window::days_between;
use crate::{GpsPoint, IncidentReport};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Coordinates agreeing to this many decimal places share a heat point.
const HEAT_POINT_SCALE: f64 = 10_000.0;

/// Configuration for heatmap generation
#[derive(Debug, Clone)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct HeatmapConfig {
    /// Grid cell size in meters (default: 250m)
    pub cell_size_meters: f64,
    /// Radius used to score each cell's intensity (default: 1.0 km)
    pub intensity_radius_km: f64,
    /// Optional bounds to limit computation
    pub bounds: Option<HeatmapBounds>,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            cell_size_meters: 250.0,
            intensity_radius_km: 1.0,
            bounds: None,
        }
    }
}

/// Bounding box for heatmap computation
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct HeatmapBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl HeatmapBounds {
    fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lng >= self.min_lng && lng <= self.max_lng
    }
}

/// A weighted location for a client-side heat layer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct HeatPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Incidents reported at this location
    pub count: u32,
    /// `min(count, 10) / 10`
    pub intensity: f64,
}

/// A single cell in the heatmap grid
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct HeatmapCell {
    /// Grid row index
    pub row: i32,
    /// Grid column index
    pub col: i32,
    /// Cell center for rendering
    pub center_lat: f64,
    pub center_lng: f64,
    /// Incidents located in this cell
    pub incident_count: u32,
    /// Of those, incidents in the last 7 days
    pub recent_count: u32,
    /// Heat intensity (0.0-1.0) at the cell center
    pub intensity: f64,
    /// Earliest incident (Unix milliseconds)
    pub first_incident_ms: i64,
    /// Most recent incident (Unix milliseconds)
    pub last_incident_ms: i64,
}

/// Complete heatmap result
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct HeatmapResult {
    /// Non-empty cells only (sparse representation), ordered by row then column
    pub cells: Vec<HeatmapCell>,
    /// Computed bounds (from data or config)
    pub bounds: HeatmapBounds,
    /// Cell size used
    pub cell_size_meters: f64,
    /// Latitude the grid is anchored at
    pub ref_lat: f64,
    /// Grid dimensions
    pub grid_rows: u32,
    pub grid_cols: u32,
    /// Highest cell intensity
    pub max_intensity: f64,
    /// Incidents that landed in a cell
    pub total_incidents: u32,
}

/// Query result when user taps a location
#[derive(Debug, Clone)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct CellQueryResult {
    /// The cell at the queried location
    pub cell: HeatmapCell,
    /// Suggested label based on counts
    pub suggested_label: String,
}

// =============================================================================
// Heat Points
// =============================================================================

/// Collapse incidents reported at the same spot into weighted heat points.
///
/// Incidents whose coordinates agree to 4 decimal places (~11 m) share a
/// point, positioned at the first such incident. Points come out in
/// first-seen order.
pub fn aggregate_heat_points(incidents: &[IncidentReport]) -> Vec<HeatPoint> {
    let mut index: HashMap<(i64, i64), usize> = HashMap::new();
    let mut points: Vec<HeatPoint> = Vec::new();

    for incident in incidents {
        let key = (
            (incident.latitude * HEAT_POINT_SCALE).round() as i64,
            (incident.longitude * HEAT_POINT_SCALE).round() as i64,
        );
        let slot = *index.entry(key).or_insert_with(|| {
            points.push(HeatPoint {
                latitude: incident.latitude,
                longitude: incident.longitude,
                count: 0,
                intensity: 0.0,
            });
            points.len() - 1
        });
        points[slot].count += 1;
    }

    for point in &mut points {
        point.intensity = f64::from(point.count.min(10)) / 10.0;
    }

    debug!(
        "[Heatmap] {} incidents collapsed into {} heat points",
        incidents.len(),
        points.len()
    );

    points
}

// =============================================================================
// Grid
// =============================================================================

// Internal cell data during construction
#[derive(Debug, Default)]
struct CellBuilder {
    incident_count: u32,
    recent_count: u32,
    first_incident: Option<DateTime<Utc>>,
    last_incident: Option<DateTime<Utc>>,
}

/// Grid coordinate
type CellCoord = (i32, i32);

fn lng_meters_per_degree(ref_lat: f64) -> f64 {
    METERS_PER_DEGREE_LAT * ref_lat.to_radians().cos()
}

/// Convert lat/lng to grid coordinates
fn to_grid_coords(ref_lat: f64, cell_size_meters: f64, lat: f64, lng: f64) -> CellCoord {
    let row = ((lat - ref_lat) * METERS_PER_DEGREE_LAT / cell_size_meters).floor() as i32;
    let col = (lng * lng_meters_per_degree(ref_lat) / cell_size_meters).floor() as i32;
    (row, col)
}

/// Heatmap grid builder
struct HeatmapGrid {
    cell_size_meters: f64,
    ref_lat: f64,
    cells: HashMap<CellCoord, CellBuilder>,
}

impl HeatmapGrid {
    fn new(cell_size_meters: f64, ref_lat: f64) -> Self {
        Self {
            cell_size_meters,
            ref_lat,
            cells: HashMap::new(),
        }
    }

    /// Get cell center coordinates
    fn cell_center(&self, row: i32, col: i32) -> GpsPoint {
        let center_lat =
            self.ref_lat + (f64::from(row) + 0.5) * self.cell_size_meters / METERS_PER_DEGREE_LAT;
        let center_lng =
            (f64::from(col) + 0.5) * self.cell_size_meters / lng_meters_per_degree(self.ref_lat);
        GpsPoint::new(center_lat, center_lng)
    }

    fn add_incident(&mut self, incident: &IncidentReport, now: DateTime<Utc>) {
        let coord = to_grid_coords(
            self.ref_lat,
            self.cell_size_meters,
            incident.latitude,
            incident.longitude,
        );
        let cell = self.cells.entry(coord).or_default();

        cell.incident_count += 1;
        if days_between(incident.occurred_at, now) < 7 {
            cell.recent_count += 1;
        }

        let at = incident.occurred_at;
        cell.first_incident = Some(cell.first_incident.map_or(at, |v| v.min(at)));
        cell.last_incident = Some(cell.last_incident.map_or(at, |v| v.max(at)));
    }

    /// Occupied cells in (row, col) order with their centers; intensity left at 0.
    fn unscored_cells(&self) -> Vec<HeatmapCell> {
        let mut cells: Vec<HeatmapCell> = self
            .cells
            .iter()
            .map(|(&(row, col), builder)| {
                let center = self.cell_center(row, col);
                HeatmapCell {
                    row,
                    col,
                    center_lat: center.latitude,
                    center_lng: center.longitude,
                    incident_count: builder.incident_count,
                    recent_count: builder.recent_count,
                    intensity: 0.0,
                    first_incident_ms: builder.first_incident.map_or(0, |t| t.timestamp_millis()),
                    last_incident_ms: builder.last_incident.map_or(0, |t| t.timestamp_millis()),
                }
            })
            .collect();
        cells.sort_by_key(|c| (c.row, c.col));
        cells
    }

    /// Build the final heatmap result from scored cells
    fn build(&self, cells: Vec<HeatmapCell>, bounds: HeatmapBounds) -> HeatmapResult {
        let rows = cells.iter().map(|c| c.row);
        let cols = cells.iter().map(|c| c.col);
        let min_row = rows.clone().min().unwrap_or(0);
        let max_row = rows.max().unwrap_or(0);
        let min_col = cols.clone().min().unwrap_or(0);
        let max_col = cols.max().unwrap_or(0);

        HeatmapResult {
            max_intensity: cells.iter().map(|c| c.intensity).fold(0.0, f64::max),
            total_incidents: cells.iter().map(|c| c.incident_count).sum(),
            bounds,
            cell_size_meters: self.cell_size_meters,
            ref_lat: self.ref_lat,
            grid_rows: grid_span(min_row, max_row),
            grid_cols: grid_span(min_col, max_col),
            cells,
        }
    }
}

/// Cells from `min` to `max` inclusive, saturating at `u32::MAX`.
fn grid_span(min: i32, max: i32) -> u32 {
    u32::try_from(i64::from(max) - i64::from(min) + 1).unwrap_or(u32::MAX)
}

fn empty_result(cell_size_meters: f64) -> HeatmapResult {
    HeatmapResult {
        cells: vec![],
        bounds: HeatmapBounds {
            min_lat: 0.0,
            max_lat: 0.0,
            min_lng: 0.0,
            max_lng: 0.0,
        },
        cell_size_meters,
        ref_lat: 0.0,
        grid_rows: 0,
        grid_cols: 0,
        max_intensity: 0.0,
        total_incidents: 0,
    }
}

/// Grid populated with the incidents inside the bounds, or `None` if there are none.
fn populate_grid(
    incidents: &[IncidentReport],
    now: DateTime<Utc>,
    config: &HeatmapConfig,
) -> Option<(HeatmapGrid, HeatmapBounds)> {
    if !(config.cell_size_meters.is_finite() && config.cell_size_meters > 0.0) {
        warn!(
            "[Heatmap] Invalid cell size {}m, returning empty heatmap",
            config.cell_size_meters
        );
        return None;
    }

    let inside: Vec<&IncidentReport> = incidents
        .iter()
        .filter(|i| {
            config
                .bounds
                .map_or(true, |b| b.contains(i.latitude, i.longitude))
        })
        .collect();

    if inside.is_empty() {
        return None;
    }

    let bounds = config.bounds.unwrap_or_else(|| HeatmapBounds {
        min_lat: inside.iter().map(|i| i.latitude).fold(f64::INFINITY, f64::min),
        max_lat: inside.iter().map(|i| i.latitude).fold(f64::NEG_INFINITY, f64::max),
        min_lng: inside.iter().map(|i| i.longitude).fold(f64::INFINITY, f64::min),
        max_lng: inside.iter().map(|i| i.longitude).fold(f64::NEG_INFINITY, f64::max),
    });
    let ref_lat = (bounds.min_lat + bounds.max_lat) / 2.0;

    let mut grid = HeatmapGrid::new(config.cell_size_meters, ref_lat);
    for incident in inside {
        grid.add_incident(incident, now);
    }

    debug!(
        "[Heatmap] {} incidents in {} cells ({}m)",
        incidents.len(),
        grid.cells.len(),
        config.cell_size_meters
    );

    Some((grid, bounds))
}

/// Generate a sparse heatmap grid from incidents.
///
/// Only incidents inside `config.bounds` (when set) populate cells, but every
/// incident contributes to cell intensity, so cells near the edge of the
/// bounds are not under-scored.
pub fn generate_heatmap(
    incidents: &[IncidentReport],
    now: DateTime<Utc>,
    config: &HeatmapConfig,
) -> HeatmapResult {
    let Some((grid, bounds)) = populate_grid(incidents, now, config) else {
        return empty_result(config.cell_size_meters);
    };

    let mut cells = grid.unscored_cells();
    for cell in &mut cells {
        cell.intensity = intensity_at(
            cell.center_lat,
            cell.center_lng,
            incidents,
            config.intensity_radius_km,
            now,
        );
    }

    grid.build(cells, bounds)
}

/// Parallel version of [`generate_heatmap`]; cell scoring runs on rayon.
#[cfg(feature = "parallel")]
pub fn generate_heatmap_parallel(
    incidents: &[IncidentReport],
    now: DateTime<Utc>,
    config: &HeatmapConfig,
) -> HeatmapResult {
    let Some((grid, bounds)) = populate_grid(incidents, now, config) else {
        return empty_result(config.cell_size_meters);
    };

    let mut cells = grid.unscored_cells();
    cells.par_iter_mut().for_each(|cell| {
        cell.intensity = intensity_at(
            cell.center_lat,
            cell.center_lng,
            incidents,
            config.intensity_radius_km,
            now,
        );
    });

    grid.build(cells, bounds)
}

/// Query the heatmap at a specific location
pub fn query_heatmap_cell(heatmap: &HeatmapResult, lat: f64, lng: f64) -> Option<CellQueryResult> {
    if heatmap.cells.is_empty() {
        return None;
    }

    let (target_row, target_col) =
        to_grid_coords(heatmap.ref_lat, heatmap.cell_size_meters, lat, lng);

    let cell = heatmap
        .cells
        .iter()
        .find(|c| c.row == target_row && c.col == target_col)?;

    let suggested_label = match (cell.incident_count, cell.recent_count) {
        (1, _) => "1 incident".to_string(),
        (n, 0) => format!("{n} incidents"),
        (n, k) => format!("{n} incidents ({k} this week)"),
    };

    Some(CellQueryResult {
        cell: cell.clone(),
        suggested_label,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn incident(lat: f64, lng: f64, days: i64) -> IncidentReport {
        IncidentReport::new(lat, lng, now() - TimeDelta::days(days))
    }

    #[test]
    fn test_empty_heatmap() {
        let result = generate_heatmap(&[], now(), &HeatmapConfig::default());
        assert!(result.cells.is_empty());
        assert_eq!(result.total_incidents, 0);
        assert!(query_heatmap_cell(&result, 14.6760, 121.0437).is_none());
    }

    #[test]
    fn test_heat_points_group_duplicates() {
        let incidents = vec![
            incident(14.67601, 121.04371, 1),
            incident(14.6800, 121.0500, 1),
            incident(14.67604, 121.04368, 1),
        ];
        let points = aggregate_heat_points(&incidents);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].count, 2);
        assert_eq!(points[0].latitude, 14.67601);
        assert!((points[0].intensity - 0.2).abs() < 1e-9);
        assert_eq!(points[1].count, 1);
    }

    #[test]
    fn test_heat_point_intensity_caps() {
        let incidents: Vec<IncidentReport> =
            (0..14).map(|_| incident(14.6760, 121.0437, 1)).collect();
        let points = aggregate_heat_points(&incidents);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].count, 14);
        assert_eq!(points[0].intensity, 1.0);
    }

    #[test]
    fn test_grid_counts_and_intensity() {
        let incidents = vec![
            incident(14.6760, 121.0437, 2),
            incident(14.6761, 121.0438, 40),
            incident(14.7200, 121.0900, 100),
        ];
        let result = generate_heatmap(&incidents, now(), &HeatmapConfig::default());

        assert_eq!(result.total_incidents, 3);
        assert_eq!(result.cells.len(), 2);
        assert!(result.max_intensity > 0.0);

        let busy = result.cells.iter().find(|c| c.incident_count == 2).unwrap();
        assert_eq!(busy.recent_count, 1);
        assert_eq!(busy.first_incident_ms, incidents[1].occurred_at.timestamp_millis());
        assert_eq!(busy.last_incident_ms, incidents[0].occurred_at.timestamp_millis());
        // 1.0 + 0.4 from the two nearby incidents
        assert!((busy.intensity - 0.14).abs() < 1e-9);
    }

    #[test]
    fn test_cells_are_ordered() {
        let incidents: Vec<IncidentReport> = (0..10)
            .map(|i| incident(14.60 + (i % 3) as f64 * 0.01, 121.00 + (i % 4) as f64 * 0.01, 1))
            .collect();
        let result = generate_heatmap(&incidents, now(), &HeatmapConfig::default());
        let keys: Vec<(i32, i32)> = result.cells.iter().map(|c| (c.row, c.col)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_bounds_limit_cells() {
        let incidents = vec![incident(14.6760, 121.0437, 1), incident(15.5000, 121.0437, 1)];
        let config = HeatmapConfig {
            bounds: Some(HeatmapBounds {
                min_lat: 14.5,
                max_lat: 14.8,
                min_lng: 120.9,
                max_lng: 121.2,
            }),
            ..HeatmapConfig::default()
        };
        let result = generate_heatmap(&incidents, now(), &config);
        assert_eq!(result.total_incidents, 1);
        assert_eq!(result.bounds.min_lat, 14.5);
    }

    #[test]
    fn test_invalid_cell_size_is_empty() {
        let incidents = vec![incident(14.6760, 121.0437, 1), incident(14.7200, 121.0900, 1)];
        for cell_size_meters in [0.0, -250.0, f64::NAN, f64::INFINITY] {
            let config = HeatmapConfig {
                cell_size_meters,
                ..HeatmapConfig::default()
            };
            let result = generate_heatmap(&incidents, now(), &config);
            assert!(result.cells.is_empty());
            assert_eq!(result.total_incidents, 0);
            assert_eq!(result.grid_rows, 0);
        }
    }

    #[test]
    fn test_tiny_cell_size_saturates() {
        let incidents = vec![incident(-14.6760, -121.0437, 1), incident(14.7200, 121.0900, 1)];
        let config = HeatmapConfig {
            cell_size_meters: 1e-9,
            ..HeatmapConfig::default()
        };
        let result = generate_heatmap(&incidents, now(), &config);
        assert_eq!(result.total_incidents, 2);
        assert_eq!(result.grid_rows, u32::MAX);
        assert_eq!(result.grid_cols, u32::MAX);
    }

    #[test]
    fn test_query_cell_labels() {
        let incidents = vec![
            incident(14.6760, 121.0437, 2),
            incident(14.6761, 121.0438, 40),
            incident(14.7200, 121.0900, 100),
        ];
        let result = generate_heatmap(&incidents, now(), &HeatmapConfig::default());

        let busy = query_heatmap_cell(&result, 14.6760, 121.0437).unwrap();
        assert_eq!(busy.suggested_label, "2 incidents (1 this week)");

        let lonely = query_heatmap_cell(&result, 14.7200, 121.0900).unwrap();
        assert_eq!(lonely.suggested_label, "1 incident");

        assert!(query_heatmap_cell(&result, 10.0, 100.0).is_none());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_heatmap_matches_sequential() {
        let incidents: Vec<IncidentReport> = (0..30)
            .map(|i| incident(14.60 + (i % 5) as f64 * 0.004, 121.00 + (i % 7) as f64 * 0.004, i))
            .collect();
        let config = HeatmapConfig::default();
        assert_eq!(
            generate_heatmap_parallel(&incidents, now(), &config),
            generate_heatmap(&incidents, now(), &config)
        );
    }
}
