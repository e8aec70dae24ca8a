//! Service-area boundary.
//!
//! The app only shows incidents inside the area it covers. A [`ServiceArea`]
//! wraps that outline as a `geo` polygon and answers containment queries, and
//! [`MapRegion`] frames it for the initial map camera.

use geo::{Contains, Coord, LineString, Point, Polygon};
use log::debug;
use thiserror::Error;

use crate::{Bounds, GpsPoint, IncidentReport};

/// Span padding applied when framing the area.
const REGION_PADDING: f64 = 1.02;

/// Smallest latitude/longitude delta a framed region will use.
const MIN_REGION_DELTA: f64 = 0.01;

/// Errors building a [`ServiceArea`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BoundaryError {
    #[error("service area needs at least 3 distinct vertices, got {0}")]
    TooFewVertices(usize),

    #[error("vertex {index} is not a valid coordinate ({latitude}, {longitude})")]
    InvalidVertex {
        index: usize,
        latitude: f64,
        longitude: f64,
    },
}

/// Camera framing for a map view.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct MapRegion {
    pub latitude: f64,
    pub longitude: f64,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

/// The polygon the app covers.
#[derive(Debug, Clone)]
pub struct ServiceArea {
    polygon: Polygon<f64>,
    bounds: Bounds,
}

impl ServiceArea {
    /// Build from an outline of GPS points. The ring may be open or closed.
    ///
    /// # Errors
    ///
    /// [`BoundaryError::TooFewVertices`] for fewer than 3 distinct vertices and
    /// [`BoundaryError::InvalidVertex`] for an out-of-range coordinate.
    ///
    /// # Example
    ///
    /// ```rust
    /// use crime_safety::{GpsPoint, ServiceArea};
    ///
    /// let area = ServiceArea::from_ring(&[
    ///     GpsPoint::new(14.60, 121.00),
    ///     GpsPoint::new(14.60, 121.10),
    ///     GpsPoint::new(14.70, 121.10),
    ///     GpsPoint::new(14.70, 121.00),
    /// ])
    /// .unwrap();
    ///
    /// assert!(area.contains(&GpsPoint::new(14.65, 121.05)));
    /// assert!(!area.contains(&GpsPoint::new(14.80, 121.05)));
    /// ```
    pub fn from_ring(points: &[GpsPoint]) -> Result<Self, BoundaryError> {
        if let Some((index, p)) = points.iter().enumerate().find(|(_, p)| !p.is_valid()) {
            return Err(BoundaryError::InvalidVertex {
                index,
                latitude: p.latitude,
                longitude: p.longitude,
            });
        }

        let open_ring = match (points.first(), points.last()) {
            (Some(first), Some(last)) if points.len() > 1 && first == last => {
                &points[..points.len() - 1]
            }
            _ => points,
        };
        if open_ring.len() < 3 {
            return Err(BoundaryError::TooFewVertices(open_ring.len()));
        }

        let bounds = Bounds::from_points(open_ring)
            .ok_or(BoundaryError::TooFewVertices(open_ring.len()))?;

        // geo works in (x, y) = (lng, lat)
        let exterior: LineString<f64> = open_ring
            .iter()
            .map(|p| Coord {
                x: p.longitude,
                y: p.latitude,
            })
            .collect();

        debug!("[Boundary] Service area with {} vertices", open_ring.len());

        Ok(Self {
            polygon: Polygon::new(exterior, vec![]),
            bounds,
        })
    }

    /// Build from a GeoJSON-style ring of `[lng, lat]` pairs.
    pub fn from_geojson_ring(ring: &[[f64; 2]]) -> Result<Self, BoundaryError> {
        let points: Vec<GpsPoint> = ring.iter().map(|&[lng, lat]| GpsPoint::new(lat, lng)).collect();
        Self::from_ring(&points)
    }

    /// Whether `point` lies strictly inside the area.
    pub fn contains(&self, point: &GpsPoint) -> bool {
        self.bounds.contains(point)
            && self
                .polygon
                .contains(&Point::new(point.longitude, point.latitude))
    }

    /// Incidents inside the area, in input order.
    pub fn filter_incidents(&self, incidents: &[IncidentReport]) -> Vec<IncidentReport> {
        let kept: Vec<IncidentReport> = incidents
            .iter()
            .filter(|i| self.contains(&GpsPoint::new(i.latitude, i.longitude)))
            .copied()
            .collect();

        debug!(
            "[Boundary] {} of {} incidents inside service area",
            kept.len(),
            incidents.len()
        );

        kept
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Region centered on the area with its span padded by 2%.
    pub fn map_region(&self) -> MapRegion {
        let center = self.bounds.center();
        MapRegion {
            latitude: center.latitude,
            longitude: center.longitude,
            latitude_delta: ((self.bounds.max_lat - self.bounds.min_lat) * REGION_PADDING)
                .max(MIN_REGION_DELTA),
            longitude_delta: ((self.bounds.max_lng - self.bounds.min_lng) * REGION_PADDING)
                .max(MIN_REGION_DELTA),
        }
    }
}
