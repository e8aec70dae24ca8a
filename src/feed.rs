//! Normalizing raw incident payloads into [`IncidentReport`]s.
//!
//! Incident APIs disagree on shape and field names. This module accepts the
//! three shapes seen in practice:
//!
//! | Shape | Example |
//! |---|---|
//! | Bare array | `[{"lat": 14.6, "lng": 121.0, "date": "2024-03-10"}]` |
//! | Wrapped | `{"data": [...]}` |
//! | GeoJSON | `{"type": "FeatureCollection", "features": [...]}` |
//!
//! Bad records are counted and skipped; only an unreadable payload is an error.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::time_window::parse_timestamp;
use crate::{GpsPoint, IncidentReport};

/// Errors reading an incident payload.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("malformed incident payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unrecognized incident payload shape (expected array, {{\"data\": [...]}} or FeatureCollection)")]
    UnrecognizedShape,
}

/// Incidents recovered from one payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedBatch {
    /// Valid incidents in payload order
    pub incidents: Vec<IncidentReport>,
    /// Records dropped for bad coordinates or dates
    pub skipped: usize,
}

// ===== Wire shapes =====

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload {
    Records(Vec<Value>),
    FeatureCollection {
        #[serde(rename = "type")]
        kind: String,
        features: Vec<Value>,
    },
    Wrapped {
        data: Vec<Value>,
    },
}

/// Number that may arrive as a JSON number or a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Numeric::Number(n) => Some(*n),
            Numeric::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// A date as an ISO-8601 string or Unix milliseconds.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDate {
    Millis(i64),
    Text(String),
}

impl RawDate {
    fn parse(&self) -> Option<DateTime<Utc>> {
        match self {
            RawDate::Millis(ms) => DateTime::<Utc>::from_timestamp_millis(*ms),
            RawDate::Text(s) => parse_timestamp(s),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    geometry: Option<RawGeometry>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    coordinates: Vec<f64>,
}

// ===== Normalization =====

fn valid_position(lat: f64, lng: f64) -> bool {
    GpsPoint::new(lat, lng).is_valid()
}

// Field names in priority order; the first non-null one wins
const LAT_KEYS: [&str; 3] = ["lat", "latitude", "y"];
const LNG_KEYS: [&str; 4] = ["lng", "lon", "longitude", "x"];
const DATE_KEYS: [&str; 4] = ["date", "occurred_at", "datetime", "timestamp"];

fn first_present<'a>(record: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| record.get(*key).filter(|v| !v.is_null()))
}

fn coordinate(record: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    Numeric::deserialize(first_present(record, keys)?)
        .ok()?
        .as_f64()
}

fn date(value: &Value) -> Option<DateTime<Utc>> {
    RawDate::deserialize(value).ok()?.parse()
}

fn record_to_incident(value: Value) -> Option<IncidentReport> {
    let Value::Object(record) = value else {
        return None;
    };
    let lat = coordinate(&record, &LAT_KEYS)?;
    let lng = coordinate(&record, &LNG_KEYS)?;
    if !valid_position(lat, lng) {
        return None;
    }
    let occurred_at = date(first_present(&record, &DATE_KEYS)?)?;
    Some(IncidentReport::new(lat, lng, occurred_at))
}

fn feature_to_incident(value: Value, fallback_date: DateTime<Utc>) -> Option<IncidentReport> {
    let raw: RawFeature = serde_json::from_value(value).ok()?;
    let coords = raw.geometry?.coordinates;
    // GeoJSON order is [lng, lat]
    let (&lng, &lat) = (coords.first()?, coords.get(1)?);
    if !valid_position(lat, lng) {
        return None;
    }
    let occurred_at = match raw
        .properties
        .as_ref()
        .and_then(|p| first_present(p, &DATE_KEYS))
    {
        Some(value) => date(value)?,
        None => fallback_date,
    };
    Some(IncidentReport::new(lat, lng, occurred_at))
}

fn collect<F>(values: Vec<Value>, convert: F) -> FeedBatch
where
    F: Fn(Value) -> Option<IncidentReport>,
{
    let total = values.len();
    let incidents: Vec<IncidentReport> = values.into_iter().filter_map(convert).collect();
    let skipped = total - incidents.len();

    if skipped > 0 {
        warn!("[Feed] Skipped {} of {} incident records", skipped, total);
    }
    debug!("[Feed] Parsed {} incidents", incidents.len());

    FeedBatch { incidents, skipped }
}

/// Parse an incident payload.
///
/// `fallback_date` dates GeoJSON features that carry no date of their own.
/// Flat records must have a date and are skipped without one.
///
/// # Errors
///
/// [`FeedError::Json`] if `json` is not valid JSON, [`FeedError::UnrecognizedShape`]
/// if it is none of the accepted shapes.
///
/// # Example
///
/// ```rust
/// use chrono::Utc;
/// use crime_safety::parse_incident_feed;
///
/// let json = r#"{"data": [
///     {"latitude": "14.6760", "longitude": 121.0437, "occurred_at": "2024-03-10T08:15:00Z"},
///     {"latitude": 14.6760, "longitude": 121.0437, "occurred_at": "last tuesday"}
/// ]}"#;
///
/// let batch = parse_incident_feed(json, Utc::now()).unwrap();
/// assert_eq!(batch.incidents.len(), 1);
/// assert_eq!(batch.skipped, 1);
/// ```
pub fn parse_incident_feed(json: &str, fallback_date: DateTime<Utc>) -> Result<FeedBatch, FeedError> {
    let value: Value = serde_json::from_str(json)?;
    let payload: Payload =
        serde_json::from_value(value).map_err(|_| FeedError::UnrecognizedShape)?;

    match payload {
        Payload::Records(records) | Payload::Wrapped { data: records } => {
            Ok(collect(records, record_to_incident))
        }
        Payload::FeatureCollection { kind, features } if kind == "FeatureCollection" => {
            Ok(collect(features, |f| feature_to_incident(f, fallback_date)))
        }
        Payload::FeatureCollection { kind, .. } => {
            warn!("[Feed] Unexpected GeoJSON type '{}'", kind);
            Err(FeedError::UnrecognizedShape)
        }
    }
}
