//! Data models for the USGS summary feed.
//!
//! The wire structures mirror the GeoJSON payload; [`EventRecord`] is the
//! normalized, immutable form the rest of the crate works with.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::errors::QuakeMapError;

/// Top-level GeoJSON response from USGS feeds.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureCollection {
    /// Always "FeatureCollection"
    #[serde(rename = "type")]
    pub type_: String,

    /// Earthquake events
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Validate the response structure.
    pub fn validate(&self) -> Result<(), QuakeMapError> {
        if self.type_ != "FeatureCollection" {
            return Err(QuakeMapError::InvalidResponse(format!(
                "expected type 'FeatureCollection', got '{}'",
                self.type_
            )));
        }
        Ok(())
    }

    /// Convert every feature into an [`EventRecord`], keeping feed order.
    ///
    /// A single malformed feature rejects the whole payload.
    pub fn into_records(self) -> Result<Vec<EventRecord>, QuakeMapError> {
        self.validate()?;
        self.features.into_iter().map(EventRecord::try_from).collect()
    }
}

/// A single earthquake event as delivered by the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    /// Unique event ID
    pub id: String,

    /// Geographic location
    pub geometry: Geometry,

    /// Event properties
    pub properties: Properties,
}

/// Point geometry: `[longitude, latitude, depth_km]`.
#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    pub coordinates: Vec<f64>,
}

/// The subset of event properties the map uses.
#[derive(Debug, Clone, Deserialize)]
pub struct Properties {
    /// Magnitude value (null for some automatic solutions)
    pub mag: Option<f64>,

    /// Human-readable place description
    pub place: Option<String>,

    /// Event time (ms since epoch)
    pub time: i64,
}

/// Geographic position of an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub longitude: f64,
    pub latitude: f64,
    /// Kilometers below sea level; negative above it.
    pub depth_km: f64,
}

/// An ingested earthquake event. Never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    id: String,
    position: Position,
    magnitude: f64,
    place: Option<String>,
    occurred_at: i64,
}

impl EventRecord {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        position: Position,
        magnitude: f64,
        place: Option<String>,
        occurred_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            position,
            magnitude,
            place,
            occurred_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    #[must_use]
    pub fn place(&self) -> Option<&str> {
        self.place.as_deref()
    }

    /// Get the event time as a `DateTime<Utc>`.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.occurred_at).single()
    }
}

impl TryFrom<Feature> for EventRecord {
    type Error = QuakeMapError;

    fn try_from(feature: Feature) -> Result<Self, Self::Error> {
        if feature.id.is_empty() {
            return Err(QuakeMapError::Validation("empty event ID".into()));
        }
        let &[longitude, latitude, depth_km, ..] = feature.geometry.coordinates.as_slice() else {
            return Err(QuakeMapError::Validation(format!(
                "event {}: expected 3 coordinates, got {}",
                feature.id,
                feature.geometry.coordinates.len()
            )));
        };

        let position = Position {
            longitude,
            latitude,
            depth_km,
        };
        // A missing magnitude filters and sizes like zero.
        let magnitude = feature.properties.mag.unwrap_or(0.0);

        Ok(Self::new(
            feature.id,
            position,
            magnitude,
            feature.properties.place,
            feature.properties.time,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "metadata": {"generated": 1700000000000, "count": 3},
        "features": [
            {
                "type": "Feature",
                "id": "ak0231",
                "geometry": {"type": "Point", "coordinates": [-150.1, 61.2, 35.4]},
                "properties": {"mag": 2.1, "place": "10 km N of Anchorage, Alaska", "time": 1700000000000, "status": "reviewed"}
            },
            {
                "type": "Feature",
                "id": "us7000abcd",
                "geometry": {"type": "Point", "coordinates": [142.3, 38.1, 120.0]},
                "properties": {"mag": 5.6, "place": "off the east coast of Honshu, Japan", "time": 1700000100000}
            },
            {
                "type": "Feature",
                "id": "nc9001",
                "geometry": {"type": "Point", "coordinates": [-122.8, 38.8, -0.5]},
                "properties": {"mag": null, "place": null, "time": 1700000200000}
            }
        ]
    }"#;

    #[test]
    fn test_parse_sample_feed() {
        let feed: FeatureCollection =
            serde_json::from_str(SAMPLE).expect("failed to parse sample feed");
        let records = feed.into_records().expect("invalid feed");

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id(), "ak0231");
        assert_eq!(records[1].position().depth_km, 120.0);
        assert_eq!(records[1].position().longitude, 142.3);
        assert_eq!(records[1].position().latitude, 38.1);
    }

    #[test]
    fn test_feature_converts_to_full_record() {
        let feed: FeatureCollection = serde_json::from_str(SAMPLE).unwrap();
        let records = feed.into_records().unwrap();

        let expected = EventRecord::new(
            "ak0231",
            Position {
                longitude: -150.1,
                latitude: 61.2,
                depth_km: 35.4,
            },
            2.1,
            Some("10 km N of Anchorage, Alaska".to_string()),
            1_700_000_000_000,
        );
        assert_eq!(records[0], expected);
        assert_eq!(
            records[0].time().map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn test_null_magnitude_reads_as_zero() {
        let feed: FeatureCollection = serde_json::from_str(SAMPLE).unwrap();
        let records = feed.into_records().unwrap();

        assert_eq!(records[2].magnitude(), 0.0);
        assert_eq!(records[2].place(), None);
        assert!(records[2].position().depth_km < 0.0);
    }

    #[test]
    fn test_short_coordinates_rejected() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [{
                "id": "bad1",
                "geometry": {"coordinates": [10.0, 20.0]},
                "properties": {"mag": 1.0, "place": "x", "time": 0}
            }]
        }"#;
        let feed: FeatureCollection = serde_json::from_str(json).unwrap();

        assert!(matches!(
            feed.into_records(),
            Err(QuakeMapError::Validation(_))
        ));
    }

    #[test]
    fn test_wrong_collection_type_rejected() {
        let json = r#"{"type": "Feature", "features": []}"#;
        let feed: FeatureCollection = serde_json::from_str(json).unwrap();

        assert!(matches!(
            feed.into_records(),
            Err(QuakeMapError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_time_conversion() {
        let record = EventRecord::new(
            "x",
            Position {
                longitude: 0.0,
                latitude: 0.0,
                depth_km: 0.0,
            },
            1.0,
            None,
            0,
        );
        assert_eq!(record.time().map(|t| t.timestamp()), Some(0));
    }
}
