//! Marker styling and popup content for visible events.
//!
//! Pure functions of a single record; the rendering layer decides how to draw.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::EventRecord;

/// Smallest marker radius in pixels.
pub const MIN_MARKER_RADIUS: f64 = 6.0;

/// Marker fill opacity.
pub const MARKER_OPACITY: f64 = 0.7;

/// Per-event detail page prefix; the event id is appended.
const EVENT_PAGE_URL: &str = "https://earthquake.usgs.gov/earthquakes/eventpage/";

/// Marker radius in pixels: three pixels per magnitude unit, never below six.
#[must_use]
pub fn marker_radius(magnitude: f64) -> f64 {
    MIN_MARKER_RADIUS.max(magnitude * 3.0)
}

/// Depth bucket color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerColor {
    Green,
    Yellow,
    Orange,
    Red,
}

impl MarkerColor {
    /// CSS hex value.
    #[must_use]
    pub const fn hex(self) -> &'static str {
        match self {
            Self::Green => "#00ff00",
            Self::Yellow => "#ffff00",
            Self::Orange => "#ff9900",
            Self::Red => "#ff0000",
        }
    }
}

/// Color for a depth in km: `[..10)` green, `[10, 50)` yellow,
/// `[50, 100)` orange, everything deeper red.
#[must_use]
pub fn marker_color(depth_km: f64) -> MarkerColor {
    match depth_km {
        d if d < 10.0 => MarkerColor::Green,
        d if d < 50.0 => MarkerColor::Yellow,
        d if d < 100.0 => MarkerColor::Orange,
        _ => MarkerColor::Red,
    }
}

/// How a record is drawn. `color` is used for both fill and stroke.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkerStyle {
    pub radius: f64,
    #[serde(serialize_with = "serialize_hex")]
    pub color: MarkerColor,
    pub opacity: f64,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_hex<S: serde::Serializer>(color: &MarkerColor, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(color.hex())
}

impl MarkerStyle {
    #[must_use]
    pub fn for_record(record: &EventRecord) -> Self {
        Self {
            radius: marker_radius(record.magnitude()),
            color: marker_color(record.position().depth_km),
            opacity: MARKER_OPACITY,
        }
    }
}

/// Text revealed when a marker is clicked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popup {
    pub title: String,
    pub depth: String,
    pub time: String,
    pub url: String,
}

impl Popup {
    #[must_use]
    pub fn for_record(record: &EventRecord) -> Self {
        Self {
            title: format!(
                "M {} - {}",
                record.magnitude(),
                record.place().unwrap_or("Unknown location")
            ),
            depth: format!("Depth: {} km", record.position().depth_km),
            time: format!("Time: {}", format_utc(record.time())),
            url: detail_url(record.id()),
        }
    }
}

/// Everything the map needs to draw one visible record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerView {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub style: MarkerStyle,
    pub popup: Popup,
}

impl From<&EventRecord> for MarkerView {
    fn from(record: &EventRecord) -> Self {
        let position = record.position();
        Self {
            id: record.id().to_string(),
            lat: position.latitude,
            lng: position.longitude,
            style: MarkerStyle::for_record(record),
            popup: Popup::for_record(record),
        }
    }
}

/// Link to the event's detail page.
#[must_use]
pub fn detail_url(id: &str) -> String {
    format!("{EVENT_PAGE_URL}{id}")
}

/// HTTP-date style UTC timestamp, e.g. `Tue, 14 Nov 2023 22:13:20 GMT`.
#[must_use]
pub fn format_utc(time: Option<DateTime<Utc>>) -> String {
    time.map_or_else(
        || "Invalid Date".to_string(),
        |t| t.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::record;

    #[test]
    fn test_radius_has_floor() {
        for m in [-2.0, -0.1, 0.0, 1.0, 1.999] {
            assert_eq!(marker_radius(m), 6.0, "magnitude {m}");
        }
    }

    #[test]
    fn test_radius_scales_above_floor() {
        assert_eq!(marker_radius(2.0), 6.0);
        assert_eq!(marker_radius(5.5), 16.5);
        assert_eq!(marker_radius(9.0), 27.0);
    }

    #[test]
    fn test_color_boundaries() {
        assert_eq!(marker_color(9.999), MarkerColor::Green);
        assert_eq!(marker_color(10.0), MarkerColor::Yellow);
        assert_eq!(marker_color(49.999), MarkerColor::Yellow);
        assert_eq!(marker_color(50.0), MarkerColor::Orange);
        assert_eq!(marker_color(99.999), MarkerColor::Orange);
        assert_eq!(marker_color(100.0), MarkerColor::Red);
    }

    #[test]
    fn test_color_extremes() {
        assert_eq!(marker_color(-3.0), MarkerColor::Green);
        assert_eq!(marker_color(650.0), MarkerColor::Red);
    }

    #[test]
    fn test_marker_view_content() {
        let view = MarkerView::from(&record("us7000abcd", 5.5, 142.3, 38.1, 60.0));

        assert_eq!(view.lat, 38.1);
        assert_eq!(view.lng, 142.3);
        assert_eq!(view.style.radius, 16.5);
        assert_eq!(view.style.color, MarkerColor::Orange);
        assert_eq!(view.popup.title, "M 5.5 - near us7000abcd");
        assert_eq!(view.popup.depth, "Depth: 60 km");
        assert_eq!(view.popup.time, "Time: Tue, 14 Nov 2023 22:13:20 GMT");
        assert_eq!(
            view.popup.url,
            "https://earthquake.usgs.gov/earthquakes/eventpage/us7000abcd"
        );
    }

    #[test]
    fn test_style_serializes_hex() {
        let style = MarkerStyle::for_record(&record("a", 2.0, 0.0, 0.0, 5.0));
        let json = serde_json::to_value(style).unwrap();

        assert_eq!(json["color"], "#00ff00");
        assert_eq!(json["opacity"], 0.7);
    }
}
