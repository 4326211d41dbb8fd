//! Spherical-Mercator model of the browser map's viewport.
//!
//! Projection and fit math follow Leaflet's `EPSG:3857` CRS with 256 px
//! tiles, so a fit computed here lands on the same center and zoom the
//! browser would pick itself.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::viewport::{LatLng, LatLngBounds, MapWidget, Padding};

const TILE_SIZE: f64 = 256.0;

/// Latitude limit of the square Mercator world.
const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 18.0;

/// Initial view: centered on (20, 0) at zoom 2.
pub const INITIAL_CENTER: LatLng = LatLng::new(20.0, 0.0);
pub const INITIAL_ZOOM: f64 = 2.0;

/// Viewport size assumed until the browser reports its own.
const DEFAULT_SIZE: ScreenSize = ScreenSize {
    width: 1280.0,
    height: 720.0,
};

/// Viewport size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: f64,
    pub height: f64,
}

/// Pixel coordinate in the projected world at some zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    x: f64,
    y: f64,
}

fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * zoom.exp2()
}

fn project(p: LatLng, zoom: f64) -> Point {
    let scale = world_size(zoom);
    let lat = p.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let sin = lat.sin();
    Point {
        x: scale * (p.lng + 180.0) / 360.0,
        y: scale * (0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * PI)),
    }
}

fn unproject(p: Point, zoom: f64) -> LatLng {
    let scale = world_size(zoom);
    let n = PI - 2.0 * PI * p.y / scale;
    LatLng::new(n.sinh().atan().to_degrees(), p.x / scale * 360.0 - 180.0)
}

/// Current center, zoom and pixel size of the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapView {
    center: LatLng,
    zoom: f64,
    size: ScreenSize,
}

impl Default for MapView {
    fn default() -> Self {
        Self::new(INITIAL_CENTER, INITIAL_ZOOM, DEFAULT_SIZE)
    }
}

impl MapView {
    #[must_use]
    pub fn new(center: LatLng, zoom: f64, size: ScreenSize) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            size,
        }
    }

    #[must_use]
    pub fn center(&self) -> LatLng {
        self.center
    }

    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Replace the mirrored view with what the browser reports.
    pub fn report(&mut self, center: LatLng, zoom: f64, size: ScreenSize) {
        *self = Self::new(center, zoom, size);
    }

    /// Largest zoom at which `region` fits inside the viewport minus padding.
    fn bounds_zoom(&self, region: &LatLngBounds, padding: Padding) -> f64 {
        let available_w = (self.size.width - 2.0 * padding.x).max(1.0);
        let available_h = (self.size.height - 2.0 * padding.y).max(1.0);

        let sw = project(region.south_west(), self.zoom);
        let ne = project(region.north_east(), self.zoom);
        let scale = (available_w / (ne.x - sw.x)).min(available_h / (sw.y - ne.y));

        let zoom = self.zoom + scale.log2();
        if !zoom.is_finite() {
            return MAX_ZOOM;
        }
        // Snap like Leaflet: round to hundredths, then floor to whole levels.
        let zoom = ((zoom * 100.0).round() / 100.0).floor();
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    }
}

impl MapWidget for MapView {
    fn bounds(&self) -> LatLngBounds {
        let c = project(self.center, self.zoom);
        let (half_w, half_h) = (self.size.width / 2.0, self.size.height / 2.0);
        let sw = unproject(
            Point {
                x: c.x - half_w,
                y: c.y + half_h,
            },
            self.zoom,
        );
        let ne = unproject(
            Point {
                x: c.x + half_w,
                y: c.y - half_h,
            },
            self.zoom,
        );

        LatLngBounds {
            south: sw.lat,
            west: sw.lng,
            north: ne.lat,
            east: ne.lng,
        }
    }

    fn fit_bounds(&mut self, region: &LatLngBounds, padding: Padding) {
        let zoom = self.bounds_zoom(region, padding);
        let sw = project(region.south_west(), zoom);
        let ne = project(region.north_east(), zoom);
        let mid = Point {
            x: (sw.x + ne.x) / 2.0,
            y: (sw.y + ne.y) / 2.0,
        };

        self.center = unproject(mid, zoom);
        self.zoom = zoom;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_projection_round_trip_point() {
        let p = LatLng::new(35.7, 139.7);
        let back = unproject(project(p, 5.0), 5.0);
        assert!(close(back.lat, p.lat) && close(back.lng, p.lng));
    }

    #[test]
    fn test_world_origin_projects_to_center() {
        let p = project(LatLng::new(0.0, 0.0), 0.0);
        assert!(close(p.x, 128.0) && close(p.y, 128.0));
    }

    #[test]
    fn test_bounds_centered_on_view() {
        let size = ScreenSize {
            width: 512.0,
            height: 512.0,
        };
        let bounds = MapView::new(LatLng::new(0.0, 0.0), 3.0, size).bounds();

        // 512 px at zoom 3 (2048 px world) spans a quarter of the longitudes
        assert!(close(bounds.west, -45.0));
        assert!(close(bounds.east, 45.0));
        assert!(close(bounds.south, -bounds.north));
    }

    #[test]
    fn test_fit_contains_region_with_padding() {
        let mut view = MapView::default();
        let region = LatLngBounds {
            south: 30.0,
            west: 120.0,
            north: 45.0,
            east: 145.0,
        };

        view.fit_bounds(&region, Padding::uniform(50.0));

        assert!(view.zoom() >= INITIAL_ZOOM);
        assert!(view.bounds().contains_bounds(&region));
        // One level deeper would no longer fit.
        let deeper = MapView::new(view.center(), view.zoom() + 1.0, view.size);
        assert!(!deeper.bounds().contains_bounds(&region));
    }

    #[test]
    fn test_fit_single_point_uses_max_zoom() {
        let mut view = MapView::default();
        let point = LatLng::new(-33.4, -70.6);

        view.fit_bounds(&LatLngBounds::from_point(point), Padding::uniform(50.0));

        assert_eq!(view.zoom(), MAX_ZOOM);
        assert!(close(view.center().lat, point.lat));
        assert!(close(view.center().lng, point.lng));
    }

    #[test]
    fn test_fit_own_bounds_keeps_zoom_or_zooms_out() {
        let mut view = MapView::default();
        let current = view.bounds();

        view.fit_bounds(&current, Padding::uniform(50.0));

        // Padding leaves less room than the current view, so it steps back.
        assert_eq!(view.zoom(), INITIAL_ZOOM - 1.0);
        assert!(view.bounds().contains_bounds(&current));
    }

    #[test]
    fn test_report_replaces_view() {
        let mut view = MapView::default();
        let size = ScreenSize {
            width: 800.0,
            height: 600.0,
        };
        view.report(LatLng::new(10.0, 20.0), 25.0, size);

        assert_eq!(view.center(), LatLng::new(10.0, 20.0));
        assert_eq!(view.zoom(), MAX_ZOOM);
        assert_eq!(view.size, size);
    }
}
