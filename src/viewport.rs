//! Keeping the map framed on the visible events.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::VisibleSet;

/// Padding applied on every edge when fitting, in screen pixels.
pub const FIT_PADDING_PX: f64 = 50.0;

/// A geographic point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Axis-aligned lat/lng rectangle. No antimeridian wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl LatLngBounds {
    /// Degenerate bounds covering a single point.
    #[must_use]
    pub const fn from_point(point: LatLng) -> Self {
        Self {
            south: point.lat,
            west: point.lng,
            north: point.lat,
            east: point.lng,
        }
    }

    #[must_use]
    pub const fn south_west(&self) -> LatLng {
        LatLng::new(self.south, self.west)
    }

    #[must_use]
    pub const fn north_east(&self) -> LatLng {
        LatLng::new(self.north, self.east)
    }

    /// Smallest bounds covering `self` and `point`.
    #[must_use]
    pub fn extend(self, point: LatLng) -> Self {
        Self {
            south: self.south.min(point.lat),
            west: self.west.min(point.lng),
            north: self.north.max(point.lat),
            east: self.east.max(point.lng),
        }
    }

    #[cfg(test)]
    pub fn contains(&self, point: LatLng) -> bool {
        point.lat >= self.south
            && point.lat <= self.north
            && point.lng >= self.west
            && point.lng <= self.east
    }

    #[cfg(test)]
    pub fn contains_bounds(&self, other: &Self) -> bool {
        self.contains(other.south_west()) && self.contains(other.north_east())
    }
}

/// Pixel padding around a fitted region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Padding {
    pub x: f64,
    pub y: f64,
}

impl Padding {
    #[must_use]
    pub const fn uniform(px: f64) -> Self {
        Self { x: px, y: px }
    }
}

impl Default for Padding {
    fn default() -> Self {
        Self::uniform(FIT_PADDING_PX)
    }
}

/// The map surface a fitter drives.
pub trait MapWidget {
    /// Region currently displayed.
    fn bounds(&self) -> LatLngBounds;

    /// Show `region`, keeping `padding` pixels free on each edge.
    fn fit_bounds(&mut self, region: &LatLngBounds, padding: Padding);
}

/// What the fitted region starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitMode {
    /// Grow the current view to include every visible event. The view never
    /// shrinks on its own.
    #[default]
    IncludeView,
    /// Frame only the visible events.
    VisibleOnly,
}

impl FromStr for FitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "view" => Ok(Self::IncludeView),
            "data" => Ok(Self::VisibleOnly),
            _ => Err(format!("unknown fit mode: {s} (expected: view, data)")),
        }
    }
}

/// A fit the map widget should perform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitRequest {
    pub bounds: LatLngBounds,
    pub padding: Padding,
}

/// Refits the map whenever the visible set changes.
#[derive(Debug, Default)]
pub struct ViewportFitter {
    mode: FitMode,
    padding: Padding,
    last_seen: Option<VisibleSet>,
}

impl ViewportFitter {
    #[must_use]
    pub fn new(mode: FitMode) -> Self {
        Self {
            mode,
            padding: Padding::default(),
            last_seen: None,
        }
    }

    /// Region to show for `visible`, or `None` to leave the view alone.
    #[must_use]
    pub fn fit(&self, visible: &VisibleSet, current: LatLngBounds) -> Option<FitRequest> {
        if visible.is_empty() {
            return None;
        }

        let mut points = visible.iter().map(|r| {
            let p = r.position();
            LatLng::new(p.latitude, p.longitude)
        });
        let seed = match self.mode {
            FitMode::IncludeView => current,
            FitMode::VisibleOnly => LatLngBounds::from_point(points.next()?),
        };

        Some(FitRequest {
            bounds: points.fold(seed, LatLngBounds::extend),
            padding: self.padding,
        })
    }

    /// Fit `map` if `visible` differs from the last set observed.
    ///
    /// Returns the request that was applied.
    pub fn observe<M: MapWidget>(
        &mut self,
        visible: &VisibleSet,
        map: &mut M,
    ) -> Option<FitRequest> {
        if self
            .last_seen
            .as_ref()
            .is_some_and(|last| last.same_as(visible))
        {
            return None;
        }
        self.last_seen = Some(visible.clone());

        let request = self.fit(visible, map.bounds())?;
        debug!(
            "fitting {} events into {:?}",
            visible.len(),
            request.bounds
        );
        map.fit_bounds(&request.bounds, request.padding);
        Some(request)
    }
}
