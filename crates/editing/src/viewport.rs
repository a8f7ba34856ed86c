use std::time::Duration;

use foundation::geo::{GeoPoint, Polygon};

use crate::surface::MapSurface;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewportConfig {
    pub zoom: u8,
    /// Eased transition used when re-centering.
    pub transition: Duration,
    /// Where the map opens when nothing is known yet.
    pub default_center: GeoPoint,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            zoom: 17,
            transition: Duration::from_millis(300),
            default_center: GeoPoint::new(56.4866, 84.9719),
        }
    }
}

/// Keeps the map centered on the geometry being edited.
///
/// Only moves the map when asked by the editing workflow, never on its own,
/// so it cannot fight a pan or zoom the user made.
#[derive(Debug, Clone, Default)]
pub struct MapViewportController {
    config: ViewportConfig,
    last_center: Option<GeoPoint>,
}

impl MapViewportController {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            config,
            last_center: None,
        }
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    /// Last center this controller moved the map to.
    pub fn last_center(&self) -> Option<GeoPoint> {
        self.last_center
    }

    /// Re-centers `surface` on `point`.
    ///
    /// Missing, non-finite or zero coordinates are ignored. Returns `true` if
    /// the map was moved.
    pub fn center_on<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        point: Option<GeoPoint>,
    ) -> bool {
        let Some(point) = point.filter(is_centerable) else {
            return false;
        };
        surface.set_center(point, self.config.zoom, self.config.transition);
        self.last_center = Some(point);
        true
    }

    /// Where to open the map: the explicit center, else the first polygon
    /// vertex, else the configured default.
    pub fn initial_center(&self, center: Option<GeoPoint>, polygon: &Polygon) -> GeoPoint {
        center
            .filter(is_centerable)
            .or_else(|| polygon.first().filter(is_centerable))
            .unwrap_or(self.config.default_center)
    }
}

/// A point is worth centering on only if both coordinates are finite and
/// non-zero.
pub fn is_centerable(point: &GeoPoint) -> bool {
    point.is_finite() && point.lat != 0.0 && point.lng != 0.0
}
