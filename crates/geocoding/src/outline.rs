use foundation::geo::{GeoPoint, Polygon};
use serde::Deserialize;

/// GeoJSON-like outline geometry as returned inline by a geocoder.
///
/// Positions are `[lng, lat, ...]`. Geometry types other than polygons are
/// kept as [`OutlineGeometry::Other`] and never yield an outline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum OutlineGeometry {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
    #[serde(other)]
    Other,
}

impl OutlineGeometry {
    /// Parses a raw GeoJSON geometry, returning `None` for anything malformed.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        serde_json::from_value(value).ok()
    }

    /// Canonical `(lat, lng)` open ring.
    ///
    /// Uses the outer ring of a polygon, or the outer ring of the first polygon
    /// of a multi-polygon. Returns `None` when the ring is missing, malformed,
    /// or has fewer than three vertices once the closing one is dropped.
    pub fn normalize(&self) -> Option<Polygon> {
        let ring = match self {
            OutlineGeometry::Polygon { coordinates } => coordinates.first()?,
            OutlineGeometry::MultiPolygon { coordinates } => coordinates.first()?.first()?,
            OutlineGeometry::Other => return None,
        };

        let points = ring
            .iter()
            .map(|pos| match pos.as_slice() {
                [lng, lat, ..] => Some(GeoPoint::new(*lat, *lng)),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;

        let polygon = Polygon::new(points).into_open_ring();
        (polygon.is_usable() && polygon.is_finite()).then_some(polygon)
    }
}

/// Picks the candidate with the most vertices.
///
/// Simplified or partial ways tend to have fewer points than the real
/// footprint. Ties keep the earlier candidate; rings under three points never
/// qualify.
pub fn best_outline(candidates: impl IntoIterator<Item = Polygon>) -> Option<Polygon> {
    candidates
        .into_iter()
        .filter(|p| p.is_usable() && p.is_finite())
        .reduce(|best, next| if next.len() > best.len() { next } else { best })
}
