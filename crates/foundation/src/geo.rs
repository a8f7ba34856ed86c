use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Minimum vertex count for a ring to count as a drawable polygon.
pub const MIN_POLYGON_POINTS: usize = 3;

/// Geographic position in degrees, latitude first.
///
/// Serialized as a `[lat, lng]` pair, which is the shape the catalog stores
/// polygon coordinates in.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Builds a point from a `[lng, lat]` pair (GeoJSON order).
    pub fn from_lng_lat([lng, lat]: [f64; 2]) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(p: GeoPoint) -> Self {
        [p.lat, p.lng]
    }
}

/// Open ring of points (the closing edge is implied).
///
/// The point buffer is shared and never mutated in place: every edit builds a
/// new sequence, so clones handed out earlier keep their contents.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<GeoPoint>", into = "Vec<GeoPoint>")]
pub struct Polygon {
    points: Arc<[GeoPoint]>,
}

impl Polygon {
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self {
            points: points.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a ring from GeoJSON-ordered `[lng, lat]` pairs.
    pub fn from_lng_lat(coords: &[[f64; 2]]) -> Self {
        Self::new(coords.iter().copied().map(GeoPoint::from_lng_lat).collect())
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<GeoPoint> {
        self.points.first().copied()
    }

    /// A ring with fewer than three points is equivalent to "no polygon".
    pub fn is_usable(&self) -> bool {
        self.points.len() >= MIN_POLYGON_POINTS
    }

    pub fn is_finite(&self) -> bool {
        self.points.iter().all(GeoPoint::is_finite)
    }

    /// Returns a new ring with `point` appended.
    pub fn with_point(&self, point: GeoPoint) -> Self {
        let mut next = Vec::with_capacity(self.points.len() + 1);
        next.extend_from_slice(&self.points);
        next.push(point);
        Self::new(next)
    }

    /// Drops a trailing vertex that repeats the first one.
    pub fn into_open_ring(self) -> Self {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) if self.points.len() > 1 && first == last => {
                Self::new(self.points[..self.points.len() - 1].to_vec())
            }
            _ => self,
        }
    }
}

impl From<Vec<GeoPoint>> for Polygon {
    fn from(points: Vec<GeoPoint>) -> Self {
        Self::new(points)
    }
}

impl From<Polygon> for Vec<GeoPoint> {
    fn from(p: Polygon) -> Self {
        p.points.to_vec()
    }
}

impl FromIterator<GeoPoint> for Polygon {
    fn from_iter<I: IntoIterator<Item = GeoPoint>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
