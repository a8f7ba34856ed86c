use std::future::Future;
use std::pin::Pin;

use foundation::geo::{GeoPoint, Polygon};
use serde::Serialize;

use crate::error::ResolveError;
use crate::outline::OutlineGeometry;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One geocoder hit.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeMatch {
    pub center: GeoPoint,
    /// Inline outline, still in the provider's `[lng, lat]` order.
    pub outline: Option<OutlineGeometry>,
    pub display_name: Option<String>,
}

impl GeocodeMatch {
    pub fn new(center: GeoPoint) -> Self {
        Self {
            center,
            outline: None,
            display_name: None,
        }
    }

    pub fn with_outline(mut self, outline: OutlineGeometry) -> Self {
        self.outline = Some(outline);
        self
    }
}

/// Free-text geocoding service.
///
/// Returns matches best first. An empty list is a valid answer, not an error.
pub trait Geocoder: Send + Sync {
    fn search(&self, query: &str) -> BoxFuture<'_, Result<Vec<GeocodeMatch>, ResolveError>>;
}

/// Building outline lookup around a point.
///
/// Returns candidate rings in `(lat, lng)` order. An empty list is valid.
pub trait OutlineSource: Send + Sync {
    fn outlines_near(
        &self,
        center: GeoPoint,
        radius_m: f64,
    ) -> BoxFuture<'_, Result<Vec<Polygon>, ResolveError>>;
}

/// Output of one resolve attempt. Either field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolutionResult {
    pub center: Option<GeoPoint>,
    pub polygon: Option<Polygon>,
}

impl ResolutionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.center.is_none() && self.polygon.is_none()
    }

    /// The polygon, if it has enough points to be drawn.
    pub fn usable_polygon(&self) -> Option<&Polygon> {
        self.polygon.as_ref().filter(|p| p.is_usable())
    }
}

/// Anything that turns an address into geometry without failing.
///
/// Lookup failures are folded into an empty [`ResolutionResult`].
pub trait AddressResolver: Send + Sync {
    fn resolve(&self, address: &str) -> BoxFuture<'_, ResolutionResult>;
}
