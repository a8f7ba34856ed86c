use std::collections::HashMap;

use foundation::geo::{GeoPoint, Polygon};
use parking_lot::{Mutex, RwLock};

use crate::error::ResolveError;
use crate::provider::{BoxFuture, GeocodeMatch, Geocoder, OutlineSource};

/// In-memory geocoder for tests and offline runs.
///
/// Queries are matched exactly against the registered keys.
#[derive(Default)]
pub struct MemoryGeocoder {
    matches: RwLock<HashMap<String, Vec<GeocodeMatch>>>,
    failing: bool,
    queries: Mutex<Vec<String>>,
}

impl MemoryGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A geocoder whose every lookup fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn insert(&self, query: impl Into<String>, found: GeocodeMatch) {
        self.matches.write().entry(query.into()).or_default().push(found);
    }

    /// Queries received so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

impl Geocoder for MemoryGeocoder {
    fn search(&self, query: &str) -> BoxFuture<'_, Result<Vec<GeocodeMatch>, ResolveError>> {
        self.queries.lock().push(query.to_string());
        let result = if self.failing {
            Err(ResolveError::new("geocoder unavailable"))
        } else {
            Ok(self.matches.read().get(query).cloned().unwrap_or_default())
        };
        Box::pin(async move { result })
    }
}

/// In-memory outline service returning a fixed candidate list.
#[derive(Default)]
pub struct MemoryOutlines {
    outlines: Vec<Polygon>,
    failing: bool,
    requests: Mutex<Vec<(GeoPoint, f64)>>,
}

impl MemoryOutlines {
    pub fn new(outlines: Vec<Polygon>) -> Self {
        Self {
            outlines,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// `(center, radius)` pairs received so far.
    pub fn requests(&self) -> Vec<(GeoPoint, f64)> {
        self.requests.lock().clone()
    }
}

impl OutlineSource for MemoryOutlines {
    fn outlines_near(
        &self,
        center: GeoPoint,
        radius_m: f64,
    ) -> BoxFuture<'_, Result<Vec<Polygon>, ResolveError>> {
        self.requests.lock().push((center, radius_m));
        let result = if self.failing {
            Err(ResolveError::new("outline service unavailable"))
        } else {
            Ok(self.outlines.clone())
        };
        Box::pin(async move { result })
    }
}
