use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::error::ResolveError;
use crate::nominatim::NominatimGeocoder;
use crate::outline::{best_outline, OutlineGeometry};
use crate::overpass::OverpassOutlines;
use crate::provider::{AddressResolver, BoxFuture, Geocoder, OutlineSource, ResolutionResult};

/// Two-tier address resolution.
///
/// The geocoder's inline outline wins when it is usable; otherwise the outline
/// service is searched around the geocoded center and the most detailed
/// candidate is kept. Lookups are best effort: any failure resolves to an
/// empty result.
pub struct GeometryResolver {
    geocoder: Arc<dyn Geocoder>,
    outlines: Arc<dyn OutlineSource>,
    locality: String,
    outline_radius_m: f64,
}

impl GeometryResolver {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        outlines: Arc<dyn OutlineSource>,
        config: &ResolverConfig,
    ) -> Self {
        Self {
            geocoder,
            outlines,
            locality: config.locality.clone(),
            outline_radius_m: config.outline_radius_m,
        }
    }

    /// Resolver backed by the HTTP geocoding and outline services.
    pub fn from_config(config: &ResolverConfig) -> Result<Self, ResolveError> {
        Ok(Self::new(
            Arc::new(NominatimGeocoder::from_config(config)?),
            Arc::new(OverpassOutlines::from_config(config)?),
            config,
        ))
    }

    /// Appends the locality qualifier unless the address already names it.
    pub fn normalize_address(&self, raw: &str) -> String {
        let raw = raw.trim();
        let mentions_locality = raw
            .to_lowercase()
            .contains(&self.locality.to_lowercase());
        if self.locality.is_empty() || mentions_locality {
            return raw.to_string();
        }
        format!("{raw}, {}", self.locality)
    }

    pub async fn resolve(&self, address: &str) -> ResolutionResult {
        match self.try_resolve(address).await {
            Ok(result) => result,
            Err(err) => {
                warn!("address resolution failed for {address:?}: {err}");
                ResolutionResult::empty()
            }
        }
    }

    /// Like [`GeometryResolver::resolve`] but surfaces lookup failures.
    pub async fn try_resolve(&self, address: &str) -> Result<ResolutionResult, ResolveError> {
        let query = self.normalize_address(address);
        let matches = self.geocoder.search(&query).await?;
        let Some(best) = matches.into_iter().next() else {
            debug!("no geocoder match for {query:?}");
            return Ok(ResolutionResult::empty());
        };

        let center = best.center;
        if let Some(polygon) = best.outline.as_ref().and_then(OutlineGeometry::normalize) {
            info!("resolved {query:?} with inline outline ({} points)", polygon.len());
            return Ok(ResolutionResult {
                center: Some(center),
                polygon: Some(polygon),
            });
        }

        let candidates = self
            .outlines
            .outlines_near(center, self.outline_radius_m)
            .await?;
        let polygon = best_outline(candidates);
        info!(
            "resolved {query:?} via outline fallback ({} points)",
            polygon.as_ref().map_or(0, |p| p.len())
        );
        Ok(ResolutionResult {
            center: Some(center),
            polygon,
        })
    }
}

impl AddressResolver for GeometryResolver {
    fn resolve(&self, address: &str) -> BoxFuture<'_, ResolutionResult> {
        let address = address.to_string();
        Box::pin(async move { GeometryResolver::resolve(self, &address).await })
    }
}
