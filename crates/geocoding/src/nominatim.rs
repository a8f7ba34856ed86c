use foundation::geo::GeoPoint;
use serde::Deserialize;

use crate::config::ResolverConfig;
use crate::error::ResolveError;
use crate::outline::OutlineGeometry;
use crate::provider::{BoxFuture, GeocodeMatch, Geocoder};

/// Geocoder speaking the Nominatim `/search` API.
///
/// Asks for the single best match with its outline inline
/// (`polygon_geojson=1`).
pub struct NominatimGeocoder {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: Coordinate,
    lon: Coordinate,
    #[serde(default)]
    geojson: Option<serde_json::Value>,
    #[serde(default)]
    display_name: Option<String>,
}

/// Nominatim sends coordinates as strings; accept plain numbers too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Coordinate {
    Text(String),
    Number(f64),
}

impl Coordinate {
    fn value(&self) -> Option<f64> {
        let v = match self {
            Coordinate::Text(s) => s.trim().parse::<f64>().ok()?,
            Coordinate::Number(n) => *n,
        };
        v.is_finite().then_some(v)
    }
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Result<Self, ResolveError> {
        Ok(Self::new(config.geocoder_url.clone(), config.http_client()?))
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.base_url.trim_end_matches('/'))
    }
}

impl Geocoder for NominatimGeocoder {
    fn search(&self, query: &str) -> BoxFuture<'_, Result<Vec<GeocodeMatch>, ResolveError>> {
        let url = self.search_url();
        let query = query.to_string();
        Box::pin(async move {
            let resp = self
                .client
                .get(&url)
                .header(reqwest::header::ACCEPT, "application/json")
                .query(&[
                    ("format", "jsonv2"),
                    ("limit", "1"),
                    ("polygon_geojson", "1"),
                    ("q", query.as_str()),
                ])
                .send()
                .await
                .map_err(|e| ResolveError::with_source("geocoder request failed", e))?;

            if !resp.status().is_success() {
                return Err(ResolveError::new(format!(
                    "geocoder HTTP error: {}",
                    resp.status()
                )));
            }

            let places: Vec<Place> = resp
                .json()
                .await
                .map_err(|e| ResolveError::with_source("failed to decode geocoder response", e))?;

            places.into_iter().map(place_to_match).collect()
        })
    }
}

fn place_to_match(place: Place) -> Result<GeocodeMatch, ResolveError> {
    let (Some(lat), Some(lng)) = (place.lat.value(), place.lon.value()) else {
        return Err(ResolveError::new("geocoder returned invalid coordinates"));
    };
    Ok(GeocodeMatch {
        center: GeoPoint::new(lat, lng),
        outline: place.geojson.and_then(OutlineGeometry::from_json),
        display_name: place.display_name,
    })
}
