use foundation::geo::{GeoPoint, Polygon};
use serde::Deserialize;

use crate::config::ResolverConfig;
use crate::error::ResolveError;
use crate::provider::{BoxFuture, OutlineSource};

/// Outline service speaking the Overpass QL interpreter API.
///
/// Queries building ways around a point with inline geometry.
pub struct OverpassOutlines {
    url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    #[serde(default)]
    geometry: Vec<LatLon>,
}

#[derive(Debug, Deserialize)]
struct LatLon {
    lat: f64,
    lon: f64,
}

impl OverpassOutlines {
    pub fn new(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Result<Self, ResolveError> {
        Ok(Self::new(config.outline_url.clone(), config.http_client()?))
    }
}

/// Overpass QL selecting building ways within `radius_m` of `center`.
pub fn building_query(center: GeoPoint, radius_m: f64) -> String {
    format!(
        "[out:json];way[\"building\"](around:{radius_m},{},{});out geom;",
        center.lat, center.lng
    )
}

impl OutlineSource for OverpassOutlines {
    fn outlines_near(
        &self,
        center: GeoPoint,
        radius_m: f64,
    ) -> BoxFuture<'_, Result<Vec<Polygon>, ResolveError>> {
        let body = building_query(center, radius_m);
        Box::pin(async move {
            let resp = self
                .client
                .post(&self.url)
                .header(reqwest::header::CONTENT_TYPE, "text/plain")
                .body(body)
                .send()
                .await
                .map_err(|e| ResolveError::with_source("outline request failed", e))?;

            if !resp.status().is_success() {
                return Err(ResolveError::new(format!(
                    "outline HTTP error: {}",
                    resp.status()
                )));
            }

            let parsed: Response = resp
                .json()
                .await
                .map_err(|e| ResolveError::with_source("failed to decode outline response", e))?;

            Ok(parsed
                .elements
                .into_iter()
                .map(|el| {
                    el.geometry
                        .into_iter()
                        .map(|p| GeoPoint::new(p.lat, p.lon))
                        .collect::<Polygon>()
                        .into_open_ring()
                })
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::State;
    use axum::routing::post;
    use axum::{Json, Router};
    use foundation::geo::GeoPoint;
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    use super::{building_query, OverpassOutlines};
    use crate::provider::OutlineSource;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        format!("http://{addr}")
    }

    #[test]
    fn query_targets_buildings_around_center() {
        let q = building_query(GeoPoint::new(56.48, 84.97), 40.0);
        assert_eq!(
            q,
            "[out:json];way[\"building\"](around:40,56.48,84.97);out geom;"
        );
    }

    #[tokio::test]
    async fn returns_open_rings_in_lat_lng_order() {
        let seen = Arc::new(Mutex::new(String::new()));
        let body: Value = json!({
            "elements": [
                { "type": "way", "geometry": [
                    {"lat": 56.1, "lon": 84.1}, {"lat": 56.1, "lon": 84.2},
                    {"lat": 56.2, "lon": 84.2}, {"lat": 56.1, "lon": 84.1}
                ]},
                { "type": "node" }
            ]
        });
        let app = Router::new()
            .route(
                "/api/interpreter",
                post(|State(seen): State<Arc<Mutex<String>>>, query: String| async move {
                    *seen.lock() = query;
                    Json(body)
                }),
            )
            .with_state(Arc::clone(&seen));
        let base = serve(app).await;

        let source =
            OverpassOutlines::new(format!("{base}/api/interpreter"), reqwest::Client::new());
        let rings = source
            .outlines_near(GeoPoint::new(56.15, 84.15), 40.0)
            .await
            .expect("outlines");

        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0].len(), 3);
        assert_eq!(rings[0].first(), Some(GeoPoint::new(56.1, 84.1)));
        assert!(rings[1].is_empty());
        assert!(seen.lock().contains("around:40,56.15,84.15"));
    }

    #[tokio::test]
    async fn server_error_is_an_error() {
        let app = Router::new().route(
            "/api/interpreter",
            post(|| async { (axum::http::StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base = serve(app).await;
        let source =
            OverpassOutlines::new(format!("{base}/api/interpreter"), reqwest::Client::new());
        assert!(source
            .outlines_near(GeoPoint::new(1.0, 1.0), 40.0)
            .await
            .is_err());
    }
}
