use std::time::Duration;

/// Settings for the geocoding and outline lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// Base URL of the geocoding service (the `/search` path is appended).
    pub geocoder_url: String,
    /// Full URL of the outline service interpreter endpoint.
    pub outline_url: String,
    /// Locality appended to addresses that don't mention it already.
    /// Empty disables the qualifier.
    pub locality: String,
    /// Search radius around the resolved center for the outline fallback (meters).
    pub outline_radius_m: f64,
    pub user_agent: String,
    pub request_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            geocoder_url: "https://nominatim.openstreetmap.org".to_string(),
            outline_url: "https://overpass-api.de/api/interpreter".to_string(),
            locality: "Tomsk".to_string(),
            outline_radius_m: 40.0,
            user_agent: concat!("drawmap/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ResolverConfig {
    /// Shared HTTP client honoring the user agent and timeout.
    pub fn http_client(&self) -> Result<reqwest::Client, crate::ResolveError> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| crate::ResolveError::with_source("failed to build HTTP client", e))
    }
}
