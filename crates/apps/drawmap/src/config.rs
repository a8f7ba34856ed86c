use std::env;
use std::str::FromStr;
use std::time::Duration;

use editing::DrawMapConfig;
use geocoding::ResolverConfig;

/// Flags that take precedence over the `DRAWMAP_*` environment.
#[derive(clap::Args, Debug, Default)]
pub struct Overrides {
    /// Geocoding service base URL
    #[arg(long, global = true)]
    pub geocoder_url: Option<String>,

    /// Building outline service URL
    #[arg(long, global = true)]
    pub outline_url: Option<String>,

    /// Locality appended to addresses (empty disables it)
    #[arg(long, global = true)]
    pub locality: Option<String>,

    /// Debounce window for address input, in milliseconds
    #[arg(long, global = true)]
    pub debounce_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub resolver: ResolverConfig,
    pub draw_map: DrawMapConfig,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from `lookup`, falling back to defaults for missing or
    /// unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        let resolver = &mut settings.resolver;
        if let Some(url) = lookup("DRAWMAP_GEOCODER_URL") {
            resolver.geocoder_url = url;
        }
        if let Some(url) = lookup("DRAWMAP_OUTLINE_URL") {
            resolver.outline_url = url;
        }
        if let Some(locality) = lookup("DRAWMAP_LOCALITY") {
            resolver.locality = locality;
        }
        if let Some(agent) = lookup("DRAWMAP_USER_AGENT") {
            resolver.user_agent = agent;
        }
        resolver.outline_radius_m =
            env_parsed(&lookup, "DRAWMAP_OUTLINE_RADIUS_M", resolver.outline_radius_m);
        resolver.request_timeout =
            env_millis(&lookup, "DRAWMAP_TIMEOUT_MS", resolver.request_timeout);

        let scheduler = &mut settings.draw_map.scheduler;
        scheduler.debounce = env_millis(&lookup, "DRAWMAP_DEBOUNCE_MS", scheduler.debounce);
        scheduler.min_address_chars = env_parsed(
            &lookup,
            "DRAWMAP_MIN_ADDRESS_CHARS",
            scheduler.min_address_chars,
        );

        let viewport = &mut settings.draw_map.viewport;
        viewport.zoom = env_parsed(&lookup, "DRAWMAP_ZOOM", viewport.zoom);
        settings
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(url) = &overrides.geocoder_url {
            self.resolver.geocoder_url = url.clone();
        }
        if let Some(url) = &overrides.outline_url {
            self.resolver.outline_url = url.clone();
        }
        if let Some(locality) = &overrides.locality {
            self.resolver.locality = locality.clone();
        }
        if let Some(ms) = overrides.debounce_ms {
            self.draw_map.scheduler.debounce = Duration::from_millis(ms);
        }
    }
}

fn env_parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_millis(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Duration {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}
