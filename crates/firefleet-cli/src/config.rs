//! Service configuration from environment.

use firefleet_services::{DEFAULT_NOMINATIM_URL, DEFAULT_ORS_URL, DEFAULT_USER_AGENT};
use std::env;
use std::time::Duration;

const PUBLIC_NOMINATIM_INTERVAL_MS: u64 = 1000;

fn is_public_nominatim(url: &str) -> bool {
    url.trim_end_matches('/') == DEFAULT_NOMINATIM_URL
}

#[derive(Debug, Clone)]
pub struct Config {
    pub ors_base_url: String,
    pub ors_api_key: String,
    pub nominatim_url: String,
    pub geocoder_user_agent: String,
    pub service_timeout: Duration,
    pub concurrency: usize,
    pub geocoder_min_interval: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let nominatim_url = lookup("NOMINATIM_URL")
            .unwrap_or_else(|| DEFAULT_NOMINATIM_URL.to_string());
        // The public instance allows one request per second.
        let default_interval_ms = if is_public_nominatim(&nominatim_url) {
            PUBLIC_NOMINATIM_INTERVAL_MS
        } else {
            0
        };

        Self {
            ors_base_url: lookup("ORS_BASE_URL")
                .unwrap_or_else(|| DEFAULT_ORS_URL.to_string()),
            ors_api_key: lookup("ORS_API_KEY").unwrap_or_default(),
            nominatim_url,
            geocoder_user_agent: lookup("GEOCODER_USER_AGENT")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            service_timeout: Duration::from_secs(
                lookup("SERVICE_TIMEOUT_S")
                    .and_then(|s| s.parse().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(10),
            ),
            concurrency: lookup("FIREFLEET_CONCURRENCY")
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(8),
            geocoder_min_interval: Duration::from_millis(
                lookup("GEOCODER_MIN_INTERVAL_MS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default_interval_ms),
            ),
        }
    }
}
