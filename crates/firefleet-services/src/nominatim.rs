//! Nominatim reverse geocoding client.

use crate::http::{build_client, join_url, success_body, transport_error};
use anyhow::Result;
use firefleet_core::{Geocoder, ServiceError};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = "fire_density_app";

/// HTTP client for Nominatim `/reverse` lookups.
///
/// Public Nominatim instances rate-limit per client. With a non-zero
/// `min_interval`, request starts are spaced at least that far apart across
/// all concurrent callers.
pub struct NominatimClient {
    client: Client,
    base_url: String,
    min_interval: Duration,
    next_slot: Mutex<Instant>,
}

impl NominatimClient {
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self::with_client(
            build_client(timeout, Some(user_agent))?,
            base_url,
        ))
    }

    /// Use an existing `reqwest::Client`. It should already carry a User-Agent.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            min_interval: Duration::ZERO,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn reverse_url(&self) -> String {
        join_url(&self.base_url, "reverse")
    }

    /// Display name for a location, `None` when nothing is there.
    pub async fn reverse_lookup(&self, lat: f64, lon: f64) -> Result<Option<String>, ServiceError> {
        self.wait_for_slot().await;

        let lat = lat.to_string();
        let lon = lon.to_string();
        let response = self
            .client
            .get(self.reverse_url())
            .query(&[
                ("format", "jsonv2"),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let body = success_body(response).await?;
        parse_reverse(&body)
    }

    async fn wait_for_slot(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        // Reserve a start time, then sleep outside the lock.
        let wait = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let start = (*next).max(now);
            *next = start + self.min_interval;
            start - now
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

/// `display_name` of a reverse response. Nominatim answers "nothing here"
/// with a 200 and an `error` member.
pub(crate) fn parse_reverse(body: &str) -> Result<Option<String>, ServiceError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|err| ServiceError::Malformed(format!("reverse response: {}", err)))?;

    if value.get("error").is_some() {
        return Ok(None);
    }
    match value.get("display_name") {
        Some(Value::String(name)) if !name.trim().is_empty() => Ok(Some(name.clone())),
        Some(Value::String(_)) => Ok(None),
        _ => Err(ServiceError::Malformed(
            "reverse response has no display_name".to_string(),
        )),
    }
}

impl Geocoder for NominatimClient {
    async fn reverse(&self, lat: f64, lon: f64) -> Result<Option<String>, ServiceError> {
        self.reverse_lookup(lat, lon).await
    }
}
