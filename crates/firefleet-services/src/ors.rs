//! OpenRouteService directions client.

use crate::http::{build_client, join_url, success_body, transport_error};
use anyhow::Result;
use firefleet_core::{Coordinate, RoutePath, RoutingService, ServiceError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ORS_URL: &str = "https://api.openrouteservice.org";

/// HTTP client for the OpenRouteService directions API.
///
/// Self-hosted instances usually run without a key; the `Authorization`
/// header is only sent when one is configured.
pub struct OrsClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct DirectionsRequest {
    coordinates: [[f64; 2]; 2],
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    features: Vec<DirectionsFeature>,
}

#[derive(Debug, Deserialize)]
struct DirectionsFeature {
    geometry: LineGeometry,
    #[serde(default)]
    properties: Option<DirectionsProperties>,
}

#[derive(Debug, Deserialize)]
struct LineGeometry {
    coordinates: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct DirectionsProperties {
    #[serde(default)]
    summary: Option<Summary>,
}

#[derive(Debug, Deserialize)]
struct Summary {
    #[serde(default)]
    distance: Option<f64>,
    #[serde(default)]
    duration: Option<f64>,
}

impl OrsClient {
    /// Create a new directions client.
    /// A blank key means requests go out unauthenticated.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self::with_client(
            build_client(timeout, None)?,
            base_url,
            api_key,
        ))
    }

    /// Use an existing `reqwest::Client`.
    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let api_key = api_key.into().trim().to_string();
        Self {
            client,
            base_url: base_url.into(),
            api_key: if api_key.is_empty() { None } else { Some(api_key) },
        }
    }

    pub fn directions_url(&self, profile: &str) -> String {
        join_url(
            &self.base_url,
            &format!("v2/directions/{}/geojson", profile),
        )
    }

    /// Fetch a route geometry from `origin` to `destination`.
    pub async fn directions(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        profile: &str,
    ) -> Result<RoutePath, ServiceError> {
        let request = DirectionsRequest {
            coordinates: [[origin.lon, origin.lat], [destination.lon, destination.lat]],
        };

        let mut builder = self
            .client
            .post(self.directions_url(profile))
            .header("Accept", "application/json, application/geo+json")
            .json(&request);
        if let Some(key) = self.api_key.as_deref() {
            builder = builder.header("Authorization", key);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let body = success_body(response).await?;
        parse_directions(&body)
    }
}

/// Extract the first route of a GeoJSON directions response.
pub(crate) fn parse_directions(body: &str) -> Result<RoutePath, ServiceError> {
    let response: DirectionsResponse = serde_json::from_str(body)
        .map_err(|err| ServiceError::Malformed(format!("directions response: {}", err)))?;
    let feature = response
        .features
        .into_iter()
        .next()
        .ok_or_else(|| ServiceError::Malformed("directions response has no route".to_string()))?;

    let waypoints = feature
        .geometry
        .coordinates
        .iter()
        .map(|position| match position.as_slice() {
            [lon, lat, ..] => Ok(Coordinate::new(*lon, *lat)),
            _ => Err(ServiceError::Malformed(
                "route position has fewer than two values".to_string(),
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let summary = feature.properties.and_then(|properties| properties.summary);
    Ok(RoutePath {
        waypoints,
        distance_m: summary.as_ref().and_then(|s| s.distance),
        duration_s: summary.as_ref().and_then(|s| s.duration),
    })
}

impl RoutingService for OrsClient {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        profile: &str,
    ) -> Result<RoutePath, ServiceError> {
        self.directions(origin, destination, profile).await
    }
}
