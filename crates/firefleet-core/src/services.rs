//! Contracts for the external services the pipeline calls.

use crate::error::ServiceError;
use crate::models::{Coordinate, RoutePath};
use std::future::Future;

/// Travel profile used for vehicle routes.
pub const DRIVING_PROFILE: &str = "driving-car";

/// Point-to-point routing.
pub trait RoutingService: Send + Sync {
    /// Route from `origin` to `destination` for the given travel profile.
    ///
    /// The returned waypoints must be in travel order, lon/lat.
    fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        profile: &str,
    ) -> impl Future<Output = Result<RoutePath, ServiceError>> + Send;
}

/// Reverse geocoding.
pub trait Geocoder: Send + Sync {
    /// Display address for a location, `None` if the service has no result.
    fn reverse(
        &self,
        lat: f64,
        lon: f64,
    ) -> impl Future<Output = Result<Option<String>, ServiceError>> + Send;
}
