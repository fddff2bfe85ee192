//! Route resolution from each incident to its group's dispatch location.
//!
//! Every request is attempted exactly once. A failed request degrades that
//! incident's route to [`RouteStatus::Failed`](crate::models::RouteStatus) and
//! never aborts the batch.

use crate::models::{ClusterGroup, Coordinate, IncidentPoint, Route};
use crate::services::{RoutingService, DRIVING_PROFILE};
use crate::spatial::path_length_m;
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteOptions {
    /// Travel profile passed to the routing service
    pub profile: String,
    /// Maximum number of requests in flight
    pub concurrency: usize,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            profile: DRIVING_PROFILE.to_string(),
            concurrency: 8,
        }
    }
}

/// Resolve the route for a single incident.
///
/// `destination` is the dispatch location of the incident's group; `None`
/// means the group has none and the route fails without a request.
pub async fn resolve_route<S: RoutingService>(
    point: &IncidentPoint,
    destination: Option<Coordinate>,
    service: &S,
    profile: &str,
) -> Route {
    let Some(destination) = destination else {
        tracing::warn!(
            "Incident {} belongs to cluster {} which has no dispatch location",
            point.id,
            point.cluster_id
        );
        return Route::failed(point, None, "group has no dispatch location");
    };

    let mut path = match service.route(point.coordinate(), destination, profile).await {
        Ok(path) => path,
        Err(err) => {
            tracing::warn!("Error fetching route for incident {}: {}", point.id, err);
            return Route::failed(point, Some(destination), err.to_string());
        }
    };

    if path.waypoints.len() < 2 || !path.waypoints.iter().all(Coordinate::is_finite) {
        let reason = format!(
            "routing service returned an unusable path ({} waypoints)",
            path.waypoints.len()
        );
        tracing::warn!("Route for incident {} rejected: {}", point.id, reason);
        return Route::failed(point, Some(destination), reason);
    }

    if path.distance_m.is_none() {
        path.distance_m = Some(path_length_m(&path.waypoints));
    }
    Route::resolved(point, destination, path)
}

/// Routes for every incident, yielded in completion order.
///
/// At most `options.concurrency` requests are in flight. Dropping the stream
/// cancels the outstanding requests; routes already yielded are unaffected.
pub fn route_stream<'a, S: RoutingService + 'a>(
    points: &'a [IncidentPoint],
    groups: &[ClusterGroup],
    service: &'a S,
    options: &'a RouteOptions,
) -> impl Stream<Item = Route> + 'a {
    let destinations: HashMap<usize, Coordinate> = groups
        .iter()
        .map(|group| (group.cluster_id, group.centroid))
        .collect();
    let profile = options.profile.as_str();

    stream::iter(points)
        .map(move |point| {
            let destination = destinations.get(&point.cluster_id).copied();
            resolve_route(point, destination, service, profile)
        })
        .buffer_unordered(options.concurrency.max(1))
}

/// Resolve one route per incident with bounded concurrency.
///
/// The result is ordered by incident id whatever order requests complete in.
pub async fn resolve_routes<S: RoutingService>(
    points: &[IncidentPoint],
    groups: &[ClusterGroup],
    service: &S,
    options: &RouteOptions,
) -> Vec<Route> {
    let mut routes: Vec<Route> = route_stream(points, groups, service, options)
        .collect()
        .await;
    routes.sort_by_key(|route| route.point_id);
    log_summary(&routes);
    routes
}

pub(crate) fn log_summary(routes: &[Route]) {
    let resolved = routes.iter().filter(|route| route.is_resolved()).count();
    tracing::info!(
        "Resolved {} of {} routes ({} failed)",
        resolved,
        routes.len(),
        routes.len() - resolved
    );
}
