//! The dispatch pipeline: normalize, partition, locate, then enrich.
//!
//! [`plan_dispatch`] is pure and synchronous. Place names and routes are
//! added afterwards by the async enrichment methods, which only fill optional
//! fields and never change geometry or cluster assignment.

use crate::annotate;
use crate::dispatch::locate_dispatch;
use crate::error::{PipelineError, PlanWarning, Result};
use crate::geojson::IncidentCollection;
use crate::models::{ClusterGroup, GroupDetails, GroupMember, IncidentPoint, Route, UNKNOWN_PLACE};
use crate::normalize::normalize;
use crate::partition::{partition, KMeansConfig};
use crate::routing::{self, RouteOptions};
use crate::services::{Geocoder, RoutingService};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use std::pin::pin;

#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    pub kmeans: KMeansConfig,
}

/// Everything derived from one processing run.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchPlan {
    pub vehicle_count: usize,
    /// Seed the partitioner ran with; pass it back to reproduce the grouping.
    pub seed: u64,
    pub inertia: f64,
    pub points: Vec<IncidentPoint>,
    pub groups: Vec<ClusterGroup>,
    pub routes: Vec<Route>,
    pub warnings: Vec<PlanWarning>,
    pub generated_at: DateTime<Utc>,
}

/// Check a vehicle count supplied from outside.
pub fn validate_vehicle_count(requested: i64) -> Result<usize> {
    if requested <= 0 {
        return Err(PipelineError::InvalidClusterCount { requested });
    }
    usize::try_from(requested).map_err(|_| PipelineError::InvalidClusterCount { requested })
}

/// Group incidents into `vehicle_count` clusters and place one vehicle per group.
///
/// The count is validated before any input is touched.
pub fn plan_dispatch(
    collection: &IncidentCollection,
    vehicle_count: usize,
    options: &PlanOptions,
) -> Result<DispatchPlan> {
    if vehicle_count == 0 {
        return Err(PipelineError::InvalidClusterCount { requested: 0 });
    }

    let normalized = normalize(collection)?;
    let partition = partition(&normalized.points, vehicle_count, &options.kmeans)?;

    let points: Vec<IncidentPoint> = normalized
        .points
        .into_iter()
        .zip(&partition.labels)
        .map(|(point, &label)| IncidentPoint::from_normalized(point, label))
        .collect();
    let located = locate_dispatch(&points, vehicle_count);

    let mut warnings = normalized.warnings;
    warnings.extend(located.warnings);

    tracing::info!(
        "Planned {} vehicle groups for {} incidents",
        located.groups.len(),
        points.len()
    );

    Ok(DispatchPlan {
        vehicle_count,
        seed: partition.seed,
        inertia: partition.inertia,
        points,
        groups: located.groups,
        routes: Vec::new(),
        warnings,
        generated_at: Utc::now(),
    })
}

impl DispatchPlan {
    pub fn group(&self, cluster_id: usize) -> Option<&ClusterGroup> {
        self.groups.iter().find(|group| group.cluster_id == cluster_id)
    }

    pub fn members(&self, cluster_id: usize) -> impl Iterator<Item = &IncidentPoint> {
        self.points
            .iter()
            .filter(move |point| point.cluster_id == cluster_id)
    }

    pub fn routes_for(&self, cluster_id: usize) -> impl Iterator<Item = &Route> {
        self.routes
            .iter()
            .filter(move |route| route.cluster_id == cluster_id)
    }

    /// Member ids and place names for one group.
    pub fn group_details(&self, cluster_id: usize) -> Option<GroupDetails> {
        let group = self.group(cluster_id)?;
        let members = self
            .members(cluster_id)
            .map(|point| GroupMember {
                id: point.id,
                place_name: point
                    .place_name
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_PLACE.to_string()),
            })
            .collect();
        Some(GroupDetails {
            cluster_id,
            label: group.label.clone(),
            centroid: group.centroid,
            members,
        })
    }

    /// Reverse geocode every incident.
    pub async fn annotate_places<G: Geocoder>(&mut self, geocoder: &G, concurrency: usize) {
        annotate::annotate_places(&mut self.points, geocoder, concurrency).await;
    }

    /// Route every incident to its group's dispatch location.
    ///
    /// Routes replace any from a previous run and are inserted in incident
    /// order as they complete; if this future is dropped, the routes already
    /// resolved stay on the plan.
    pub async fn resolve_routes<S: RoutingService>(&mut self, router: &S, options: &RouteOptions) {
        self.routes.clear();
        let mut routes = pin!(routing::route_stream(
            &self.points,
            &self.groups,
            router,
            options
        ));
        while let Some(route) = routes.next().await {
            let at = self.routes.partition_point(|r| r.point_id < route.point_id);
            self.routes.insert(at, route);
        }
        routing::log_summary(&self.routes);
    }
}
