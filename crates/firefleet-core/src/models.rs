//! Core data models for the dispatch planner.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Place name recorded when reverse geocoding yields nothing.
pub const UNKNOWN_PLACE: &str = "Unknown";

/// A WGS84 position, longitude first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

/// An incident location after normalization, before it has a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    /// Index of the source feature in the input collection.
    pub id: usize,
    pub lon: f64,
    pub lat: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
}

impl NormalizedPoint {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lon, self.lat)
    }
}

/// One input location requiring fire-vehicle coverage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentPoint {
    pub id: usize,
    pub lon: f64,
    pub lat: f64,
    pub cluster_id: usize,
    /// Filled by the place annotator; `"Unknown"` when the lookup failed.
    #[serde(default)]
    pub place_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
}

impl IncidentPoint {
    /// Attach a cluster assignment to a normalized point.
    pub fn from_normalized(point: NormalizedPoint, cluster_id: usize) -> Self {
        Self {
            id: point.id,
            lon: point.lon,
            lat: point.lat,
            cluster_id,
            place_name: None,
            properties: point.properties,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lon, self.lat)
    }
}

/// The incidents assigned to one vehicle and its staging point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterGroup {
    pub cluster_id: usize,
    /// Display label, `"Group 1"` for cluster 0.
    pub label: String,
    pub centroid: Coordinate,
    pub member_ids: Vec<usize>,
}

impl ClusterGroup {
    pub fn label_for(cluster_id: usize) -> String {
        format!("Group {}", cluster_id + 1)
    }

    pub fn len(&self) -> usize {
        self.member_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_ids.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    Resolved,
    Failed,
}

/// Path returned by a routing service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePath {
    pub waypoints: Vec<Coordinate>,
    #[serde(default)]
    pub distance_m: Option<f64>,
    #[serde(default)]
    pub duration_s: Option<f64>,
}

impl RoutePath {
    pub fn new(waypoints: Vec<Coordinate>) -> Self {
        Self {
            waypoints,
            distance_m: None,
            duration_s: None,
        }
    }
}

/// Driving path from one incident to its group's dispatch location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub point_id: usize,
    pub cluster_id: usize,
    pub origin: Coordinate,
    pub destination: Option<Coordinate>,
    /// Path geometry in the order the routing service returned it.
    pub waypoints: Vec<Coordinate>,
    pub status: RouteStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Route {
    pub fn resolved(point: &IncidentPoint, destination: Coordinate, path: RoutePath) -> Self {
        Self {
            point_id: point.id,
            cluster_id: point.cluster_id,
            origin: point.coordinate(),
            destination: Some(destination),
            waypoints: path.waypoints,
            status: RouteStatus::Resolved,
            distance_m: path.distance_m,
            duration_s: path.duration_s,
            error: None,
        }
    }

    pub fn failed(
        point: &IncidentPoint,
        destination: Option<Coordinate>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            point_id: point.id,
            cluster_id: point.cluster_id,
            origin: point.coordinate(),
            destination,
            waypoints: Vec::new(),
            status: RouteStatus::Failed,
            distance_m: None,
            duration_s: None,
            error: Some(error.into()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status == RouteStatus::Resolved
    }
}

/// Member listing for one group, as shown to dispatchers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupDetails {
    pub cluster_id: usize,
    pub label: String,
    pub centroid: Coordinate,
    pub members: Vec<GroupMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMember {
    pub id: usize,
    pub place_name: String,
}
