//! Fire vehicle dispatch planning.
//!
//! Clusters incident locations into one group per vehicle, places each vehicle
//! at its group's centroid, and resolves driving routes from every incident to
//! its vehicle through an external routing service.

pub mod annotate;
pub mod dispatch;
pub mod error;
pub mod export;
pub mod geojson;
pub mod models;
pub mod normalize;
pub mod partition;
pub mod plan;
pub mod routing;
pub mod services;
pub mod spatial;

pub use dispatch::{centroid, locate_dispatch, DispatchLocations};
pub use error::{PipelineError, PlanWarning, ServiceError};
pub use export::to_feature_collection;
pub use geojson::{parse_geojson, read_geojson, Crs, IncidentCollection, RawGeometry, SourceFeature};
pub use models::{
    ClusterGroup, Coordinate, GroupDetails, GroupMember, IncidentPoint, NormalizedPoint, Route,
    RoutePath, RouteStatus, UNKNOWN_PLACE,
};
pub use normalize::{normalize, Normalized};
pub use partition::{partition, KMeansConfig, Partition};
pub use plan::{plan_dispatch, validate_vehicle_count, DispatchPlan, PlanOptions};
pub use routing::{resolve_route, resolve_routes, RouteOptions};
pub use services::{Geocoder, RoutingService, DRIVING_PROFILE};
pub use spatial::haversine_distance;
