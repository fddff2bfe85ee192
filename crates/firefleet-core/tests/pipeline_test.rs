//! End-to-end pipeline tests with in-process routing and geocoding services.

use firefleet_core::spatial::BoundingBox;
use firefleet_core::{
    centroid, parse_geojson, plan_dispatch, to_feature_collection, validate_vehicle_count,
    Coordinate, Geocoder, IncidentCollection, KMeansConfig, PipelineError, PlanOptions,
    PlanWarning, RouteOptions, RoutePath, RouteStatus, RoutingService, ServiceError,
    UNKNOWN_PLACE,
};
use std::collections::HashSet;
use std::time::Duration;

fn seeded(seed: u64) -> PlanOptions {
    PlanOptions {
        kmeans: KMeansConfig {
            seed: Some(seed),
            ..KMeansConfig::default()
        },
    }
}

/// Returns a straight two-point path from origin to destination.
struct StraightLine;

impl RoutingService for StraightLine {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        _profile: &str,
    ) -> Result<RoutePath, ServiceError> {
        Ok(RoutePath {
            waypoints: vec![origin, destination],
            distance_m: Some(1234.5),
            duration_s: Some(60.0),
        })
    }
}

struct Offline;

impl RoutingService for Offline {
    async fn route(
        &self,
        _origin: Coordinate,
        _destination: Coordinate,
        _profile: &str,
    ) -> Result<RoutePath, ServiceError> {
        Err(ServiceError::Transport("operation timed out".to_string()))
    }
}

impl Geocoder for Offline {
    async fn reverse(&self, _lat: f64, _lon: f64) -> Result<Option<String>, ServiceError> {
        Err(ServiceError::Transport("operation timed out".to_string()))
    }
}

struct Township;

impl Geocoder for Township {
    async fn reverse(&self, _lat: f64, lon: f64) -> Result<Option<String>, ServiceError> {
        Ok(Some(if lon < 5.0 { "West Station" } else { "East Station" }.to_string()))
    }
}

/// Answers for incidents west of 5°E, hangs for the rest.
struct HalfReachable;

impl RoutingService for HalfReachable {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        _profile: &str,
    ) -> Result<RoutePath, ServiceError> {
        if origin.lon < 5.0 {
            Ok(RoutePath::new(vec![origin, destination]))
        } else {
            std::future::pending().await
        }
    }
}

impl Geocoder for HalfReachable {
    async fn reverse(&self, _lat: f64, lon: f64) -> Result<Option<String>, ServiceError> {
        if lon < 5.0 {
            Ok(Some("West".to_string()))
        } else {
            std::future::pending().await
        }
    }
}

#[test]
fn two_pairs_make_two_groups() {
    let collection =
        IncidentCollection::from_points(&[(0.0, 0.0), (0.0, 1.0), (10.0, 0.0), (10.0, 1.0)]);
    let plan = plan_dispatch(&collection, 2, &seeded(11)).unwrap();

    assert_eq!(plan.groups.len(), 2);
    assert!(plan.warnings.is_empty());
    let mut centers: Vec<(f64, f64)> = plan
        .groups
        .iter()
        .map(|g| (g.centroid.lon, g.centroid.lat))
        .collect();
    centers.sort_by(|a, b| a.0.total_cmp(&b.0));
    assert!((centers[0].0 - 0.0).abs() < 1e-9 && (centers[0].1 - 0.5).abs() < 1e-9);
    assert!((centers[1].0 - 10.0).abs() < 1e-9 && (centers[1].1 - 0.5).abs() < 1e-9);
    for group in &plan.groups {
        assert_eq!(group.len(), 2);
    }
}

#[test]
fn groups_cover_every_point_once() {
    let coords: Vec<(f64, f64)> = (0..45)
        .map(|i| (-120.0 + (i % 9) as f64 * 0.05, 38.0 + (i / 9) as f64 * 0.04 + i as f64 * 1e-4))
        .collect();
    let collection = IncidentCollection::from_points(&coords);

    for n in [1, 3, 7, 45] {
        let plan = plan_dispatch(&collection, n, &seeded(5)).unwrap();
        assert_eq!(plan.groups.len(), n);

        let mut seen = HashSet::new();
        for group in &plan.groups {
            for id in &group.member_ids {
                assert!(seen.insert(*id), "point {id} in two groups");
            }
        }
        assert_eq!(seen.len(), coords.len());

        let ids: HashSet<usize> = plan.groups.iter().map(|g| g.cluster_id).collect();
        assert_eq!(ids, (0..n).collect::<HashSet<_>>());
    }
}

#[test]
fn centroids_lie_inside_member_extent_and_recompute_identically() {
    let coords: Vec<(f64, f64)> = (0..30)
        .map(|i| (2.2 + (i * 7 % 13) as f64 * 0.011, 48.8 + (i * 5 % 11) as f64 * 0.007))
        .collect();
    let plan = plan_dispatch(&IncidentCollection::from_points(&coords), 4, &seeded(9)).unwrap();

    for group in &plan.groups {
        let members: Vec<Coordinate> = plan.members(group.cluster_id).map(|p| p.coordinate()).collect();
        let bbox = BoundingBox::from_coordinates(members.iter().copied()).unwrap();
        assert!(bbox.contains(group.centroid));

        let again = centroid(&members).unwrap();
        assert_eq!(again.lon.to_bits(), group.centroid.lon.to_bits());
        assert_eq!(again.lat.to_bits(), group.centroid.lat.to_bits());
    }
}

#[test]
fn more_vehicles_than_points_omits_empty_groups() {
    let collection = IncidentCollection::from_points(&[(0.0, 0.0), (3.0, 4.0), (8.0, 1.0)]);
    let plan = plan_dispatch(&collection, 5, &seeded(2)).unwrap();

    assert_eq!(plan.vehicle_count, 5);
    assert_eq!(plan.groups.len(), 3);
    assert!(plan.groups.iter().all(|g| !g.is_empty()));
    assert_eq!(
        plan.warnings,
        vec![PlanWarning::DegenerateCluster {
            requested: 5,
            populated: 3
        }]
    );
}

#[test]
fn enormous_vehicle_count_degrades_to_point_count() {
    let collection = IncidentCollection::from_points(&[(0.0, 0.0), (3.0, 4.0), (8.0, 1.0)]);
    let vehicles = validate_vehicle_count(i64::MAX).unwrap();
    let plan = plan_dispatch(&collection, vehicles, &seeded(1)).unwrap();

    assert_eq!(plan.groups.len(), 3);
    assert_eq!(
        plan.warnings,
        vec![PlanWarning::DegenerateCluster {
            requested: vehicles,
            populated: 3
        }]
    );
}

#[test]
fn vehicle_count_is_validated_before_reading_input() {
    assert!(matches!(
        validate_vehicle_count(0),
        Err(PipelineError::InvalidClusterCount { requested: 0 })
    ));
    assert!(matches!(
        validate_vehicle_count(-3),
        Err(PipelineError::InvalidClusterCount { requested: -3 })
    ));
    assert_eq!(validate_vehicle_count(4).unwrap(), 4);

    // Even an unusable collection reports the count problem first.
    let empty = IncidentCollection {
        crs: None,
        features: Vec::new(),
    };
    assert!(matches!(
        plan_dispatch(&empty, 0, &PlanOptions::default()),
        Err(PipelineError::InvalidClusterCount { .. })
    ));
    assert!(matches!(
        plan_dispatch(&empty, 2, &PlanOptions::default()),
        Err(PipelineError::Schema(_))
    ));
}

#[test]
fn geojson_properties_survive_to_export() {
    let collection = parse_geojson(
        r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"incident": "A-17"},
             "geometry": {"type": "Point", "coordinates": [-3.70, 40.41]}},
            {"type": "Feature", "properties": {"incident": "A-18"}, "geometry": null},
            {"type": "Feature", "properties": {"incident": "A-19"},
             "geometry": {"type": "Point", "coordinates": [-3.68, 40.42]}}
        ]}"#,
    )
    .unwrap();
    let plan = plan_dispatch(&collection, 1, &seeded(3)).unwrap();

    assert_eq!(plan.points.len(), 2);
    assert_eq!(plan.points[1].id, 2);
    assert!(matches!(
        plan.warnings.as_slice(),
        [PlanWarning::SkippedFeature { index: 1, .. }]
    ));

    let exported = to_feature_collection(&plan);
    assert_eq!(exported["features"][1]["properties"]["incident"], "A-19");
}

#[tokio::test]
async fn offline_services_degrade_without_aborting() {
    let collection =
        IncidentCollection::from_points(&[(0.0, 0.0), (0.0, 1.0), (10.0, 0.0), (10.0, 1.0)]);
    let mut plan = plan_dispatch(&collection, 2, &seeded(4)).unwrap();

    plan.annotate_places(&Offline, 4).await;
    plan.resolve_routes(&Offline, &RouteOptions::default()).await;

    assert_eq!(plan.points.len(), 4);
    assert_eq!(plan.groups.len(), 2);
    assert_eq!(plan.routes.len(), 4);
    assert!(plan.routes.iter().all(|r| r.status == RouteStatus::Failed));
    assert!(plan
        .points
        .iter()
        .all(|p| p.place_name.as_deref() == Some(UNKNOWN_PLACE)));

    let exported = to_feature_collection(&plan);
    assert_eq!(exported["features"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn enrichment_fills_names_and_routes() {
    let collection =
        IncidentCollection::from_points(&[(0.0, 0.0), (0.0, 1.0), (10.0, 0.0), (10.0, 1.0)]);
    let mut plan = plan_dispatch(&collection, 2, &seeded(8)).unwrap();
    let before: Vec<(usize, f64, f64, usize)> = plan
        .points
        .iter()
        .map(|p| (p.id, p.lon, p.lat, p.cluster_id))
        .collect();

    plan.annotate_places(&Township, 2).await;
    plan.resolve_routes(&StraightLine, &RouteOptions::default()).await;

    let after: Vec<(usize, f64, f64, usize)> = plan
        .points
        .iter()
        .map(|p| (p.id, p.lon, p.lat, p.cluster_id))
        .collect();
    assert_eq!(before, after);

    for route in &plan.routes {
        assert_eq!(route.status, RouteStatus::Resolved);
        let group = plan.group(route.cluster_id).unwrap();
        assert_eq!(route.waypoints.first(), Some(&route.origin));
        assert_eq!(route.waypoints.last(), Some(&group.centroid));
        assert_eq!(route.distance_m, Some(1234.5));
    }

    let west = plan.points[0].cluster_id;
    let details = plan.group_details(west).unwrap();
    assert_eq!(details.members.len(), 2);
    assert!(details.members.iter().all(|m| m.place_name == "West Station"));
    assert_eq!(plan.routes_for(west).count(), 2);
    assert!(plan.group_details(99).is_none());
}

#[tokio::test]
async fn interrupted_enrichment_keeps_partial_results() {
    let collection =
        IncidentCollection::from_points(&[(0.0, 0.0), (0.0, 1.0), (10.0, 0.0), (10.0, 1.0)]);
    let mut plan = plan_dispatch(&collection, 2, &seeded(8)).unwrap();
    let limit = Duration::from_millis(200);

    let named = tokio::time::timeout(limit, plan.annotate_places(&HalfReachable, 4)).await;
    assert!(named.is_err());
    let names: Vec<Option<&str>> = plan.points.iter().map(|p| p.place_name.as_deref()).collect();
    assert_eq!(names, vec![Some("West"), Some("West"), None, None]);

    let routed = tokio::time::timeout(
        limit,
        plan.resolve_routes(&HalfReachable, &RouteOptions::default()),
    )
    .await;
    assert!(routed.is_err());
    let ids: Vec<usize> = plan.routes.iter().map(|r| r.point_id).collect();
    assert_eq!(ids, vec![0, 1]);
    assert!(plan.routes.iter().all(|r| r.status == RouteStatus::Resolved));
    assert_eq!(plan.groups.len(), 2);
}
