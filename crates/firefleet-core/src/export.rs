//! GeoJSON export of a finished plan for map renderers.

use crate::models::Coordinate;
use crate::plan::DispatchPlan;
use serde_json::{json, Map, Value};

fn position(coordinate: Coordinate) -> Value {
    json!([coordinate.lon, coordinate.lat])
}

/// Incidents, dispatch locations and resolved routes as one FeatureCollection.
///
/// Every feature carries a `kind` property (`incident`, `dispatch`, `route`)
/// and the label of its group. Positions are lon/lat.
pub fn to_feature_collection(plan: &DispatchPlan) -> Value {
    let mut features = Vec::with_capacity(plan.points.len() * 2 + plan.groups.len());

    for point in &plan.points {
        let mut properties = point.properties.clone().unwrap_or_default();
        properties.insert("kind".to_string(), json!("incident"));
        properties.insert("incident_id".to_string(), json!(point.id));
        properties.insert("cluster_id".to_string(), json!(point.cluster_id));
        properties.insert(
            "group".to_string(),
            json!(plan.group(point.cluster_id).map(|g| g.label.as_str())),
        );
        properties.insert("place_name".to_string(), json!(point.place_name));
        features.push(feature(
            json!({"type": "Point", "coordinates": position(point.coordinate())}),
            properties,
        ));
    }

    for group in &plan.groups {
        let mut properties = Map::new();
        properties.insert("kind".to_string(), json!("dispatch"));
        properties.insert("cluster_id".to_string(), json!(group.cluster_id));
        properties.insert("group".to_string(), json!(group.label));
        properties.insert("members".to_string(), json!(group.len()));
        features.push(feature(
            json!({"type": "Point", "coordinates": position(group.centroid)}),
            properties,
        ));
    }

    for route in plan.routes.iter().filter(|route| route.is_resolved()) {
        let mut properties = Map::new();
        properties.insert("kind".to_string(), json!("route"));
        properties.insert("incident_id".to_string(), json!(route.point_id));
        properties.insert("cluster_id".to_string(), json!(route.cluster_id));
        properties.insert("distance_m".to_string(), json!(route.distance_m));
        properties.insert("duration_s".to_string(), json!(route.duration_s));
        let coordinates: Vec<Value> = route.waypoints.iter().copied().map(position).collect();
        features.push(feature(
            json!({"type": "LineString", "coordinates": coordinates}),
            properties,
        ));
    }

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

fn feature(geometry: Value, properties: Map<String, Value>) -> Value {
    json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": properties,
    })
}
