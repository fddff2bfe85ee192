//! Dispatch locations: one staging point per vehicle group.

use crate::error::PlanWarning;
use crate::models::{ClusterGroup, Coordinate, IncidentPoint};
use crate::spatial::BoundingBox;

/// Groups with a staging point, plus what could not be placed.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchLocations {
    pub groups: Vec<ClusterGroup>,
    pub warnings: Vec<PlanWarning>,
}

/// Mean longitude and mean latitude of the given coordinates.
///
/// Summation runs in input order, so the same members always give a
/// bit-identical result. Returns `None` for an empty group.
pub fn centroid(members: &[Coordinate]) -> Option<Coordinate> {
    let bbox = BoundingBox::from_coordinates(members.iter().copied())?;
    let count = members.len() as f64;
    let (sum_lon, sum_lat) = members
        .iter()
        .fold((0.0, 0.0), |(lon, lat), c| (lon + c.lon, lat + c.lat));
    // Rounding can push the mean past the member extent; clamp back into it.
    Some(bbox.clamp(Coordinate::new(sum_lon / count, sum_lat / count)))
}

/// Build one [`ClusterGroup`] per cluster id that has members.
///
/// Requested groups with no members get no dispatch location; they are
/// reported once as [`PlanWarning::DegenerateCluster`]. Only ids that occur
/// on `points` are bucketed, so `requested` may be arbitrarily large.
pub fn locate_dispatch(points: &[IncidentPoint], requested: usize) -> DispatchLocations {
    let slots = points.iter().map(|p| p.cluster_id + 1).max().unwrap_or(0);
    let mut members: Vec<Vec<&IncidentPoint>> = vec![Vec::new(); slots];
    for point in points {
        members[point.cluster_id].push(point);
    }

    let mut groups = Vec::new();
    for (cluster_id, group) in members.iter().enumerate() {
        let coordinates: Vec<Coordinate> = group.iter().map(|p| p.coordinate()).collect();
        let Some(center) = centroid(&coordinates) else {
            tracing::debug!("Cluster {} has no members, no dispatch location", cluster_id);
            continue;
        };
        groups.push(ClusterGroup {
            cluster_id,
            label: ClusterGroup::label_for(cluster_id),
            centroid: center,
            member_ids: group.iter().map(|p| p.id).collect(),
        });
    }

    let mut warnings = Vec::new();
    if groups.len() < requested {
        tracing::warn!(
            "Only {} of {} vehicle groups could be populated; the rest are omitted",
            groups.len(),
            requested
        );
        warnings.push(PlanWarning::DegenerateCluster {
            requested,
            populated: groups.len(),
        });
    }

    DispatchLocations { groups, warnings }
}
