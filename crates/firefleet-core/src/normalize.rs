//! Coordinate normalization.
//!
//! Every input geometry is repaired, reduced to one representative point and
//! brought into WGS84 lon/lat so the partitioner can treat it as flat (x, y).

use crate::error::{PipelineError, PlanWarning, Result};
use crate::geojson::{Crs, IncidentCollection, Position, RawGeometry};
use crate::models::NormalizedPoint;
use crate::spatial::web_mercator_to_wgs84;
use geo::{Centroid, Coord, Geometry, GeometryCollection, LineString, MultiPoint, Point, Polygon};

/// Geographic systems whose lon/lat we take as WGS84 without a datum shift.
const GEOGRAPHIC_EPSG: &[u32] = &[4326, 4269, 4258, 4283, 4979];
const WEB_MERCATOR_EPSG: &[u32] = &[3857, 3785, 900913, 102100, 102113];

/// Output of [`normalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub points: Vec<NormalizedPoint>,
    pub warnings: Vec<PlanWarning>,
}

#[derive(Debug, Clone, PartialEq)]
enum Reprojection {
    Identity,
    WebMercator,
    Unsupported(String),
}

impl Reprojection {
    fn for_crs(crs: Option<&Crs>) -> Self {
        match crs {
            None | Some(Crs::Crs84) => Reprojection::Identity,
            Some(Crs::Epsg(code)) if GEOGRAPHIC_EPSG.contains(code) => Reprojection::Identity,
            Some(Crs::Epsg(code)) if WEB_MERCATOR_EPSG.contains(code) => Reprojection::WebMercator,
            Some(other) => Reprojection::Unsupported(other.name()),
        }
    }

    fn apply(&self, point: Point<f64>) -> (f64, f64) {
        match self {
            Reprojection::WebMercator => web_mercator_to_wgs84(point.x(), point.y()),
            Reprojection::Identity | Reprojection::Unsupported(_) => (point.x(), point.y()),
        }
    }
}

/// Produce one WGS84 point per usable feature.
///
/// Fails only when nothing in the collection yields a coordinate.
pub fn normalize(collection: &IncidentCollection) -> Result<Normalized> {
    let reprojection = Reprojection::for_crs(collection.crs.as_ref());
    let mut warnings = Vec::new();
    if let Reprojection::Unsupported(name) = &reprojection {
        tracing::warn!("Unsupported CRS {}, passing coordinates through", name);
        warnings.push(PlanWarning::UnsupportedCrs { name: name.clone() });
    }

    let mut points = Vec::with_capacity(collection.len());
    for (index, feature) in collection.features.iter().enumerate() {
        let Some(raw) = feature.geometry.as_ref() else {
            skip(&mut warnings, index, "feature has a null geometry");
            continue;
        };
        let Some(point) = repair(raw).as_ref().and_then(representative_point) else {
            skip(&mut warnings, index, "geometry has no valid coordinates");
            continue;
        };

        let (lon, lat) = reprojection.apply(point);
        if !lon.is_finite() || !lat.is_finite() {
            skip(&mut warnings, index, "reprojection produced a non-finite coordinate");
            continue;
        }

        points.push(NormalizedPoint {
            id: index,
            lon,
            lat,
            properties: feature.properties.clone(),
        });
    }

    if points.is_empty() {
        return Err(PipelineError::Schema(format!(
            "none of the {} features yields a coordinate",
            collection.len()
        )));
    }

    tracing::debug!(
        "Normalized {} of {} features",
        points.len(),
        collection.len()
    );
    Ok(Normalized { points, warnings })
}

fn skip(warnings: &mut Vec<PlanWarning>, index: usize, reason: &str) {
    tracing::warn!("Skipping feature {}: {}", index, reason);
    warnings.push(PlanWarning::SkippedFeature {
        index,
        reason: reason.to_string(),
    });
}

fn representative_point(geometry: &Geometry<f64>) -> Option<Point<f64>> {
    let point = match geometry {
        Geometry::Point(point) => Some(*point),
        other => other.centroid(),
    };
    point.filter(|point| point.x().is_finite() && point.y().is_finite())
}

/// Repair a raw geometry into something with a well-defined centroid.
///
/// Invalid positions are dropped, repeated vertices collapsed, rings closed,
/// and parts that degenerate fall back to the lower-dimension shape they still
/// describe. Returns `None` when nothing usable remains.
fn repair(raw: &RawGeometry) -> Option<Geometry<f64>> {
    match raw {
        RawGeometry::Point { coordinates } => to_coord(coordinates).map(|c| Point::from(c).into()),
        RawGeometry::MultiPoint { coordinates } => {
            let points: Vec<Point<f64>> = coordinates
                .iter()
                .filter_map(to_coord)
                .map(Point::from)
                .collect();
            if points.is_empty() {
                None
            } else {
                Some(MultiPoint::new(points).into())
            }
        }
        RawGeometry::LineString { coordinates } => repair_line(coordinates),
        RawGeometry::MultiLineString { coordinates } => {
            collect_parts(coordinates.iter().map(|line| repair_line(line)))
        }
        RawGeometry::Polygon { coordinates } => repair_polygon(coordinates),
        RawGeometry::MultiPolygon { coordinates } => {
            collect_parts(coordinates.iter().map(|rings| repair_polygon(rings)))
        }
        RawGeometry::GeometryCollection { geometries } => {
            collect_parts(geometries.iter().map(repair))
        }
    }
}

fn to_coord(position: &Position) -> Option<Coord<f64>> {
    match position.as_slice() {
        [x, y, ..] if x.is_finite() && y.is_finite() => Some(Coord { x: *x, y: *y }),
        _ => None,
    }
}

fn clean_coords(positions: &[Position]) -> Vec<Coord<f64>> {
    let mut coords: Vec<Coord<f64>> = positions.iter().filter_map(to_coord).collect();
    coords.dedup();
    coords
}

fn repair_line(positions: &[Position]) -> Option<Geometry<f64>> {
    let coords = clean_coords(positions);
    match coords.len() {
        0 => None,
        1 => Some(Point::from(coords[0]).into()),
        _ => Some(LineString::new(coords).into()),
    }
}

fn repair_polygon(rings: &[Vec<Position>]) -> Option<Geometry<f64>> {
    let (exterior, interiors) = rings.split_first()?;
    let mut shell = clean_coords(exterior);
    if shell.len() > 1 && shell.first() == shell.last() {
        shell.pop();
    }
    if shell.len() < 3 {
        return match shell.len() {
            0 => None,
            1 => Some(Point::from(shell[0]).into()),
            _ => Some(LineString::new(shell).into()),
        };
    }

    let holes = interiors
        .iter()
        .map(|ring| clean_coords(ring))
        .filter(|ring| ring.len() >= 3)
        .map(LineString::new)
        .collect();
    // Polygon::new closes any ring left open.
    Some(Polygon::new(LineString::new(shell), holes).into())
}

fn collect_parts<I>(parts: I) -> Option<Geometry<f64>>
where
    I: Iterator<Item = Option<Geometry<f64>>>,
{
    let parts: Vec<Geometry<f64>> = parts.flatten().collect();
    if parts.is_empty() {
        None
    } else {
        Some(Geometry::GeometryCollection(GeometryCollection::new_from(parts)))
    }
}
