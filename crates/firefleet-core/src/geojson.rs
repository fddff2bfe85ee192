//! GeoJSON input reader.
//!
//! Geometry is kept exactly as written (raw positions) so the normalizer can
//! decide how to repair it.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

const GEOMETRY_TYPES: &[&str] = &[
    "Point",
    "MultiPoint",
    "LineString",
    "MultiLineString",
    "Polygon",
    "MultiPolygon",
    "GeometryCollection",
];

/// A GeoJSON position. Anything past the second element (elevation) is ignored.
pub type Position = Vec<f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RawGeometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<RawGeometry> },
}

/// Coordinate reference system declared by a legacy `crs` member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Crs {
    /// OGC CRS84: WGS84 with longitude first.
    Crs84,
    Epsg(u32),
    /// A name we could not map to an EPSG code.
    Named(String),
}

impl Crs {
    /// Parse the forms seen in the wild: `EPSG:4326`,
    /// `urn:ogc:def:crs:EPSG::3857`, `http://www.opengis.net/def/crs/EPSG/0/4326`
    /// and `urn:ogc:def:crs:OGC:1.3:CRS84`.
    pub fn parse(name: &str) -> Self {
        let trimmed = name.trim();
        let upper = trimmed.to_ascii_uppercase();
        if upper.ends_with("CRS84") {
            return Crs::Crs84;
        }
        if upper.contains("EPSG") {
            let digits: String = upper
                .chars()
                .rev()
                .take_while(|c| c.is_ascii_digit())
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            if let Ok(code) = digits.parse() {
                return Crs::Epsg(code);
            }
        }
        Crs::Named(trimmed.to_string())
    }

    fn from_member(value: &Value) -> Option<Self> {
        let name = value.get("properties")?.get("name")?.as_str()?;
        Some(Self::parse(name))
    }

    pub fn name(&self) -> String {
        match self {
            Crs::Crs84 => "OGC:CRS84".to_string(),
            Crs::Epsg(code) => format!("EPSG:{}", code),
            Crs::Named(name) => name.clone(),
        }
    }
}

/// One record of the input: a geometry (possibly null) and its attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFeature {
    pub geometry: Option<RawGeometry>,
    pub properties: Option<Map<String, Value>>,
}

/// The parsed input file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentCollection {
    pub crs: Option<Crs>,
    pub features: Vec<SourceFeature>,
}

impl IncidentCollection {
    /// Build a CRS-less collection of bare points given as (lon, lat).
    pub fn from_points(points: &[(f64, f64)]) -> Self {
        Self {
            crs: None,
            features: points
                .iter()
                .map(|&(lon, lat)| SourceFeature {
                    geometry: Some(RawGeometry::Point {
                        coordinates: vec![lon, lat],
                    }),
                    properties: None,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Read and parse a GeoJSON file.
pub fn read_geojson(path: impl AsRef<Path>) -> Result<IncidentCollection> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let collection = parse_geojson(&text)?;
    tracing::debug!(
        "Read {} features from {}",
        collection.len(),
        path.as_ref().display()
    );
    Ok(collection)
}

/// Parse a FeatureCollection, a single Feature, or a bare Geometry.
pub fn parse_geojson(text: &str) -> Result<IncidentCollection> {
    let document: Value = serde_json::from_str(text)?;
    let Value::Object(mut object) = document else {
        return Err(PipelineError::Schema(
            "top-level JSON value is not a GeoJSON object".to_string(),
        ));
    };

    let crs = object.get("crs").and_then(Crs::from_member);
    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| PipelineError::Schema("GeoJSON object has no type".to_string()))?;

    let features = match kind.as_str() {
        "FeatureCollection" => {
            let Some(Value::Array(items)) = object.remove("features") else {
                return Err(PipelineError::Schema(
                    "FeatureCollection has no features array".to_string(),
                ));
            };
            if !items.is_empty() && !items.iter().any(|item| item.get("geometry").is_some()) {
                return Err(PipelineError::Schema(
                    "features carry no geometry attribute".to_string(),
                ));
            }
            items
                .into_iter()
                .map(parse_feature)
                .collect::<Result<Vec<_>>>()?
        }
        "Feature" => {
            if !object.contains_key("geometry") {
                return Err(PipelineError::Schema(
                    "feature carries no geometry attribute".to_string(),
                ));
            }
            vec![parse_feature(Value::Object(object))?]
        }
        kind if GEOMETRY_TYPES.contains(&kind) => vec![SourceFeature {
            geometry: Some(serde_json::from_value(Value::Object(object))?),
            properties: None,
        }],
        other => {
            return Err(PipelineError::Schema(format!(
                "unsupported GeoJSON type {}",
                other
            )))
        }
    };

    Ok(IncidentCollection { crs, features })
}

fn parse_feature(value: Value) -> Result<SourceFeature> {
    let Value::Object(mut object) = value else {
        return Err(PipelineError::Schema("feature is not a JSON object".to_string()));
    };

    let geometry = match object.remove("geometry") {
        None | Some(Value::Null) => None,
        Some(geometry) => Some(serde_json::from_value(geometry)?),
    };
    let properties = match object.remove("properties") {
        Some(Value::Object(map)) => Some(map),
        _ => None,
    };

    Ok(SourceFeature {
        geometry,
        properties,
    })
}
