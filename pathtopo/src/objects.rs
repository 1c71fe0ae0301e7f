//! Nearby objects layer: GeoJSON features of the same kind as the edited
//! object, keyed by primary key.

use std::collections::BTreeMap;

use geojson::{Feature, GeoJson, Value};
use log::{debug, warn};

use crate::error::{Result, TopologyError};
use crate::geometry::limits;
use crate::model::LatLng;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    Point,
    Line,
    Polygon,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ObjectFeature {
    pub pk: u32,
    pub kind: ShapeKind,
    pub parts: Vec<Vec<LatLng>>,
}

#[derive(Clone, Debug, Default)]
pub struct ObjectsLayer {
    pub(crate) features: BTreeMap<u32, ObjectFeature>,
}

impl ObjectsLayer {
    /// Parse a FeatureCollection (or a single Feature). Features whose `pk`
    /// equals `exclude` are left out, so the object being edited does not
    /// show up as its own snapping target.
    pub fn from_geojson_str(text: &str, exclude: Option<u32>) -> Result<Self> {
        let gj: GeoJson = text
            .parse()
            .map_err(|e: geojson::Error| TopologyError::GraphLoad(e.to_string()))?;
        let features = match gj {
            GeoJson::FeatureCollection(fc) => fc.features,
            GeoJson::Feature(f) => vec![f],
            GeoJson::Geometry(_) => {
                return Err(TopologyError::GraphLoad("expected features, got a bare geometry".into()))
            }
        };
        if features.len() > limits::MAX_OBJECTS {
            return Err(TopologyError::GraphLoad("objects layer exceeds size limits".into()));
        }
        let mut layer = ObjectsLayer::default();
        let mut points_total = 0usize;
        for f in &features {
            let Some(pk) = feature_pk(f) else {
                warn!("objects layer: feature without pk skipped");
                continue;
            };
            if Some(pk) == exclude {
                continue;
            }
            let Some(geometry) = f.geometry.as_ref() else { continue };
            let Some((kind, parts)) = convert_value(&geometry.value)? else {
                debug!("objects layer: unsupported geometry for pk {pk}");
                continue;
            };
            points_total += parts.iter().map(Vec::len).sum::<usize>();
            if points_total > limits::MAX_POINTS_TOTAL {
                return Err(TopologyError::GraphLoad("too many geometry points".into()));
            }
            layer.features.insert(pk, ObjectFeature { pk, kind, parts });
        }
        Ok(layer)
    }

    pub fn get(&self, pk: u32) -> Option<&ObjectFeature> {
        self.features.get(&pk)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectFeature> {
        self.features.values()
    }
}

fn feature_pk(f: &Feature) -> Option<u32> {
    let as_u32 = |v: &serde_json::Value| match v {
        serde_json::Value::Number(n) => n.as_u64().and_then(|x| u32::try_from(x).ok()),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    };
    if let Some(pk) = f.property("pk").and_then(as_u32) {
        return Some(pk);
    }
    match f.id.as_ref()? {
        geojson::feature::Id::Number(n) => n.as_u64().and_then(|x| u32::try_from(x).ok()),
        geojson::feature::Id::String(s) => s.parse().ok(),
    }
}

fn convert_position(p: &[f64]) -> Result<LatLng> {
    match p {
        [lng, lat, ..] if limits::in_coord_bounds(*lng) && limits::in_coord_bounds(*lat) => {
            Ok(LatLng::new(*lat, *lng))
        }
        _ => Err(TopologyError::GraphLoad("invalid position".into())),
    }
}

fn convert_line(line: &[Vec<f64>]) -> Result<Vec<LatLng>> {
    if line.len() > limits::MAX_POINTS_PER_GEOMETRY {
        return Err(TopologyError::GraphLoad("geometry too large".into()));
    }
    line.iter().map(|p| convert_position(p)).collect()
}

fn convert_value(value: &Value) -> Result<Option<(ShapeKind, Vec<Vec<LatLng>>)>> {
    let out = match value {
        Value::Point(p) => Some((ShapeKind::Point, vec![vec![convert_position(p)?]])),
        Value::MultiPoint(ps) => Some((
            ShapeKind::Point,
            ps.iter().map(|p| convert_position(p).map(|c| vec![c])).collect::<Result<_>>()?,
        )),
        Value::LineString(line) => Some((ShapeKind::Line, vec![convert_line(line)?])),
        Value::MultiLineString(lines) => Some((
            ShapeKind::Line,
            lines.iter().map(|l| convert_line(l)).collect::<Result<_>>()?,
        )),
        Value::Polygon(rings) => Some((
            ShapeKind::Polygon,
            rings.iter().map(|r| convert_line(r)).collect::<Result<_>>()?,
        )),
        Value::MultiPolygon(_) | Value::GeometryCollection(_) => None,
    };
    Ok(out)
}
