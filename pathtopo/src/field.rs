//! The persisted form field: one textual value, one writer.

use geojson::GeoJson;
use log::warn;
use serde_json::Value;

use crate::error::{Result, TopologyError};
use crate::geometry::limits::MAX_FIELD_LEN;
use crate::model::{LatLng, StoredValue, Topology};
use crate::signal::Signal;

/// Classify raw field content. Empty content means "nothing stored yet".
pub fn parse_field(text: &str) -> Result<Option<StoredValue>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    if text.len() > MAX_FIELD_LEN {
        return Err(TopologyError::Decode("field value too large".into()));
    }
    let value: Value = serde_json::from_str(text).map_err(|e| TopologyError::Decode(e.to_string()))?;
    let Some(obj) = value.as_object() else {
        return Err(TopologyError::Decode("field value is not an object".into()));
    };
    if obj.contains_key("paths") {
        let t: Topology = serde_json::from_value(value).map_err(|e| TopologyError::Decode(e.to_string()))?;
        return Ok(Some(StoredValue::Path(t)));
    }
    if obj.contains_key("lat") && obj.contains_key("lng") {
        let p: LatLng = serde_json::from_value(value).map_err(|e| TopologyError::Decode(e.to_string()))?;
        if !p.is_finite() {
            return Err(TopologyError::Decode("point is not finite".into()));
        }
        return Ok(Some(StoredValue::Point(p)));
    }
    match text.parse::<GeoJson>() {
        Ok(GeoJson::Geometry(g)) => Ok(Some(StoredValue::Geometry(g))),
        Ok(_) => Err(TopologyError::Decode("expected a bare geometry".into())),
        Err(e) => Err(TopologyError::Decode(e.to_string())),
    }
}

/// Hidden field holding the serialized value. Every write replaces the whole
/// value, so readers never see a half-built record.
#[derive(Debug, Default)]
pub struct PersistedField {
    value: String,
    /// Fired after every write with the new raw value.
    pub stored: Signal<String>,
}

impl PersistedField {
    pub fn new(initial: impl Into<String>) -> Self {
        PersistedField { value: initial.into(), stored: Signal::new() }
    }

    pub fn raw(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }

    pub fn read(&self) -> Result<Option<StoredValue>> {
        parse_field(&self.value)
    }

    /// Read, treating malformed content as empty.
    pub fn read_lenient(&self) -> Option<StoredValue> {
        match self.read() {
            Ok(v) => v,
            Err(e) => {
                warn!("ignoring field content: {e}");
                None
            }
        }
    }

    pub fn store_topology(&mut self, topology: &Topology) -> Result<()> {
        let text = serde_json::to_string(topology).map_err(|e| TopologyError::Encode(e.to_string()))?;
        self.write(text);
        Ok(())
    }

    pub fn store_point(&mut self, at: LatLng) -> Result<()> {
        let text = serde_json::to_string(&at).map_err(|e| TopologyError::Encode(e.to_string()))?;
        self.write(text);
        Ok(())
    }

    pub fn store_geometry(&mut self, geometry: &geojson::Geometry) {
        self.write(geometry.to_string());
    }

    pub fn clear(&mut self) {
        self.write(String::new());
    }

    fn write(&mut self, value: String) {
        self.value = value;
        self.stored.emit(&self.value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_means_nothing_stored() {
        assert_eq!(parse_field("").unwrap(), None);
        assert_eq!(parse_field("   ").unwrap(), None);
    }

    #[test]
    fn classifies_values() {
        let t = r#"{"offset":0,"start":0.5,"end":0.25,"paths":[3,4],
            "start_point":{"lat":1.0,"lng":2.0},"end_point":{"lat":3.0,"lng":4.0}}"#;
        match parse_field(t).unwrap() {
            Some(StoredValue::Path(t)) => assert_eq!(t.paths, vec![3, 4]),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            parse_field(r#"{"lat": 45.1, "lng": 5.7}"#).unwrap(),
            Some(StoredValue::Point(LatLng::new(45.1, 5.7)))
        );
        assert!(matches!(
            parse_field(r#"{"type":"LineString","coordinates":[[0,0],[1,1]]}"#).unwrap(),
            Some(StoredValue::Geometry(_))
        ));
    }

    #[test]
    fn malformed_is_decode_error() {
        assert!(matches!(parse_field("{oops"), Err(TopologyError::Decode(_))));
        assert!(matches!(parse_field("[1,2]"), Err(TopologyError::Decode(_))));
        assert!(matches!(parse_field(r#"{"paths": "x"}"#), Err(TopologyError::Decode(_))));
        let f = PersistedField::new("{oops");
        assert_eq!(f.read_lenient(), None);
    }

    #[test]
    fn writes_replace_whole_value() {
        let mut f = PersistedField::new("");
        f.store_point(LatLng::new(1.0, 2.0)).unwrap();
        assert_eq!(f.read().unwrap(), Some(StoredValue::Point(LatLng::new(1.0, 2.0))));
        f.clear();
        assert!(f.is_empty());
    }
}
