use std::sync::Once;

use log::{info, Level};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use pathtopo::{
    EditorSession, EditorSettings, LatLng, MultipathState, NetworkSnapshot, PathOutcome, PointState, Shape,
};

use crate::error;
use crate::interop::{arr_u32, flat_latlngs, new_obj, parse_latlngs, set_kv};
use crate::Editor;

static LOGGING: Once = Once::new();

#[wasm_bindgen]
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Route `log` output to the browser console. Unknown levels mean `info`.
#[wasm_bindgen]
pub fn init_logging(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::Info);
    LOGGING.call_once(|| {
        let _ = console_log::init_with_level(level);
    });
    set_panic_hook();
}

#[derive(Serialize)]
struct MarkerView {
    id: Option<u32>,
    lat: f64,
    lng: f64,
    bound: bool,
    edge: Option<u32>,
    fraction: Option<f64>,
}

fn finite(lat: f64, lng: f64) -> Result<LatLng, JsValue> {
    if !lat.is_finite() {
        return Err(error::non_finite("lat"));
    }
    if !lng.is_finite() {
        return Err(error::non_finite("lng"));
    }
    Ok(LatLng::new(lat, lng))
}

#[wasm_bindgen]
impl Editor {
    /// Build a session. `settings` is the JSON settings object; `graph` and
    /// `paths` together form the network snapshot. Throws an error envelope
    /// when the session cannot be built.
    #[wasm_bindgen(constructor)]
    pub fn new(
        settings: &str,
        field: &str,
        objects: Option<String>,
        graph: Option<String>,
        paths: Option<String>,
    ) -> Result<Editor, JsValue> {
        let settings = EditorSettings::from_json_str(settings).map_err(|e| error::topology(&e))?;
        let network = match (&graph, &paths) {
            (Some(graph), Some(paths)) => Some(NetworkSnapshot { graph: graph.as_str(), paths: paths.as_str() }),
            _ => None,
        };
        let session =
            EditorSession::new(settings, field, objects.as_deref(), network).map_err(|e| error::topology(&e))?;
        info!("editor ready in {:?} mode", session.settings().mode);
        Ok(Editor::rs_new(session))
    }

    pub fn field_value(&self) -> String {
        self.inner.field().raw().to_string()
    }

    /// Controller state as a snake_case name.
    pub fn state(&self) -> String {
        let name = if let Some(c) = self.inner.multipath() {
            match c.state() {
                MultipathState::Idle => "idle",
                MultipathState::OneEndpointPlaced => "one_endpoint_placed",
                MultipathState::PathComputed => "path_computed",
            }
        } else if let Some(c) = self.inner.point() {
            match c.state() {
                PointState::Idle => "idle",
                PointState::Placed => "placed",
            }
        } else if self.inner.shape().is_some() {
            "drawn"
        } else {
            "idle"
        };
        name.to_string()
    }

    pub fn set_zoom(&mut self, zoom: u8) {
        self.inner.set_zoom(zoom);
    }

    pub fn drawing_enabled(&self) -> bool {
        self.inner.drawing_enabled()
    }

    pub fn click(&mut self, drawing_active: bool) -> bool {
        self.inner.click(drawing_active)
    }

    pub fn start_over(&mut self) {
        self.inner.start_over();
    }

    pub fn drawn_point(&mut self, lat: f64, lng: f64) -> JsValue {
        match finite(lat, lng) {
            Ok(at) => self.drawn(Shape::Point(at)),
            Err(e) => e,
        }
    }

    /// `coords` is a flat `[lat, lng, ...]` array.
    pub fn drawn_polyline(&mut self, coords: &[f64]) -> JsValue {
        match parse_latlngs(coords) {
            Some(points) if points.len() >= 2 => self.drawn(Shape::Polyline(points)),
            _ => error::non_finite("coords"),
        }
    }

    pub fn drawn_polygon(&mut self, coords: &[f64]) -> JsValue {
        match parse_latlngs(coords) {
            Some(points) if points.len() >= 3 => self.drawn(Shape::Polygon(points)),
            _ => error::non_finite("coords"),
        }
    }

    /// Value is `{ status: "computed", topology }`, `{ status: "stale" }` or
    /// `null` when the drag changed nothing; a failed computation comes back
    /// as an error envelope.
    pub fn drag_marker(&mut self, id: u32, lat: f64, lng: f64) -> JsValue {
        let at = match finite(lat, lng) {
            Ok(at) => at,
            Err(e) => return e,
        };
        if !self.inner.markers().iter().any(|(m, _)| *m == Some(id)) {
            return error::invalid_id("marker", id);
        }
        match self.inner.drag_marker(id, at) {
            Ok(Some(PathOutcome::Computed(t))) => {
                let o = new_obj();
                set_kv(&o, "status", &JsValue::from_str("computed"));
                let text = serde_json::to_string(&t).unwrap_or_default();
                set_kv(&o, "topology", &JsValue::from_str(&text));
                error::ok(o.into())
            }
            Ok(Some(PathOutcome::Failed(e))) | Err(e) => error::topology(&e),
            Ok(Some(PathOutcome::Stale)) => {
                let o = new_obj();
                set_kv(&o, "status", &JsValue::from_str("stale"));
                error::ok(o.into())
            }
            Ok(None) => error::ok(JsValue::NULL),
        }
    }

    /// `{ edges: Uint32Array, coords: Float64Array }` of the highlighted
    /// path, or `null`.
    pub fn highlight(&self) -> JsValue {
        let Some((edges, line)) = self.inner.multipath().and_then(|c| c.highlight()) else {
            return JsValue::NULL;
        };
        let o = new_obj();
        set_kv(&o, "edges", &arr_u32(edges).into());
        set_kv(&o, "coords", &flat_latlngs(line).into());
        o.into()
    }

    pub fn markers(&self) -> JsValue {
        let views: Vec<MarkerView> = self
            .inner
            .markers()
            .into_iter()
            .map(|(id, m)| {
                let at = m.at();
                let binding = m.binding();
                MarkerView {
                    id,
                    lat: at.lat,
                    lng: at.lng,
                    bound: m.is_bound(),
                    edge: binding.map(|b| b.0),
                    fraction: binding.map(|b| b.1),
                }
            })
            .collect();
        serde_wasm_bindgen::to_value(&views).unwrap_or(JsValue::NULL)
    }

    /// Error envelope of the last failed computation, or `null`.
    pub fn last_error(&self) -> JsValue {
        match self.inner.multipath().and_then(|c| c.last_error()) {
            Some(e) => error::topology(e),
            None => JsValue::NULL,
        }
    }
}

impl Editor {
    fn drawn(&mut self, shape: Shape) -> JsValue {
        match self.inner.drawn(shape) {
            Ok(used) => error::ok(JsValue::from_bool(used)),
            Err(e) => error::topology(&e),
        }
    }
}
