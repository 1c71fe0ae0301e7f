//! Editing session: wires the field, the network, the snapping observer and
//! the mode controller together, and routes host events to them.

use std::rc::Rc;

use geojson::{Geometry, Value};
use log::{info, warn};

use crate::algorithms::observer::{MarkerId, SnapObserver};
use crate::algorithms::snapping::SnapIndex;
use crate::config::{EditorMode, EditorSettings};
use crate::controller::multipath::{MultipathController, PathOutcome};
use crate::controller::point::PointTopologyController;
use crate::error::{Result, TopologyError};
use crate::field::PersistedField;
use crate::graph::SegmentGraph;
use crate::json::graph_from_snapshot;
use crate::model::{LatLng, Marker, StoredValue};
use crate::objects::ObjectsLayer;
use crate::signal::Signal;

/// Network payloads: the graph snapshot and the layer carrying the segment
/// geometries.
#[derive(Clone, Copy, Debug)]
pub struct NetworkSnapshot<'a> {
    pub graph: &'a str,
    pub paths: &'a str,
}

/// A shape completed by the host drawing controls.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Point(LatLng),
    Polyline(Vec<LatLng>),
    Polygon(Vec<LatLng>),
}

impl Shape {
    fn to_geometry(&self) -> Geometry {
        let pos = |p: &LatLng| vec![p.lng, p.lat];
        let value = match self {
            Shape::Point(p) => Value::Point(pos(p)),
            Shape::Polyline(pts) => Value::LineString(pts.iter().map(pos).collect()),
            Shape::Polygon(pts) => {
                let mut ring: Vec<Vec<f64>> = pts.iter().map(pos).collect();
                if ring.first() != ring.last() {
                    if let Some(first) = ring.first().cloned() {
                        ring.push(first);
                    }
                }
                Value::Polygon(vec![ring])
            }
        };
        Geometry::new(value)
    }

    fn map_points(&self, mut f: impl FnMut(LatLng) -> LatLng) -> Shape {
        match self {
            Shape::Point(p) => Shape::Point(f(*p)),
            Shape::Polyline(pts) => Shape::Polyline(pts.iter().map(|p| f(*p)).collect()),
            Shape::Polygon(pts) => Shape::Polygon(pts.iter().map(|p| f(*p)).collect()),
        }
    }
}

/// Payload of the start-over broadcast.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOver {
    /// A click while a drawing handler was active.
    NewGesture,
    /// Explicit reset requested by the host.
    Reset,
}

enum ModeController {
    Geometry { shape: Option<Shape> },
    Multipath(MultipathController),
    Point(PointTopologyController),
}

pub struct EditorSession {
    settings: EditorSettings,
    field: PersistedField,
    graph: Option<Rc<SegmentGraph>>,
    observer: Option<SnapObserver>,
    controller: ModeController,
    /// Broadcast before any component clears its transient state.
    pub startover: Signal<StartOver>,
}

impl EditorSession {
    /// Build the session and re-prime it from `field_value`.
    ///
    /// Fails only when multipath editing is configured and the network
    /// cannot be loaded; other modes fall back to unsnapped editing.
    pub fn new(
        settings: EditorSettings,
        field_value: &str,
        objects: Option<&str>,
        network: Option<NetworkSnapshot<'_>>,
    ) -> Result<Self> {
        settings.snap.validate()?;
        let graph = match network.map(load_network) {
            Some(Ok(g)) => Some(Rc::new(g)),
            Some(Err(e)) if settings.mode == EditorMode::Multipath => return Err(e),
            Some(Err(e)) => {
                warn!("network unavailable, snapping degrades: {e}");
                None
            }
            None if settings.mode == EditorMode::Multipath => {
                return Err(TopologyError::GraphLoad("multipath editing needs the network snapshot".into()))
            }
            None => None,
        };
        let objects = objects.and_then(|text| match ObjectsLayer::from_geojson_str(text, settings.object_pk) {
            Ok(layer) => Some(layer),
            Err(e) => {
                warn!("objects layer unavailable: {e}");
                None
            }
        });

        // Snap on the network when there is one, otherwise on nearby objects.
        let observer = if settings.needs_snapping() {
            let index = match (&graph, &objects) {
                (Some(g), _) => Some(SnapIndex::from_graph(g, settings.snap)),
                (None, Some(o)) => Some(SnapIndex::from_objects(o, settings.snap)),
                (None, None) => None,
            };
            index.map(|i| SnapObserver::new(Rc::new(i), settings.initial_zoom))
        } else {
            None
        };

        let controller = match settings.mode {
            EditorMode::Geometry => ModeController::Geometry { shape: None },
            EditorMode::TopologyPoint => ModeController::Point(PointTopologyController::new()),
            EditorMode::Multipath => match &graph {
                Some(g) => ModeController::Multipath(MultipathController::new(g.clone())),
                None => return Err(TopologyError::GraphLoad("network missing".into())),
            },
        };

        let mut session = EditorSession {
            settings,
            field: PersistedField::new(field_value),
            graph,
            observer,
            controller,
            startover: Signal::new(),
        };
        session.load();
        Ok(session)
    }

    fn load(&mut self) {
        let EditorSession { field, observer, controller, .. } = self;
        match controller {
            ModeController::Multipath(c) => {
                if let Some(obs) = observer.as_mut() {
                    let state = c.load(obs, field);
                    info!("multipath session starts in {state:?}");
                }
            }
            ModeController::Point(c) => {
                c.load(observer.as_mut(), field);
            }
            ModeController::Geometry { shape } => {
                if let Some(StoredValue::Geometry(g)) = field.read_lenient() {
                    *shape = shape_from_geometry(&g);
                }
            }
        }
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn field(&self) -> &PersistedField {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut PersistedField {
        &mut self.field
    }

    pub fn graph(&self) -> Option<&SegmentGraph> {
        self.graph.as_deref()
    }

    pub fn observer(&self) -> Option<&SnapObserver> {
        self.observer.as_ref()
    }

    pub fn observer_mut(&mut self) -> Option<&mut SnapObserver> {
        self.observer.as_mut()
    }

    pub fn multipath(&self) -> Option<&MultipathController> {
        match &self.controller {
            ModeController::Multipath(c) => Some(c),
            _ => None,
        }
    }

    pub fn multipath_mut(&mut self) -> Option<&mut MultipathController> {
        match &mut self.controller {
            ModeController::Multipath(c) => Some(c),
            _ => None,
        }
    }

    pub fn point(&self) -> Option<&PointTopologyController> {
        match &self.controller {
            ModeController::Point(c) => Some(c),
            _ => None,
        }
    }

    /// The shape held in geometry mode.
    pub fn shape(&self) -> Option<&Shape> {
        match &self.controller {
            ModeController::Geometry { shape } => shape.as_ref(),
            _ => None,
        }
    }

    /// Markers the current mode has placed, with their snapping state.
    pub fn markers(&self) -> Vec<(Option<MarkerId>, Marker)> {
        match &self.controller {
            ModeController::Multipath(c) => {
                let Some(obs) = self.observer.as_ref() else { return Vec::new() };
                [c.source(), c.dest()]
                    .into_iter()
                    .flatten()
                    .filter_map(|id| obs.marker(id).map(|m| (Some(id), *m)))
                    .collect()
            }
            ModeController::Point(c) => c.marker().map(|m| vec![(c.marker_id(), m)]).unwrap_or_default(),
            ModeController::Geometry { .. } => Vec::new(),
        }
    }

    /// Whether the host should keep its drawing handler armed. Multipath
    /// editing stops accepting new endpoints once both are placed.
    pub fn drawing_enabled(&self) -> bool {
        match &self.controller {
            ModeController::Multipath(c) => c.dest().is_none(),
            ModeController::Point(_) | ModeController::Geometry { .. } => true,
        }
    }

    pub fn set_zoom(&mut self, zoom: u8) {
        if let Some(obs) = self.observer.as_mut() {
            obs.set_zoom(zoom);
        }
    }

    /// Map click. A click while a drawing handler is active begins a new
    /// gesture, which discards the current one first.
    pub fn click(&mut self, drawing_active: bool) -> bool {
        if drawing_active {
            self.start_over_with(StartOver::NewGesture);
        }
        drawing_active
    }

    /// "Shape completed" from the drawing controls. Returns `false` when the
    /// current mode has no use for the shape.
    pub fn drawn(&mut self, shape: Shape) -> Result<bool> {
        let EditorSession { field, observer, controller, settings, .. } = self;
        match controller {
            ModeController::Geometry { shape: current } => {
                let shape = match observer.as_ref() {
                    Some(obs) if settings.snapping => shape.map_points(|p| obs.snap_at(p).at()),
                    _ => shape,
                };
                field.store_geometry(&shape.to_geometry());
                *current = Some(shape);
                Ok(true)
            }
            ModeController::Point(c) => match shape {
                Shape::Point(at) => {
                    c.place(observer.as_mut(), field, at)?;
                    Ok(true)
                }
                _ => Ok(false),
            },
            ModeController::Multipath(c) => match (shape, observer.as_mut()) {
                (Shape::Point(at), Some(obs)) => Ok(c.place_endpoint(obs, field, at).is_some()),
                _ => Ok(false),
            },
        }
    }

    /// A marker was dragged to `at`.
    pub fn drag_marker(&mut self, marker: MarkerId, at: LatLng) -> Result<Option<PathOutcome>> {
        let EditorSession { field, observer, controller, .. } = self;
        match controller {
            ModeController::Multipath(c) => match observer.as_mut() {
                Some(obs) => Ok(c.move_endpoint(obs, field, marker, at)),
                None => Ok(None),
            },
            ModeController::Point(c) => {
                if c.marker_id() == Some(marker) {
                    c.move_to(observer.as_mut(), field, at)?;
                }
                Ok(None)
            }
            ModeController::Geometry { .. } => Ok(None),
        }
    }

    /// Explicit reset from the host.
    pub fn start_over(&mut self) {
        self.start_over_with(StartOver::Reset);
    }

    fn start_over_with(&mut self, reason: StartOver) {
        self.startover.emit(&reason);
        let EditorSession { field, observer, controller, .. } = self;
        match controller {
            ModeController::Multipath(c) => match observer.as_mut() {
                Some(obs) => c.start_over(obs, field),
                None => field.clear(),
            },
            ModeController::Point(c) => c.start_over(observer.as_mut(), field),
            ModeController::Geometry { shape } => {
                if shape.take().is_some() {
                    field.clear();
                }
            }
        }
    }
}

fn load_network(n: NetworkSnapshot<'_>) -> Result<SegmentGraph> {
    let paths = ObjectsLayer::from_geojson_str(n.paths, None)?;
    graph_from_snapshot(n.graph, &paths)
}

fn shape_from_geometry(g: &Geometry) -> Option<Shape> {
    let pt = |p: &Vec<f64>| match p.as_slice() {
        [lng, lat, ..] => Some(LatLng::new(*lat, *lng)),
        _ => None,
    };
    match &g.value {
        Value::Point(p) => pt(p).map(Shape::Point),
        Value::LineString(l) => l.iter().map(pt).collect::<Option<Vec<_>>>().map(Shape::Polyline),
        Value::Polygon(rings) => rings
            .first()
            .and_then(|r| r.iter().map(pt).collect::<Option<Vec<_>>>())
            .map(Shape::Polygon),
        _ => None,
    }
}
