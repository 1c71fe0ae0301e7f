//! Two-endpoint path editing over the segment network.
//!
//! The controller does not own the observer or the field: the session hands
//! them in on every call, so there is exactly one writer to the field.

use std::rc::Rc;

use log::{debug, info, warn};

use crate::algorithms::observer::{MarkerId, SnapObserver};
use crate::algorithms::shortest_path::PathFinder;
use crate::codec::{decode_or_fallback, encode, merged_geometry};
use crate::error::{Result, TopologyError};
use crate::field::PersistedField;
use crate::graph::SegmentGraph;
use crate::model::{EdgeId, LatLng, Marker, PathResult, StoredValue, Topology};
use crate::signal::Signal;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MultipathState {
    Idle,
    /// Endpoints are being placed; no valid path is displayed.
    OneEndpointPlaced,
    PathComputed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Source,
    Dest,
}

/// Snapshot of the endpoints a computation was started for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathRequest {
    pub generation: u64,
    pub source: Marker,
    pub dest: Marker,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PathOutcome {
    Computed(Topology),
    Failed(TopologyError),
    /// The result belonged to an older request and was dropped.
    Stale,
}

pub struct MultipathController {
    graph: Rc<SegmentGraph>,
    finder: PathFinder,
    state: MultipathState,
    source: Option<MarkerId>,
    dest: Option<MarkerId>,
    highlight: Option<(Vec<EdgeId>, Vec<LatLng>)>,
    generation: u64,
    last_error: Option<TopologyError>,
    /// Fired with every topology written to the field.
    pub computed: Signal<Topology>,
}

impl MultipathController {
    pub fn new(graph: Rc<SegmentGraph>) -> Self {
        MultipathController {
            finder: PathFinder::new(graph.clone()),
            graph,
            state: MultipathState::Idle,
            source: None,
            dest: None,
            highlight: None,
            generation: 0,
            last_error: None,
            computed: Signal::new(),
        }
    }

    pub fn state(&self) -> MultipathState {
        self.state
    }

    pub fn source(&self) -> Option<MarkerId> {
        self.source
    }

    pub fn dest(&self) -> Option<MarkerId> {
        self.dest
    }

    /// Edges and merged line of the path currently highlighted.
    pub fn highlight(&self) -> Option<(&[EdgeId], &[LatLng])> {
        self.highlight.as_ref().map(|(e, g)| (e.as_slice(), g.as_slice()))
    }

    pub fn last_error(&self) -> Option<&TopologyError> {
        self.last_error.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn owns(&self, marker: MarkerId) -> bool {
        self.source == Some(marker) || self.dest == Some(marker)
    }

    /// Drop a new endpoint at `at`: first the source, then the destination.
    /// Returns `None` once both endpoints exist.
    pub fn place_endpoint(
        &mut self,
        observer: &mut SnapObserver,
        field: &mut PersistedField,
        at: LatLng,
    ) -> Option<(Endpoint, Option<PathOutcome>)> {
        if self.source.is_none() {
            let (id, _) = observer.place(at);
            self.source = Some(id);
            self.state = MultipathState::OneEndpointPlaced;
            return Some((Endpoint::Source, None));
        }
        if self.dest.is_none() {
            let (id, _) = observer.place(at);
            self.dest = Some(id);
            return Some((Endpoint::Dest, self.recompute(observer, field)));
        }
        debug!("both endpoints already placed, ignoring new endpoint");
        None
    }

    /// React to an endpoint drag. `None` if `marker` is not one of ours or
    /// no computation was possible yet.
    pub fn move_endpoint(
        &mut self,
        observer: &mut SnapObserver,
        field: &mut PersistedField,
        marker: MarkerId,
        at: LatLng,
    ) -> Option<PathOutcome> {
        if !self.owns(marker) {
            return None;
        }
        observer.move_marker(marker, at)?;
        self.recompute(observer, field)
    }

    /// Start a computation for the current endpoint positions. Any request
    /// started earlier becomes stale.
    pub fn begin_request(&mut self, observer: &SnapObserver) -> Option<PathRequest> {
        let source = *observer.marker(self.source?)?;
        let dest = *observer.marker(self.dest?)?;
        self.generation = self.generation.wrapping_add(1);
        Some(PathRequest { generation: self.generation, source, dest })
    }

    pub fn compute(&self, request: &PathRequest) -> Result<PathResult> {
        self.finder.find_path(&request.source, &request.dest)
    }

    /// Apply the result of `request`. Results of superseded requests are
    /// discarded; failures leave the stored topology untouched.
    pub fn complete(
        &mut self,
        field: &mut PersistedField,
        request: &PathRequest,
        result: Result<PathResult>,
    ) -> PathOutcome {
        if request.generation != self.generation {
            debug!("dropping stale path result {} (current {})", request.generation, self.generation);
            return PathOutcome::Stale;
        }
        let applied = result.and_then(|path| {
            let topology = encode(&self.graph, &path)?;
            let geometry = merged_geometry(&self.graph, &path.edges, topology.start, topology.end)?;
            field.store_topology(&topology)?;
            Ok((topology, path.edges, geometry))
        });
        match applied {
            Ok((topology, edges, geometry)) => {
                self.highlight = Some((edges, geometry));
                self.state = MultipathState::PathComputed;
                self.last_error = None;
                self.computed.emit(&topology);
                PathOutcome::Computed(topology)
            }
            Err(e) => {
                debug!("path computation failed: {e}");
                self.highlight = None;
                self.last_error = Some(e.clone());
                PathOutcome::Failed(e)
            }
        }
    }

    pub fn recompute(&mut self, observer: &SnapObserver, field: &mut PersistedField) -> Option<PathOutcome> {
        let request = self.begin_request(observer)?;
        let result = self.compute(&request);
        Some(self.complete(field, &request, result))
    }

    /// Back to `Idle`: highlight and field cleared, endpoints deregistered.
    pub fn start_over(&mut self, observer: &mut SnapObserver, field: &mut PersistedField) {
        for id in [self.source.take(), self.dest.take()].into_iter().flatten() {
            observer.remove(id);
        }
        self.highlight = None;
        self.last_error = None;
        self.generation = self.generation.wrapping_add(1);
        self.state = MultipathState::Idle;
        field.clear();
    }

    /// Re-prime from the stored field value. Malformed or foreign content
    /// leaves the controller idle.
    pub fn load(&mut self, observer: &mut SnapObserver, field: &PersistedField) -> MultipathState {
        let topology = match field.read() {
            Ok(Some(StoredValue::Path(t))) => t,
            Ok(Some(_)) => {
                warn!("stored value is not a path topology, starting empty");
                return self.state;
            }
            Ok(None) => return self.state,
            Err(e) => {
                warn!("cannot decode stored topology: {e}");
                return self.state;
            }
        };
        let decoded = match decode_or_fallback(&self.graph, &topology) {
            Ok(d) => d,
            Err(e) => {
                warn!("cannot decode stored topology: {e}");
                return self.state;
            }
        };
        self.source = Some(observer.add(decoded.source));
        self.dest = Some(observer.add(decoded.dest));
        if decoded.is_fallback() {
            self.state = MultipathState::OneEndpointPlaced;
            self.last_error = Some(TopologyError::StaleReference {
                edge: topology.paths.iter().copied().find(|e| !self.graph.contains_edge(*e)).unwrap_or_default(),
            });
        } else {
            info!("restored topology over {} segments", decoded.edges.len());
            self.highlight = Some((decoded.edges, decoded.geometry));
            self.state = MultipathState::PathComputed;
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::snapping::SnapIndex;
    use crate::config::SnapConfig;

    fn xy(x: f64, y: f64) -> LatLng {
        LatLng::from_xy(x, y)
    }

    fn setup() -> (MultipathController, SnapObserver, PersistedField) {
        let mut b = SegmentGraph::builder();
        b.add_node(1, xy(0.0, 0.0)).add_node(2, xy(1.0, 0.0)).add_node(3, xy(1.0, 1.0));
        b.add_edge(1, 1, 2, Vec::new()).unwrap();
        b.add_edge(2, 2, 3, Vec::new()).unwrap();
        let g = Rc::new(b.build().unwrap());
        let cfg = SnapConfig { snap_distance: 0.2, min_snap_zoom: 10, vertex_snap_distance: 0.0, cell_size: 0.5 };
        let obs = SnapObserver::new(Rc::new(SnapIndex::from_graph(&g, cfg)), 16);
        (MultipathController::new(g), obs, PersistedField::new(""))
    }

    #[test]
    fn stale_results_are_discarded() {
        let (mut c, mut obs, mut field) = setup();
        c.place_endpoint(&mut obs, &mut field, xy(0.5, 0.0));
        c.place_endpoint(&mut obs, &mut field, xy(1.0, 0.5));
        let before = field.raw().to_string();
        let old = c.begin_request(&obs).unwrap();
        let new = c.begin_request(&obs).unwrap();
        let old_result = c.compute(&old);
        assert_eq!(c.complete(&mut field, &old, old_result), PathOutcome::Stale);
        assert_eq!(field.raw(), before);
        let new_result = c.compute(&new);
        assert!(matches!(c.complete(&mut field, &new, new_result), PathOutcome::Computed(_)));
    }

    #[test]
    fn free_endpoint_reports_failure() {
        let (mut c, mut obs, mut field) = setup();
        c.place_endpoint(&mut obs, &mut field, xy(0.5, 0.0));
        let (_, outcome) = c.place_endpoint(&mut obs, &mut field, xy(5.0, 5.0)).unwrap();
        assert_eq!(outcome, Some(PathOutcome::Failed(TopologyError::UnboundEndpoint)));
        assert_eq!(c.state(), MultipathState::OneEndpointPlaced);
        assert!(field.is_empty());
        assert!(c.highlight().is_none());
    }

    #[test]
    fn third_endpoint_is_ignored() {
        let (mut c, mut obs, mut field) = setup();
        c.place_endpoint(&mut obs, &mut field, xy(0.5, 0.0));
        c.place_endpoint(&mut obs, &mut field, xy(1.0, 0.5));
        assert!(c.place_endpoint(&mut obs, &mut field, xy(0.2, 0.0)).is_none());
        assert_eq!(obs.len(), 2);
    }
}
