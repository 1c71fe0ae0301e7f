use std::collections::BTreeMap;
use std::rc::Rc;

use log::debug;

use crate::algorithms::snapping::SnapIndex;
use crate::model::{LatLng, Marker};
use crate::signal::Signal;

pub type MarkerId = u32;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnapEvent {
    pub marker: MarkerId,
    pub state: Marker,
}

/// Registry of markers kept snapped to the index while they move.
pub struct SnapObserver {
    index: Rc<SnapIndex>,
    markers: BTreeMap<MarkerId, Marker>,
    next_id: MarkerId,
    zoom: u8,
    /// Fired after every re-snap, bound or not.
    pub snapped: Signal<SnapEvent>,
}

impl SnapObserver {
    pub fn new(index: Rc<SnapIndex>, zoom: u8) -> Self {
        SnapObserver { index, markers: BTreeMap::new(), next_id: 1, zoom, snapped: Signal::new() }
    }

    pub fn index(&self) -> &SnapIndex {
        &self.index
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: u8) {
        self.zoom = zoom;
    }

    /// Register an existing marker as is. It is re-snapped on its next move.
    pub fn add(&mut self, marker: Marker) -> MarkerId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.markers.insert(id, marker);
        id
    }

    /// Register a marker dropped at `at` and snap it right away.
    pub fn place(&mut self, at: LatLng) -> (MarkerId, Marker) {
        let id = self.add(Marker::Free { at });
        let state = self.resnap(id, at);
        (id, state)
    }

    /// Deregister; the last known state is handed back.
    pub fn remove(&mut self, id: MarkerId) -> Option<Marker> {
        self.markers.remove(&id)
    }

    /// Move a registered marker and recompute its binding. `None` when the
    /// marker is not registered.
    pub fn move_marker(&mut self, id: MarkerId, at: LatLng) -> Option<Marker> {
        if !self.markers.contains_key(&id) {
            return None;
        }
        Some(self.resnap(id, at))
    }

    /// Binding `at` would get, without registering anything.
    pub fn snap_at(&self, at: LatLng) -> Marker {
        match self.index.snap(at, self.zoom) {
            Some(c) => c.to_marker(),
            None => Marker::Free { at },
        }
    }

    fn resnap(&mut self, id: MarkerId, at: LatLng) -> Marker {
        let state = self.snap_at(at);
        if !state.is_bound() {
            debug!("marker {id} left free at ({:.6}, {:.6})", at.lat, at.lng);
        }
        self.markers.insert(id, state);
        self.snapped.emit(&SnapEvent { marker: id, state });
        state
    }

    pub fn marker(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(&id)
    }

    pub fn contains(&self, id: MarkerId) -> bool {
        self.markers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}
