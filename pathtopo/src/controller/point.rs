use log::warn;

use crate::algorithms::observer::{MarkerId, SnapObserver};
use crate::error::Result;
use crate::field::PersistedField;
use crate::model::{LatLng, Marker, StoredValue};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointState {
    Idle,
    Placed,
}

/// Single-location topology: one marker, stored as its raw coordinate.
#[derive(Debug, Default)]
pub struct PointTopologyController {
    // Observer registration when snapping is on, plus the last known state.
    marker: Option<(Option<MarkerId>, Marker)>,
}

impl PointTopologyController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PointState {
        match self.marker {
            Some(_) => PointState::Placed,
            None => PointState::Idle,
        }
    }

    pub fn marker(&self) -> Option<Marker> {
        self.marker.map(|(_, m)| m)
    }

    pub fn marker_id(&self) -> Option<MarkerId> {
        self.marker.and_then(|(id, _)| id)
    }

    /// Put the point at `at`, replacing any previous one.
    pub fn place(
        &mut self,
        observer: Option<&mut SnapObserver>,
        field: &mut PersistedField,
        at: LatLng,
    ) -> Result<Marker> {
        let marker = match observer {
            Some(obs) => {
                if let Some(old) = self.marker_id() {
                    obs.remove(old);
                }
                let (id, m) = obs.place(at);
                self.marker = Some((Some(id), m));
                m
            }
            None => {
                let m = Marker::Free { at };
                self.marker = Some((None, m));
                m
            }
        };
        field.store_point(marker.at())?;
        Ok(marker)
    }

    /// Drag the placed point. `Ok(None)` when nothing is placed.
    pub fn move_to(
        &mut self,
        observer: Option<&mut SnapObserver>,
        field: &mut PersistedField,
        at: LatLng,
    ) -> Result<Option<Marker>> {
        let Some((id, _)) = self.marker else { return Ok(None) };
        let marker = match (observer, id) {
            (Some(obs), Some(id)) => match obs.move_marker(id, at) {
                Some(m) => m,
                None => return Ok(None),
            },
            _ => Marker::Free { at },
        };
        self.marker = Some((id, marker));
        field.store_point(marker.at())?;
        Ok(Some(marker))
    }

    pub fn start_over(&mut self, observer: Option<&mut SnapObserver>, field: &mut PersistedField) {
        if let (Some(obs), Some(id)) = (observer, self.marker_id()) {
            obs.remove(id);
        }
        self.marker = None;
        field.clear();
    }

    /// Restore a stored point as is, registering it for later snapping.
    pub fn load(&mut self, observer: Option<&mut SnapObserver>, field: &PersistedField) -> PointState {
        match field.read_lenient() {
            Some(StoredValue::Point(at)) => {
                let m = Marker::Free { at };
                let id = observer.map(|obs| obs.add(m));
                self.marker = Some((id, m));
            }
            Some(StoredValue::Path(_)) => {
                // TODO: rebuild a point from a path topology once the backend serializes point-on-path positions
                warn!("path topology in a point field is not supported, starting empty");
            }
            Some(StoredValue::Geometry(_)) => warn!("geometry in a point topology field, starting empty"),
            None => {}
        }
        self.state()
    }
}
