//! Network-relative path editing: snap markers onto a segment network, find
//! the route between them, and persist it as a compact topology record.

pub mod config;
pub mod error;
pub mod field;
pub mod graph;
pub mod model;
pub mod objects;
pub mod session;
pub mod signal;
pub mod geometry {
    pub mod limits;
    pub mod math;
    pub mod path_length;
    pub mod tolerance;
}
pub mod algorithms {
    pub mod observer;
    pub mod shortest_path;
    pub mod snapping;
}
pub mod controller {
    pub mod multipath;
    pub mod point;
}
pub mod codec;
mod json;

pub use algorithms::observer::{MarkerId, SnapEvent, SnapObserver};
pub use algorithms::shortest_path::{find_path, PathFinder};
pub use algorithms::snapping::SnapIndex;
pub use codec::{decode, decode_or_fallback, encode, DecodedTopology};
pub use config::{EditorMode, EditorSettings, SnapConfig};
pub use controller::multipath::{Endpoint, MultipathController, MultipathState, PathOutcome, PathRequest};
pub use controller::point::{PointState, PointTopologyController};
pub use error::TopologyError;
pub use field::{parse_field, PersistedField};
pub use graph::{GraphBuilder, SegmentGraph};
pub use json::graph_from_snapshot;
pub use model::{Edge, EdgeId, LatLng, Marker, Node, NodeId, PathResult, SnapCandidate, StoredValue, Topology};
pub use objects::{ObjectFeature, ObjectsLayer, ShapeKind};
pub use session::{EditorSession, NetworkSnapshot, Shape, StartOver};
pub use signal::Signal;
