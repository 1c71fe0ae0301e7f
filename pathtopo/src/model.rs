use serde::{Deserialize, Serialize};

pub type NodeId = u32;
pub type EdgeId = u32;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        LatLng { lat, lng }
    }

    /// Planar constructor: `x` is the longitude, `y` the latitude.
    pub fn from_xy(x: f64, y: f64) -> Self {
        LatLng { lat: y, lng: x }
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.lng
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.lat
    }

    pub fn distance_to(&self, other: LatLng) -> f64 {
        let dx = other.lng - self.lng;
        let dy = other.lat - self.lat;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub at: LatLng,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub a: NodeId,
    pub b: NodeId,
    pub geometry: Vec<LatLng>, // first point at `a`, last at `b`
    pub length: f64,
}

impl Edge {
    /// The endpoint opposite to `node`, if `node` is an endpoint of this edge.
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if node == self.a {
            Some(self.b)
        } else if node == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.a == node || self.b == node
    }
}

/// A draggable endpoint, either attached to a segment or floating free.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Marker {
    Bound {
        edge: EdgeId,
        fraction: f64,
        at: LatLng,
        vertex: Option<usize>,
    },
    Free {
        at: LatLng,
    },
}

impl Marker {
    pub fn at(&self) -> LatLng {
        match *self {
            Marker::Bound { at, .. } => at,
            Marker::Free { at } => at,
        }
    }

    pub fn binding(&self) -> Option<(EdgeId, f64)> {
        match *self {
            Marker::Bound { edge, fraction, .. } => Some((edge, fraction)),
            Marker::Free { .. } => None,
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, Marker::Bound { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapCandidate {
    pub target: u32,
    pub closest: LatLng,
    pub fraction: f64,
    pub distance: f64,
    pub vertex: Option<usize>,
}

impl SnapCandidate {
    pub fn to_marker(&self) -> Marker {
        Marker::Bound {
            edge: self.target,
            fraction: self.fraction,
            at: self.closest,
            vertex: self.vertex,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PathResult {
    pub edges: Vec<EdgeId>,
    pub cost: f64,
    pub source: Marker,
    pub dest: Marker,
}

/// The persisted network-relative encoding of a drawn path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub offset: f64,
    pub start: f64,
    pub end: f64,
    pub paths: Vec<EdgeId>,
    pub start_point: LatLng,
    pub end_point: LatLng,
}

impl Topology {
    pub fn first_edge(&self) -> Option<EdgeId> {
        self.paths.first().copied()
    }

    pub fn last_edge(&self) -> Option<EdgeId> {
        self.paths.last().copied()
    }

    /// Compare with `other`, allowing `eps` on every numeric field.
    pub fn approx_eq(&self, other: &Topology, eps: f64) -> bool {
        let close = |a: f64, b: f64| (a - b).abs() <= eps;
        let close_pt = |a: LatLng, b: LatLng| close(a.lat, b.lat) && close(a.lng, b.lng);
        self.paths == other.paths
            && close(self.offset, other.offset)
            && close(self.start, other.start)
            && close(self.end, other.end)
            && close_pt(self.start_point, other.start_point)
            && close_pt(self.end_point, other.end_point)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StoredValue {
    Path(Topology),
    Point(LatLng),
    Geometry(geojson::Geometry),
}
