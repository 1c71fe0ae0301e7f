//! The segment network: nodes, weighted edges with geometry, adjacency.
//!
//! A `SegmentGraph` is assembled once through [`GraphBuilder`] (or from the
//! JSON snapshot, see [`crate::graph_from_snapshot`]) and is read-only
//! afterwards.

use std::collections::BTreeMap;

use crate::error::{Result, TopologyError};
use crate::geometry::limits;
use crate::geometry::path_length::{point_at_fraction, polyline_length};
use crate::model::{Edge, EdgeId, LatLng, Node, NodeId};

#[derive(Clone, Debug, Default)]
pub struct SegmentGraph {
    pub(crate) nodes: BTreeMap<NodeId, Node>,
    pub(crate) edges: BTreeMap<EdgeId, Edge>,
    pub(crate) adjacency: BTreeMap<NodeId, Vec<EdgeId>>, // sorted edge ids
}

impl SegmentGraph {
    pub fn builder() -> GraphBuilder {
        GraphBuilder::default()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edges.contains_key(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Edges incident to `node`, in ascending id order.
    pub fn edges_at(&self, node: NodeId) -> &[EdgeId] {
        self.adjacency.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// A node shared by edges `e1` and `e2`. Prefers `e1.b` when both
    /// endpoints are shared.
    pub fn shared_node(&self, e1: EdgeId, e2: EdgeId) -> Option<NodeId> {
        let a = self.edges.get(&e1)?;
        let b = self.edges.get(&e2)?;
        if b.touches(a.b) {
            Some(a.b)
        } else if b.touches(a.a) {
            Some(a.a)
        } else {
            None
        }
    }

    /// True when every consecutive pair of `edges` shares a node.
    pub fn is_contiguous(&self, edges: &[EdgeId]) -> bool {
        !edges.is_empty()
            && edges.iter().all(|e| self.contains_edge(*e))
            && edges.windows(2).all(|w| self.shared_node(w[0], w[1]).is_some())
    }

    pub fn point_on_edge(&self, edge: EdgeId, fraction: f64) -> Option<LatLng> {
        point_at_fraction(&self.edges.get(&edge)?.geometry, fraction)
    }
}

/// Mutable staging area for a [`SegmentGraph`].
#[derive(Default)]
pub struct GraphBuilder {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,
    points_total: usize,
}

impl GraphBuilder {
    pub fn add_node(&mut self, id: NodeId, at: LatLng) -> &mut Self {
        self.nodes.insert(id, Node { id, at });
        self
    }

    /// Add an edge between two nodes. An empty geometry becomes the straight
    /// line between the node positions once the graph is built.
    pub fn add_edge(&mut self, id: EdgeId, a: NodeId, b: NodeId, geometry: Vec<LatLng>) -> Result<&mut Self> {
        self.add_edge_with_length(id, a, b, geometry, None)
    }

    pub fn add_edge_with_length(
        &mut self,
        id: EdgeId,
        a: NodeId,
        b: NodeId,
        geometry: Vec<LatLng>,
        length: Option<f64>,
    ) -> Result<&mut Self> {
        if self.edges.contains_key(&id) {
            return Err(TopologyError::GraphLoad(format!("duplicate edge {id}")));
        }
        if geometry.len() > limits::MAX_POINTS_PER_GEOMETRY {
            return Err(TopologyError::GraphLoad(format!("edge {id} geometry too large")));
        }
        if !geometry.iter().all(|p| limits::in_coord_bounds(p.lat) && limits::in_coord_bounds(p.lng)) {
            return Err(TopologyError::GraphLoad(format!("edge {id} has invalid coordinates")));
        }
        self.points_total += geometry.len();
        if self.points_total > limits::MAX_POINTS_TOTAL {
            return Err(TopologyError::GraphLoad("too many geometry points".into()));
        }
        let length = length.filter(|l| limits::valid_length(*l)).unwrap_or(-1.0);
        self.edges.insert(id, Edge { id, a, b, geometry, length });
        Ok(self)
    }

    pub fn build(self) -> Result<SegmentGraph> {
        let GraphBuilder { nodes, mut edges, .. } = self;
        if nodes.len() > limits::MAX_NODES || edges.len() > limits::MAX_EDGES {
            return Err(TopologyError::GraphLoad("network exceeds size limits".into()));
        }
        let mut adjacency: BTreeMap<NodeId, Vec<EdgeId>> = BTreeMap::new();
        for edge in edges.values_mut() {
            let (na, nb) = match (nodes.get(&edge.a), nodes.get(&edge.b)) {
                (Some(na), Some(nb)) => (*na, *nb),
                _ => {
                    return Err(TopologyError::GraphLoad(format!(
                        "edge {} references a missing node",
                        edge.id
                    )))
                }
            };
            match edge.geometry.len() {
                0 => edge.geometry = vec![na.at, nb.at],
                1 => edge.geometry.push(nb.at),
                _ => {}
            }
            if edge.length < 0.0 {
                edge.length = polyline_length(&edge.geometry);
            }
            adjacency.entry(edge.a).or_default().push(edge.id);
            if edge.b != edge.a {
                adjacency.entry(edge.b).or_default().push(edge.id);
            }
        }
        for list in adjacency.values_mut() {
            list.sort_unstable();
        }
        Ok(SegmentGraph { nodes, edges, adjacency })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xy(x: f64, y: f64) -> LatLng {
        LatLng::from_xy(x, y)
    }

    #[test]
    fn build_derives_geometry_and_length() {
        let mut b = SegmentGraph::builder();
        b.add_node(1, xy(0.0, 0.0)).add_node(2, xy(3.0, 4.0));
        b.add_edge(10, 1, 2, Vec::new()).unwrap();
        let g = b.build().unwrap();
        let e = g.edge(10).unwrap();
        assert_eq!(e.geometry.len(), 2);
        assert!((e.length - 5.0).abs() < 1e-12);
        assert_eq!(g.edges_at(1), &[10]);
        assert_eq!(g.edges_at(2), &[10]);
    }

    #[test]
    fn explicit_length_wins() {
        let mut b = SegmentGraph::builder();
        b.add_node(1, xy(0.0, 0.0)).add_node(2, xy(1.0, 0.0));
        b.add_edge_with_length(7, 1, 2, Vec::new(), Some(42.0)).unwrap();
        let g = b.build().unwrap();
        assert_eq!(g.edge(7).unwrap().length, 42.0);
    }

    #[test]
    fn missing_node_is_a_load_error() {
        let mut b = SegmentGraph::builder();
        b.add_node(1, xy(0.0, 0.0));
        b.add_edge(1, 1, 99, vec![xy(0.0, 0.0), xy(1.0, 1.0)]).unwrap();
        assert!(matches!(b.build(), Err(TopologyError::GraphLoad(_))));
    }

    #[test]
    fn duplicate_edge_rejected() {
        let mut b = SegmentGraph::builder();
        b.add_node(1, xy(0.0, 0.0)).add_node(2, xy(1.0, 0.0));
        b.add_edge(1, 1, 2, Vec::new()).unwrap();
        assert!(b.add_edge(1, 2, 1, Vec::new()).is_err());
    }

    #[test]
    fn contiguity() {
        let mut b = SegmentGraph::builder();
        b.add_node(1, xy(0.0, 0.0)).add_node(2, xy(1.0, 0.0)).add_node(3, xy(1.0, 1.0)).add_node(4, xy(5.0, 5.0));
        b.add_edge(1, 1, 2, Vec::new()).unwrap();
        b.add_edge(2, 2, 3, Vec::new()).unwrap();
        b.add_edge(3, 4, 4, vec![xy(5.0, 5.0), xy(6.0, 5.0), xy(5.0, 5.0)]).unwrap();
        let g = b.build().unwrap();
        assert!(g.is_contiguous(&[1, 2]));
        assert!(g.is_contiguous(&[2, 1]));
        assert!(!g.is_contiguous(&[1, 3]));
        assert!(!g.is_contiguous(&[]));
        assert_eq!(g.shared_node(1, 2), Some(2));
    }
}
