use std::collections::{BTreeMap, BTreeSet};

use log::{info, warn};
use serde::Deserialize;

use crate::error::{Result, TopologyError};
use crate::geometry::limits;
use crate::graph::SegmentGraph;
use crate::model::{EdgeId, LatLng, NodeId};
use crate::objects::ObjectsLayer;

#[derive(Deserialize)]
struct EdgeDoc {
    id: EdgeId,
    #[serde(default)]
    length: Option<f64>,
    nodes_id: [NodeId; 2],
}

#[derive(Deserialize)]
struct GraphDoc {
    #[serde(default)]
    nodes: BTreeMap<String, BTreeMap<String, EdgeId>>,
    edges: BTreeMap<String, EdgeDoc>,
}

fn parse_key(k: &str, what: &str) -> Result<u32> {
    k.parse()
        .map_err(|_| TopologyError::GraphLoad(format!("invalid {what} key '{k}'")))
}

/// Build a [`SegmentGraph`] from the network snapshot and the paths layer
/// that carries the edge geometries (feature `pk` = edge id).
pub fn graph_from_snapshot(text: &str, paths: &ObjectsLayer) -> Result<SegmentGraph> {
    let doc: GraphDoc = serde_json::from_str(text).map_err(|e| TopologyError::GraphLoad(e.to_string()))?;
    if doc.nodes.len() > limits::MAX_NODES || doc.edges.len() > limits::MAX_EDGES {
        return Err(TopologyError::GraphLoad("network exceeds size limits".into()));
    }

    // Node positions come from the geometry ends of incident edges.
    let mut positions: BTreeMap<NodeId, LatLng> = BTreeMap::new();
    let mut geometries: BTreeMap<EdgeId, Vec<LatLng>> = BTreeMap::new();
    for (key, e) in &doc.edges {
        if parse_key(key, "edge")? != e.id {
            return Err(TopologyError::GraphLoad(format!("edge key '{key}' does not match id {}", e.id)));
        }
        let line = paths
            .get(e.id)
            .and_then(|f| f.parts.first())
            .filter(|l| l.len() >= 2)
            .cloned();
        match line {
            Some(line) => {
                positions.entry(e.nodes_id[0]).or_insert(line[0]);
                positions.entry(e.nodes_id[1]).or_insert(line[line.len() - 1]);
                geometries.insert(e.id, line);
            }
            None => warn!("graph snapshot: no geometry for edge {}", e.id),
        }
    }

    let edge_ids: BTreeSet<EdgeId> = doc.edges.values().map(|e| e.id).collect();
    let mut builder = SegmentGraph::builder();
    for (key, neighbours) in &doc.nodes {
        let id = parse_key(key, "node")?;
        for (nkey, edge) in neighbours {
            parse_key(nkey, "node")?;
            if !edge_ids.contains(edge) {
                return Err(TopologyError::GraphLoad(format!("node {id} references unknown edge {edge}")));
            }
        }
        match positions.get(&id) {
            Some(at) => {
                builder.add_node(id, *at);
            }
            None => warn!("graph snapshot: node {id} has no known position"),
        }
    }
    for e in doc.edges.values() {
        for n in e.nodes_id {
            let at = positions
                .get(&n)
                .ok_or_else(|| TopologyError::GraphLoad(format!("node {n} has no known position")))?;
            builder.add_node(n, *at);
        }
        let geometry = geometries.remove(&e.id).unwrap_or_default();
        builder.add_edge_with_length(e.id, e.nodes_id[0], e.nodes_id[1], geometry, e.length)?;
    }
    let graph = builder.build()?;
    info!("segment graph loaded: {} nodes, {} edges", graph.node_count(), graph.edge_count());
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATHS: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"pk": 1},
         "geometry": {"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 0.0]]}},
        {"type": "Feature", "properties": {"pk": 2},
         "geometry": {"type": "LineString", "coordinates": [[1.0, 0.0], [1.0, 0.5], [1.0, 1.0]]}}
    ]}"#;

    const GRAPH: &str = r#"{
        "nodes": {"10": {"11": 1}, "11": {"10": 1, "12": 2}, "12": {"11": 2}},
        "edges": {
            "1": {"id": 1, "length": 1.0, "nodes_id": [10, 11]},
            "2": {"id": 2, "nodes_id": [11, 12]}
        }
    }"#;

    #[test]
    fn loads_snapshot_with_geometries() {
        let paths = ObjectsLayer::from_geojson_str(PATHS, None).unwrap();
        let g = graph_from_snapshot(GRAPH, &paths).unwrap();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.edge(2).unwrap().geometry.len(), 3);
        assert!((g.edge(2).unwrap().length - 1.0).abs() < 1e-12);
        assert_eq!(g.node(12).unwrap().at, LatLng::new(1.0, 1.0));
        assert_eq!(g.edges_at(11), &[1, 2]);
    }

    #[test]
    fn rejects_malformed_snapshot() {
        let paths = ObjectsLayer::default();
        assert!(matches!(graph_from_snapshot("[]", &paths), Err(TopologyError::GraphLoad(_))));
    }

    #[test]
    fn rejects_unknown_edge_reference() {
        let paths = ObjectsLayer::from_geojson_str(PATHS, None).unwrap();
        let bad = r#"{"nodes": {"10": {"11": 99}},
            "edges": {"1": {"id": 1, "nodes_id": [10, 11]}}}"#;
        assert!(graph_from_snapshot(bad, &paths).is_err());
    }

    #[test]
    fn node_without_position_is_error() {
        let paths = ObjectsLayer::default();
        assert!(graph_from_snapshot(GRAPH, &paths).is_err());
    }

    #[test]
    fn loads_long_chain() {
        const N: u32 = 20_000;
        let mut nodes = serde_json::Map::new();
        let mut edges = serde_json::Map::new();
        let mut features = Vec::new();
        for i in 0..N {
            let mut nb = serde_json::Map::new();
            if i > 0 {
                nb.insert((i - 1).to_string(), serde_json::json!(i));
            }
            if i + 1 < N {
                nb.insert((i + 1).to_string(), serde_json::json!(i + 1));
                edges.insert((i + 1).to_string(), serde_json::json!({"id": i + 1, "nodes_id": [i, i + 1]}));
                features.push(serde_json::json!({
                    "type": "Feature",
                    "properties": {"pk": i + 1},
                    "geometry": {"type": "LineString", "coordinates": [[i as f64, 0.0], [i as f64 + 1.0, 0.0]]}
                }));
            }
            nodes.insert(i.to_string(), serde_json::Value::Object(nb));
        }
        let graph = serde_json::json!({"nodes": nodes, "edges": edges}).to_string();
        let layer = serde_json::json!({"type": "FeatureCollection", "features": features}).to_string();
        let paths = ObjectsLayer::from_geojson_str(&layer, None).unwrap();
        let g = graph_from_snapshot(&graph, &paths).unwrap();
        assert_eq!(g.node_count(), N as usize);
        assert_eq!(g.edge_count(), N as usize - 1);
        assert_eq!(g.edges_at(1), &[1, 2]);
    }
}
