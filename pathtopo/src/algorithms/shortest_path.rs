//! Shortest route between two bound markers over the segment network.
//!
//! Costs are segment lengths. The start and end segments are only partially
//! traversed, so the search is seeded with the distance from the start
//! marker to each end of its segment, and the goal adds the distance from
//! each end of the destination segment to the destination marker.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use std::rc::Rc;

use log::debug;

use crate::error::{Result, TopologyError};
use crate::graph::SegmentGraph;
use crate::model::{Edge, EdgeId, Marker, NodeId, PathResult};

#[derive(Clone, Copy, Debug)]
struct HeapEntry {
    cost: f64,
    node: NodeId,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    // Min-heap on cost, then on node id.
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.total_cmp(&self.cost).then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Clone)]
pub struct PathFinder {
    graph: Rc<SegmentGraph>,
}

impl PathFinder {
    pub fn new(graph: Rc<SegmentGraph>) -> Self {
        PathFinder { graph }
    }

    pub fn graph(&self) -> &SegmentGraph {
        &self.graph
    }

    pub fn find_path(&self, source: &Marker, dest: &Marker) -> Result<PathResult> {
        find_path(&self.graph, source, dest)
    }
}

fn bound_edge<'g>(g: &'g SegmentGraph, m: &Marker) -> Result<(&'g Edge, f64)> {
    let (edge, fraction) = m.binding().ok_or(TopologyError::UnboundEndpoint)?;
    let e = g.edge(edge).ok_or(TopologyError::StaleReference { edge })?;
    Ok((e, fraction.clamp(0.0, 1.0)))
}

pub fn find_path(g: &SegmentGraph, source: &Marker, dest: &Marker) -> Result<PathResult> {
    let (se, sf) = bound_edge(g, source)?;
    let (de, df) = bound_edge(g, dest)?;

    if se.id == de.id {
        return Ok(PathResult {
            edges: vec![se.id],
            cost: (df - sf).abs() * se.length,
            source: *source,
            dest: *dest,
        });
    }

    let mut dist: BTreeMap<NodeId, f64> = BTreeMap::new();
    let mut prev: BTreeMap<NodeId, (NodeId, EdgeId)> = BTreeMap::new();
    let mut heap = BinaryHeap::new();
    for (node, cost) in [(se.a, sf * se.length), (se.b, (1.0 - sf) * se.length)] {
        if dist.get(&node).map_or(true, |d| cost < *d) {
            dist.insert(node, cost);
            heap.push(HeapEntry { cost, node });
        }
    }

    // Best total cost found so far, and the node it enters the end edge from.
    let mut best: Option<(f64, NodeId)> = None;
    while let Some(HeapEntry { cost, node }) = heap.pop() {
        if dist.get(&node).map_or(false, |d| cost > *d) {
            continue;
        }
        if best.map_or(false, |(b, _)| cost >= b) {
            break;
        }
        if de.touches(node) {
            let tail = if node == de.a {
                df * de.length
            } else {
                (1.0 - df) * de.length
            };
            // A loop segment is entered at either end; take the cheaper side.
            let tail = if de.a == de.b { tail.min((1.0 - df) * de.length) } else { tail };
            let total = cost + tail;
            if best.map_or(true, |(b, _)| total < b) {
                best = Some((total, node));
            }
        }
        for &eid in g.edges_at(node) {
            if eid == se.id || eid == de.id {
                continue;
            }
            let Some(e) = g.edge(eid) else { continue };
            let Some(next) = e.other_end(node) else { continue };
            let nc = cost + e.length;
            if dist.get(&next).map_or(true, |d| nc < *d) {
                dist.insert(next, nc);
                prev.insert(next, (node, eid));
                heap.push(HeapEntry { cost: nc, node: next });
            }
        }
    }

    let (cost, entry) = best.ok_or(TopologyError::NoRoute)?;
    let mut middle = Vec::new();
    let mut cur = entry;
    while let Some(&(p, eid)) = prev.get(&cur) {
        middle.push(eid);
        cur = p;
    }
    middle.reverse();

    let mut edges = Vec::with_capacity(middle.len() + 2);
    edges.push(se.id);
    edges.extend(middle);
    edges.push(de.id);
    debug!("path: {:?} cost {:.6}", edges, cost);
    Ok(PathResult { edges, cost, source: *source, dest: *dest })
}
