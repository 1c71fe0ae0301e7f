//! Conversion between computed paths and the persisted [`Topology`] record.

use log::warn;

use crate::error::{Result, TopologyError};
use crate::geometry::path_length::{append_dedup, percentage_distance};
use crate::geometry::tolerance::clamp01;
use crate::graph::SegmentGraph;
use crate::model::{EdgeId, LatLng, Marker, PathResult, Topology};

/// A topology resolved against the current network.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedTopology {
    pub source: Marker,
    pub dest: Marker,
    /// Edges of the path; empty after a stale-reference fallback.
    pub edges: Vec<EdgeId>,
    /// The path edges merged into one oriented line, for highlighting.
    pub geometry: Vec<LatLng>,
}

impl DecodedTopology {
    pub fn is_fallback(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Build the persisted record for `path`. A marker bound to the first (last)
/// edge keeps its own fraction; otherwise the fraction is measured from the
/// marker coordinate on that edge's geometry.
pub fn encode(graph: &SegmentGraph, path: &PathResult) -> Result<Topology> {
    let (Some(&first), Some(&last)) = (path.edges.first(), path.edges.last()) else {
        return Err(TopologyError::Encode("empty path".into()));
    };
    let fraction_on = |edge: EdgeId, marker: &Marker| -> Result<f64> {
        let e = graph.edge(edge).ok_or(TopologyError::StaleReference { edge })?;
        match marker.binding() {
            // Closed loops have two fractions per point; only the binding knows which.
            Some((bound, fraction)) if bound == edge => Ok(clamp01(fraction)),
            _ => percentage_distance(marker.at(), &e.geometry)
                .map(|pd| pd.distance)
                .ok_or(TopologyError::StaleReference { edge }),
        }
    };
    let start_point = path.source.at();
    let end_point = path.dest.at();
    Ok(Topology {
        offset: 0.0,
        start: fraction_on(first, &path.source)?,
        end: fraction_on(last, &path.dest)?,
        paths: path.edges.clone(),
        start_point,
        end_point,
    })
}

fn validate(topology: &Topology) -> Result<()> {
    if topology.paths.is_empty() {
        return Err(TopologyError::Decode("topology has no paths".into()));
    }
    let fraction_ok = |f: f64| f.is_finite() && (0.0..=1.0).contains(&f);
    if !fraction_ok(topology.start) || !fraction_ok(topology.end) {
        return Err(TopologyError::Decode("start/end must lie in 0..1".into()));
    }
    if !topology.offset.is_finite() {
        return Err(TopologyError::Decode("offset must be finite".into()));
    }
    Ok(())
}

/// Resolve `topology` against `graph`: endpoint markers bound at the stored
/// fractions and the merged path geometry.
pub fn decode(graph: &SegmentGraph, topology: &Topology) -> Result<DecodedTopology> {
    validate(topology)?;
    if let Some(&edge) = topology.paths.iter().find(|e| !graph.contains_edge(**e)) {
        return Err(TopologyError::StaleReference { edge });
    }
    if !graph.is_contiguous(&topology.paths) {
        return Err(TopologyError::Decode("paths are not contiguous".into()));
    }
    let bound = |edge: EdgeId, fraction: f64| -> Result<Marker> {
        let at = graph
            .point_on_edge(edge, fraction)
            .ok_or(TopologyError::StaleReference { edge })?;
        Ok(Marker::Bound { edge, fraction, at, vertex: None })
    };
    let first = topology.paths[0];
    let last = topology.paths[topology.paths.len() - 1];
    Ok(DecodedTopology {
        source: bound(first, topology.start)?,
        dest: bound(last, topology.end)?,
        edges: topology.paths.clone(),
        geometry: merged_geometry(graph, &topology.paths, topology.start, topology.end)?,
    })
}

/// Like [`decode`], but a stale segment reference degrades to free markers
/// at the raw endpoint coordinates.
pub fn decode_or_fallback(graph: &SegmentGraph, topology: &Topology) -> Result<DecodedTopology> {
    match decode(graph, topology) {
        Err(TopologyError::StaleReference { edge }) => {
            warn!("topology references missing segment {edge}, placing free markers");
            Ok(DecodedTopology {
                source: Marker::Free { at: topology.start_point },
                dest: Marker::Free { at: topology.end_point },
                edges: Vec::new(),
                geometry: Vec::new(),
            })
        }
        other => other,
    }
}

/// Concatenate the geometries of `edges` in travel order. A single edge is
/// oriented from the `start` fraction towards `end`.
pub fn merged_geometry(graph: &SegmentGraph, edges: &[EdgeId], start: f64, end: f64) -> Result<Vec<LatLng>> {
    let get = |id: EdgeId| graph.edge(id).ok_or(TopologyError::StaleReference { edge: id });
    let first = get(*edges.first().ok_or_else(|| TopologyError::Decode("empty path".into()))?)?;
    let mut entry = match edges.get(1) {
        None if clamp01(start) <= clamp01(end) => first.a,
        None => first.b,
        Some(&second) => {
            let shared = graph
                .shared_node(first.id, second)
                .ok_or_else(|| TopologyError::Decode("paths are not contiguous".into()))?;
            first.other_end(shared).unwrap_or(first.a)
        }
    };
    let mut line = Vec::new();
    for &id in edges {
        let e = get(id)?;
        if entry == e.a {
            append_dedup(&mut line, e.geometry.iter().copied());
        } else {
            append_dedup(&mut line, e.geometry.iter().rev().copied());
        }
        entry = e.other_end(entry).unwrap_or(e.b);
    }
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::tolerance::EPS_FRACTION;

    fn xy(x: f64, y: f64) -> LatLng {
        LatLng::from_xy(x, y)
    }

    /// e1: (0,0)->(1,0); e2: (1,1)->(1,0) drawn against travel direction.
    fn graph() -> SegmentGraph {
        let mut b = SegmentGraph::builder();
        b.add_node(1, xy(0.0, 0.0)).add_node(2, xy(1.0, 0.0)).add_node(3, xy(1.0, 1.0));
        b.add_edge(1, 1, 2, vec![xy(0.0, 0.0), xy(0.5, 0.0), xy(1.0, 0.0)]).unwrap();
        b.add_edge(2, 3, 2, Vec::new()).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn encode_measures_fractions_of_free_markers() {
        let g = graph();
        let path = PathResult {
            edges: vec![1, 2],
            cost: 0.0,
            source: Marker::Free { at: xy(0.25, 0.0) },
            dest: Marker::Free { at: xy(1.0, 0.75) },
        };
        let t = encode(&g, &path).unwrap();
        assert_eq!(t.offset, 0.0);
        assert_eq!(t.paths, vec![1, 2]);
        assert!((t.start - 0.25).abs() < 1e-12);
        assert!((t.end - 0.25).abs() < 1e-12);
        assert_eq!(t.start_point, xy(0.25, 0.0));
    }

    #[test]
    fn encode_keeps_fraction_of_bound_markers() {
        let g = graph();
        let path = PathResult {
            edges: vec![1, 2],
            cost: 0.0,
            source: Marker::Bound { edge: 1, fraction: 0.25, at: xy(0.25, 0.0), vertex: None },
            dest: Marker::Bound { edge: 2, fraction: 0.25, at: xy(1.0, 0.75), vertex: None },
        };
        let t = encode(&g, &path).unwrap();
        assert_eq!((t.start, t.end), (0.25, 0.25));
        assert!(matches!(
            encode(&g, &PathResult { edges: Vec::new(), ..path }),
            Err(TopologyError::Encode(_))
        ));
    }

    #[test]
    fn loop_segment_end_survives_roundtrip() {
        // e1: (0,0)->(1,0); e2: closed loop at node 2.
        let mut b = SegmentGraph::builder();
        b.add_node(1, xy(0.0, 0.0)).add_node(2, xy(1.0, 0.0));
        b.add_edge(1, 1, 2, Vec::new()).unwrap();
        b.add_edge(2, 2, 2, vec![xy(1.0, 0.0), xy(2.0, 0.0), xy(2.0, 1.0), xy(1.0, 0.0)]).unwrap();
        let g = b.build().unwrap();
        for end in [0.0, 0.4, 1.0] {
            let t = Topology {
                offset: 0.0,
                start: 0.5,
                end,
                paths: vec![1, 2],
                start_point: xy(0.5, 0.0),
                end_point: g.point_on_edge(2, end).unwrap(),
            };
            let d = decode(&g, &t).unwrap();
            let again = encode(&g, &PathResult { edges: d.edges, cost: 0.0, source: d.source, dest: d.dest }).unwrap();
            assert!(again.approx_eq(&t, EPS_FRACTION), "{again:?} != {t:?}");
        }
    }

    #[test]
    fn decode_places_markers_and_merges_geometry() {
        let g = graph();
        let t = Topology {
            offset: 0.0,
            start: 0.5,
            end: 0.5,
            paths: vec![1, 2],
            start_point: xy(0.5, 0.0),
            end_point: xy(1.0, 0.5),
        };
        let d = decode(&g, &t).unwrap();
        assert_eq!(d.source.at(), xy(0.5, 0.0));
        assert_eq!(d.dest.at(), xy(1.0, 0.5));
        assert_eq!(d.geometry, vec![xy(0.0, 0.0), xy(0.5, 0.0), xy(1.0, 0.0), xy(1.0, 1.0)]);
        let again = encode(
            &g,
            &PathResult { edges: d.edges.clone(), cost: 0.0, source: d.source, dest: d.dest },
        )
        .unwrap();
        assert!(again.approx_eq(&t, 1e-9));
    }

    #[test]
    fn single_edge_geometry_follows_direction() {
        let g = graph();
        let fwd = merged_geometry(&g, &[1], 0.2, 0.8).unwrap();
        let back = merged_geometry(&g, &[1], 0.8, 0.2).unwrap();
        assert_eq!(fwd.first(), Some(&xy(0.0, 0.0)));
        assert_eq!(back.first(), Some(&xy(1.0, 0.0)));
    }

    #[test]
    fn stale_reference_falls_back_to_raw_points() {
        let g = graph();
        let t = Topology {
            offset: 0.0,
            start: 0.1,
            end: 0.9,
            paths: vec![1, 42],
            start_point: xy(3.0, 3.0),
            end_point: xy(4.0, 4.0),
        };
        assert_eq!(decode(&g, &t), Err(TopologyError::StaleReference { edge: 42 }));
        let d = decode_or_fallback(&g, &t).unwrap();
        assert!(d.is_fallback());
        assert_eq!(d.source, Marker::Free { at: xy(3.0, 3.0) });
        assert_eq!(d.dest, Marker::Free { at: xy(4.0, 4.0) });
    }

    #[test]
    fn malformed_topologies_rejected() {
        let g = graph();
        let mut t = Topology {
            offset: 0.0,
            start: 1.5,
            end: 0.0,
            paths: vec![1],
            start_point: xy(0.0, 0.0),
            end_point: xy(0.0, 0.0),
        };
        assert!(matches!(decode(&g, &t), Err(TopologyError::Decode(_))));
        t.start = 0.0;
        t.paths.clear();
        assert!(matches!(decode_or_fallback(&g, &t), Err(TopologyError::Decode(_))));
    }
}
