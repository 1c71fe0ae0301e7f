use std::collections::{BTreeSet, HashMap};

use log::debug;

use crate::config::SnapConfig;
use crate::geometry::limits::{in_coord_bounds, MAX_INDEX_CELLS, MAX_QUERY_CELLS};
use crate::geometry::path_length::{closest_on_polyline, nearest_vertex, vertex_fraction, ClosestPoint};
use crate::graph::SegmentGraph;
use crate::model::{LatLng, SnapCandidate};
use crate::objects::ObjectsLayer;

#[derive(Clone, Debug)]
struct IndexedShape {
    target: u32,
    points: Vec<LatLng>,
}

/// Uniform grid over target geometries (network segments or objects).
#[derive(Clone, Debug)]
pub struct SnapIndex {
    config: SnapConfig,
    shapes: Vec<IndexedShape>,
    cells: HashMap<(i64, i64), Vec<usize>>, // cell -> shape indices, ascending
    wide: Vec<usize>,                       // shapes too large for the grid
}

impl SnapIndex {
    pub fn from_graph(graph: &SegmentGraph, config: SnapConfig) -> Self {
        let shapes = graph
            .edges()
            .map(|e| IndexedShape { target: e.id, points: e.geometry.clone() })
            .collect();
        Self::build(shapes, config)
    }

    pub fn from_objects(layer: &ObjectsLayer, config: SnapConfig) -> Self {
        let shapes = layer
            .iter()
            .flat_map(|f| f.parts.iter().map(move |p| IndexedShape { target: f.pk, points: p.clone() }))
            .filter(|s| !s.points.is_empty())
            .collect();
        Self::build(shapes, config)
    }

    fn build(shapes: Vec<IndexedShape>, config: SnapConfig) -> Self {
        let mut index = SnapIndex { config, shapes, cells: HashMap::new(), wide: Vec::new() };
        for si in 0..index.shapes.len() {
            let pts = index.shapes[si].points.clone();
            let pieces: Vec<(LatLng, LatLng)> = if pts.len() == 1 {
                vec![(pts[0], pts[0])]
            } else {
                pts.windows(2).map(|w| (w[0], w[1])).collect()
            };
            let boxes: Vec<((i64, i64), (i64, i64))> = pieces
                .iter()
                .map(|(a, b)| {
                    let lo = index.cell_of(a.x().min(b.x()), a.y().min(b.y()));
                    let hi = index.cell_of(a.x().max(b.x()), a.y().max(b.y()));
                    (lo, hi)
                })
                .collect();
            let covered = boxes.iter().fold(0u64, |acc, ((x0, y0), (x1, y1))| {
                let w = x1.abs_diff(*x0).saturating_add(1);
                let h = y1.abs_diff(*y0).saturating_add(1);
                acc.saturating_add(w.saturating_mul(h))
            });
            if covered > MAX_INDEX_CELLS {
                debug!("snap index: target {} spans {covered} cells, scanned on every query", index.shapes[si].target);
                index.wide.push(si);
                continue;
            }
            for ((x0, y0), (x1, y1)) in boxes {
                for cx in x0..=x1 {
                    for cy in y0..=y1 {
                        let list = index.cells.entry((cx, cy)).or_default();
                        if list.last() != Some(&si) {
                            list.push(si);
                        }
                    }
                }
            }
        }
        index
    }

    pub fn config(&self) -> &SnapConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    #[inline]
    fn cell_of(&self, x: f64, y: f64) -> (i64, i64) {
        let c = self.config.cell_size;
        ((x / c).floor() as i64, (y / c).floor() as i64)
    }

    /// Snap with the configured distance.
    pub fn snap(&self, at: LatLng, zoom: u8) -> Option<SnapCandidate> {
        self.query(at, self.config.snap_distance, zoom)
    }

    /// Nearest target within `max_distance` of `at`. Always `None` below the
    /// configured minimum zoom. Ties go to the lower target id.
    pub fn query(&self, at: LatLng, max_distance: f64, zoom: u8) -> Option<SnapCandidate> {
        if zoom < self.config.min_snap_zoom {
            return None;
        }
        if !(in_coord_bounds(at.x()) && in_coord_bounds(at.y())) || !(max_distance >= 0.0) {
            return None;
        }
        let candidates = self.candidates_near(at, max_distance);
        // (distance, target, shape index, closest)
        let mut best: Option<(f64, u32, usize, ClosestPoint)> = None;
        for si in candidates {
            let shape = &self.shapes[si];
            let Some(c) = closest_on_polyline(&shape.points, at) else { continue };
            if c.distance > max_distance {
                continue;
            }
            let better = match best {
                None => true,
                Some((bd, bt, ..)) => c.distance < bd || (c.distance == bd && shape.target < bt),
            };
            if better {
                best = Some((c.distance, shape.target, si, c));
            }
        }
        let (distance, target, si, closest) = best?;
        let points = &self.shapes[si].points;
        let mut candidate = SnapCandidate {
            target,
            closest: closest.point,
            fraction: closest.fraction,
            distance,
            vertex: None,
        };
        if let Some((vi, d2)) = nearest_vertex(points, at) {
            if d2.sqrt() <= self.config.vertex_snap_distance {
                candidate.closest = points[vi];
                candidate.fraction = vertex_fraction(points, vi);
                candidate.vertex = Some(vi);
            }
        }
        debug!("snap: target {} at {:.6} (d={:.3e})", candidate.target, candidate.fraction, distance);
        Some(candidate)
    }

    fn candidates_near(&self, at: LatLng, radius: f64) -> BTreeSet<usize> {
        let span = 2.0 * radius / self.config.cell_size + 2.0;
        if !(span * span <= MAX_QUERY_CELLS as f64) {
            return (0..self.shapes.len()).collect();
        }
        let (x0, y0) = self.cell_of(at.x() - radius, at.y() - radius);
        let (x1, y1) = self.cell_of(at.x() + radius, at.y() + radius);
        let mut out: BTreeSet<usize> = self.wide.iter().copied().collect();
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                if let Some(list) = self.cells.get(&(cx, cy)) {
                    out.extend(list.iter().copied());
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xy(x: f64, y: f64) -> LatLng {
        LatLng::from_xy(x, y)
    }

    fn config() -> SnapConfig {
        SnapConfig { snap_distance: 0.5, min_snap_zoom: 10, vertex_snap_distance: 0.05, cell_size: 1.0 }
    }

    fn two_parallel() -> SegmentGraph {
        let mut b = SegmentGraph::builder();
        b.add_node(1, xy(0.0, 0.0)).add_node(2, xy(10.0, 0.0));
        b.add_node(3, xy(0.0, 1.0)).add_node(4, xy(10.0, 1.0));
        b.add_edge(5, 1, 2, Vec::new()).unwrap();
        b.add_edge(6, 3, 4, Vec::new()).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn picks_nearest_segment() {
        let idx = SnapIndex::from_graph(&two_parallel(), config());
        let c = idx.snap(xy(2.5, 0.2), 12).unwrap();
        assert_eq!(c.target, 5);
        assert!((c.fraction - 0.25).abs() < 1e-12);
        assert!((c.distance - 0.2).abs() < 1e-12);
        assert_eq!(c.vertex, None);
        let c = idx.snap(xy(2.5, 0.8), 12).unwrap();
        assert_eq!(c.target, 6);
    }

    #[test]
    fn tie_goes_to_lower_id() {
        let idx = SnapIndex::from_graph(&two_parallel(), config());
        let c = idx.query(xy(5.0, 0.5), 1.0, 12).unwrap();
        assert_eq!(c.target, 5);
    }

    #[test]
    fn out_of_range_is_none() {
        let idx = SnapIndex::from_graph(&two_parallel(), config());
        assert!(idx.snap(xy(5.0, 3.0), 12).is_none());
    }

    #[test]
    fn below_min_zoom_is_none() {
        let idx = SnapIndex::from_graph(&two_parallel(), config());
        assert!(idx.snap(xy(5.0, 0.0), 9).is_none());
        assert!(idx.snap(xy(5.0, 0.0), 10).is_some());
    }

    #[test]
    fn snaps_onto_close_vertex() {
        let idx = SnapIndex::from_graph(&two_parallel(), config());
        let c = idx.snap(xy(9.98, 0.01), 12).unwrap();
        assert_eq!(c.vertex, Some(1));
        assert_eq!(c.closest, xy(10.0, 0.0));
        assert_eq!(c.fraction, 1.0);
    }

    #[test]
    fn long_piece_is_kept_out_of_the_grid() {
        let mut b = SegmentGraph::builder();
        b.add_node(1, xy(0.0, 0.0)).add_node(2, xy(2.0, 2.0));
        b.add_node(3, xy(0.0, 0.0005)).add_node(4, xy(0.0005, 0.0005));
        b.add_edge(7, 1, 2, Vec::new()).unwrap();
        b.add_edge(8, 3, 4, Vec::new()).unwrap();
        let idx = SnapIndex::from_graph(&b.build().unwrap(), SnapConfig::default());
        assert_eq!(idx.wide, vec![0]);
        assert!(idx.cells.len() <= 4);
        let c = idx.snap(xy(1.0, 1.0002), 18).unwrap();
        assert_eq!(c.target, 7);
        let c = idx.snap(xy(0.0002, 0.0006), 18).unwrap();
        assert_eq!(c.target, 8);
    }

    #[test]
    fn large_radius_scans_everything() {
        let idx = SnapIndex::from_graph(&two_parallel(), config());
        let c = idx.query(xy(500.0, 0.0), 1.0e4, 12).unwrap();
        assert_eq!(c.target, 5);
        assert!((c.distance - 490.0).abs() < 1e-9);
    }
}
