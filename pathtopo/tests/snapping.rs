use pathtopo::geometry::path_length::closest_on_polyline;
use pathtopo::{LatLng, SegmentGraph, SnapConfig, SnapIndex};
use proptest::prelude::*;

const MIN_ZOOM: u8 = 10;

fn config() -> SnapConfig {
    SnapConfig { snap_distance: 2.0, min_snap_zoom: MIN_ZOOM, vertex_snap_distance: 0.0, cell_size: 3.0 }
}

fn build(segments: &[(f64, f64, f64, f64)]) -> SegmentGraph {
    let mut b = SegmentGraph::builder();
    for (i, &(x1, y1, x2, y2)) in segments.iter().enumerate() {
        let (na, nb) = (2 * i as u32, 2 * i as u32 + 1);
        b.add_node(na, LatLng::from_xy(x1, y1)).add_node(nb, LatLng::from_xy(x2, y2));
        b.add_edge(i as u32, na, nb, Vec::new()).unwrap();
    }
    b.build().unwrap()
}

fn segment() -> impl Strategy<Value = (f64, f64, f64, f64)> {
    (0.0..50.0f64, 0.0..50.0f64, 0.0..50.0f64, 0.0..50.0f64)
}

proptest! {
    #[test]
    fn query_returns_minimal_candidate_in_range(
        segments in prop::collection::vec(segment(), 1..12),
        qx in -5.0..55.0f64,
        qy in -5.0..55.0f64,
        max_distance in 0.0..15.0f64,
        zoom in MIN_ZOOM..20u8,
    ) {
        let g = build(&segments);
        let idx = SnapIndex::from_graph(&g, config());
        let at = LatLng::from_xy(qx, qy);
        let brute: Vec<(f64, u32)> = g
            .edges()
            .map(|e| (closest_on_polyline(&e.geometry, at).unwrap().distance, e.id))
            .filter(|(d, _)| *d <= max_distance)
            .collect();
        match idx.query(at, max_distance, zoom) {
            Some(c) => {
                prop_assert!(c.distance <= max_distance);
                let min = brute.iter().map(|(d, _)| *d).fold(f64::INFINITY, f64::min);
                prop_assert!((c.distance - min).abs() < 1e-9);
                let lowest_tied = brute.iter().filter(|(d, _)| *d == min).map(|(_, id)| *id).min().unwrap();
                prop_assert_eq!(c.target, lowest_tied);
            }
            None => prop_assert!(brute.is_empty()),
        }
    }

    #[test]
    fn below_min_zoom_never_snaps(
        segments in prop::collection::vec(segment(), 1..8),
        qx in 0.0..50.0f64,
        qy in 0.0..50.0f64,
        zoom in 0..MIN_ZOOM,
    ) {
        let g = build(&segments);
        let idx = SnapIndex::from_graph(&g, config());
        prop_assert!(idx.query(LatLng::from_xy(qx, qy), 1.0e6, zoom).is_none());
    }
}

#[test]
fn snaps_objects_layer_points_and_lines() {
    let text = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"pk": 4},
         "geometry": {"type": "Point", "coordinates": [1.0, 1.0]}},
        {"type": "Feature", "properties": {"pk": 9},
         "geometry": {"type": "LineString", "coordinates": [[0.0, 3.0], [4.0, 3.0]]}}
    ]}"#;
    let layer = pathtopo::ObjectsLayer::from_geojson_str(text, None).unwrap();
    let idx = SnapIndex::from_objects(&layer, config());
    assert_eq!(idx.len(), 2);
    let c = idx.snap(LatLng::from_xy(1.2, 1.1), 12).unwrap();
    assert_eq!(c.target, 4);
    assert_eq!(c.closest, LatLng::from_xy(1.0, 1.0));
    let c = idx.snap(LatLng::from_xy(2.0, 2.5), 12).unwrap();
    assert_eq!(c.target, 9);
    assert!((c.fraction - 0.5).abs() < 1e-12);
}
