//! Linear referencing along polylines.
//!
//! Lengths, closest points and fractional positions along a piecewise-linear
//! geometry. Fractions are measured as a share of the planar polyline length.

use crate::geometry::math::{dist_sq, lerp, seg_distance_sq};
use crate::geometry::tolerance::{clamp01, safe_div, EPS_LEN};
use crate::model::LatLng;

/// Closest location on a polyline to a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint {
    /// Point on the polyline
    pub point: LatLng,
    /// Euclidean distance from the query point
    pub distance: f64,
    /// Index of the piece `points[piece]..points[piece + 1]` holding `point`
    pub piece: usize,
    /// Position along the whole polyline, 0..1
    pub fraction: f64,
}

/// Result of [`percentage_distance`]: the fraction and the point it was
/// measured from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentageDistance {
    pub distance: f64,
    pub closest: LatLng,
}

pub fn polyline_length(points: &[LatLng]) -> f64 {
    points.windows(2).map(|w| w[0].distance_to(w[1])).sum()
}

/// Closest point on `points` to `p`. `None` for an empty geometry.
pub fn closest_on_polyline(points: &[LatLng], p: LatLng) -> Option<ClosestPoint> {
    let first = *points.first()?;
    if points.len() == 1 {
        return Some(ClosestPoint { point: first, distance: p.distance_to(first), piece: 0, fraction: 0.0 });
    }
    let total = polyline_length(points);
    let mut acc = 0.0;
    // (d2, piece, t, acc_before, piece_len)
    let mut best: Option<(f64, usize, f64, f64, f64)> = None;
    for (i, w) in points.windows(2).enumerate() {
        let (a, b) = (w[0], w[1]);
        let len = a.distance_to(b);
        let (d2, t) = seg_distance_sq(p.x(), p.y(), a.x(), a.y(), b.x(), b.y());
        if best.map_or(true, |(bd, ..)| d2 < bd) {
            best = Some((d2, i, t, acc, len));
        }
        acc += len;
    }
    let (d2, piece, t, before, len) = best?;
    let a = points[piece];
    let b = points[piece + 1];
    let point = LatLng::from_xy(lerp(a.x(), b.x(), t), lerp(a.y(), b.y(), t));
    let fraction = if total > EPS_LEN { clamp01((before + t * len) / total) } else { 0.0 };
    Some(ClosestPoint { point, distance: d2.sqrt(), piece, fraction })
}

/// Fraction of the polyline length at which the closest point to `p` lies.
///
/// Walks the pieces, accumulating length, and interpolates within the piece
/// that holds the closest point.
pub fn percentage_distance(p: LatLng, points: &[LatLng]) -> Option<PercentageDistance> {
    let c = closest_on_polyline(points, p)?;
    Some(PercentageDistance { distance: c.fraction, closest: c.point })
}

/// Point lying at `fraction` (clamped to 0..1) of the polyline length.
pub fn point_at_fraction(points: &[LatLng], fraction: f64) -> Option<LatLng> {
    let first = *points.first()?;
    let total = polyline_length(points);
    if total <= EPS_LEN {
        return Some(first);
    }
    let target = clamp01(fraction) * total;
    let mut acc = 0.0;
    for w in points.windows(2) {
        let len = w[0].distance_to(w[1]);
        if acc + len >= target && len > EPS_LEN {
            let t = clamp01(safe_div(target - acc, len, 0.0));
            return Some(LatLng::from_xy(lerp(w[0].x(), w[1].x(), t), lerp(w[0].y(), w[1].y(), t)));
        }
        acc += len;
    }
    points.last().copied()
}

/// Fraction of the polyline length at vertex `idx`.
pub fn vertex_fraction(points: &[LatLng], idx: usize) -> f64 {
    let total = polyline_length(points);
    if total <= EPS_LEN || idx == 0 {
        return 0.0;
    }
    let upto = polyline_length(&points[..=idx.min(points.len() - 1)]);
    clamp01(upto / total)
}

/// Index and squared distance of the vertex nearest to `p`.
pub fn nearest_vertex(points: &[LatLng], p: LatLng) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in points.iter().enumerate() {
        let d2 = dist_sq(p.x(), p.y(), v.x(), v.y());
        if best.map_or(true, |(_, bd)| d2 < bd) {
            best = Some((i, d2));
        }
    }
    best
}

/// Append `piece` to `line`, dropping the first point of `piece` when it
/// repeats the current last point.
pub fn append_dedup(line: &mut Vec<LatLng>, piece: impl IntoIterator<Item = LatLng>) {
    for p in piece {
        if line.last().map_or(true, |last| last.distance_to(p) > EPS_LEN) {
            line.push(p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l(points: &[(f64, f64)]) -> Vec<LatLng> {
        points.iter().map(|&(x, y)| LatLng::from_xy(x, y)).collect()
    }

    #[test]
    fn test_length() {
        let line = l(&[(0.0, 0.0), (3.0, 4.0), (3.0, 10.0)]);
        assert!((polyline_length(&line) - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_percentage_on_second_piece() {
        // Two pieces of length 10; closest point is midway along the second.
        let line = l(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        let pd = percentage_distance(LatLng::from_xy(12.0, 5.0), &line).unwrap();
        assert!((pd.distance - 0.75).abs() < 1e-12);
        assert!((pd.closest.x() - 10.0).abs() < 1e-12);
        assert!((pd.closest.y() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_point_at_fraction() {
        let line = l(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        let p = point_at_fraction(&line, 0.25).unwrap();
        assert!((p.x() - 5.0).abs() < 1e-12 && p.y().abs() < 1e-12);
        let end = point_at_fraction(&line, 1.5).unwrap();
        assert!((end.x() - 10.0).abs() < 1e-12 && (end.y() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_fraction_inverse() {
        let line = l(&[(0.0, 0.0), (1.0, 2.0), (4.0, 2.0), (4.0, -1.0)]);
        for i in 0..=20 {
            let f = i as f64 / 20.0;
            let p = point_at_fraction(&line, f).unwrap();
            let back = percentage_distance(p, &line).unwrap();
            assert!((back.distance - f).abs() < 1e-9, "f={f} back={}", back.distance);
        }
    }

    #[test]
    fn test_degenerate_geometry() {
        let line = l(&[(1.0, 1.0), (1.0, 1.0)]);
        let pd = percentage_distance(LatLng::from_xy(5.0, 5.0), &line).unwrap();
        assert_eq!(pd.distance, 0.0);
        assert!(percentage_distance(LatLng::from_xy(0.0, 0.0), &[]).is_none());
    }

    #[test]
    fn test_vertex_fraction() {
        let line = l(&[(0.0, 0.0), (10.0, 0.0), (10.0, 30.0)]);
        assert_eq!(vertex_fraction(&line, 0), 0.0);
        assert!((vertex_fraction(&line, 1) - 0.25).abs() < 1e-12);
        assert!((vertex_fraction(&line, 2) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_append_dedup() {
        let mut line = l(&[(0.0, 0.0), (1.0, 0.0)]);
        append_dedup(&mut line, l(&[(1.0, 0.0), (2.0, 0.0)]));
        assert_eq!(line.len(), 3);
    }
}
