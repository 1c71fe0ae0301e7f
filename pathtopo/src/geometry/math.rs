use super::tolerance::clamp01;

/// Squared distance from `(px,py)` to the segment `(x1,y1)-(x2,y2)` and the
/// clamped parameter of the projection on that segment.
pub fn seg_distance_sq(px: f64, py: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> (f64, f64) {
    let vx = x2 - x1; let vy = y2 - y1;
    let wx = px - x1; let wy = py - y1;
    let vv = vx*vx + vy*vy;
    let t = if vv > 0.0 { clamp01((wx*vx + wy*vy) / vv) } else { 0.0 };
    let projx = x1 + t * vx; let projy = y1 + t * vy;
    let dx = px - projx; let dy = py - projy;
    (dx*dx + dy*dy, t)
}

#[inline]
pub fn dist_sq(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let dx = x2 - x1; let dy = y2 - y1;
    dx*dx + dy*dy
}

#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 { a + (b - a) * t }
