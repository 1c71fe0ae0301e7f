// Centralized tolerances and helpers for network geometry

pub const EPS_LEN: f64 = 1e-12;           // zero-length piece threshold
pub const EPS_FRACTION: f64 = 1e-6;       // fraction comparison slack (round trip)
pub const EPS_DENOM: f64 = 1e-15;         // denominator guard for ratios

#[inline] pub fn clamp01(x: f64) -> f64 { x.max(0.0).min(1.0) }
#[inline] pub fn approx_eq(a: f64, b: f64, eps: f64) -> bool { (a - b).abs() <= eps }

#[inline]
pub fn safe_div(num: f64, den: f64, fallback: f64) -> f64 {
    if den.abs() <= EPS_DENOM { fallback } else { num/den }
}
