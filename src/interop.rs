use js_sys::{Float64Array, Object, Reflect, Uint32Array};
use wasm_bindgen::JsValue;

use pathtopo::LatLng;

pub fn new_obj() -> Object { Object::new() }
pub fn set_kv(obj: &Object, k: &str, v: &JsValue) {
    let _ = Reflect::set(obj, &JsValue::from_str(k), v);
}
pub fn arr_u32(slice: &[u32]) -> Uint32Array {
    let arr = Uint32Array::new_with_length(slice.len() as u32);
    arr.copy_from(slice); arr
}
pub fn arr_f64(slice: &[f64]) -> Float64Array {
    let arr = Float64Array::new_with_length(slice.len() as u32);
    arr.copy_from(slice); arr
}

/// Flatten to `[lat0, lng0, lat1, lng1, ...]`.
pub fn flat_latlngs(points: &[LatLng]) -> Float64Array {
    let flat: Vec<f64> = points.iter().flat_map(|p| [p.lat, p.lng]).collect();
    arr_f64(&flat)
}

/// Inverse of [`flat_latlngs`]. `None` on odd length or non-finite values.
pub fn parse_latlngs(flat: &[f64]) -> Option<Vec<LatLng>> {
    if flat.len() % 2 != 0 || flat.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some(flat.chunks_exact(2).map(|c| LatLng::new(c[0], c[1])).collect())
}
