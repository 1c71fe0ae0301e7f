// Ingestion limits for the network snapshot and object layers (untrusted JSON)

// Snapshot size caps
pub const MAX_NODES: usize = 500_000;
pub const MAX_EDGES: usize = 500_000;
pub const MAX_OBJECTS: usize = 200_000;

// Geometries
pub const MAX_POINTS_PER_GEOMETRY: usize = 20_000;
pub const MAX_POINTS_TOTAL: usize = 5_000_000;

// Field payload cap (characters)
pub const MAX_FIELD_LEN: usize = 1024 * 1024;

// Numeric bounds (degrees, with headroom for projected inputs)
pub const COORD_MIN: f64 = -20_037_508.35;
pub const COORD_MAX: f64 = 20_037_508.35;

// Grid cells visited per query before falling back to a full scan
pub const MAX_QUERY_CELLS: usize = 4_096;

// Grid cells a single piece may cover; wider pieces are scanned on every query
pub const MAX_INDEX_CELLS: u64 = 4_096;

#[inline]
pub fn in_coord_bounds(x: f64) -> bool { x.is_finite() && x >= COORD_MIN && x <= COORD_MAX }

#[inline]
pub fn valid_length(l: f64) -> bool { l.is_finite() && l >= 0.0 }
