//! Session configuration, deserialized from the settings the host page
//! embeds next to the field.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TopologyError};

fn default_snap_distance() -> f64 { 0.0003 }
fn default_min_snap_zoom() -> u8 { 15 }
fn default_vertex_snap_distance() -> f64 { 0.0001 }
fn default_cell_size() -> f64 { 0.001 }
fn default_initial_zoom() -> u8 { 18 }

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapConfig {
    /// Maximum perpendicular distance for a snap, in map units.
    #[serde(default = "default_snap_distance")]
    pub snap_distance: f64,
    /// Snapping is disabled entirely below this zoom level.
    #[serde(default = "default_min_snap_zoom")]
    pub min_snap_zoom: u8,
    /// A snap lands on a vertex when one is this close to the cursor.
    #[serde(default = "default_vertex_snap_distance")]
    pub vertex_snap_distance: f64,
    /// Grid cell edge of the spatial index.
    #[serde(default = "default_cell_size")]
    pub cell_size: f64,
}

impl Default for SnapConfig {
    fn default() -> Self {
        SnapConfig {
            snap_distance: default_snap_distance(),
            min_snap_zoom: default_min_snap_zoom(),
            vertex_snap_distance: default_vertex_snap_distance(),
            cell_size: default_cell_size(),
        }
    }
}

impl SnapConfig {
    pub fn validate(&self) -> Result<()> {
        let ok = |v: f64| v.is_finite() && v >= 0.0;
        if !ok(self.snap_distance) || !ok(self.vertex_snap_distance) {
            return Err(TopologyError::InvalidConfig("snap distances must be finite and non-negative".into()));
        }
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(TopologyError::InvalidConfig("cell_size must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorMode {
    /// Plain geometry stored as GeoJSON.
    #[default]
    Geometry,
    /// Path topology computed over the segment network.
    Multipath,
    /// Single snapped point.
    TopologyPoint,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EditorSettings {
    #[serde(default)]
    pub mode: EditorMode,
    /// Snap drawn or dragged shapes onto the network.
    #[serde(default)]
    pub snapping: bool,
    #[serde(default)]
    pub snap: SnapConfig,
    /// Primary key of the object being edited, `None` on creation.
    #[serde(default)]
    pub object_pk: Option<u32>,
    /// Zoom level the map opens at; the host reports changes afterwards.
    #[serde(default = "default_initial_zoom")]
    pub initial_zoom: u8,
}

impl Default for EditorSettings {
    fn default() -> Self {
        EditorSettings {
            mode: EditorMode::default(),
            snapping: false,
            snap: SnapConfig::default(),
            object_pk: None,
            initial_zoom: default_initial_zoom(),
        }
    }
}

impl EditorSettings {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let s: EditorSettings = serde_json::from_str(text).map_err(|e| TopologyError::InvalidConfig(e.to_string()))?;
        s.snap.validate()?;
        Ok(s)
    }

    /// Multipath always needs the snapping observer.
    pub fn needs_snapping(&self) -> bool {
        self.snapping || self.mode == EditorMode::Multipath
    }

    pub fn topology_mode(&self) -> bool {
        matches!(self.mode, EditorMode::Multipath | EditorMode::TopologyPoint)
    }
}
