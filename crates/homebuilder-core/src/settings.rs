use serde::{Deserialize, Serialize};

/// Editor-wide defaults used when commands are built from user input.
/// Lengths are in metres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub wall_width: f64,
    pub wall_height: f64,
    /// Shortest wall the placement check accepts.
    pub min_wall_length: f64,
    /// How far from the cursor snap candidates are searched.
    pub snap_threshold: f64,
    /// Rounding step for grid and continuation snapping.
    pub grid_step: f64,
    /// Placements further than this from the origin are rejected.
    pub max_extent: f64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            wall_width: 0.4,
            wall_height: 2.4,
            min_wall_length: 0.5,
            snap_threshold: 0.3,
            grid_step: 0.1,
            max_extent: 30.0,
        }
    }
}
