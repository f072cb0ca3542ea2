use serde::{Deserialize, Serialize};
use uuid::Uuid;

use homebuilder_core::{EditorSettings, World};

/// Journal format revision written by this crate.
pub const FORMAT_VERSION: u32 = 1;

/// Metadata stored at the head of every journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMeta {
    pub name: String,
    pub format_version: u32,
    /// Session that produced the journal.
    pub world_id: Uuid,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub settings: EditorSettings,
}

impl ProjectMeta {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            format_version: FORMAT_VERSION,
            world_id: Uuid::new_v4(),
            description: String::new(),
            settings: EditorSettings::default(),
        }
    }

    pub fn for_world(world: &World) -> Self {
        Self {
            name: world.name.clone(),
            format_version: FORMAT_VERSION,
            world_id: world.id,
            description: String::new(),
            settings: world.settings().clone(),
        }
    }
}
