use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::object::WorldObject;

/// Point-in-time view of the registry for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub world: String,
    pub tick: u64,
    pub taken_at: DateTime<Utc>,
    pub live: usize,
    pub pending_removal: usize,
    pub same_spot: usize,
    pub objects: Vec<WorldObject>,
}

impl RegistrySnapshot {
    pub fn new(
        world: &str,
        tick: u64,
        pending_removal: usize,
        same_spot: usize,
        objects: Vec<WorldObject>,
    ) -> Self {
        Self {
            world: world.to_string(),
            tick,
            taken_at: Utc::now(),
            live: objects.len(),
            pending_removal,
            same_spot,
            objects,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
