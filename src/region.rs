//! Site-specific objects that the definition file cannot express.
//!
//! Two kinds of work happen whenever an observer is refreshed: every prototype
//! whose name falls in a removed category (doors and gates by default) is taken
//! out of the registry on each configured plane, and a fixed list of overrides
//! is shown to the observer directly without ever entering the registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::broadcast::{Broadcaster, Observer};
use crate::config::RegionConfig;
use crate::object::{ObjectId, ObjectUpdate, Position};
use crate::registry::{ObjectRegistry, RegionHook};

/// Display names for object prototypes.
pub trait PrototypeLookup {
    fn display_name(&self, id: ObjectId) -> Option<&str>;
    fn prototype_ids(&self) -> Vec<ObjectId>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrototypeTable {
    names: BTreeMap<ObjectId, String>,
}

impl<S: Into<String>> FromIterator<(ObjectId, S)> for PrototypeTable {
    fn from_iter<I: IntoIterator<Item = (ObjectId, S)>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(|(id, name)| (id, name.into())).collect(),
        }
    }
}

impl PrototypeLookup for PrototypeTable {
    fn display_name(&self, id: ObjectId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    fn prototype_ids(&self) -> Vec<ObjectId> {
        self.names.keys().copied().collect()
    }
}

/// An object shown to observers at a fixed tile but never registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectOverride {
    pub id: ObjectId,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub plane: i32,
    #[serde(default)]
    pub face: i32,
    #[serde(rename = "type", default = "default_override_kind")]
    pub kind: i32,
}

fn default_override_kind() -> i32 {
    10
}

impl ObjectOverride {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y, self.plane)
    }

    pub fn update(&self) -> ObjectUpdate {
        ObjectUpdate {
            object_id: self.id,
            position: self.position(),
            face: self.face,
            kind: self.kind,
        }
    }
}

pub struct SiteCustomizations {
    removed_ids: Vec<ObjectId>,
    planes: Vec<i32>,
    overrides: Vec<ObjectOverride>,
}

impl SiteCustomizations {
    pub fn new<P: PrototypeLookup>(
        prototypes: &P,
        removed_categories: &[String],
        planes: Vec<i32>,
    ) -> Self {
        let keywords: Vec<String> = removed_categories
            .iter()
            .map(|keyword| keyword.to_lowercase())
            .collect();
        let removed_ids = prototypes
            .prototype_ids()
            .into_iter()
            .filter(|id| {
                prototypes.display_name(*id).is_some_and(|name| {
                    let name = name.to_lowercase();
                    keywords.iter().any(|keyword| name.contains(keyword.as_str()))
                })
            })
            .collect();
        Self {
            removed_ids,
            planes,
            overrides: Vec::new(),
        }
    }

    pub fn from_config(config: &RegionConfig) -> Self {
        Self::new(
            &config.prototypes,
            &config.removed_categories,
            config.category_planes.clone(),
        )
        .with_overrides(config.overrides.clone())
    }

    pub fn with_overrides(mut self, overrides: Vec<ObjectOverride>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn removed_ids(&self) -> &[ObjectId] {
        &self.removed_ids
    }

    /// Removes every object of a removed category from the configured planes.
    pub fn clear_categories<B: Broadcaster>(&self, registry: &mut ObjectRegistry<B>) -> usize {
        let mut removed = 0;
        for id in &self.removed_ids {
            for plane in &self.planes {
                removed += registry.remove_by_id_and_plane(*id, *plane);
            }
        }
        removed
    }
}

impl<B: Broadcaster> RegionHook<B> for SiteCustomizations {
    fn apply(&mut self, registry: &mut ObjectRegistry<B>, observer: &mut dyn Observer) {
        let removed = self.clear_categories(registry);
        let origin = observer.position();
        let radius = registry.visibility_radius();
        let mut shown = 0;
        for entry in &self.overrides {
            if origin.within_distance(entry.position(), radius) {
                observer.show(&entry.update());
                shown += 1;
            }
        }
        debug!(removed, shown, "applied site customizations");
    }
}
