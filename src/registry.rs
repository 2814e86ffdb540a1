//! The global object registry.
//!
//! Objects live in an ordered arena of slots, each tagged with a stable
//! [`ObjectHandle`]. Removing an object tells observers immediately but only
//! tombstones its handle; the slot itself is reclaimed at the start of the next
//! [`ObjectRegistry::tick`]. Queries never see tombstoned slots.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::broadcast::{Broadcaster, Observer, VISIBILITY_RADIUS};
use crate::definitions::{read_definitions, Definitions};
use crate::error::RegistryResult;
use crate::object::{ObjectHandle, ObjectId, Position, WorldObject, EMPTY_OBJECT};
use crate::snapshot::RegistrySnapshot;

#[derive(Debug, Clone)]
struct Slot {
    handle: ObjectHandle,
    object: WorldObject,
}

/// Outcome of a single [`ObjectRegistry::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    /// Tombstoned slots reclaimed at the start of the tick.
    pub reclaimed: usize,
    pub permanent: usize,
    pub aging: usize,
    pub restored: usize,
    pub live: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
}

/// Site-specific work run after an observer has been sent the registry contents.
pub trait RegionHook<B> {
    fn apply(&mut self, registry: &mut ObjectRegistry<B>, observer: &mut dyn Observer);
}

impl<B> RegionHook<B> for () {
    fn apply(&mut self, _registry: &mut ObjectRegistry<B>, _observer: &mut dyn Observer) {}
}

pub struct ObjectRegistry<B> {
    live: Vec<Slot>,
    tombstones: HashSet<ObjectHandle>,
    next_handle: u64,
    tick: u64,
    visibility_radius: u32,
    broadcaster: B,
}

impl<B: Broadcaster> ObjectRegistry<B> {
    pub fn new(broadcaster: B) -> Self {
        Self {
            live: Vec::new(),
            tombstones: HashSet::new(),
            next_handle: 0,
            tick: 0,
            visibility_radius: VISIBILITY_RADIUS,
            broadcaster,
        }
    }

    pub fn with_visibility_radius(mut self, radius: u32) -> Self {
        self.visibility_radius = radius;
        self
    }

    pub fn insert(&mut self, object: WorldObject) -> ObjectHandle {
        self.broadcaster.notify(&object.appear());
        let handle = self.allocate();
        self.live.push(Slot { handle, object });
        handle
    }

    /// Removes the first object matching `id` at `position`.
    pub fn remove_by_location(&mut self, id: ObjectId, position: Position) -> bool {
        match self.find(id, position) {
            Some(handle) => self.remove(handle),
            None => false,
        }
    }

    /// Removes every object with `id` on `plane`, wherever it stands.
    pub fn remove_by_id_and_plane(&mut self, id: ObjectId, plane: i32) -> usize {
        let handles: Vec<ObjectHandle> = self
            .visible()
            .filter(|slot| slot.object.id == id && slot.object.position.plane == plane)
            .map(|slot| slot.handle)
            .collect();
        handles
            .into_iter()
            .filter(|handle| self.remove(*handle))
            .count()
    }

    /// Hides the object from observers now and reclaims its slot next tick.
    ///
    /// Unknown or already removed handles are ignored.
    pub fn remove(&mut self, handle: ObjectHandle) -> bool {
        let Some(object) = self.object(handle).copied() else {
            return false;
        };
        self.broadcaster.notify(&object.vanish());
        self.tombstones.insert(handle);
        true
    }

    pub fn replace(&mut self, old: ObjectHandle, new: WorldObject) -> ObjectHandle {
        self.remove(old);
        self.insert(new)
    }

    pub fn exists(&self, id: ObjectId, position: Position) -> bool {
        self.visible().any(|slot| slot.object.matches(id, position))
    }

    pub fn exists_on_ground(&self, id: ObjectId, x: i32, y: i32) -> bool {
        self.exists(id, Position::ground(x, y))
    }

    pub fn any_exists(&self, position: Position) -> bool {
        self.visible().any(|slot| slot.object.position == position)
    }

    pub fn get(&self, id: ObjectId, position: Position) -> Option<&WorldObject> {
        self.visible()
            .find(|slot| slot.object.matches(id, position))
            .map(|slot| &slot.object)
    }

    pub fn find(&self, id: ObjectId, position: Position) -> Option<ObjectHandle> {
        self.visible()
            .find(|slot| slot.object.matches(id, position))
            .map(|slot| slot.handle)
    }

    pub fn object(&self, handle: ObjectHandle) -> Option<&WorldObject> {
        if self.tombstones.contains(&handle) {
            return None;
        }
        self.live
            .iter()
            .find(|slot| slot.handle == handle)
            .map(|slot| &slot.object)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectHandle, &WorldObject)> + '_ {
        self.visible().map(|slot| (slot.handle, &slot.object))
    }

    pub fn len(&self) -> usize {
        self.live.len() - self.tombstones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_removals(&self) -> usize {
        self.tombstones.len()
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn visibility_radius(&self) -> u32 {
        self.visibility_radius
    }

    /// Ages every object by one tick.
    ///
    /// Pending removals are applied first so the aging pass only ever sees
    /// objects that are still in the world. An object whose counter runs out is
    /// swapped for its permanent counterpart under a new handle.
    pub fn tick(&mut self) -> TickReport {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };

        if !self.tombstones.is_empty() {
            let before = self.live.len();
            let tombstones = std::mem::take(&mut self.tombstones);
            self.live.retain(|slot| !tombstones.contains(&slot.handle));
            report.reclaimed = before - self.live.len();
        }

        let mut updated = Vec::with_capacity(self.live.len());
        for mut slot in std::mem::take(&mut self.live) {
            if slot.object.is_permanent() {
                report.permanent += 1;
                updated.push(slot);
                continue;
            }
            // Only an exact zero expires; a counter that starts at 0 drops to
            // -1 and stays as it is from then on.
            slot.object.ticks_remaining -= 1;
            if slot.object.ticks_remaining != 0 {
                report.aging += 1;
                updated.push(slot);
                continue;
            }
            report.restored += 1;
            let restored = slot.object.restored();
            self.broadcaster.notify(&restored.appear());
            if restored.id != EMPTY_OBJECT {
                let handle = self.allocate();
                updated.push(Slot {
                    handle,
                    object: restored,
                });
            }
        }
        self.live = updated;
        report.live = self.live.len();

        if report.reclaimed > 0 || report.restored > 0 {
            debug!(
                tick = report.tick,
                reclaimed = report.reclaimed,
                restored = report.restored,
                live = report.live,
                "object tick"
            );
        }
        report
    }

    /// Sends a newly placed observer everything it can see, then runs `hook`.
    pub fn refresh_for_observer<H>(&mut self, observer: &mut dyn Observer, hook: &mut H)
    where
        H: RegionHook<B> + ?Sized,
    {
        let origin = observer.position();
        let radius = self.visibility_radius;
        for slot in self.visible() {
            if origin.within_distance(slot.object.position, radius) {
                observer.show(&slot.object.appear());
            }
        }
        hook.apply(self, observer);
    }

    pub fn load_definitions(&mut self, path: impl AsRef<Path>) -> RegistryResult<LoadReport> {
        let definitions = read_definitions(path)?;
        Ok(self.insert_definitions(definitions))
    }

    /// Development helper: replaces the whole world with the file contents.
    ///
    /// The file is read before anything is cleared, so a failed reload leaves
    /// the registry as it was. Observers other than `observer` are not
    /// refreshed.
    pub fn reload_definitions<H>(
        &mut self,
        path: impl AsRef<Path>,
        observer: &mut dyn Observer,
        hook: &mut H,
    ) -> RegistryResult<LoadReport>
    where
        H: RegionHook<B> + ?Sized,
    {
        let staged = read_definitions(path)?;
        warn!(
            discarded = self.len(),
            staged = staged.len(),
            "reloading object definitions"
        );
        self.live.clear();
        self.tombstones.clear();
        let report = self.insert_definitions(staged);
        self.refresh_for_observer(observer, hook);
        Ok(report)
    }

    pub fn insert_definitions(&mut self, definitions: Definitions) -> LoadReport {
        let report = LoadReport {
            loaded: definitions.objects.len(),
            skipped: definitions.skipped.len(),
        };
        for object in definitions.objects {
            self.insert(object);
        }
        info!(
            loaded = report.loaded,
            skipped = report.skipped,
            live = self.len(),
            "object definitions loaded"
        );
        report
    }

    /// Number of live objects that share a tile with at least one other.
    pub fn duplicate_tiles(&self) -> usize {
        let mut per_tile: HashMap<Position, usize> = HashMap::new();
        for slot in self.visible() {
            *per_tile.entry(slot.object.position).or_default() += 1;
        }
        per_tile.values().filter(|count| **count > 1).sum()
    }

    pub fn snapshot(&self, world: &str) -> RegistrySnapshot {
        RegistrySnapshot::new(
            world,
            self.tick,
            self.pending_removals(),
            self.duplicate_tiles(),
            self.visible().map(|slot| slot.object).collect(),
        )
    }

    pub fn broadcaster(&self) -> &B {
        &self.broadcaster
    }

    pub fn broadcaster_mut(&mut self) -> &mut B {
        &mut self.broadcaster
    }

    fn visible(&self) -> impl Iterator<Item = &Slot> + '_ {
        self.live
            .iter()
            .filter(|slot| !self.tombstones.contains(&slot.handle))
    }

    fn allocate(&mut self) -> ObjectHandle {
        let handle = ObjectHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }
}

impl<B: Broadcaster> fmt::Display for ObjectRegistry<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "GlobalObjects: <size: {}, same spot: {}> [",
            self.len(),
            self.duplicate_tiles()
        )?;
        for slot in self.visible() {
            let object = &slot.object;
            writeln!(
                f,
                "\t<id: {}, x: {}, y: {}, plane: {}>",
                object.id, object.position.x, object.position.y, object.position.plane
            )?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{RecordingBroadcaster, Spectator};

    fn registry() -> ObjectRegistry<RecordingBroadcaster> {
        ObjectRegistry::new(RecordingBroadcaster::new())
    }

    #[test]
    fn insert_notifies_and_is_queryable() {
        let mut registry = registry();
        let pos = Position::new(10, 10, 0);
        registry.insert(WorldObject::permanent(1530, pos, 1, 0));

        assert!(registry.exists(1530, pos));
        assert!(registry.exists_on_ground(1530, 10, 10));
        assert!(registry.any_exists(pos));
        assert_eq!(registry.broadcaster().updates().len(), 1);
        assert_eq!(registry.broadcaster().updates()[0].object_id, 1530);
    }

    #[test]
    fn removal_is_hidden_immediately_and_reclaimed_on_tick() {
        let mut registry = registry();
        let pos = Position::new(10, 10, 0);
        let handle = registry.insert(WorldObject::permanent(1530, pos, 1, 0));

        assert!(registry.remove(handle));
        assert!(!registry.exists(1530, pos));
        assert!(registry.object(handle).is_none());
        assert_eq!(registry.pending_removals(), 1);
        assert_eq!(registry.len(), 0);
        assert!(registry.broadcaster().updates()[1].is_removal());

        let report = registry.tick();
        assert_eq!(report.reclaimed, 1);
        assert_eq!(registry.pending_removals(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn removing_twice_notifies_once() {
        let mut registry = registry();
        let handle = registry.insert(WorldObject::permanent(1, Position::new(0, 0, 0), 0, 10));
        assert!(registry.remove(handle));
        assert!(!registry.remove(handle));
        assert_eq!(registry.broadcaster().updates().len(), 2);
        assert_eq!(registry.pending_removals(), 1);
    }

    #[test]
    fn remove_by_location_misses_quietly() {
        let mut registry = registry();
        registry.insert(WorldObject::permanent(1, Position::new(0, 0, 0), 0, 10));
        assert!(!registry.remove_by_location(1, Position::new(0, 0, 1)));
        assert!(!registry.remove_by_location(2, Position::new(0, 0, 0)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_by_location_takes_first_duplicate_only() {
        let mut registry = registry();
        let pos = Position::new(5, 5, 0);
        registry.insert(WorldObject::permanent(7, pos, 0, 10));
        registry.insert(WorldObject::permanent(7, pos, 0, 10));
        assert!(registry.remove_by_location(7, pos));
        assert!(registry.exists(7, pos));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn expired_object_is_restored() {
        let mut registry = registry();
        let pos = Position::new(10, 10, 0);
        registry.insert(WorldObject::temporary(1276, pos, 2, 10, 2, 1342));

        let first = registry.tick();
        assert_eq!(first.aging, 1);
        assert_eq!(registry.get(1276, pos).map(|o| o.ticks_remaining), Some(1));

        let second = registry.tick();
        assert_eq!(second.restored, 1);
        assert!(!registry.exists(1276, pos));
        let stump = registry.get(1342, pos).copied().unwrap();
        assert_eq!(stump.ticks_remaining, -1);
        assert_eq!((stump.face, stump.kind), (2, 10));
        assert_eq!(registry.broadcaster().updates().last().map(|u| u.object_id), Some(1342));
    }

    #[test]
    fn zero_counter_becomes_permanent_without_restoring() {
        let mut registry = registry();
        let pos = Position::new(1, 1, 0);
        let handle = registry.insert(WorldObject::temporary(10, pos, 0, 10, 0, 11));

        let report = registry.tick();
        assert_eq!(report.restored, 0);
        assert_eq!(registry.object(handle).map(|o| o.ticks_remaining), Some(-1));
        assert!(!registry.exists(11, pos));

        registry.tick();
        assert_eq!(registry.object(handle).map(|o| (o.id, o.ticks_remaining)), Some((10, -1)));
        assert_eq!(registry.broadcaster().updates().len(), 1);
    }

    #[test]
    fn restoring_to_nothing_leaves_the_tile_empty() {
        let mut registry = registry();
        let pos = Position::new(1, 1, 0);
        registry.insert(WorldObject::temporary(10, pos, 0, 10, 1, EMPTY_OBJECT));
        let report = registry.tick();
        assert_eq!(report.restored, 1);
        assert!(!registry.any_exists(pos));
        assert!(registry.broadcaster().updates().last().unwrap().is_removal());
    }

    #[test]
    fn restored_object_gets_a_new_handle() {
        let mut registry = registry();
        let pos = Position::new(1, 1, 0);
        let tree = registry.insert(WorldObject::temporary(10, pos, 0, 10, 1, 11));
        registry.tick();
        assert!(registry.object(tree).is_none());
        assert!(!registry.remove(tree));
        let stump = registry.find(11, pos).unwrap();
        assert_ne!(stump, tree);
    }

    #[test]
    fn refresh_sends_only_visible_objects() {
        let mut registry = registry();
        registry.insert(WorldObject::permanent(1, Position::new(3200, 3200, 0), 0, 10));
        registry.insert(WorldObject::permanent(2, Position::new(3300, 3200, 0), 0, 10));
        registry.insert(WorldObject::permanent(3, Position::new(3200, 3200, 1), 0, 10));
        let hidden = registry.insert(WorldObject::permanent(4, Position::new(3201, 3200, 0), 0, 10));
        registry.remove(hidden);

        let mut spectator = Spectator::new("alice", Position::new(3210, 3210, 0));
        registry.refresh_for_observer(&mut spectator, &mut ());

        let ids: Vec<ObjectId> = spectator.seen().iter().map(|u| u.object_id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn duplicate_tiles_are_counted() {
        let mut registry = registry();
        let pos = Position::new(5, 5, 0);
        registry.insert(WorldObject::permanent(1, pos, 0, 10));
        registry.insert(WorldObject::permanent(2, pos, 0, 10));
        registry.insert(WorldObject::permanent(3, Position::new(6, 5, 0), 0, 10));
        assert_eq!(registry.duplicate_tiles(), 2);

        let text = registry.to_string();
        assert!(text.starts_with("GlobalObjects: <size: 3, same spot: 2> ["));
        assert!(text.contains("<id: 3, x: 6, y: 5, plane: 0>"));
    }
}
