//! Delivery of object updates to connected observers.

use tracing::trace;

use crate::object::{ObjectUpdate, Position};

/// Default view distance in tiles.
pub const VISIBILITY_RADIUS: u32 = 60;

/// Receives every registry mutation as it happens. Delivery is fire-and-forget.
pub trait Broadcaster {
    fn notify(&mut self, update: &ObjectUpdate);
}

impl Broadcaster for () {
    fn notify(&mut self, _update: &ObjectUpdate) {}
}

/// A connected entity that can be shown objects.
pub trait Observer {
    fn position(&self) -> Position;
    fn show(&mut self, update: &ObjectUpdate);
}

/// Enumerates whoever is currently connected.
pub trait ObserverDirectory {
    fn for_each_observer(&mut self, visit: &mut dyn FnMut(&mut dyn Observer));
}

impl<O: Observer> ObserverDirectory for Vec<O> {
    fn for_each_observer(&mut self, visit: &mut dyn FnMut(&mut dyn Observer)) {
        for observer in self.iter_mut() {
            visit(observer);
        }
    }
}

/// Sends each update to every observer on the same plane within `radius`.
pub struct VisibilityBroadcaster<D> {
    directory: D,
    radius: u32,
}

impl<D: ObserverDirectory> VisibilityBroadcaster<D> {
    pub fn new(directory: D) -> Self {
        Self {
            directory,
            radius: VISIBILITY_RADIUS,
        }
    }

    pub fn with_radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }
}

impl<D: ObserverDirectory> Broadcaster for VisibilityBroadcaster<D> {
    fn notify(&mut self, update: &ObjectUpdate) {
        let radius = self.radius;
        self.directory.for_each_observer(&mut |observer: &mut dyn Observer| {
            if observer.position().within_distance(update.position, radius) {
                observer.show(update);
            }
        });
    }
}

/// Keeps every update in order. Useful for headless runs and tests.
#[derive(Debug, Default)]
pub struct RecordingBroadcaster {
    updates: Vec<ObjectUpdate>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> &[ObjectUpdate] {
        &self.updates
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn notify(&mut self, update: &ObjectUpdate) {
        self.updates.push(*update);
    }
}

/// Writes updates to the log instead of a client connection.
#[derive(Debug, Default)]
pub struct TracingBroadcaster {
    sent: u64,
}

impl TracingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl Broadcaster for TracingBroadcaster {
    fn notify(&mut self, update: &ObjectUpdate) {
        self.sent += 1;
        trace!(
            object_id = update.object_id,
            x = update.position.x,
            y = update.position.y,
            plane = update.position.plane,
            face = update.face,
            kind = update.kind,
            "object update"
        );
    }
}

/// An observer that remembers what it was shown.
#[derive(Debug, Clone)]
pub struct Spectator {
    pub name: String,
    pub position: Position,
    seen: Vec<ObjectUpdate>,
}

impl Spectator {
    pub fn new(name: impl Into<String>, position: Position) -> Self {
        Self {
            name: name.into(),
            position,
            seen: Vec::new(),
        }
    }

    pub fn seen(&self) -> &[ObjectUpdate] {
        &self.seen
    }

    /// Last update this spectator received for `position`.
    pub fn last_at(&self, position: Position) -> Option<&ObjectUpdate> {
        self.seen.iter().rev().find(|update| update.position == position)
    }
}

impl Observer for Spectator {
    fn position(&self) -> Position {
        self.position
    }

    fn show(&mut self, update: &ObjectUpdate) {
        self.seen.push(*update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::WorldObject;

    #[test]
    fn only_nearby_observers_on_the_plane_are_notified() {
        let observers = vec![
            Spectator::new("near", Position::new(3200, 3200, 0)),
            Spectator::new("far", Position::new(3400, 3200, 0)),
            Spectator::new("upstairs", Position::new(3200, 3200, 1)),
        ];
        let mut broadcaster = VisibilityBroadcaster::new(observers);
        let door = WorldObject::permanent(1530, Position::new(3210, 3205, 0), 1, 0);

        broadcaster.notify(&door.appear());

        let seen: Vec<usize> = broadcaster
            .directory()
            .iter()
            .map(|spectator| spectator.seen().len())
            .collect();
        assert_eq!(seen, vec![1, 0, 0]);
    }

    #[test]
    fn custom_radius_applies() {
        let observers = vec![Spectator::new("near", Position::new(0, 0, 0))];
        let mut broadcaster = VisibilityBroadcaster::new(observers).with_radius(5);
        broadcaster.notify(&WorldObject::permanent(1, Position::new(6, 0, 0), 0, 10).appear());
        broadcaster.notify(&WorldObject::permanent(2, Position::new(5, 0, 0), 0, 10).appear());

        let spectator = &broadcaster.directory()[0];
        assert_eq!(spectator.seen().len(), 1);
        assert_eq!(spectator.seen()[0].object_id, 2);
    }
}
