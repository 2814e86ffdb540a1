use serde::{Deserialize, Serialize};

pub type ObjectId = i32;

/// Object id observers interpret as "nothing here".
pub const EMPTY_OBJECT: ObjectId = -1;

/// Counter value for objects that never age out.
pub const PERMANENT: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHandle(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub plane: i32,
}

impl Position {
    pub fn new(x: i32, y: i32, plane: i32) -> Self {
        Self { x, y, plane }
    }

    pub fn ground(x: i32, y: i32) -> Self {
        Self::new(x, y, 0)
    }

    /// Same plane and within `radius` tiles, measured as a straight line.
    pub fn within_distance(&self, other: Position, radius: u32) -> bool {
        if self.plane != other.plane {
            return false;
        }
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        let radius = i64::from(radius);
        dx * dx + dy * dy <= radius * radius
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldObject {
    pub id: ObjectId,
    pub position: Position,
    pub face: i32,
    #[serde(rename = "type")]
    pub kind: i32,
    pub ticks_remaining: i32,
    pub restore_id: ObjectId,
}

impl WorldObject {
    pub fn permanent(id: ObjectId, position: Position, face: i32, kind: i32) -> Self {
        Self {
            id,
            position,
            face,
            kind,
            ticks_remaining: PERMANENT,
            restore_id: EMPTY_OBJECT,
        }
    }

    /// An object that turns into `restore_id` after `ticks` world ticks.
    pub fn temporary(
        id: ObjectId,
        position: Position,
        face: i32,
        kind: i32,
        ticks: i32,
        restore_id: ObjectId,
    ) -> Self {
        Self {
            id,
            position,
            face,
            kind,
            ticks_remaining: ticks,
            restore_id,
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.ticks_remaining < 0
    }

    pub fn matches(&self, id: ObjectId, position: Position) -> bool {
        self.id == id && self.position == position
    }

    /// The permanent counterpart left behind once the countdown runs out.
    pub fn restored(&self) -> WorldObject {
        WorldObject::permanent(self.restore_id, self.position, self.face, self.kind)
    }

    pub fn appear(&self) -> ObjectUpdate {
        ObjectUpdate {
            object_id: self.id,
            position: self.position,
            face: self.face,
            kind: self.kind,
        }
    }

    pub fn vanish(&self) -> ObjectUpdate {
        ObjectUpdate {
            object_id: EMPTY_OBJECT,
            ..self.appear()
        }
    }
}

/// What observers are told about a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectUpdate {
    pub object_id: ObjectId,
    pub position: Position,
    pub face: i32,
    #[serde(rename = "type")]
    pub kind: i32,
}

impl ObjectUpdate {
    pub fn is_removal(&self) -> bool {
        self.object_id == EMPTY_OBJECT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_respects_plane_and_radius() {
        let origin = Position::new(3200, 3200, 0);
        assert!(origin.within_distance(Position::new(3260, 3200, 0), 60));
        assert!(!origin.within_distance(Position::new(3261, 3200, 0), 60));
        assert!(!origin.within_distance(Position::new(3250, 3250, 0), 60));
        assert!(!origin.within_distance(Position::new(3200, 3200, 1), 60));
    }

    #[test]
    fn restored_object_keeps_placement() {
        let tree = WorldObject::temporary(1276, Position::new(10, 10, 0), 2, 10, 5, 1342);
        let stump = tree.restored();
        assert_eq!(stump.id, 1342);
        assert_eq!(stump.position, tree.position);
        assert_eq!(stump.face, 2);
        assert_eq!(stump.kind, 10);
        assert!(stump.is_permanent());
    }

    #[test]
    fn vanish_uses_empty_sentinel() {
        let chest = WorldObject::permanent(172, Position::new(1, 2, 0), 0, 10);
        let update = chest.vanish();
        assert!(update.is_removal());
        assert_eq!(update.position, chest.position);
    }
}
