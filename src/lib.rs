pub mod broadcast;
pub mod config;
pub mod definitions;
pub mod engine;
pub mod error;
pub mod object;
pub mod region;
pub mod registry;
pub mod snapshot;
pub mod telemetry;

pub use broadcast::{Broadcaster, Observer, ObserverDirectory, VisibilityBroadcaster};
pub use error::{RegistryError, RegistryResult};
pub use object::{ObjectHandle, ObjectId, ObjectUpdate, Position, WorldObject, EMPTY_OBJECT};
pub use registry::{LoadReport, ObjectRegistry, RegionHook, TickReport};
