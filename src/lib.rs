#![warn(missing_docs)]

//! Tiled JSON world engine for Macroquad.
//!
//! Loads multi-layer, multi-tileset maps, derives collision from them and
//! runs a frame-stepped world on top: camera, per-entity animation, melee
//! and ranged combat, doors, portals and pickups.

pub mod animation;
pub mod camera;
pub mod combat;
pub mod config;
mod error;
pub mod entity;
pub mod inventory;
/// Map document loaders.
pub mod loader {
    pub mod json_loader;
}
pub mod map_data;
pub mod movement;
pub mod projectile;
pub mod render;
pub mod scene;
pub mod spatial;
pub mod world;

pub use animation::{Action, AnimEvent, AnimationController, AnimationSet, Clip, Facing, Frame, MotionIntent};
pub use camera::Camera;
pub use combat::{CombatResolver, CombatRules, Hit};
pub use config::GameConfig;
pub use entity::{DamageOutcome, Entity, EntityId, EntityKind, Health};
pub use error::{MapError, PortalError, SceneError};
pub use inventory::Inventory;
pub use loader::json_loader::{load_map_file, load_map_str};
pub use map_data::{MapData, MapObject, ObjectLayer, Properties, PropertyValue, TileLayer, Tileset};
pub use projectile::{Despawn, Projectile, ProjectileEvent, ProjectileManager, ProjectileSpec};
pub use scene::{DebugCommand, Pickup, Portal, Scene, SceneManager, Transition};
pub use spatial::{CollisionGrid, GlobalIndex, TileId};
pub use world::{FrameInput, FrameReport, World};
