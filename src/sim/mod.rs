//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (slot order for entities, sorted sets for queues)
//! - Bodies are destroyed only between physics steps, never from a contact

pub mod contact;
pub mod controller;
pub mod daylight;
pub mod entity;
pub mod events;
pub mod removal;
pub mod snapshot;
pub mod steering;
pub mod targeting;
pub mod wave;

pub use contact::ContactResolver;
pub use controller::{GameController, MatchPhase, Occupant, Placement, PlacementError};
pub use daylight::DayNightCycle;
pub use entity::{
    Bullet, BulletId, Castle, Chicken, EnemyId, Entity, EntityRef, FastTower, FastTowerId, Life,
    Shot, Tower, TowerId, TowerKind,
};
pub use events::GameEvent;
pub use removal::RemovalQueues;
pub use snapshot::{BulletView, CastleView, EnemyView, Snapshot, TowerView};
pub use targeting::{Target, TargetPools};
pub use wave::{Wave, WaveScheduler, WaveTable};
