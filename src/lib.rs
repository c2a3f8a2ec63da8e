//! Coop Siege - physics-driven tower defense simulation core
//!
//! Core modules:
//! - `physics`: Circle-body physics world (bodies, forces, contact-begin events)
//! - `sim`: Simulation core (entities, steering, targeting, combat, waves)
//! - `settings`: Data-driven game balance and arena layout

pub mod physics;
pub mod settings;
pub mod sim;

pub use settings::{ArenaConfig, Settings};
pub use sim::{GameController, GameEvent, Placement, PlacementError, Snapshot, TowerKind};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, matches the physics tuning)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Collision categories
    pub const ENEMY_CATEGORY: u16 = 0b0000_0001;
    pub const BULLET_CATEGORY: u16 = 0b0000_0010;
    pub const TOWER_CATEGORY: u16 = 0b0000_0100;

    /// Collision masks (which categories each group touches)
    pub const ENEMY_MASK: u16 = BULLET_CATEGORY | TOWER_CATEGORY;
    pub const BULLET_MASK: u16 = ENEMY_CATEGORY;
    pub const TOWER_MASK: u16 = ENEMY_CATEGORY;
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Heading from `from` toward `to`, in radians
#[inline]
pub fn heading(from: Vec2, to: Vec2) -> f32 {
    (to.y - from.y).atan2(to.x - from.x)
}

/// Rotate `point` around `pivot` by `radians`
#[inline]
pub fn rotate_about(point: Vec2, pivot: Vec2, radians: f32) -> Vec2 {
    pivot + Vec2::from_angle(radians).rotate(point - pivot)
}
