//! Game balance and arena layout
//!
//! Everything tunable lives here and is threaded through constructors.
//! Settings load from JSON; missing fields fall back to the defaults.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::TowerKind;

/// Failure to load a settings file
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A discrete grid cell (column, row) in tile units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Arena dimensions and grid layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Edge length of one tile in world units
    pub tile_size: f32,
    /// Visible tiles across
    pub tiles_wide: u32,
    /// Visible tiles down
    pub tiles_high: u32,
    /// Half-width (in tiles) of the buildable band around the castle
    pub field_radius: u32,
    /// Castle position relative to arena centre
    pub castle_offset: Vec2,
    /// Where enemies steer to, relative to the castle
    pub enemy_goal_offset: Vec2,
    /// Random depth of the off-screen spawn band
    pub spawn_jitter: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            tile_size: 50.0,
            tiles_wide: 19,
            tiles_high: 20,
            field_radius: 5,
            castle_offset: Vec2::new(0.0, 25.0),
            enemy_goal_offset: Vec2::new(0.0, 25.0),
            spawn_jitter: 100.0,
        }
    }
}

impl ArenaConfig {
    pub fn screen_width(&self) -> f32 {
        self.tiles_wide as f32 * self.tile_size
    }

    pub fn screen_height(&self) -> f32 {
        self.tiles_high as f32 * self.tile_size
    }

    pub fn castle_position(&self) -> Vec2 {
        self.castle_offset
    }

    pub fn enemy_goal(&self) -> Vec2 {
        self.castle_position() + self.enemy_goal_offset
    }

    /// Enemies closer than this to the castle are priority targets
    pub fn castle_range(&self) -> f32 {
        self.field_radius as f32 * self.tile_size
    }

    /// Enemies closer than this to the castle can be engaged at all
    pub fn tower_range(&self) -> f32 {
        (self.field_radius + 3) as f32 * self.tile_size
    }

    /// Maximum distance between a tower and a fallback target
    pub fn tower_reach(&self) -> f32 {
        4.0 * self.tile_size
    }

    /// World-space centre of a grid cell. Cell (0, 0) is the arena centre.
    pub fn cell_center(&self, cell: Cell) -> Vec2 {
        Vec2::new(cell.x as f32, cell.y as f32) * self.tile_size
    }

    /// Whether a cell lies in the buildable band around the castle.
    ///
    /// Advisory: callers validate placements before reaching the controller.
    pub fn is_buildable(&self, cell: Cell) -> bool {
        let r = self.field_radius as i32;
        cell.x.abs() <= r && cell.y.abs() <= r && cell != Cell::new(0, 0)
    }
}

/// Per-kind tower balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TowerSpec {
    pub cost: u32,
    pub max_life: f32,
    pub size: f32,
    /// Seconds between shots (shooting towers only)
    pub shot_delay: f32,
    /// Damage dealt by each bullet
    pub bullet_power: f32,
}

/// Tower balance table.
///
/// Deserializes through [`TowerTablePatch`], so a JSON entry may override
/// any subset of one kind's fields and keep that kind's defaults for the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "TowerTablePatch")]
pub struct TowerTable {
    pub wall: TowerSpec,
    pub splash: TowerSpec,
    pub fast: TowerSpec,
    pub triple_shot: TowerSpec,
}

impl Default for TowerTable {
    fn default() -> Self {
        Self {
            wall: TowerSpec {
                cost: 50,
                max_life: 1000.0,
                size: 25.0,
                shot_delay: 0.0,
                bullet_power: 0.0,
            },
            splash: TowerSpec {
                cost: 100,
                max_life: 3000.0,
                size: 25.0,
                shot_delay: 0.0,
                bullet_power: 0.0,
            },
            fast: TowerSpec {
                cost: 150,
                max_life: 3000.0,
                size: 25.0,
                shot_delay: 0.5,
                bullet_power: 1.0,
            },
            triple_shot: TowerSpec {
                cost: 300,
                max_life: 3000.0,
                size: 25.0,
                shot_delay: 0.75,
                bullet_power: 1.0,
            },
        }
    }
}

/// Optional overrides for one [`TowerSpec`]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TowerSpecPatch {
    cost: Option<u32>,
    max_life: Option<f32>,
    size: Option<f32>,
    shot_delay: Option<f32>,
    bullet_power: Option<f32>,
}

impl TowerSpecPatch {
    fn apply(self, base: TowerSpec) -> TowerSpec {
        TowerSpec {
            cost: self.cost.unwrap_or(base.cost),
            max_life: self.max_life.unwrap_or(base.max_life),
            size: self.size.unwrap_or(base.size),
            shot_delay: self.shot_delay.unwrap_or(base.shot_delay),
            bullet_power: self.bullet_power.unwrap_or(base.bullet_power),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TowerTablePatch {
    wall: TowerSpecPatch,
    splash: TowerSpecPatch,
    fast: TowerSpecPatch,
    triple_shot: TowerSpecPatch,
}

impl From<TowerTablePatch> for TowerTable {
    fn from(patch: TowerTablePatch) -> Self {
        let base = TowerTable::default();
        Self {
            wall: patch.wall.apply(base.wall),
            splash: patch.splash.apply(base.splash),
            fast: patch.fast.apply(base.fast),
            triple_shot: patch.triple_shot.apply(base.triple_shot),
        }
    }
}

impl TowerTable {
    pub fn spec(&self, kind: TowerKind) -> &TowerSpec {
        match kind {
            TowerKind::Wall => &self.wall,
            TowerKind::Splash => &self.splash,
            TowerKind::Fast => &self.fast,
            TowerKind::TripleShot => &self.triple_shot,
        }
    }
}

/// Combat, steering and projectile balance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatTuning {
    pub castle_max_life: f32,
    pub castle_size: f32,
    /// Castle life lost per enemy contact
    pub castle_contact_damage: f32,
    pub starting_credits: u32,
    pub enemy_size: f32,
    pub enemy_density: f32,
    pub enemy_damping: f32,
    /// Constant part of the steering force
    pub enemy_thrust_base: f32,
    /// Size-proportional part of the steering force
    pub enemy_thrust_factor: f32,
    /// Highest enemy level (maxLife = 2^level)
    pub max_enemy_level: u8,
    pub bullet_size: f32,
    pub bullet_density: f32,
    pub bullet_damping: f32,
    pub bullet_thrust: f32,
    /// Seconds before an unspent bullet expires
    pub bullet_ttl: f32,
    /// Distance at which a bullet counts as arrived
    pub bullet_arrival_epsilon: f32,
    /// Triple-shot spread either side of the aim vector (degrees)
    pub fan_degrees: f32,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            castle_max_life: 1000.0,
            castle_size: 75.0,
            castle_contact_damage: 1.0,
            starting_credits: 1000,
            enemy_size: 20.0,
            enemy_density: 1.05,
            enemy_damping: 1.0,
            enemy_thrust_base: 15.0,
            enemy_thrust_factor: std::f32::consts::PI * 2000.0 * 1.05,
            max_enemy_level: 9,
            bullet_size: 5.0,
            bullet_density: 0.05,
            bullet_damping: 1.0,
            bullet_thrust: 15.0 * std::f32::consts::PI * 2000.0 * 1.05,
            bullet_ttl: 10.0,
            bullet_arrival_epsilon: 5.0,
            fan_degrees: 15.0,
        }
    }
}

impl CombatTuning {
    /// Steering force magnitude for an enemy of the given size
    pub fn enemy_thrust(&self, size: f32) -> f32 {
        self.enemy_thrust_base + size * self.enemy_thrust_factor
    }
}

/// Wave schedule parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveTuning {
    /// Seconds between waves
    pub spawn_timeout: f32,
    /// Number of base levels in the table
    pub tiers: u8,
    /// Enemies of the base level in every wave
    pub base_count: u32,
    /// Escalating counts of the next level, one wave each
    pub escalation: Vec<u32>,
    /// Waves past this index repeat it
    pub max_wave_index: usize,
}

impl Default for WaveTuning {
    fn default() -> Self {
        Self {
            spawn_timeout: 10.0,
            tiers: 31,
            base_count: 30,
            escalation: vec![3, 10, 20, 30],
            max_wave_index: 40,
        }
    }
}

/// Physics solver parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    pub velocity_iterations: u32,
    pub position_iterations: u32,
    /// Largest distance a body may travel in one step
    pub max_translation: f32,
    pub restitution: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            velocity_iterations: 8,
            position_iterations: 3,
            max_translation: 12.0,
            restitution: 0.1,
        }
    }
}

/// Cosmetic day/night cycle timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaylightTuning {
    /// Seconds of full daylight before the cycle starts
    pub night_delay: f32,
    /// Seconds from full day to full night
    pub half_period: f32,
}

impl Default for DaylightTuning {
    fn default() -> Self {
        Self {
            night_delay: 10.0,
            half_period: 10.0,
        }
    }
}

/// Complete match configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub arena: ArenaConfig,
    pub towers: TowerTable,
    pub combat: CombatTuning,
    pub waves: WaveTuning,
    pub physics: PhysicsTuning,
    pub daylight: DaylightTuning,
}

impl Settings {
    /// Parse settings from a JSON document
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
