//! Match events for presentation (sound cues, HUD messages)

use serde::Serialize;

use super::entity::TowerKind;
use crate::settings::Cell;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    WaveSpawned { wave: usize, enemies: usize },
    /// A bullet struck an enemy (hit cue)
    EnemyHit { level: u8 },
    EnemyKilled { level: u8, reward: u32 },
    TowerPlaced { kind: TowerKind, cell: Cell },
    TowerUpgraded { kind: TowerKind, cell: Cell, max_life: f32 },
    TowerDestroyed { kind: TowerKind, cell: Cell },
    BulletsFired { count: usize },
    CastleHit { life: f32 },
    MatchEnded,
}
