//! Read-only match state for presentation and the headless runner

use glam::Vec2;
use serde::Serialize;

use super::entity::{Bullet, Castle, Chicken, Entity, FastTower, Tower, TowerKind};
use crate::settings::Cell;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CastleView {
    pub pos: Vec2,
    pub size: f32,
    pub life: f32,
    pub max_life: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnemyView {
    pub pos: Vec2,
    pub angle: f32,
    pub size: f32,
    pub life: f32,
    pub max_life: f32,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TowerView {
    pub kind: TowerKind,
    pub cell: Cell,
    pub pos: Vec2,
    pub angle: f32,
    pub size: f32,
    pub life: f32,
    pub max_life: f32,
    /// Seconds until the next shot; always 0 for walls
    pub cooldown: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulletView {
    pub pos: Vec2,
    pub size: f32,
}

/// Everything presentation needs to draw one frame
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub castle: CastleView,
    pub enemies: Vec<EnemyView>,
    pub towers: Vec<TowerView>,
    pub fast_towers: Vec<TowerView>,
    pub bullets: Vec<BulletView>,
    pub credits: u32,
    pub current_wave: usize,
    pub time_to_next_wave: f32,
    /// Night overlay opacity
    pub daylight: f32,
    pub elapsed: f32,
    pub ended: bool,
}

impl From<&Castle> for CastleView {
    fn from(castle: &Castle) -> Self {
        Self {
            pos: castle.position(),
            size: castle.size(),
            life: castle.life.current(),
            max_life: castle.life.max(),
        }
    }
}

impl From<&Chicken> for EnemyView {
    fn from(chicken: &Chicken) -> Self {
        Self {
            pos: chicken.pos,
            angle: chicken.angle,
            size: chicken.size,
            life: chicken.life.current(),
            max_life: chicken.life.max(),
            level: chicken.level,
        }
    }
}

impl From<&Tower> for TowerView {
    fn from(tower: &Tower) -> Self {
        Self {
            kind: tower.kind,
            cell: tower.cell,
            pos: tower.pos,
            angle: tower.angle,
            size: tower.size,
            life: tower.life.current(),
            max_life: tower.life.max(),
            cooldown: 0.0,
        }
    }
}

impl From<&FastTower> for TowerView {
    fn from(tower: &FastTower) -> Self {
        Self {
            kind: tower.kind,
            cell: tower.cell,
            pos: tower.pos,
            angle: tower.angle,
            size: tower.size,
            life: tower.life.current(),
            max_life: tower.life.max(),
            cooldown: (tower.shot_delay - tower.last_shot_time).max(0.0),
        }
    }
}

impl From<&Bullet> for BulletView {
    fn from(bullet: &Bullet) -> Self {
        Self {
            pos: bullet.pos,
            size: bullet.size,
        }
    }
}
