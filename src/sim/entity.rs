//! Simulation entities
//!
//! Each entity owns exactly one physics body, created in its constructor and
//! destroyed by the controller's reconciliation pass. Positions are mirrored
//! from the body after every physics step; the body is the source of truth.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use slotmap::{Key, KeyData, new_key_type};

use crate::consts::*;
use crate::physics::{BodyDesc, BodyHandle, BodyKind, BodyTag, CollisionFilter, PhysicsWorld};
use crate::settings::{Cell, CombatTuning, PhysicsTuning, TowerSpec};
use crate::{heading, polar_to_cartesian, rotate_about};

new_key_type! {
    pub struct EnemyId;
    pub struct TowerId;
    pub struct FastTowerId;
    pub struct BulletId;
}

/// Physics user data: which entity a body belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Castle,
    Enemy(EnemyId),
    Tower(TowerId),
    FastTower(FastTowerId),
    Bullet(BulletId),
}

/// Collider tag layout: variant in bits 64..72, slot key in the low 64 bits
impl BodyTag for EntityRef {
    fn to_bits(self) -> u128 {
        let (variant, key) = match self {
            EntityRef::Castle => (0u128, 0u64),
            EntityRef::Enemy(id) => (1, id.data().as_ffi()),
            EntityRef::Tower(id) => (2, id.data().as_ffi()),
            EntityRef::FastTower(id) => (3, id.data().as_ffi()),
            EntityRef::Bullet(id) => (4, id.data().as_ffi()),
        };
        (variant << 64) | u128::from(key)
    }

    fn from_bits(bits: u128) -> Option<Self> {
        let key = KeyData::from_ffi(bits as u64);
        match bits >> 64 {
            0 => Some(EntityRef::Castle),
            1 => Some(EntityRef::Enemy(key.into())),
            2 => Some(EntityRef::Tower(key.into())),
            3 => Some(EntityRef::FastTower(key.into())),
            4 => Some(EntityRef::Bullet(key.into())),
            _ => None,
        }
    }
}

/// Placeable tower types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TowerKind {
    /// Blocking obstacle, no attack
    Wall,
    /// Sturdier obstacle, no attack
    Splash,
    /// Fires one bullet per shot
    Fast,
    /// Fires three bullets fanned around the aim vector
    TripleShot,
}

impl TowerKind {
    pub const ALL: [TowerKind; 4] = [
        TowerKind::Wall,
        TowerKind::Splash,
        TowerKind::Fast,
        TowerKind::TripleShot,
    ];

    /// Whether this kind lives in the fast-tower collection and fires bullets
    pub fn shoots(self) -> bool {
        matches!(self, TowerKind::Fast | TowerKind::TripleShot)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TowerKind::Wall => "wall",
            TowerKind::Splash => "splash",
            TowerKind::Fast => "fast",
            TowerKind::TripleShot => "triple",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "wall" => Some(TowerKind::Wall),
            "splash" => Some(TowerKind::Splash),
            "fast" => Some(TowerKind::Fast),
            "triple" | "triple-shot" | "tripleshot" => Some(TowerKind::TripleShot),
            _ => None,
        }
    }
}

/// Health counter. `max` only ever grows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Life {
    current: f32,
    max: f32,
}

impl Life {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    /// Fraction of health left, clamped to [0, 1] for display
    pub fn ratio(&self) -> f32 {
        if self.max <= 0.0 {
            return 0.0;
        }
        (self.current / self.max).clamp(0.0, 1.0)
    }

    /// Subtract damage; returns true if this left the entity depleted
    pub fn damage(&mut self, amount: f32) -> bool {
        self.current -= amount.max(0.0);
        self.is_depleted()
    }

    /// Dead entities have strictly negative life
    pub fn is_depleted(&self) -> bool {
        self.current < 0.0
    }

    /// Upgrade: double current and maximum together
    pub fn double(&mut self) {
        self.current *= 2.0;
        self.max *= 2.0;
    }
}

/// Read-only view shared by every entity
pub trait Entity {
    fn body(&self) -> BodyHandle;
    fn position(&self) -> Vec2;
    fn size(&self) -> f32;
    fn angle(&self) -> f32;
    fn life(&self) -> &Life;

    /// Mirror the body position after a physics step
    fn sync(&mut self, position: Vec2);
}

macro_rules! impl_entity {
    ($ty:ty) => {
        impl Entity for $ty {
            fn body(&self) -> BodyHandle {
                self.body
            }
            fn position(&self) -> Vec2 {
                self.pos
            }
            fn size(&self) -> f32 {
                self.size
            }
            fn angle(&self) -> f32 {
                self.angle
            }
            fn life(&self) -> &Life {
                &self.life
            }
            fn sync(&mut self, position: Vec2) {
                self.pos = position;
            }
        }
    };
}

fn static_body(
    position: Vec2,
    radius: f32,
    physics: &PhysicsTuning,
    user_data: EntityRef,
) -> BodyDesc<EntityRef> {
    BodyDesc {
        kind: BodyKind::Static,
        position,
        radius,
        density: 0.5,
        linear_damping: 1.0,
        restitution: physics.restitution,
        filter: CollisionFilter::new(TOWER_CATEGORY, TOWER_MASK),
        user_data,
    }
}

/// The defended structure. Its depletion ends the match.
#[derive(Debug, Clone)]
pub struct Castle {
    pub body: BodyHandle,
    pub pos: Vec2,
    pub size: f32,
    pub angle: f32,
    pub life: Life,
}

impl Castle {
    pub fn new<W: PhysicsWorld<EntityRef>>(
        world: &mut W,
        position: Vec2,
        combat: &CombatTuning,
        physics: &PhysicsTuning,
    ) -> Self {
        let body = world.create_body(static_body(
            position,
            combat.castle_size,
            physics,
            EntityRef::Castle,
        ));
        Self {
            body,
            pos: position,
            size: combat.castle_size,
            angle: 0.0,
            life: Life::new(combat.castle_max_life),
        }
    }
}

/// Non-shooting tower (wall or splash)
#[derive(Debug, Clone)]
pub struct Tower {
    pub kind: TowerKind,
    pub cell: Cell,
    pub body: BodyHandle,
    pub pos: Vec2,
    pub size: f32,
    pub angle: f32,
    pub life: Life,
}

impl Tower {
    pub fn new<W: PhysicsWorld<EntityRef>>(
        world: &mut W,
        id: TowerId,
        kind: TowerKind,
        cell: Cell,
        position: Vec2,
        spec: &TowerSpec,
        physics: &PhysicsTuning,
    ) -> Self {
        debug_assert!(!kind.shoots());
        let body = world.create_body(static_body(
            position,
            spec.size,
            physics,
            EntityRef::Tower(id),
        ));
        Self {
            kind,
            cell,
            body,
            pos: position,
            size: spec.size,
            angle: 0.0,
            life: Life::new(spec.max_life),
        }
    }

    pub fn upgrade(&mut self) {
        self.life.double();
    }
}

/// A bullet about to be created by a firing tower
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    pub origin: Vec2,
    pub destination: Vec2,
    pub angle: f32,
    pub power: f32,
}

/// Shooting tower (fast or triple-shot)
#[derive(Debug, Clone)]
pub struct FastTower {
    pub kind: TowerKind,
    pub cell: Cell,
    pub body: BodyHandle,
    pub pos: Vec2,
    pub size: f32,
    /// Aim direction of the last shot
    pub angle: f32,
    pub life: Life,
    /// Cooldown between shots (seconds)
    pub shot_delay: f32,
    /// Seconds since the last shot
    pub last_shot_time: f32,
    pub bullet_power: f32,
}

impl FastTower {
    pub fn new<W: PhysicsWorld<EntityRef>>(
        world: &mut W,
        id: FastTowerId,
        kind: TowerKind,
        cell: Cell,
        position: Vec2,
        spec: &TowerSpec,
        physics: &PhysicsTuning,
    ) -> Self {
        debug_assert!(kind.shoots());
        let body = world.create_body(static_body(
            position,
            spec.size,
            physics,
            EntityRef::FastTower(id),
        ));
        Self {
            kind,
            cell,
            body,
            pos: position,
            size: spec.size,
            angle: 0.0,
            life: Life::new(spec.max_life),
            shot_delay: spec.shot_delay,
            last_shot_time: 0.0,
            bullet_power: spec.bullet_power,
        }
    }

    pub fn upgrade(&mut self) {
        self.life.double();
    }

    /// Cooldown tick
    pub fn update(&mut self, dt: f32) {
        self.last_shot_time += dt;
    }

    pub fn is_ready(&self) -> bool {
        self.last_shot_time >= self.shot_delay
    }

    /// Bullet destinations for a shot at `target`
    ///
    /// Triple-shot fans its outer bullets `fan` radians either side of the
    /// aim vector, rotating about the tower.
    pub fn bullet_destinations(&self, target: Vec2, fan: f32) -> Vec<Vec2> {
        match self.kind {
            TowerKind::TripleShot => vec![
                rotate_about(target, self.pos, -fan),
                target,
                rotate_about(target, self.pos, fan),
            ],
            _ => vec![target],
        }
    }

    /// Fire at `target`: reset the cooldown, face the target and emit shots.
    /// Each bullet starts on the tower's rim along its own heading.
    pub fn fire(&mut self, target: Vec2, fan: f32) -> Vec<Shot> {
        self.last_shot_time = 0.0;
        self.angle = heading(self.pos, target);
        self.bullet_destinations(target, fan)
            .into_iter()
            .map(|destination| {
                let angle = heading(self.pos, destination);
                Shot {
                    origin: self.pos + polar_to_cartesian(self.size, angle),
                    destination,
                    angle,
                    power: self.bullet_power,
                }
            })
            .collect()
    }
}

/// The enemy. Level sets both toughness and kill reward.
#[derive(Debug, Clone)]
pub struct Chicken {
    pub level: u8,
    pub body: BodyHandle,
    pub pos: Vec2,
    pub size: f32,
    /// Travel direction (for sprite rotation)
    pub angle: f32,
    pub life: Life,
    /// Steering goal near the castle
    pub destination: Vec2,
}

impl Chicken {
    pub fn new<W: PhysicsWorld<EntityRef>>(
        world: &mut W,
        id: EnemyId,
        level: u8,
        position: Vec2,
        destination: Vec2,
        combat: &CombatTuning,
        physics: &PhysicsTuning,
    ) -> Self {
        let body = world.create_body(BodyDesc {
            kind: BodyKind::Dynamic,
            position,
            radius: combat.enemy_size,
            density: combat.enemy_density,
            linear_damping: combat.enemy_damping,
            restitution: physics.restitution,
            filter: CollisionFilter::new(ENEMY_CATEGORY, ENEMY_MASK),
            user_data: EntityRef::Enemy(id),
        });
        Self {
            level,
            body,
            pos: position,
            size: combat.enemy_size,
            angle: heading(position, destination),
            life: Life::new(Self::max_life_for(level)),
            destination,
        }
    }

    /// 2^level
    pub fn max_life_for(level: u8) -> f32 {
        2f32.powi(level as i32)
    }

    /// Credits for a kill; also the damage dealt to shooting towers on contact
    pub fn reward(&self) -> u32 {
        self.level as u32 * 2 + 1
    }
}

/// A homing projectile
#[derive(Debug, Clone)]
pub struct Bullet {
    pub body: BodyHandle,
    pub pos: Vec2,
    pub size: f32,
    pub angle: f32,
    pub life: Life,
    /// Fixed at creation
    pub destination: Vec2,
    pub power: f32,
    /// Seconds alive
    pub time_to_live: f32,
}

impl Bullet {
    pub fn new<W: PhysicsWorld<EntityRef>>(
        world: &mut W,
        id: BulletId,
        shot: &Shot,
        combat: &CombatTuning,
        physics: &PhysicsTuning,
    ) -> Self {
        let body = world.create_body(BodyDesc {
            kind: BodyKind::Dynamic,
            position: shot.origin,
            radius: combat.bullet_size,
            density: combat.bullet_density,
            linear_damping: combat.bullet_damping,
            restitution: physics.restitution,
            filter: CollisionFilter::new(BULLET_CATEGORY, BULLET_MASK),
            user_data: EntityRef::Bullet(id),
        });
        Self {
            body,
            pos: shot.origin,
            size: combat.bullet_size,
            angle: shot.angle,
            life: Life::new(1.0),
            destination: shot.destination,
            power: shot.power,
            time_to_live: 0.0,
        }
    }

    pub fn age(&mut self, dt: f32) {
        self.time_to_live += dt;
    }

    pub fn is_expired(&self, ttl: f32) -> bool {
        self.time_to_live > ttl
    }

    pub fn has_arrived(&self, epsilon: f32) -> bool {
        self.pos.distance(self.destination) < epsilon
    }
}

impl_entity!(Castle);
impl_entity!(Tower);
impl_entity!(FastTower);
impl_entity!(Chicken);
impl_entity!(Bullet);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::RapierWorld;
    use crate::settings::{Settings, TowerTable};
    use proptest::prelude::*;
    use slotmap::SlotMap;
    use std::f32::consts::FRAC_PI_2;

    fn fast_tower(kind: TowerKind, pos: Vec2) -> (RapierWorld<EntityRef>, FastTower) {
        let mut world = RapierWorld::new(12.0);
        let table = TowerTable::default();
        let id = FastTowerId::from(KeyData::from_ffi(1));
        let tower = FastTower::new(
            &mut world,
            id,
            kind,
            Cell::new(1, 1),
            pos,
            table.spec(kind),
            &PhysicsTuning::default(),
        );
        (world, tower)
    }

    #[test]
    fn test_life_upgrade_doubles_both() {
        let mut life = Life::new(1000.0);
        life.damage(400.0);
        life.double();
        assert_eq!(life.current(), 1200.0);
        assert_eq!(life.max(), 2000.0);
    }

    #[test]
    fn test_life_depleted_only_below_zero() {
        let mut life = Life::new(1.0);
        assert!(!life.damage(1.0));
        assert_eq!(life.current(), 0.0);
        assert!(life.damage(0.5));
        assert_eq!(life.ratio(), 0.0);
    }

    #[test]
    fn test_negative_damage_never_heals() {
        let mut life = Life::new(10.0);
        life.damage(-5.0);
        assert_eq!(life.current(), 10.0);
    }

    #[test]
    fn test_chicken_life_and_reward_scale_with_level() {
        assert_eq!(Chicken::max_life_for(0), 1.0);
        assert_eq!(Chicken::max_life_for(9), 512.0);

        let settings = Settings::default();
        let mut world = RapierWorld::new(12.0);
        let chicken = Chicken::new(
            &mut world,
            EnemyId::from(KeyData::from_ffi(1)),
            3,
            Vec2::new(-500.0, 0.0),
            Vec2::ZERO,
            &settings.combat,
            &settings.physics,
        );
        assert_eq!(chicken.life.max(), 8.0);
        assert_eq!(chicken.reward(), 7);
        assert!(world.contains(chicken.body));
        assert!(chicken.angle.abs() < 1e-6);
    }

    #[test]
    fn test_fast_tower_fires_one_bullet() {
        let (_, mut tower) = fast_tower(TowerKind::Fast, Vec2::ZERO);
        tower.last_shot_time = 0.6;
        assert!(tower.is_ready());

        let shots = tower.fire(Vec2::new(0.0, 100.0), 15f32.to_radians());
        assert_eq!(shots.len(), 1);
        assert_eq!(tower.last_shot_time, 0.0);
        assert!((tower.angle - FRAC_PI_2).abs() < 1e-6);
        // Spawned on the rim, along the aim
        assert!((shots[0].origin - Vec2::new(0.0, 25.0)).length() < 1e-4);
        assert_eq!(shots[0].destination, Vec2::new(0.0, 100.0));
    }

    #[test]
    fn test_triple_shot_fans_fifteen_degrees() {
        let (_, mut tower) = fast_tower(TowerKind::TripleShot, Vec2::new(50.0, 50.0));
        let target = Vec2::new(150.0, 50.0);
        let fan = 15f32.to_radians();
        let shots = tower.fire(target, fan);
        assert_eq!(shots.len(), 3);

        let angles: Vec<f32> = shots.iter().map(|s| s.angle).collect();
        assert!((angles[0] + fan).abs() < 1e-5);
        assert!(angles[1].abs() < 1e-6);
        assert!((angles[2] - fan).abs() < 1e-5);

        // Fanned destinations stay at the target's distance from the tower
        for shot in &shots {
            assert!((shot.destination.distance(tower.pos) - 100.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_cooldown_accumulates() {
        let (_, mut tower) = fast_tower(TowerKind::Fast, Vec2::ZERO);
        tower.update(0.3);
        assert!(!tower.is_ready());
        tower.update(0.2);
        assert!(tower.is_ready());
    }

    #[test]
    fn test_bullet_ttl_and_arrival() {
        let settings = Settings::default();
        let mut world = RapierWorld::new(12.0);
        let shot = Shot {
            origin: Vec2::ZERO,
            destination: Vec2::new(100.0, 0.0),
            angle: 0.0,
            power: 1.0,
        };
        let mut bullet = Bullet::new(
            &mut world,
            BulletId::from(KeyData::from_ffi(1)),
            &shot,
            &settings.combat,
            &settings.physics,
        );
        bullet.age(10.0);
        assert!(!bullet.is_expired(10.0));
        bullet.age(0.01);
        assert!(bullet.is_expired(10.0));

        assert!(!bullet.has_arrived(5.0));
        bullet.sync(Vec2::new(97.0, 2.0));
        assert!(bullet.has_arrived(5.0));
    }

    #[test]
    fn test_entity_ref_survives_collider_tag() {
        let mut enemies: SlotMap<EnemyId, ()> = SlotMap::with_key();
        enemies.insert(());
        let enemy = enemies.insert(());
        let refs = [
            EntityRef::Castle,
            EntityRef::Enemy(enemy),
            EntityRef::Tower(TowerId::from(KeyData::from_ffi(3))),
            EntityRef::FastTower(FastTowerId::from(KeyData::from_ffi(5))),
            EntityRef::Bullet(BulletId::from(KeyData::from_ffi(7))),
        ];
        for r in refs {
            assert_eq!(EntityRef::from_bits(r.to_bits()), Some(r));
        }
        assert_eq!(EntityRef::from_bits(9u128 << 64), None);
    }

    #[test]
    fn test_tower_kind_parsing() {
        for kind in TowerKind::ALL {
            assert_eq!(TowerKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(TowerKind::from_str("FAST"), Some(TowerKind::Fast));
        assert_eq!(TowerKind::from_str("cannon"), None);
    }

    proptest! {
        #[test]
        fn prop_life_never_increases(damage in proptest::collection::vec(-50.0f32..50.0, 0..40)) {
            let mut life = Life::new(100.0);
            let mut last = life.current();
            for amount in damage {
                life.damage(amount);
                prop_assert!(life.current() <= last);
                last = life.current();
            }
        }

        #[test]
        fn prop_upgrade_doubles_both(max in 1.0f32..5000.0, taken in 0.0f32..1.0) {
            let mut life = Life::new(max);
            life.damage(max * taken);
            let before = life;
            life.double();
            prop_assert_eq!(life.current(), before.current() * 2.0);
            prop_assert_eq!(life.max(), before.max() * 2.0);
        }
    }
}
