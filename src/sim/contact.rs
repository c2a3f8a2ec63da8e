//! Contact resolution
//!
//! Turns contact-begin events into damage. Only health and the removal
//! queues are touched here; the physics world is still mid-step.
//!
//! | enemy hits  | effect                                               |
//! |-------------|------------------------------------------------------|
//! | castle      | castle loses `castle_contact_damage`; depletion ends |
//! | bullet      | enemy loses bullet power, bullet consumed            |
//! | wall/splash | tower loses 1                                        |
//! | shooter     | tower loses `level * 2 + 1`                          |

use slotmap::SlotMap;

use super::controller::MatchPhase;
use super::entity::{
    Bullet, BulletId, Castle, Chicken, EnemyId, EntityRef, FastTower, FastTowerId, Tower, TowerId,
};
use super::events::GameEvent;
use super::removal::RemovalQueues;
use crate::physics::ContactListener;
use crate::settings::CombatTuning;

/// Damage dealt to walls per enemy contact
const WALL_CONTACT_DAMAGE: f32 = 1.0;

/// Mutable view of the match handed to the physics step
pub struct ContactResolver<'a> {
    pub castle: &'a mut Castle,
    pub enemies: &'a mut SlotMap<EnemyId, Chicken>,
    pub towers: &'a mut SlotMap<TowerId, Tower>,
    pub fast_towers: &'a mut SlotMap<FastTowerId, FastTower>,
    pub bullets: &'a SlotMap<BulletId, Bullet>,
    pub removals: &'a mut RemovalQueues,
    pub credits: &'a mut u32,
    pub phase: &'a mut MatchPhase,
    pub events: &'a mut Vec<GameEvent>,
    pub combat: &'a CombatTuning,
}

impl ContactResolver<'_> {
    /// Handle one ordering of a contact pair
    fn check(&mut self, first: EntityRef, second: EntityRef) {
        let EntityRef::Enemy(enemy_id) = first else {
            return;
        };
        if self.removals.enemies.contains(&enemy_id) {
            return;
        }
        let Some(enemy) = self.enemies.get_mut(enemy_id) else {
            return;
        };

        match second {
            EntityRef::Castle => {
                let depleted = self.castle.life.damage(self.combat.castle_contact_damage);
                self.events.push(GameEvent::CastleHit {
                    life: self.castle.life.current(),
                });
                if depleted && *self.phase == MatchPhase::Active {
                    log::info!("Castle has fallen");
                    *self.phase = MatchPhase::Ended;
                    self.events.push(GameEvent::MatchEnded);
                }
            }
            EntityRef::Bullet(bullet_id) => {
                if self.removals.bullets.contains(&bullet_id) {
                    return;
                }
                let Some(bullet) = self.bullets.get(bullet_id) else {
                    return;
                };
                self.removals.bullets.insert(bullet_id);
                self.events.push(GameEvent::EnemyHit { level: enemy.level });

                if enemy.life.damage(bullet.power) {
                    self.removals.enemies.insert(enemy_id);
                    let reward = enemy.reward();
                    *self.credits += reward;
                    log::debug!("Enemy level {} killed, +{} credits", enemy.level, reward);
                    self.events.push(GameEvent::EnemyKilled {
                        level: enemy.level,
                        reward,
                    });
                }
            }
            EntityRef::Tower(tower_id) => {
                if self.removals.towers.contains(&tower_id) {
                    return;
                }
                if let Some(tower) = self.towers.get_mut(tower_id) {
                    if tower.life.damage(WALL_CONTACT_DAMAGE) {
                        self.removals.towers.insert(tower_id);
                    }
                }
            }
            EntityRef::FastTower(tower_id) => {
                if self.removals.fast_towers.contains(&tower_id) {
                    return;
                }
                let damage = enemy.reward() as f32;
                if let Some(tower) = self.fast_towers.get_mut(tower_id) {
                    if tower.life.damage(damage) {
                        self.removals.fast_towers.insert(tower_id);
                    }
                }
            }
            EntityRef::Enemy(_) => {}
        }
    }
}

impl ContactListener<EntityRef> for ContactResolver<'_> {
    fn begin_contact(&mut self, a: EntityRef, b: EntityRef) {
        self.check(a, b);
        self.check(b, a);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{PhysicsWorld, RapierWorld};
    use crate::settings::{Cell, Settings};
    use crate::sim::entity::{Shot, TowerKind};
    use glam::Vec2;

    struct Arena {
        settings: Settings,
        world: RapierWorld<EntityRef>,
        castle: Castle,
        enemies: SlotMap<EnemyId, Chicken>,
        towers: SlotMap<TowerId, Tower>,
        fast_towers: SlotMap<FastTowerId, FastTower>,
        bullets: SlotMap<BulletId, Bullet>,
        removals: RemovalQueues,
        credits: u32,
        phase: MatchPhase,
        events: Vec<GameEvent>,
    }

    impl Arena {
        fn new() -> Self {
            let settings = Settings::default();
            let mut world = RapierWorld::new(12.0);
            let castle = Castle::new(&mut world, Vec2::ZERO, &settings.combat, &settings.physics);
            Self {
                settings,
                world,
                castle,
                enemies: SlotMap::with_key(),
                towers: SlotMap::with_key(),
                fast_towers: SlotMap::with_key(),
                bullets: SlotMap::with_key(),
                removals: RemovalQueues::default(),
                credits: 0,
                phase: MatchPhase::Active,
                events: Vec::new(),
            }
        }

        fn enemy(&mut self, level: u8) -> EnemyId {
            let (world, combat, physics) = (&mut self.world, &self.settings.combat, &self.settings.physics);
            self.enemies.insert_with_key(|id| {
                Chicken::new(world, id, level, Vec2::new(500.0, 0.0), Vec2::ZERO, combat, physics)
            })
        }

        fn bullet(&mut self, power: f32) -> BulletId {
            let shot = Shot {
                origin: Vec2::new(-500.0, 0.0),
                destination: Vec2::ZERO,
                angle: 0.0,
                power,
            };
            let (world, combat, physics) = (&mut self.world, &self.settings.combat, &self.settings.physics);
            self.bullets
                .insert_with_key(|id| Bullet::new(world, id, &shot, combat, physics))
        }

        fn fast_tower(&mut self) -> FastTowerId {
            let spec = self.settings.towers.spec(TowerKind::Fast).clone();
            let (world, physics) = (&mut self.world, &self.settings.physics);
            self.fast_towers.insert_with_key(|id| {
                FastTower::new(world, id, TowerKind::Fast, Cell::new(2, 0), Vec2::new(100.0, 0.0), &spec, physics)
            })
        }

        fn wall(&mut self) -> TowerId {
            let spec = self.settings.towers.spec(TowerKind::Wall).clone();
            let (world, physics) = (&mut self.world, &self.settings.physics);
            self.towers.insert_with_key(|id| {
                Tower::new(world, id, TowerKind::Wall, Cell::new(-2, 0), Vec2::new(-100.0, 0.0), &spec, physics)
            })
        }

        fn contact(&mut self, a: EntityRef, b: EntityRef) {
            let mut resolver = ContactResolver {
                castle: &mut self.castle,
                enemies: &mut self.enemies,
                towers: &mut self.towers,
                fast_towers: &mut self.fast_towers,
                bullets: &self.bullets,
                removals: &mut self.removals,
                credits: &mut self.credits,
                phase: &mut self.phase,
                events: &mut self.events,
                combat: &self.settings.combat,
            };
            resolver.begin_contact(a, b);
        }
    }

    #[test]
    fn test_enemy_hits_castle_in_either_order() {
        let mut arena = Arena::new();
        let enemy = arena.enemy(0);

        arena.contact(EntityRef::Enemy(enemy), EntityRef::Castle);
        arena.contact(EntityRef::Castle, EntityRef::Enemy(enemy));

        assert_eq!(arena.castle.life.current(), 998.0);
        // Hitting the castle never hurts the enemy
        assert_eq!(arena.enemies[enemy].life.current(), 1.0);
        assert!(arena.removals.is_empty());
    }

    #[test]
    fn test_castle_depletion_ends_match_once() {
        let mut arena = Arena::new();
        arena.settings.combat.castle_contact_damage = 600.0;
        let enemy = arena.enemy(0);

        arena.contact(EntityRef::Enemy(enemy), EntityRef::Castle);
        assert_eq!(arena.phase, MatchPhase::Active);
        arena.contact(EntityRef::Enemy(enemy), EntityRef::Castle);
        assert_eq!(arena.phase, MatchPhase::Ended);
        arena.contact(EntityRef::Enemy(enemy), EntityRef::Castle);

        let ended = arena.events.iter().filter(|e| **e == GameEvent::MatchEnded).count();
        assert_eq!(ended, 1);
    }

    #[test]
    fn test_bullet_damages_and_kill_awards_credits() {
        let mut arena = Arena::new();
        let enemy = arena.enemy(2);
        let first = arena.bullet(3.0);
        let second = arena.bullet(3.0);

        arena.contact(EntityRef::Bullet(first), EntityRef::Enemy(enemy));
        assert_eq!(arena.enemies[enemy].life.current(), 1.0);
        assert!(arena.removals.bullets.contains(&first));
        assert!(arena.removals.enemies.is_empty());
        assert_eq!(arena.credits, 0);

        arena.contact(EntityRef::Enemy(enemy), EntityRef::Bullet(second));
        assert!(arena.removals.enemies.contains(&enemy));
        assert_eq!(arena.credits, 5);
        assert!(arena.events.contains(&GameEvent::EnemyKilled { level: 2, reward: 5 }));
    }

    #[test]
    fn test_spent_bullet_does_no_more_damage() {
        let mut arena = Arena::new();
        let a = arena.enemy(3);
        let b = arena.enemy(3);
        let bullet = arena.bullet(1.0);

        arena.contact(EntityRef::Enemy(a), EntityRef::Bullet(bullet));
        arena.contact(EntityRef::Enemy(b), EntityRef::Bullet(bullet));

        assert_eq!(arena.enemies[a].life.current(), 7.0);
        assert_eq!(arena.enemies[b].life.current(), 8.0);
    }

    #[test]
    fn test_queued_enemy_is_not_mutated_again() {
        let mut arena = Arena::new();
        let enemy = arena.enemy(0);
        let b1 = arena.bullet(5.0);
        let b2 = arena.bullet(5.0);
        let wall = arena.wall();

        arena.contact(EntityRef::Enemy(enemy), EntityRef::Bullet(b1));
        let life = arena.enemies[enemy].life.current();
        let credits = arena.credits;

        arena.contact(EntityRef::Enemy(enemy), EntityRef::Bullet(b2));
        arena.contact(EntityRef::Enemy(enemy), EntityRef::Tower(wall));
        arena.contact(EntityRef::Enemy(enemy), EntityRef::Castle);

        assert_eq!(arena.enemies[enemy].life.current(), life);
        assert_eq!(arena.credits, credits);
        assert!(!arena.removals.bullets.contains(&b2));
        assert_eq!(arena.towers[wall].life.current(), 1000.0);
        assert_eq!(arena.castle.life.current(), 1000.0);
        assert_eq!(arena.removals.enemies.len(), 1);
    }

    #[test]
    fn test_wall_loses_one_per_contact() {
        let mut arena = Arena::new();
        let enemy = arena.enemy(9);
        let wall = arena.wall();

        arena.contact(EntityRef::Tower(wall), EntityRef::Enemy(enemy));
        assert_eq!(arena.towers[wall].life.current(), 999.0);
    }

    #[test]
    fn test_shooter_loses_level_scaled_damage() {
        let mut arena = Arena::new();
        let enemy = arena.enemy(4);
        let tower = arena.fast_tower();

        arena.contact(EntityRef::Enemy(enemy), EntityRef::FastTower(tower));
        assert_eq!(arena.fast_towers[tower].life.current(), 3000.0 - 9.0);
        assert!(arena.removals.fast_towers.is_empty());
    }

    #[test]
    fn test_depleted_tower_is_queued_once() {
        let mut arena = Arena::new();
        let enemy = arena.enemy(9);
        let tower = arena.fast_tower();
        for _ in 0..200 {
            arena.contact(EntityRef::Enemy(enemy), EntityRef::FastTower(tower));
        }
        assert!(arena.removals.fast_towers.contains(&tower));
        // 3000 / 19 = 157.9: the 158th contact depletes it, later ones are ignored
        assert_eq!(arena.fast_towers[tower].life.current(), 3000.0 - 158.0 * 19.0);
        assert!(arena.world.contains(arena.fast_towers[tower].body));
    }

    #[test]
    fn test_non_enemy_pairs_are_ignored() {
        let mut arena = Arena::new();
        let bullet = arena.bullet(1.0);
        let wall = arena.wall();
        arena.contact(EntityRef::Bullet(bullet), EntityRef::Tower(wall));
        arena.contact(EntityRef::Castle, EntityRef::Tower(wall));
        assert!(arena.removals.is_empty());
        assert!(arena.events.is_empty());
    }
}
