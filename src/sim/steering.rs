//! Per-tick movement forces
//!
//! Enemies thrust toward their goal near the castle; bullets home on the
//! point they were fired at. Neither ever stops on arrival by itself.

use glam::Vec2;

use super::entity::{Bullet, Chicken, EntityRef};
use crate::heading;
use crate::physics::PhysicsWorld;
use crate::settings::CombatTuning;

/// Heading and force for an enemy at `pos` steering to `destination`
pub fn steering_force(pos: Vec2, destination: Vec2, size: f32, combat: &CombatTuning) -> (f32, Vec2) {
    let angle = heading(pos, destination);
    let force = Vec2::from_angle(angle) * combat.enemy_thrust(size);
    (angle, force)
}

/// Point the enemy at its goal and push it forward
pub fn steer_enemy<W: PhysicsWorld<EntityRef>>(
    chicken: &mut Chicken,
    world: &mut W,
    combat: &CombatTuning,
) {
    let (angle, force) = steering_force(chicken.pos, chicken.destination, chicken.size, combat);
    chicken.angle = angle;
    world.apply_force(chicken.body, force);
}

/// Push the bullet toward its fixed destination
pub fn home_bullet<W: PhysicsWorld<EntityRef>>(
    bullet: &mut Bullet,
    world: &mut W,
    combat: &CombatTuning,
) {
    if bullet.pos == bullet.destination {
        return;
    }
    let angle = heading(bullet.pos, bullet.destination);
    bullet.angle = angle;
    world.apply_force(bullet.body, Vec2::from_angle(angle) * combat.bullet_thrust);
}
