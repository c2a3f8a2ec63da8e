//! Deferred destruction
//!
//! Contact handling only enqueues; bodies are destroyed here, after the
//! physics step has finished iterating its contacts. Queues are sets so a
//! second enqueue of the same entity is a no-op.

use std::collections::BTreeSet;

use slotmap::{Key, SlotMap};

use super::entity::{BulletId, EnemyId, Entity, EntityRef, FastTowerId, TowerId};
use crate::physics::PhysicsWorld;

/// Entities waiting for the next reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct RemovalQueues {
    pub enemies: BTreeSet<EnemyId>,
    pub towers: BTreeSet<TowerId>,
    pub fast_towers: BTreeSet<FastTowerId>,
    pub bullets: BTreeSet<BulletId>,
}

impl RemovalQueues {
    pub fn is_empty(&self) -> bool {
        self.enemies.is_empty()
            && self.towers.is_empty()
            && self.fast_towers.is_empty()
            && self.bullets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.enemies.len() + self.towers.len() + self.fast_towers.len() + self.bullets.len()
    }

    /// Whether `entity` is already condemned this tick
    pub fn contains(&self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Castle => false,
            EntityRef::Enemy(id) => self.enemies.contains(&id),
            EntityRef::Tower(id) => self.towers.contains(&id),
            EntityRef::FastTower(id) => self.fast_towers.contains(&id),
            EntityRef::Bullet(id) => self.bullets.contains(&id),
        }
    }
}

/// Move queued entities out of `live`, destroying their bodies.
///
/// A queued body that already left the world is logged and skipped, never
/// destroyed twice. Returns the removed entities; the queue ends empty.
pub fn reconcile<K, E, W>(
    world: &mut W,
    live: &mut SlotMap<K, E>,
    queue: &mut BTreeSet<K>,
) -> Vec<(K, E)>
where
    K: Key + Ord,
    E: Entity,
    W: PhysicsWorld<EntityRef>,
{
    let mut removed = Vec::with_capacity(queue.len());
    for id in std::mem::take(queue) {
        let Some(entity) = live.remove(id) else {
            log::debug!("Removal of {:?} skipped: not in live set", id);
            continue;
        };
        let body = entity.body();
        if world.contains(body) {
            world.set_active(body, false);
            world.destroy_body(body);
        } else {
            log::warn!("Body {:?} of {:?} already left the world", body, id);
        }
        removed.push((id, entity));
    }
    removed
}
