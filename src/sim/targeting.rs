//! Target selection for shooting towers
//!
//! Enemies near the castle take priority: while any enemy is inside castle
//! range, every ready tower aims at the one closest to the castle. Otherwise
//! each tower picks its own closest enemy among those in tower range and
//! within its reach. Ties go to the first enemy in iteration order.

use glam::Vec2;
use slotmap::SlotMap;

use super::entity::{Chicken, EnemyId};
use crate::settings::ArenaConfig;

/// A candidate enemy and where it was at the start of the pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub id: EnemyId,
    pub pos: Vec2,
}

/// Enemies eligible for this tick's targeting pass
#[derive(Debug, Clone, Default)]
pub struct TargetPools {
    /// Closest enemy to the castle within castle range, if any
    pub priority: Option<Target>,
    /// Every enemy within tower range of the castle
    pub engageable: Vec<Target>,
}

impl TargetPools {
    /// Partition live enemies by distance from the castle
    pub fn build(
        enemies: &SlotMap<EnemyId, Chicken>,
        castle_pos: Vec2,
        arena: &ArenaConfig,
    ) -> Self {
        let castle_range = arena.castle_range();
        let tower_range = arena.tower_range();

        let engageable: Vec<Target> = enemies
            .iter()
            .filter(|(_, e)| castle_pos.distance(e.pos) < tower_range)
            .map(|(id, e)| Target { id, pos: e.pos })
            .collect();

        let in_castle_range: Vec<Target> = engageable
            .iter()
            .copied()
            .filter(|t| castle_pos.distance(t.pos) < castle_range)
            .collect();

        Self {
            priority: nearest(castle_pos, &in_castle_range, f32::INFINITY),
            engageable,
        }
    }

    /// Target for a tower at `tower_pos` that can reach `reach` units
    pub fn target_for(&self, tower_pos: Vec2, reach: f32) -> Option<Target> {
        self.priority
            .or_else(|| nearest(tower_pos, &self.engageable, reach))
    }
}

/// Closest candidate to `from` strictly within `max_distance`.
/// Equal distances keep the earlier candidate.
pub fn nearest(from: Vec2, candidates: &[Target], max_distance: f32) -> Option<Target> {
    let mut best: Option<(f32, Target)> = None;
    for candidate in candidates {
        let distance = from.distance(candidate.pos);
        if distance >= max_distance {
            continue;
        }
        if best.is_none_or(|(d, _)| distance < d) {
            best = Some((distance, *candidate));
        }
    }
    best.map(|(_, t)| t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::RapierWorld;
    use crate::settings::Settings;
    use crate::sim::entity::EntityRef;

    fn spawn(
        world: &mut RapierWorld<EntityRef>,
        enemies: &mut SlotMap<EnemyId, Chicken>,
        pos: Vec2,
    ) -> EnemyId {
        let settings = Settings::default();
        enemies.insert_with_key(|id| {
            Chicken::new(world, id, 0, pos, Vec2::ZERO, &settings.combat, &settings.physics)
        })
    }

    #[test]
    fn test_priority_target_is_closest_to_castle() {
        let arena = ArenaConfig::default();
        let mut world = RapierWorld::new(12.0);
        let mut enemies = SlotMap::with_key();
        let castle = Vec2::ZERO;

        let _far = spawn(&mut world, &mut enemies, Vec2::new(200.0, 0.0));
        let near = spawn(&mut world, &mut enemies, Vec2::new(0.0, -120.0));
        let _outer = spawn(&mut world, &mut enemies, Vec2::new(300.0, 0.0));

        let pools = TargetPools::build(&enemies, castle, &arena);
        assert_eq!(pools.engageable.len(), 3);
        assert_eq!(pools.priority.map(|t| t.id), Some(near));

        // Every tower shares the priority target, even one far away
        let target = pools.target_for(Vec2::new(-1000.0, 0.0), arena.tower_reach());
        assert_eq!(target.map(|t| t.id), Some(near));
    }

    #[test]
    fn test_fallback_picks_closest_to_tower_within_reach() {
        let arena = ArenaConfig::default();
        let mut world = RapierWorld::new(12.0);
        let mut enemies = SlotMap::with_key();
        let castle = Vec2::ZERO;

        let east = spawn(&mut world, &mut enemies, Vec2::new(300.0, 0.0));
        let west = spawn(&mut world, &mut enemies, Vec2::new(-350.0, 0.0));

        let pools = TargetPools::build(&enemies, castle, &arena);
        assert!(pools.priority.is_none());

        let reach = arena.tower_reach();
        assert_eq!(pools.target_for(Vec2::new(200.0, 0.0), reach).map(|t| t.id), Some(east));
        assert_eq!(pools.target_for(Vec2::new(-200.0, 0.0), reach).map(|t| t.id), Some(west));
        // Nothing within reach of a tower north of the castle
        assert!(pools.target_for(Vec2::new(0.0, 250.0), reach).is_none());
    }

    #[test]
    fn test_enemies_beyond_tower_range_are_ignored() {
        let arena = ArenaConfig::default();
        let mut world = RapierWorld::new(12.0);
        let mut enemies = SlotMap::with_key();
        spawn(&mut world, &mut enemies, Vec2::new(450.0, 0.0));

        let pools = TargetPools::build(&enemies, Vec2::ZERO, &arena);
        assert!(pools.engageable.is_empty());
        assert!(pools.target_for(Vec2::new(400.0, 0.0), arena.tower_reach()).is_none());
    }

    #[test]
    fn test_equal_distance_tie_is_stable() {
        let arena = ArenaConfig::default();
        let mut world = RapierWorld::new(12.0);
        let mut enemies = SlotMap::with_key();
        let first = spawn(&mut world, &mut enemies, Vec2::new(300.0, 100.0));
        let _second = spawn(&mut world, &mut enemies, Vec2::new(300.0, -100.0));

        let tower = Vec2::new(300.0, 0.0);
        for _ in 0..5 {
            let pools = TargetPools::build(&enemies, Vec2::ZERO, &arena);
            let target = pools.target_for(tower, arena.tower_reach());
            assert_eq!(target.map(|t| t.id), Some(first));
        }
    }
}
