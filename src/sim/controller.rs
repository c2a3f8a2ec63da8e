//! Game controller: owns the world and every live entity, and advances the
//! match one fixed tick at a time.
//!
//! Tick order:
//! 1. Physics step (contacts resolved by [`ContactResolver`])
//! 2. Mirror body positions, reconcile removal queues
//! 3. Wave timer and spawns
//! 4. Day/night cycle
//! 5. Enemy steering, tower cooldowns, bullet homing and expiry
//! 6. Targeting and firing

use std::collections::BTreeMap;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;
use slotmap::SlotMap;
use thiserror::Error;

use super::contact::ContactResolver;
use super::daylight::DayNightCycle;
use super::entity::{
    Bullet, BulletId, Castle, Chicken, EnemyId, Entity, EntityRef, FastTower, FastTowerId, Shot,
    Tower, TowerId, TowerKind,
};
use super::events::GameEvent;
use super::removal::{self, RemovalQueues};
use super::snapshot::{BulletView, CastleView, EnemyView, Snapshot, TowerView};
use super::steering::{home_bullet, steer_enemy};
use super::targeting::TargetPools;
use super::wave::{WaveScheduler, WaveTable, edge_spawn_point};
use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::physics::{PhysicsWorld, RapierWorld};
use crate::settings::{Cell, Settings};

/// Match state machine. There is no pause; pausing is up to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchPhase {
    Active,
    /// Castle life fell below zero; `step` no longer advances anything
    Ended,
}

/// Successful outcome of a placement command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    Placed { kind: TowerKind, cell: Cell },
    /// The cell was occupied; its tower had life and max life doubled
    Upgraded { kind: TowerKind, cell: Cell, max_life: f32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("insufficient credits: need {cost}, have {available}")]
    InsufficientCredits { cost: u32, available: u32 },
}

/// What stands on an occupied grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    Tower(TowerId),
    FastTower(FastTowerId),
}

pub struct GameController<W = RapierWorld<EntityRef>> {
    settings: Settings,
    world: W,
    castle: Castle,
    enemies: SlotMap<EnemyId, Chicken>,
    towers: SlotMap<TowerId, Tower>,
    fast_towers: SlotMap<FastTowerId, FastTower>,
    bullets: SlotMap<BulletId, Bullet>,
    removals: RemovalQueues,
    cells: BTreeMap<Cell, Occupant>,
    credits: u32,
    wave_table: WaveTable,
    waves: WaveScheduler,
    daylight: DayNightCycle,
    phase: MatchPhase,
    elapsed: f32,
    accumulator: f32,
    rng: Pcg32,
    events: Vec<GameEvent>,
}

impl GameController {
    /// New match on a rapier2d world
    pub fn new(settings: Settings, seed: u64) -> Self {
        let world = RapierWorld::new(settings.physics.max_translation);
        Self::with_world(world, settings, seed)
    }
}

impl<W: PhysicsWorld<EntityRef>> GameController<W> {
    /// New match on a caller-supplied physics world
    pub fn with_world(mut world: W, settings: Settings, seed: u64) -> Self {
        let castle = Castle::new(
            &mut world,
            settings.arena.castle_position(),
            &settings.combat,
            &settings.physics,
        );
        log::info!(
            "Match started: seed {}, {} credits",
            seed,
            settings.combat.starting_credits
        );
        Self {
            credits: settings.combat.starting_credits,
            wave_table: WaveTable::generate(&settings.waves),
            waves: WaveScheduler::new(&settings.waves),
            daylight: DayNightCycle::new(&settings.daylight),
            settings,
            world,
            castle,
            enemies: SlotMap::with_key(),
            towers: SlotMap::with_key(),
            fast_towers: SlotMap::with_key(),
            bullets: SlotMap::with_key(),
            removals: RemovalQueues::default(),
            cells: BTreeMap::new(),
            phase: MatchPhase::Active,
            elapsed: 0.0,
            accumulator: 0.0,
            rng: Pcg32::seed_from_u64(seed),
            events: Vec::new(),
        }
    }

    /// Place a tower on `cell`, or upgrade the tower already there.
    ///
    /// The cell is assumed to be buildable. An upgrade costs the price of the
    /// tower already standing, whatever `kind` was requested.
    pub fn place_tower(&mut self, kind: TowerKind, cell: Cell) -> Result<Placement, PlacementError> {
        if let Some(&occupant) = self.cells.get(&cell) {
            if let Some(upgraded) = self.upgrade(occupant)? {
                return Ok(upgraded);
            }
            log::warn!("Cell ({}, {}) pointed at a missing tower", cell.x, cell.y);
            self.cells.remove(&cell);
        }

        self.charge(self.settings.towers.spec(kind).cost)?;

        let spec = self.settings.towers.spec(kind);
        let pos = self.settings.arena.cell_center(cell);
        let physics = &self.settings.physics;
        let world = &mut self.world;
        let occupant = if kind.shoots() {
            Occupant::FastTower(self.fast_towers.insert_with_key(|id| {
                FastTower::new(world, id, kind, cell, pos, spec, physics)
            }))
        } else {
            Occupant::Tower(
                self.towers
                    .insert_with_key(|id| Tower::new(world, id, kind, cell, pos, spec, physics)),
            )
        };
        self.cells.insert(cell, occupant);

        log::info!(
            "Placed {} tower at ({}, {}), {} credits left",
            kind.as_str(),
            cell.x,
            cell.y,
            self.credits
        );
        self.events.push(GameEvent::TowerPlaced { kind, cell });
        Ok(Placement::Placed { kind, cell })
    }

    /// Double the occupant's life. `Ok(None)` if it no longer exists.
    fn upgrade(&mut self, occupant: Occupant) -> Result<Option<Placement>, PlacementError> {
        let (kind, cell) = match occupant {
            Occupant::Tower(id) => match self.towers.get(id) {
                Some(t) => (t.kind, t.cell),
                None => return Ok(None),
            },
            Occupant::FastTower(id) => match self.fast_towers.get(id) {
                Some(t) => (t.kind, t.cell),
                None => return Ok(None),
            },
        };
        self.charge(self.settings.towers.spec(kind).cost)?;

        let max_life = match occupant {
            Occupant::Tower(id) => {
                let tower = &mut self.towers[id];
                tower.upgrade();
                tower.life.max()
            }
            Occupant::FastTower(id) => {
                let tower = &mut self.fast_towers[id];
                tower.upgrade();
                tower.life.max()
            }
        };

        log::info!(
            "Upgraded {} tower at ({}, {}) to {} life",
            kind.as_str(),
            cell.x,
            cell.y,
            max_life
        );
        self.events.push(GameEvent::TowerUpgraded {
            kind,
            cell,
            max_life,
        });
        Ok(Some(Placement::Upgraded {
            kind,
            cell,
            max_life,
        }))
    }

    fn charge(&mut self, cost: u32) -> Result<(), PlacementError> {
        if self.credits < cost {
            return Err(PlacementError::InsufficientCredits {
                cost,
                available: self.credits,
            });
        }
        self.credits -= cost;
        Ok(())
    }

    /// Run as many fixed ticks as `frame_dt` covers, up to the substep cap.
    /// Returns the number of ticks run.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt;
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.step(SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        substeps
    }

    /// Advance the match by one tick of `dt` seconds
    pub fn step(&mut self, dt: f32) {
        if self.phase == MatchPhase::Ended {
            return;
        }
        self.elapsed += dt;

        let velocity_iterations = self.settings.physics.velocity_iterations;
        let position_iterations = self.settings.physics.position_iterations;
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
        self.world
            .step(dt, velocity_iterations, position_iterations, &mut resolver);

        self.sync_positions();
        self.reconcile();
        if self.phase == MatchPhase::Ended {
            return;
        }

        if let Some(index) = self.waves.tick(dt) {
            self.spawn_wave(index);
        }
        self.daylight.tick(dt);

        let combat = &self.settings.combat;
        for chicken in self.enemies.values_mut() {
            steer_enemy(chicken, &mut self.world, combat);
        }
        for tower in self.fast_towers.values_mut() {
            tower.update(dt);
        }
        for (id, bullet) in self.bullets.iter_mut() {
            home_bullet(bullet, &mut self.world, combat);
            bullet.age(dt);
            if bullet.is_expired(combat.bullet_ttl)
                || bullet.has_arrived(combat.bullet_arrival_epsilon)
            {
                self.removals.bullets.insert(id);
            }
        }

        self.fire_towers();
    }

    fn sync_positions(&mut self) {
        for chicken in self.enemies.values_mut() {
            if let Some(pos) = self.world.position(chicken.body) {
                chicken.sync(pos);
            }
        }
        for bullet in self.bullets.values_mut() {
            if let Some(pos) = self.world.position(bullet.body) {
                bullet.sync(pos);
            }
        }
    }

    /// Destroy everything queued for removal. Returns how many entities left.
    ///
    /// Runs once per tick after the physics step; calling it again with empty
    /// queues does nothing.
    pub fn reconcile(&mut self) -> usize {
        let enemies = removal::reconcile(&mut self.world, &mut self.enemies, &mut self.removals.enemies);
        for (id, chicken) in &enemies {
            log::debug!("Removed enemy {:?} (level {})", id, chicken.level);
        }

        let towers = removal::reconcile(&mut self.world, &mut self.towers, &mut self.removals.towers);
        for (_, tower) in &towers {
            self.release_cell(tower.kind, tower.cell);
        }

        let fast_towers = removal::reconcile(
            &mut self.world,
            &mut self.fast_towers,
            &mut self.removals.fast_towers,
        );
        for (_, tower) in &fast_towers {
            self.release_cell(tower.kind, tower.cell);
        }

        let bullets = removal::reconcile(&mut self.world, &mut self.bullets, &mut self.removals.bullets);
        if !bullets.is_empty() {
            log::debug!("Removed {} bullets", bullets.len());
        }

        debug_assert!(self.removals.is_empty());
        enemies.len() + towers.len() + fast_towers.len() + bullets.len()
    }

    fn release_cell(&mut self, kind: TowerKind, cell: Cell) {
        self.cells.remove(&cell);
        log::info!("{} tower at ({}, {}) destroyed", kind.as_str(), cell.x, cell.y);
        self.events.push(GameEvent::TowerDestroyed { kind, cell });
    }

    fn spawn_wave(&mut self, index: usize) {
        let Some(wave) = self.wave_table.wave(index).cloned() else {
            return;
        };
        let max_level = self.settings.combat.max_enemy_level;
        let mut spawned = 0;
        for (&level, &count) in &wave.chickens {
            // No stats exist past the top level; those entries spawn nothing
            if level > max_level {
                log::debug!("Wave {} skips {} level-{} enemies", index, count + 1, level);
                continue;
            }
            for _ in 0..=count {
                let pos = edge_spawn_point(&mut self.rng, &self.settings.arena);
                self.spawn_enemy(level, pos);
                spawned += 1;
            }
        }
        log::info!("Wave {} spawned {} enemies", index, spawned);
        self.events.push(GameEvent::WaveSpawned {
            wave: index,
            enemies: spawned,
        });
    }

    /// Add an enemy at `pos` heading for the castle. Levels above the
    /// configured maximum are clamped; waves never ask for one.
    pub fn spawn_enemy(&mut self, level: u8, pos: Vec2) -> EnemyId {
        let level = level.min(self.settings.combat.max_enemy_level);
        let destination = self.settings.arena.enemy_goal();
        let (world, combat, physics) = (
            &mut self.world,
            &self.settings.combat,
            &self.settings.physics,
        );
        self.enemies.insert_with_key(|id| {
            Chicken::new(world, id, level, pos, destination, combat, physics)
        })
    }

    fn spawn_bullet(&mut self, shot: &Shot) -> BulletId {
        let (world, combat, physics) = (
            &mut self.world,
            &self.settings.combat,
            &self.settings.physics,
        );
        self.bullets
            .insert_with_key(|id| Bullet::new(world, id, shot, combat, physics))
    }

    /// Let every ready shooting tower pick a target and fire
    fn fire_towers(&mut self) {
        let pools = TargetPools::build(&self.enemies, self.castle.pos, &self.settings.arena);
        if pools.priority.is_none() && pools.engageable.is_empty() {
            return;
        }

        let reach = self.settings.arena.tower_reach();
        let fan = self.settings.combat.fan_degrees.to_radians();
        let mut shots = Vec::new();
        for tower in self.fast_towers.values_mut() {
            if !tower.is_ready() {
                continue;
            }
            if let Some(target) = pools.target_for(tower.pos, reach) {
                shots.extend(tower.fire(target.pos, fan));
            }
        }
        if shots.is_empty() {
            return;
        }

        for shot in &shots {
            self.spawn_bullet(shot);
        }
        log::debug!("Towers fired {} bullets", shots.len());
        self.events.push(GameEvent::BulletsFired { count: shots.len() });
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn castle(&self) -> &Castle {
        &self.castle
    }

    pub fn enemies(&self) -> &SlotMap<EnemyId, Chicken> {
        &self.enemies
    }

    pub fn towers(&self) -> &SlotMap<TowerId, Tower> {
        &self.towers
    }

    pub fn fast_towers(&self) -> &SlotMap<FastTowerId, FastTower> {
        &self.fast_towers
    }

    pub fn fast_tower_mut(&mut self, id: FastTowerId) -> Option<&mut FastTower> {
        self.fast_towers.get_mut(id)
    }

    pub fn bullets(&self) -> &SlotMap<BulletId, Bullet> {
        &self.bullets
    }

    pub fn removals(&self) -> &RemovalQueues {
        &self.removals
    }

    pub fn occupant(&self, cell: Cell) -> Option<Occupant> {
        self.cells.get(&cell).copied()
    }

    pub fn credits(&self) -> u32 {
        self.credits
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn is_ended(&self) -> bool {
        self.phase == MatchPhase::Ended
    }

    pub fn current_wave(&self) -> usize {
        self.waves.current_wave
    }

    pub fn time_to_next_wave(&self) -> f32 {
        self.waves.time_to_next_wave()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Take the events recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            castle: CastleView::from(&self.castle),
            enemies: self.enemies.values().map(EnemyView::from).collect(),
            towers: self.towers.values().map(TowerView::from).collect(),
            fast_towers: self.fast_towers.values().map(TowerView::from).collect(),
            bullets: self.bullets.values().map(BulletView::from).collect(),
            credits: self.credits,
            current_wave: self.waves.current_wave,
            time_to_next_wave: self.waves.time_to_next_wave(),
            daylight: self.daylight.opacity(),
            elapsed: self.elapsed,
            ended: self.is_ended(),
        }
    }
}
