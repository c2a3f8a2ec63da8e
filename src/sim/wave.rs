//! Wave schedule
//!
//! The table is precomputed once: for every base tier `w` there are four
//! escalating waves `{w: base, w + 1: k}`. The scheduler consumes one wave
//! per timeout; past the index cap the last wave repeats forever.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::Rng;

use crate::settings::{ArenaConfig, WaveTuning};

/// One batch of enemies: level -> count
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Wave {
    pub chickens: BTreeMap<u8, u32>,
}

impl Wave {
    /// Enemies spawned by this wave (each entry spawns `count + 1`)
    pub fn spawn_count(&self) -> usize {
        self.chickens.values().map(|&n| n as usize + 1).sum()
    }
}

#[derive(Debug, Clone)]
pub struct WaveTable {
    waves: Vec<Wave>,
    max_index: usize,
}

impl WaveTable {
    pub fn generate(tuning: &WaveTuning) -> Self {
        let mut waves = Vec::with_capacity(tuning.tiers as usize * tuning.escalation.len());
        for tier in 0..tuning.tiers {
            for &count in &tuning.escalation {
                let mut chickens = BTreeMap::new();
                chickens.insert(tier, tuning.base_count);
                chickens.insert(tier.saturating_add(1), count);
                waves.push(Wave { chickens });
            }
        }
        Self {
            waves,
            max_index: tuning.max_wave_index,
        }
    }

    pub fn len(&self) -> usize {
        self.waves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }

    /// Wave at `index`, clamped to the cap and to the table's end
    pub fn wave(&self, index: usize) -> Option<&Wave> {
        let last = self.waves.len().checked_sub(1)?;
        self.waves.get(index.min(self.max_index).min(last))
    }
}

/// Timer driving wave spawns
#[derive(Debug, Clone)]
pub struct WaveScheduler {
    /// Seconds since the last wave
    pub last_spawn_delta: f32,
    /// Waves consumed so far
    pub current_wave: usize,
    timeout: f32,
    max_index: usize,
}

impl WaveScheduler {
    pub fn new(tuning: &WaveTuning) -> Self {
        Self {
            last_spawn_delta: 0.0,
            current_wave: 0,
            timeout: tuning.spawn_timeout,
            max_index: tuning.max_wave_index,
        }
    }

    /// Advance the timer. Returns the wave index to spawn when it fires.
    ///
    /// The tick that fires does not accumulate `dt`.
    pub fn tick(&mut self, dt: f32) -> Option<usize> {
        if self.last_spawn_delta > self.timeout {
            self.last_spawn_delta = 0.0;
            let index = self.current_wave.min(self.max_index);
            self.current_wave = self.current_wave.saturating_add(1);
            Some(index)
        } else {
            self.last_spawn_delta += dt;
            None
        }
    }

    pub fn time_to_next_wave(&self) -> f32 {
        (self.timeout - self.last_spawn_delta).max(0.0)
    }
}

/// Random point just outside one of the four arena edges
pub fn edge_spawn_point<R: Rng + ?Sized>(rng: &mut R, arena: &ArenaConfig) -> Vec2 {
    let w = arena.screen_width();
    let h = arena.screen_height();
    let jitter = arena.spawn_jitter;
    let u: f32 = rng.random();
    let v: f32 = rng.random();

    match rng.random_range(0..4) {
        0 => Vec2::new(-w - u * jitter, v * 2.0 * h - h),
        1 => Vec2::new(w + u * jitter, h - 2.0 * h * v),
        2 => Vec2::new(u * 2.0 * w - w, -h - v * jitter),
        _ => Vec2::new(u * 2.0 * w - w, h + v * jitter),
    }
}
