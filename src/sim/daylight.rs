//! Cosmetic day/night cycle. No gameplay effect.

use crate::settings::DaylightTuning;

/// Sawtooth timer between full day (0) and full night (`half_period`)
#[derive(Debug, Clone)]
pub struct DayNightCycle {
    /// Daylight seconds left before the cycle begins
    pub night_delay: f32,
    pub time: f32,
    /// +1 while darkening, -1 while brightening
    pub direction: f32,
    half_period: f32,
}

impl DayNightCycle {
    pub fn new(tuning: &DaylightTuning) -> Self {
        Self {
            night_delay: tuning.night_delay,
            time: 0.0,
            direction: 1.0,
            half_period: tuning.half_period,
        }
    }

    pub fn tick(&mut self, dt: f32) {
        if self.night_delay > 0.0 {
            self.night_delay -= dt;
            return;
        }
        self.time += dt * self.direction;
        if self.time > self.half_period {
            self.direction = -1.0;
        } else if self.time < 0.0 {
            self.time = 0.0;
            self.direction = 1.0;
        }
    }

    /// Darkness overlay opacity in [0, 1]
    pub fn opacity(&self) -> f32 {
        if self.half_period <= 0.0 {
            return 0.0;
        }
        (self.time / self.half_period).clamp(0.0, 1.0)
    }
}
