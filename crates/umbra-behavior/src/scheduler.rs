//! Fixed-step driver for units.
//!
//! Frame time is accumulated and spent in fixed ticks so sequence timers,
//! sensing and stun windows advance the same way regardless of frame rate.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use umbra_common::{ConfigError, ConfigResult, UnitId};

use crate::unit::Unit;

/// Tick rate settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Length of one simulation tick in seconds
    pub fixed_dt: f32,
    /// Longest frame accepted before clamping
    pub max_frame_dt: f32,
    /// Most ticks run for a single frame
    pub max_steps: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 30.0,
            max_frame_dt: 0.25,
            max_steps: 10,
        }
    }
}

impl SchedulerConfig {
    /// Checks the tick settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.fixed_dt >= 0.001) {
            return Err(ConfigError::invalid("fixed_dt", "must be at least 1ms"));
        }
        if self.max_frame_dt < self.fixed_dt {
            return Err(ConfigError::invalid("max_frame_dt", "must be >= fixed_dt"));
        }
        if self.max_steps == 0 {
            return Err(ConfigError::invalid("max_steps", "must be > 0"));
        }
        Ok(())
    }
}

/// Drives every live unit at a fixed tick.
#[derive(Debug)]
pub struct Scheduler {
    config: SchedulerConfig,
    accumulator: f32,
    units: Vec<Arc<Unit>>,
    ticks: u64,
}

impl Scheduler {
    /// Creates an empty scheduler.
    pub fn new(config: SchedulerConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            accumulator: 0.0,
            units: Vec::new(),
            ticks: 0,
        })
    }

    /// Adds a unit.
    pub fn add(&mut self, unit: Arc<Unit>) {
        debug!(unit = %unit.id(), name = unit.name(), "unit scheduled");
        self.units.push(unit);
    }

    /// Removes a unit by id.
    pub fn remove(&mut self, id: UnitId) -> Option<Arc<Unit>> {
        let index = self.units.iter().position(|unit| unit.id() == id)?;
        Some(self.units.remove(index))
    }

    /// Looks a unit up by id.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Arc<Unit>> {
        self.units.iter().find(|unit| unit.id() == id)
    }

    /// Scheduled units.
    #[must_use]
    pub fn units(&self) -> &[Arc<Unit>] {
        &self.units
    }

    /// Number of scheduled units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether no unit is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Tick length.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        self.config.fixed_dt
    }

    /// Ticks run so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Simulated seconds so far.
    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.ticks as f64 * f64::from(self.config.fixed_dt)
    }

    /// Adds frame time and returns how many fixed ticks are due.
    fn accumulate(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.clamp(0.0, self.config.max_frame_dt);
        let mut count = 0;
        while self.accumulator >= self.config.fixed_dt && count < self.config.max_steps {
            self.accumulator -= self.config.fixed_dt;
            count += 1;
        }

        // Still behind: drop the backlog instead of spiralling.
        if self.accumulator > self.config.fixed_dt * 2.0 {
            warn!(
                backlog = self.accumulator,
                "scheduler falling behind, dropping accumulated time"
            );
            self.accumulator = 0.0;
        }
        count
    }

    /// Spends `frame_dt` on fixed ticks. Returns the number of ticks run.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        let steps = self.accumulate(frame_dt);
        for _ in 0..steps {
            self.step();
        }
        steps
    }

    /// Runs exactly one tick.
    pub fn step(&mut self) {
        self.units.retain(|unit| {
            let keep = !unit.is_despawned();
            if !keep {
                debug!(unit = %unit.id(), "despawned unit dropped");
            }
            keep
        });
        let dt = self.config.fixed_dt;
        for unit in &self.units {
            unit.tick(dt);
        }
        self.ticks += 1;
    }

    /// Resets every scheduled unit to its spawn state.
    pub fn reset_encounter(&mut self) {
        for unit in &self.units {
            unit.reset_encounter();
        }
        self.accumulator = 0.0;
    }
}
