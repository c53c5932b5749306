//! Health and stun bookkeeping.
//!
//! [`Vitals`] is the plain state machine; [`UnitStatus`] wraps it in a lock
//! and turns its transitions into controller triggers, presentation cues and
//! bus events.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};
use umbra_common::{ConfigError, ConfigResult, UnitId};

use crate::collab::{LootTier, SoundCue};
use crate::controller::BehaviorController;
use crate::events::{EventBus, UnitEvent};
use crate::sequence::Countdown;

/// Result of applying damage to [`Vitals`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Nothing changed
    Rejected,
    /// Health went down
    Applied,
    /// Health reached zero
    Killed,
}

/// Health, stun and death of one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Vitals {
    health: f32,
    max_health: f32,
    stun: Option<Countdown>,
    dead: bool,
}

impl Vitals {
    /// Full-health vitals.
    pub fn new(max_health: f32) -> ConfigResult<Self> {
        if !(max_health > 0.0) || !max_health.is_finite() {
            return Err(ConfigError::invalid(
                "max_health",
                format!("must be a positive number (got {max_health})"),
            ));
        }
        Ok(Self {
            health: max_health,
            max_health,
            stun: None,
            dead: false,
        })
    }

    /// Lowers health by `amount`. Dead units and non-positive amounts are
    /// rejected.
    pub fn damage(&mut self, amount: f32) -> DamageOutcome {
        if self.dead || !(amount > 0.0) {
            return DamageOutcome::Rejected;
        }
        self.health = (self.health - amount).max(0.0);
        if self.health <= 0.0 {
            self.dead = true;
            self.stun = None;
            DamageOutcome::Killed
        } else {
            DamageOutcome::Applied
        }
    }

    /// Stuns for `seconds`. Returns `true` when a new stun episode starts;
    /// stunning a stunned unit only extends the remaining time.
    pub fn stun(&mut self, seconds: f32) -> bool {
        if self.dead || !(seconds > 0.0) {
            return false;
        }
        match self.stun.as_mut() {
            Some(timer) => {
                if seconds > timer.remaining() {
                    *timer = Countdown::new(seconds);
                }
                false
            }
            None => {
                self.stun = Some(Countdown::new(seconds));
                true
            }
        }
    }

    /// Advances the stun timer. Returns `true` when the stun ends.
    pub fn tick(&mut self, dt: f32) -> bool {
        let Some(timer) = self.stun.as_mut() else {
            return false;
        };
        if timer.tick(dt) {
            self.stun = None;
            return true;
        }
        false
    }

    /// Back to full health, alive and unstunned.
    pub fn restore(&mut self) {
        self.health = self.max_health;
        self.stun = None;
        self.dead = false;
    }

    /// Current health.
    #[must_use]
    pub fn health(&self) -> f32 {
        self.health
    }

    /// Maximum health.
    #[must_use]
    pub fn max_health(&self) -> f32 {
        self.max_health
    }

    /// Whether the unit is dead.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Whether a stun is running.
    #[must_use]
    pub fn is_stunned(&self) -> bool {
        self.stun.is_some()
    }

    /// Seconds of stun left.
    #[must_use]
    pub fn stun_remaining(&self) -> f32 {
        self.stun.map_or(0.0, |timer| timer.remaining())
    }
}

/// Vitals of a regular enemy, wired to its controller.
pub struct UnitStatus {
    unit: UnitId,
    vitals: Mutex<Vitals>,
    controller: Arc<BehaviorController>,
    events: Arc<EventBus>,
    loot: Option<LootTier>,
}

impl UnitStatus {
    /// Creates the status of `controller`'s unit.
    pub fn new(
        max_health: f32,
        controller: Arc<BehaviorController>,
        events: Arc<EventBus>,
    ) -> ConfigResult<Self> {
        Ok(Self {
            unit: controller.unit(),
            vitals: Mutex::new(Vitals::new(max_health)?),
            controller,
            events,
            loot: None,
        })
    }

    /// Loot dropped on death.
    #[must_use]
    pub fn with_loot(mut self, tier: LootTier) -> Self {
        self.loot = Some(tier);
        self
    }

    /// Applies damage. Returns whether it was accepted.
    pub fn apply_damage(&self, amount: f32) -> bool {
        let outcome = self.vitals.lock().damage(amount);
        match outcome {
            DamageOutcome::Rejected => false,
            DamageOutcome::Applied => true,
            DamageOutcome::Killed => {
                self.die();
                true
            }
        }
    }

    fn die(&self) {
        info!(unit = %self.unit, "unit died");
        self.controller.on_death();
        let unit = self.unit;
        let loot = self.loot;
        self.controller.with_rig(|rig| {
            rig.fx.play_sound(SoundCue::Death);
            if let Some(tier) = loot {
                rig.combat.drop_loot(unit, tier);
            }
        });
        self.events.publish(UnitEvent::UnitDied { unit });
    }

    /// Stuns the unit for `seconds`.
    pub fn stun(&self, seconds: f32) {
        let started = self.vitals.lock().stun(seconds);
        if started {
            debug!(unit = %self.unit, seconds, "stun started");
            self.controller.on_stun_start();
        }
    }

    /// Advances the stun timer.
    pub fn tick(&self, dt: f32) {
        let ended = self.vitals.lock().tick(dt);
        if ended {
            self.controller.on_stun_end();
        }
    }

    /// Full health, alive, unstunned.
    pub fn restore(&self) {
        self.vitals.lock().restore();
    }

    /// Copy of the current vitals.
    pub fn vitals(&self) -> Vitals {
        self.vitals.lock().clone()
    }
}

impl std::fmt::Debug for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitStatus")
            .field("unit", &self.unit)
            .field("vitals", &*self.vitals.lock())
            .finish_non_exhaustive()
    }
}
