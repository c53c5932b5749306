//! Boss phase state machine.
//!
//! Health is split into ordered bands by `phase_fractions`. When an accepted
//! hit leaves health at or below the current band's lower edge, the boss
//! advances one phase and spends a fixed transition window invulnerable:
//! the controller is suspended, guaranteed loot drops and listeners are told
//! when the window opens and closes. The last band ends at zero health, which
//! is death rather than a transition.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use umbra_common::{ConfigError, ConfigResult, UnitId};

use crate::collab::{LootTier, SoundCue, VisualState};
use crate::controller::BehaviorController;
use crate::events::{EventBus, UnitEvent};
use crate::sequence::Countdown;
use crate::status::{DamageOutcome, Vitals};

const FRACTION_TOLERANCE: f32 = 1e-3;
/// Relative float slack on the threshold comparison
const THRESHOLD_SLACK: f32 = 1e-6;

/// Boss phase layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossConfig {
    /// Share of the health bar each phase spans, in order
    pub phase_fractions: Vec<f32>,
    /// Seconds of invulnerability between phases
    pub transition_duration: f32,
}

impl Default for BossConfig {
    fn default() -> Self {
        Self {
            phase_fractions: vec![0.5, 0.3, 0.2],
            transition_duration: 2.5,
        }
    }
}

impl BossConfig {
    /// Checks that the fractions cover the whole bar.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.phase_fractions.is_empty() {
            return Err(ConfigError::NoPhases);
        }
        if let Some(bad) = self.phase_fractions.iter().find(|f| !(**f > 0.0)) {
            return Err(ConfigError::invalid(
                "phase_fractions",
                format!("every fraction must be > 0 (got {bad})"),
            ));
        }
        let sum: f32 = self.phase_fractions.iter().sum();
        if (sum - 1.0).abs() > FRACTION_TOLERANCE {
            return Err(ConfigError::PhaseFractions { sum });
        }
        if self.transition_duration < 0.0 {
            return Err(ConfigError::invalid("transition_duration", "must be >= 0"));
        }
        Ok(())
    }

    /// Number of phases.
    #[must_use]
    pub fn phase_count(&self) -> usize {
        self.phase_fractions.len()
    }
}

/// Result of a hit on a boss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BossDamage {
    /// Dead, transitioning, or a non-positive amount
    Rejected,
    /// Health went down, same phase
    Applied,
    /// Health crossed the threshold; transition into this phase started
    PhaseStarted(usize),
    /// Health reached zero
    Killed,
}

/// Health bands and the transition window, without side effects.
#[derive(Debug, Clone, PartialEq)]
pub struct BossVitals {
    vitals: Vitals,
    fractions: Vec<f32>,
    phase: usize,
    threshold: f32,
    transition: Option<Countdown>,
    transition_duration: f32,
}

impl BossVitals {
    /// Validates `config` and starts in phase 0 at full health.
    pub fn new(max_health: f32, config: &BossConfig) -> ConfigResult<Self> {
        config.validate()?;
        let vitals = Vitals::new(max_health)?;
        let mut boss = Self {
            vitals,
            fractions: config.phase_fractions.clone(),
            phase: 0,
            threshold: 0.0,
            transition: None,
            transition_duration: config.transition_duration,
        };
        boss.threshold = boss.threshold_for(0);
        Ok(boss)
    }

    /// Absolute health at or below which `phase` ends: whatever the later
    /// bands still hold.
    fn threshold_for(&self, phase: usize) -> f32 {
        let remaining: f32 = self.fractions.iter().skip(phase + 1).sum();
        self.vitals.max_health() * remaining
    }

    fn has_next_phase(&self) -> bool {
        self.phase + 1 < self.fractions.len()
    }

    /// Damage and threshold check as one step.
    pub fn damage(&mut self, amount: f32) -> BossDamage {
        if self.transition.is_some() {
            return BossDamage::Rejected;
        }
        match self.vitals.damage(amount) {
            DamageOutcome::Rejected => BossDamage::Rejected,
            DamageOutcome::Killed => BossDamage::Killed,
            DamageOutcome::Applied => {
                let slack = self.vitals.max_health() * THRESHOLD_SLACK;
                if self.vitals.health() <= self.threshold + slack && self.has_next_phase() {
                    self.phase += 1;
                    self.threshold = self.threshold_for(self.phase);
                    self.transition = Some(Countdown::new(self.transition_duration));
                    BossDamage::PhaseStarted(self.phase)
                } else {
                    BossDamage::Applied
                }
            }
        }
    }

    /// Advances the transition window. Returns the phase whose window closed.
    pub fn tick_transition(&mut self, dt: f32) -> Option<usize> {
        let timer = self.transition.as_mut()?;
        if timer.tick(dt) {
            self.transition = None;
            return Some(self.phase);
        }
        None
    }

    /// Back to phase 0 at full health.
    pub fn restore(&mut self) {
        self.vitals.restore();
        self.phase = 0;
        self.threshold = self.threshold_for(0);
        self.transition = None;
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> usize {
        self.phase
    }

    /// Health at which the current phase ends.
    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Whether the transition window is open.
    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// Underlying health and stun state.
    #[must_use]
    pub fn vitals(&self) -> &Vitals {
        &self.vitals
    }
}

/// Vitals and phases of a boss, wired to its controller.
pub struct BossStatus {
    unit: UnitId,
    inner: Mutex<BossVitals>,
    controller: Arc<BehaviorController>,
    events: Arc<EventBus>,
}

impl BossStatus {
    /// Creates the status of `controller`'s unit.
    pub fn new(
        max_health: f32,
        config: &BossConfig,
        controller: Arc<BehaviorController>,
        events: Arc<EventBus>,
    ) -> ConfigResult<Self> {
        Ok(Self {
            unit: controller.unit(),
            inner: Mutex::new(BossVitals::new(max_health, config)?),
            controller,
            events,
        })
    }

    /// Applies damage. Returns whether it was accepted.
    pub fn apply_damage(&self, amount: f32) -> bool {
        let outcome = self.inner.lock().damage(amount);
        let unit = self.unit;
        match outcome {
            BossDamage::Rejected => false,
            BossDamage::Applied => true,
            BossDamage::PhaseStarted(phase) => {
                info!(%unit, phase, "boss phase threshold crossed");
                self.controller.on_phase_transition_start(phase);
                self.controller.with_rig(|rig| {
                    rig.fx.set_visual(VisualState::Invulnerable);
                    rig.fx.play_sound(SoundCue::PhaseShift);
                    rig.combat.drop_loot(unit, LootTier::Guaranteed);
                });
                self.events
                    .publish(UnitEvent::PhaseTransitionStarted { unit, phase });
                true
            }
            BossDamage::Killed => {
                info!(%unit, "boss defeated");
                self.controller.on_death();
                self.controller.with_rig(|rig| {
                    rig.fx.play_sound(SoundCue::Death);
                    rig.combat.drop_loot(unit, LootTier::Guaranteed);
                });
                self.events.publish(UnitEvent::UnitDied { unit });
                true
            }
        }
    }

    /// Stuns the boss for `seconds`.
    pub fn stun(&self, seconds: f32) {
        let started = self.inner.lock().vitals.stun(seconds);
        if started {
            debug!(unit = %self.unit, seconds, "boss stunned");
            self.controller.on_stun_start();
        }
    }

    /// Advances stun and transition timers.
    pub fn tick(&self, dt: f32) {
        let (stun_ended, closed) = {
            let mut inner = self.inner.lock();
            (inner.vitals.tick(dt), inner.tick_transition(dt))
        };
        if let Some(phase) = closed {
            let unit = self.unit;
            self.controller
                .with_rig(|rig| rig.fx.set_visual(VisualState::Normal));
            self.controller.on_phase_transition_end();
            self.events
                .publish(UnitEvent::PhaseTransitionEnded { unit, phase });
        }
        if stun_ended {
            self.controller.on_stun_end();
        }
    }

    /// Full health, phase 0.
    pub fn restore(&self) {
        self.inner.lock().restore();
    }

    /// Copy of the current state.
    pub fn vitals(&self) -> BossVitals {
        self.inner.lock().clone()
    }
}

impl std::fmt::Debug for BossStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("BossStatus")
            .field("unit", &self.unit)
            .field("phase", &inner.phase)
            .field("health", &inner.vitals.health())
            .finish_non_exhaustive()
    }
}
