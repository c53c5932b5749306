//! Melee chase-and-recoil.
//!
//! The unit paths toward its target until the collision collaborator reports
//! body contact, lands the hit, gets knocked back away from the target over a
//! fixed duration, then recovers in place before chasing again.

use serde::{Deserialize, Serialize};
use umbra_common::{flat_direction, ConfigError, ConfigResult, UnitId, Vec3};

use super::{Branch, BranchRole, Engagement, SequenceContext};
use crate::collab::{Rig, SoundCue, VisualState};
use crate::sequence::{BranchFault, Countdown, Progress};

const NAME: &str = "chase_recoil";

/// Chase-recoil tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaseRecoilConfig {
    /// Seconds between path refreshes while chasing
    pub repath_interval: f32,
    /// Distance travelled during knockback
    pub knockback_distance: f32,
    /// Seconds the knockback lasts
    pub knockback_duration: f32,
    /// Seconds spent recovering after the knockback
    pub recovery_duration: f32,
    /// Damage dealt on contact
    pub damage: f32,
    /// Whether contact damage ignores defenses
    pub true_damage: bool,
}

impl Default for ChaseRecoilConfig {
    fn default() -> Self {
        Self {
            repath_interval: 0.25,
            knockback_distance: 3.0,
            knockback_duration: 0.35,
            recovery_duration: 1.2,
            damage: 10.0,
            true_damage: false,
        }
    }
}

impl ChaseRecoilConfig {
    /// Checks the tuning values.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.repath_interval > 0.0) {
            return Err(ConfigError::invalid("repath_interval", "must be > 0"));
        }
        if !(self.knockback_duration > 0.0) {
            return Err(ConfigError::invalid("knockback_duration", "must be > 0"));
        }
        if self.recovery_duration < 0.0 || self.knockback_distance < 0.0 || self.damage < 0.0 {
            return Err(ConfigError::invalid(
                "chase_recoil",
                "distances, durations and damage must be >= 0",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Chasing { repath: Countdown },
    Recoiling { from: Vec3, to: Vec3, timer: Countdown },
    Recovering(Countdown),
}

impl Stage {
    fn chasing() -> Self {
        // Zero countdown so the first resume requests a path right away.
        Self::Chasing {
            repath: Countdown::new(0.0),
        }
    }
}

/// Melee chase-recoil branch.
#[derive(Debug)]
pub struct ChaseRecoil {
    config: ChaseRecoilConfig,
    run: Option<Stage>,
    hits: u32,
}

impl ChaseRecoil {
    /// Creates the branch.
    pub fn new(config: ChaseRecoilConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            run: None,
            hits: 0,
        })
    }

    /// Contacts landed since spawn.
    #[must_use]
    pub fn hits(&self) -> u32 {
        self.hits
    }

    /// Whether the running sequence is in its recovery window.
    #[must_use]
    pub fn is_recovering(&self) -> bool {
        matches!(self.run, Some(Stage::Recovering(_)))
    }
}

impl Branch for ChaseRecoil {
    fn name(&self) -> &'static str {
        NAME
    }

    fn role(&self) -> BranchRole {
        BranchRole::Aggressive
    }

    fn execute(&mut self, _engagement: &Engagement, _phase: usize) {
        self.run = Some(Stage::chasing());
    }

    fn resume(&mut self, ctx: &mut SequenceContext<'_>) -> Result<Progress, BranchFault> {
        let stage = self.run.as_mut().ok_or(BranchFault::NotStarted(NAME))?;
        let (target, target_pos) = ctx.require_target(NAME)?;
        let rig = &mut *ctx.rig;

        match stage {
            Stage::Chasing { repath } => {
                if rig.combat.contact_registered(ctx.unit) {
                    rig.combat
                        .deal_damage(target, self.config.damage, self.config.true_damage);
                    rig.fx.play_sound(SoundCue::Impact);
                    rig.nav.stop();
                    self.hits += 1;

                    let from = rig.nav.position();
                    let mut away = flat_direction(target_pos, from);
                    if away == Vec3::ZERO {
                        away = Vec3::X;
                    }
                    tracing::debug!(unit = %ctx.unit, %target, "contact, recoiling");
                    *stage = Stage::Recoiling {
                        from,
                        to: from + away * self.config.knockback_distance,
                        timer: Countdown::new(self.config.knockback_duration),
                    };
                    return Ok(Progress::Running);
                }
                if repath.tick(ctx.dt) {
                    rig.nav.request_move_to(target_pos);
                    *repath = Countdown::new(self.config.repath_interval);
                }
            }
            Stage::Recoiling { from, to, timer } => {
                let done = timer.tick(ctx.dt);
                rig.nav.displace_to(from.lerp(*to, timer.progress()));
                if done {
                    rig.fx.set_visual(VisualState::Recovering);
                    *stage = Stage::Recovering(Countdown::new(self.config.recovery_duration));
                }
            }
            Stage::Recovering(timer) => {
                if timer.tick(ctx.dt) {
                    rig.fx.set_visual(VisualState::Normal);
                    *stage = Stage::chasing();
                }
            }
        }
        Ok(Progress::Running)
    }

    fn reset(&mut self, _unit: UnitId, rig: &mut Rig) {
        match self.run.take() {
            Some(Stage::Recovering(_) | Stage::Recoiling { .. }) => {
                rig.fx.set_visual(VisualState::Normal);
                rig.nav.stop();
            }
            Some(Stage::Chasing { .. }) => rig.nav.stop(),
            None => {}
        }
    }

    fn is_running(&self) -> bool {
        self.run.is_some()
    }
}
