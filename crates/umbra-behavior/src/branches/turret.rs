//! Multi-emitter boss turret.
//!
//! Which emitters fire depends on the boss phase:
//! - phase 0: the primary emitter only
//! - phase 1: one emitter per shot, rotating through the array
//! - phase 2 and later: every emitter at once
//!
//! The cooldown gate is kept on the branch rather than in the sequence, so
//! restarting the sequence cannot fire twice inside one cooldown window.

use serde::{Deserialize, Serialize};
use tracing::debug;
use umbra_common::{ConfigError, ConfigResult, HitboxId, UnitId, Vec3};

use super::{Branch, BranchRole, Engagement, SequenceContext};
use crate::collab::{Hitbox, Rig, SoundCue, VisualState};
use crate::sequence::{BranchFault, Countdown, Progress};

const NAME: &str = "turret";

/// Turret tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurretConfig {
    /// Emitter offsets from the unit origin
    pub emitters: Vec<Vec3>,
    /// Emitter used in the first phase
    pub primary_emitter: usize,
    /// Seconds between volleys
    pub cooldown: f32,
    /// Charge before each volley
    pub charge: f32,
    /// Beam reach
    pub beam_length: f32,
    /// Seconds a beam stays open
    pub beam_lifetime: f32,
    /// Damage per beam contact
    pub damage: f32,
}

impl Default for TurretConfig {
    fn default() -> Self {
        Self {
            emitters: vec![Vec3::new(0.0, 2.0, 0.0)],
            primary_emitter: 0,
            cooldown: 4.0,
            charge: 1.0,
            beam_length: 30.0,
            beam_lifetime: 1.0,
            damage: 20.0,
        }
    }
}

impl TurretConfig {
    /// Checks the tuning values.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.emitters.is_empty() {
            return Err(ConfigError::EmptyEmitters(NAME.to_string()));
        }
        if self.primary_emitter >= self.emitters.len() {
            return Err(ConfigError::invalid(
                "primary_emitter",
                format!(
                    "index {} out of {} emitters",
                    self.primary_emitter,
                    self.emitters.len()
                ),
            ));
        }
        if self.cooldown < 0.0 || self.charge < 0.0 {
            return Err(ConfigError::invalid("cooldown/charge", "must be >= 0"));
        }
        if !(self.beam_lifetime > 0.0) || !(self.beam_length > 0.0) {
            return Err(ConfigError::invalid(
                "beam_length/beam_lifetime",
                "must be > 0",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Waiting,
    Charging(Countdown),
}

/// Turret branch.
#[derive(Debug)]
pub struct Turret {
    config: TurretConfig,
    run: Option<Stage>,
    phase: usize,
    /// Unit clock time at which the next volley may start
    ready_at: f64,
    rotation: usize,
    open_beams: Vec<(HitboxId, Countdown)>,
    volleys: u32,
}

impl Turret {
    /// Creates the branch.
    pub fn new(config: TurretConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            run: None,
            phase: 0,
            ready_at: 0.0,
            rotation: 0,
            open_beams: Vec::new(),
            volleys: 0,
        })
    }

    /// Volleys fired since spawn.
    #[must_use]
    pub fn volleys(&self) -> u32 {
        self.volleys
    }

    /// Emitters the next volley uses in `phase`.
    #[must_use]
    pub fn emitters_for(&self, phase: usize) -> Vec<usize> {
        match phase {
            0 => vec![self.config.primary_emitter],
            1 => vec![self.rotation % self.config.emitters.len()],
            _ => (0..self.config.emitters.len()).collect(),
        }
    }

    fn fire(
        &mut self,
        ctx: &mut SequenceContext<'_>,
        target_pos: Vec3,
    ) -> Result<(), BranchFault> {
        let position = ctx.rig.nav.position();
        let emitters = self.emitters_for(self.phase);
        for index in &emitters {
            let origin = position + self.config.emitters[*index];
            let direction = (target_pos - origin).normalize_or_zero();
            if direction == Vec3::ZERO {
                return Err(BranchFault::BadInput {
                    branch: NAME,
                    detail: format!("target sits on emitter {index}"),
                });
            }
            let id = ctx.rig.combat.open_hitbox(
                ctx.unit,
                Hitbox {
                    origin,
                    direction,
                    length: self.config.beam_length,
                    damage: self.config.damage,
                    lifetime: self.config.beam_lifetime,
                },
            );
            self.open_beams
                .push((id, Countdown::new(self.config.beam_lifetime)));
        }
        if self.phase == 1 {
            self.rotation = (self.rotation + 1) % self.config.emitters.len();
        }
        self.ready_at = ctx.now + f64::from(self.config.cooldown);
        self.volleys += 1;
        ctx.rig.fx.play_sound(SoundCue::Fire);
        ctx.rig.fx.set_visual(VisualState::Normal);
        ctx.rig.fx.display_cooldown(1.0);
        debug!(unit = %ctx.unit, phase = self.phase, ?emitters, "turret volley");
        Ok(())
    }

    fn close_beams(&mut self, rig: &mut Rig) {
        for (id, _) in self.open_beams.drain(..) {
            rig.combat.close_hitbox(id);
        }
    }
}

impl Branch for Turret {
    fn name(&self) -> &'static str {
        NAME
    }

    fn role(&self) -> BranchRole {
        BranchRole::Aggressive
    }

    fn execute(&mut self, _engagement: &Engagement, phase: usize) {
        self.phase = phase;
        self.run = Some(Stage::Waiting);
    }

    fn resume(&mut self, ctx: &mut SequenceContext<'_>) -> Result<Progress, BranchFault> {
        let stage = self.run.ok_or(BranchFault::NotStarted(NAME))?;
        let (_, target_pos) = ctx.require_target(NAME)?;

        let dt = ctx.dt;
        self.open_beams.retain_mut(|(_, lifetime)| !lifetime.tick(dt));
        ctx.rig.nav.face_towards(target_pos);

        match stage {
            Stage::Waiting => {
                if ctx.now >= self.ready_at {
                    ctx.rig.fx.set_visual(VisualState::Charging);
                    ctx.rig.fx.play_sound(SoundCue::Windup);
                    self.run = Some(Stage::Charging(Countdown::new(self.config.charge)));
                } else if self.config.cooldown > 0.0 {
                    let left = (self.ready_at - ctx.now) as f32;
                    ctx.rig.fx.display_cooldown(left / self.config.cooldown);
                }
            }
            Stage::Charging(mut timer) => {
                if timer.tick(ctx.dt) {
                    self.fire(ctx, target_pos)?;
                    self.run = None;
                    return Ok(Progress::Completed);
                }
                self.run = Some(Stage::Charging(timer));
            }
        }
        Ok(Progress::Running)
    }

    fn reset(&mut self, _unit: UnitId, rig: &mut Rig) {
        if matches!(self.run.take(), Some(Stage::Charging(_))) {
            rig.fx.set_visual(VisualState::Normal);
        }
    }

    fn hard_reset(&mut self, unit: UnitId, rig: &mut Rig) {
        self.reset(unit, rig);
        self.close_beams(rig);
        self.ready_at = 0.0;
        self.rotation = 0;
    }

    fn is_running(&self) -> bool {
        self.run.is_some()
    }
}
