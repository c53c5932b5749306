//! Stationary charge-beam attack.
//!
//! Long charge, then a short charge pulsing a blink, then a projectile plus a
//! beam hitbox, then a recharge pause. The unit keeps turning toward the live
//! target the whole time.

use serde::{Deserialize, Serialize};
use tracing::trace;
use umbra_common::{ConfigError, ConfigResult, HitboxId, UnitId, Vec3};

use super::{Branch, BranchRole, Engagement, SequenceContext};
use crate::collab::{Hitbox, Projectile, Rig, SoundCue, VisualState};
use crate::sequence::{BranchFault, Countdown, Progress};

const NAME: &str = "charge_beam";

/// Charge-beam tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargeBeamConfig {
    /// Long charge stage
    pub long_charge: f32,
    /// Short charge stage
    pub short_charge: f32,
    /// Blinks shown during the short charge
    pub blink_count: u32,
    /// Pause after firing
    pub recharge: f32,
    /// Projectile speed
    pub projectile_speed: f32,
    /// Damage of the projectile and the beam
    pub damage: f32,
    /// Beam reach
    pub beam_length: f32,
    /// Seconds the beam stays open
    pub beam_lifetime: f32,
    /// Launch height above the unit origin
    pub muzzle_height: f32,
}

impl Default for ChargeBeamConfig {
    fn default() -> Self {
        Self {
            long_charge: 1.5,
            short_charge: 0.6,
            blink_count: 3,
            recharge: 1.0,
            projectile_speed: 25.0,
            damage: 15.0,
            beam_length: 20.0,
            beam_lifetime: 0.4,
            muzzle_height: 1.5,
        }
    }
}

impl ChargeBeamConfig {
    /// Checks the tuning values.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.long_charge < 0.0 || self.short_charge < 0.0 || self.recharge < 0.0 {
            return Err(ConfigError::invalid(NAME, "charge durations must be >= 0"));
        }
        if !(self.beam_lifetime > 0.0) || !(self.beam_length > 0.0) {
            return Err(ConfigError::invalid(
                "beam_length/beam_lifetime",
                "must be > 0",
            ));
        }
        if !(self.projectile_speed > 0.0) {
            return Err(ConfigError::invalid("projectile_speed", "must be > 0"));
        }
        Ok(())
    }

    fn blink_interval(&self) -> f32 {
        if self.blink_count == 0 {
            self.short_charge
        } else {
            self.short_charge / (self.blink_count * 2) as f32
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Start,
    LongCharge(Countdown),
    ShortCharge {
        timer: Countdown,
        pulse: Countdown,
        lit: bool,
    },
    Recharge(Countdown),
}

/// Charge-beam branch.
#[derive(Debug)]
pub struct ChargeBeam {
    config: ChargeBeamConfig,
    run: Option<Stage>,
    /// Beam opened by the last shot, closed by the collaborator on expiry
    open_beam: Option<(HitboxId, Countdown)>,
}

impl ChargeBeam {
    /// Creates the branch.
    pub fn new(config: ChargeBeamConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            run: None,
            open_beam: None,
        })
    }

    /// Whether the running sequence is in either charge stage.
    #[must_use]
    pub fn is_charging(&self) -> bool {
        matches!(
            self.run,
            Some(Stage::Start | Stage::LongCharge(_) | Stage::ShortCharge { .. })
        )
    }

    /// Beam hitbox still open, if any.
    #[must_use]
    pub fn open_beam(&self) -> Option<HitboxId> {
        self.open_beam.map(|(id, _)| id)
    }

    fn fire(
        &mut self,
        ctx: &mut SequenceContext<'_>,
        target_pos: Vec3,
    ) -> Result<(), BranchFault> {
        let rig = &mut *ctx.rig;
        let origin = rig.nav.position() + Vec3::Y * self.config.muzzle_height;
        let direction = (target_pos - origin).normalize_or_zero();
        if direction == Vec3::ZERO {
            return Err(BranchFault::BadInput {
                branch: NAME,
                detail: "target at the muzzle, no firing direction".to_string(),
            });
        }
        rig.combat.spawn_projectile(Projectile {
            owner: ctx.unit,
            origin,
            direction,
            speed: self.config.projectile_speed,
            damage: self.config.damage,
        });
        let id = rig.combat.open_hitbox(
            ctx.unit,
            Hitbox {
                origin,
                direction,
                length: self.config.beam_length,
                damage: self.config.damage,
                lifetime: self.config.beam_lifetime,
            },
        );
        self.open_beam = Some((id, Countdown::new(self.config.beam_lifetime)));
        rig.fx.play_sound(SoundCue::Fire);
        rig.fx.set_visual(VisualState::Normal);
        trace!(unit = %ctx.unit, hitbox = id.raw(), "beam fired");
        Ok(())
    }
}

impl Branch for ChargeBeam {
    fn name(&self) -> &'static str {
        NAME
    }

    fn role(&self) -> BranchRole {
        BranchRole::Aggressive
    }

    fn execute(&mut self, _engagement: &Engagement, _phase: usize) {
        self.run = Some(Stage::Start);
    }

    fn resume(&mut self, ctx: &mut SequenceContext<'_>) -> Result<Progress, BranchFault> {
        let stage = self.run.ok_or(BranchFault::NotStarted(NAME))?;
        let (_, target_pos) = ctx.require_target(NAME)?;

        if let Some((_, lifetime)) = self.open_beam.as_mut() {
            if lifetime.tick(ctx.dt) {
                self.open_beam = None;
            }
        }
        ctx.rig.nav.face_towards(target_pos);

        let next = match stage {
            Stage::Start => {
                ctx.rig.fx.set_visual(VisualState::Charging);
                ctx.rig.fx.play_sound(SoundCue::Windup);
                Stage::LongCharge(Countdown::new(self.config.long_charge))
            }
            Stage::LongCharge(mut timer) => {
                if timer.tick(ctx.dt) {
                    ctx.rig.fx.set_visual(VisualState::ChargeBlink);
                    ctx.rig.fx.play_sound(SoundCue::ChargeBlink);
                    Stage::ShortCharge {
                        timer: Countdown::new(self.config.short_charge),
                        pulse: Countdown::new(self.config.blink_interval()),
                        lit: true,
                    }
                } else {
                    Stage::LongCharge(timer)
                }
            }
            Stage::ShortCharge {
                mut timer,
                mut pulse,
                mut lit,
            } => {
                if timer.tick(ctx.dt) {
                    self.fire(ctx, target_pos)?;
                    Stage::Recharge(Countdown::new(self.config.recharge))
                } else {
                    if pulse.tick(ctx.dt) {
                        lit = !lit;
                        let visual = if lit {
                            ctx.rig.fx.play_sound(SoundCue::ChargeBlink);
                            VisualState::ChargeBlink
                        } else {
                            VisualState::Charging
                        };
                        ctx.rig.fx.set_visual(visual);
                        pulse.restart();
                    }
                    Stage::ShortCharge { timer, pulse, lit }
                }
            }
            Stage::Recharge(mut timer) => {
                if timer.tick(ctx.dt) {
                    self.run = None;
                    return Ok(Progress::Completed);
                }
                Stage::Recharge(timer)
            }
        };
        self.run = Some(next);
        Ok(Progress::Running)
    }

    fn reset(&mut self, _unit: UnitId, rig: &mut Rig) {
        if self.is_charging() {
            rig.fx.set_visual(VisualState::Normal);
        }
        self.run = None;
    }

    fn hard_reset(&mut self, unit: UnitId, rig: &mut Rig) {
        self.reset(unit, rig);
        if let Some((id, _)) = self.open_beam.take() {
            rig.combat.close_hitbox(id);
        }
    }

    fn is_running(&self) -> bool {
        self.run.is_some()
    }
}
