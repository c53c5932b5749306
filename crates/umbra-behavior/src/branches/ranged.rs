//! Ranged kiting.
//!
//! Keeps a randomized preferred distance inside an engagement band. Outside
//! the band the unit walks to the band; inside it the unit side-steps. Attacks
//! run alongside movement: wind-up (slowed), fire, cooldown.

use serde::{Deserialize, Serialize};
use umbra_common::{
    flat_direction, flat_distance, flat_perpendicular, ConfigError, ConfigResult, UnitId, Vec3,
};

use super::{Branch, BranchRole, Engagement, SequenceContext};
use crate::collab::{Projectile, Rig, SoundCue};
use crate::sequence::{BranchFault, Countdown, MoveOrder, MoveStatus, Progress};

const NAME: &str = "kiter";

/// Kiter tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KiterConfig {
    /// Closest comfortable distance to the target
    pub min_distance: f32,
    /// Farthest comfortable distance to the target
    pub max_distance: f32,
    /// Lateral offset of a side-step
    pub side_step: f32,
    /// Arrival tolerance for movement orders
    pub tolerance: f32,
    /// Seconds before an unfinished movement order is abandoned
    pub move_timeout: f32,
    /// Wind-up before each shot
    pub anticipation: f32,
    /// Seconds between shots
    pub cooldown: f32,
    /// Speed factor applied during wind-up
    pub anticipation_speed_factor: f32,
    /// Projectile speed
    pub projectile_speed: f32,
    /// Projectile damage
    pub damage: f32,
    /// Launch height above the unit origin
    pub muzzle_height: f32,
}

impl Default for KiterConfig {
    fn default() -> Self {
        Self {
            min_distance: 6.0,
            max_distance: 10.0,
            side_step: 3.0,
            tolerance: 0.5,
            move_timeout: 3.0,
            anticipation: 0.6,
            cooldown: 2.0,
            anticipation_speed_factor: 0.4,
            projectile_speed: 18.0,
            damage: 8.0,
            muzzle_height: 1.2,
        }
    }
}

impl KiterConfig {
    /// Checks the tuning values.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.min_distance > 0.0) || self.max_distance < self.min_distance {
            return Err(ConfigError::invalid(
                "min_distance/max_distance",
                format!(
                    "need 0 < min <= max (got {} / {})",
                    self.min_distance, self.max_distance
                ),
            ));
        }
        if self.anticipation < 0.0 || self.cooldown < 0.0 || self.move_timeout < 0.0 {
            return Err(ConfigError::invalid("kiter", "durations must be >= 0"));
        }
        if !(self.projectile_speed > 0.0) {
            return Err(ConfigError::invalid("projectile_speed", "must be > 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Attack {
    Waiting,
    Anticipating(Countdown),
}

#[derive(Debug, Clone, Copy)]
struct Run {
    preferred: Option<f32>,
    movement: Option<MoveOrder>,
    side: f32,
    attack: Attack,
}

/// Ranged kiter branch.
#[derive(Debug)]
pub struct Kiter {
    config: KiterConfig,
    run: Option<Run>,
    slowed: bool,
    /// Unit clock time at which the next wind-up may start
    ready_at: f64,
    shots: u32,
}

impl Kiter {
    /// Creates the branch.
    pub fn new(config: KiterConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            run: None,
            slowed: false,
            ready_at: 0.0,
            shots: 0,
        })
    }

    /// Preferred distance of the running sequence, once chosen.
    #[must_use]
    pub fn preferred_distance(&self) -> Option<f32> {
        self.run.and_then(|run| run.preferred)
    }

    /// Projectiles fired since spawn.
    #[must_use]
    pub fn shots(&self) -> u32 {
        self.shots
    }

    fn in_band(&self, distance: f32) -> bool {
        distance >= self.config.min_distance && distance <= self.config.max_distance
    }
}

impl Branch for Kiter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn role(&self) -> BranchRole {
        BranchRole::Aggressive
    }

    fn execute(&mut self, _engagement: &Engagement, _phase: usize) {
        self.run = Some(Run {
            preferred: None,
            movement: None,
            side: 1.0,
            attack: Attack::Waiting,
        });
    }

    fn resume(&mut self, ctx: &mut SequenceContext<'_>) -> Result<Progress, BranchFault> {
        if self.run.is_none() {
            return Err(BranchFault::NotStarted(NAME));
        }
        let (target, target_pos) = ctx.require_target(NAME)?;
        let position = ctx.rig.nav.position();
        let in_band = self.in_band(flat_distance(position, target_pos));

        let config = &self.config;
        let Some(run) = self.run.as_mut() else {
            return Err(BranchFault::NotStarted(NAME));
        };
        let preferred = match run.preferred {
            Some(preferred) => preferred,
            None => {
                let spread = config.max_distance - config.min_distance;
                let preferred = config.min_distance + ctx.rng.f32() * spread;
                run.preferred = Some(preferred);
                preferred
            }
        };
        let rig = &mut *ctx.rig;
        rig.nav.face_towards(target_pos);

        let status = match run.movement.as_mut() {
            Some(order) => order.poll(rig.nav.as_ref(), ctx.dt),
            None => MoveStatus::Abandoned,
        };
        if status != MoveStatus::InProgress {
            let mut outward = flat_direction(target_pos, position);
            if outward == Vec3::ZERO {
                outward = Vec3::X;
            }
            let destination = if in_band {
                run.side = -run.side;
                position + flat_perpendicular(outward) * config.side_step * run.side
            } else {
                target_pos + outward * preferred
            };
            run.movement = Some(MoveOrder::issue(
                rig.nav.as_mut(),
                destination,
                config.tolerance,
                config.move_timeout,
            ));
        }

        match &mut run.attack {
            Attack::Waiting => {
                if ctx.now >= self.ready_at {
                    rig.fx.play_sound(SoundCue::Windup);
                    rig.combat
                        .apply_speed_factor(ctx.unit, config.anticipation_speed_factor);
                    self.slowed = true;
                    run.attack = Attack::Anticipating(Countdown::new(config.anticipation));
                } else if config.cooldown > 0.0 {
                    let left = (self.ready_at - ctx.now) as f32;
                    rig.fx.display_cooldown(left / config.cooldown);
                }
            }
            Attack::Anticipating(timer) => {
                if timer.tick(ctx.dt) {
                    let origin = position + Vec3::Y * config.muzzle_height;
                    let direction = (target_pos - origin).normalize_or_zero();
                    if direction == Vec3::ZERO {
                        return Err(BranchFault::BadInput {
                            branch: NAME,
                            detail: format!("target {target} sits on the muzzle"),
                        });
                    }
                    rig.combat.spawn_projectile(Projectile {
                        owner: ctx.unit,
                        origin,
                        direction,
                        speed: config.projectile_speed,
                        damage: config.damage,
                    });
                    rig.fx.play_sound(SoundCue::Fire);
                    rig.fx.display_cooldown(1.0);
                    rig.combat.apply_speed_factor(ctx.unit, 1.0);
                    self.slowed = false;
                    self.shots += 1;
                    self.ready_at = ctx.now + f64::from(config.cooldown);
                    run.attack = Attack::Waiting;
                }
            }
        }
        Ok(Progress::Running)
    }

    fn reset(&mut self, unit: UnitId, rig: &mut Rig) {
        if self.run.take().is_some() {
            rig.nav.stop();
        }
        if self.slowed {
            rig.combat.apply_speed_factor(unit, 1.0);
            self.slowed = false;
        }
    }

    fn hard_reset(&mut self, unit: UnitId, rig: &mut Rig) {
        self.reset(unit, rig);
        self.ready_at = 0.0;
    }

    fn is_running(&self) -> bool {
        self.run.is_some()
    }
}
