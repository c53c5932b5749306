//! Collaborator interfaces consumed by the decision core.
//!
//! Movement, perception geometry, combat resolution and presentation all live
//! outside this crate. Units reach them only through these narrow traits,
//! bundled per unit in a [`Rig`].

use serde::{Deserialize, Serialize};
use umbra_common::{ConfigError, ConfigResult, HitboxId, UnitId, Vec3};

/// Navigation agent of a single unit.
pub trait Navigator: Send {
    /// Requests a path to `point`. Returns whether the request was accepted.
    fn request_move_to(&mut self, point: Vec3) -> bool;
    /// Whether the path for the last request is still being computed.
    fn is_path_pending(&self) -> bool;
    /// Remaining distance along the current path.
    fn remaining_distance(&self) -> f32;
    /// Sets the movement speed.
    fn set_speed(&mut self, speed: f32);
    /// Drops the current path and halts.
    fn stop(&mut self);
    /// Current position of the unit.
    fn position(&self) -> Vec3;
    /// Turns the unit to face `point`.
    fn face_towards(&mut self, point: Vec3);
    /// Moves the unit kinematically, bypassing pathing (knockback).
    fn displace_to(&mut self, point: Vec3);
}

/// Perception geometry and world lookups.
pub trait Perception: Send {
    /// Whether nothing blocks the segment between two points.
    fn is_line_of_sight_clear(&self, from: Vec3, to: Vec3) -> bool;
    /// Position of a unit, or `None` once it no longer exists.
    fn position_of(&self, unit: UnitId) -> Option<Vec3>;
    /// Whether a unit exists and is alive.
    fn is_alive(&self, unit: UnitId) -> bool;
}

/// A projectile launch request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    /// Unit that fired it
    pub owner: UnitId,
    /// Launch position
    pub origin: Vec3,
    /// Normalized travel direction
    pub direction: Vec3,
    /// Travel speed
    pub speed: f32,
    /// Damage on hit
    pub damage: f32,
}

/// An attack window kept open by the combat collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitbox {
    /// Where the window starts (emitter or muzzle)
    pub origin: Vec3,
    /// Direction it extends in
    pub direction: Vec3,
    /// Reach of the window
    pub length: f32,
    /// Damage per contact
    pub damage: f32,
    /// Seconds until the collaborator closes it on its own
    pub lifetime: f32,
}

/// Loot quality dropped by a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LootTier {
    /// Regular drop
    Common,
    /// Guaranteed boss phase drop
    Guaranteed,
}

/// Combat resolution.
pub trait Combat: Send {
    /// Deals damage to a unit. Returns whether it was applied.
    fn deal_damage(&mut self, unit: UnitId, amount: f32, true_damage: bool) -> bool;
    /// Launches a projectile.
    fn spawn_projectile(&mut self, projectile: Projectile);
    /// Scales a unit's movement speed (1.0 restores it).
    fn apply_speed_factor(&mut self, unit: UnitId, factor: f32);
    /// Marks a unit stunned or not.
    fn set_stunned(&mut self, unit: UnitId, stunned: bool);
    /// Consumes a body contact registered for `unit` since the last call.
    fn contact_registered(&mut self, unit: UnitId) -> bool;
    /// Opens an attack window.
    fn open_hitbox(&mut self, owner: UnitId, hitbox: Hitbox) -> HitboxId;
    /// Closes an attack window immediately. Unknown or expired ids are ignored.
    fn close_hitbox(&mut self, id: HitboxId);
    /// Drops loot at the unit's position.
    fn drop_loot(&mut self, unit: UnitId, tier: LootTier);
}

/// Sound cues raised by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    /// Target noticed
    Alert,
    /// Attack wind-up
    Windup,
    /// Charge pulse
    ChargeBlink,
    /// Projectile or beam fired
    Fire,
    /// Body hit landed
    Impact,
    /// Boss phase change
    PhaseShift,
    /// Unit died
    Death,
}

/// Tint/pose states shown on the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VisualState {
    /// No overlay
    #[default]
    Normal,
    /// Long charge stage
    Charging,
    /// Short charge stage, blink on
    ChargeBlink,
    /// Recovering after an attack
    Recovering,
    /// Stunned
    Stunned,
    /// Phase transition invulnerability
    Invulnerable,
}

/// Presentation side effects. Fire-and-forget: nothing returned is used by logic.
pub trait Presentation: Send {
    /// Plays a sound.
    fn play_sound(&mut self, cue: SoundCue);
    /// Sets the unit's visual state.
    fn set_visual(&mut self, state: VisualState);
    /// Shows or hides the incoming-hit indicator.
    fn set_hit_indicator(&mut self, visible: bool);
    /// Displays an attack cooldown, `1.0` = just used, `0.0` = ready.
    fn display_cooldown(&mut self, fraction: f32);
}

/// The collaborators a single unit talks to.
pub struct Rig {
    /// Navigation agent
    pub nav: Box<dyn Navigator>,
    /// Perception geometry
    pub perception: Box<dyn Perception>,
    /// Combat resolution
    pub combat: Box<dyn Combat>,
    /// Presentation
    pub fx: Box<dyn Presentation>,
}

impl Rig {
    /// Starts building a rig.
    #[must_use]
    pub fn builder() -> RigBuilder {
        RigBuilder::default()
    }
}

impl std::fmt::Debug for Rig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rig")
            .field("position", &self.nav.position())
            .finish_non_exhaustive()
    }
}

/// Builder that reports missing collaborators as configuration errors.
#[derive(Default)]
pub struct RigBuilder {
    nav: Option<Box<dyn Navigator>>,
    perception: Option<Box<dyn Perception>>,
    combat: Option<Box<dyn Combat>>,
    fx: Option<Box<dyn Presentation>>,
}

impl RigBuilder {
    /// Sets the navigator.
    pub fn navigator(mut self, nav: impl Navigator + 'static) -> Self {
        self.nav = Some(Box::new(nav));
        self
    }

    /// Sets the perception provider.
    pub fn perception(mut self, perception: impl Perception + 'static) -> Self {
        self.perception = Some(Box::new(perception));
        self
    }

    /// Sets the combat resolver.
    pub fn combat(mut self, combat: impl Combat + 'static) -> Self {
        self.combat = Some(Box::new(combat));
        self
    }

    /// Sets the presentation sink.
    pub fn presentation(mut self, fx: impl Presentation + 'static) -> Self {
        self.fx = Some(Box::new(fx));
        self
    }

    /// Finishes the rig.
    pub fn build(self) -> ConfigResult<Rig> {
        Ok(Rig {
            nav: self.nav.ok_or(ConfigError::MissingCollaborator("navigator"))?,
            perception: self
                .perception
                .ok_or(ConfigError::MissingCollaborator("perception"))?,
            combat: self.combat.ok_or(ConfigError::MissingCollaborator("combat"))?,
            fx: self.fx.ok_or(ConfigError::MissingCollaborator("presentation"))?,
        })
    }
}
