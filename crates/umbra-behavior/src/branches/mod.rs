//! Branch strategies.
//!
//! A branch is one interruptible behavior (chase, kite, charge a beam, patrol,
//! scout...). Each branch owns at most one running sequence: [`Branch::execute`]
//! starts a fresh one, [`Branch::resume`] advances it to its next suspension
//! point, and [`Branch::reset`] drops it. Branches are selected by composition
//! into a [`BranchSet`]; the controller never looks inside them.

use serde::{Deserialize, Serialize};
use umbra_common::{ConfigResult, UnitId, Vec3};

use crate::collab::Rig;
use crate::sequence::{BranchFault, Progress};

pub mod charge_beam;
pub mod hold;
pub mod melee;
pub mod patrol;
pub mod ranged;
pub mod scouting;
pub mod turret;

pub use charge_beam::{ChargeBeam, ChargeBeamConfig};
pub use hold::{Hold, HoldConfig};
pub use melee::{ChaseRecoil, ChaseRecoilConfig};
pub use patrol::{Patrol, PatrolConfig};
pub use ranged::{Kiter, KiterConfig};
pub use scouting::{Scout, ScoutConfig};
pub use turret::{Turret, TurretConfig};

/// Tagged configuration of an aggressive branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggressiveConfig {
    /// Melee chase and recoil
    ChaseRecoil(ChaseRecoilConfig),
    /// Ranged kiting
    Kiter(KiterConfig),
    /// Stationary charge beam
    ChargeBeam(ChargeBeamConfig),
    /// Multi-emitter turret
    Turret(TurretConfig),
}

impl Default for AggressiveConfig {
    fn default() -> Self {
        Self::ChaseRecoil(ChaseRecoilConfig::default())
    }
}

impl AggressiveConfig {
    /// Checks the wrapped configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        match self {
            Self::ChaseRecoil(config) => config.validate(),
            Self::Kiter(config) => config.validate(),
            Self::ChargeBeam(config) => config.validate(),
            Self::Turret(config) => config.validate(),
        }
    }

    /// Builds the branch.
    pub fn build(&self) -> ConfigResult<Box<dyn Branch>> {
        Ok(match self {
            Self::ChaseRecoil(config) => Box::new(ChaseRecoil::new(config.clone())?),
            Self::Kiter(config) => Box::new(Kiter::new(config.clone())?),
            Self::ChargeBeam(config) => Box::new(ChargeBeam::new(config.clone())?),
            Self::Turret(config) => Box::new(Turret::new(config.clone())?),
        })
    }
}

/// Tagged configuration of a passive branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PassiveConfig {
    /// Waypoint patrol
    Patrol(PatrolConfig),
    /// Scouting, then an inner passive branch
    Scout(ScoutConfig),
    /// Stationary guard
    Hold(HoldConfig),
}

impl Default for PassiveConfig {
    fn default() -> Self {
        Self::Hold(HoldConfig::default())
    }
}

impl PassiveConfig {
    /// Checks the wrapped configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        match self {
            Self::Patrol(config) => config.validate(),
            Self::Scout(config) => config.validate(),
            Self::Hold(config) => config.validate(),
        }
    }

    /// Builds the branch.
    pub fn build(&self) -> ConfigResult<Box<dyn Branch>> {
        Ok(match self {
            Self::Patrol(config) => Box::new(Patrol::new(config.clone())?),
            Self::Scout(config) => Box::new(Scout::new(config.clone())?),
            Self::Hold(config) => Box::new(Hold::new(config.clone())?),
        })
    }
}

/// Which side of the controller a branch serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchRole {
    /// Runs while a target is held
    Aggressive,
    /// Runs while no target is held (patrol, scouting, guarding)
    Passive,
}

/// What a sequence is engaging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Engagement {
    /// A live target
    Target {
        /// Target unit
        unit: UnitId,
        /// Its current position
        position: Vec3,
    },
    /// No target; where one was last seen, if ever
    LastKnown(Option<Vec3>),
}

impl Engagement {
    /// Live target and its position.
    #[must_use]
    pub fn target(&self) -> Option<(UnitId, Vec3)> {
        match *self {
            Self::Target { unit, position } => Some((unit, position)),
            Self::LastKnown(_) => None,
        }
    }

    /// Last known location, when engaging nothing.
    #[must_use]
    pub fn last_known(&self) -> Option<Vec3> {
        match *self {
            Self::Target { .. } => None,
            Self::LastKnown(location) => location,
        }
    }
}

/// Everything a sequence may touch while it is resumed.
pub struct SequenceContext<'a> {
    /// Unit running the sequence
    pub unit: UnitId,
    /// Seconds since the previous resume
    pub dt: f32,
    /// Unit clock in seconds
    pub now: f64,
    /// Current boss phase (0 for regular enemies)
    pub phase: usize,
    /// Live target or last known location
    pub engagement: Engagement,
    /// Collaborators
    pub rig: &'a mut Rig,
    /// Unit random source
    pub rng: &'a mut fastrand::Rng,
}

impl SequenceContext<'_> {
    /// Live target or a [`BranchFault::NoTarget`] for `branch`.
    pub fn require_target(&self, branch: &'static str) -> Result<(UnitId, Vec3), BranchFault> {
        self.engagement.target().ok_or(BranchFault::NoTarget(branch))
    }
}

/// Capability shared by every behavior strategy.
pub trait Branch: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Side of the controller this branch serves.
    fn role(&self) -> BranchRole;

    /// Starts a fresh sequence, replacing any previous one.
    fn execute(&mut self, engagement: &Engagement, phase: usize);

    /// Advances the running sequence to its next suspension point.
    fn resume(&mut self, ctx: &mut SequenceContext<'_>) -> Result<Progress, BranchFault>;

    /// Drops the running sequence. Safe at any suspension point; leaves no
    /// persistent external side effect behind.
    fn reset(&mut self, unit: UnitId, rig: &mut Rig);

    /// Reset that also closes any attack window the branch opened.
    fn hard_reset(&mut self, unit: UnitId, rig: &mut Rig) {
        self.reset(unit, rig);
    }

    /// Whether a sequence is running.
    fn is_running(&self) -> bool;
}

impl std::fmt::Debug for dyn Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Branch")
            .field("name", &self.name())
            .field("running", &self.is_running())
            .finish()
    }
}

/// The aggressive and passive branch a unit runs in one phase.
#[derive(Debug)]
pub struct BranchSet {
    /// Runs while a target is held
    pub aggressive: Box<dyn Branch>,
    /// Runs otherwise
    pub passive: Box<dyn Branch>,
}

impl BranchSet {
    /// Creates a branch set.
    pub fn new(aggressive: impl Branch + 'static, passive: impl Branch + 'static) -> Self {
        Self::from_boxed(Box::new(aggressive), Box::new(passive))
    }

    /// Creates a branch set from already boxed branches.
    #[must_use]
    pub fn from_boxed(aggressive: Box<dyn Branch>, passive: Box<dyn Branch>) -> Self {
        Self {
            aggressive,
            passive,
        }
    }

    /// Builds both branches from configuration.
    pub fn from_config(
        aggressive: &AggressiveConfig,
        passive: &PassiveConfig,
    ) -> ConfigResult<Self> {
        Ok(Self::from_boxed(aggressive.build()?, passive.build()?))
    }

    /// Branch serving `role`.
    pub fn get_mut(&mut self, role: BranchRole) -> &mut dyn Branch {
        match role {
            BranchRole::Aggressive => self.aggressive.as_mut(),
            BranchRole::Passive => self.passive.as_mut(),
        }
    }

    /// Hard-resets both branches.
    pub fn hard_reset_all(&mut self, unit: UnitId, rig: &mut Rig) {
        self.aggressive.hard_reset(unit, rig);
        self.passive.hard_reset(unit, rig);
    }
}
