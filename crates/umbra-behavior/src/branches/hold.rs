//! Stationary guard: walk back to the post, face the guard direction, idle.

use serde::{Deserialize, Serialize};
use umbra_common::{flat_distance, ConfigError, ConfigResult, UnitId, Vec3};

use super::{Branch, BranchRole, Engagement, SequenceContext};
use crate::collab::Rig;
use crate::sequence::{BranchFault, MoveOrder, MoveStatus, Progress};

const NAME: &str = "hold";

/// Guard post settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldConfig {
    /// Post to guard; the spawn position when unset
    pub post: Option<Vec3>,
    /// Direction to face while idle
    pub facing: Option<Vec3>,
    /// Distance at which the unit counts as back on its post
    pub tolerance: f32,
    /// Seconds before the walk back is abandoned
    pub move_timeout: f32,
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            post: None,
            facing: None,
            tolerance: 0.5,
            move_timeout: 6.0,
        }
    }
}

impl HoldConfig {
    /// Checks the settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.tolerance < 0.0 || self.move_timeout < 0.0 {
            return Err(ConfigError::invalid("tolerance/move_timeout", "must be >= 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Start,
    Returning(MoveOrder),
    Idle,
}

/// Hold branch.
#[derive(Debug)]
pub struct Hold {
    config: HoldConfig,
    run: Option<Stage>,
    post: Option<Vec3>,
}

impl Hold {
    /// Creates the branch.
    pub fn new(config: HoldConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            post: config.post,
            config,
            run: None,
        })
    }

    /// The guarded post, once known.
    #[must_use]
    pub fn post(&self) -> Option<Vec3> {
        self.post
    }

    /// Whether the unit is idling on its post.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self.run, Some(Stage::Idle))
    }

    fn settle(&self, rig: &mut Rig, post: Vec3) {
        rig.nav.stop();
        if let Some(facing) = self.config.facing {
            rig.nav.face_towards(post + facing);
        }
    }
}

impl Branch for Hold {
    fn name(&self) -> &'static str {
        NAME
    }

    fn role(&self) -> BranchRole {
        BranchRole::Passive
    }

    fn execute(&mut self, _engagement: &Engagement, _phase: usize) {
        self.run = Some(Stage::Start);
    }

    fn resume(&mut self, ctx: &mut SequenceContext<'_>) -> Result<Progress, BranchFault> {
        let stage = self.run.ok_or(BranchFault::NotStarted(NAME))?;
        let rig = &mut *ctx.rig;
        let position = rig.nav.position();
        let post = *self.post.get_or_insert(position);

        let next = match stage {
            Stage::Start if flat_distance(position, post) <= self.config.tolerance => {
                self.settle(rig, post);
                Stage::Idle
            }
            Stage::Start => Stage::Returning(MoveOrder::issue(
                rig.nav.as_mut(),
                post,
                self.config.tolerance,
                self.config.move_timeout,
            )),
            Stage::Returning(mut order) => match order.poll(rig.nav.as_ref(), ctx.dt) {
                MoveStatus::InProgress => Stage::Returning(order),
                MoveStatus::Arrived | MoveStatus::Abandoned => {
                    self.settle(rig, post);
                    Stage::Idle
                }
            },
            Stage::Idle => Stage::Idle,
        };
        self.run = Some(next);
        Ok(Progress::Running)
    }

    fn reset(&mut self, _unit: UnitId, rig: &mut Rig) {
        if matches!(self.run.take(), Some(Stage::Returning(_))) {
            rig.nav.stop();
        }
    }

    fn is_running(&self) -> bool {
        self.run.is_some()
    }
}
