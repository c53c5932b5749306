//! Waypoint patrol.

use serde::{Deserialize, Serialize};
use tracing::debug;
use umbra_common::{nearest_index, ConfigError, ConfigResult, UnitId, Vec3};

use super::{Branch, BranchRole, Engagement, SequenceContext};
use crate::collab::Rig;
use crate::sequence::{BranchFault, Countdown, MoveOrder, MoveStatus, Progress};

const NAME: &str = "patrol";

/// Patrol route and pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatrolConfig {
    /// Route, visited in order and looping
    pub waypoints: Vec<Vec3>,
    /// Distance at which a waypoint counts as reached
    pub tolerance: f32,
    /// Seconds spent at each waypoint
    pub dwell: f32,
    /// Seconds before an unfinished leg is abandoned
    pub move_timeout: f32,
}

impl Default for PatrolConfig {
    fn default() -> Self {
        Self {
            waypoints: Vec::new(),
            tolerance: 0.5,
            dwell: 1.5,
            move_timeout: 8.0,
        }
    }
}

impl PatrolConfig {
    /// Checks the route.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.waypoints.is_empty() {
            return Err(ConfigError::EmptyWaypoints(NAME.to_string()));
        }
        if self.tolerance < 0.0 || self.dwell < 0.0 || self.move_timeout < 0.0 {
            return Err(ConfigError::invalid(
                "tolerance/dwell/move_timeout",
                "must be >= 0",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    /// Picks the waypoint nearest to the unit
    Start,
    Travel { index: usize, order: MoveOrder },
    Dwell { index: usize, timer: Countdown },
}

/// Patrol branch.
#[derive(Debug)]
pub struct Patrol {
    config: PatrolConfig,
    run: Option<Stage>,
    last_reached: Option<usize>,
}

impl Patrol {
    /// Creates the branch.
    pub fn new(config: PatrolConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            run: None,
            last_reached: None,
        })
    }

    /// Waypoint most recently reached.
    #[must_use]
    pub fn last_reached(&self) -> Option<usize> {
        self.last_reached
    }

    /// Waypoint the running sequence is heading to or dwelling at.
    #[must_use]
    pub fn current_waypoint(&self) -> Option<usize> {
        match self.run {
            Some(Stage::Travel { index, .. } | Stage::Dwell { index, .. }) => Some(index),
            Some(Stage::Start) | None => None,
        }
    }

    fn travel(&self, rig: &mut Rig, index: usize) -> Stage {
        let order = MoveOrder::issue(
            rig.nav.as_mut(),
            self.config.waypoints[index],
            self.config.tolerance,
            self.config.move_timeout,
        );
        Stage::Travel { index, order }
    }

    fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.config.waypoints.len()
    }
}

impl Branch for Patrol {
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

        let next = match stage {
            Stage::Start => {
                let index =
                    nearest_index(rig.nav.position(), &self.config.waypoints).ok_or_else(|| {
                        BranchFault::BadInput {
                            branch: NAME,
                            detail: "no waypoints".to_string(),
                        }
                    })?;
                debug!(unit = %ctx.unit, index, "patrol resumes at nearest waypoint");
                self.travel(rig, index)
            }
            Stage::Travel { index, mut order } => match order.poll(rig.nav.as_ref(), ctx.dt) {
                MoveStatus::InProgress => Stage::Travel { index, order },
                MoveStatus::Arrived => {
                    self.last_reached = Some(index);
                    Stage::Dwell {
                        index,
                        timer: Countdown::new(self.config.dwell),
                    }
                }
                MoveStatus::Abandoned => {
                    debug!(unit = %ctx.unit, index, "waypoint unreachable, skipping");
                    self.travel(rig, self.next_index(index))
                }
            },
            Stage::Dwell { index, mut timer } => {
                if timer.tick(ctx.dt) {
                    self.travel(rig, self.next_index(index))
                } else {
                    Stage::Dwell { index, timer }
                }
            }
        };
        self.run = Some(next);
        Ok(Progress::Running)
    }

    fn reset(&mut self, _unit: UnitId, rig: &mut Rig) {
        if self.run.take().is_some() {
            rig.nav.stop();
        }
    }

    fn hard_reset(&mut self, unit: UnitId, rig: &mut Rig) {
        self.reset(unit, rig);
        self.last_reached = None;
    }

    fn is_running(&self) -> bool {
        self.run.is_some()
    }
}
