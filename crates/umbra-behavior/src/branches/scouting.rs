//! Scouting after a lost target.
//!
//! Walks to where the target was last seen, sweeps its facing around for a
//! while, then hands over to an inner passive branch (patrol or hold). With no
//! last known location it goes straight to the inner branch.

use serde::{Deserialize, Serialize};
use tracing::debug;
use umbra_common::{ConfigError, ConfigResult, UnitId, Vec3};

use super::{Branch, BranchRole, Engagement, PassiveConfig, SequenceContext};
use crate::collab::Rig;
use crate::sequence::{BranchFault, Countdown, MoveOrder, MoveStatus, Progress};

const NAME: &str = "scout";

/// Scouting tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    /// Seconds spent looking around at the last known location
    pub scan_duration: f32,
    /// Seconds between facing changes while scanning
    pub scan_step: f32,
    /// Distance at which the last known location counts as reached
    pub tolerance: f32,
    /// Seconds before the walk there is abandoned
    pub move_timeout: f32,
    /// Branch taking over once scouting is done
    pub then: Box<PassiveConfig>,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            scan_duration: 3.0,
            scan_step: 0.75,
            tolerance: 1.0,
            move_timeout: 6.0,
            then: Box::default(),
        }
    }
}

impl ScoutConfig {
    /// Checks the tuning and the inner branch.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.scan_duration < 0.0 || self.tolerance < 0.0 || self.move_timeout < 0.0 {
            return Err(ConfigError::invalid(
                "scan_duration/tolerance/move_timeout",
                "must be >= 0",
            ));
        }
        if !(self.scan_step > 0.0) {
            return Err(ConfigError::invalid("scan_step", "must be > 0"));
        }
        if matches!(*self.then, PassiveConfig::Scout(_)) {
            return Err(ConfigError::invalid(
                "then",
                "scouting cannot hand over to another scout",
            ));
        }
        self.then.validate()
    }
}

/// Where a scouting sequence is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoutStage {
    /// Walking to the last known location
    Investigating,
    /// Looking around
    Scanning,
    /// Inner branch running
    Fallback,
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Start,
    Investigating(MoveOrder),
    Scanning {
        timer: Countdown,
        step: Countdown,
        heading: Vec3,
    },
    Fallback,
}

/// Scouting branch wrapping an inner passive branch.
#[derive(Debug)]
pub struct Scout {
    config: ScoutConfig,
    run: Option<Stage>,
    inner: Box<dyn Branch>,
}

impl Scout {
    /// Creates the branch and its inner fallback.
    pub fn new(config: ScoutConfig) -> ConfigResult<Self> {
        config.validate()?;
        let inner = config.then.build()?;
        Ok(Self {
            config,
            run: None,
            inner,
        })
    }

    /// Stage of the running sequence.
    #[must_use]
    pub fn stage(&self) -> Option<ScoutStage> {
        match self.run? {
            Stage::Start | Stage::Investigating(_) => Some(ScoutStage::Investigating),
            Stage::Scanning { .. } => Some(ScoutStage::Scanning),
            Stage::Fallback => Some(ScoutStage::Fallback),
        }
    }

    fn scanning(&self, heading: Vec3) -> Stage {
        Stage::Scanning {
            timer: Countdown::new(self.config.scan_duration),
            step: Countdown::new(self.config.scan_step),
            heading,
        }
    }

    fn fall_back(&mut self, ctx: &SequenceContext<'_>) -> Stage {
        debug!(unit = %ctx.unit, inner = self.inner.name(), "scouting done");
        self.inner.execute(&ctx.engagement, ctx.phase);
        Stage::Fallback
    }
}

impl Branch for Scout {
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

        let next = match stage {
            Stage::Start => match ctx.engagement.last_known() {
                Some(location) => Stage::Investigating(MoveOrder::issue(
                    ctx.rig.nav.as_mut(),
                    location,
                    self.config.tolerance,
                    self.config.move_timeout,
                )),
                None => self.fall_back(ctx),
            },
            Stage::Investigating(mut order) => {
                match order.poll(ctx.rig.nav.as_ref(), ctx.dt) {
                    MoveStatus::InProgress => Stage::Investigating(order),
                    MoveStatus::Arrived | MoveStatus::Abandoned => {
                        ctx.rig.nav.stop();
                        self.scanning(Vec3::X)
                    }
                }
            }
            Stage::Scanning {
                mut timer,
                mut step,
                mut heading,
            } => {
                if timer.tick(ctx.dt) {
                    self.fall_back(ctx)
                } else {
                    if step.tick(ctx.dt) {
                        // Quarter turn each step.
                        heading = Vec3::new(-heading.z, 0.0, heading.x);
                        let position = ctx.rig.nav.position();
                        ctx.rig.nav.face_towards(position + heading);
                        step.restart();
                    }
                    Stage::Scanning {
                        timer,
                        step,
                        heading,
                    }
                }
            }
            Stage::Fallback => {
                if self.inner.resume(ctx)? == Progress::Completed {
                    self.run = None;
                    return Ok(Progress::Completed);
                }
                Stage::Fallback
            }
        };
        self.run = Some(next);
        Ok(Progress::Running)
    }

    fn reset(&mut self, unit: UnitId, rig: &mut Rig) {
        if matches!(self.run.take(), Some(Stage::Investigating(_))) {
            rig.nav.stop();
        }
        self.inner.reset(unit, rig);
    }

    fn hard_reset(&mut self, unit: UnitId, rig: &mut Rig) {
        self.reset(unit, rig);
        self.inner.hard_reset(unit, rig);
    }

    fn is_running(&self) -> bool {
        self.run.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branches::{HoldConfig, PatrolConfig};
    use crate::testing::{advance, resume, test_rig};

    fn config(then: PassiveConfig) -> ScoutConfig {
        ScoutConfig {
            scan_duration: 1.0,
            scan_step: 0.25,
            tolerance: 0.5,
            move_timeout: 5.0,
            then: Box::new(then),
        }
    }

    #[test]
    fn test_investigate_scan_then_hold() {
        let unit = UnitId::from_raw(1);
        let last_seen = Vec3::new(5.0, 0.0, 0.0);
        let lost = Engagement::LastKnown(Some(last_seen));
        let (mut rig, handles) = test_rig(Vec3::ZERO);
        let mut scout =
            Scout::new(config(PassiveConfig::Hold(HoldConfig::default()))).expect("valid config");

        scout.execute(&lost, 0);
        resume(&mut scout, &mut rig, unit, lost, 0, 0.1, 0.0).expect("start");
        assert_eq!(handles.nav.lock().requests, vec![last_seen]);

        for _ in 0..30 {
            advance(&handles.nav, 0.1);
            resume(&mut scout, &mut rig, unit, lost, 0, 0.1, 0.0).expect("walk");
            if scout.stage() == Some(ScoutStage::Scanning) {
                break;
            }
        }
        assert_eq!(scout.stage(), Some(ScoutStage::Scanning));

        for _ in 0..15 {
            resume(&mut scout, &mut rig, unit, lost, 0, 0.1, 0.0).expect("scan");
        }
        assert_eq!(scout.stage(), Some(ScoutStage::Fallback));
        assert!(handles.nav.lock().facing.is_some());
        // Hold takes the scouting spot as its post.
        assert_eq!(handles.nav.lock().requests.len(), 1);
    }

    #[test]
    fn test_without_last_known_goes_to_patrol() {
        let unit = UnitId::from_raw(1);
        let nowhere = Engagement::LastKnown(None);
        let waypoint = Vec3::new(0.0, 0.0, 8.0);
        let (mut rig, handles) = test_rig(Vec3::ZERO);
        let mut scout = Scout::new(config(PassiveConfig::Patrol(PatrolConfig {
            waypoints: vec![waypoint],
            ..PatrolConfig::default()
        })))
        .expect("valid config");

        scout.execute(&nowhere, 0);
        resume(&mut scout, &mut rig, unit, nowhere, 0, 0.1, 0.0).expect("start");
        assert_eq!(scout.stage(), Some(ScoutStage::Fallback));
        resume(&mut scout, &mut rig, unit, nowhere, 0, 0.1, 0.0).expect("patrol");
        assert_eq!(handles.nav.lock().requests, vec![waypoint]);
    }

    #[test]
    fn test_reset_resets_inner_branch() {
        let unit = UnitId::from_raw(1);
        let nowhere = Engagement::LastKnown(None);
        let (mut rig, _handles) = test_rig(Vec3::ZERO);
        let mut scout =
            Scout::new(config(PassiveConfig::Hold(HoldConfig::default()))).expect("valid config");

        scout.execute(&nowhere, 0);
        resume(&mut scout, &mut rig, unit, nowhere, 0, 0.1, 0.0).expect("start");
        assert!(scout.inner.is_running());

        scout.reset(unit, &mut rig);
        assert!(!scout.is_running());
        assert!(!scout.inner.is_running());
    }

    #[test]
    fn test_nested_scout_rejected() {
        let nested = config(PassiveConfig::Scout(ScoutConfig::default()));
        assert!(Scout::new(nested).is_err());
    }
}
