//! Behavior controller.
//!
//! Owns the per-unit decision state and the branch sets, and decides which
//! branch sequence runs. Every trigger (sensing, stun, phase, death) and the
//! scheduler tick go through the same lock, and each trigger is handled as
//! cancel-then-restart inside it.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};
use umbra_common::{ConfigError, ConfigResult, UnitId, Vec3};

use crate::branches::{BranchRole, BranchSet, Engagement, SequenceContext};
use crate::collab::{Rig, SoundCue, VisualState};
use crate::events::{EventBus, UnitEvent};
use crate::sensing::SensingListener;
use crate::sequence::{Countdown, Progress, SequenceToken};

/// Observable controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerState {
    /// Passive branch selected
    NoTarget,
    /// Aggressive branch selected
    TargetAcquired,
    /// Boss phase transition window; nothing runs
    Transitioning,
    /// Stunned; nothing runs
    Stunned,
    /// Terminal
    Dead,
}

/// Diagnostics view of a controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSnapshot {
    /// Current state
    pub state: ControllerState,
    /// Boss phase (0 for regular units)
    pub phase: usize,
    /// Held target
    pub target: Option<UnitId>,
    /// Where the last target was when it was lost
    pub last_known: Option<Vec3>,
    /// Role and token of the active sequence
    pub active: Option<(BranchRole, SequenceToken)>,
    /// Name of the branch running the active sequence
    pub active_branch: Option<&'static str>,
    /// Branches with a running sequence, across all sets
    pub running: usize,
    /// Aggressive sequences started
    pub aggressive_starts: u64,
    /// Passive sequences started
    pub passive_starts: u64,
    /// Branch faults recovered from
    pub faults: u64,
}

#[derive(Debug, Clone, Copy)]
struct ActiveSequence {
    token: SequenceToken,
    role: BranchRole,
    /// Branch set the sequence was started from
    set: usize,
    /// Engage delay still to wait before the first resume
    warmup: Option<Countdown>,
}

struct Core {
    unit: UnitId,
    target: Option<UnitId>,
    last_seen: Option<Vec3>,
    last_known: Option<Vec3>,
    phase: usize,
    transitioning: bool,
    stunned: bool,
    dead: bool,
    active: Option<ActiveSequence>,
    last_token: SequenceToken,
    branches: Vec<BranchSet>,
    rig: Rig,
    rng: fastrand::Rng,
    now: f64,
    engage_delay: f32,
    engaged_before: bool,
    aggressive_starts: u64,
    passive_starts: u64,
    faults: u64,
}

impl Core {
    fn state(&self) -> ControllerState {
        if self.dead {
            ControllerState::Dead
        } else if self.transitioning {
            ControllerState::Transitioning
        } else if self.stunned {
            ControllerState::Stunned
        } else if self.target.is_some() {
            ControllerState::TargetAcquired
        } else {
            ControllerState::NoTarget
        }
    }

    fn set_index(&self) -> usize {
        self.phase.min(self.branches.len().saturating_sub(1))
    }

    fn engagement(&self) -> Engagement {
        let live = self.target.and_then(|target| {
            self.rig
                .perception
                .position_of(target)
                .map(|position| (target, position))
        });
        match live {
            Some((unit, position)) => Engagement::Target { unit, position },
            None => Engagement::LastKnown(self.last_known),
        }
    }

    /// Drops the active sequence, if any.
    fn cancel(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        if let Some(set) = self.branches.get_mut(active.set) {
            set.get_mut(active.role).reset(self.unit, &mut self.rig);
        }
        trace!(unit = %self.unit, token = active.token.raw(), "sequence cancelled");
    }

    /// Cancels the active sequence and starts the one the state calls for.
    fn restart(&mut self) {
        self.cancel();
        if self.dead || self.transitioning || self.stunned {
            return;
        }
        let role = if self.target.is_some() {
            BranchRole::Aggressive
        } else {
            BranchRole::Passive
        };
        let engagement = self.engagement();
        let set = self.set_index();
        let warmup = (role == BranchRole::Aggressive
            && !self.engaged_before
            && self.engage_delay > 0.0)
            .then(|| Countdown::new(self.engage_delay));

        let Some(branches) = self.branches.get_mut(set) else {
            return;
        };
        let branch = branches.get_mut(role);
        branch.execute(&engagement, self.phase);

        self.last_token = self.last_token.next();
        let token = self.last_token;
        match role {
            BranchRole::Aggressive => {
                self.engaged_before = true;
                self.aggressive_starts += 1;
            }
            BranchRole::Passive => self.passive_starts += 1,
        }
        debug!(
            unit = %self.unit,
            branch = branch.name(),
            token = token.raw(),
            phase = self.phase,
            "sequence started"
        );
        self.active = Some(ActiveSequence {
            token,
            role,
            set,
            warmup,
        });
    }

    /// Handles the end of the sequence started under `token`.
    fn finish(&mut self, token: SequenceToken) {
        if self.active.map(|active| active.token) != Some(token) {
            trace!(unit = %self.unit, token = token.raw(), "stale completion ignored");
            return;
        }
        self.restart();
    }

    fn lose_target(&mut self) -> bool {
        let Some(target) = self.target.take() else {
            return false;
        };
        self.last_known = self
            .rig
            .perception
            .position_of(target)
            .or(self.last_seen.take());
        debug!(unit = %self.unit, %target, last_known = ?self.last_known, "target lost");
        self.restart();
        true
    }

    fn resume_active(&mut self, dt: f32) {
        if self.active.is_none() {
            self.restart();
        }
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if let Some(warmup) = active.warmup.as_mut() {
            if !warmup.tick(dt) {
                return;
            }
            active.warmup = None;
        }
        let ActiveSequence {
            token, role, set, ..
        } = *active;

        let engagement = self.engagement();
        if let Engagement::Target { position, .. } = engagement {
            self.last_seen = Some(position);
        }
        let Some(branches) = self.branches.get_mut(set) else {
            return;
        };
        let branch = branches.get_mut(role);
        let name = branch.name();
        let mut ctx = SequenceContext {
            unit: self.unit,
            dt,
            now: self.now,
            phase: self.phase,
            engagement,
            rig: &mut self.rig,
            rng: &mut self.rng,
        };
        match branch.resume(&mut ctx) {
            Ok(Progress::Running) => {}
            Ok(Progress::Completed) => {
                trace!(unit = %self.unit, branch = name, "sequence completed");
                self.finish(token);
            }
            Err(fault) => {
                warn!(unit = %self.unit, branch = name, %fault, "branch fault, restarting");
                self.faults += 1;
                if self.active.map(|active| active.token) == Some(token) {
                    self.restart();
                }
            }
        }
    }

    fn running(&self) -> usize {
        self.branches
            .iter()
            .map(|set| {
                usize::from(set.aggressive.is_running()) + usize::from(set.passive.is_running())
            })
            .sum()
    }
}

/// Per-unit behavior controller.
pub struct BehaviorController {
    unit: UnitId,
    core: Mutex<Core>,
    events: Arc<EventBus>,
}

impl BehaviorController {
    /// Creates a controller over one branch set per boss phase (a single set
    /// for regular enemies).
    pub fn new(
        unit: UnitId,
        rig: Rig,
        branches: Vec<BranchSet>,
        events: Arc<EventBus>,
    ) -> ConfigResult<Self> {
        if branches.is_empty() {
            return Err(ConfigError::NoPhases);
        }
        Ok(Self {
            unit,
            core: Mutex::new(Core {
                unit,
                target: None,
                last_seen: None,
                last_known: None,
                phase: 0,
                transitioning: false,
                stunned: false,
                dead: false,
                active: None,
                last_token: SequenceToken::new(0),
                branches,
                rig,
                rng: fastrand::Rng::with_seed(unit.raw()),
                now: 0.0,
                engage_delay: 0.0,
                engaged_before: false,
                aggressive_starts: 0,
                passive_starts: 0,
                faults: 0,
            }),
            events,
        })
    }

    /// Delay before the very first aggressive sequence may act.
    #[must_use]
    pub fn with_engage_delay(self, seconds: f32) -> Self {
        self.core.lock().engage_delay = seconds.max(0.0);
        self
    }

    /// Reseeds the unit random source.
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        self.core.lock().rng = fastrand::Rng::with_seed(seed);
        self
    }

    /// Unit this controller drives.
    #[must_use]
    pub fn unit(&self) -> UnitId {
        self.unit
    }

    /// Current state.
    pub fn state(&self) -> ControllerState {
        self.core.lock().state()
    }

    /// Current phase.
    pub fn phase(&self) -> usize {
        self.core.lock().phase
    }

    /// Runs `f` with the unit's collaborators under the controller lock.
    ///
    /// `f` must not call back into this controller.
    pub fn with_rig<R>(&self, f: impl FnOnce(&mut Rig) -> R) -> R {
        f(&mut self.core.lock().rig)
    }

    /// Advances the unit clock and resumes the active sequence.
    ///
    /// Returns `true` when the held target died or vanished and was dropped
    /// here rather than through [`SensingListener::on_lost_target`]; the
    /// sensor feeding this controller must then close its episode.
    pub fn tick(&self, dt: f32) -> bool {
        let mut core = self.core.lock();
        if core.dead {
            return false;
        }
        core.now += f64::from(dt);
        if core.stunned || core.transitioning {
            return false;
        }
        let mut dropped = false;
        if let Some(target) = core.target {
            let perception = &core.rig.perception;
            if !perception.is_alive(target) || perception.position_of(target).is_none() {
                warn!(unit = %self.unit, %target, "target vanished, treating it as lost");
                dropped = core.lose_target();
                if dropped {
                    self.events.publish(UnitEvent::TargetLost { unit: self.unit });
                }
            }
        }
        core.resume_active(dt);
        dropped
    }

    /// Stunned: cancel, start nothing. Repeated starts are no-ops.
    pub fn on_stun_start(&self) {
        let mut core = self.core.lock();
        if core.dead || core.stunned {
            return;
        }
        core.stunned = true;
        core.cancel();
        let unit = self.unit;
        core.rig.combat.set_stunned(unit, true);
        core.rig.nav.stop();
        core.rig.fx.set_visual(VisualState::Stunned);
        debug!(%unit, "stunned");
    }

    /// Stun over: resume with whichever branch the target state selects.
    pub fn on_stun_end(&self) {
        let mut core = self.core.lock();
        if core.dead || !core.stunned {
            return;
        }
        core.stunned = false;
        let unit = self.unit;
        core.rig.combat.set_stunned(unit, false);
        core.rig.fx.set_visual(VisualState::Normal);
        debug!(%unit, "stun ended");
        core.restart();
    }

    /// Boss entered the transition into `phase`.
    pub fn on_phase_transition_start(&self, phase: usize) {
        let mut core = self.core.lock();
        if core.dead {
            return;
        }
        core.transitioning = true;
        core.phase = core.phase.max(phase);
        core.cancel();
        core.rig.nav.stop();
        info!(unit = %self.unit, phase = core.phase, "phase transition started");
    }

    /// Transition window over: restart from the new phase's branch set.
    pub fn on_phase_transition_end(&self) {
        let mut core = self.core.lock();
        if core.dead || !core.transitioning {
            return;
        }
        core.transitioning = false;
        info!(unit = %self.unit, phase = core.phase, "phase transition ended");
        core.restart();
    }

    /// Unit died. Terminal; later triggers are ignored.
    pub fn on_death(&self) {
        let mut core = self.core.lock();
        if core.dead {
            return;
        }
        core.dead = true;
        core.cancel();
        core.rig.nav.stop();
        info!(unit = %self.unit, "behavior stopped, unit dead");
    }

    /// Cancels and restarts the current behavior from scratch.
    pub fn reset_behavior(&self) {
        let mut core = self.core.lock();
        if core.dead {
            return;
        }
        core.restart();
        self.events.publish(UnitEvent::BehaviorReset { unit: self.unit });
    }

    /// Back to the spawn state: hard-resets every branch and clears the
    /// target, last known location, stun, transition, phase and death.
    pub fn hard_reset(&self) {
        let mut core = self.core.lock();
        core.active = None;
        let unit = self.unit;
        let Core { branches, rig, .. } = &mut *core;
        for set in branches.iter_mut() {
            set.hard_reset_all(unit, rig);
        }
        if core.stunned {
            core.rig.combat.set_stunned(unit, false);
        }
        core.rig.nav.stop();
        core.rig.fx.set_visual(VisualState::Normal);
        core.target = None;
        core.last_seen = None;
        core.last_known = None;
        core.phase = 0;
        core.transitioning = false;
        core.stunned = false;
        core.dead = false;
        core.engaged_before = false;
        debug!(%unit, "controller hard reset");
    }

    /// Diagnostics.
    pub fn snapshot(&self) -> ControllerSnapshot {
        let core = self.core.lock();
        let active_branch = core.active.and_then(|active| {
            core.branches.get(active.set).map(|set| match active.role {
                BranchRole::Aggressive => set.aggressive.name(),
                BranchRole::Passive => set.passive.name(),
            })
        });
        ControllerSnapshot {
            state: core.state(),
            phase: core.phase,
            target: core.target,
            last_known: core.last_known,
            active: core.active.map(|active| (active.role, active.token)),
            active_branch,
            running: core.running(),
            aggressive_starts: core.aggressive_starts,
            passive_starts: core.passive_starts,
            faults: core.faults,
        }
    }
}

impl SensingListener for BehaviorController {
    fn on_sensed_target(&self, target: UnitId) {
        let mut core = self.core.lock();
        if core.dead {
            return;
        }
        core.target = Some(target);
        core.last_known = None;
        core.last_seen = core.rig.perception.position_of(target);
        core.rig.fx.play_sound(SoundCue::Alert);
        debug!(unit = %self.unit, %target, "target acquired");
        core.restart();
        self.events.publish(UnitEvent::TargetSensed {
            unit: self.unit,
            target,
        });
    }

    fn on_lost_target(&self) {
        let mut core = self.core.lock();
        if core.dead {
            return;
        }
        if core.lose_target() {
            self.events.publish(UnitEvent::TargetLost { unit: self.unit });
        }
    }
}

impl std::fmt::Debug for BehaviorController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorController")
            .field("unit", &self.unit)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::drain;
    use crate::testing::{test_rig, ProbeBranch, ProbeState, RigHandles, Shared};

    const UNIT: UnitId = UnitId::from_raw(1);
    const PLAYER: UnitId = UnitId::from_raw(2);

    struct Fixture {
        controller: BehaviorController,
        aggressive: Shared<ProbeState>,
        passive: Shared<ProbeState>,
        handles: RigHandles,
        events: crossbeam_channel::Receiver<UnitEvent>,
    }

    fn fixture() -> Fixture {
        let (rig, handles) = test_rig(Vec3::ZERO);
        handles
            .world
            .lock()
            .positions
            .insert(PLAYER, Vec3::new(5.0, 0.0, 0.0));
        let (aggressive, aggressive_state) =
            ProbeBranch::new("probe_aggressive", BranchRole::Aggressive);
        let (passive, passive_state) = ProbeBranch::new("probe_passive", BranchRole::Passive);
        let bus = Arc::new(EventBus::default());
        let events = bus.subscribe();
        let controller =
            BehaviorController::new(UNIT, rig, vec![BranchSet::new(aggressive, passive)], bus)
                .expect("one branch set");
        Fixture {
            controller,
            aggressive: aggressive_state,
            passive: passive_state,
            handles,
            events,
        }
    }

    #[test]
    fn test_first_tick_starts_passive() {
        let f = fixture();
        assert_eq!(f.controller.state(), ControllerState::NoTarget);
        f.controller.tick(0.1);

        assert!(f.passive.lock().running);
        assert_eq!(f.passive.lock().executes, 1);
        assert_eq!(f.passive.lock().resumes, 1);
        assert_eq!(f.controller.snapshot().running, 1);
    }

    #[test]
    fn test_sensed_lost_sensed_leaves_one_fresh_aggressive_sequence() {
        let f = fixture();
        f.controller.tick(0.1);
        let before = f.controller.snapshot().active.map(|(_, token)| token);

        f.controller.on_sensed_target(PLAYER);
        f.controller.on_lost_target();
        f.controller.on_sensed_target(PLAYER);

        let snapshot = f.controller.snapshot();
        assert_eq!(snapshot.state, ControllerState::TargetAcquired);
        assert_eq!(snapshot.running, 1);
        let (role, token) = snapshot.active.expect("active sequence");
        assert_eq!(role, BranchRole::Aggressive);
        assert!(Some(token) > before);
        assert_eq!(f.aggressive.lock().executes, 2);
        assert!(f.aggressive.lock().running);
        assert!(!f.passive.lock().running);

        let events = drain(&f.events);
        assert_eq!(
            events,
            vec![
                UnitEvent::TargetSensed {
                    unit: UNIT,
                    target: PLAYER
                },
                UnitEvent::TargetLost { unit: UNIT },
                UnitEvent::TargetSensed {
                    unit: UNIT,
                    target: PLAYER
                },
            ]
        );
    }

    #[test]
    fn test_lost_target_records_last_known_location() {
        let f = fixture();
        f.controller.on_sensed_target(PLAYER);
        f.controller.tick(0.1);
        f.handles
            .world
            .lock()
            .positions
            .insert(PLAYER, Vec3::new(7.0, 0.0, 1.0));
        f.controller.on_lost_target();

        let snapshot = f.controller.snapshot();
        assert_eq!(snapshot.state, ControllerState::NoTarget);
        assert_eq!(snapshot.last_known, Some(Vec3::new(7.0, 0.0, 1.0)));
        assert_eq!(
            f.passive.lock().last_engagement,
            Some(Engagement::LastKnown(Some(Vec3::new(7.0, 0.0, 1.0))))
        );
    }

    #[test]
    fn test_double_stun_needs_single_end() {
        let f = fixture();
        f.controller.on_sensed_target(PLAYER);
        f.controller.tick(0.1);

        f.controller.on_stun_start();
        f.controller.on_stun_start();
        assert_eq!(f.controller.state(), ControllerState::Stunned);
        assert_eq!(f.aggressive.lock().resets, 1);
        assert_eq!(f.controller.snapshot().running, 0);
        assert!(f.handles.combat.lock().stunned.contains(&UNIT));

        let resumes = f.aggressive.lock().resumes;
        f.controller.tick(0.1);
        assert_eq!(f.aggressive.lock().resumes, resumes);

        f.controller.on_stun_end();
        assert_eq!(f.controller.state(), ControllerState::TargetAcquired);
        assert!(f.aggressive.lock().running);
        assert!(f.handles.combat.lock().stunned.is_empty());
        f.controller.on_stun_end();
        assert_eq!(f.aggressive.lock().executes, 2);
    }

    #[test]
    fn test_branch_fault_restarts_cleanly() {
        let f = fixture();
        f.controller.on_sensed_target(PLAYER);
        f.aggressive.lock().fail_next = true;
        f.controller.tick(0.1);

        let snapshot = f.controller.snapshot();
        assert_eq!(snapshot.faults, 1);
        assert_eq!(snapshot.state, ControllerState::TargetAcquired);
        assert_eq!(f.aggressive.lock().resets, 1);
        assert_eq!(f.aggressive.lock().executes, 2);
        assert!(f.aggressive.lock().running);
    }

    #[test]
    fn test_completed_sequence_loops() {
        let f = fixture();
        f.controller.tick(0.1);
        f.passive.lock().complete_next = true;
        f.controller.tick(0.1);

        assert_eq!(f.passive.lock().executes, 2);
        assert!(f.passive.lock().running);
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let f = fixture();
        f.controller.tick(0.1);
        let stale = f.controller.snapshot().active.map(|(_, token)| token);
        f.controller.reset_behavior();

        f.controller
            .core
            .lock()
            .finish(stale.expect("first sequence"));
        assert_eq!(f.passive.lock().executes, 2);
        assert_eq!(
            drain(&f.events),
            vec![UnitEvent::BehaviorReset { unit: UNIT }]
        );
    }

    #[test]
    fn test_vanished_target_is_treated_as_lost() {
        let f = fixture();
        f.controller.on_sensed_target(PLAYER);
        f.controller.tick(0.1);
        f.handles.world.lock().dead.insert(PLAYER);

        assert!(f.controller.tick(0.1));
        let snapshot = f.controller.snapshot();
        assert_eq!(snapshot.state, ControllerState::NoTarget);
        assert_eq!(snapshot.last_known, Some(Vec3::new(5.0, 0.0, 0.0)));
        assert!(!f.controller.tick(0.1));
        assert!(f.passive.lock().running);
        assert!(!f.aggressive.lock().running);
    }

    #[test]
    fn test_death_is_terminal() {
        let f = fixture();
        f.controller.on_sensed_target(PLAYER);
        f.controller.tick(0.1);
        f.controller.on_death();

        f.controller.on_lost_target();
        f.controller.on_sensed_target(PLAYER);
        f.controller.on_stun_end();
        f.controller.tick(0.1);

        assert_eq!(f.controller.state(), ControllerState::Dead);
        assert_eq!(f.controller.snapshot().running, 0);
        assert_eq!(f.aggressive.lock().executes, 1);
    }

    #[test]
    fn test_engage_delay_applies_once() {
        let f = fixture();
        let controller = f.controller.with_engage_delay(0.3);
        controller.on_sensed_target(PLAYER);
        controller.tick(0.1);
        controller.tick(0.1);
        assert_eq!(f.aggressive.lock().resumes, 0);

        for _ in 0..3 {
            controller.tick(0.1);
        }
        assert!(f.aggressive.lock().resumes > 0);

        controller.on_lost_target();
        controller.on_sensed_target(PLAYER);
        let resumes = f.aggressive.lock().resumes;
        controller.tick(0.1);
        assert_eq!(f.aggressive.lock().resumes, resumes + 1);
    }

    #[test]
    fn test_phase_transition_swaps_branch_set() {
        let (rig, handles) = test_rig(Vec3::ZERO);
        handles.world.lock().positions.insert(PLAYER, Vec3::X);
        let (first, first_state) = ProbeBranch::new("first", BranchRole::Aggressive);
        let (second, second_state) = ProbeBranch::new("second", BranchRole::Aggressive);
        let (idle_a, _) = ProbeBranch::new("idle_a", BranchRole::Passive);
        let (idle_b, _) = ProbeBranch::new("idle_b", BranchRole::Passive);
        let controller = BehaviorController::new(
            UNIT,
            rig,
            vec![BranchSet::new(first, idle_a), BranchSet::new(second, idle_b)],
            Arc::new(EventBus::default()),
        )
        .expect("two branch sets");

        controller.on_sensed_target(PLAYER);
        controller.tick(0.1);
        controller.on_phase_transition_start(1);
        assert_eq!(controller.state(), ControllerState::Transitioning);
        assert_eq!(controller.snapshot().running, 0);

        controller.on_sensed_target(PLAYER);
        assert_eq!(controller.snapshot().running, 0);

        controller.on_phase_transition_end();
        assert_eq!(controller.state(), ControllerState::TargetAcquired);
        assert_eq!(controller.phase(), 1);
        assert!(second_state.lock().running);
        assert_eq!(second_state.lock().last_phase, 1);
        assert!(!first_state.lock().running);

        // Phases past the last set reuse it.
        controller.on_phase_transition_start(4);
        controller.on_phase_transition_end();
        assert_eq!(controller.snapshot().active_branch, Some("second"));
    }

    #[test]
    fn test_hard_reset_returns_to_spawn_state() {
        let f = fixture();
        f.controller.on_sensed_target(PLAYER);
        f.controller.tick(0.1);
        f.controller.on_stun_start();

        f.controller.hard_reset();
        let snapshot = f.controller.snapshot();
        assert_eq!(snapshot.state, ControllerState::NoTarget);
        assert_eq!(snapshot.target, None);
        assert_eq!(snapshot.running, 0);
        assert_eq!(f.aggressive.lock().hard_resets, 1);
        assert!(f.handles.combat.lock().stunned.is_empty());

        f.controller.tick(0.1);
        assert!(f.passive.lock().running);
    }

    #[test]
    fn test_requires_a_branch_set() {
        let (rig, _handles) = test_rig(Vec3::ZERO);
        let result = BehaviorController::new(UNIT, rig, Vec::new(), Arc::new(EventBus::default()));
        assert!(matches!(result, Err(ConfigError::NoPhases)));
    }
}
