//! Unit assembly.
//!
//! A [`Unit`] bundles everything one enemy or boss needs: its sensor, its
//! behavior controller and its vitals, all built from a [`UnitProfile`]. The
//! scheduler only ever talks to units.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};
use umbra_common::{ConfigResult, UnitId};

use crate::boss::BossStatus;
use crate::collab::Rig;
use crate::controller::{BehaviorController, ControllerSnapshot, ControllerState};
use crate::events::{EventBus, UnitEvent};
use crate::profile::UnitProfile;
use crate::sensing::{SignalQueue, TargetSensor};
use crate::status::UnitStatus;

/// Health bookkeeping of a unit, regular or boss.
#[derive(Debug)]
pub enum UnitVitals {
    /// Regular enemy
    Regular(UnitStatus),
    /// Boss with phases
    Boss(BossStatus),
}

impl UnitVitals {
    fn apply_damage(&self, amount: f32) -> bool {
        match self {
            Self::Regular(status) => status.apply_damage(amount),
            Self::Boss(status) => status.apply_damage(amount),
        }
    }

    fn stun(&self, seconds: f32) {
        match self {
            Self::Regular(status) => status.stun(seconds),
            Self::Boss(status) => status.stun(seconds),
        }
    }

    fn tick(&self, dt: f32) {
        match self {
            Self::Regular(status) => status.tick(dt),
            Self::Boss(status) => status.tick(dt),
        }
    }

    fn restore(&self) {
        match self {
            Self::Regular(status) => status.restore(),
            Self::Boss(status) => status.restore(),
        }
    }

    fn health(&self) -> f32 {
        match self {
            Self::Regular(status) => status.vitals().health(),
            Self::Boss(status) => status.vitals().vitals().health(),
        }
    }

    fn is_dead(&self) -> bool {
        match self {
            Self::Regular(status) => status.vitals().is_dead(),
            Self::Boss(status) => status.vitals().vitals().is_dead(),
        }
    }
}

/// One enemy or boss.
#[derive(Debug)]
pub struct Unit {
    id: UnitId,
    name: String,
    sensor: Mutex<TargetSensor>,
    controller: Arc<BehaviorController>,
    vitals: UnitVitals,
    events: Arc<EventBus>,
    despawned: AtomicBool,
}

impl Unit {
    /// Builds a unit that senses whichever unit enters its volume first.
    pub fn spawn(
        id: UnitId,
        profile: &UnitProfile,
        rig: Rig,
        events: Arc<EventBus>,
    ) -> ConfigResult<Self> {
        let sensor = TargetSensor::vision(profile.sensor.clone())?;
        Self::assemble(id, profile, rig, sensor, events)
    }

    /// Builds a unit that only ever senses `target`.
    pub fn spawn_tracking(
        id: UnitId,
        profile: &UnitProfile,
        rig: Rig,
        target: UnitId,
        events: Arc<EventBus>,
    ) -> ConfigResult<Self> {
        let sensor = TargetSensor::tracking(target, profile.sensor.clone())?;
        Self::assemble(id, profile, rig, sensor, events)
    }

    fn assemble(
        id: UnitId,
        profile: &UnitProfile,
        mut rig: Rig,
        sensor: TargetSensor,
        events: Arc<EventBus>,
    ) -> ConfigResult<Self> {
        profile.validate()?;
        rig.nav.set_speed(profile.move_speed);

        let mut controller =
            BehaviorController::new(id, rig, profile.branch_sets()?, events.clone())?
                .with_engage_delay(profile.engage_delay);
        if let Some(seed) = profile.seed {
            controller = controller.with_seed(seed);
        }
        let controller = Arc::new(controller);

        let vitals = match &profile.boss {
            Some(boss) => UnitVitals::Boss(BossStatus::new(
                profile.max_health,
                boss,
                controller.clone(),
                events.clone(),
            )?),
            None => {
                let status =
                    UnitStatus::new(profile.max_health, controller.clone(), events.clone())?;
                UnitVitals::Regular(match profile.loot {
                    Some(tier) => status.with_loot(tier),
                    None => status,
                })
            }
        };

        info!(
            unit = %id,
            name = %profile.name,
            boss = profile.is_boss(),
            "unit spawned"
        );
        Ok(Self {
            id,
            name: profile.name.clone(),
            sensor: Mutex::new(sensor),
            controller,
            vitals,
            events,
            despawned: AtomicBool::new(false),
        })
    }

    /// Unit id.
    #[must_use]
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Profile name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// One simulation step: sensing, then vitals timers, then behavior.
    pub fn tick(&self, dt: f32) {
        if self.is_despawned() {
            return;
        }

        // Sensing callbacks re-enter the controller, so they are queued while
        // the rig is borrowed and delivered once its lock is released.
        let signals = SignalQueue::default();
        {
            let mut sensor = self.sensor.lock();
            self.controller.with_rig(|rig| {
                let origin = rig.nav.position();
                sensor.tick(dt, origin, rig.perception.as_ref(), &signals);
            });
        }
        signals.deliver(self.controller.as_ref());

        self.vitals.tick(dt);
        if self.controller.tick(dt) {
            // Target dropped without the sensor noticing; reopen sensing so
            // the next sighting is reported again.
            self.sensor.lock().forget();
        }
    }

    /// Applies damage. Returns whether it was accepted.
    pub fn apply_damage(&self, amount: f32) -> bool {
        self.vitals.apply_damage(amount)
    }

    /// Stuns the unit.
    pub fn stun(&self, seconds: f32) {
        self.vitals.stun(seconds);
    }

    /// Detection volume enter notification.
    pub fn on_volume_enter(&self, other: UnitId) {
        self.sensor.lock().on_volume_enter(other);
    }

    /// Detection volume exit notification.
    pub fn on_volume_exit(&self, other: UnitId) {
        self.sensor.lock().on_volume_exit(other);
    }

    /// Puts the unit back in its spawn state: full health, phase 0, no
    /// target, every branch hard-reset.
    pub fn reset_encounter(&self) {
        self.controller.hard_reset();
        self.vitals.restore();
        self.sensor.lock().forget();
        self.despawned.store(false, Ordering::Release);
        debug!(unit = %self.id, "encounter reset");
        self.events.publish(UnitEvent::EnemyReset { unit: self.id });
    }

    /// Marks the unit for removal by the scheduler.
    pub fn despawn(&self) {
        if !self.despawned.swap(true, Ordering::AcqRel) {
            debug!(unit = %self.id, "unit despawned");
        }
    }

    /// Whether the unit was despawned.
    #[must_use]
    pub fn is_despawned(&self) -> bool {
        self.despawned.load(Ordering::Acquire)
    }

    /// Whether the unit is dead.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.vitals.is_dead()
    }

    /// Current health.
    #[must_use]
    pub fn health(&self) -> f32 {
        self.vitals.health()
    }

    /// Current phase (always 0 for regular enemies).
    #[must_use]
    pub fn phase(&self) -> usize {
        self.controller.phase()
    }

    /// Controller state.
    #[must_use]
    pub fn state(&self) -> ControllerState {
        self.controller.state()
    }

    /// Controller diagnostics.
    #[must_use]
    pub fn snapshot(&self) -> ControllerSnapshot {
        self.controller.snapshot()
    }

    /// The unit's controller.
    #[must_use]
    pub fn controller(&self) -> &Arc<BehaviorController> {
        &self.controller
    }

    /// Vitals of the unit.
    #[must_use]
    pub fn vitals(&self) -> &UnitVitals {
        &self.vitals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boss::BossConfig;
    use crate::collab::LootTier;
    use crate::events::drain;
    use crate::testing::{test_rig, RigHandles};
    use umbra_common::Vec3;

    const ENEMY: UnitId = UnitId::from_raw(10);
    const PLAYER: UnitId = UnitId::from_raw(1);

    fn spawn(profile: &UnitProfile) -> (Unit, RigHandles, Arc<EventBus>) {
        let (rig, handles) = test_rig(Vec3::ZERO);
        handles
            .world
            .lock()
            .positions
            .insert(PLAYER, Vec3::new(4.0, 0.0, 0.0));
        let bus = Arc::new(EventBus::default());
        let unit = Unit::spawn(ENEMY, profile, rig, bus.clone()).expect("valid profile");
        (unit, handles, bus)
    }

    #[test]
    fn test_spawn_applies_move_speed() {
        let profile = UnitProfile {
            move_speed: 2.25,
            ..UnitProfile::default()
        };
        let (unit, handles, _bus) = spawn(&profile);
        assert_eq!(handles.nav.lock().speed, 2.25);
        assert_eq!(unit.name(), "enemy");
        assert_eq!(unit.state(), ControllerState::NoTarget);
    }

    #[test]
    fn test_volume_enter_leads_to_aggression() {
        let (unit, _handles, bus) = spawn(&UnitProfile::default());
        let events = bus.subscribe();

        unit.tick(0.1);
        assert_eq!(unit.state(), ControllerState::NoTarget);

        unit.on_volume_enter(PLAYER);
        unit.tick(0.1);
        assert_eq!(unit.state(), ControllerState::TargetAcquired);
        assert_eq!(unit.snapshot().target, Some(PLAYER));
        assert_eq!(
            drain(&events),
            vec![UnitEvent::TargetSensed {
                unit: ENEMY,
                target: PLAYER
            }]
        );
    }

    #[test]
    fn test_leaving_volume_loses_target_after_forget_delay() {
        let (unit, _handles, _bus) = spawn(&UnitProfile::default());
        unit.on_volume_enter(PLAYER);
        unit.tick(0.1);
        unit.on_volume_exit(PLAYER);

        unit.tick(1.0);
        assert_eq!(unit.state(), ControllerState::TargetAcquired);
        unit.tick(1.5);
        assert_eq!(unit.state(), ControllerState::NoTarget);
        assert_eq!(unit.snapshot().last_known, Some(Vec3::new(4.0, 0.0, 0.0)));
    }

    #[test]
    fn test_revived_target_is_sensed_again() {
        let (unit, handles, bus) = spawn(&UnitProfile::default());
        let events = bus.subscribe();
        unit.on_volume_enter(PLAYER);
        unit.tick(0.1);
        assert_eq!(unit.state(), ControllerState::TargetAcquired);

        handles.world.lock().dead.insert(PLAYER);
        unit.tick(0.1);
        assert_eq!(unit.state(), ControllerState::NoTarget);

        handles.world.lock().dead.remove(&PLAYER);
        for _ in 0..5 {
            unit.tick(0.1);
        }
        assert_eq!(unit.state(), ControllerState::TargetAcquired);
        assert_eq!(
            drain(&events),
            vec![
                UnitEvent::TargetSensed {
                    unit: ENEMY,
                    target: PLAYER
                },
                UnitEvent::TargetLost { unit: ENEMY },
                UnitEvent::TargetSensed {
                    unit: ENEMY,
                    target: PLAYER
                },
            ]
        );
    }

    #[test]
    fn test_regular_death_drops_profile_loot() {
        let (unit, handles, _bus) = spawn(&UnitProfile::default());
        assert!(unit.apply_damage(150.0));
        assert!(unit.is_dead());
        assert_eq!(unit.state(), ControllerState::Dead);
        assert_eq!(handles.combat.lock().loot, vec![(ENEMY, LootTier::Common)]);
    }

    #[test]
    fn test_boss_phase_window_opens_and_closes() {
        let profile = UnitProfile {
            name: "warden".to_string(),
            boss: Some(BossConfig::default()),
            ..UnitProfile::default()
        };
        let (unit, _handles, bus) = spawn(&profile);
        let events = bus.subscribe();

        assert!(unit.apply_damage(50.0));
        assert_eq!(unit.state(), ControllerState::Transitioning);
        assert_eq!(unit.phase(), 1);
        assert!(!unit.apply_damage(10.0));
        assert_eq!(unit.health(), 50.0);

        for _ in 0..30 {
            unit.tick(0.1);
        }
        assert_eq!(unit.state(), ControllerState::NoTarget);
        assert_eq!(
            drain(&events),
            vec![
                UnitEvent::PhaseTransitionStarted {
                    unit: ENEMY,
                    phase: 1
                },
                UnitEvent::PhaseTransitionEnded {
                    unit: ENEMY,
                    phase: 1
                },
            ]
        );
    }

    #[test]
    fn test_reset_encounter_restores_spawn_state() {
        let profile = UnitProfile {
            boss: Some(BossConfig::default()),
            ..UnitProfile::default()
        };
        let (unit, _handles, bus) = spawn(&profile);
        unit.on_volume_enter(PLAYER);
        unit.tick(0.1);
        unit.apply_damage(60.0);
        let events = bus.subscribe();

        unit.reset_encounter();
        assert_eq!(unit.health(), 100.0);
        assert_eq!(unit.phase(), 0);
        assert_eq!(unit.state(), ControllerState::NoTarget);
        assert_eq!(drain(&events), vec![UnitEvent::EnemyReset { unit: ENEMY }]);

        // The player is still in the volume, so it is sensed again.
        unit.tick(0.1);
        assert_eq!(unit.state(), ControllerState::TargetAcquired);
    }

    #[test]
    fn test_tracking_sensor_ignores_other_units() {
        let (rig, handles) = test_rig(Vec3::ZERO);
        let stranger = UnitId::from_raw(99);
        handles.world.lock().positions.insert(stranger, Vec3::X);
        let unit = Unit::spawn_tracking(
            ENEMY,
            &UnitProfile::default(),
            rig,
            PLAYER,
            Arc::new(EventBus::default()),
        )
        .expect("valid profile");

        unit.on_volume_enter(stranger);
        unit.tick(0.1);
        assert_eq!(unit.state(), ControllerState::NoTarget);
    }

    #[test]
    fn test_despawned_unit_stops_ticking() {
        let (unit, _handles, _bus) = spawn(&UnitProfile::default());
        unit.despawn();
        unit.on_volume_enter(PLAYER);
        unit.tick(0.1);
        assert!(unit.is_despawned());
        assert_eq!(unit.state(), ControllerState::NoTarget);
        assert_eq!(unit.snapshot().passive_starts, 0);
    }
}
