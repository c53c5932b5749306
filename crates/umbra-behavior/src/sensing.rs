//! Target sensing.
//!
//! A [`TargetSensor`] re-evaluates "is the tracked candidate visible?" on a
//! fixed tick: the candidate must be inside the detection volume, alive, and
//! (optionally) in line of sight. Acquisition is reported once; losing sight
//! only reports after a forget delay, and regaining sight during that delay
//! cancels it silently.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use umbra_common::{ConfigError, ConfigResult, UnitId, Vec3};

use crate::collab::Perception;
use crate::sequence::Countdown;

/// Receives acquisition episodes from a sensor.
pub trait SensingListener: Send + Sync {
    /// A target became visible.
    fn on_sensed_target(&self, target: UnitId);
    /// The sensed target stayed out of sight for the whole forget delay.
    fn on_lost_target(&self);
}

/// A sensing callback captured for later delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensingSignal {
    /// [`SensingListener::on_sensed_target`]
    Sensed(UnitId),
    /// [`SensingListener::on_lost_target`]
    Lost,
}

/// Listener that buffers signals, so a sensor can be ticked while the
/// receiving controller's lock is held and the signals delivered after.
#[derive(Debug, Default)]
pub struct SignalQueue(Mutex<Vec<SensingSignal>>);

impl SignalQueue {
    /// Takes every buffered signal, oldest first.
    pub fn drain(&self) -> Vec<SensingSignal> {
        std::mem::take(&mut *self.0.lock())
    }

    /// Delivers buffered signals to `listener` in order.
    pub fn deliver(&self, listener: &dyn SensingListener) {
        for signal in self.drain() {
            match signal {
                SensingSignal::Sensed(target) => listener.on_sensed_target(target),
                SensingSignal::Lost => listener.on_lost_target(),
            }
        }
    }
}

impl SensingListener for SignalQueue {
    fn on_sensed_target(&self, target: UnitId) {
        self.0.lock().push(SensingSignal::Sensed(target));
    }

    fn on_lost_target(&self) {
        self.0.lock().push(SensingSignal::Lost);
    }
}

/// Sensor tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Seconds a target must stay unseen before it is lost
    pub forget_after: f32,
    /// Seconds between visibility evaluations
    pub tick_interval: f32,
    /// Whether occlusion blocks sensing
    pub require_line_of_sight: bool,
    /// Height of the eye above the unit origin
    pub eye_height: f32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            forget_after: 2.0,
            tick_interval: 0.1,
            require_line_of_sight: true,
            eye_height: 1.6,
        }
    }
}

impl SensorConfig {
    /// Checks the tuning values.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.forget_after >= 0.0) {
            return Err(ConfigError::invalid("forget_after", "must be >= 0"));
        }
        if !(self.tick_interval > 0.0) {
            return Err(ConfigError::invalid("tick_interval", "must be > 0"));
        }
        Ok(())
    }
}

/// Debounced visibility tracker for one unit.
#[derive(Debug, Clone)]
pub struct TargetSensor {
    config: SensorConfig,
    /// Only this unit may ever be sensed (boss sensing)
    fixed_target: Option<UnitId>,
    /// Unit currently inside the detection volume
    candidate: Option<UnitId>,
    /// Target of the open acquisition episode
    sensed: Option<UnitId>,
    /// Forget delay, running while the sensed target is out of sight
    forget: Option<Countdown>,
    accumulator: f32,
}

impl TargetSensor {
    /// Sensor that accepts whichever unit enters its volume first.
    pub fn vision(config: SensorConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            fixed_target: None,
            candidate: None,
            sensed: None,
            forget: None,
            accumulator: 0.0,
        })
    }

    /// Sensor observing one fixed target.
    pub fn tracking(target: UnitId, config: SensorConfig) -> ConfigResult<Self> {
        if !target.is_valid() {
            return Err(ConfigError::MissingCollaborator("sensing target"));
        }
        let mut sensor = Self::vision(config)?;
        sensor.fixed_target = Some(target);
        Ok(sensor)
    }

    /// Detection volume enter notification.
    pub fn on_volume_enter(&mut self, unit: UnitId) {
        if self.fixed_target.is_some_and(|t| t != unit) {
            return;
        }
        if self.candidate.is_none() {
            self.candidate = Some(unit);
        }
    }

    /// Detection volume exit notification.
    pub fn on_volume_exit(&mut self, unit: UnitId) {
        if self.candidate == Some(unit) {
            self.candidate = None;
        }
    }

    /// Advances the sensor clock and evaluates visibility on each elapsed tick.
    pub fn tick(
        &mut self,
        dt: f32,
        origin: Vec3,
        perception: &dyn Perception,
        listener: &dyn SensingListener,
    ) {
        self.accumulator += dt.max(0.0);
        while self.accumulator >= self.config.tick_interval {
            self.accumulator -= self.config.tick_interval;
            self.evaluate(self.config.tick_interval, origin, perception, listener);
        }
    }

    fn evaluate(
        &mut self,
        step: f32,
        origin: Vec3,
        perception: &dyn Perception,
        listener: &dyn SensingListener,
    ) {
        match self.sensed {
            None => {
                let Some(candidate) = self.candidate else {
                    return;
                };
                if self.is_visible(candidate, origin, perception) {
                    debug!(%candidate, "target sensed");
                    self.sensed = Some(candidate);
                    self.forget = None;
                    listener.on_sensed_target(candidate);
                }
            }
            Some(target) => {
                if self.is_visible(target, origin, perception) {
                    if self.forget.take().is_some() {
                        debug!(%target, "target reacquired before forget delay");
                    }
                    return;
                }
                match self.forget.as_mut() {
                    Some(forget) => {
                        forget.tick(step);
                    }
                    None => self.forget = Some(Countdown::new(self.config.forget_after)),
                }
                if self.forget.as_ref().is_some_and(Countdown::is_done) {
                    debug!(%target, "target lost");
                    self.sensed = None;
                    self.forget = None;
                    listener.on_lost_target();
                }
            }
        }
    }

    fn is_visible(&self, unit: UnitId, origin: Vec3, perception: &dyn Perception) -> bool {
        if self.candidate != Some(unit) || !perception.is_alive(unit) {
            return false;
        }
        let Some(position) = perception.position_of(unit) else {
            return false;
        };
        if !self.config.require_line_of_sight {
            return true;
        }
        let eye = origin + Vec3::Y * self.config.eye_height;
        perception.is_line_of_sight_clear(eye, position)
    }

    /// Closes the current episode without notifying anyone.
    pub fn forget(&mut self) {
        self.sensed = None;
        self.forget = None;
        self.accumulator = 0.0;
    }

    /// Whether an acquisition episode is open.
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.sensed.is_some()
    }

    /// Unit currently inside the detection volume.
    #[must_use]
    pub fn candidate(&self) -> Option<UnitId> {
        self.candidate
    }

    /// Whether a lost-sight debounce is running.
    #[must_use]
    pub fn is_forgetting(&self) -> bool {
        self.forget.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePerception, SensingLog};

    fn config() -> SensorConfig {
        SensorConfig {
            forget_after: 1.0,
            tick_interval: 0.1,
            require_line_of_sight: true,
            eye_height: 0.0,
        }
    }

    fn setup() -> (TargetSensor, FakePerception, SensingLog, UnitId) {
        let player = UnitId::from_raw(100);
        let (perception, world) = FakePerception::new();
        world.lock().positions.insert(player, Vec3::new(5.0, 0.0, 0.0));
        let sensor = TargetSensor::vision(config()).expect("valid config");
        (sensor, perception, SensingLog::default(), player)
    }

    #[test]
    fn test_no_candidate_never_emits() {
        let (mut sensor, perception, log, _) = setup();
        sensor.tick(5.0, Vec3::ZERO, &perception, &log);
        assert!(log.events().is_empty());
        assert!(!sensor.is_tracking());
    }

    #[test]
    fn test_sensed_once_per_episode() {
        let (mut sensor, perception, log, player) = setup();
        sensor.on_volume_enter(player);
        sensor.tick(0.1, Vec3::ZERO, &perception, &log);
        sensor.tick(1.0, Vec3::ZERO, &perception, &log);
        assert_eq!(log.events(), vec![Some(player)]);
        assert!(sensor.is_tracking());
    }

    #[test]
    fn test_loss_is_debounced() {
        let (mut sensor, perception, log, player) = setup();
        sensor.on_volume_enter(player);
        sensor.tick(0.1, Vec3::ZERO, &perception, &log);

        perception.world().lock().blocked = true;
        sensor.tick(0.5, Vec3::ZERO, &perception, &log);
        assert!(sensor.is_forgetting());
        assert_eq!(log.events().len(), 1);

        perception.world().lock().blocked = false;
        sensor.tick(0.1, Vec3::ZERO, &perception, &log);
        assert!(!sensor.is_forgetting());

        perception.world().lock().blocked = true;
        sensor.tick(1.5, Vec3::ZERO, &perception, &log);
        assert_eq!(log.events(), vec![Some(player), None]);
        assert!(!sensor.is_tracking());
    }

    #[test]
    fn test_leaving_volume_loses_target() {
        let (mut sensor, perception, log, player) = setup();
        sensor.on_volume_enter(player);
        sensor.tick(0.1, Vec3::ZERO, &perception, &log);
        sensor.on_volume_exit(player);
        sensor.tick(1.5, Vec3::ZERO, &perception, &log);
        assert_eq!(log.events(), vec![Some(player), None]);
    }

    #[test]
    fn test_dead_target_is_lost() {
        let (mut sensor, perception, log, player) = setup();
        sensor.on_volume_enter(player);
        sensor.tick(0.1, Vec3::ZERO, &perception, &log);
        perception.world().lock().dead.insert(player);
        sensor.tick(1.5, Vec3::ZERO, &perception, &log);
        assert_eq!(log.events(), vec![Some(player), None]);
    }

    #[test]
    fn test_tracking_ignores_other_units() {
        let player = UnitId::from_raw(100);
        let other = UnitId::from_raw(101);
        let (perception, world) = FakePerception::new();
        world.lock().positions.insert(other, Vec3::X);
        let log = SensingLog::default();

        let mut sensor = TargetSensor::tracking(player, config()).expect("valid config");
        sensor.on_volume_enter(other);
        sensor.tick(1.0, Vec3::ZERO, &perception, &log);
        assert_eq!(sensor.candidate(), None);
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_signal_queue_delivers_in_order() {
        let (mut sensor, perception, _, player) = setup();
        let queue = SignalQueue::default();
        sensor.on_volume_enter(player);
        sensor.tick(0.1, Vec3::ZERO, &perception, &queue);
        sensor.on_volume_exit(player);
        sensor.tick(1.5, Vec3::ZERO, &perception, &queue);

        let log = SensingLog::default();
        queue.deliver(&log);
        assert_eq!(log.events(), vec![Some(player), None]);
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_invalid_config() {
        let bad = SensorConfig {
            tick_interval: 0.0,
            ..SensorConfig::default()
        };
        assert!(TargetSensor::vision(bad).is_err());
        assert!(TargetSensor::tracking(UnitId::NULL, SensorConfig::default()).is_err());
    }
}
