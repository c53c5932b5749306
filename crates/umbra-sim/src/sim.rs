//! Encounter runner.
//!
//! Each frame moves the scripted player, raises detection volume crossings,
//! lets the player swing at the nearest unit, then hands the frame to the
//! scheduler and the arena.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use serde::Serialize;
use tracing::{debug, info, warn};
use umbra_behavior::events::{drain, EventBus, UnitEvent};
use umbra_behavior::profile::UnitProfile;
use umbra_behavior::scheduler::Scheduler;
use umbra_behavior::unit::Unit;
use umbra_common::{flat_direction, flat_distance, UmbraResult, UnitId, Vec3};

use crate::arena::{Arena, ArenaStats, PLAYER};
use crate::encounter::{Encounter, PlayerScript, UnitSpawn};

/// First id handed to spawned units.
const FIRST_UNIT: u64 = 100;

/// Final state of one unit.
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    /// Unit id
    pub id: UnitId,
    /// Profile name
    pub name: String,
    /// Health left
    pub health: f32,
    /// Boss phase reached
    pub phase: usize,
    /// Controller state
    pub state: String,
    /// Branch faults recovered from
    pub faults: u64,
}

/// Outcome of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Encounter name
    pub encounter: String,
    /// Simulated seconds
    pub elapsed: f64,
    /// Scheduler ticks
    pub ticks: u64,
    /// Player health at the end
    pub player_health: f32,
    /// Times the player went down
    pub player_deaths: u32,
    /// Whether every unit died
    pub cleared: bool,
    /// Surviving and fallen units
    pub units: Vec<UnitReport>,
    /// Bus events by kind
    pub events: BTreeMap<&'static str, u32>,
    /// Arena counters
    pub arena: ArenaStats,
}

struct Player {
    script: PlayerScript,
    waypoint: usize,
    attack_timer: f32,
}

impl Player {
    fn new(script: PlayerScript) -> Self {
        Self {
            script,
            waypoint: 0,
            attack_timer: 0.0,
        }
    }

    /// Walks the route. Returns the new position.
    fn walk(&mut self, position: Vec3, dt: f32) -> Vec3 {
        let Some(&goal) = self.script.route.get(self.waypoint) else {
            return position;
        };
        let step = self.script.speed * dt;
        if flat_distance(position, goal) <= step {
            self.waypoint = (self.waypoint + 1) % self.script.route.len();
            return goal;
        }
        position + flat_direction(position, goal) * step
    }
}

/// A loaded encounter ready to run.
pub struct Simulation {
    encounter: Encounter,
    arena: Arena,
    scheduler: Scheduler,
    spawns: Vec<(Arc<Unit>, Vec3)>,
    events: Receiver<UnitEvent>,
    player: Player,
    inside: HashSet<UnitId>,
    fallen: Vec<UnitReport>,
    event_counts: BTreeMap<&'static str, u32>,
    player_deaths: u32,
}

impl Simulation {
    /// Builds the arena and spawns every unit.
    pub fn new(encounter: Encounter, units: Vec<(UnitSpawn, UnitProfile)>) -> UmbraResult<Self> {
        let script = encounter.player.clone();
        let arena = Arena::new(encounter.arena.clone(), script.start, script.health);
        let bus = Arc::new(EventBus::default());
        let events = bus.subscribe();
        let mut scheduler = Scheduler::new(encounter.scheduler.clone())?;

        let mut spawns = Vec::with_capacity(units.len());
        for (offset, (spawn, profile)) in (0u64..).zip(units) {
            let id = UnitId::from_raw(FIRST_UNIT + offset);
            arena.add_body(id, spawn.position);
            let rig = arena.rig(id)?;
            let unit = if spawn.tracks_player {
                Unit::spawn_tracking(id, &profile, rig, PLAYER, bus.clone())?
            } else {
                Unit::spawn(id, &profile, rig, bus.clone())?
            };
            let unit = Arc::new(unit);
            scheduler.add(unit.clone());
            spawns.push((unit, spawn.position));
        }

        Ok(Self {
            encounter,
            arena,
            scheduler,
            spawns,
            events,
            player: Player::new(script),
            inside: HashSet::new(),
            fallen: Vec::new(),
            event_counts: BTreeMap::new(),
            player_deaths: 0,
        })
    }

    /// Runs until the duration elapses, every unit is dead or the player is
    /// down with resets disabled.
    pub fn run(mut self) -> RunReport {
        info!(
            encounter = %self.encounter.name,
            units = self.spawns.len(),
            "encounter started"
        );
        let frame_dt = self.encounter.frame_dt;
        let mut clock = 0.0_f32;
        while clock < self.encounter.duration {
            clock += frame_dt;
            if !self.frame(frame_dt) {
                break;
            }
        }
        self.report()
    }

    fn frame(&mut self, dt: f32) -> bool {
        if let Some(position) = self.arena.player_position() {
            self.arena.move_player(self.player.walk(position, dt));
        }
        self.update_volumes();
        self.player_attack(dt);

        self.scheduler.advance(dt);
        self.arena.step(dt);
        self.handle_events();

        if !self.arena.is_player_alive() {
            self.player_deaths += 1;
            if !self.encounter.reset_on_player_death {
                warn!("player down, stopping");
                return false;
            }
            self.reset();
        }
        !self.scheduler.is_empty()
    }

    fn update_volumes(&mut self) {
        let player = self
            .arena
            .player_position()
            .filter(|_| self.arena.is_player_alive());
        let radius = self.arena.detection_radius();
        for unit in self.scheduler.units() {
            let id = unit.id();
            let inside = match (player, self.arena.position_of(id)) {
                (Some(player), Some(position)) => flat_distance(player, position) <= radius,
                _ => false,
            };
            if inside && self.inside.insert(id) {
                unit.on_volume_enter(PLAYER);
            } else if !inside && self.inside.remove(&id) {
                unit.on_volume_exit(PLAYER);
            }
        }
    }

    fn player_attack(&mut self, dt: f32) {
        self.player.attack_timer -= dt;
        if self.player.attack_timer > 0.0 {
            return;
        }
        let Some(player) = self.arena.player_position() else {
            return;
        };
        let range = self.player.script.attack_range;
        let nearest = self
            .scheduler
            .units()
            .iter()
            .filter(|unit| !unit.is_dead())
            .filter_map(|unit| {
                let distance = flat_distance(player, self.arena.position_of(unit.id())?);
                (distance <= range).then_some((distance, unit))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, unit)| unit.clone());
        let Some(unit) = nearest else {
            return;
        };

        self.player.attack_timer = self.player.script.attack_interval;
        if unit.apply_damage(self.player.script.attack_damage) {
            debug!(unit = %unit.id(), health = unit.health(), "player hit");
            if self.player.script.stun > 0.0 && !unit.is_dead() {
                unit.stun(self.player.script.stun);
            }
        }
    }

    fn handle_events(&mut self) {
        for event in drain(&self.events) {
            let kind = match &event {
                UnitEvent::UnitDied { .. } => "unit_died",
                UnitEvent::PhaseTransitionStarted { .. } => "phase_transition_started",
                UnitEvent::PhaseTransitionEnded { .. } => "phase_transition_ended",
                UnitEvent::EnemyReset { .. } => "enemy_reset",
                UnitEvent::BehaviorReset { .. } => "behavior_reset",
                UnitEvent::TargetSensed { .. } => "target_sensed",
                UnitEvent::TargetLost { .. } => "target_lost",
            };
            *self.event_counts.entry(kind).or_default() += 1;
            info!(unit = %event.unit(), kind, "event");

            if let UnitEvent::UnitDied { unit } = event {
                self.bury(unit);
            }
        }
    }

    /// Despawns a dead unit and clears its body out of the arena.
    fn bury(&mut self, id: UnitId) {
        let Some(unit) = self.scheduler.get(id).cloned() else {
            return;
        };
        self.fallen.push(report_of(&unit));
        unit.despawn();
        self.arena.remove_body(id);
        self.inside.remove(&id);
    }

    fn reset(&mut self) {
        info!(deaths = self.player_deaths, "player down, resetting encounter");
        for unit in self.scheduler.units() {
            if self.inside.remove(&unit.id()) {
                unit.on_volume_exit(PLAYER);
            }
        }
        for (unit, position) in &self.spawns {
            if !unit.is_despawned() {
                self.arena.add_body(unit.id(), *position);
            }
        }
        self.scheduler.reset_encounter();
        self.arena.respawn_player(self.player.script.start);
        self.player.waypoint = 0;
        self.player.attack_timer = 0.0;
    }

    fn report(mut self) -> RunReport {
        self.handle_events();
        let cleared = self.scheduler.units().iter().all(|unit| unit.is_despawned());
        let mut units: Vec<UnitReport> = self
            .scheduler
            .units()
            .iter()
            .filter(|unit| !unit.is_despawned())
            .map(|unit| report_of(unit))
            .collect();
        units.append(&mut self.fallen);
        units.sort_by_key(|report| report.id);

        RunReport {
            encounter: self.encounter.name.clone(),
            elapsed: self.scheduler.elapsed(),
            ticks: self.scheduler.ticks(),
            player_health: self.arena.player_health(),
            player_deaths: self.player_deaths,
            cleared,
            units,
            events: self.event_counts,
            arena: self.arena.stats(),
        }
    }
}

fn report_of(unit: &Unit) -> UnitReport {
    let snapshot = unit.snapshot();
    UnitReport {
        id: unit.id(),
        name: unit.name().to_string(),
        health: unit.health(),
        phase: snapshot.phase,
        state: format!("{:?}", snapshot.state),
        faults: snapshot.faults,
    }
}
