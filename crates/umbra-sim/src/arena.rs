//! In-memory arena.
//!
//! Stands in for the engine around the decision core: kinematic bodies,
//! straight-line projectiles, timed attack windows, box-shaped line-of-sight
//! blockers and a single player body. Every unit's collaborators are thin
//! handles onto one shared [`ArenaState`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use umbra_behavior::collab::{
    Combat, Hitbox, LootTier, Navigator, Perception, Presentation, Projectile, Rig, SoundCue,
    VisualState,
};
use umbra_common::{flat_distance, flatten, ConfigResult, HitboxId, UnitId, Vec3};

/// Id of the scripted player.
pub const PLAYER: UnitId = UnitId::from_raw(1);

/// Axis-aligned box that blocks line of sight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    /// Center on the ground plane
    pub center: Vec3,
    /// Half size along x and z
    pub half_extents: Vec3,
}

impl Wall {
    /// Whether the flat segment `from -> to` crosses the box (slab test).
    fn blocks(&self, from: Vec3, to: Vec3) -> bool {
        let min = self.center - self.half_extents;
        let max = self.center + self.half_extents;
        let delta = to - from;
        let mut t_min = 0.0_f32;
        let mut t_max = 1.0_f32;
        for (start, step, lo, hi) in [
            (from.x, delta.x, min.x, max.x),
            (from.z, delta.z, min.z, max.z),
        ] {
            if step.abs() < f32::EPSILON {
                if start < lo || start > hi {
                    return false;
                }
                continue;
            }
            let a = (lo - start) / step;
            let b = (hi - start) / step;
            t_min = t_min.max(a.min(b));
            t_max = t_max.min(a.max(b));
            if t_min > t_max {
                return false;
            }
        }
        true
    }
}

/// Arena settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Radius of the player body for hit tests
    pub player_radius: f32,
    /// Distance at which an enemy body touches the player
    pub contact_range: f32,
    /// Radius of every unit's detection volume
    pub detection_radius: f32,
    /// Projectiles are dropped after this distance
    pub projectile_range: f32,
    /// Line-of-sight blockers
    pub walls: Vec<Wall>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            player_radius: 0.5,
            contact_range: 1.2,
            detection_radius: 12.0,
            projectile_range: 60.0,
            walls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct Body {
    position: Vec3,
    destination: Option<Vec3>,
    speed: f32,
    speed_factor: f32,
    stunned: bool,
    /// Contacts not yet consumed by the unit's melee branch
    contacts: u32,
    touching: bool,
}

impl Body {
    fn at(position: Vec3) -> Self {
        Self {
            position,
            destination: None,
            speed: 3.5,
            speed_factor: 1.0,
            stunned: false,
            contacts: 0,
            touching: false,
        }
    }
}

#[derive(Debug, Clone)]
struct Flight {
    projectile: Projectile,
    position: Vec3,
    travelled: f32,
}

#[derive(Debug, Clone)]
struct Window {
    hitbox: Hitbox,
    remaining: f32,
    landed: bool,
}

/// Counters collected while the arena runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArenaStats {
    /// Damage the player took
    pub player_damage_taken: f32,
    /// Projectiles fired
    pub projectiles_fired: u32,
    /// Projectiles that hit the player
    pub projectile_hits: u32,
    /// Attack windows opened
    pub hitboxes_opened: u32,
    /// Loot dropped, per tier
    pub loot: Vec<(UnitId, LootTier)>,
    /// Sounds played
    pub sounds: u32,
}

/// Shared world state.
#[derive(Debug)]
pub struct ArenaState {
    config: ArenaConfig,
    bodies: HashMap<UnitId, Body>,
    player_health: f32,
    player_max_health: f32,
    flights: Vec<Flight>,
    windows: HashMap<HitboxId, Window>,
    next_hitbox: u64,
    stats: ArenaStats,
}

impl ArenaState {
    fn player(&self) -> Option<&Body> {
        self.bodies.get(&PLAYER)
    }

    fn player_alive(&self) -> bool {
        self.player_health > 0.0 && self.bodies.contains_key(&PLAYER)
    }

    fn hurt_player(&mut self, amount: f32) -> bool {
        if !self.player_alive() {
            return false;
        }
        self.player_health = (self.player_health - amount).max(0.0);
        self.stats.player_damage_taken += amount;
        if self.player_health <= 0.0 {
            debug!("player down");
        }
        true
    }

    fn line_of_sight(&self, from: Vec3, to: Vec3) -> bool {
        !self.config.walls.iter().any(|wall| wall.blocks(from, to))
    }
}

/// Handle onto the shared arena.
#[derive(Debug, Clone)]
pub struct Arena(Arc<RwLock<ArenaState>>);

impl Arena {
    /// Creates an arena with the player at `player_start`.
    pub fn new(config: ArenaConfig, player_start: Vec3, player_health: f32) -> Self {
        let mut bodies = HashMap::new();
        bodies.insert(PLAYER, Body::at(player_start));
        Self(Arc::new(RwLock::new(ArenaState {
            config,
            bodies,
            player_health,
            player_max_health: player_health,
            flights: Vec::new(),
            windows: HashMap::new(),
            next_hitbox: 0,
            stats: ArenaStats::default(),
        })))
    }

    /// Places a unit body.
    pub fn add_body(&self, unit: UnitId, position: Vec3) {
        self.0.write().bodies.insert(unit, Body::at(position));
    }

    /// Removes a unit body.
    pub fn remove_body(&self, unit: UnitId) {
        self.0.write().bodies.remove(&unit);
    }

    /// Builds the collaborators of `unit`.
    pub fn rig(&self, unit: UnitId) -> ConfigResult<Rig> {
        Rig::builder()
            .navigator(ArenaNav {
                unit,
                arena: self.clone(),
            })
            .perception(ArenaPerception {
                arena: self.clone(),
            })
            .combat(ArenaCombat {
                arena: self.clone(),
            })
            .presentation(ArenaFx {
                unit,
                arena: self.clone(),
            })
            .build()
    }

    /// Detection radius of every unit.
    pub fn detection_radius(&self) -> f32 {
        self.0.read().config.detection_radius
    }

    /// Position of a body.
    pub fn position_of(&self, unit: UnitId) -> Option<Vec3> {
        self.0.read().bodies.get(&unit).map(|body| body.position)
    }

    /// Player position, if the player exists.
    pub fn player_position(&self) -> Option<Vec3> {
        self.0.read().player().map(|body| body.position)
    }

    /// Teleports the player.
    pub fn move_player(&self, position: Vec3) {
        if let Some(body) = self.0.write().bodies.get_mut(&PLAYER) {
            body.position = position;
        }
    }

    /// Player health.
    pub fn player_health(&self) -> f32 {
        self.0.read().player_health
    }

    /// Whether the player is alive.
    pub fn is_player_alive(&self) -> bool {
        self.0.read().player_alive()
    }

    /// Brings the player back at `position` with full health and clears
    /// everything in flight.
    pub fn respawn_player(&self, position: Vec3) {
        let mut state = self.0.write();
        state.player_health = state.player_max_health;
        state.bodies.insert(PLAYER, Body::at(position));
        state.flights.clear();
        state.windows.clear();
    }

    /// Counters so far.
    pub fn stats(&self) -> ArenaStats {
        self.0.read().stats.clone()
    }

    /// Number of open attack windows.
    pub fn open_windows(&self) -> usize {
        self.0.read().windows.len()
    }

    /// Moves bodies and projectiles, resolves hits and contacts.
    pub fn step(&self, dt: f32) {
        let mut state = self.0.write();
        let state = &mut *state;

        for body in state.bodies.values_mut() {
            let Some(dest) = body.destination else {
                continue;
            };
            if body.stunned {
                continue;
            }
            let step = body.speed * body.speed_factor * dt;
            let to_dest = flatten(dest - body.position);
            if to_dest.length() <= step {
                body.position = Vec3::new(dest.x, body.position.y, dest.z);
                body.destination = None;
            } else {
                body.position += to_dest.normalize_or_zero() * step;
            }
        }

        let Some(player) = state.player().map(|body| body.position) else {
            return;
        };
        let contact_range = state.config.contact_range;
        for (unit, body) in &mut state.bodies {
            if *unit == PLAYER {
                continue;
            }
            let touching = flat_distance(body.position, player) <= contact_range;
            if touching && !body.touching {
                trace!(%unit, "body contact");
                body.contacts += 1;
            }
            body.touching = touching;
        }

        let radius = state.config.player_radius;
        let range = state.config.projectile_range;
        let mut landed = Vec::new();
        state.flights.retain_mut(|flight| {
            let step = flight.projectile.speed * dt;
            flight.position += flight.projectile.direction * step;
            flight.travelled += step;
            if flat_distance(flight.position, player) <= radius {
                landed.push(flight.projectile.damage);
                return false;
            }
            flight.travelled < range
        });
        for damage in landed {
            if state.hurt_player(damage) {
                state.stats.projectile_hits += 1;
            }
        }

        let mut beam_damage = 0.0;
        state.windows.retain(|_, window| {
            if !window.landed {
                let start = window.hitbox.origin;
                let end = start + window.hitbox.direction * window.hitbox.length;
                if segment_distance(flatten(player), flatten(start), flatten(end)) <= radius {
                    window.landed = true;
                    beam_damage += window.hitbox.damage;
                }
            }
            window.remaining -= dt;
            window.remaining > 0.0
        });
        if beam_damage > 0.0 {
            state.hurt_player(beam_damage);
        }
    }
}

fn segment_distance(point: Vec3, start: Vec3, end: Vec3) -> f32 {
    let segment = end - start;
    let length_sq = segment.length_squared();
    if length_sq <= f32::EPSILON {
        return point.distance(start);
    }
    let t = ((point - start).dot(segment) / length_sq).clamp(0.0, 1.0);
    point.distance(start + segment * t)
}

struct ArenaNav {
    unit: UnitId,
    arena: Arena,
}

impl Navigator for ArenaNav {
    fn request_move_to(&mut self, point: Vec3) -> bool {
        match self.arena.0.write().bodies.get_mut(&self.unit) {
            Some(body) => {
                body.destination = Some(point);
                true
            }
            None => false,
        }
    }

    fn is_path_pending(&self) -> bool {
        false
    }

    fn remaining_distance(&self) -> f32 {
        let state = self.arena.0.read();
        state.bodies.get(&self.unit).map_or(0.0, |body| {
            body.destination
                .map_or(0.0, |dest| flat_distance(body.position, dest))
        })
    }

    fn set_speed(&mut self, speed: f32) {
        if let Some(body) = self.arena.0.write().bodies.get_mut(&self.unit) {
            body.speed = speed;
        }
    }

    fn stop(&mut self) {
        if let Some(body) = self.arena.0.write().bodies.get_mut(&self.unit) {
            body.destination = None;
        }
    }

    fn position(&self) -> Vec3 {
        self.arena.position_of(self.unit).unwrap_or(Vec3::ZERO)
    }

    fn face_towards(&mut self, _point: Vec3) {}

    fn displace_to(&mut self, point: Vec3) {
        if let Some(body) = self.arena.0.write().bodies.get_mut(&self.unit) {
            body.position = point;
            body.destination = None;
        }
    }
}

struct ArenaPerception {
    arena: Arena,
}

impl Perception for ArenaPerception {
    fn is_line_of_sight_clear(&self, from: Vec3, to: Vec3) -> bool {
        self.arena.0.read().line_of_sight(from, to)
    }

    fn position_of(&self, unit: UnitId) -> Option<Vec3> {
        self.arena.position_of(unit)
    }

    fn is_alive(&self, unit: UnitId) -> bool {
        let state = self.arena.0.read();
        if unit == PLAYER {
            state.player_alive()
        } else {
            state.bodies.contains_key(&unit)
        }
    }
}

struct ArenaCombat {
    arena: Arena,
}

impl Combat for ArenaCombat {
    fn deal_damage(&mut self, unit: UnitId, amount: f32, true_damage: bool) -> bool {
        if unit != PLAYER {
            return false;
        }
        trace!(amount, true_damage, "contact damage");
        self.arena.0.write().hurt_player(amount)
    }

    fn spawn_projectile(&mut self, projectile: Projectile) {
        let mut state = self.arena.0.write();
        state.stats.projectiles_fired += 1;
        state.flights.push(Flight {
            projectile,
            position: projectile.origin,
            travelled: 0.0,
        });
    }

    fn apply_speed_factor(&mut self, unit: UnitId, factor: f32) {
        if let Some(body) = self.arena.0.write().bodies.get_mut(&unit) {
            body.speed_factor = factor;
        }
    }

    fn set_stunned(&mut self, unit: UnitId, stunned: bool) {
        if let Some(body) = self.arena.0.write().bodies.get_mut(&unit) {
            body.stunned = stunned;
        }
    }

    fn contact_registered(&mut self, unit: UnitId) -> bool {
        let mut state = self.arena.0.write();
        match state.bodies.get_mut(&unit) {
            Some(body) if body.contacts > 0 => {
                body.contacts -= 1;
                true
            }
            _ => false,
        }
    }

    fn open_hitbox(&mut self, _owner: UnitId, hitbox: Hitbox) -> HitboxId {
        let mut state = self.arena.0.write();
        state.next_hitbox += 1;
        let id = HitboxId::new(state.next_hitbox);
        state.stats.hitboxes_opened += 1;
        state.windows.insert(
            id,
            Window {
                hitbox,
                remaining: hitbox.lifetime,
                landed: false,
            },
        );
        id
    }

    fn close_hitbox(&mut self, id: HitboxId) {
        self.arena.0.write().windows.remove(&id);
    }

    fn drop_loot(&mut self, unit: UnitId, tier: LootTier) {
        debug!(%unit, ?tier, "loot dropped");
        self.arena.0.write().stats.loot.push((unit, tier));
    }
}

struct ArenaFx {
    unit: UnitId,
    arena: Arena,
}

impl Presentation for ArenaFx {
    fn play_sound(&mut self, cue: SoundCue) {
        trace!(unit = %self.unit, ?cue, "sound");
        self.arena.0.write().stats.sounds += 1;
    }

    fn set_visual(&mut self, state: VisualState) {
        trace!(unit = %self.unit, ?state, "visual");
    }

    fn set_hit_indicator(&mut self, visible: bool) {
        trace!(unit = %self.unit, visible, "hit indicator");
    }

    fn display_cooldown(&mut self, _fraction: f32) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENEMY: UnitId = UnitId::from_raw(10);

    fn arena() -> Arena {
        let arena = Arena::new(ArenaConfig::default(), Vec3::new(10.0, 0.0, 0.0), 100.0);
        arena.add_body(ENEMY, Vec3::ZERO);
        arena
    }

    #[test]
    fn test_navigator_walks_to_destination() {
        let arena = arena();
        let mut rig = arena.rig(ENEMY).expect("complete rig");
        rig.nav.set_speed(2.0);
        assert!(rig.nav.request_move_to(Vec3::new(4.0, 0.0, 0.0)));

        arena.step(1.0);
        assert_eq!(arena.position_of(ENEMY), Some(Vec3::new(2.0, 0.0, 0.0)));
        arena.step(1.5);
        assert_eq!(arena.position_of(ENEMY), Some(Vec3::new(4.0, 0.0, 0.0)));
        assert_eq!(rig.nav.remaining_distance(), 0.0);
    }

    #[test]
    fn test_projectile_hits_player() {
        let arena = arena();
        let mut rig = arena.rig(ENEMY).expect("complete rig");
        rig.combat.spawn_projectile(Projectile {
            owner: ENEMY,
            origin: Vec3::ZERO,
            direction: Vec3::X,
            speed: 20.0,
            damage: 15.0,
        });
        for _ in 0..10 {
            arena.step(0.05);
        }
        let stats = arena.stats();
        assert_eq!(stats.projectile_hits, 1);
        assert_eq!(arena.player_health(), 85.0);
    }

    #[test]
    fn test_beam_window_lands_once() {
        let arena = arena();
        let mut rig = arena.rig(ENEMY).expect("complete rig");
        let id = rig.combat.open_hitbox(
            ENEMY,
            Hitbox {
                origin: Vec3::ZERO,
                direction: Vec3::X,
                length: 30.0,
                damage: 20.0,
                lifetime: 1.0,
            },
        );
        arena.step(0.1);
        arena.step(0.1);
        assert_eq!(arena.player_health(), 80.0);
        rig.combat.close_hitbox(id);
        assert_eq!(arena.open_windows(), 0);
    }

    #[test]
    fn test_walls_block_sight() {
        let config = ArenaConfig {
            walls: vec![Wall {
                center: Vec3::new(5.0, 0.0, 0.0),
                half_extents: Vec3::new(0.5, 2.0, 3.0),
            }],
            ..ArenaConfig::default()
        };
        let arena = Arena::new(config, Vec3::new(10.0, 0.0, 0.0), 100.0);
        let rig = arena.rig(ENEMY).expect("complete rig");
        assert!(!rig
            .perception
            .is_line_of_sight_clear(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)));
        assert!(rig
            .perception
            .is_line_of_sight_clear(Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0)));
    }

    #[test]
    fn test_contact_is_registered_once_per_touch() {
        let arena = arena();
        let mut rig = arena.rig(ENEMY).expect("complete rig");
        arena.move_player(Vec3::new(1.0, 0.0, 0.0));
        arena.step(0.1);
        arena.step(0.1);
        assert!(rig.combat.contact_registered(ENEMY));
        assert!(!rig.combat.contact_registered(ENEMY));
    }
}
