//! Collaborator doubles shared by the unit tests.
//!
//! Each double keeps its state behind an `Arc<Mutex<_>>` so a test can box the
//! double into a [`Rig`] and still inspect what the core did to it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use umbra_common::{flat_distance, HitboxId, UnitId, Vec3};

use crate::branches::{Branch, BranchRole, Engagement, SequenceContext};
use crate::collab::{
    Combat, Hitbox, LootTier, Navigator, Perception, Presentation, Projectile, Rig, SoundCue,
    VisualState,
};
use crate::sensing::SensingListener;
use crate::sequence::{BranchFault, Progress};

pub type Shared<T> = Arc<Mutex<T>>;

#[derive(Debug, Default)]
pub struct NavState {
    pub position: Vec3,
    pub destination: Option<Vec3>,
    pub speed: f32,
    pub facing: Option<Vec3>,
    pub requests: Vec<Vec3>,
    pub displacements: Vec<Vec3>,
    pub stops: usize,
    pub reject_moves: bool,
}

/// Kinematic navigator: walks straight at `speed` when advanced.
pub struct FakeNav(Shared<NavState>);

impl FakeNav {
    pub fn new(position: Vec3, speed: f32) -> (Self, Shared<NavState>) {
        let state = Arc::new(Mutex::new(NavState {
            position,
            speed,
            ..NavState::default()
        }));
        (Self(state.clone()), state)
    }

    pub fn advance(&self, dt: f32) {
        advance(&self.0, dt);
    }
}

pub fn advance(nav: &Shared<NavState>, dt: f32) {
    let mut nav = nav.lock();
    let Some(dest) = nav.destination else {
        return;
    };
    let step = nav.speed * dt;
    let to_dest = dest - nav.position;
    if to_dest.length() <= step {
        nav.position = dest;
        nav.destination = None;
    } else {
        nav.position += to_dest.normalize() * step;
    }
}

impl Navigator for FakeNav {
    fn request_move_to(&mut self, point: Vec3) -> bool {
        let mut nav = self.0.lock();
        nav.requests.push(point);
        if nav.reject_moves {
            return false;
        }
        nav.destination = Some(point);
        true
    }

    fn is_path_pending(&self) -> bool {
        false
    }

    fn remaining_distance(&self) -> f32 {
        let nav = self.0.lock();
        nav.destination
            .map_or(0.0, |dest| flat_distance(nav.position, dest))
    }

    fn set_speed(&mut self, speed: f32) {
        self.0.lock().speed = speed;
    }

    fn stop(&mut self) {
        let mut nav = self.0.lock();
        nav.destination = None;
        nav.stops += 1;
    }

    fn position(&self) -> Vec3 {
        self.0.lock().position
    }

    fn face_towards(&mut self, point: Vec3) {
        self.0.lock().facing = Some(point);
    }

    fn displace_to(&mut self, point: Vec3) {
        let mut nav = self.0.lock();
        nav.position = point;
        nav.displacements.push(point);
    }
}

#[derive(Debug, Default)]
pub struct WorldState {
    pub positions: HashMap<UnitId, Vec3>,
    pub dead: HashSet<UnitId>,
    pub blocked: bool,
}

pub struct FakePerception(Shared<WorldState>);

impl FakePerception {
    pub fn new() -> (Self, Shared<WorldState>) {
        let state = Arc::new(Mutex::new(WorldState::default()));
        (Self(state.clone()), state)
    }

    pub fn world(&self) -> &Shared<WorldState> {
        &self.0
    }
}

impl Perception for FakePerception {
    fn is_line_of_sight_clear(&self, _from: Vec3, _to: Vec3) -> bool {
        !self.0.lock().blocked
    }

    fn position_of(&self, unit: UnitId) -> Option<Vec3> {
        self.0.lock().positions.get(&unit).copied()
    }

    fn is_alive(&self, unit: UnitId) -> bool {
        let world = self.0.lock();
        world.positions.contains_key(&unit) && !world.dead.contains(&unit)
    }
}

#[derive(Debug, Default)]
pub struct CombatLog {
    pub damage: Vec<(UnitId, f32, bool)>,
    pub projectiles: Vec<Projectile>,
    pub speed_factors: HashMap<UnitId, f32>,
    pub stunned: HashSet<UnitId>,
    pub pending_contacts: usize,
    pub open_hitboxes: HashMap<HitboxId, Hitbox>,
    pub hitboxes_opened: usize,
    pub next_hitbox: u64,
    pub loot: Vec<(UnitId, LootTier)>,
}

pub struct RecordingCombat(Shared<CombatLog>);

impl Combat for RecordingCombat {
    fn deal_damage(&mut self, unit: UnitId, amount: f32, true_damage: bool) -> bool {
        self.0.lock().damage.push((unit, amount, true_damage));
        true
    }

    fn spawn_projectile(&mut self, projectile: Projectile) {
        self.0.lock().projectiles.push(projectile);
    }

    fn apply_speed_factor(&mut self, unit: UnitId, factor: f32) {
        self.0.lock().speed_factors.insert(unit, factor);
    }

    fn set_stunned(&mut self, unit: UnitId, stunned: bool) {
        let mut log = self.0.lock();
        if stunned {
            log.stunned.insert(unit);
        } else {
            log.stunned.remove(&unit);
        }
    }

    fn contact_registered(&mut self, _unit: UnitId) -> bool {
        let mut log = self.0.lock();
        if log.pending_contacts > 0 {
            log.pending_contacts -= 1;
            true
        } else {
            false
        }
    }

    fn open_hitbox(&mut self, _owner: UnitId, hitbox: Hitbox) -> HitboxId {
        let mut log = self.0.lock();
        log.next_hitbox += 1;
        let id = HitboxId::new(log.next_hitbox);
        log.open_hitboxes.insert(id, hitbox);
        log.hitboxes_opened += 1;
        id
    }

    fn close_hitbox(&mut self, id: HitboxId) {
        self.0.lock().open_hitboxes.remove(&id);
    }

    fn drop_loot(&mut self, unit: UnitId, tier: LootTier) {
        self.0.lock().loot.push((unit, tier));
    }
}

#[derive(Debug, Default)]
pub struct FxLog {
    pub sounds: Vec<SoundCue>,
    pub visual: VisualState,
    pub visuals: Vec<VisualState>,
    pub hit_indicator: bool,
    pub cooldowns: Vec<f32>,
}

pub struct RecordingFx(Shared<FxLog>);

impl RecordingFx {
    pub fn new() -> (Self, Shared<FxLog>) {
        let log = Arc::new(Mutex::new(FxLog::default()));
        (Self(log.clone()), log)
    }
}

impl Presentation for RecordingFx {
    fn play_sound(&mut self, cue: SoundCue) {
        self.0.lock().sounds.push(cue);
    }

    fn set_visual(&mut self, state: VisualState) {
        let mut log = self.0.lock();
        log.visual = state;
        log.visuals.push(state);
    }

    fn set_hit_indicator(&mut self, visible: bool) {
        self.0.lock().hit_indicator = visible;
    }

    fn display_cooldown(&mut self, fraction: f32) {
        self.0.lock().cooldowns.push(fraction);
    }
}

/// Handles onto every double inside a test rig.
pub struct RigHandles {
    pub nav: Shared<NavState>,
    pub world: Shared<WorldState>,
    pub combat: Shared<CombatLog>,
    pub fx: Shared<FxLog>,
}

pub fn test_rig(position: Vec3) -> (Rig, RigHandles) {
    let (nav, nav_state) = FakeNav::new(position, 5.0);
    let (perception, world) = FakePerception::new();
    let combat = Arc::new(Mutex::new(CombatLog::default()));
    let (fx, fx_log) = RecordingFx::new();
    let rig = Rig::builder()
        .navigator(nav)
        .perception(perception)
        .combat(RecordingCombat(combat.clone()))
        .presentation(fx)
        .build()
        .expect("complete rig");
    (
        rig,
        RigHandles {
            nav: nav_state,
            world,
            combat,
            fx: fx_log,
        },
    )
}

/// Resumes `branch` once with a fixed context.
pub fn resume(
    branch: &mut dyn Branch,
    rig: &mut Rig,
    unit: UnitId,
    engagement: Engagement,
    phase: usize,
    dt: f32,
    now: f64,
) -> Result<Progress, BranchFault> {
    let mut rng = fastrand::Rng::with_seed(7);
    let mut ctx = SequenceContext {
        unit,
        dt,
        now,
        phase,
        engagement,
        rig,
        rng: &mut rng,
    };
    branch.resume(&mut ctx)
}

/// Records sensing callbacks: `Some(target)` for sensed, `None` for lost.
#[derive(Default)]
pub struct SensingLog(Mutex<Vec<Option<UnitId>>>);

impl SensingLog {
    pub fn events(&self) -> Vec<Option<UnitId>> {
        self.0.lock().clone()
    }
}

impl SensingListener for SensingLog {
    fn on_sensed_target(&self, target: UnitId) {
        self.0.lock().push(Some(target));
    }

    fn on_lost_target(&self) {
        self.0.lock().push(None);
    }
}

#[derive(Debug, Default)]
pub struct ProbeState {
    pub executes: usize,
    pub resumes: usize,
    pub resets: usize,
    pub hard_resets: usize,
    pub running: bool,
    pub last_engagement: Option<Engagement>,
    pub last_phase: usize,
    pub fail_next: bool,
    pub complete_next: bool,
}

/// Branch that only records how the controller drives it.
pub struct ProbeBranch {
    name: &'static str,
    role: BranchRole,
    state: Shared<ProbeState>,
}

impl ProbeBranch {
    pub fn new(name: &'static str, role: BranchRole) -> (Self, Shared<ProbeState>) {
        let state = Arc::new(Mutex::new(ProbeState::default()));
        (
            Self {
                name,
                role,
                state: state.clone(),
            },
            state,
        )
    }
}

impl Branch for ProbeBranch {
    fn name(&self) -> &'static str {
        self.name
    }

    fn role(&self) -> BranchRole {
        self.role
    }

    fn execute(&mut self, engagement: &Engagement, phase: usize) {
        let mut state = self.state.lock();
        state.executes += 1;
        state.running = true;
        state.last_engagement = Some(*engagement);
        state.last_phase = phase;
    }

    fn resume(&mut self, ctx: &mut SequenceContext<'_>) -> Result<Progress, BranchFault> {
        let mut state = self.state.lock();
        if !state.running {
            return Err(BranchFault::NotStarted(self.name));
        }
        state.resumes += 1;
        state.last_engagement = Some(ctx.engagement);
        if std::mem::take(&mut state.fail_next) {
            return Err(BranchFault::BadInput {
                branch: self.name,
                detail: "scripted failure".to_string(),
            });
        }
        if std::mem::take(&mut state.complete_next) {
            state.running = false;
            return Ok(Progress::Completed);
        }
        Ok(Progress::Running)
    }

    fn reset(&mut self, _unit: UnitId, _rig: &mut Rig) {
        let mut state = self.state.lock();
        state.resets += 1;
        state.running = false;
    }

    fn hard_reset(&mut self, unit: UnitId, rig: &mut Rig) {
        self.state.lock().hard_resets += 1;
        self.reset(unit, rig);
    }

    fn is_running(&self) -> bool {
        self.state.lock().running
    }
}
