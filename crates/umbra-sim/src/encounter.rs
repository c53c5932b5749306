//! Encounter files.
//!
//! An encounter places units in an arena and scripts the player walking
//! through it. Unit profiles are either inline or loaded from a path relative
//! to the encounter file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;
use umbra_behavior::profile::UnitProfile;
use umbra_behavior::scheduler::SchedulerConfig;
use umbra_common::Vec3;

use crate::arena::ArenaConfig;

/// Scripted player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerScript {
    /// Spawn point
    pub start: Vec3,
    /// Points walked in order, looping
    pub route: Vec<Vec3>,
    /// Walking speed
    pub speed: f32,
    /// Player health
    pub health: f32,
    /// Reach of the player's attack
    pub attack_range: f32,
    /// Damage per attack
    pub attack_damage: f32,
    /// Seconds between attacks
    pub attack_interval: f32,
    /// Seconds an attack stuns for (0 disables stuns)
    pub stun: f32,
}

impl Default for PlayerScript {
    fn default() -> Self {
        Self {
            start: Vec3::ZERO,
            route: Vec::new(),
            speed: 4.0,
            health: 200.0,
            attack_range: 3.0,
            attack_damage: 12.0,
            attack_interval: 0.8,
            stun: 0.0,
        }
    }
}

/// One unit placed in the arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSpawn {
    /// Spawn position
    pub position: Vec3,
    /// Inline profile
    #[serde(default)]
    pub profile: Option<UnitProfile>,
    /// Profile file, relative to the encounter file
    #[serde(default)]
    pub profile_path: Option<PathBuf>,
    /// Only ever sense the player
    #[serde(default)]
    pub tracks_player: bool,
}

/// A whole encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Encounter {
    /// Name used in logs
    pub name: String,
    /// Simulated seconds
    pub duration: f32,
    /// Frame length fed to the scheduler
    pub frame_dt: f32,
    /// Reset every unit when the player dies
    pub reset_on_player_death: bool,
    /// Tick settings
    pub scheduler: SchedulerConfig,
    /// World settings
    pub arena: ArenaConfig,
    /// The player
    pub player: PlayerScript,
    /// Units to spawn
    pub units: Vec<UnitSpawn>,
}

impl Default for Encounter {
    fn default() -> Self {
        Self {
            name: "encounter".to_string(),
            duration: 30.0,
            frame_dt: 1.0 / 60.0,
            reset_on_player_death: true,
            scheduler: SchedulerConfig::default(),
            arena: ArenaConfig::default(),
            player: PlayerScript::default(),
            units: Vec::new(),
        }
    }
}

impl Encounter {
    /// Loads an encounter and resolves every unit profile.
    pub fn load(path: &Path) -> Result<(Self, Vec<(UnitSpawn, UnitProfile)>)> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("reading encounter {}", path.display()))?;
        let encounter: Self = toml::from_str(&source)
            .with_context(|| format!("parsing encounter {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let units = encounter.resolve(base)?;
        info!(
            "Loaded encounter '{}' from {} ({} units)",
            encounter.name,
            path.display(),
            units.len()
        );
        Ok((encounter, units))
    }

    /// Checks the settings and pairs every spawn with its profile.
    pub fn resolve(&self, base: &Path) -> Result<Vec<(UnitSpawn, UnitProfile)>> {
        if !(self.duration > 0.0) || !(self.frame_dt > 0.0) {
            bail!("duration and frame_dt must be > 0");
        }
        self.scheduler.validate()?;
        if self.units.is_empty() {
            bail!("encounter '{}' spawns no units", self.name);
        }

        self.units
            .iter()
            .enumerate()
            .map(|(index, spawn)| {
                let profile = match (&spawn.profile, &spawn.profile_path) {
                    (Some(profile), None) => {
                        profile.validate()?;
                        profile.clone()
                    }
                    (None, Some(path)) => UnitProfile::load(base.join(path))?,
                    _ => bail!("unit #{index} needs exactly one of profile / profile_path"),
                };
                Ok((spawn.clone(), profile))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BUNDLED: &str = include_str!("../assets/encounters/crypt.toml");

    #[test]
    fn test_bundled_encounter_resolves() {
        let encounter: Encounter = toml::from_str(BUNDLED).expect("bundled encounter parses");
        let base = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/encounters");
        let units = encounter.resolve(&base).expect("bundled encounter resolves");
        assert!(units.iter().any(|(_, profile)| profile.is_boss()));
        assert!(units.iter().any(|(_, profile)| !profile.is_boss()));
    }

    #[test]
    fn test_profile_path_is_relative_to_encounter() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut profile = fs::File::create(dir.path().join("grunt.toml")).expect("profile file");
        profile
            .write_all(b"name = \"grunt\"\nmax_health = 40.0\n")
            .expect("write profile");
        let encounter_path = dir.path().join("arena.toml");
        fs::write(
            &encounter_path,
            concat!(
                "name = \"tmp\"\n",
                "[[units]]\n",
                "position = [1.0, 0.0, 1.0]\n",
                "profile_path = \"grunt.toml\"\n",
            ),
        )
        .expect("write encounter");

        let (encounter, units) = Encounter::load(&encounter_path).expect("encounter loads");
        assert_eq!(encounter.name, "tmp");
        assert_eq!(units[0].1.name, "grunt");
        assert_eq!(units[0].1.max_health, 40.0);
    }

    #[test]
    fn test_spawn_needs_one_profile_source() {
        let encounter = Encounter {
            units: vec![UnitSpawn {
                position: Vec3::ZERO,
                profile: None,
                profile_path: None,
                tracks_player: false,
            }],
            ..Encounter::default()
        };
        assert!(encounter.resolve(Path::new(".")).is_err());
        assert!(Encounter::default().resolve(Path::new(".")).is_err());
    }
}
