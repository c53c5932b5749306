//! Unit profiles.
//!
//! A profile is the designer-facing description of one enemy or boss: stats,
//! sensing, which branches it runs and, for bosses, how its health bar is split
//! into phases. Profiles are TOML and are validated before any unit is built.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;
use umbra_common::{ConfigError, ConfigResult};

use crate::boss::BossConfig;
use crate::branches::{AggressiveConfig, BranchSet, PassiveConfig};
use crate::collab::LootTier;
use crate::sensing::SensorConfig;

/// Designer description of one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitProfile {
    /// Display name, used in logs
    pub name: String,
    /// Full health
    pub max_health: f32,
    /// Movement speed handed to the navigator
    pub move_speed: f32,
    /// Pause before the first aggressive sequence acts
    pub engage_delay: f32,
    /// Loot dropped on death by a regular enemy
    pub loot: Option<LootTier>,
    /// Seed of the unit's random source (unit id when unset)
    pub seed: Option<u64>,
    /// Target sensing
    pub sensor: SensorConfig,
    /// Branch run while a target is held
    pub aggressive: AggressiveConfig,
    /// Branch run otherwise
    pub passive: PassiveConfig,
    /// Boss only: aggressive branch per phase, the last entry covering any
    /// later phases. Empty means `aggressive` in every phase.
    pub phases: Vec<AggressiveConfig>,
    /// Makes the unit a boss
    pub boss: Option<BossConfig>,
}

impl Default for UnitProfile {
    fn default() -> Self {
        Self {
            name: "enemy".to_string(),
            max_health: 100.0,
            move_speed: 3.5,
            engage_delay: 0.0,
            loot: Some(LootTier::Common),
            seed: None,
            sensor: SensorConfig::default(),
            aggressive: AggressiveConfig::default(),
            passive: PassiveConfig::default(),
            phases: Vec::new(),
            boss: None,
        }
    }
}

impl UnitProfile {
    /// Parses and validates a profile.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let profile: Self = toml::from_str(source)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Reads, parses and validates a profile file.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let profile = Self::from_toml_str(&source)?;
        info!("Loaded unit profile '{}' from {}", profile.name, path.display());
        Ok(profile)
    }

    /// Checks every section.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.max_health > 0.0) {
            return Err(ConfigError::invalid("max_health", "must be > 0"));
        }
        if !(self.move_speed > 0.0) {
            return Err(ConfigError::invalid("move_speed", "must be > 0"));
        }
        if self.engage_delay < 0.0 {
            return Err(ConfigError::invalid("engage_delay", "must be >= 0"));
        }
        self.sensor.validate()?;
        self.aggressive.validate()?;
        self.passive.validate()?;
        for phase in &self.phases {
            phase.validate()?;
        }
        match &self.boss {
            Some(boss) => boss.validate()?,
            None if !self.phases.is_empty() => {
                return Err(ConfigError::invalid(
                    "phases",
                    "per-phase branches need a [boss] section",
                ));
            }
            None => {}
        }
        Ok(())
    }

    /// Whether the profile describes a boss.
    #[must_use]
    pub fn is_boss(&self) -> bool {
        self.boss.is_some()
    }

    /// Builds one branch set per phase (one set for regular enemies).
    pub fn branch_sets(&self) -> ConfigResult<Vec<BranchSet>> {
        if self.phases.is_empty() {
            return Ok(vec![BranchSet::from_config(&self.aggressive, &self.passive)?]);
        }
        self.phases
            .iter()
            .map(|aggressive| BranchSet::from_config(aggressive, &self.passive))
            .collect()
    }
}
