//! Host-side configuration: chamber presets and the simulation run file.
//!
//! A [`ChamberPreset`] names a themed pair of encounter profiles (normal and
//! ominous) the way a map designer would pick one per spawner. A
//! [`HostConfig`] describes one simulation run and maps to `simulate.toml`:
//!
//! ```toml
//! seed = 42
//! ticks = 6000
//! preset = "melee"
//! participants = 2
//! escalation = "none"
//! log_level = "info"
//! log_json = false
//! tick_budget_ms = 0.5
//! db_path = "encounters.db"
//!
//! [controller]
//! target_cooldown_length = 1200
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use trial_core::config::{ControllerSettings, CustomSpawnRules, EncounterConfig, SpawnChoice};
use trial_core::error::{Result, TrialError};
use trial_core::host::EscalationStatus;
use trial_core::types::LootTableId;
use trial_core::weighted::WeightedList;

// ---------------------------------------------------------------------------
// Chamber presets
// ---------------------------------------------------------------------------

/// Themed spawner configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChamberPreset {
    /// Zombies and husks.
    #[default]
    Melee,
    /// Spiders, cave spiders and silverfish.
    SmallMelee,
    /// Skeletons, strays and bogged.
    Ranged,
    /// Slimes in dark corridors.
    Slow,
    /// A lone breeze.
    Breeze,
}

impl ChamberPreset {
    /// Every preset.
    pub const ALL: [Self; 5] = [
        Self::Melee,
        Self::SmallMelee,
        Self::Ranged,
        Self::Slow,
        Self::Breeze,
    ];

    /// Short human-readable description.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Melee => "Melee: zombies and husks",
            Self::SmallMelee => "Small melee: spiders and silverfish",
            Self::Ranged => "Ranged: skeletons and their variants",
            Self::Slow => "Slow: slimes, dark spawns only",
            Self::Breeze => "Breeze: one wind-charging breeze",
        }
    }

    /// The normal profile.
    #[must_use]
    pub fn normal(self) -> EncounterConfig {
        let mut config = EncounterConfig {
            spawn_potentials: self.pool(),
            ..EncounterConfig::default()
        };
        match self {
            Self::Melee | Self::SmallMelee => {}
            Self::Ranged => {
                config.ticks_between_spawn = 60;
            }
            Self::Slow => {
                config.total_mobs = 4.0;
                config.simultaneous_mobs = 1.0;
                config.ticks_between_spawn = 80;
            }
            Self::Breeze => {
                config.total_mobs = 2.0;
                config.simultaneous_mobs = 1.0;
                config.total_mobs_added_per_player = 1.0;
                config.simultaneous_mobs_added_per_player = 0.5;
                config.ticks_between_spawn = 20;
            }
        }
        config
    }

    /// The ominous profile: larger budgets, faster spawns, better rewards.
    #[must_use]
    pub fn ominous(self) -> EncounterConfig {
        let normal = self.normal();
        let equipment = match self {
            Self::Ranged => Some(LootTableId::new("equipment/trial_chamber_ranged")),
            Self::Melee => Some(LootTableId::new("equipment/trial_chamber_melee")),
            Self::SmallMelee | Self::Slow | Self::Breeze => None,
        };
        let spawn_potentials = normal
            .spawn_potentials
            .iter()
            .map(|w| {
                let mut choice = w.data.clone();
                choice.equipment.clone_from(&equipment);
                (choice, w.weight)
            })
            .collect();
        EncounterConfig {
            total_mobs: normal.total_mobs * 1.5,
            simultaneous_mobs: normal.simultaneous_mobs + 2.0,
            simultaneous_mobs_added_per_player: normal.simultaneous_mobs_added_per_player + 0.5,
            ticks_between_spawn: normal.ticks_between_spawn.min(40) / 2,
            spawn_potentials,
            loot_tables_to_eject: WeightedList::new()
                .with(LootTableId::new("spawners/ominous/trial_chamber/consumables"), 1)
                .with(LootTableId::new("spawners/ominous/trial_chamber/key"), 1),
            ..normal
        }
    }

    /// Both profiles, shared.
    #[must_use]
    pub fn profiles(self) -> (Arc<EncounterConfig>, Arc<EncounterConfig>) {
        (Arc::new(self.normal()), Arc::new(self.ominous()))
    }

    fn pool(self) -> WeightedList<SpawnChoice> {
        match self {
            Self::Melee => WeightedList::new()
                .with(SpawnChoice::new("zombie"), 3)
                .with(SpawnChoice::new("husk"), 1),
            Self::SmallMelee => WeightedList::new()
                .with(SpawnChoice::new("spider"), 2)
                .with(SpawnChoice::new("cave_spider"), 1)
                .with(SpawnChoice::new("silverfish"), 1),
            Self::Ranged => WeightedList::new()
                .with(SpawnChoice::new("skeleton"), 2)
                .with(SpawnChoice::new("stray"), 1)
                .with(SpawnChoice::new("bogged"), 1),
            Self::Slow => {
                let dark = CustomSpawnRules {
                    block_light_min: 0,
                    block_light_max: 7,
                    sky_light_min: 0,
                    sky_light_max: 15,
                };
                let mut slime = SpawnChoice::new("slime");
                slime.custom_spawn_rules = Some(dark);
                WeightedList::single(slime)
            }
            Self::Breeze => WeightedList::single(SpawnChoice::new("breeze")),
        }
    }
}

// ---------------------------------------------------------------------------
// Simulation run configuration
// ---------------------------------------------------------------------------

/// One simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Seed for every controller's random source.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// How many ticks to run.
    #[serde(default = "default_ticks")]
    pub ticks: u32,
    /// Which chamber to build.
    #[serde(default)]
    pub preset: ChamberPreset,
    /// How many participants walk in.
    #[serde(default = "default_participants")]
    pub participants: u32,
    /// Escalation status the first participant carries.
    #[serde(default)]
    pub escalation: EscalationStatus,
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON objects instead of compact text.
    #[serde(default)]
    pub log_json: bool,
    /// Warn when one registry tick exceeds this many milliseconds.
    #[serde(default = "default_tick_budget_ms")]
    pub tick_budget_ms: f64,
    /// Persist every controller here at the end of the run.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    /// Controller settings shared by every spawner in the run.
    #[serde(default)]
    pub controller: ControllerSettings,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            ticks: default_ticks(),
            preset: ChamberPreset::default(),
            participants: default_participants(),
            escalation: EscalationStatus::None,
            log_level: default_log_level(),
            log_json: false,
            tick_budget_ms: default_tick_budget_ms(),
            db_path: None,
            controller: ControllerSettings::default(),
        }
    }
}

impl HostConfig {
    /// Parse and validate a run file.
    ///
    /// # Errors
    /// Returns [`TrialError::Config`] for malformed TOML and
    /// [`TrialError::InvalidConfig`] for out-of-range values.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| TrialError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a run file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// Returns [`TrialError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.participants == 0 {
            return Err(TrialError::InvalidConfig {
                field: "participants".to_string(),
                reason: "at least one participant is needed".to_string(),
            });
        }
        if !self.tick_budget_ms.is_finite() || self.tick_budget_ms <= 0.0 {
            return Err(TrialError::InvalidConfig {
                field: "tick_budget_ms".to_string(),
                reason: format!("must be positive, got {}", self.tick_budget_ms),
            });
        }
        Ok(())
    }
}

fn default_seed() -> u64 {
    42
}
fn default_ticks() -> u32 {
    6_000
}
fn default_participants() -> u32 {
    1
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_tick_budget_ms() -> f64 {
    0.5
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
