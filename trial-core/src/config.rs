//! Configuration for the trial spawner.
//!
//! Maps directly to `trial.toml`:
//!
//! ```toml
//! [general]
//! log_level = "info"
//!
//! [controller]
//! required_player_range = 14
//! target_cooldown_length = 36000
//! detector = "survival_players"
//!
//! [normal]
//! total_mobs = 6.0
//! simultaneous_mobs = 2.0
//!
//! [[normal.spawn_potentials]]
//! weight = 1
//! data = { entity = "zombie" }
//!
//! [ominous]
//! total_mobs = 12.0
//! ```
//!
//! Every field has a default, so a partial file is valid.

use serde::{Deserialize, Serialize};

use crate::detection::DetectorKind;
use crate::error::{Result, TrialError};
use crate::types::{LightLevels, LootTableId, Tick, Vec3};
use crate::weighted::WeightedList;

/// Ticks between two escalation bonus drops. Fixed, not configurable.
pub const TICKS_BETWEEN_ITEM_DROPS: Tick = 60;

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrialConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Settings shared by both profiles of one controller.
    #[serde(default)]
    pub controller: ControllerSettings,
    /// The normal encounter profile.
    #[serde(default)]
    pub normal: EncounterConfig,
    /// The escalated ("ominous") encounter profile.
    #[serde(default)]
    pub ominous: EncounterConfig,
    /// Snapshot persistence settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl TrialConfig {
    /// Load configuration from a TOML string and validate it.
    ///
    /// # Errors
    /// Returns [`TrialError::Config`] if the TOML is invalid, or
    /// [`TrialError::InvalidConfig`] if a value is out of range.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| TrialError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Check every numeric field of both profiles.
    ///
    /// # Errors
    /// Returns [`TrialError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        self.normal.validate("normal")?;
        self.ominous.validate("ominous")?;
        self.controller.validate()
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Per-controller settings that do not change with escalation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerSettings {
    /// Detection radius around the origin, in blocks.
    #[serde(default = "default_14")]
    pub required_player_range: u32,
    /// Length of the post-encounter cooldown, in ticks.
    #[serde(default = "default_36000")]
    pub target_cooldown_length: u32,
    /// Spawned entities farther than this from the origin are no longer tracked.
    #[serde(default = "default_47")]
    pub max_tracking_distance: u32,
    /// Which participants count.
    #[serde(default)]
    pub detector: DetectorKind,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            required_player_range: 14,
            target_cooldown_length: 36_000,
            max_tracking_distance: 47,
            detector: DetectorKind::default(),
        }
    }
}

impl ControllerSettings {
    /// Cooldown length as a tick delta.
    #[must_use]
    pub fn cooldown_ticks(&self) -> Tick {
        Tick::from(self.target_cooldown_length)
    }

    /// Detection radius as a float.
    #[must_use]
    pub fn player_range(&self) -> f64 {
        f64::from(self.required_player_range)
    }

    fn validate(&self) -> Result<()> {
        if self.required_player_range == 0 {
            return Err(invalid("controller.required_player_range", "must be positive"));
        }
        Ok(())
    }
}

/// One encounter profile: budgets, spawn candidates and rewards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterConfig {
    /// Horizontal radius around the origin in which spawns are placed.
    #[serde(default = "default_4")]
    pub spawn_range: u32,
    /// Lifetime spawn budget for a single participant.
    #[serde(default = "default_6_0")]
    pub total_mobs: f32,
    /// Concurrent spawn budget for a single participant.
    #[serde(default = "default_2_0")]
    pub simultaneous_mobs: f32,
    /// Extra lifetime budget per additional participant.
    #[serde(default = "default_2_0")]
    pub total_mobs_added_per_player: f32,
    /// Extra concurrent budget per additional participant.
    #[serde(default = "default_1_0")]
    pub simultaneous_mobs_added_per_player: f32,
    /// Minimum ticks between two spawns.
    #[serde(default = "default_40")]
    pub ticks_between_spawn: u32,
    /// Weighted pool of things to spawn.
    #[serde(default)]
    pub spawn_potentials: WeightedList<SpawnChoice>,
    /// Weighted pool of reward tables; one is drawn per ejection phase.
    #[serde(default = "default_reward_tables")]
    pub loot_tables_to_eject: WeightedList<LootTableId>,
    /// Table rolled for bonus drops while escalated.
    #[serde(default = "default_ominous_drops")]
    pub items_to_drop_when_ominous: LootTableId,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            spawn_range: 4,
            total_mobs: 6.0,
            simultaneous_mobs: 2.0,
            total_mobs_added_per_player: 2.0,
            simultaneous_mobs_added_per_player: 1.0,
            ticks_between_spawn: 40,
            spawn_potentials: WeightedList::new(),
            loot_tables_to_eject: default_reward_tables(),
            items_to_drop_when_ominous: default_ominous_drops(),
        }
    }
}

impl EncounterConfig {
    /// Spawn delay as a tick delta.
    #[must_use]
    pub fn spawn_delay(&self) -> Tick {
        Tick::from(self.ticks_between_spawn)
    }

    /// A copy of this profile whose spawn pool is exactly `choice`.
    #[must_use]
    pub fn with_spawn_candidate(&self, choice: SpawnChoice) -> Self {
        Self {
            spawn_potentials: WeightedList::single(choice),
            ..self.clone()
        }
    }

    fn validate(&self, profile: &str) -> Result<()> {
        let coefficients = [
            ("total_mobs", self.total_mobs),
            ("simultaneous_mobs", self.simultaneous_mobs),
            ("total_mobs_added_per_player", self.total_mobs_added_per_player),
            (
                "simultaneous_mobs_added_per_player",
                self.simultaneous_mobs_added_per_player,
            ),
        ];
        for (name, value) in coefficients {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(
                    &format!("{profile}.{name}"),
                    &format!("must be a finite number >= 0, got {value}"),
                ));
            }
        }
        if !self.spawn_potentials.is_empty() && self.spawn_potentials.total_weight() == 0 {
            return Err(invalid(
                &format!("{profile}.spawn_potentials"),
                "total weight must be positive",
            ));
        }
        Ok(())
    }
}

/// A pre-selected thing to spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnChoice {
    /// Host entity kind (e.g. `zombie`). Empty means "nothing to spawn".
    pub entity: String,
    /// Fixed spawn position; random around the origin when absent.
    #[serde(default)]
    pub position: Option<Vec3>,
    /// Equipment loot table applied by the host.
    #[serde(default)]
    pub equipment: Option<LootTableId>,
    /// Light restrictions at the spawn position.
    #[serde(default)]
    pub custom_spawn_rules: Option<CustomSpawnRules>,
}

impl SpawnChoice {
    /// A choice that spawns `entity` anywhere in range.
    #[must_use]
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            position: None,
            equipment: None,
            custom_spawn_rules: None,
        }
    }

    /// Whether this choice names an entity (and can be shown as a preview).
    #[must_use]
    pub fn has_entity(&self) -> bool {
        !self.entity.is_empty()
    }
}

/// Inclusive light ranges a spawn position must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomSpawnRules {
    /// Minimum block light.
    #[serde(default)]
    pub block_light_min: u8,
    /// Maximum block light.
    #[serde(default = "default_15_u8")]
    pub block_light_max: u8,
    /// Minimum sky light.
    #[serde(default)]
    pub sky_light_min: u8,
    /// Maximum sky light.
    #[serde(default = "default_15_u8")]
    pub sky_light_max: u8,
}

impl CustomSpawnRules {
    /// Whether `light` falls inside both ranges.
    #[must_use]
    pub fn permits(&self, light: LightLevels) -> bool {
        (self.block_light_min..=self.block_light_max).contains(&light.block)
            && (self.sky_light_min..=self.sky_light_max).contains(&light.sky)
    }
}

/// Snapshot persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Detect save corruption via checksums.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            wal_mode: true,
            checksum_enabled: true,
        }
    }
}

fn invalid(field: &str, reason: &str) -> TrialError {
    TrialError::InvalidConfig {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_1_0() -> f32 { 1.0 }
fn default_2_0() -> f32 { 2.0 }
fn default_6_0() -> f32 { 6.0 }
fn default_4() -> u32 { 4 }
fn default_14() -> u32 { 14 }
fn default_15_u8() -> u8 { 15 }
fn default_40() -> u32 { 40 }
fn default_47() -> u32 { 47 }
fn default_36000() -> u32 { 36_000 }

fn default_reward_tables() -> WeightedList<LootTableId> {
    WeightedList::new()
        .with(LootTableId::new("spawners/trial_chamber/consumables"), 1)
        .with(LootTableId::new("spawners/trial_chamber/key"), 1)
}

fn default_ominous_drops() -> LootTableId {
    LootTableId::new("spawners/trial_chamber/items_to_drop_when_ominous")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let config = TrialConfig::from_toml("").expect("parse");
        assert_eq!(config.controller.required_player_range, 14);
        assert_eq!(config.controller.target_cooldown_length, 36_000);
        assert_eq!(config.normal, EncounterConfig::default());
        assert!(config.normal.spawn_potentials.is_empty());
        assert_eq!(config.normal.loot_tables_to_eject.len(), 2);
    }

    #[test]
    fn parses_profiles_and_pools() {
        let toml_str = r#"
            [controller]
            required_player_range = 10
            detector = "including_creative_players"

            [normal]
            total_mobs = 4.0
            ticks_between_spawn = 20

            [[normal.spawn_potentials]]
            weight = 3
            data = { entity = "zombie" }

            [[normal.spawn_potentials]]
            data = { entity = "husk", custom_spawn_rules = { block_light_max = 7 } }

            [ominous]
            total_mobs = 8.0
            items_to_drop_when_ominous = "custom/ominous"
        "#;
        let config = TrialConfig::from_toml(toml_str).expect("parse");
        assert_eq!(config.controller.required_player_range, 10);
        assert_eq!(config.controller.detector, DetectorKind::IncludingCreativePlayers);
        assert!((config.normal.total_mobs - 4.0).abs() < f32::EPSILON);
        assert_eq!(config.normal.ticks_between_spawn, 20);
        assert_eq!(config.normal.spawn_potentials.len(), 2);
        assert_eq!(config.normal.spawn_potentials.total_weight(), 4);
        assert_eq!(config.ominous.items_to_drop_when_ominous.0, "custom/ominous");
    }

    #[test]
    fn negative_coefficient_is_rejected() {
        let err = TrialConfig::from_toml("[ominous]\ntotal_mobs_added_per_player = -1.0")
            .expect_err("should fail");
        match err {
            TrialError::InvalidConfig { field, .. } => {
                assert_eq!(field, "ominous.total_mobs_added_per_player");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_weight_pool_is_rejected() {
        let toml_str = r#"
            [[normal.spawn_potentials]]
            weight = 0
            data = { entity = "zombie" }
        "#;
        let err = TrialConfig::from_toml(toml_str).expect_err("should fail");
        match err {
            TrialError::InvalidConfig { field, .. } => assert_eq!(field, "normal.spawn_potentials"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let err = TrialConfig::from_toml("[normal\n").expect_err("should fail");
        assert!(matches!(err, TrialError::Config(_)));
    }

    #[test]
    fn zero_detection_range_is_rejected() {
        let err = TrialConfig::from_toml("[controller]\nrequired_player_range = 0")
            .expect_err("should fail");
        assert!(matches!(err, TrialError::InvalidConfig { .. }));
    }

    #[test]
    fn override_replaces_pool() {
        let config = EncounterConfig::default()
            .with_spawn_candidate(SpawnChoice::new("skeleton"));
        assert_eq!(config.spawn_potentials.len(), 1);
        assert_eq!(config.total_mobs, EncounterConfig::default().total_mobs);
    }

    #[test]
    fn light_rules_are_inclusive() {
        let rules = CustomSpawnRules {
            block_light_min: 0,
            block_light_max: 7,
            sky_light_min: 0,
            sky_light_max: 15,
        };
        assert!(rules.permits(LightLevels { block: 7, sky: 15 }));
        assert!(!rules.permits(LightLevels { block: 8, sky: 0 }));
    }
}
