//! The encounter state machine.
//!
//! Each state knows how to advance itself by one tick: [`EncounterState`] is a
//! plain `Copy` value, and `tick_and_next` receives the controller by mutable
//! reference, performs the state's side effects on its runtime and returns the
//! next state.
//!
//! ```text
//! Inactive ─► WaitingForParticipants ─► Active ─► WaitingForRewardEjection
//!    ▲                 ▲                  ▲                  │
//!    │                 │                  │                  ▼
//!    └── (no candidate)└──── Cooldown ◄───┴────────── EjectingReward
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::controller::TrialSpawner;
use crate::detection;
use crate::ejection;
use crate::host::{EncounterCue, EncounterHost};
use crate::metrics;
use crate::ominous;
use crate::types::Tick;

/// Particle hint for hosts mirroring the controller visually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleEmission {
    /// Nothing.
    None,
    /// Small flames inside the block.
    SmallFlames,
    /// Flames and smoke.
    FlamesAndSmoke,
    /// Smoke inside and on the top face.
    SmokeInsideAndTopFace,
}

/// Lifecycle state of an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterState {
    /// No spawn candidate is available.
    #[default]
    Inactive,
    /// Dormant, scanning for participants.
    WaitingForParticipants,
    /// Spawning until the budget is spent and everything is dead.
    Active,
    /// Encounter won; waiting for the reward shutter to open.
    WaitingForRewardEjection,
    /// Handing out one reward per participant.
    EjectingReward,
    /// Waiting for the cooldown to run out.
    Cooldown,
}

impl EncounterState {
    /// Every state, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Inactive,
        Self::WaitingForParticipants,
        Self::Active,
        Self::WaitingForRewardEjection,
        Self::EjectingReward,
        Self::Cooldown,
    ];

    /// Light level a host should give the controller block.
    #[must_use]
    pub const fn light_level(self) -> u8 {
        match self {
            Self::Inactive | Self::Cooldown => 0,
            Self::WaitingForParticipants => 4,
            Self::Active | Self::WaitingForRewardEjection | Self::EjectingReward => 8,
        }
    }

    /// Whether the state may lead to spawns; hosts use it for the preview.
    #[must_use]
    pub const fn is_capable_of_spawning(self) -> bool {
        matches!(self, Self::WaitingForParticipants | Self::Active)
    }

    /// Particle hint for this state.
    #[must_use]
    pub const fn particle_emission(self) -> ParticleEmission {
        match self {
            Self::Inactive => ParticleEmission::None,
            Self::WaitingForParticipants
            | Self::WaitingForRewardEjection
            | Self::EjectingReward => ParticleEmission::SmallFlames,
            Self::Active => ParticleEmission::FlamesAndSmoke,
            Self::Cooldown => ParticleEmission::SmokeInsideAndTopFace,
        }
    }

    /// Stable snake_case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::WaitingForParticipants => "waiting_for_participants",
            Self::Active => "active",
            Self::WaitingForRewardEjection => "waiting_for_reward_ejection",
            Self::EjectingReward => "ejecting_reward",
            Self::Cooldown => "cooldown",
        }
    }

    /// Run this state's tick against `spawner` and return the next state.
    pub(crate) fn tick_and_next<H: EncounterHost>(
        self,
        spawner: &mut TrialSpawner,
        host: &mut H,
        now: Tick,
    ) -> Self {
        match self {
            Self::Inactive => tick_inactive(spawner),
            Self::WaitingForParticipants => tick_waiting(spawner, host, now),
            Self::Active => tick_active(spawner, host, now),
            Self::WaitingForRewardEjection => tick_waiting_for_ejection(spawner, host, now),
            Self::EjectingReward => tick_ejecting(spawner, host, now),
            Self::Cooldown => tick_cooldown(spawner, host, now),
        }
    }
}

impl fmt::Display for EncounterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Per-state ticks
// ---------------------------------------------------------------------------

fn tick_inactive(spawner: &mut TrialSpawner) -> EncounterState {
    if spawner.display_choice().is_some() {
        EncounterState::WaitingForParticipants
    } else {
        EncounterState::Inactive
    }
}

fn tick_waiting<H: EncounterHost>(spawner: &mut TrialSpawner, host: &mut H, now: Tick) -> EncounterState {
    if !host.spawning_enabled() {
        spawner.runtime.reset_statistics();
        return EncounterState::WaitingForParticipants;
    }
    if !spawner.has_mob_to_spawn() {
        return EncounterState::Inactive;
    }
    detection::try_detect(spawner, host, now);
    if spawner.runtime.detected_players.is_empty() {
        EncounterState::WaitingForParticipants
    } else {
        EncounterState::Active
    }
}

fn tick_active<H: EncounterHost>(spawner: &mut TrialSpawner, host: &mut H, now: Tick) -> EncounterState {
    if !host.spawning_enabled() {
        spawner.runtime.reset_statistics();
        return EncounterState::WaitingForParticipants;
    }
    if !spawner.has_mob_to_spawn() {
        return EncounterState::Inactive;
    }

    // Budgets use the participant count from before this tick's scan.
    let additional = spawner.runtime.additional_participants(spawner.origin);
    detection::try_detect(spawner, host, now);
    if spawner.is_ominous {
        ominous::try_bonus_drop(spawner, host, now);
    }

    let config = spawner.active_profile();
    if spawner.runtime.has_finished_spawning(&config, additional) {
        if spawner.runtime.all_mobs_gone() {
            let runtime = &mut spawner.runtime;
            runtime.cooldown_ends_at = now + spawner.settings.cooldown_ticks();
            runtime.total_mobs_spawned = 0;
            runtime.next_mob_spawns_at = 0;
            metrics::counters().record_encounter_completed();
            info!(
                origin = %spawner.origin,
                ominous = spawner.is_ominous,
                participants = runtime.detected_players.len(),
                tick = now,
                "Encounter completed"
            );
            return EncounterState::WaitingForRewardEjection;
        }
    } else if spawner.runtime.is_ready_to_spawn_next(&config, additional, now) {
        if let Some(entity) = spawner.spawn_mob(host) {
            let runtime = &mut spawner.runtime;
            runtime.current_mobs.insert(entity);
            runtime.total_mobs_spawned += 1;
            runtime.next_mob_spawns_at = now + config.spawn_delay();
            if let Some(next) = config.spawn_potentials.select(&mut spawner.rng) {
                runtime.next_spawn_data = Some(next.clone());
            }
        }
    }
    EncounterState::Active
}

fn tick_waiting_for_ejection<H: EncounterHost>(
    spawner: &mut TrialSpawner,
    host: &mut H,
    now: Tick,
) -> EncounterState {
    let target = spawner.settings.cooldown_ticks();
    if ejection::is_ready_to_open_shutter(spawner.runtime.cooldown_ends_at, target, now) {
        host.emit(spawner.reference(), EncounterCue::ShutterOpened);
        EncounterState::EjectingReward
    } else {
        EncounterState::WaitingForRewardEjection
    }
}

fn tick_ejecting<H: EncounterHost>(spawner: &mut TrialSpawner, host: &mut H, now: Tick) -> EncounterState {
    let target = spawner.settings.cooldown_ticks();
    if !ejection::is_ready_to_eject(spawner.runtime.cooldown_ends_at, target, now) {
        return EncounterState::EjectingReward;
    }

    let source = spawner.reference();
    if spawner.runtime.detected_players.is_empty() {
        host.emit(source, EncounterCue::ShutterClosed);
        spawner.runtime.ejecting_loot_table = None;
        return EncounterState::Cooldown;
    }

    if spawner.runtime.ejecting_loot_table.is_none() {
        let config = spawner.active_profile();
        spawner.runtime.ejecting_loot_table =
            config.loot_tables_to_eject.select(&mut spawner.rng).cloned();
    }
    if let Some(table) = spawner.runtime.ejecting_loot_table.clone() {
        host.eject_loot(&table, spawner.origin);
        host.emit(source, EncounterCue::RewardEjected { table: table.clone() });
        metrics::counters().record_reward_ejected();
        debug!(origin = %spawner.origin, table = %table, "Reward ejected");
    }
    spawner.runtime.take_next_participant();
    EncounterState::EjectingReward
}

fn tick_cooldown<H: EncounterHost>(spawner: &mut TrialSpawner, host: &mut H, now: Tick) -> EncounterState {
    detection::try_detect(spawner, host, now);
    if !spawner.runtime.detected_players.is_empty() {
        spawner.runtime.total_mobs_spawned = 0;
        spawner.runtime.next_mob_spawns_at = 0;
        return EncounterState::Active;
    }
    if spawner.runtime.is_cooldown_finished(now) {
        ominous::clear_ominous(spawner, host);
        spawner.runtime.reset();
        return EncounterState::WaitingForParticipants;
    }
    EncounterState::Cooldown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_levels_follow_lifecycle() {
        let levels: Vec<u8> = EncounterState::ALL.iter().map(|s| s.light_level()).collect();
        assert_eq!(levels, vec![0, 4, 8, 8, 8, 0]);
    }

    #[test]
    fn only_waiting_and_active_can_spawn() {
        let capable: Vec<EncounterState> = EncounterState::ALL
            .into_iter()
            .filter(|s| s.is_capable_of_spawning())
            .collect();
        assert_eq!(
            capable,
            vec![EncounterState::WaitingForParticipants, EncounterState::Active]
        );
    }

    #[test]
    fn serde_name_matches_display() {
        for state in EncounterState::ALL {
            let json = serde_json::to_string(&state).expect("serialize");
            assert_eq!(json, format!("\"{state}\""));
        }
    }
}
