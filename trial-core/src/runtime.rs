//! Mutable per-encounter record.
//!
//! Everything the controller must remember between ticks lives here, and the
//! whole record is persisted verbatim in snapshots. Caps are deliberately
//! *not* stored: they are recomputed from the detected set on every read.

use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::budget;
use crate::config::{EncounterConfig, SpawnChoice};
use crate::types::{BlockPos, EntityId, LootTableId, ParticipantId, Tick};

/// Runtime state of one encounter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncounterRuntime {
    /// Participants admitted to the current encounter. Empty when dormant.
    #[serde(default)]
    pub detected_players: BTreeSet<ParticipantId>,
    /// Spawned entities believed to be alive.
    #[serde(default)]
    pub current_mobs: BTreeSet<EntityId>,
    /// End of the cooldown; doubles as the bonus drop timer while escalated.
    #[serde(default)]
    pub cooldown_ends_at: Tick,
    /// Earliest tick for the next spawn.
    #[serde(default)]
    pub next_mob_spawns_at: Tick,
    /// Spawns performed in the current encounter.
    #[serde(default)]
    pub total_mobs_spawned: u32,
    /// Pre-selected next spawn, cached until used.
    #[serde(default)]
    pub next_spawn_data: Option<SpawnChoice>,
    /// Reward table drawn for the current ejection phase.
    #[serde(default)]
    pub ejecting_loot_table: Option<LootTableId>,
}

impl EncounterRuntime {
    /// A fresh, dormant record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget participants, spawns and counters. Keeps the cooldown timer and
    /// the cached spawn choice.
    pub fn reset_statistics(&mut self) {
        self.detected_players.clear();
        self.current_mobs.clear();
        self.total_mobs_spawned = 0;
        self.next_mob_spawns_at = 0;
    }

    /// Full reset back to the pre-encounter record.
    pub fn reset(&mut self) {
        self.reset_statistics();
        self.cooldown_ends_at = 0;
        self.next_spawn_data = None;
        self.ejecting_loot_table = None;
    }

    /// Participants beyond the first. An empty set clamps to zero and is
    /// logged, since this is only asked while an encounter is running.
    #[must_use]
    pub fn additional_participants(&self, origin: BlockPos) -> u32 {
        if self.detected_players.is_empty() {
            warn!(origin = %origin, "Encounter is running with no detected participants");
        }
        budget::additional_participants(self.detected_players.len())
    }

    /// Whether the lifetime budget is used up at the current participant count.
    ///
    /// A cap that dropped below the spawned total (participants left) counts
    /// as reached.
    #[must_use]
    pub fn has_finished_spawning(&self, config: &EncounterConfig, additional: u32) -> bool {
        self.total_mobs_spawned >= budget::total_cap(config, additional)
    }

    /// Whether every spawned entity is gone.
    #[must_use]
    pub fn all_mobs_gone(&self) -> bool {
        self.current_mobs.is_empty()
    }

    /// Spawn timer elapsed and a concurrent slot is free.
    #[must_use]
    pub fn is_ready_to_spawn_next(
        &self,
        config: &EncounterConfig,
        additional: u32,
        now: Tick,
    ) -> bool {
        now >= self.next_mob_spawns_at
            && self.current_mobs.len() < budget::concurrent_cap(config, additional) as usize
    }

    /// Whether the cooldown has run out.
    #[must_use]
    pub fn is_cooldown_finished(&self, now: Tick) -> bool {
        now >= self.cooldown_ends_at
    }

    /// Add participants; `true` if at least one was new.
    pub fn admit_participants<I>(&mut self, ids: I) -> bool
    where
        I: IntoIterator<Item = ParticipantId>,
    {
        let before = self.detected_players.len();
        self.detected_players.extend(ids);
        self.detected_players.len() > before
    }

    /// Consume one participant (lowest id first).
    pub fn take_next_participant(&mut self) -> Option<ParticipantId> {
        self.detected_players.pop_first()
    }

    /// Drop every tracked entity for which `is_lost` holds; returns how many.
    pub fn untrack_mobs<F>(&mut self, mut is_lost: F) -> usize
    where
        F: FnMut(EntityId) -> bool,
    {
        let before = self.current_mobs.len();
        self.current_mobs.retain(|id| !is_lost(*id));
        before - self.current_mobs.len()
    }

    /// The cached next spawn, drawing one from the pool if none is cached.
    pub fn get_or_create_next_spawn_data<R: Rng + ?Sized>(
        &mut self,
        config: &EncounterConfig,
        rng: &mut R,
    ) -> Option<&SpawnChoice> {
        if self.next_spawn_data.is_none() {
            self.next_spawn_data = config.spawn_potentials.select(rng).cloned();
        }
        self.next_spawn_data.as_ref()
    }

    /// Whether anything can be spawned at all.
    pub fn has_mob_to_spawn<R: Rng + ?Sized>(
        &mut self,
        config: &EncounterConfig,
        rng: &mut R,
    ) -> bool {
        let cached = self
            .get_or_create_next_spawn_data(config, rng)
            .is_some_and(SpawnChoice::has_entity);
        cached || config.spawn_potentials.total_weight() > 0
    }
}
