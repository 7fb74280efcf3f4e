//! Host interfaces.
//!
//! The controller never touches a world directly. Participant queries,
//! visibility, spawning and loot all go through two traits the embedding game
//! implements:
//!
//! - [`WorldQuery`]: read-only queries (also what detectors see)
//! - [`EncounterHost`]: mutating callbacks and advisory notifications
//!
//! Callbacks receive an [`EncounterRef`] identifying the calling controller
//! instead of the controller itself, so hosts can route feedback without
//! holding a reference into the controller.

use serde::{Deserialize, Serialize};

use crate::config::SpawnChoice;
use crate::state::EncounterState;
use crate::types::{
    BlockPos, EncounterId, EntityId, LightLevels, LootTableId, ParticipantId, Vec3,
};

/// Back-reference to the controller that issued a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncounterRef {
    /// Controller identity.
    pub id: EncounterId,
    /// Block the controller is anchored to.
    pub origin: BlockPos,
}

/// How a participant takes part in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantMode {
    /// Normal play; always eligible.
    #[default]
    Survival,
    /// Building mode; eligible only for permissive detectors.
    Creative,
    /// Observing; never eligible.
    Spectator,
}

/// Escalation-eligible status carried by a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationStatus {
    /// No status.
    #[default]
    None,
    /// Weaker tier: upgraded (and consumed) by the host when it escalates.
    Weak,
    /// Stronger tier: escalates immediately.
    Strong,
}

/// What the controller can see of a participant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticipantView {
    /// Participant identity.
    pub id: ParticipantId,
    /// Feet position.
    pub position: Vec3,
    /// Eye position, used for line of sight.
    pub eye_position: Vec3,
    /// Bounding box height.
    pub height: f32,
    /// Game mode.
    pub mode: ParticipantMode,
    /// Whether the participant is alive.
    pub alive: bool,
    /// Escalation-eligible status.
    pub escalation: EscalationStatus,
}

impl ParticipantView {
    /// Block the participant stands in.
    #[must_use]
    pub fn block_position(&self) -> BlockPos {
        BlockPos::containing(self.position)
    }
}

/// What the controller can see of a spawned entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityView {
    /// Feet position.
    pub position: Vec3,
    /// Bounding box height.
    pub height: f32,
    /// Whether the entity is alive.
    pub alive: bool,
}

/// A spawn the controller would like the host to perform.
#[derive(Debug, Clone, Copy)]
pub struct SpawnRequest<'a> {
    /// Requesting controller.
    pub source: EncounterRef,
    /// What to spawn.
    pub choice: &'a SpawnChoice,
    /// Where to spawn it.
    pub position: Vec3,
    /// Whether the encounter is escalated (hosts may apply ominous gear).
    pub ominous: bool,
}

/// Advisory feedback for visual/audio mirroring. Fire-and-forget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EncounterCue {
    /// New participants were admitted.
    ParticipantsDetected {
        /// Size of the detected set after admission.
        count: usize,
        /// Whether the encounter is escalated.
        ominous: bool,
    },
    /// An entity was spawned.
    MobSpawned {
        /// The new entity.
        entity: EntityId,
        /// Where it appeared.
        position: Vec3,
    },
    /// A participant's status triggered escalation.
    EscalationTriggered {
        /// The participant whose status was used.
        participant: ParticipantId,
        /// Their eye position.
        position: Vec3,
    },
    /// The encounter switched to the ominous profile.
    BecameOminous,
    /// The encounter switched back to the normal profile.
    OminousCleared,
    /// A tracked entity was discarded by an escalation or destruction.
    MobDiscarded {
        /// The discarded entity.
        entity: EntityId,
    },
    /// The reward mechanism opened.
    ShutterOpened,
    /// One reward was ejected.
    RewardEjected {
        /// Table the reward came from.
        table: LootTableId,
    },
    /// The reward mechanism closed.
    ShutterClosed,
    /// A bonus drop started materializing.
    BonusDropStarted {
        /// Where it will appear.
        position: Vec3,
    },
}

/// Read-only world queries.
pub trait WorldQuery {
    /// Host policy gate: spawning allowed at all (difficulty, rules).
    fn spawning_enabled(&self) -> bool;

    /// Participants whose position lies within `radius` of `center`.
    ///
    /// Hosts may over-approximate; detectors apply the exact range check.
    fn participants_within(&self, center: Vec3, radius: f64) -> Vec<ParticipantView>;

    /// Look up one participant.
    fn participant(&self, id: ParticipantId) -> Option<ParticipantView>;

    /// Look up one spawned entity. `None` when the host no longer knows it.
    fn entity(&self, id: EntityId) -> Option<EntityView>;

    /// First blocking block on the segment `from → to`, or the block
    /// containing `to` when nothing blocks.
    fn clip(&self, from: Vec3, to: Vec3) -> BlockPos;

    /// Whether the block has a collision shape.
    fn has_collision(&self, pos: BlockPos) -> bool;

    /// Light levels at a block.
    fn light_at(&self, pos: BlockPos) -> LightLevels;

    /// Whether `to` is visible from `from`.
    fn has_line_of_sight(&self, from: Vec3, to: Vec3) -> bool {
        self.clip(from, to) == BlockPos::containing(to)
    }
}

/// Mutating host callbacks.
pub trait EncounterHost: WorldQuery {
    /// Spawn an entity. `None` on refusal (collision, placement rules);
    /// refusals are retried on a later tick.
    fn try_spawn(&mut self, request: &SpawnRequest<'_>) -> Option<EntityId>;

    /// Remove a spawned entity from the world.
    fn despawn(&mut self, id: EntityId);

    /// Eject one reward rolled from `table` at `origin`.
    fn eject_loot(&mut self, table: &LootTableId, origin: BlockPos);

    /// Materialize a bonus drop from `table` at `position`. `false` when
    /// nothing was created.
    fn spawn_bonus_drop(&mut self, table: &LootTableId, position: Vec3) -> bool;

    /// Upgrade a participant's weak escalation status into the strong one,
    /// consuming the weak one.
    fn upgrade_escalation_status(&mut self, id: ParticipantId);

    /// Whether a spawned entity is still alive. Tracked entities the host
    /// reports dead are untracked on the next tick.
    fn is_alive(&self, id: EntityId) -> bool {
        self.entity(id).is_some_and(|e| e.alive)
    }

    /// The controller changed state.
    fn notify_state_changed(
        &mut self,
        _source: EncounterRef,
        _old: EncounterState,
        _new: EncounterState,
    ) {
    }

    /// Advisory feedback.
    fn emit(&mut self, _source: EncounterRef, _cue: EncounterCue) {}
}

// ---------------------------------------------------------------------------
// Test stub
// ---------------------------------------------------------------------------
