//! World events recorded by the reference host.
//!
//! Every callback the controller makes into [`SimWorld`](crate::world::SimWorld)
//! is appended here, stamped with the world time, so tests and the simulation
//! binary can inspect what happened without hooking the controller.

use serde::Serialize;

use trial_core::host::{EncounterCue, EncounterRef};
use trial_core::state::EncounterState;
use trial_core::types::{BlockPos, EntityId, LootTableId, ParticipantId, Tick, Vec3};

/// Something that happened in the world.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorldEvent {
    /// An encounter spawned an entity.
    Spawned {
        source: EncounterRef,
        entity: EntityId,
        kind: String,
        position: Vec3,
        ominous: bool,
    },
    /// A spawn request was refused by placement rules.
    SpawnRefused {
        source: EncounterRef,
        kind: String,
        position: Vec3,
    },
    /// An entity was removed without dying.
    Despawned { entity: EntityId },
    /// A participant killed an entity.
    Killed {
        entity: EntityId,
        by: ParticipantId,
    },
    /// A reward was ejected.
    LootEjected { origin: BlockPos, table: LootTableId },
    /// A bonus drop was placed.
    BonusDrop { table: LootTableId, position: Vec3 },
    /// A weak escalation status was upgraded.
    StatusUpgraded { participant: ParticipantId },
    /// A controller changed state.
    StateChanged {
        source: EncounterRef,
        old: EncounterState,
        new: EncounterState,
    },
    /// Advisory feedback from a controller.
    Cue {
        source: EncounterRef,
        cue: EncounterCue,
    },
}

/// A [`WorldEvent`] with the tick it happened on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StampedEvent {
    /// World time.
    pub tick: Tick,
    /// What happened.
    #[serde(flatten)]
    pub event: WorldEvent,
}

/// Append-only event log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<StampedEvent>,
}

impl EventLog {
    /// Record an event.
    pub fn push(&mut self, tick: Tick, event: WorldEvent) {
        self.events.push(StampedEvent { tick, event });
    }

    /// All events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &StampedEvent> {
        self.events.iter()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Count events matching `pred`.
    pub fn count(&self, pred: impl Fn(&WorldEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(&e.event)).count()
    }

    /// Every state change, in order.
    #[must_use]
    pub fn transitions(&self) -> Vec<(EncounterState, EncounterState)> {
        self.events
            .iter()
            .filter_map(|e| match e.event {
                WorldEvent::StateChanged { old, new, .. } => Some((old, new)),
                _ => None,
            })
            .collect()
    }

    /// Take every event, leaving the log empty.
    pub fn drain(&mut self) -> Vec<StampedEvent> {
        std::mem::take(&mut self.events)
    }

    /// One JSON object per line.
    ///
    /// # Errors
    /// Returns an error if an event cannot be encoded.
    pub fn to_json_lines(&self) -> serde_json::Result<String> {
        let mut out = String::new();
        for event in &self.events {
            out.push_str(&serde_json::to_string(event)?);
            out.push('\n');
        }
        Ok(out)
    }
}
