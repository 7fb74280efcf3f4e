//! A flat, obstacle-free host shared by the integration and property tests.

// Each test crate compiles this module on its own and uses a subset of it.
#![allow(dead_code)]

use std::collections::BTreeMap;

use trial_core::host::{
    EncounterCue, EncounterHost, EncounterRef, EntityView, EscalationStatus, ParticipantMode,
    ParticipantView, SpawnRequest, WorldQuery,
};
use trial_core::state::EncounterState;
use trial_core::types::{BlockPos, EntityId, LightLevels, LootTableId, ParticipantId, Vec3};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct OpenField {
    pub participants: BTreeMap<ParticipantId, ParticipantView>,
    pub entities: BTreeMap<EntityId, EntityView>,
    pub despawn_calls: Vec<EntityId>,
    pub ejected: Vec<LootTableId>,
    pub transitions: Vec<(EncounterState, EncounterState)>,
    pub cues: Vec<EncounterCue>,
    next_entity: u128,
}

impl OpenField {
    pub fn join(&mut self, n: u128) -> ParticipantId {
        self.join_with(n, EscalationStatus::None)
    }

    pub fn join_with(&mut self, n: u128, escalation: EscalationStatus) -> ParticipantId {
        let id = ParticipantId(Uuid::from_u128(n));
        let position = Vec3::new(3.0, 0.0, 3.0);
        self.participants.insert(
            id,
            ParticipantView {
                id,
                position,
                eye_position: position.up(1.62),
                height: 1.8,
                mode: ParticipantMode::Survival,
                alive: true,
                escalation,
            },
        );
        id
    }

    pub fn leave(&mut self, id: ParticipantId) {
        self.participants.remove(&id);
    }

    pub fn kill_all(&mut self) {
        for view in self.entities.values_mut() {
            view.alive = false;
        }
    }

    pub fn alive_count(&self) -> usize {
        self.entities.values().filter(|e| e.alive).count()
    }
}

impl WorldQuery for OpenField {
    fn spawning_enabled(&self) -> bool {
        true
    }

    fn participants_within(&self, center: Vec3, radius: f64) -> Vec<ParticipantView> {
        self.participants
            .values()
            .filter(|p| p.position.distance_sqr(center) <= radius * radius)
            .copied()
            .collect()
    }

    fn participant(&self, id: ParticipantId) -> Option<ParticipantView> {
        self.participants.get(&id).copied()
    }

    fn entity(&self, id: EntityId) -> Option<EntityView> {
        self.entities.get(&id).copied()
    }

    fn clip(&self, _from: Vec3, to: Vec3) -> BlockPos {
        BlockPos::containing(to)
    }

    fn has_collision(&self, _pos: BlockPos) -> bool {
        false
    }

    fn light_at(&self, _pos: BlockPos) -> LightLevels {
        LightLevels { block: 0, sky: 0 }
    }
}

impl EncounterHost for OpenField {
    fn try_spawn(&mut self, request: &SpawnRequest<'_>) -> Option<EntityId> {
        self.next_entity += 1;
        let id = EntityId(Uuid::from_u128(self.next_entity));
        self.entities.insert(
            id,
            EntityView {
                position: request.position,
                height: 1.95,
                alive: true,
            },
        );
        Some(id)
    }

    fn despawn(&mut self, id: EntityId) {
        self.entities.remove(&id);
        self.despawn_calls.push(id);
    }

    fn eject_loot(&mut self, table: &LootTableId, _origin: BlockPos) {
        self.ejected.push(table.clone());
    }

    fn spawn_bonus_drop(&mut self, _table: &LootTableId, _position: Vec3) -> bool {
        true
    }

    fn upgrade_escalation_status(&mut self, id: ParticipantId) {
        if let Some(p) = self.participants.get_mut(&id) {
            p.escalation = EscalationStatus::Strong;
        }
    }

    fn notify_state_changed(&mut self, _source: EncounterRef, old: EncounterState, new: EncounterState) {
        self.transitions.push((old, new));
    }

    fn emit(&mut self, _source: EncounterRef, cue: EncounterCue) {
        self.cues.push(cue);
    }
}
