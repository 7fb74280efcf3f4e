//! A small voxel world implementing the controller's host traits.
//!
//! Geometry is a set of solid blocks; everything else is air. Light is a
//! per-block override map on top of a world default. Participants are plain
//! records the caller moves around, and spawned entities walk toward the
//! nearest participant and die on contact during [`SimWorld::simulate_combat`].
//!
//! The world is deliberately dumb: it exists so a [`TrialSpawner`] can be
//! driven end to end, not to model a game.
//!
//! [`TrialSpawner`]: trial_core::controller::TrialSpawner

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::trace;
use uuid::Uuid;

use trial_core::host::{
    EncounterCue, EncounterHost, EncounterRef, EntityView, EscalationStatus, ParticipantMode,
    ParticipantView, SpawnRequest, WorldQuery,
};
use trial_core::state::EncounterState;
use trial_core::types::{
    BlockPos, EntityId, LightLevels, LootTableId, ParticipantId, Tick, Vec3,
};

use crate::events::{EventLog, WorldEvent};

/// Ray sampling step used by [`WorldQuery::clip`], in blocks.
const CLIP_STEP: f64 = 0.1;

/// Eye height above the feet for participants.
const EYE_HEIGHT: f64 = 1.62;

/// An entity spawned by an encounter.
#[derive(Debug, Clone, PartialEq)]
pub struct SimEntity {
    /// Entity kind, as named by the spawn choice.
    pub kind: String,
    /// Feet position.
    pub position: Vec3,
    /// Bounding box height.
    pub height: f32,
    /// Whether it is still alive.
    pub alive: bool,
    /// Spawned while the encounter was escalated.
    pub ominous: bool,
    /// The encounter that spawned it.
    pub source: EncounterRef,
}

/// Bounding box height by entity kind.
#[must_use]
pub fn entity_height(kind: &str) -> f32 {
    match kind {
        "spider" => 0.9,
        "cave_spider" => 0.5,
        "slime" => 0.52,
        "silverfish" => 0.3,
        "breeze" => 1.77,
        "skeleton" | "stray" | "bogged" => 1.99,
        _ => 1.95,
    }
}

/// The reference world.
#[derive(Debug)]
pub struct SimWorld {
    solid: HashSet<BlockPos>,
    light: HashMap<BlockPos, LightLevels>,
    default_light: LightLevels,
    participants: BTreeMap<ParticipantId, ParticipantView>,
    entities: BTreeMap<EntityId, SimEntity>,
    bonus_drops: Vec<(LootTableId, Vec3)>,
    ejected: Vec<(BlockPos, LootTableId)>,
    spawning_enabled: bool,
    now: Tick,
    next_entity: u128,
    /// Everything the controllers did to this world.
    pub events: EventLog,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    /// An empty, dark world with spawning enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            solid: HashSet::new(),
            light: HashMap::new(),
            default_light: LightLevels { block: 0, sky: 0 },
            participants: BTreeMap::new(),
            entities: BTreeMap::new(),
            bonus_drops: Vec::new(),
            ejected: Vec::new(),
            spawning_enabled: true,
            now: 0,
            next_entity: 0,
            events: EventLog::default(),
        }
    }

    /// A closed room: floor at `center.y - 1`, ceiling at `center.y + height`,
    /// walls at `radius` blocks from `center` on X and Z. The center block is
    /// left as air for the controller itself.
    #[must_use]
    pub fn chamber(center: BlockPos, radius: i32, height: i32) -> Self {
        let mut world = Self::new();
        for x in -radius..=radius {
            for z in -radius..=radius {
                world.set_solid(BlockPos::new(center.x + x, center.y - 2, center.z + z));
                world.set_solid(BlockPos::new(center.x + x, center.y + height, center.z + z));
                if x.abs() == radius || z.abs() == radius {
                    for y in -1..height {
                        world.set_solid(BlockPos::new(center.x + x, center.y + y, center.z + z));
                    }
                }
            }
        }
        world
    }

    // -----------------------------------------------------------------------
    // Geometry and light
    // -----------------------------------------------------------------------

    /// Make a block solid.
    pub fn set_solid(&mut self, pos: BlockPos) {
        self.solid.insert(pos);
    }

    /// Make a block air.
    pub fn clear(&mut self, pos: BlockPos) {
        self.solid.remove(&pos);
    }

    /// Fill the inclusive box between two corners with solid blocks.
    pub fn fill(&mut self, a: BlockPos, b: BlockPos) {
        for x in a.x.min(b.x)..=a.x.max(b.x) {
            for y in a.y.min(b.y)..=a.y.max(b.y) {
                for z in a.z.min(b.z)..=a.z.max(b.z) {
                    self.solid.insert(BlockPos::new(x, y, z));
                }
            }
        }
    }

    /// Override the light at one block.
    pub fn set_light(&mut self, pos: BlockPos, light: LightLevels) {
        self.light.insert(pos, light);
    }

    /// Light used where no override exists.
    pub fn set_default_light(&mut self, light: LightLevels) {
        self.default_light = light;
    }

    /// Host policy gate.
    pub fn set_spawning_enabled(&mut self, enabled: bool) {
        self.spawning_enabled = enabled;
    }

    // -----------------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------------

    /// Current world time; events are stamped with it.
    #[must_use]
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Advance the world clock.
    pub fn set_time(&mut self, now: Tick) {
        self.now = now;
    }

    // -----------------------------------------------------------------------
    // Participants
    // -----------------------------------------------------------------------

    /// Add a survival participant standing at `position`.
    pub fn add_participant(&mut self, position: Vec3) -> ParticipantId {
        let id = ParticipantId(Uuid::new_v4());
        self.insert_participant(id, position);
        id
    }

    /// Add a participant with a fixed identity.
    pub fn insert_participant(&mut self, id: ParticipantId, position: Vec3) {
        self.participants.insert(
            id,
            ParticipantView {
                id,
                position,
                eye_position: position.up(EYE_HEIGHT),
                height: 1.8,
                mode: ParticipantMode::Survival,
                alive: true,
                escalation: EscalationStatus::None,
            },
        );
    }

    /// Remove a participant from the world.
    pub fn remove_participant(&mut self, id: ParticipantId) -> bool {
        self.participants.remove(&id).is_some()
    }

    /// Move a participant.
    pub fn move_participant(&mut self, id: ParticipantId, position: Vec3) {
        if let Some(p) = self.participants.get_mut(&id) {
            p.position = position;
            p.eye_position = position.up(EYE_HEIGHT);
        }
    }

    /// Change a participant's game mode.
    pub fn set_mode(&mut self, id: ParticipantId, mode: ParticipantMode) {
        if let Some(p) = self.participants.get_mut(&id) {
            p.mode = mode;
        }
    }

    /// Give a participant an escalation status.
    pub fn set_escalation(&mut self, id: ParticipantId, status: EscalationStatus) {
        if let Some(p) = self.participants.get_mut(&id) {
            p.escalation = status;
        }
    }

    /// Mark a participant dead or alive.
    pub fn set_participant_alive(&mut self, id: ParticipantId, alive: bool) {
        if let Some(p) = self.participants.get_mut(&id) {
            p.alive = alive;
        }
    }

    /// All participants.
    pub fn participants(&self) -> impl Iterator<Item = &ParticipantView> {
        self.participants.values()
    }

    // -----------------------------------------------------------------------
    // Entities
    // -----------------------------------------------------------------------

    /// Look up a spawned entity.
    #[must_use]
    pub fn sim_entity(&self, id: EntityId) -> Option<&SimEntity> {
        self.entities.get(&id)
    }

    /// Living spawned entities.
    pub fn living_entities(&self) -> impl Iterator<Item = (&EntityId, &SimEntity)> {
        self.entities.iter().filter(|(_, e)| e.alive)
    }

    /// Number of living spawned entities.
    #[must_use]
    pub fn living_count(&self) -> usize {
        self.living_entities().count()
    }

    /// Kill one entity.
    pub fn kill(&mut self, id: EntityId) {
        if let Some(e) = self.entities.get_mut(&id) {
            e.alive = false;
        }
    }

    /// Kill every spawned entity.
    pub fn kill_all(&mut self) {
        for e in self.entities.values_mut() {
            e.alive = false;
        }
    }

    /// Teleport an entity.
    pub fn move_entity(&mut self, id: EntityId, position: Vec3) {
        if let Some(e) = self.entities.get_mut(&id) {
            e.position = position;
        }
    }

    /// Drop dead entities from the world. Returns how many were removed.
    pub fn reap_dead(&mut self) -> usize {
        let before = self.entities.len();
        self.entities.retain(|_, e| e.alive);
        before - self.entities.len()
    }

    /// One step of crude combat: every living entity walks `speed` blocks
    /// horizontally toward the nearest living participant and dies once it
    /// is within `reach` of them on the X/Z plane. Returns how many died.
    pub fn simulate_combat(&mut self, speed: f64, reach: f64) -> usize {
        let targets: Vec<(ParticipantId, Vec3)> = self
            .participants
            .values()
            .filter(|p| p.alive && p.mode != ParticipantMode::Spectator)
            .map(|p| (p.id, p.position))
            .collect();
        if targets.is_empty() {
            return 0;
        }

        let mut killed = Vec::new();
        for (id, entity) in self.entities.iter_mut().filter(|(_, e)| e.alive) {
            let Some((by, target)) = targets
                .iter()
                .min_by(|a, b| {
                    horizontal_distance(a.1, entity.position)
                        .total_cmp(&horizontal_distance(b.1, entity.position))
                })
                .copied()
            else {
                continue;
            };
            let distance = horizontal_distance(target, entity.position);
            if distance > reach {
                let t = (speed / distance).min(1.0);
                let step = entity.position.lerp(target, t);
                entity.position = Vec3::new(step.x, entity.position.y, step.z);
            }
            if horizontal_distance(target, entity.position) <= reach {
                entity.alive = false;
                killed.push((*id, by));
            }
        }

        for (entity, by) in &killed {
            self.events.push(self.now, WorldEvent::Killed { entity: *entity, by: *by });
        }
        killed.len()
    }

    /// Rewards ejected so far.
    #[must_use]
    pub fn ejected(&self) -> &[(BlockPos, LootTableId)] {
        &self.ejected
    }

    /// Bonus drops placed so far.
    #[must_use]
    pub fn bonus_drops(&self) -> &[(LootTableId, Vec3)] {
        &self.bonus_drops
    }

    fn is_air(&self, pos: BlockPos) -> bool {
        !self.solid.contains(&pos)
    }
}

fn horizontal_distance(a: Vec3, b: Vec3) -> f64 {
    (a.x - b.x).hypot(a.z - b.z)
}

// ---------------------------------------------------------------------------
// Host traits
// ---------------------------------------------------------------------------

impl WorldQuery for SimWorld {
    fn spawning_enabled(&self) -> bool {
        self.spawning_enabled
    }

    fn participants_within(&self, center: Vec3, radius: f64) -> Vec<ParticipantView> {
        let radius_sqr = radius * radius;
        self.participants
            .values()
            .filter(|p| p.position.distance_sqr(center) <= radius_sqr)
            .copied()
            .collect()
    }

    fn participant(&self, id: ParticipantId) -> Option<ParticipantView> {
        self.participants.get(&id).copied()
    }

    fn entity(&self, id: EntityId) -> Option<EntityView> {
        self.entities.get(&id).map(|e| EntityView {
            position: e.position,
            height: e.height,
            alive: e.alive,
        })
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn clip(&self, from: Vec3, to: Vec3) -> BlockPos {
        let start = BlockPos::containing(from);
        let end = BlockPos::containing(to);
        let length = from.distance_sqr(to).sqrt();
        let steps = (length / CLIP_STEP).ceil() as u32;
        for i in 1..=steps {
            let block = BlockPos::containing(from.lerp(to, f64::from(i) / f64::from(steps)));
            if block != start && self.solid.contains(&block) {
                return block;
            }
        }
        end
    }

    fn has_collision(&self, pos: BlockPos) -> bool {
        self.solid.contains(&pos)
    }

    fn light_at(&self, pos: BlockPos) -> LightLevels {
        self.light.get(&pos).copied().unwrap_or(self.default_light)
    }
}

impl EncounterHost for SimWorld {
    fn try_spawn(&mut self, request: &SpawnRequest<'_>) -> Option<EntityId> {
        let feet = BlockPos::containing(request.position);
        let kind = request.choice.entity.clone();
        let height = entity_height(&kind);
        let headroom = if height > 1.0 { 2 } else { 1 };
        let fits = (0..headroom).all(|dy| self.is_air(feet.above(dy)));
        if !fits {
            self.events.push(
                self.now,
                WorldEvent::SpawnRefused {
                    source: request.source,
                    kind,
                    position: request.position,
                },
            );
            return None;
        }

        self.next_entity += 1;
        let id = EntityId(Uuid::from_u128(self.next_entity));
        self.entities.insert(
            id,
            SimEntity {
                kind: kind.clone(),
                position: request.position,
                height,
                alive: true,
                ominous: request.ominous,
                source: request.source,
            },
        );
        self.events.push(
            self.now,
            WorldEvent::Spawned {
                source: request.source,
                entity: id,
                kind,
                position: request.position,
                ominous: request.ominous,
            },
        );
        Some(id)
    }

    fn despawn(&mut self, id: EntityId) {
        if self.entities.remove(&id).is_some() {
            self.events.push(self.now, WorldEvent::Despawned { entity: id });
        }
    }

    fn eject_loot(&mut self, table: &LootTableId, origin: BlockPos) {
        trace!(origin = %origin, table = %table, "Loot ejected");
        self.ejected.push((origin, table.clone()));
        self.events.push(
            self.now,
            WorldEvent::LootEjected {
                origin,
                table: table.clone(),
            },
        );
    }

    fn spawn_bonus_drop(&mut self, table: &LootTableId, position: Vec3) -> bool {
        if !self.is_air(BlockPos::containing(position)) {
            return false;
        }
        self.bonus_drops.push((table.clone(), position));
        self.events.push(
            self.now,
            WorldEvent::BonusDrop {
                table: table.clone(),
                position,
            },
        );
        true
    }

    fn upgrade_escalation_status(&mut self, id: ParticipantId) {
        if let Some(p) = self.participants.get_mut(&id) {
            p.escalation = EscalationStatus::Strong;
            self.events.push(self.now, WorldEvent::StatusUpgraded { participant: id });
        }
    }

    fn notify_state_changed(&mut self, source: EncounterRef, old: EncounterState, new: EncounterState) {
        self.events.push(self.now, WorldEvent::StateChanged { source, old, new });
    }

    fn emit(&mut self, source: EncounterRef, cue: EncounterCue) {
        self.events.push(self.now, WorldEvent::Cue { source, cue });
    }
}
