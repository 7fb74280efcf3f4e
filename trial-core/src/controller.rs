//! The trial spawner controller.
//!
//! [`TrialSpawner`] owns one encounter's runtime record and drives the state
//! machine once per game tick. It shares its two encounter profiles and its
//! detector with other controllers through `Arc`s, and reaches the world only
//! through the [`EncounterHost`] it is handed on each call.
//!
//! ```rust
//! use std::sync::Arc;
//! use trial_core::config::{ControllerSettings, EncounterConfig, SpawnChoice};
//! use trial_core::controller::TrialSpawner;
//! use trial_core::types::BlockPos;
//!
//! let normal = EncounterConfig::default().with_spawn_candidate(SpawnChoice::new("zombie"));
//! let spawner = TrialSpawner::new(
//!     BlockPos::new(0, 64, 0),
//!     Arc::new(normal.clone()),
//!     Arc::new(normal),
//!     ControllerSettings::default(),
//! )
//! .with_seed(7);
//! assert_eq!(spawner.state().name(), "inactive");
//! ```

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::budget;
use crate::config::{ControllerSettings, EncounterConfig, SpawnChoice, TrialConfig};
use crate::detection::ParticipantDetector;
use crate::host::{EncounterCue, EncounterHost, EncounterRef, SpawnRequest};
use crate::metrics;
use crate::ominous;
use crate::persistence::EncounterSnapshot;
use crate::runtime::EncounterRuntime;
use crate::state::EncounterState;
use crate::types::{BlockPos, EncounterId, EntityId, Tick, Vec3};

/// One encounter controller anchored to a block.
#[derive(Debug)]
pub struct TrialSpawner {
    pub(crate) id: EncounterId,
    pub(crate) origin: BlockPos,
    pub(crate) settings: ControllerSettings,
    pub(crate) normal: Arc<EncounterConfig>,
    pub(crate) ominous: Arc<EncounterConfig>,
    pub(crate) detector: Arc<dyn ParticipantDetector>,
    pub(crate) state: EncounterState,
    pub(crate) runtime: EncounterRuntime,
    pub(crate) is_ominous: bool,
    pub(crate) spawn_override: Option<SpawnChoice>,
    pub(crate) rng: StdRng,
    pub(crate) last_tick: Option<Tick>,
}

impl TrialSpawner {
    /// Create a dormant controller. The detector is the one named in
    /// `settings`; the random source is seeded from entropy.
    #[must_use]
    pub fn new(
        origin: BlockPos,
        normal: Arc<EncounterConfig>,
        ominous: Arc<EncounterConfig>,
        settings: ControllerSettings,
    ) -> Self {
        let detector: Arc<dyn ParticipantDetector> = Arc::new(settings.detector);
        Self {
            id: EncounterId::new(),
            origin,
            settings,
            normal,
            ominous,
            detector,
            state: EncounterState::Inactive,
            runtime: EncounterRuntime::new(),
            is_ominous: false,
            spawn_override: None,
            rng: StdRng::from_entropy(),
            last_tick: None,
        }
    }

    /// Create a controller from a loaded configuration file.
    #[must_use]
    pub fn from_config(origin: BlockPos, config: &TrialConfig) -> Self {
        Self::new(
            origin,
            Arc::new(config.normal.clone()),
            Arc::new(config.ominous.clone()),
            config.controller.clone(),
        )
    }

    /// Rebuild a controller from a snapshot. A persisted spawn override is
    /// re-applied to both profiles.
    #[must_use]
    pub fn from_snapshot(
        snapshot: EncounterSnapshot,
        normal: Arc<EncounterConfig>,
        ominous: Arc<EncounterConfig>,
        settings: ControllerSettings,
    ) -> Self {
        let mut spawner = Self::new(snapshot.origin, normal, ominous, settings).with_id(snapshot.id);
        if let Some(choice) = &snapshot.spawn_override {
            spawner.apply_override(choice);
        }
        spawner.state = snapshot.state;
        spawner.runtime = snapshot.runtime;
        spawner.is_ominous = snapshot.is_ominous;
        spawner.spawn_override = snapshot.spawn_override;
        spawner.last_tick = snapshot.last_tick;
        spawner
    }

    /// Use a deterministic random source.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Use a custom detection strategy.
    #[must_use]
    pub fn with_detector(mut self, detector: Arc<dyn ParticipantDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Use a fixed identity.
    #[must_use]
    pub fn with_id(mut self, id: EncounterId) -> Self {
        self.id = id;
        self
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance the encounter to game time `now` and return the new state.
    ///
    /// Calling it twice with the same `now` does nothing the second time.
    pub fn tick<H: EncounterHost>(&mut self, host: &mut H, now: Tick) -> EncounterState {
        if self.last_tick == Some(now) {
            return self.state;
        }
        self.last_tick = Some(now);

        self.untrack_lost_mobs(host, now);

        let old = self.state;
        let next = old.tick_and_next(self, host, now);
        if next != old {
            self.state = next;
            host.notify_state_changed(self.reference(), old, next);
            debug!(origin = %self.origin, from = %old, to = %next, tick = now, "State changed");
        }
        next
    }

    fn untrack_lost_mobs<H: EncounterHost>(&mut self, host: &H, now: Tick) {
        let origin = self.origin;
        let max = f64::from(self.settings.max_tracking_distance);
        let removed = self.runtime.untrack_mobs(|id| {
            !host.is_alive(id)
                || host
                    .entity(id)
                    .is_none_or(|view| BlockPos::containing(view.position).dist_sqr(origin) > max * max)
        });
        if removed > 0 {
            self.runtime.next_mob_spawns_at = now + self.active_config().spawn_delay();
            metrics::counters().record_mobs_untracked(removed);
            debug!(origin = %origin, removed, "Untracked lost entities");
        }
    }

    /// Try to spawn the cached spawn choice. `None` when nothing was spawned.
    pub(crate) fn spawn_mob<H: EncounterHost>(&mut self, host: &mut H) -> Option<EntityId> {
        let config = self.active_profile();
        let choice = self
            .runtime
            .get_or_create_next_spawn_data(&config, &mut self.rng)?
            .clone();
        if !choice.has_entity() {
            return None;
        }

        let counters = metrics::counters();
        counters.record_spawn_attempt();

        let position = choice
            .position
            .unwrap_or_else(|| self.random_spawn_position(&config));
        if !host.has_line_of_sight(self.origin.center(), position) {
            counters.record_spawn_denied();
            return None;
        }
        if let Some(rules) = choice.custom_spawn_rules {
            if !rules.permits(host.light_at(BlockPos::containing(position))) {
                counters.record_spawn_denied();
                return None;
            }
        }

        let request = SpawnRequest {
            source: self.reference(),
            choice: &choice,
            position,
            ominous: self.is_ominous,
        };
        let Some(entity) = host.try_spawn(&request) else {
            counters.record_spawn_denied();
            return None;
        };

        host.emit(self.reference(), EncounterCue::MobSpawned { entity, position });
        counters.record_mob_spawned();
        debug!(
            origin = %self.origin,
            kind = %choice.entity,
            at = %position,
            "Spawned entity"
        );
        Some(entity)
    }

    fn random_spawn_position(&mut self, config: &EncounterConfig) -> Vec3 {
        let range = f64::from(config.spawn_range);
        let x = f64::from(self.origin.x) + (self.rng.r#gen::<f64>() - self.rng.r#gen::<f64>()) * range + 0.5;
        let y = f64::from(self.origin.y + self.rng.gen_range(-1..=1));
        let z = f64::from(self.origin.z) + (self.rng.r#gen::<f64>() - self.rng.r#gen::<f64>()) * range + 0.5;
        Vec3::new(x, y, z)
    }

    // -----------------------------------------------------------------------
    // External operations
    // -----------------------------------------------------------------------

    /// Tear the encounter down. Tracked entities are removed from the world
    /// only if the encounter is escalated.
    pub fn destroy<H: EncounterHost>(&mut self, host: &mut H) {
        let discarded = if self.is_ominous {
            ominous::discard_tracked_mobs(self, host)
        } else {
            0
        };
        self.runtime.reset();
        info!(origin = %self.origin, discarded, "Encounter destroyed");
    }

    /// Replace the spawn pool of both profiles with a single candidate and
    /// restart the encounter from `Inactive`.
    pub fn override_spawn_candidate<H: EncounterHost>(&mut self, host: &mut H, choice: SpawnChoice) {
        self.apply_override(&choice);
        self.spawn_override = Some(choice);
        self.runtime.reset();

        let old = self.state;
        self.state = EncounterState::Inactive;
        if old != EncounterState::Inactive {
            host.notify_state_changed(self.reference(), old, EncounterState::Inactive);
        }
        debug!(origin = %self.origin, "Spawn candidate overridden");
    }

    fn apply_override(&mut self, choice: &SpawnChoice) {
        self.normal = Arc::new(self.normal.with_spawn_candidate(choice.clone()));
        self.ominous = Arc::new(self.ominous.with_spawn_candidate(choice.clone()));
    }

    /// Capture everything needed to resume this encounter later.
    #[must_use]
    pub fn snapshot(&self) -> EncounterSnapshot {
        EncounterSnapshot {
            id: self.id,
            origin: self.origin,
            state: self.state,
            runtime: self.runtime.clone(),
            is_ominous: self.is_ominous,
            spawn_override: self.spawn_override.clone(),
            last_tick: self.last_tick,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The spawn choice a host may show as a preview, drawing one if needed.
    pub fn display_choice(&mut self) -> Option<&SpawnChoice> {
        let config = self.active_profile();
        self.runtime
            .get_or_create_next_spawn_data(&config, &mut self.rng)
            .filter(|choice| choice.has_entity())
    }

    /// Whether anything can be spawned with the active profile.
    pub fn has_mob_to_spawn(&mut self) -> bool {
        let config = self.active_profile();
        self.runtime.has_mob_to_spawn(&config, &mut self.rng)
    }

    /// Lifetime budget at the current participant count.
    #[must_use]
    pub fn total_cap(&self) -> u32 {
        budget::total_cap(self.active_config(), self.current_additional())
    }

    /// Concurrent budget at the current participant count.
    #[must_use]
    pub fn concurrent_cap(&self) -> u32 {
        budget::concurrent_cap(self.active_config(), self.current_additional())
    }

    fn current_additional(&self) -> u32 {
        budget::additional_participants(self.runtime.detected_players.len())
    }

    /// The profile currently in effect.
    #[must_use]
    pub fn active_config(&self) -> &EncounterConfig {
        if self.is_ominous { &self.ominous } else { &self.normal }
    }

    pub(crate) fn active_profile(&self) -> Arc<EncounterConfig> {
        if self.is_ominous {
            Arc::clone(&self.ominous)
        } else {
            Arc::clone(&self.normal)
        }
    }

    /// The normal profile.
    #[must_use]
    pub fn normal_config(&self) -> &Arc<EncounterConfig> {
        &self.normal
    }

    /// The escalated profile.
    #[must_use]
    pub fn ominous_config(&self) -> &Arc<EncounterConfig> {
        &self.ominous
    }

    /// Per-controller settings.
    #[must_use]
    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Back-reference passed to host callbacks.
    #[must_use]
    pub fn reference(&self) -> EncounterRef {
        EncounterRef {
            id: self.id,
            origin: self.origin,
        }
    }

    /// Controller identity.
    #[must_use]
    pub fn id(&self) -> EncounterId {
        self.id
    }

    /// Anchor block.
    #[must_use]
    pub fn origin(&self) -> BlockPos {
        self.origin
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> EncounterState {
        self.state
    }

    /// Current runtime record.
    #[must_use]
    pub fn runtime(&self) -> &EncounterRuntime {
        &self.runtime
    }

    /// Whether the escalated profile is in effect.
    #[must_use]
    pub fn is_ominous(&self) -> bool {
        self.is_ominous
    }

    /// The persisted spawn override, if any.
    #[must_use]
    pub fn spawn_override(&self) -> Option<&SpawnChoice> {
        self.spawn_override.as_ref()
    }

    /// Last processed tick.
    #[must_use]
    pub fn last_tick(&self) -> Option<Tick> {
        self.last_tick
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
