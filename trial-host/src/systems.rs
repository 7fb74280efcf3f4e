//! Per-tick driving of every controller in a world.
//!
//! The [`EncounterRegistry`] owns the controllers keyed by anchor block,
//! ticks them in block order so runs are reproducible, and times the whole
//! pass against a budget. It is what a server's tick loop would hold.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use trial_core::config::ControllerSettings;
use trial_core::controller::TrialSpawner;
use trial_core::error::Result;
use trial_core::host::EncounterHost;
use trial_core::metrics::TickBudgetMonitor;
use trial_core::persistence::SnapshotStore;
use trial_core::state::EncounterState;
use trial_core::types::{BlockPos, Tick};

use crate::config::ChamberPreset;

/// Every controller in one world.
#[derive(Debug)]
pub struct EncounterRegistry {
    spawners: BTreeMap<BlockPos, TrialSpawner>,
    monitor: TickBudgetMonitor,
}

impl EncounterRegistry {
    /// An empty registry with a per-tick budget in milliseconds.
    #[must_use]
    pub fn new(tick_budget_ms: f64) -> Self {
        Self {
            spawners: BTreeMap::new(),
            monitor: TickBudgetMonitor::new(tick_budget_ms),
        }
    }

    /// Add a controller, replacing (and returning) any already at its origin.
    pub fn insert(&mut self, spawner: TrialSpawner) -> Option<TrialSpawner> {
        self.spawners.insert(spawner.origin(), spawner)
    }

    /// Remove the controller at `origin`, tearing its encounter down.
    pub fn remove<H: EncounterHost>(&mut self, origin: BlockPos, host: &mut H) -> Option<TrialSpawner> {
        let mut spawner = self.spawners.remove(&origin)?;
        spawner.destroy(host);
        Some(spawner)
    }

    /// The controller at `origin`.
    #[must_use]
    pub fn get(&self, origin: BlockPos) -> Option<&TrialSpawner> {
        self.spawners.get(&origin)
    }

    /// The controller at `origin`, mutably.
    pub fn get_mut(&mut self, origin: BlockPos) -> Option<&mut TrialSpawner> {
        self.spawners.get_mut(&origin)
    }

    /// Number of controllers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spawners.len()
    }

    /// Whether there are no controllers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spawners.is_empty()
    }

    /// Controllers in block order.
    pub fn iter(&self) -> impl Iterator<Item = &TrialSpawner> {
        self.spawners.values()
    }

    /// Current state of every controller, in block order.
    #[must_use]
    pub fn states(&self) -> Vec<(BlockPos, EncounterState)> {
        self.spawners
            .iter()
            .map(|(origin, spawner)| (*origin, spawner.state()))
            .collect()
    }

    /// Tick timing history.
    #[must_use]
    pub fn monitor(&self) -> &TickBudgetMonitor {
        &self.monitor
    }

    /// Tick every controller once. Returns how many changed state.
    pub fn tick_all<H: EncounterHost>(&mut self, host: &mut H, now: Tick) -> usize {
        let mut changed = 0;
        {
            let _guard = self.monitor.begin_tick();
            for spawner in self.spawners.values_mut() {
                let before = spawner.state();
                if spawner.tick(host, now) != before {
                    changed += 1;
                }
            }
        }
        if self.monitor.is_over_budget() {
            warn!(
                now,
                controllers = self.spawners.len(),
                budget_ms = self.monitor.budget_ms(),
                "Encounter tick over budget"
            );
        }
        changed
    }

    /// Persist every controller. Returns how many were written.
    ///
    /// # Errors
    /// Stops at the first snapshot the store rejects.
    pub fn save_all(&self, store: &SnapshotStore) -> Result<usize> {
        for spawner in self.spawners.values() {
            store.save(&spawner.snapshot())?;
        }
        info!(count = self.spawners.len(), "Encounters saved");
        Ok(self.spawners.len())
    }

    /// Rebuild controllers from every stored snapshot. `preset_at` names the
    /// chamber each origin belongs to; snapshots at unknown origins are
    /// skipped. Each restored controller is reseeded from `seed` and its origin.
    ///
    /// Returns how many controllers were restored.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn restore_all(
        &mut self,
        store: &SnapshotStore,
        settings: &ControllerSettings,
        seed: u64,
        preset_at: impl Fn(BlockPos) -> Option<ChamberPreset>,
    ) -> Result<usize> {
        let mut restored = 0;
        for snapshot in store.load_all()? {
            let origin = snapshot.origin;
            let Some(preset) = preset_at(origin) else {
                warn!(origin = %origin, "No chamber for stored encounter, skipping");
                continue;
            };
            let (normal, ominous) = preset.profiles();
            let spawner = TrialSpawner::from_snapshot(snapshot, normal, ominous, settings.clone())
                .with_seed(reseed(seed, origin));
            debug!(origin = %origin, state = %spawner.state(), "Encounter restored");
            self.insert(spawner);
            restored += 1;
        }
        Ok(restored)
    }
}

/// Derive a per-controller seed so spawners in one run do not share a stream.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn reseed(seed: u64, origin: BlockPos) -> u64 {
    seed ^ (origin.as_long() as u64).rotate_left(17)
}
