//! Runtime metrics.
//!
//! Process-wide counters for the hot path plus a tick-budget monitor hosts can
//! wrap around a batch of controller ticks.
//!
//! Counters are lock-free `AtomicU64`s updated with relaxed ordering; the
//! timing history sits behind a `parking_lot::Mutex` since it is read rarely.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

// ---------------------------------------------------------------------------
// Global Counters (lock-free)
// ---------------------------------------------------------------------------

static COUNTERS: EncounterCounters = EncounterCounters::new();

/// The process-wide counters every controller reports into.
#[must_use]
pub fn counters() -> &'static EncounterCounters {
    &COUNTERS
}

/// Atomic counters for encounter events.
#[derive(Debug)]
pub struct EncounterCounters {
    /// Spawn attempts made by controllers.
    pub spawn_attempts: AtomicU64,
    /// Spawn attempts refused (visibility, light rules or host refusal).
    pub spawns_denied: AtomicU64,
    /// Entities successfully spawned.
    pub mobs_spawned: AtomicU64,
    /// Tracked entities dropped because they died, vanished or strayed.
    pub mobs_untracked: AtomicU64,
    /// Participant scans performed.
    pub scans: AtomicU64,
    /// Encounters escalated to ominous.
    pub escalations: AtomicU64,
    /// Rewards ejected.
    pub rewards_ejected: AtomicU64,
    /// Ominous bonus drops started.
    pub bonus_drops: AtomicU64,
    /// Encounters that reached the reward phase.
    pub encounters_completed: AtomicU64,
    /// Snapshots written to a store.
    pub snapshots_saved: AtomicU64,
}

impl EncounterCounters {
    /// Create a new set of zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            spawn_attempts: AtomicU64::new(0),
            spawns_denied: AtomicU64::new(0),
            mobs_spawned: AtomicU64::new(0),
            mobs_untracked: AtomicU64::new(0),
            scans: AtomicU64::new(0),
            escalations: AtomicU64::new(0),
            rewards_ejected: AtomicU64::new(0),
            bonus_drops: AtomicU64::new(0),
            encounters_completed: AtomicU64::new(0),
            snapshots_saved: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_spawn_attempt(&self) {
        self.spawn_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_spawn_denied(&self) {
        self.spawns_denied.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_mob_spawned(&self) {
        self.mobs_spawned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_mobs_untracked(&self, count: usize) {
        self.mobs_untracked.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_scan(&self) {
        self.scans.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_escalation(&self) {
        self.escalations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reward_ejected(&self) {
        self.rewards_ejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_bonus_drop(&self) {
        self.bonus_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_encounter_completed(&self) {
        self.encounters_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_snapshot_saved(&self) {
        self.snapshots_saved.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            spawn_attempts: self.spawn_attempts.load(Ordering::Relaxed),
            spawns_denied: self.spawns_denied.load(Ordering::Relaxed),
            mobs_spawned: self.mobs_spawned.load(Ordering::Relaxed),
            mobs_untracked: self.mobs_untracked.load(Ordering::Relaxed),
            scans: self.scans.load(Ordering::Relaxed),
            escalations: self.escalations.load(Ordering::Relaxed),
            rewards_ejected: self.rewards_ejected.load(Ordering::Relaxed),
            bonus_drops: self.bonus_drops.load(Ordering::Relaxed),
            encounters_completed: self.encounters_completed.load(Ordering::Relaxed),
            snapshots_saved: self.snapshots_saved.load(Ordering::Relaxed),
        }
    }
}

impl Default for EncounterCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter values at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    /// Spawn attempts.
    pub spawn_attempts: u64,
    /// Refused spawn attempts.
    pub spawns_denied: u64,
    /// Successful spawns.
    pub mobs_spawned: u64,
    /// Entities dropped from tracking.
    pub mobs_untracked: u64,
    /// Participant scans.
    pub scans: u64,
    /// Escalations.
    pub escalations: u64,
    /// Rewards ejected.
    pub rewards_ejected: u64,
    /// Bonus drops.
    pub bonus_drops: u64,
    /// Completed encounters.
    pub encounters_completed: u64,
    /// Saved snapshots.
    pub snapshots_saved: u64,
}

impl CounterSnapshot {
    fn entries(&self) -> [(&'static str, &'static str, u64); 10] {
        [
            ("spawn_attempts", "Spawn attempts", self.spawn_attempts),
            ("spawns_denied", "Refused spawn attempts", self.spawns_denied),
            ("mobs_spawned", "Entities spawned", self.mobs_spawned),
            ("mobs_untracked", "Entities dropped from tracking", self.mobs_untracked),
            ("scans", "Participant scans", self.scans),
            ("escalations", "Ominous escalations", self.escalations),
            ("rewards_ejected", "Rewards ejected", self.rewards_ejected),
            ("bonus_drops", "Ominous bonus drops", self.bonus_drops),
            ("encounters_completed", "Encounters completed", self.encounters_completed),
            ("snapshots_saved", "Snapshots saved", self.snapshots_saved),
        ]
    }

    /// Format as Prometheus-compatible text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let mut out = String::new();
        for (name, help, value) in self.entries() {
            out.push_str(&format!(
                "# HELP trial_{name}_total {help}\n\
                 # TYPE trial_{name}_total counter\n\
                 trial_{name}_total {value}\n"
            ));
        }
        out
    }

    /// Difference between two snapshots (`self - earlier`), saturating.
    #[must_use]
    pub fn since(&self, earlier: &Self) -> Self {
        Self {
            spawn_attempts: self.spawn_attempts.saturating_sub(earlier.spawn_attempts),
            spawns_denied: self.spawns_denied.saturating_sub(earlier.spawns_denied),
            mobs_spawned: self.mobs_spawned.saturating_sub(earlier.mobs_spawned),
            mobs_untracked: self.mobs_untracked.saturating_sub(earlier.mobs_untracked),
            scans: self.scans.saturating_sub(earlier.scans),
            escalations: self.escalations.saturating_sub(earlier.escalations),
            rewards_ejected: self.rewards_ejected.saturating_sub(earlier.rewards_ejected),
            bonus_drops: self.bonus_drops.saturating_sub(earlier.bonus_drops),
            encounters_completed: self
                .encounters_completed
                .saturating_sub(earlier.encounters_completed),
            snapshots_saved: self.snapshots_saved.saturating_sub(earlier.snapshots_saved),
        }
    }
}

// ---------------------------------------------------------------------------
// Tick Budget Monitor
// ---------------------------------------------------------------------------

/// Tracks wall time spent ticking controllers, per server tick.
///
/// ```rust
/// # use trial_core::metrics::TickBudgetMonitor;
/// let monitor = TickBudgetMonitor::new(1.0);
/// {
///     let _guard = monitor.begin_tick();
///     // tick every controller
/// }
/// assert_eq!(monitor.tick_count(), 1);
/// ```
#[derive(Debug)]
pub struct TickBudgetMonitor {
    budget_ms: f64,
    history: Mutex<TickHistory>,
}

#[derive(Debug)]
struct TickHistory {
    timings: Vec<f64>,
    write_idx: usize,
    count: u64,
    last_over_budget: bool,
}

impl TickBudgetMonitor {
    /// Create a monitor with the given budget (milliseconds per tick).
    #[must_use]
    pub fn new(budget_ms: f64) -> Self {
        Self {
            budget_ms,
            history: Mutex::new(TickHistory {
                timings: vec![0.0; 256],
                write_idx: 0,
                count: 0,
                last_over_budget: false,
            }),
        }
    }

    /// Begin timing a tick; the guard records the elapsed time on drop.
    pub fn begin_tick(&self) -> TickGuard<'_> {
        TickGuard {
            monitor: self,
            start: Instant::now(),
        }
    }

    /// Record a timing manually (milliseconds).
    pub fn record(&self, ms: f64) {
        let mut h = self.history.lock();
        let idx = h.write_idx;
        let len = h.timings.len();
        h.timings[idx] = ms;
        h.write_idx = (idx + 1) % len;
        h.count += 1;
        h.last_over_budget = ms > self.budget_ms;
    }

    /// Whether the last tick exceeded the budget.
    #[must_use]
    pub fn is_over_budget(&self) -> bool {
        self.history.lock().last_over_budget
    }

    /// Number of ticks recorded.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.history.lock().count
    }

    /// Worst timing in the retained history (milliseconds).
    #[must_use]
    pub fn max_ms(&self) -> f64 {
        let h = self.history.lock();
        let n = usize::try_from(h.count).unwrap_or(usize::MAX).min(h.timings.len());
        h.timings[..n].iter().copied().fold(0.0, f64::max)
    }

    /// The configured budget in milliseconds.
    #[must_use]
    pub fn budget_ms(&self) -> f64 {
        self.budget_ms
    }
}

/// RAII guard that records elapsed time when dropped.
#[derive(Debug)]
pub struct TickGuard<'a> {
    monitor: &'a TickBudgetMonitor,
    start: Instant,
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.monitor.record(self.start.elapsed().as_secs_f64() * 1000.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_default_zero() {
        let c = EncounterCounters::new();
        assert_eq!(c.snapshot(), CounterSnapshot::default());
    }

    #[test]
    fn counters_increment_and_snapshot() {
        let c = EncounterCounters::new();
        c.record_spawn_attempt();
        c.record_spawn_attempt();
        c.record_spawn_denied();
        c.record_mobs_untracked(3);
        let snap = c.snapshot();
        assert_eq!(snap.spawn_attempts, 2);
        assert_eq!(snap.spawns_denied, 1);
        assert_eq!(snap.mobs_untracked, 3);
    }

    #[test]
    fn prometheus_format_valid() {
        let c = EncounterCounters::new();
        c.escalations.fetch_add(4, Ordering::Relaxed);
        let prom = c.snapshot().to_prometheus();
        assert!(prom.contains("trial_escalations_total 4"));
        assert!(prom.contains("# TYPE trial_scans_total counter"));
        assert_eq!(prom.lines().count(), 30);
    }

    #[test]
    fn since_subtracts() {
        let before = CounterSnapshot {
            scans: 5,
            ..CounterSnapshot::default()
        };
        let after = CounterSnapshot {
            scans: 8,
            ..CounterSnapshot::default()
        };
        assert_eq!(after.since(&before).scans, 3);
        assert_eq!(before.since(&after).scans, 0);
    }

    #[test]
    fn monitor_detects_over_budget() {
        let monitor = TickBudgetMonitor::new(2.0);
        monitor.record(0.5);
        assert!(!monitor.is_over_budget());
        monitor.record(3.0);
        assert!(monitor.is_over_budget());
        assert_eq!(monitor.tick_count(), 2);
        assert!((monitor.max_ms() - 3.0).abs() < f64::EPSILON);
    }
}
