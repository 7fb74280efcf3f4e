//! Property-Based Tests for the trial spawner.
//!
//! Budget arithmetic and controller invariants under random profiles,
//! participant counts and kill patterns.

mod common;

use std::sync::Arc;

use proptest::prelude::*;

use common::OpenField;
use trial_core::budget;
use trial_core::config::{ControllerSettings, EncounterConfig, SpawnChoice};
use trial_core::controller::TrialSpawner;
use trial_core::host::EscalationStatus;
use trial_core::state::EncounterState;
use trial_core::types::{BlockPos, EncounterId};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_profile() -> impl Strategy<Value = EncounterConfig> {
    (1.0..12.0f32, 0.0..4.0f32, 1.0..4.0f32, 0.0..2.0f32, 1..60u32).prop_map(
        |(total, total_per, simultaneous, simultaneous_per, delay)| {
            EncounterConfig {
                total_mobs: total,
                total_mobs_added_per_player: total_per,
                simultaneous_mobs: simultaneous,
                simultaneous_mobs_added_per_player: simultaneous_per,
                ticks_between_spawn: delay,
                ..EncounterConfig::default()
            }
            .with_spawn_candidate(SpawnChoice::new("zombie"))
        },
    )
}

fn spawner_for(config: EncounterConfig, seed: u64) -> TrialSpawner {
    let config = Arc::new(config);
    TrialSpawner::new(
        BlockPos::new(5, 0, -3),
        Arc::clone(&config),
        config,
        ControllerSettings::default(),
    )
    .with_seed(seed)
    .with_id(EncounterId(Uuid::from_u128(seed.into())))
}

// ---------------------------------------------------------------------------
// Property: caps are monotonic
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn cap_monotonic_in_participants(base in 0.0..50.0f32, per in 0.0..10.0f32, n in 0..20u32) {
        prop_assert!(budget::cap(base, per, n) <= budget::cap(base, per, n + 1));
    }

    #[test]
    fn cap_monotonic_in_coefficient(base in 0.0..50.0f32, per in 0.0..10.0f32, bump in 0.0..5.0f32, n in 0..20u32) {
        prop_assert!(budget::cap(base, per, n) <= budget::cap(base, per + bump, n));
    }

    #[test]
    fn cap_is_floor_of_linear(base in 0.0..50.0f32, per in 0.0..10.0f32, n in 0..20u32) {
        #[allow(clippy::cast_precision_loss)]
        let raw = base + per * n as f32;
        let cap = budget::cap(base, per, n);
        prop_assert!(cap as f32 <= raw);
        prop_assert!(raw - (cap as f32) < 1.0);
    }
}

// ---------------------------------------------------------------------------
// Property: controller invariants
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn never_over_spawns(
        config in arb_profile(),
        participants in 1..5u128,
        kills in proptest::collection::vec(any::<bool>(), 600),
        seed in any::<u64>(),
    ) {
        let mut spawner = spawner_for(config, seed);
        let mut host = OpenField::default();
        for n in 1..=participants {
            host.join(n);
        }
        for (t, kill) in (0..600).zip(kills) {
            spawner.tick(&mut host, t);
            let runtime = spawner.runtime();
            prop_assert!(runtime.current_mobs.len() <= spawner.concurrent_cap() as usize);
            prop_assert!(runtime.total_mobs_spawned <= spawner.total_cap());
            if kill {
                host.kill_all();
            }
        }
    }

    #[test]
    fn same_clock_tick_is_idempotent(config in arb_profile(), stop in 1..400i64, seed in any::<u64>()) {
        let mut spawner = spawner_for(config, seed);
        let mut host = OpenField::default();
        host.join(1);
        for t in 0..=stop {
            spawner.tick(&mut host, t);
        }
        let before = spawner.snapshot();
        let entities = host.entities.len();
        let transitions = host.transitions.len();
        spawner.tick(&mut host, stop);
        prop_assert_eq!(spawner.snapshot(), before);
        prop_assert_eq!(host.entities.len(), entities);
        prop_assert_eq!(host.transitions.len(), transitions);
    }

    #[test]
    fn escalation_resets_budgets(config in arb_profile(), warmup in 60..300i64, seed in any::<u64>()) {
        let mut spawner = spawner_for(config, seed);
        let mut host = OpenField::default();
        let id = host.join(1);
        for t in 0..warmup {
            spawner.tick(&mut host, t);
        }
        let tracked = spawner.runtime().current_mobs.len();

        host.participants.get_mut(&id).expect("participant").escalation = EscalationStatus::Strong;
        let mut t = warmup;
        while !spawner.is_ominous() && t < warmup + 20 {
            spawner.tick(&mut host, t);
            t += 1;
        }
        prop_assert!(spawner.is_ominous());
        prop_assert!(spawner.runtime().current_mobs.is_empty());
        prop_assert_eq!(spawner.runtime().total_mobs_spawned, 0);
        prop_assert_eq!(host.despawn_calls.len(), tracked);
    }

    #[test]
    fn same_seed_same_encounter(config in arb_profile(), seed in any::<u64>()) {
        let mut a = spawner_for(config.clone(), seed);
        let mut b = spawner_for(config, seed);
        let mut host_a = OpenField::default();
        let mut host_b = OpenField::default();
        host_a.join(1);
        host_b.join(1);
        for t in 0..500 {
            let sa = a.tick(&mut host_a, t);
            let sb = b.tick(&mut host_b, t);
            prop_assert_eq!(sa, sb);
            if t % 7 == 0 {
                host_a.kill_all();
                host_b.kill_all();
            }
        }
        prop_assert_eq!(a.snapshot(), b.snapshot());
        let positions = |h: &OpenField| h.entities.values().map(|e| (e.position.x, e.position.z)).collect::<Vec<_>>();
        prop_assert_eq!(positions(&host_a), positions(&host_b));
    }

    #[test]
    fn completed_encounters_leave_active_only_when_cleared(config in arb_profile(), seed in any::<u64>()) {
        let mut spawner = spawner_for(config, seed);
        let mut host = OpenField::default();
        host.join(1);
        for t in 0..3_000 {
            let before = spawner.state();
            let alive_before = host.alive_count();
            spawner.tick(&mut host, t);
            if before == EncounterState::Active && spawner.state() == EncounterState::WaitingForRewardEjection {
                prop_assert_eq!(alive_before, 0);
                prop_assert_eq!(spawner.runtime().cooldown_ends_at, t + 36_000);
            }
            host.kill_all();
        }
    }
}
