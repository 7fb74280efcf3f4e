//! End-to-end chamber scenarios on the voxel world.

use trial_core::config::{ControllerSettings, PersistenceConfig, SpawnChoice};
use trial_core::controller::TrialSpawner;
use trial_core::host::EscalationStatus;
use trial_core::persistence::SnapshotStore;
use trial_core::state::EncounterState;
use trial_core::types::{BlockPos, LightLevels, Tick, Vec3};
use trial_host::events::WorldEvent;
use trial_host::systems::reseed;
use trial_host::{ChamberPreset, EncounterRegistry, SimWorld};

const ORIGIN: BlockPos = BlockPos::ZERO;

fn spawner(preset: ChamberPreset, settings: ControllerSettings) -> TrialSpawner {
    let (normal, ominous) = preset.profiles();
    TrialSpawner::new(ORIGIN, normal, ominous, settings).with_seed(reseed(42, ORIGIN))
}

fn run(world: &mut SimWorld, spawner: &mut TrialSpawner, ticks: std::ops::Range<Tick>, combat: bool) {
    for now in ticks {
        world.set_time(now);
        if combat {
            world.simulate_combat(0.2, 1.0);
        }
        spawner.tick(world, now);
        world.reap_dead();
    }
}

#[test]
fn wall_between_spawner_and_participant_prevents_detection() {
    let mut world = SimWorld::new();
    world.fill(BlockPos::new(3, -1, -3), BlockPos::new(3, 4, 3));
    world.add_participant(Vec3::new(6.5, 0.0, 0.5));
    let mut spawner = spawner(ChamberPreset::Melee, ControllerSettings::default());

    run(&mut world, &mut spawner, 0..200, false);
    assert_eq!(spawner.state(), EncounterState::WaitingForParticipants);
    assert!(spawner.runtime().detected_players.is_empty());

    for y in -1..=4 {
        for z in -3..=3 {
            world.clear(BlockPos::new(3, y, z));
        }
    }
    run(&mut world, &mut spawner, 200..260, false);
    assert_eq!(spawner.state(), EncounterState::Active);
    assert_eq!(spawner.runtime().detected_players.len(), 1);
}

#[test]
fn spawn_inside_a_solid_block_is_refused_and_retried() {
    let mut world = SimWorld::new();
    world.add_participant(Vec3::new(1.5, 0.0, 1.5));
    world.set_solid(BlockPos::new(2, 0, 2));
    let mut spawner = spawner(ChamberPreset::Melee, ControllerSettings::default());

    let mut choice = SpawnChoice::new("zombie");
    choice.position = Some(Vec3::new(2.5, 0.0, 2.5));
    spawner.override_spawn_candidate(&mut world, choice);

    run(&mut world, &mut spawner, 0..200, false);
    assert_eq!(spawner.state(), EncounterState::Active);
    assert_eq!(world.events.count(|e| matches!(e, WorldEvent::Spawned { .. })), 0);
    let refusals = world.events.count(|e| matches!(e, WorldEvent::SpawnRefused { .. }));
    assert!(refusals > 1, "refusals: {refusals}");

    world.clear(BlockPos::new(2, 0, 2));
    run(&mut world, &mut spawner, 200..210, false);
    assert_eq!(world.events.count(|e| matches!(e, WorldEvent::Spawned { .. })), 1);
}

#[test]
fn dark_only_spawns_wait_for_darkness() {
    let mut world = SimWorld::chamber(ORIGIN, 9, 6);
    world.set_default_light(LightLevels { block: 14, sky: 0 });
    world.add_participant(Vec3::new(2.5, -1.0, 2.5));
    let mut spawner = spawner(ChamberPreset::Slow, ControllerSettings::default());

    run(&mut world, &mut spawner, 0..300, false);
    assert_eq!(world.living_count(), 0);

    world.set_default_light(LightLevels { block: 0, sky: 0 });
    run(&mut world, &mut spawner, 300..500, false);
    assert!(world.living_count() > 0);
}

#[test]
fn melee_chamber_runs_to_cooldown_and_pays_out() {
    let mut world = SimWorld::chamber(ORIGIN, 9, 6);
    world.add_participant(Vec3::new(2.5, -1.0, 2.5));
    let mut spawner = spawner(ChamberPreset::Melee, ControllerSettings::default());

    run(&mut world, &mut spawner, 0..2_000, true);

    assert_eq!(spawner.state(), EncounterState::Cooldown);
    assert_eq!(world.events.count(|e| matches!(e, WorldEvent::Killed { .. })), 6);
    assert_eq!(world.ejected().len(), 1);
    assert!(world.ejected().iter().all(|(origin, _)| *origin == ORIGIN));

    let states: Vec<EncounterState> = world.events.transitions().into_iter().map(|(_, new)| new).collect();
    assert_eq!(
        states,
        vec![
            EncounterState::WaitingForParticipants,
            EncounterState::Active,
            EncounterState::WaitingForRewardEjection,
            EncounterState::EjectingReward,
            EncounterState::Cooldown,
        ]
    );
}

#[test]
fn weak_status_is_upgraded_and_escalates() {
    let mut world = SimWorld::chamber(ORIGIN, 9, 6);
    let p = world.add_participant(Vec3::new(2.5, -1.0, 2.5));
    world.set_escalation(p, EscalationStatus::Weak);
    let mut spawner = spawner(ChamberPreset::Ranged, ControllerSettings::default());

    run(&mut world, &mut spawner, 0..600, false);

    assert!(spawner.is_ominous());
    assert_eq!(world.events.count(|e| matches!(e, WorldEvent::StatusUpgraded { .. })), 1);
    assert!(world.living_entities().all(|(_, e)| e.ominous));
    assert!(world.living_count() > 0);
    assert!(!world.bonus_drops().is_empty());
}

#[test]
fn every_preset_spawns_in_a_dark_chamber() {
    for preset in ChamberPreset::ALL {
        let mut world = SimWorld::chamber(ORIGIN, 9, 6);
        world.add_participant(Vec3::new(2.5, -1.0, 2.5));
        let mut spawner = spawner(preset, ControllerSettings::default());
        run(&mut world, &mut spawner, 0..400, false);
        assert!(world.living_count() > 0, "{preset:?} spawned nothing");
    }
}

#[test]
fn registry_survives_a_save_and_restore() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SnapshotStore::open(dir.path().join("encounters.db"), &PersistenceConfig::default())
        .expect("open store");

    let mut world = SimWorld::chamber(ORIGIN, 9, 6);
    world.add_participant(Vec3::new(2.5, -1.0, 2.5));
    let far = BlockPos::new(100, 0, 0);

    let mut registry = EncounterRegistry::new(50.0);
    registry.insert(spawner(ChamberPreset::Melee, ControllerSettings::default()));
    let (normal, ominous) = ChamberPreset::Breeze.profiles();
    registry.insert(TrialSpawner::new(far, normal, ominous, ControllerSettings::default()));
    for now in 0..150 {
        world.set_time(now);
        registry.tick_all(&mut world, now);
    }
    assert_eq!(registry.save_all(&store).expect("save"), 2);

    let mut restored = EncounterRegistry::new(50.0);
    let count = restored
        .restore_all(&store, &ControllerSettings::default(), 42, |origin| {
            (origin == ORIGIN).then_some(ChamberPreset::Melee)
        })
        .expect("restore");
    assert_eq!(count, 1);

    let before = registry.get(ORIGIN).expect("original");
    let after = restored.get(ORIGIN).expect("restored");
    assert_eq!(after.snapshot(), before.snapshot());
    assert_eq!(after.state(), EncounterState::Active);
    assert!(restored.get(far).is_none());
}
