//! Run one trial chamber headless and report what happened.
//!
//! ```text
//! simulate [run.toml] [--events]
//! ```
//!
//! Without a run file the defaults apply (one participant, melee chamber).
//! `--events` dumps the world event log as JSON lines on stdout.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use trial_core::config::PersistenceConfig;
use trial_core::controller::TrialSpawner;
use trial_core::host::EscalationStatus;
use trial_core::metrics;
use trial_core::persistence::SnapshotStore;
use trial_core::types::{BlockPos, Tick, Vec3};
use trial_host::events::WorldEvent;
use trial_host::systems::reseed;
use trial_host::{EncounterRegistry, HostConfig, SimWorld};

const CHAMBER_RADIUS: i32 = 9;
const CHAMBER_HEIGHT: i32 = 6;
const MOB_SPEED: f64 = 0.2;
const MOB_REACH: f64 = 1.0;

fn main() -> Result<()> {
    let mut path: Option<PathBuf> = None;
    let mut dump_events = false;
    for arg in std::env::args().skip(1) {
        if arg == "--events" {
            dump_events = true;
        } else {
            path = Some(PathBuf::from(arg));
        }
    }

    let config = match &path {
        Some(path) => HostConfig::from_file(path)
            .with_context(|| format!("loading run file {}", path.display()))?,
        None => HostConfig::default(),
    };
    init_tracing(&config.log_level, config.log_json);

    let origin = BlockPos::ZERO;
    let mut world = SimWorld::chamber(origin, CHAMBER_RADIUS, CHAMBER_HEIGHT);
    for i in 0..config.participants {
        let id = world.add_participant(Vec3::new(2.5 + f64::from(i), -1.0, 2.5));
        if i == 0 && config.escalation != EscalationStatus::None {
            world.set_escalation(id, config.escalation);
        }
    }

    let (normal, ominous) = config.preset.profiles();
    let mut registry = EncounterRegistry::new(config.tick_budget_ms);
    registry.insert(
        TrialSpawner::new(origin, normal, ominous, config.controller.clone())
            .with_seed(reseed(config.seed, origin)),
    );
    info!(
        preset = config.preset.description(),
        participants = config.participants,
        ticks = config.ticks,
        "Simulation starting"
    );

    let before = metrics::counters().snapshot();
    for now in 0..Tick::from(config.ticks) {
        world.set_time(now);
        world.simulate_combat(MOB_SPEED, MOB_REACH);
        registry.tick_all(&mut world, now);
        world.reap_dead();
    }
    let counters = metrics::counters().snapshot().since(&before);

    if let Some(db_path) = &config.db_path {
        let store = SnapshotStore::open(db_path, &PersistenceConfig::default())
            .with_context(|| format!("opening snapshot store {}", db_path.display()))?;
        let saved = registry.save_all(&store).context("saving encounters")?;
        info!(saved, path = %db_path.display(), "Encounters persisted");
    }

    if dump_events {
        print!("{}", world.events.to_json_lines().context("encoding events")?);
    }

    for (origin, state) in registry.states() {
        println!("{origin} {state}");
    }
    println!(
        "kills={} rewards={} bonus_drops={}",
        world.events.count(|e| matches!(e, WorldEvent::Killed { .. })),
        world.ejected().len(),
        world.bonus_drops().len(),
    );
    println!(
        "tick_max_ms={:.3} budget_ms={:.3}",
        registry.monitor().max_ms(),
        registry.monitor().budget_ms()
    );
    print!("{}", counters.to_prometheus());

    if registry.monitor().max_ms() > registry.monitor().budget_ms() {
        warn!("At least one tick exceeded the budget");
    }
    Ok(())
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}
