//! Ominous escalation.
//!
//! A scan that sees a participant carrying an escalation status switches the
//! encounter to its ominous profile and hard-resets the budgets: every tracked
//! entity is discarded and spawning restarts from zero. While escalated and
//! active, a second timer (`cooldown_ends_at` is reused for it) periodically
//! drops a bonus loot pickup above a random participant or spawned entity.

use rand::Rng;
use tracing::{debug, info};

use crate::config::TICKS_BETWEEN_ITEM_DROPS;
use crate::controller::TrialSpawner;
use crate::host::{EncounterCue, EncounterHost, EscalationStatus, ParticipantMode, ParticipantView};
use crate::metrics;
use crate::types::{BlockPos, ParticipantId, Tick, Vec3};

/// Pick the participant whose status escalates the encounter.
///
/// A strong status wins immediately; otherwise the last weak holder is used.
#[must_use]
pub fn find_escalating_participant<'a, I>(candidates: I) -> Option<(ParticipantView, EscalationStatus)>
where
    I: IntoIterator<Item = &'a ParticipantView>,
{
    let mut weak = None;
    for view in candidates {
        match view.escalation {
            EscalationStatus::Strong => return Some((*view, EscalationStatus::Strong)),
            EscalationStatus::Weak => weak = Some(*view),
            EscalationStatus::None => {}
        }
    }
    weak.map(|view| (view, EscalationStatus::Weak))
}

/// Escalate if one of the `visible` participants carries a status.
/// Returns whether the encounter escalated.
pub(crate) fn try_escalate<H: EncounterHost>(
    spawner: &mut TrialSpawner,
    host: &mut H,
    visible: &[ParticipantId],
    now: Tick,
) -> bool {
    let views: Vec<ParticipantView> = visible.iter().filter_map(|id| host.participant(*id)).collect();
    let Some((trigger, status)) = find_escalating_participant(&views) else {
        return false;
    };

    if status == EscalationStatus::Weak {
        host.upgrade_escalation_status(trigger.id);
    }
    host.emit(
        spawner.reference(),
        EncounterCue::EscalationTriggered {
            participant: trigger.id,
            position: trigger.eye_position,
        },
    );
    become_ominous(spawner, host, now);
    true
}

/// Switch to the ominous profile and hard-reset the runtime.
pub(crate) fn become_ominous<H: EncounterHost>(spawner: &mut TrialSpawner, host: &mut H, now: Tick) {
    spawner.is_ominous = true;
    let source = spawner.reference();
    host.emit(source, EncounterCue::BecameOminous);

    let discarded = discard_tracked_mobs(spawner, host);

    let ominous = spawner.ominous.clone();
    let runtime = &mut spawner.runtime;
    if !ominous.spawn_potentials.is_empty() {
        runtime.next_spawn_data = None;
    }
    runtime.total_mobs_spawned = 0;
    runtime.next_mob_spawns_at = now + ominous.spawn_delay();
    runtime.cooldown_ends_at = now + TICKS_BETWEEN_ITEM_DROPS;

    metrics::counters().record_escalation();
    info!(
        origin = %spawner.origin,
        discarded,
        tick = now,
        "Encounter escalated to ominous"
    );
}

/// Switch back to the normal profile.
pub(crate) fn clear_ominous<H: EncounterHost>(spawner: &mut TrialSpawner, host: &mut H) {
    if !spawner.is_ominous {
        return;
    }
    spawner.is_ominous = false;
    host.emit(spawner.reference(), EncounterCue::OminousCleared);
    debug!(origin = %spawner.origin, "Ominous profile cleared");
}

/// Despawn every tracked entity; returns how many were discarded.
pub(crate) fn discard_tracked_mobs<H: EncounterHost>(spawner: &mut TrialSpawner, host: &mut H) -> usize {
    let source = spawner.reference();
    let mobs = std::mem::take(&mut spawner.runtime.current_mobs);
    let count = mobs.len();
    for id in mobs {
        host.despawn(id);
        host.emit(source, EncounterCue::MobDiscarded { entity: id });
    }
    count
}

/// Drop a bonus pickup if the drop timer has elapsed. Failures are silent and
/// retried on the next active tick.
pub(crate) fn try_bonus_drop<H: EncounterHost>(spawner: &mut TrialSpawner, host: &mut H, now: Tick) {
    if now < spawner.runtime.cooldown_ends_at {
        return;
    }
    let Some(position) = bonus_drop_position(spawner, host) else {
        return;
    };
    let table = spawner.active_config().items_to_drop_when_ominous.clone();
    if host.spawn_bonus_drop(&table, position) {
        host.emit(spawner.reference(), EncounterCue::BonusDropStarted { position });
        spawner.runtime.cooldown_ends_at = now + TICKS_BETWEEN_ITEM_DROPS;
        metrics::counters().record_bonus_drop();
        debug!(origin = %spawner.origin, at = %position, "Bonus drop started");
    }
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    position: Vec3,
    height: f32,
}

fn bonus_drop_position<H: EncounterHost>(spawner: &mut TrialSpawner, host: &H) -> Option<Vec3> {
    let center = spawner.origin.center();
    let range = spawner.settings.player_range();
    let range_sqr = range * range;

    let players: Vec<Anchor> = spawner
        .runtime
        .detected_players
        .iter()
        .filter_map(|id| host.participant(*id))
        .filter(|p| {
            p.alive
                && p.mode == ParticipantMode::Survival
                && p.position.distance_sqr(center) <= range_sqr
        })
        .map(|p| Anchor {
            position: p.position,
            height: p.height,
        })
        .collect();
    if players.is_empty() {
        return None;
    }

    let candidates = if spawner.rng.gen_bool(0.5) {
        spawner
            .runtime
            .current_mobs
            .iter()
            .filter_map(|id| host.entity(*id))
            .filter(|e| e.alive && e.position.distance_sqr(center) <= range_sqr)
            .map(|e| Anchor {
                position: e.position,
                height: e.height,
            })
            .collect()
    } else {
        players
    };

    let anchor = match candidates.len() {
        0 => return None,
        1 => candidates[0],
        n => candidates[spawner.rng.gen_range(0..n)],
    };

    let lift = f64::from(anchor.height) + 2.0 + f64::from(spawner.rng.gen_range(0..4_u8));
    let top = anchor.position.up(lift);
    let drop = host.clip(anchor.position, top).center().up(-1.0);
    if host.has_collision(BlockPos::containing(drop)) {
        return None;
    }
    Some(drop)
}
