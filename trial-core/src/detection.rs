//! Participant detection.
//!
//! A [`ParticipantDetector`] answers "who is here?" for a given origin and
//! radius. The controller throttles how often it asks: a scan only happens on
//! ticks where the packed origin plus the game time is a multiple of
//! [`SCAN_INTERVAL`], which spreads independent controllers across ticks
//! without storing a timer.
//!
//! The first scan of an encounter requires line of sight; once someone has
//! been admitted, the set is extended without it.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::controller::TrialSpawner;
use crate::host::{EncounterCue, EncounterHost, ParticipantMode, ParticipantView, WorldQuery};
use crate::metrics;
use crate::ominous;
use crate::state::EncounterState;
use crate::types::{BlockPos, ParticipantId, Tick};

/// Scans happen at most once per this many ticks.
pub const SCAN_INTERVAL: Tick = 20;

/// Minimum delay between admitting new participants and the next spawn.
pub const DETECTION_GRACE_TICKS: Tick = 40;

/// Pluggable participant detection strategy.
pub trait ParticipantDetector: Send + Sync + fmt::Debug {
    /// Participants near `origin` that count for this encounter.
    fn detect(
        &self,
        world: &dyn WorldQuery,
        origin: BlockPos,
        range: f64,
        require_line_of_sight: bool,
    ) -> Vec<ParticipantId>;
}

/// Built-in detection strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    /// Living participants that are neither creative nor spectating.
    #[default]
    SurvivalPlayers,
    /// Living participants that are not spectating.
    IncludingCreativePlayers,
    /// Every living participant.
    AnyParticipants,
}

impl DetectorKind {
    fn admits(self, view: &ParticipantView) -> bool {
        if !view.alive {
            return false;
        }
        match self {
            Self::SurvivalPlayers => view.mode == ParticipantMode::Survival,
            Self::IncludingCreativePlayers => view.mode != ParticipantMode::Spectator,
            Self::AnyParticipants => true,
        }
    }
}

impl ParticipantDetector for DetectorKind {
    fn detect(
        &self,
        world: &dyn WorldQuery,
        origin: BlockPos,
        range: f64,
        require_line_of_sight: bool,
    ) -> Vec<ParticipantId> {
        let center = origin.center();
        world
            .participants_within(center, range)
            .into_iter()
            .filter(|p| self.admits(p))
            .filter(|p| p.block_position().closer_than(origin, range))
            .filter(|p| !require_line_of_sight || world.has_line_of_sight(center, p.eye_position))
            .map(|p| p.id)
            .collect()
    }
}

/// Whether a controller at `origin` scans on tick `now`.
#[must_use]
pub fn is_scan_tick(origin: BlockPos, now: Tick) -> bool {
    origin.as_long().wrapping_add(now) % SCAN_INTERVAL == 0
}

/// Scan for participants and admit them into the encounter.
///
/// May escalate the encounter as a side effect (see [`ominous`]).
pub(crate) fn try_detect<H: EncounterHost>(spawner: &mut TrialSpawner, host: &mut H, now: Tick) {
    if !is_scan_tick(spawner.origin, now) {
        return;
    }
    let in_cooldown = spawner.state == EncounterState::Cooldown;
    if in_cooldown && spawner.is_ominous {
        return;
    }

    metrics::counters().record_scan();
    let origin = spawner.origin;
    let range = spawner.settings.player_range();
    let detector = spawner.detector.clone();

    let visible = detector.detect(&*host, origin, range, true);
    let escalated =
        !spawner.is_ominous && !visible.is_empty() && ominous::try_escalate(spawner, host, &visible, now);

    // Outside an escalation, cooldown scans never restart the encounter.
    if in_cooldown && !escalated {
        return;
    }

    let found = if spawner.runtime.detected_players.is_empty() {
        visible
    } else {
        detector.detect(&*host, origin, range, false)
    };

    if spawner.runtime.admit_participants(found) {
        let runtime = &mut spawner.runtime;
        runtime.next_mob_spawns_at = runtime
            .next_mob_spawns_at
            .max(now + DETECTION_GRACE_TICKS);
        let count = runtime.detected_players.len();
        debug!(origin = %origin, participants = count, "Participants admitted");
        if !escalated {
            host.emit(
                spawner.reference(),
                EncounterCue::ParticipantsDetected {
                    count,
                    ominous: spawner.is_ominous,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::stub::StubHost;

    #[test]
    fn origin_scans_every_twentieth_tick() {
        let scans: Vec<Tick> = (0..100).filter(|&t| is_scan_tick(BlockPos::ZERO, t)).collect();
        assert_eq!(scans, vec![0, 20, 40, 60, 80]);
    }

    #[test]
    fn neighbouring_origins_desynchronize() {
        let a = BlockPos::new(0, 64, 0);
        let b = BlockPos::new(0, 65, 0);
        let first_a = (0..20).find(|&t| is_scan_tick(a, t));
        let first_b = (0..20).find(|&t| is_scan_tick(b, t));
        assert!(first_a.is_some());
        assert!(first_b.is_some());
        assert_ne!(first_a, first_b);
    }

    #[test]
    fn survival_detector_skips_creative_and_spectators() {
        let mut host = StubHost::default();
        let survivor = host.add_participant(1);
        let builder = host.add_participant(2);
        let ghost = host.add_participant(3);
        host.participants.get_mut(&builder).expect("builder").mode = ParticipantMode::Creative;
        host.participants.get_mut(&ghost).expect("ghost").mode = ParticipantMode::Spectator;

        let strict = DetectorKind::SurvivalPlayers.detect(&host, BlockPos::ZERO, 14.0, true);
        assert_eq!(strict, vec![survivor]);

        let lenient =
            DetectorKind::IncludingCreativePlayers.detect(&host, BlockPos::ZERO, 14.0, true);
        assert_eq!(lenient.len(), 2);
        assert!(!lenient.contains(&ghost));
    }

    #[test]
    fn dead_participants_are_ignored() {
        let mut host = StubHost::default();
        let id = host.add_participant(1);
        host.participants.get_mut(&id).expect("participant").alive = false;
        assert!(DetectorKind::AnyParticipants
            .detect(&host, BlockPos::ZERO, 14.0, false)
            .is_empty());
    }

    #[test]
    fn range_check_is_strict() {
        let mut host = StubHost::default();
        let id = host.add_participant(1);
        let far = crate::types::Vec3::new(14.2, 0.0, 0.0);
        let view = host.participants.get_mut(&id).expect("participant");
        view.position = far;
        view.eye_position = far.up(1.6);
        assert!(DetectorKind::SurvivalPlayers
            .detect(&host, BlockPos::ZERO, 14.0, false)
            .is_empty());
    }
}
