//! Spawn budget arithmetic.
//!
//! Both the lifetime (total) cap and the concurrent cap scale the same way:
//!
//!   cap = floor(base + per_participant × additional_participants)
//!
//! where `additional_participants` is the detected count minus one. Caps are
//! recomputed from the *current* participant count every tick and are never
//! cached, so they grow when participants join and shrink when they leave.

use crate::config::EncounterConfig;

/// Floored linear scaling shared by the total and concurrent caps.
///
/// Negative or NaN results clamp to zero.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn cap(base: f32, per_participant: f32, additional_participants: u32) -> u32 {
    let raw = base + per_participant * additional_participants as f32;
    if raw.is_nan() || raw <= 0.0 {
        return 0;
    }
    raw.floor() as u32
}

/// `max(0, detected - 1)`: participants beyond the first.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn additional_participants(detected: usize) -> u32 {
    detected.saturating_sub(1).min(u32::MAX as usize) as u32
}

/// Lifetime spawn cap for the given profile and participant count.
#[must_use]
pub fn total_cap(config: &EncounterConfig, additional_participants: u32) -> u32 {
    cap(
        config.total_mobs,
        config.total_mobs_added_per_player,
        additional_participants,
    )
}

/// Concurrent spawn cap for the given profile and participant count.
#[must_use]
pub fn concurrent_cap(config: &EncounterConfig, additional_participants: u32) -> u32 {
    cap(
        config.simultaneous_mobs,
        config.simultaneous_mobs_added_per_player,
        additional_participants,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_participant_uses_base() {
        let config = EncounterConfig::default();
        assert_eq!(total_cap(&config, 0), 6);
        assert_eq!(concurrent_cap(&config, 0), 2);
    }

    #[test]
    fn three_participants_scale_up() {
        let config = EncounterConfig::default();
        assert_eq!(total_cap(&config, 2), 10);
        assert_eq!(concurrent_cap(&config, 2), 4);
    }

    #[test]
    fn fractional_coefficients_floor() {
        assert_eq!(cap(1.0, 0.5, 1), 1);
        assert_eq!(cap(1.0, 0.5, 2), 2);
        assert_eq!(cap(2.9, 0.0, 7), 2);
    }

    #[test]
    fn additional_never_negative() {
        assert_eq!(additional_participants(0), 0);
        assert_eq!(additional_participants(1), 0);
        assert_eq!(additional_participants(4), 3);
    }

    #[test]
    fn degenerate_inputs_clamp_to_zero() {
        assert_eq!(cap(-3.0, 0.0, 0), 0);
        assert_eq!(cap(f32::NAN, 1.0, 1), 0);
    }
}
