//! Reward ejection timing.
//!
//! All instants are anchored on the start of the cooldown, recovered from the
//! stored end: `cooldown_start = cooldown_ends_at - target_cooldown_length`.
//! The shutter opens [`SHUTTER_OPEN_DELAY`] ticks after that, and rewards come
//! out on every multiple of [`TICKS_BETWEEN_EJECTIONS`] from it.

use crate::types::Tick;

/// Delay between the encounter ending and the reward shutter opening.
pub const SHUTTER_OPEN_DELAY: Tick = 40;

/// Interval between two ejections.
pub const TICKS_BETWEEN_EJECTIONS: Tick = 30;

/// Tick at which the cooldown started.
#[must_use]
pub fn cooldown_start(cooldown_ends_at: Tick, target_cooldown_length: Tick) -> Tick {
    cooldown_ends_at - target_cooldown_length
}

/// Whether the reward shutter may open at `now`.
#[must_use]
pub fn is_ready_to_open_shutter(
    cooldown_ends_at: Tick,
    target_cooldown_length: Tick,
    now: Tick,
) -> bool {
    now >= cooldown_start(cooldown_ends_at, target_cooldown_length) + SHUTTER_OPEN_DELAY
}

/// Whether `now` is an ejection instant.
#[must_use]
pub fn is_ready_to_eject(cooldown_ends_at: Tick, target_cooldown_length: Tick, now: Tick) -> bool {
    let elapsed = now - cooldown_start(cooldown_ends_at, target_cooldown_length);
    elapsed.rem_euclid(TICKS_BETWEEN_EJECTIONS) == 0
}
