//! Core type definitions for the trial spawner.
//!
//! Identity newtypes, block/world coordinates, loot table keys and the game
//! tick. All types are serializable so they can be carried in snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Game time measured in ticks since world creation.
pub type Tick = i64;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Identifier of an entity spawned on behalf of an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Create a new random entity ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a participant (typically a player) that can trigger and scale
/// an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    /// Create a new random participant ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one encounter controller instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncounterId(pub Uuid);

impl EncounterId {
    /// Create a new random encounter ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EncounterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EncounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key of a loot table owned by the host (e.g. `spawners/trial_chamber/consumables`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LootTableId(pub String);

impl LootTableId {
    /// Create a loot table key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl fmt::Display for LootTableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Spatial
// ---------------------------------------------------------------------------

/// Integer block coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct BlockPos {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
}

impl BlockPos {
    /// The block at the world origin.
    pub const ZERO: Self = Self { x: 0, y: 0, z: 0 };

    /// Create a block position.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The block containing a world position.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn containing(pos: Vec3) -> Self {
        Self {
            x: pos.x.floor() as i32,
            y: pos.y.floor() as i32,
            z: pos.z.floor() as i32,
        }
    }

    /// Center point of this block.
    #[must_use]
    pub fn center(self) -> Vec3 {
        Vec3::new(
            f64::from(self.x) + 0.5,
            f64::from(self.y) + 0.5,
            f64::from(self.z) + 0.5,
        )
    }

    /// Offset by `dy` blocks vertically.
    #[must_use]
    pub const fn above(self, dy: i32) -> Self {
        Self {
            x: self.x,
            y: self.y + dy,
            z: self.z,
        }
    }

    /// Squared distance between the two block corners.
    #[must_use]
    pub fn dist_sqr(self, other: Self) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        let dz = f64::from(self.z - other.z);
        dx * dx + dy * dy + dz * dz
    }

    /// Whether this block is strictly closer than `range` to `other`.
    #[must_use]
    pub fn closer_than(self, other: Self, range: f64) -> bool {
        self.dist_sqr(other) < range * range
    }

    /// Pack into a single `i64`: 26 bits X, 26 bits Z, 12 bits Y.
    ///
    /// Used as a cheap per-location hash; distinct positions stay distinct
    /// inside the packed range.
    #[must_use]
    pub fn as_long(self) -> i64 {
        const XZ_MASK: i64 = (1 << 26) - 1;
        const Y_MASK: i64 = (1 << 12) - 1;
        ((i64::from(self.x) & XZ_MASK) << 38)
            | ((i64::from(self.z) & XZ_MASK) << 12)
            | (i64::from(self.y) & Y_MASK)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.x, self.y, self.z)
    }
}

/// A continuous position in the world.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Vec3 {
    /// Create a position.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Offset vertically by `dy`.
    #[must_use]
    pub fn up(self, dy: f64) -> Self {
        Self {
            y: self.y + dy,
            ..self
        }
    }

    /// Squared distance to `other`.
    #[must_use]
    pub fn distance_sqr(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Linear interpolation toward `other` (t = 0 → self, t = 1 → other).
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

/// Block and sky light at a block, both 0–15.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightLevels {
    /// Light emitted by blocks.
    pub block: u8,
    /// Light from the sky.
    pub sky: u8,
}

impl Default for LightLevels {
    fn default() -> Self {
        Self { block: 0, sky: 15 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_packs_to_zero() {
        assert_eq!(BlockPos::ZERO.as_long(), 0);
    }

    #[test]
    fn packing_keeps_axes_apart() {
        assert_eq!(BlockPos::new(0, 1, 0).as_long(), 1);
        assert_eq!(BlockPos::new(0, 0, 1).as_long(), 1 << 12);
        assert_eq!(BlockPos::new(1, 0, 0).as_long(), 1 << 38);
        assert_ne!(BlockPos::new(-1, 0, 0).as_long(), BlockPos::new(1, 0, 0).as_long());
    }

    #[test]
    fn containing_floors_negative_coordinates() {
        let pos = BlockPos::containing(Vec3::new(-0.5, 64.9, 3.0));
        assert_eq!(pos, BlockPos::new(-1, 64, 3));
    }

    #[test]
    fn closer_than_is_strict() {
        let a = BlockPos::ZERO;
        assert!(a.closer_than(BlockPos::new(13, 0, 0), 14.0));
        assert!(!a.closer_than(BlockPos::new(14, 0, 0), 14.0));
    }
}
