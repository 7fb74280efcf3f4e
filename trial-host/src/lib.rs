//! # trial-host: reference host for `trial-core`
//!
//! A small voxel world that implements the controller's host traits, plus
//! the pieces a game server would wrap around the controllers.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             simulate (bin)              │
//! │  ┌───────────────────────────────────┐  │
//! │  │           trial-host              │  │
//! │  │  ┌─────────────┐ ┌─────────────┐  │  │
//! │  │  │  SimWorld   │ │  Registry   │  │  │
//! │  │  └──────┬──────┘ └──────┬──────┘  │  │
//! │  │         │               │         │  │
//! │  │         ▼               ▼         │  │
//! │  │    ┌─────────────────────────┐    │  │
//! │  │    │       trial-core        │    │  │
//! │  │    └─────────────────────────┘    │  │
//! │  └───────────────────────────────────┘  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `world`: [`SimWorld`], the `WorldQuery`/`EncounterHost` implementation
//! - `events`: the log of everything controllers did to the world
//! - `config`: chamber presets and the run file
//! - `systems`: [`EncounterRegistry`], per-tick driving and persistence

pub mod config;
pub mod events;
pub mod systems;
pub mod world;

pub use config::{ChamberPreset, HostConfig};
pub use events::{EventLog, StampedEvent, WorldEvent};
pub use systems::EncounterRegistry;
pub use world::SimWorld;
