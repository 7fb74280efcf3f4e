//! # Trial Core Library
//!
//! Game-agnostic controller for repeatable combat encounters anchored to a
//! block ("trial spawners").
//!
//! A [`TrialSpawner`] is ticked once per game tick. It scans for nearby
//! participants, spawns entities within budgets that scale with the number of
//! participants, escalates to a harder *ominous* profile when a participant
//! carries the right status, ejects one reward per participant once the
//! encounter is won, then cools down before it can run again.
//!
//! The controller owns no world. Everything it needs goes through the
//! [`host::WorldQuery`] and [`host::EncounterHost`] traits:
//!
//! ```text
//! host ──tick(now)──► TrialSpawner ──► EncounterState::tick_and_next
//!                          │                     │
//!                          ▼                     ▼
//!                   EncounterRuntime      host callbacks (spawn, eject, cues)
//! ```
//!
//! ## Performance Contract
//!
//! A tick does no allocation-heavy work outside the scan ticks (one in
//! twenty per controller) and never blocks; controllers share only immutable
//! data and can be ticked from different threads.

#![deny(clippy::unwrap_used)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod budget;
pub mod config;
pub mod controller;
pub mod detection;
pub mod ejection;
pub mod error;
pub mod host;
pub mod metrics;
pub mod ominous;
pub mod persistence;
pub mod runtime;
pub mod state;
pub mod types;
pub mod weighted;

pub use config::{ControllerSettings, EncounterConfig, SpawnChoice, TrialConfig};
pub use controller::TrialSpawner;
pub use detection::{DetectorKind, ParticipantDetector};
pub use error::{Result, TrialError};
pub use host::{EncounterCue, EncounterHost, EncounterRef, WorldQuery};
pub use persistence::{EncounterSnapshot, SnapshotStore};
pub use runtime::EncounterRuntime;
pub use state::EncounterState;
pub use types::*;
