//! Encounter snapshots and their SQLite store.
//!
//! An [`EncounterSnapshot`] is everything a controller needs to resume:
//! state, runtime record, escalation flag, spawn override and the last
//! processed tick. Profiles and settings are *not* included; they come from
//! configuration when the controller is rebuilt.
//!
//! [`SnapshotStore`] keeps one JSON row per encounter:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS encounters (
//!     encounter_id TEXT PRIMARY KEY,
//!     origin       TEXT NOT NULL,
//!     data         BLOB NOT NULL,
//!     updated_at   TEXT NOT NULL,
//!     checksum     TEXT
//! );
//! ```
//!
//! JSON inside a BLOB keeps the schema stable as the runtime record grows;
//! the optional CRC-32 column flags corrupted rows.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{PersistenceConfig, SpawnChoice};
use crate::error::{Result, TrialError};
use crate::metrics;
use crate::runtime::EncounterRuntime;
use crate::state::EncounterState;
use crate::types::{BlockPos, EncounterId, Tick};

/// Persistable state of one controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterSnapshot {
    /// Controller identity.
    pub id: EncounterId,
    /// Anchor block.
    pub origin: BlockPos,
    /// Lifecycle state.
    pub state: EncounterState,
    /// Runtime record.
    pub runtime: EncounterRuntime,
    /// Whether the escalated profile is in effect.
    #[serde(default)]
    pub is_ominous: bool,
    /// Single-candidate override applied to both profiles.
    #[serde(default)]
    pub spawn_override: Option<SpawnChoice>,
    /// Last processed tick.
    #[serde(default)]
    pub last_tick: Option<Tick>,
}

impl EncounterSnapshot {
    /// Encode as JSON bytes.
    ///
    /// # Errors
    /// Returns [`TrialError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| TrialError::Serialization(e.to_string()))
    }

    /// Decode from JSON bytes.
    ///
    /// # Errors
    /// Returns [`TrialError::Serialization`] if the bytes are not a snapshot.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| TrialError::Serialization(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32_compute(data))
}

/// CRC-32 (ISO 3309), bitwise.
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 == 1 { (crc >> 1) ^ POLY } else { crc >> 1 };
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// SnapshotStore
// ---------------------------------------------------------------------------

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS encounters (
    encounter_id TEXT PRIMARY KEY,
    origin       TEXT NOT NULL,
    data         BLOB NOT NULL,
    updated_at   TEXT NOT NULL,
    checksum     TEXT
);";

/// SQLite-backed snapshot store. The connection is mutex-guarded, so a store
/// can be shared across threads.
///
/// ```no_run
/// # use trial_core::persistence::SnapshotStore;
/// # use trial_core::config::PersistenceConfig;
/// let store = SnapshotStore::open("chambers.db", &PersistenceConfig::default())?;
/// for id in store.list()? {
///     let _snapshot = store.load(&id)?;
/// }
/// # Ok::<(), trial_core::error::TrialError>(())
/// ```
pub struct SnapshotStore {
    conn: Mutex<Connection>,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SnapshotStore {
    /// Open (or create) a store at `path`.
    ///
    /// # Errors
    /// Returns [`TrialError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            "Snapshot store opened"
        );

        Ok(Self {
            conn: Mutex::new(conn),
            config: config.clone(),
            db_path,
        })
    }

    /// Open an in-memory store (tests, throwaway simulations).
    ///
    /// # Errors
    /// Returns [`TrialError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Save (upsert) a snapshot.
    ///
    /// # Errors
    /// Returns [`TrialError::Serialization`] if encoding fails, or
    /// [`TrialError::Database`] on SQLite failures.
    pub fn save(&self, snapshot: &EncounterSnapshot) -> Result<()> {
        let start = Instant::now();
        let json = snapshot.to_json()?;
        let checksum = self.config.checksum_enabled.then(|| crc32_hex(&json));
        let now = Utc::now().to_rfc3339();

        self.conn.lock().execute(
            "INSERT INTO encounters (encounter_id, origin, data, updated_at, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(encounter_id) DO UPDATE SET
                origin = excluded.origin,
                data = excluded.data,
                updated_at = excluded.updated_at,
                checksum = excluded.checksum",
            params![
                snapshot.id.to_string(),
                snapshot.origin.to_string(),
                json,
                now,
                checksum
            ],
        )?;

        metrics::counters().record_snapshot_saved();
        debug!(
            encounter = %snapshot.id,
            state = %snapshot.state,
            bytes = json.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved encounter snapshot"
        );
        Ok(())
    }

    /// Load a snapshot. `None` if the encounter was never saved.
    ///
    /// A checksum mismatch is logged; the data is still returned.
    ///
    /// # Errors
    /// Returns [`TrialError::Serialization`] if decoding fails, or
    /// [`TrialError::Database`] on SQLite failures.
    pub fn load(&self, id: &EncounterId) -> Result<Option<EncounterSnapshot>> {
        let row: Option<(Vec<u8>, Option<String>)> = {
            let conn = self.conn.lock();
            let mut stmt =
                conn.prepare_cached("SELECT data, checksum FROM encounters WHERE encounter_id = ?1")?;
            stmt.query_row(params![id.to_string()], |row| Ok((row.get(0)?, row.get(1)?)))
                .optional()?
        };
        let Some((data, stored)) = row else {
            return Ok(None);
        };

        if self.config.checksum_enabled {
            if let Some(expected) = stored {
                let actual = crc32_hex(&data);
                if expected != actual {
                    warn!(
                        encounter = %id,
                        expected = %expected,
                        actual = %actual,
                        "Snapshot checksum mismatch"
                    );
                }
            }
        }

        EncounterSnapshot::from_json(&data).map(Some)
    }

    /// Load every stored snapshot. Rows that fail to decode are skipped with a
    /// warning.
    ///
    /// # Errors
    /// Returns [`TrialError::Database`] on SQLite failures.
    pub fn load_all(&self) -> Result<Vec<EncounterSnapshot>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached("SELECT encounter_id, data FROM encounters")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;

        let mut snapshots = Vec::new();
        for row in rows {
            let (id, data) = row?;
            match EncounterSnapshot::from_json(&data) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => warn!(encounter = %id, error = %e, "Skipping undecodable snapshot"),
            }
        }
        Ok(snapshots)
    }

    /// Delete a snapshot; `true` if a row was removed.
    ///
    /// # Errors
    /// Returns [`TrialError::Database`] on SQLite failures.
    pub fn delete(&self, id: &EncounterId) -> Result<bool> {
        let deleted = self
            .conn
            .lock()
            .execute("DELETE FROM encounters WHERE encounter_id = ?1", params![id.to_string()])?;
        Ok(deleted > 0)
    }

    /// Identities of every stored encounter.
    ///
    /// # Errors
    /// Returns [`TrialError::Database`] on SQLite failures.
    pub fn list(&self) -> Result<Vec<EncounterId>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached("SELECT encounter_id FROM encounters")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            let raw = row?;
            match uuid::Uuid::parse_str(&raw) {
                Ok(uuid) => ids.push(EncounterId(uuid)),
                Err(_) => warn!(id = %raw, "Skipping row with invalid UUID"),
            }
        }
        Ok(ids)
    }

    /// Number of stored encounters.
    ///
    /// # Errors
    /// Returns [`TrialError::Database`] on SQLite failures.
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM encounters", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Copy the database to `dest_path` with SQLite's online-backup API.
    ///
    /// # Errors
    /// Returns [`TrialError::Database`] on SQLite failures.
    pub fn backup<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let conn = self.conn.lock();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&conn, &mut dest)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;
        info!(dest = %dest_path.as_ref().display(), "Snapshot store backup completed");
        Ok(())
    }

    /// Path of the database file (`:memory:` for in-memory stores).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// `Ok(true)` if SQLite's integrity check passes.
    ///
    /// # Errors
    /// Returns [`TrialError::Database`] if the check itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String = self
            .conn
            .lock()
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
