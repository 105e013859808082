//! Key-value state slots and their SQLite implementation.
//!
//! # Responsibility
//! - Read and write the `gajaTrips` / `gajaCurrentTripId` slots.
//! - Read the legacy `pilgrimagePlaces` slot for one-time migration.
//!
//! # Invariants
//! - `save_state` writes the trip list and the current id in one
//!   transaction; a reader never sees one without the other.
//! - The legacy slot is never written by this crate.
//! - Undecodable slot contents surface as `InvalidData`, never as an
//!   empty store.

use crate::db::DbError;
use crate::model::item::Item;
use crate::model::trip::{Trip, TripId};
use log::warn;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Slot holding the JSON array of trips.
pub const TRIPS_SLOT: &str = "gajaTrips";
/// Slot holding the current trip id as decimal text.
pub const CURRENT_TRIP_SLOT: &str = "gajaCurrentTripId";
/// Slot written by the single-list release; read-only input to migration.
pub const LEGACY_ITEMS_SLOT: &str = "pilgrimagePlaces";

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence failure for state slots.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// The slot exists but its contents cannot be decoded.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted state: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Snapshot read back from the current-format slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredState {
    pub trips: Vec<Trip>,
    /// `None` when the slot is missing or not a number.
    pub current_trip_id: Option<TripId>,
}

/// Durable storage contract used by the trip store.
pub trait StateRepository {
    /// Returns `None` when no current-format trip list has been saved yet.
    fn load_state(&self) -> RepoResult<Option<StoredState>>;
    /// Returns `None` when the legacy slot does not exist.
    fn load_legacy_items(&self) -> RepoResult<Option<Vec<Item>>>;
    /// Overwrites both current-format slots atomically.
    fn save_state(&self, trips: &[Trip], current_trip_id: Option<TripId>) -> RepoResult<()>;
}

/// SQLite-backed slot repository over the `kv_slots` table.
pub struct SqliteStateRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStateRepository<'conn> {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `InvalidData` when the connection was not opened through
    ///   `open_db`/`open_db_in_memory` and the slot table is missing.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let has_table: bool = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'kv_slots'
            );",
            [],
            |row| row.get(0),
        )?;
        if !has_table {
            return Err(RepoError::InvalidData(
                "kv_slots table is missing; open the database with open_db".to_string(),
            ));
        }
        Ok(Self { conn })
    }

    fn read_slot(&self, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_slots WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }
}

impl StateRepository for SqliteStateRepository<'_> {
    fn load_state(&self) -> RepoResult<Option<StoredState>> {
        let Some(raw_trips) = self.read_slot(TRIPS_SLOT)? else {
            return Ok(None);
        };
        let trips = serde_json::from_str::<Vec<Trip>>(&raw_trips).map_err(|err| {
            RepoError::InvalidData(format!("slot `{TRIPS_SLOT}` is not a trip list: {err}"))
        })?;

        let current_trip_id = match self.read_slot(CURRENT_TRIP_SLOT)? {
            Some(raw) => {
                let parsed = raw.trim().parse::<TripId>().ok();
                if parsed.is_none() {
                    warn!("event=slot_read module=repo status=degraded slot={CURRENT_TRIP_SLOT} reason=not_a_number");
                }
                parsed
            }
            None => None,
        };

        Ok(Some(StoredState {
            trips,
            current_trip_id,
        }))
    }

    fn load_legacy_items(&self) -> RepoResult<Option<Vec<Item>>> {
        let Some(raw) = self.read_slot(LEGACY_ITEMS_SLOT)? else {
            return Ok(None);
        };
        let items = serde_json::from_str::<Vec<Item>>(&raw).map_err(|err| {
            RepoError::InvalidData(format!(
                "slot `{LEGACY_ITEMS_SLOT}` is not an item list: {err}"
            ))
        })?;
        Ok(Some(items))
    }

    fn save_state(&self, trips: &[Trip], current_trip_id: Option<TripId>) -> RepoResult<()> {
        let encoded = serde_json::to_string(trips)
            .map_err(|err| RepoError::InvalidData(format!("failed to encode trips: {err}")))?;

        let tx = self.conn.unchecked_transaction()?;
        upsert_slot(&tx, TRIPS_SLOT, &encoded)?;
        match current_trip_id {
            Some(id) => upsert_slot(&tx, CURRENT_TRIP_SLOT, &id.to_string())?,
            None => {
                tx.execute("DELETE FROM kv_slots WHERE key = ?1;", [CURRENT_TRIP_SLOT])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn upsert_slot(conn: &Connection, key: &str, value: &str) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO kv_slots (key, value, updated_at)
         VALUES (?1, ?2, strftime('%s', 'now') * 1000)
         ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at;",
        params![key, value],
    )?;
    Ok(())
}
