//! Backup/restore codec for the whole trip collection.
//!
//! # Responsibility
//! - Export every trip (all fields, all items) as a pretty JSON array.
//! - Validate an imported document completely before it replaces anything.
//!
//! # Invariants
//! - Export never includes the current trip id.
//! - Import is all-or-nothing: on any `FormatError` the store is untouched.
//! - An accepted document carries no duplicate trip or item ids.

use crate::model::trip::{Trip, TripId};
use crate::repo::state_repo::StateRepository;
use crate::service::events::CoreEvent;
use crate::service::trip_store::{StoreResult, TripStore};
use chrono::{NaiveDate, Utc};
use log::{error, info};
use serde_json::Value;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const BACKUP_FILE_PREFIX: &str = "gaja-map-backup";

/// Rejection reasons for a backup document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Not parseable as JSON.
    Malformed(String),
    /// Parsed, but the root is not an array.
    NotASequence,
    /// Element `index` is not a trip record.
    NotTripShaped { index: usize, message: String },
    /// The same id appears on more than one trip or item.
    DuplicateId(i64),
}

impl Display for FormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(message) => write!(f, "backup is not valid JSON: {message}"),
            Self::NotASequence => write!(f, "backup root must be a list of trips"),
            Self::NotTripShaped { index, message } => {
                write!(f, "backup entry {index} is not a trip: {message}")
            }
            Self::DuplicateId(id) => write!(f, "backup contains duplicate id {id}"),
        }
    }
}

impl Error for FormatError {}

/// What an accepted import replaced the store with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub trip_count: usize,
    pub item_count: usize,
    pub current_trip_id: Option<TripId>,
}

/// Encodes trips as the human-readable export document.
pub fn encode_document(trips: &[Trip]) -> Result<String, FormatError> {
    serde_json::to_string_pretty(trips).map_err(|err| FormatError::Malformed(err.to_string()))
}

/// Decodes and validates an export document.
///
/// # Errors
/// - `Malformed` when `document` is not JSON.
/// - `NotASequence` when the root is not an array.
/// - `NotTripShaped` for the first element that is not a trip record, or
///   whose title is blank or day count is zero.
/// - `DuplicateId` when any trip or item id repeats.
pub fn decode_document(document: &str) -> Result<Vec<Trip>, FormatError> {
    let root: Value =
        serde_json::from_str(document).map_err(|err| FormatError::Malformed(err.to_string()))?;
    let Value::Array(elements) = root else {
        return Err(FormatError::NotASequence);
    };

    let trips = elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| -> Result<Trip, FormatError> {
            let not_trip_shaped = |message: String| FormatError::NotTripShaped { index, message };
            let trip = serde_json::from_value::<Trip>(element)
                .map_err(|err| not_trip_shaped(err.to_string()))?;
            trip.validate().map_err(|err| not_trip_shaped(err.to_string()))?;
            Ok(trip)
        })
        .collect::<Result<Vec<_>, _>>()?;

    ensure_unique_ids(&trips)?;
    Ok(trips)
}

/// File name for an export taken on `date`.
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("{BACKUP_FILE_PREFIX}-{}.json", date.format("%Y-%m-%d"))
}

fn ensure_unique_ids(trips: &[Trip]) -> Result<(), FormatError> {
    let mut seen = HashSet::new();
    let ids = trips
        .iter()
        .flat_map(|trip| std::iter::once(trip.id).chain(trip.items.iter().map(|item| item.id)));
    for id in ids {
        if !seen.insert(id) {
            return Err(FormatError::DuplicateId(id));
        }
    }
    Ok(())
}

impl<R: StateRepository> TripStore<R> {
    /// Serializes every trip to the export document.
    pub fn export_all(&self) -> StoreResult<String> {
        Ok(encode_document(self.trips())?)
    }

    /// Writes today's export document into `dir` and returns its path.
    pub fn export_to_dir(&self, dir: impl AsRef<Path>) -> StoreResult<PathBuf> {
        let document = self.export_all()?;
        let path = dir
            .as_ref()
            .join(backup_file_name(Utc::now().date_naive()));
        std::fs::write(&path, document)?;
        info!(
            "event=backup_export module=backup status=ok trips={}",
            self.trips().len()
        );
        Ok(path)
    }

    /// Replaces all trips with the contents of `document`.
    ///
    /// On success the first trip becomes current (a fresh trip is created
    /// when the document is an empty list), state is persisted, and
    /// `ImportCompleted` is raised so the view reloads everything.
    ///
    /// # Errors
    /// - `StoreError::Format` when the document is rejected; the store is
    ///   left exactly as it was.
    pub fn import_all(&mut self, document: &str) -> StoreResult<ImportReport> {
        let trips = match decode_document(document) {
            Ok(trips) => trips,
            Err(err) => {
                error!("event=backup_import module=backup status=error error={err}");
                return Err(err.into());
            }
        };

        let trip_count = trips.len();
        let item_count: usize = trips.iter().map(|trip| trip.items.len()).sum();
        let snapshot = self.snapshot();
        self.replace_all(trips);
        self.repair_current();
        self.commit(snapshot, &[CoreEvent::ImportCompleted { trip_count }])?;

        info!(
            "event=backup_import module=backup status=ok trips={trip_count} items={item_count}"
        );
        Ok(ImportReport {
            trip_count,
            item_count,
            current_trip_id: self.current_trip_id(),
        })
    }

    /// Reads a backup file and imports it.
    ///
    /// # Errors
    /// - `StoreError::Io` when the file cannot be read; nothing changes.
    pub fn import_from_path(&mut self, path: impl AsRef<Path>) -> StoreResult<ImportReport> {
        let document = std::fs::read_to_string(path)?;
        self.import_all(&document)
    }
}
