//! Core domain logic for Gaja-Map.
//! This crate is the single source of truth for trip/item invariants.

pub mod db;
pub mod id;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use id::IdGenerator;
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::item::{extract_map_url, Item, ItemDraft, ItemId, ItemPatch, ItemValidationError};
pub use model::trip::{Trip, TripId, TripSummary, TripValidationError, DEFAULT_TRIP_DAYS};
pub use repo::state_repo::{RepoError, RepoResult, SqliteStateRepository, StateRepository, StoredState};
pub use search::query::{query_items, DayFilter};
pub use service::archive_service::ArchiveManager;
pub use service::backup::{backup_file_name, FormatError, ImportReport};
pub use service::events::{CoreEvent, StateObserver};
pub use service::item_service::{ItemCollection, ToggleOutcome};
pub use service::trip_store::{
    LoadReport, LoadSource, StoreError, StoreResult, TripStore, NEW_TRIP_TITLE,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
