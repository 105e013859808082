//! FFI use-case API for the Flutter view layer.
//!
//! # Responsibility
//! - Expose the trip/item view contract as sync, never-panicking calls.
//! - Flatten core results into plain response envelopes the view can
//!   render without knowing core error types.
//!
//! # Invariants
//! - Every call opens the state database, loads (and if needed migrates or
//!   repairs) the store, performs one use-case, and drops everything.
//! - Calls are serialized process-wide; two calls never interleave their
//!   load-modify-save cycles.
//! - Exported functions must not panic across the FFI boundary.

use chrono::{NaiveDate, Utc};
use gajamap_core::db::open_db;
use gajamap_core::{
    backup_file_name, core_version as core_version_inner, init_logging as init_logging_inner,
    ping as ping_inner, DayFilter, Item, ItemDraft, ItemPatch, SqliteStateRepository,
    StoreResult, Trip, TripStore, TripSummary,
};
use log::warn;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

const DB_FILE_NAME: &str = "gajamap.sqlite3";
const DB_PATH_ENV: &str = "GAJAMAP_DB_PATH";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static STORE_LOCK: Mutex<()> = Mutex::new(());

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Returns an empty string on success and an error message otherwise.
/// Safe to call repeatedly with the same `level + log_dir`.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// One place card as rendered by the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub day: String,
    pub memo: String,
    pub visited: bool,
}

/// Trip header shown above the list and in history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripView {
    pub id: i64,
    pub title: String,
    pub days: u32,
    pub archived: bool,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    pub item_count: u32,
    pub visited_count: u32,
}

/// Envelope for calls that return the current trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripResponse {
    pub ok: bool,
    pub trip: Option<TripView>,
    pub message: String,
}

/// Envelope for the filtered item list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemListResponse {
    pub ok: bool,
    pub items: Vec<ItemView>,
    /// Unfiltered item count of the current trip, so the view can tell
    /// "empty trip" from "no matches".
    pub total_in_trip: u32,
    pub message: String,
}

/// Envelope for history listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripListResponse {
    pub ok: bool,
    pub trips: Vec<TripView>,
    pub message: String,
}

/// Envelope for mutating calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// Id of the item/trip the call created or touched, when relevant.
    pub target_id: Option<i64>,
    /// Play the celebration effect: an item just became visited.
    pub became_visited: bool,
    /// Reload every cached view: an import replaced all trips.
    pub reload_required: bool,
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, target_id: Option<i64>) -> Self {
        Self {
            ok: true,
            target_id,
            became_visited: false,
            reload_required: false,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            target_id: None,
            became_visited: false,
            reload_required: false,
            message: message.into(),
        }
    }
}

/// Envelope for backup export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResponse {
    pub ok: bool,
    pub document: String,
    /// Suggested download file name, dated today.
    pub file_name: String,
    pub message: String,
}

/// Loads state (migrating or repairing as needed) and returns the current
/// trip. Call once at startup and after `reload_required`.
#[flutter_rust_bridge::frb(sync)]
pub fn load_current_trip() -> TripResponse {
    match with_store(|store| Ok(store.current().map(to_trip_view))) {
        Ok(trip) => TripResponse {
            ok: true,
            trip,
            message: String::new(),
        },
        Err(message) => TripResponse {
            ok: false,
            trip: None,
            message: format!("load_current_trip failed: {message}"),
        },
    }
}

/// Adds a place to the current trip. `url` may be shared text that
/// contains the map link.
#[flutter_rust_bridge::frb(sync)]
pub fn add_item(name: String, url: String, day: String, memo: String) -> ActionResponse {
    let draft = ItemDraft::new(name, url, day, memo);
    match with_store(|store| store.items().add(draft)) {
        Ok(Some(item)) => ActionResponse::success("Place added.", Some(item.id)),
        Ok(None) => ActionResponse::success("No current trip.", None),
        Err(message) => ActionResponse::failure(format!("add_item failed: {message}")),
    }
}

/// Deletes a place from the current trip. Unknown ids succeed as no-ops.
#[flutter_rust_bridge::frb(sync)]
pub fn remove_item(item_id: i64) -> ActionResponse {
    match with_store(|store| store.items().remove(item_id)) {
        Ok(_) => ActionResponse::success("Place removed.", Some(item_id)),
        Err(message) => ActionResponse::failure(format!("remove_item failed: {message}")),
    }
}

/// Edits a place. `None` or blank name/url/day keep the previous value;
/// `memo` accepts an empty string.
#[flutter_rust_bridge::frb(sync)]
pub fn update_item(
    item_id: i64,
    name: Option<String>,
    url: Option<String>,
    day: Option<String>,
    memo: Option<String>,
) -> ActionResponse {
    let patch = ItemPatch {
        name,
        url,
        day,
        memo,
    };
    match with_store(|store| store.items().update(item_id, &patch)) {
        Ok(_) => ActionResponse::success("Place updated.", Some(item_id)),
        Err(message) => ActionResponse::failure(format!("update_item failed: {message}")),
    }
}

/// Flips a place's visited checkbox.
#[flutter_rust_bridge::frb(sync)]
pub fn toggle_visited(item_id: i64) -> ActionResponse {
    match with_store(|store| store.items().toggle_visited(item_id)) {
        Ok(outcome) => ActionResponse {
            became_visited: outcome.is_some_and(|outcome| outcome.became_visited),
            ..ActionResponse::success("Visited state updated.", Some(item_id))
        },
        Err(message) => ActionResponse::failure(format!("toggle_visited failed: {message}")),
    }
}

/// Removes every place of the current trip.
#[flutter_rust_bridge::frb(sync)]
pub fn clear_items() -> ActionResponse {
    match with_store(|store| store.items().clear()) {
        Ok(removed) => ActionResponse::success(format!("Removed {removed} place(s)."), None),
        Err(message) => ActionResponse::failure(format!("clear_items failed: {message}")),
    }
}

/// Returns the current trip's display list for a day tab and search text.
#[flutter_rust_bridge::frb(sync)]
pub fn query_items(day_filter: String, search: String) -> ItemListResponse {
    let filter = DayFilter::parse(&day_filter);
    let result = with_store(|store| {
        let total = store.current().map_or(0, |trip| trip.items.len());
        let items = store
            .query_current(&filter, &search)
            .into_iter()
            .map(to_item_view)
            .collect::<Vec<_>>();
        Ok((items, total))
    });

    match result {
        Ok((items, total)) => ItemListResponse {
            ok: true,
            items,
            total_in_trip: count_u32(total),
            message: String::new(),
        },
        Err(message) => ItemListResponse {
            ok: false,
            items: Vec::new(),
            total_in_trip: 0,
            message: format!("query_items failed: {message}"),
        },
    }
}

/// Renames the current trip.
#[flutter_rust_bridge::frb(sync)]
pub fn rename_trip(title: String) -> ActionResponse {
    match with_store(|store| store.rename_current(&title)) {
        Ok(_) => ActionResponse::success("Trip renamed.", None),
        Err(message) => ActionResponse::failure(format!("rename_trip failed: {message}")),
    }
}

/// Changes the current trip's day count.
#[flutter_rust_bridge::frb(sync)]
pub fn set_trip_days(days: u32) -> ActionResponse {
    match with_store(|store| store.set_current_days(days)) {
        Ok(_) => ActionResponse::success("Trip duration updated.", None),
        Err(message) => ActionResponse::failure(format!("set_trip_days failed: {message}")),
    }
}

/// Archives the current trip and opens a new one. The view asks for
/// confirmation before calling this.
#[flutter_rust_bridge::frb(sync)]
pub fn archive_current_and_start_new() -> ActionResponse {
    match with_store(|store| store.archive().archive_current_and_start_new()) {
        Ok(new_trip_id) => ActionResponse::success("Trip archived.", new_trip_id),
        Err(message) => ActionResponse::failure(format!(
            "archive_current_and_start_new failed: {message}"
        )),
    }
}

/// Lists every archived or non-current trip.
#[flutter_rust_bridge::frb(sync)]
pub fn list_historical() -> TripListResponse {
    match with_store(|store| Ok(store.archive().historical_summaries())) {
        Ok(summaries) => TripListResponse {
            ok: true,
            trips: summaries.into_iter().map(summary_to_trip_view).collect(),
            message: String::new(),
        },
        Err(message) => TripListResponse {
            ok: false,
            trips: Vec::new(),
            message: format!("list_historical failed: {message}"),
        },
    }
}

/// Switches to a trip from history and persists the selection. Also serves
/// as the view's `setCurrentTrip`, since nothing survives between calls
/// unless it is persisted.
#[flutter_rust_bridge::frb(sync)]
pub fn open_from_history(trip_id: i64) -> ActionResponse {
    match with_store(|store| store.archive().open_from_history(trip_id)) {
        Ok(true) => ActionResponse::success("Trip opened.", Some(trip_id)),
        Ok(false) => ActionResponse::success("Trip not found.", None),
        Err(message) => ActionResponse::failure(format!("open_from_history failed: {message}")),
    }
}

/// Serializes every trip into a backup document.
#[flutter_rust_bridge::frb(sync)]
pub fn export_all() -> ExportResponse {
    let file_name = backup_file_name(chrono_today());
    match with_store(|store| store.export_all()) {
        Ok(document) => ExportResponse {
            ok: true,
            document,
            file_name,
            message: String::new(),
        },
        Err(message) => ExportResponse {
            ok: false,
            document: String::new(),
            file_name,
            message: format!("export_all failed: {message}"),
        },
    }
}

/// Replaces all trips with a backup document. The view asks for
/// confirmation before calling this and reloads on `reload_required`.
#[flutter_rust_bridge::frb(sync)]
pub fn import_all(document: String) -> ActionResponse {
    match with_store(|store| store.import_all(&document)) {
        Ok(report) => ActionResponse {
            reload_required: true,
            ..ActionResponse::success(
                format!("Restored {} trip(s).", report.trip_count),
                report.current_trip_id,
            )
        },
        Err(message) => ActionResponse::failure(format!("import_all failed: {message}")),
    }
}

fn with_store<T>(
    f: impl FnOnce(&mut TripStore<SqliteStateRepository<'_>>) -> StoreResult<T>,
) -> Result<T, String> {
    let _guard = STORE_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let db_path = resolve_db_path();
    let conn = open_db(&db_path).map_err(|err| format!("state DB open failed: {err}"))?;
    let repo = SqliteStateRepository::try_new(&conn)
        .map_err(|err| format!("state repo init failed: {err}"))?;
    let mut store = TripStore::load_or_migrate(repo).map_err(|err| err.to_string())?;
    f(&mut store).map_err(|err| {
        warn!("event=ffi_call module=ffi status=error error={err}");
        err.to_string()
    })
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn chrono_today() -> NaiveDate {
    Utc::now().date_naive()
}

fn count_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn to_item_view(item: &Item) -> ItemView {
    ItemView {
        id: item.id,
        name: item.name.clone(),
        url: item.url.clone(),
        day: item.day.clone(),
        memo: item.memo.clone(),
        visited: item.visited,
    }
}

fn to_trip_view(trip: &Trip) -> TripView {
    summary_to_trip_view(trip.summary())
}

fn summary_to_trip_view(summary: TripSummary) -> TripView {
    TripView {
        id: summary.id,
        title: summary.title,
        days: summary.days,
        archived: summary.archived,
        created_at: summary.created_at.to_rfc3339(),
        item_count: count_u32(summary.item_count),
        visited_count: count_u32(summary.visited_count),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        add_item, archive_current_and_start_new, core_version, export_all, import_all,
        init_logging, list_historical, load_current_trip, open_from_history, ping, query_items,
        remove_item, toggle_visited, update_item,
    };

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(error.contains("unsupported log level"));
    }

    // Single flow test: every call shares one process-wide database file.
    #[test]
    fn view_contract_flow_against_temp_database() {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::env::set_var("GAJAMAP_DB_PATH", dir.path().join("flow.sqlite3"));

        let loaded = load_current_trip();
        assert!(loaded.ok, "{}", loaded.message);
        let first_trip = loaded.trip.expect("startup always has a current trip");

        let rejected = add_item(
            "Cafe".to_string(),
            "no link".to_string(),
            "1".to_string(),
            String::new(),
        );
        assert!(!rejected.ok);
        assert!(rejected.message.contains("http(s)"));

        let added = add_item(
            "Tokyo Tower".to_string(),
            "see https://maps.example/tower".to_string(),
            "1".to_string(),
            String::new(),
        );
        assert!(added.ok, "{}", added.message);
        let item_id = added.target_id.expect("add returns the item id");

        let found = query_items("1".to_string(), "TOWER".to_string());
        assert!(found.ok, "{}", found.message);
        assert_eq!(found.items.len(), 1);
        assert_eq!(found.items[0].url, "https://maps.example/tower");

        let edited = update_item(
            item_id,
            None,
            None,
            Some("2".to_string()),
            Some("night".to_string()),
        );
        assert!(edited.ok, "{}", edited.message);

        let visited = toggle_visited(item_id);
        assert!(visited.became_visited);
        let unvisited = toggle_visited(item_id);
        assert!(unvisited.ok && !unvisited.became_visited);

        let backup = export_all();
        assert!(backup.ok, "{}", backup.message);
        assert!(backup.file_name.starts_with("gaja-map-backup-"));

        let archived = archive_current_and_start_new();
        assert!(archived.ok, "{}", archived.message);
        let history = list_historical();
        assert!(history.trips.iter().any(|trip| trip.id == first_trip.id && trip.archived));

        let reopened = open_from_history(first_trip.id);
        assert!(reopened.ok && reopened.target_id == Some(first_trip.id));

        let bad_import = import_all(r#"{"not":"a list"}"#.to_string());
        assert!(!bad_import.ok);
        assert!(!bad_import.reload_required);

        let restored = import_all(backup.document);
        assert!(restored.ok, "{}", restored.message);
        assert!(restored.reload_required);
        assert_eq!(restored.target_id, Some(first_trip.id));

        let removed = remove_item(item_id);
        assert!(removed.ok);
        let after = query_items("all".to_string(), String::new());
        assert!(after.items.iter().all(|item| item.id != item_id));
    }
}
