//! Trip store: the single owner of in-memory trip state.
//!
//! # Responsibility
//! - Restore state from durable slots, migrating the legacy single-list
//!   format once and seeding first-run data.
//! - Keep the current-trip pointer resolvable and persist every mutation.
//! - Hand out scoped facades (`items()`, `archive()`) for use-case APIs.
//!
//! # Invariants
//! - After `load_or_migrate`, the current id resolves to a trip in the
//!   collection.
//! - Every id issued by the store is greater than every id it has loaded,
//!   migrated or imported.
//! - Trip and item ids are unique across the collection after load; stored
//!   duplicates keep their first occurrence and the rest get fresh ids.
//! - Observers are notified only after the mutation has been persisted.
//! - A failed save restores the in-memory state it was about to persist.

use crate::id::IdGenerator;
use crate::model::item::{Item, ItemValidationError, DEFAULT_ITEM_DAY};
use crate::model::trip::{Trip, TripId, TripValidationError, DEFAULT_TRIP_DAYS};
use crate::repo::state_repo::{RepoError, StateRepository};
use crate::search::query::{query_items, DayFilter};
use crate::service::archive_service::ArchiveManager;
use crate::service::backup::FormatError;
use crate::service::events::{CoreEvent, StateObserver};
use crate::service::item_service::ItemCollection;
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Title of the trip wrapping migrated legacy items.
pub const LEGACY_TRIP_TITLE: &str = "My First Trip 🇰🇷";
/// Title of the trip seeded on first run.
pub const FIRST_RUN_TRIP_TITLE: &str = "My First Trip ✨";
/// Title of trips provisioned by archive or by pointer repair.
pub const NEW_TRIP_TITLE: &str = "New Trip";

const SAMPLE_ITEM_NAME: &str = "ソウル駅 (Sample)";
const SAMPLE_ITEM_URL: &str = "https://map.naver.com/p/entry/place/11630456?c=16.81,0,0,0,dh";
const SAMPLE_ITEM_MEMO: &str = "Welcome to Gaja-Map!\n推しの聖地へ\nReady? 가자!";

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by trip store operations.
///
/// Unknown trip/item ids are not errors; those operations are no-ops.
#[derive(Debug)]
pub enum StoreError {
    /// Item input rejected; nothing was changed.
    InvalidItem(ItemValidationError),
    /// Trip setting rejected; nothing was changed.
    InvalidTrip(TripValidationError),
    /// Backup document rejected; nothing was changed.
    Format(FormatError),
    /// Durable storage failure.
    Repo(RepoError),
    /// Backup file could not be read or written.
    Io(std::io::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidItem(err) => write!(f, "{err}"),
            Self::InvalidTrip(err) => write!(f, "{err}"),
            Self::Format(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "backup file error: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidItem(err) => Some(err),
            Self::InvalidTrip(err) => Some(err),
            Self::Format(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<ItemValidationError> for StoreError {
    fn from(value: ItemValidationError) -> Self {
        Self::InvalidItem(value)
    }
}

impl From<TripValidationError> for StoreError {
    fn from(value: TripValidationError) -> Self {
        Self::InvalidTrip(value)
    }
}

impl From<FormatError> for StoreError {
    fn from(value: FormatError) -> Self {
        Self::Format(value)
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Where the state came from during `load_or_migrate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Current-format slots were present.
    Restored,
    /// Legacy single-list slot was wrapped into one trip.
    MigratedLegacy { item_count: usize },
    /// Nothing stored; a sample trip was created.
    CreatedDefault,
}

impl LoadSource {
    fn label(self) -> &'static str {
        match self {
            Self::Restored => "restored",
            Self::MigratedLegacy { .. } => "legacy",
            Self::CreatedDefault => "default",
        }
    }
}

/// Summary of the last `load_or_migrate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub source: LoadSource,
    /// The stored current id did not resolve and was corrected.
    pub current_repaired: bool,
    /// Duplicate trip/item ids that were replaced with fresh ones.
    pub reissued_ids: usize,
}

/// In-memory state captured before a mutation, restored if its save fails.
pub(crate) struct Snapshot {
    trips: Vec<Trip>,
    current_trip_id: Option<TripId>,
}

/// Explicit state object for all trips and the current-trip pointer.
pub struct TripStore<R: StateRepository> {
    repo: R,
    trips: Vec<Trip>,
    current_trip_id: Option<TripId>,
    ids: IdGenerator,
    observers: Vec<Box<dyn StateObserver>>,
    load_report: LoadReport,
}

impl<R: StateRepository> TripStore<R> {
    /// Restores state using the system clock for new ids.
    pub fn load_or_migrate(repo: R) -> StoreResult<Self> {
        Self::load_with_ids(repo, IdGenerator::new())
    }

    /// Restores state from `repo`, migrating or seeding when needed.
    ///
    /// # Side effects
    /// - Persists immediately after a migration, a first-run seed, or a
    ///   current-pointer repair.
    /// - Emits one `store_load` logging event.
    pub fn load_with_ids(repo: R, ids: IdGenerator) -> StoreResult<Self> {
        let mut store = Self {
            repo,
            trips: Vec::new(),
            current_trip_id: None,
            ids,
            observers: Vec::new(),
            load_report: LoadReport {
                source: LoadSource::Restored,
                current_repaired: false,
                reissued_ids: 0,
            },
        };

        let source = if let Some(state) = store.repo.load_state()? {
            store.trips = state.trips;
            store.current_trip_id = state.current_trip_id;
            store.observe_loaded_ids();
            LoadSource::Restored
        } else if let Some(items) = store.repo.load_legacy_items()? {
            let item_count = items.len();
            for item in &items {
                store.ids.observe(item.id);
            }
            let trip = Trip::new(store.ids.next_id(), LEGACY_TRIP_TITLE, DEFAULT_TRIP_DAYS, items);
            store.current_trip_id = Some(trip.id);
            store.trips = vec![trip];
            LoadSource::MigratedLegacy { item_count }
        } else {
            let trip_id = store.ids.next_id();
            let sample = store.sample_item();
            let trip = Trip::new(trip_id, FIRST_RUN_TRIP_TITLE, DEFAULT_TRIP_DAYS, vec![sample]);
            store.current_trip_id = Some(trip.id);
            store.trips = vec![trip];
            LoadSource::CreatedDefault
        };

        let reissued_ids = store.reissue_duplicate_ids();
        let current_repaired = store.repair_current();
        if source != LoadSource::Restored || current_repaired || reissued_ids > 0 {
            store.save()?;
        }
        store.load_report = LoadReport {
            source,
            current_repaired,
            reissued_ids,
        };

        info!(
            "event=store_load module=store status=ok source={} trips={} current_repaired={} reissued_ids={}",
            source.label(),
            store.trips.len(),
            current_repaired,
            reissued_ids
        );
        Ok(store)
    }

    /// Persists the full trip collection and current id in one write.
    pub fn save(&self) -> StoreResult<()> {
        self.repo.save_state(&self.trips, self.current_trip_id)?;
        debug!(
            "event=store_save module=store status=ok trips={}",
            self.trips.len()
        );
        Ok(())
    }

    /// Returns how the last load obtained its state.
    pub fn load_report(&self) -> LoadReport {
        self.load_report
    }

    /// Registers an observer for post-persistence notifications.
    pub fn subscribe(&mut self, observer: impl StateObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// All trips in collection order (newest provisioned trips first).
    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn trip(&self, trip_id: TripId) -> Option<&Trip> {
        self.trips.iter().find(|trip| trip.id == trip_id)
    }

    pub fn current_trip_id(&self) -> Option<TripId> {
        self.current_trip_id
    }

    pub fn current(&self) -> Option<&Trip> {
        self.current_trip_id.and_then(|id| self.trip(id))
    }

    /// Points the store at `trip_id` without validating or persisting it.
    ///
    /// A dangling id makes current-trip operations no-ops until the next
    /// load repairs it. Use `archive().open_from_history` to switch and
    /// persist.
    pub fn set_current(&mut self, trip_id: TripId) {
        self.current_trip_id = Some(trip_id);
    }

    /// Replaces the whole collection and selects its first trip.
    ///
    /// Does not persist; callers decide when the replacement is final.
    pub fn replace_all(&mut self, trips: Vec<Trip>) {
        self.trips = trips;
        if let Some(first) = self.trips.first() {
            self.current_trip_id = Some(first.id);
        }
        self.observe_loaded_ids();
    }

    /// Display view of the current trip's items.
    pub fn query_current(&self, filter: &DayFilter, search: &str) -> Vec<&Item> {
        self.current()
            .map(|trip| query_items(&trip.items, filter, search))
            .unwrap_or_default()
    }

    /// Item operations scoped to the current trip.
    pub fn items(&mut self) -> ItemCollection<'_, R> {
        ItemCollection::new(self)
    }

    /// Archive and history operations.
    pub fn archive(&mut self) -> ArchiveManager<'_, R> {
        ArchiveManager::new(self)
    }

    /// Renames the current trip. Returns `false` when there is none.
    pub fn rename_current(&mut self, title: &str) -> StoreResult<bool> {
        let snapshot = self.snapshot();
        let Some(trip) = self.current_mut() else {
            return Ok(false);
        };
        trip.set_title(title)?;
        self.commit(snapshot, &[])?;
        Ok(true)
    }

    /// Changes the current trip's day count. Returns `false` when there is
    /// no current trip.
    pub fn set_current_days(&mut self, days: u32) -> StoreResult<bool> {
        let snapshot = self.snapshot();
        let Some(trip) = self.current_mut() else {
            return Ok(false);
        };
        trip.set_days(days)?;
        self.commit(snapshot, &[])?;
        Ok(true)
    }

    pub(crate) fn current_mut(&mut self) -> Option<&mut Trip> {
        let current_id = self.current_trip_id?;
        self.trips.iter_mut().find(|trip| trip.id == current_id)
    }

    pub(crate) fn trips_mut(&mut self) -> &mut Vec<Trip> {
        &mut self.trips
    }

    pub(crate) fn next_id(&mut self) -> i64 {
        self.ids.next_id()
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            trips: self.trips.clone(),
            current_trip_id: self.current_trip_id,
        }
    }

    /// Persists, then notifies `StateChanged` followed by `events`.
    ///
    /// When the save fails the store is rolled back to `snapshot` and no
    /// observer is notified.
    pub(crate) fn commit(&mut self, snapshot: Snapshot, events: &[CoreEvent]) -> StoreResult<()> {
        if let Err(err) = self.save() {
            error!("event=store_save module=store status=error rolled_back=true error={err}");
            self.trips = snapshot.trips;
            self.current_trip_id = snapshot.current_trip_id;
            return Err(err);
        }
        self.notify(&CoreEvent::StateChanged);
        for event in events {
            self.notify(event);
        }
        Ok(())
    }

    /// Points current at an existing trip, creating one if the collection
    /// is empty. Returns whether anything changed. Does not persist.
    pub(crate) fn repair_current(&mut self) -> bool {
        if self.current().is_some() {
            return false;
        }

        let dangling = self.current_trip_id;
        if let Some(first) = self.trips.first() {
            self.current_trip_id = Some(first.id);
        } else {
            let trip = Trip::new(self.ids.next_id(), NEW_TRIP_TITLE, DEFAULT_TRIP_DAYS, Vec::new());
            self.current_trip_id = Some(trip.id);
            self.trips.push(trip);
        }

        warn!(
            "event=current_repair module=store status=repaired had_id={} trips={}",
            dangling.is_some(),
            self.trips.len()
        );
        true
    }

    /// Gives every repeated trip or item id a fresh one, keeping the first
    /// occurrence. Expects loaded ids to be observed already. Does not
    /// persist.
    fn reissue_duplicate_ids(&mut self) -> usize {
        let mut seen = HashSet::new();
        let mut reissued = 0;
        for trip in &mut self.trips {
            if !seen.insert(trip.id) {
                trip.id = self.ids.next_id();
                seen.insert(trip.id);
                reissued += 1;
            }
            for item in &mut trip.items {
                if !seen.insert(item.id) {
                    item.id = self.ids.next_id();
                    seen.insert(item.id);
                    reissued += 1;
                }
            }
        }

        if reissued > 0 {
            warn!("event=id_reissue module=store status=repaired count={reissued}");
        }
        reissued
    }

    fn notify(&self, event: &CoreEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }

    fn observe_loaded_ids(&mut self) {
        for trip in &self.trips {
            self.ids.observe(trip.max_id());
        }
    }

    fn sample_item(&mut self) -> Item {
        Item {
            id: self.ids.next_id(),
            name: SAMPLE_ITEM_NAME.to_string(),
            url: SAMPLE_ITEM_URL.to_string(),
            day: DEFAULT_ITEM_DAY.to_string(),
            memo: SAMPLE_ITEM_MEMO.to_string(),
            visited: false,
        }
    }
}

