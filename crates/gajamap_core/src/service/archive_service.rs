//! Archive and history use-cases.
//!
//! # Responsibility
//! - Close out the current trip and provision a fresh one.
//! - List and reopen past trips.
//!
//! # Invariants
//! - A trip is historical when it is not the current one or when it is
//!   flagged `archived`. A trip the user merely switched away from is
//!   historical; an archived trip stays historical even while reopened, so
//!   the current trip shows up in history only when it is archived.
//! - Reopening never clears `archived`.
//! - Archiving leaves the archived trip's items untouched.

use crate::model::trip::{Trip, TripId, TripSummary, DEFAULT_TRIP_DAYS};
use crate::repo::state_repo::StateRepository;
use crate::service::trip_store::{StoreResult, TripStore, NEW_TRIP_TITLE};
use log::{debug, info};

/// Archive operations over a trip store.
///
/// Confirmation prompts belong to the caller: when the user cancels, the
/// operation is simply not invoked.
pub struct ArchiveManager<'s, R: StateRepository> {
    store: &'s mut TripStore<R>,
}

impl<'s, R: StateRepository> ArchiveManager<'s, R> {
    pub(crate) fn new(store: &'s mut TripStore<R>) -> Self {
        Self { store }
    }

    /// Flags the current trip archived and makes a new, empty trip current.
    ///
    /// The new trip is inserted at the front of the collection. Returns its
    /// id, or `None` when there was no current trip to archive.
    pub fn archive_current_and_start_new(&mut self) -> StoreResult<Option<TripId>> {
        let snapshot = self.store.snapshot();
        let Some(current) = self.store.current_mut() else {
            debug!("event=trip_archive module=archive status=skipped reason=no_current_trip");
            return Ok(None);
        };
        current.archived = true;
        let archived_id = current.id;

        let fresh = Trip::new(
            self.store.next_id(),
            NEW_TRIP_TITLE,
            DEFAULT_TRIP_DAYS,
            Vec::new(),
        );
        let fresh_id = fresh.id;
        self.store.trips_mut().insert(0, fresh);
        self.store.set_current(fresh_id);
        self.store.commit(snapshot, &[])?;

        info!(
            "event=trip_archive module=archive status=ok archived_trip_id={archived_id} new_trip_id={fresh_id}"
        );
        Ok(Some(fresh_id))
    }

    /// Every archived or non-current trip, in collection order.
    pub fn list_historical(&self) -> Vec<&Trip> {
        let current_id = self.store.current_trip_id();
        self.store
            .trips()
            .iter()
            .filter(|trip| trip.archived || Some(trip.id) != current_id)
            .collect()
    }

    /// History listing projected for display.
    pub fn historical_summaries(&self) -> Vec<TripSummary> {
        self.list_historical()
            .into_iter()
            .map(Trip::summary)
            .collect()
    }

    /// Makes `trip_id` current and persists. Unknown ids are a no-op.
    pub fn open_from_history(&mut self, trip_id: TripId) -> StoreResult<bool> {
        if self.store.trip(trip_id).is_none() {
            debug!("event=trip_open module=archive status=skipped reason=not_found trip_id={trip_id}");
            return Ok(false);
        }
        let snapshot = self.store.snapshot();
        self.store.set_current(trip_id);
        self.store.commit(snapshot, &[])?;
        Ok(true)
    }
}
