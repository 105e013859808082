//! Item use-cases on the current trip.
//!
//! # Responsibility
//! - Add, edit, remove, toggle and clear items of the current trip.
//! - Persist through the store after every effective change.
//!
//! # Invariants
//! - Operations never touch items of a non-current trip.
//! - Unknown item ids and a missing current trip are silent no-ops.
//! - `ItemBecameVisited` is raised only on an unvisited -> visited flip.
//! - A change whose save fails is undone in memory as well.

use crate::model::item::{Item, ItemDraft, ItemId, ItemPatch};
use crate::repo::state_repo::StateRepository;
use crate::service::events::CoreEvent;
use crate::service::trip_store::{StoreResult, TripStore};
use log::debug;

/// Result of flipping an item's visited flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub item_id: ItemId,
    /// Flag value after the toggle.
    pub visited: bool,
    /// True only when the item went from unvisited to visited.
    pub became_visited: bool,
}

/// Item operations scoped to the store's current trip.
pub struct ItemCollection<'s, R: StateRepository> {
    store: &'s mut TripStore<R>,
}

impl<'s, R: StateRepository> ItemCollection<'s, R> {
    pub(crate) fn new(store: &'s mut TripStore<R>) -> Self {
        Self { store }
    }

    /// Validates `draft` and appends it to the current trip.
    ///
    /// Returns `None` without validating when there is no current trip.
    ///
    /// # Errors
    /// - `StoreError::InvalidItem` for missing name/url or a url without an
    ///   http(s) link; nothing is stored.
    pub fn add(&mut self, draft: ItemDraft) -> StoreResult<Option<Item>> {
        if self.store.current().is_none() {
            debug!("event=item_add module=items status=skipped reason=no_current_trip");
            return Ok(None);
        }

        let item = draft.into_item(self.store.next_id())?;
        let snapshot = self.store.snapshot();
        if let Some(trip) = self.store.current_mut() {
            trip.items.push(item.clone());
        }
        self.store.commit(snapshot, &[])?;
        debug!("event=item_add module=items status=ok item_id={}", item.id);
        Ok(Some(item))
    }

    /// Removes one item. Returns whether it existed.
    pub fn remove(&mut self, item_id: ItemId) -> StoreResult<bool> {
        let snapshot = self.store.snapshot();
        let Some(trip) = self.store.current_mut() else {
            return Ok(false);
        };
        let before = trip.items.len();
        trip.items.retain(|item| item.id != item_id);
        if trip.items.len() == before {
            debug!("event=item_remove module=items status=skipped reason=not_found item_id={item_id}");
            return Ok(false);
        }

        self.store.commit(snapshot, &[])?;
        Ok(true)
    }

    /// Applies a partial edit and returns the item as stored afterwards.
    ///
    /// # Errors
    /// - `StoreError::InvalidItem` when the patch carries a url without an
    ///   http(s) link; no field is changed.
    pub fn update(&mut self, item_id: ItemId, patch: &ItemPatch) -> StoreResult<Option<Item>> {
        let snapshot = self.store.snapshot();
        let Some(item) = self
            .store
            .current_mut()
            .and_then(|trip| trip.item_mut(item_id))
        else {
            debug!("event=item_update module=items status=skipped reason=not_found item_id={item_id}");
            return Ok(None);
        };

        let changed = patch.apply_to(item)?;
        let updated = item.clone();
        if changed {
            self.store.commit(snapshot, &[])?;
        }
        Ok(Some(updated))
    }

    /// Flips the visited flag of one item.
    pub fn toggle_visited(&mut self, item_id: ItemId) -> StoreResult<Option<ToggleOutcome>> {
        let snapshot = self.store.snapshot();
        let Some(item) = self
            .store
            .current_mut()
            .and_then(|trip| trip.item_mut(item_id))
        else {
            debug!("event=item_toggle module=items status=skipped reason=not_found item_id={item_id}");
            return Ok(None);
        };

        item.visited = !item.visited;
        let outcome = ToggleOutcome {
            item_id,
            visited: item.visited,
            became_visited: item.visited,
        };

        let events = if outcome.became_visited {
            vec![CoreEvent::ItemBecameVisited(item_id)]
        } else {
            Vec::new()
        };
        self.store.commit(snapshot, &events)?;
        Ok(Some(outcome))
    }

    /// Empties the current trip's list. Returns how many items were removed.
    pub fn clear(&mut self) -> StoreResult<usize> {
        let snapshot = self.store.snapshot();
        let Some(trip) = self.store.current_mut() else {
            return Ok(0);
        };
        let removed = std::mem::take(&mut trip.items).len();
        if removed > 0 {
            self.store.commit(snapshot, &[])?;
        }
        Ok(removed)
    }

    /// Current trip's items in storage order.
    pub fn list(&self) -> &[Item] {
        self.store
            .current()
            .map(|trip| trip.items.as_slice())
            .unwrap_or_default()
    }
}
