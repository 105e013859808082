//! Trip model.
//!
//! # Responsibility
//! - Define the named, day-bounded container of items.
//! - Provide the history projection (`TripSummary`).
//!
//! # Invariants
//! - `id` and `created_at` never change after creation.
//! - `title` is never blank and `days` is never zero when set through
//!   the validating setters.
//! - Archiving only flips `archived`; items are left untouched.

use crate::model::item::{Item, ItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier of one trip.
pub type TripId = i64;

/// Duration given to every trip the store creates on its own.
pub const DEFAULT_TRIP_DAYS: u32 = 7;

/// A named itinerary of items spanning a fixed number of days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: TripId,
    pub title: String,
    pub days: u32,
    /// Insertion order, oldest first.
    pub items: Vec<Item>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Validation failures for trip settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripValidationError {
    BlankTitle,
    ZeroDays,
}

impl Display for TripValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "trip title must not be blank"),
            Self::ZeroDays => write!(f, "trip must span at least one day"),
        }
    }
}

impl Error for TripValidationError {}

impl Trip {
    /// Creates an active (non-archived) trip stamped with the current time.
    pub fn new(id: TripId, title: impl Into<String>, days: u32, items: Vec<Item>) -> Self {
        Self {
            id,
            title: title.into(),
            days,
            items,
            archived: false,
            created_at: Utc::now(),
        }
    }

    pub fn set_title(&mut self, title: &str) -> Result<(), TripValidationError> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(TripValidationError::BlankTitle);
        }
        self.title = trimmed.to_string();
        Ok(())
    }

    pub fn set_days(&mut self, days: u32) -> Result<(), TripValidationError> {
        if days == 0 {
            return Err(TripValidationError::ZeroDays);
        }
        self.days = days;
        Ok(())
    }

    /// Checks the title and day rules on a trip built without the setters,
    /// such as one decoded from a backup.
    pub fn validate(&self) -> Result<(), TripValidationError> {
        if self.title.trim().is_empty() {
            return Err(TripValidationError::BlankTitle);
        }
        if self.days == 0 {
            return Err(TripValidationError::ZeroDays);
        }
        Ok(())
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// Returns the largest trip or item id this trip carries.
    pub fn max_id(&self) -> i64 {
        self.items
            .iter()
            .map(|item| item.id)
            .fold(self.id, i64::max)
    }

    pub fn summary(&self) -> TripSummary {
        TripSummary {
            id: self.id,
            title: self.title.clone(),
            created_at: self.created_at,
            days: self.days,
            item_count: self.items.len(),
            visited_count: self.items.iter().filter(|item| item.visited).count(),
            archived: self.archived,
        }
    }
}

/// Lightweight projection used by history listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripSummary {
    pub id: TripId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub days: u32,
    pub item_count: usize,
    pub visited_count: usize,
    pub archived: bool,
}
