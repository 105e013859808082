//! Item list query: day filter, text search, visited-last ordering.
//!
//! # Invariants
//! - Output is a permutation of a subset of the input; items are borrowed,
//!   never cloned or modified.
//! - Unvisited items always precede visited ones; within each group the
//!   most recently added item comes first.

use crate::model::item::Item;

const ALL_DAYS: &str = "all";

/// Day tab selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DayFilter {
    #[default]
    All,
    /// Keeps items whose `day` label equals this value exactly.
    Day(String),
}

impl DayFilter {
    /// Parses a day tab value; `"all"` and blank input select every day.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_DAYS) {
            Self::All
        } else {
            Self::Day(trimmed.to_string())
        }
    }

    fn matches(&self, item: &Item) -> bool {
        match self {
            Self::All => true,
            Self::Day(day) => item.day == *day,
        }
    }
}

impl From<&str> for DayFilter {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// Returns the display order of `items` under `filter` and `search`.
///
/// `search` is trimmed; when non-empty it must occur in the item's name or
/// memo, compared case-insensitively.
pub fn query_items<'a>(items: &'a [Item], filter: &DayFilter, search: &str) -> Vec<&'a Item> {
    let needle = search.trim().to_lowercase();

    let (unvisited, visited): (Vec<&Item>, Vec<&Item>) = items
        .iter()
        .rev()
        .filter(|item| filter.matches(item))
        .filter(|item| needle.is_empty() || matches_text(item, &needle))
        .partition(|item| !item.visited);

    unvisited.into_iter().chain(visited).collect()
}

fn matches_text(item: &Item, needle: &str) -> bool {
    item.name.to_lowercase().contains(needle) || item.memo.to_lowercase().contains(needle)
}
