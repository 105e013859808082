//! Place item model.
//!
//! # Responsibility
//! - Define the checklist entry stored inside a trip.
//! - Turn raw form input into a valid item (`ItemDraft`) and apply partial
//!   edits (`ItemPatch`) without ever leaving an item half-updated.
//!
//! # Invariants
//! - `name` is never blank.
//! - `url` is the `http(s)://` substring extracted from user input, not the
//!   raw text the user pasted.
//! - `day` is a free label; it is not checked against the trip's day count.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier of one item. Unique across every trip in the store.
pub type ItemId = i64;

/// Day label used when the caller leaves the day selector blank.
pub const DEFAULT_ITEM_DAY: &str = "1";

static MAP_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[^\s]+").expect("valid map url regex"));

/// One place on a trip's checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub url: String,
    /// Target day label, normally `"1"..="<days>"`.
    #[serde(default, deserialize_with = "deserialize_day")]
    pub day: String,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub visited: bool,
}

/// Validation failures for item input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    /// Name is empty after trim.
    MissingName,
    /// Url field is empty after trim.
    MissingUrl,
    /// Url field has text but no `http(s)://` link in it.
    UrlNotFound,
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "place name must not be blank"),
            Self::MissingUrl => write!(f, "map url must not be blank"),
            Self::UrlNotFound => write!(f, "no http(s) map link found in url input"),
        }
    }
}

impl Error for ItemValidationError {}

/// Raw input for creating an item, as typed into the add form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDraft {
    pub name: String,
    pub url: String,
    pub day: String,
    pub memo: String,
}

impl ItemDraft {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        day: impl Into<String>,
        memo: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            day: day.into(),
            memo: memo.into(),
        }
    }

    /// Validates the draft and builds an unvisited item with `id`.
    ///
    /// # Errors
    /// - `MissingName` / `MissingUrl` for blank required fields.
    /// - `UrlNotFound` when the url input has no http(s) link.
    pub fn into_item(self, id: ItemId) -> Result<Item, ItemValidationError> {
        let name = non_blank(&self.name).ok_or(ItemValidationError::MissingName)?;
        let raw_url = non_blank(&self.url).ok_or(ItemValidationError::MissingUrl)?;
        let url = extract_map_url(raw_url).ok_or(ItemValidationError::UrlNotFound)?;
        let day = non_blank(&self.day).unwrap_or(DEFAULT_ITEM_DAY);

        Ok(Item {
            id,
            name: name.to_string(),
            url,
            day: day.to_string(),
            memo: self.memo.trim().to_string(),
            visited: false,
        })
    }
}

/// Partial edit of an item.
///
/// `None` leaves a field untouched. Blank `name`/`url`/`day` values are
/// ignored field by field; `memo` accepts an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub day: Option<String>,
    pub memo: Option<String>,
}

impl ItemPatch {
    /// Applies the patch, or nothing at all when any field is invalid.
    ///
    /// Returns whether the item changed.
    pub fn apply_to(&self, item: &mut Item) -> Result<bool, ItemValidationError> {
        let name = self.name.as_deref().and_then(non_blank);
        let url = match self.url.as_deref().and_then(non_blank) {
            Some(raw) => Some(extract_map_url(raw).ok_or(ItemValidationError::UrlNotFound)?),
            None => None,
        };
        let day = self.day.as_deref().and_then(non_blank);
        let memo = self.memo.as_deref().map(str::trim);

        let before = item.clone();
        if let Some(name) = name {
            item.name = name.to_string();
        }
        if let Some(url) = url {
            item.url = url;
        }
        if let Some(day) = day {
            item.day = day.to_string();
        }
        if let Some(memo) = memo {
            item.memo = memo.to_string();
        }
        Ok(*item != before)
    }
}

/// Returns the first `http(s)://` link in `input`, if any.
///
/// Share-sheet text from map apps usually wraps the link in a title and
/// description, so only the link itself is kept.
pub fn extract_map_url(input: &str) -> Option<String> {
    MAP_URL_RE.find(input).map(|m| m.as_str().to_string())
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Older documents stored the day as a number.
fn deserialize_day<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DayRepr {
        Text(String),
        Number(i64),
    }

    Ok(match DayRepr::deserialize(deserializer)? {
        DayRepr::Text(value) => value,
        DayRepr::Number(value) => value.to_string(),
    })
}
