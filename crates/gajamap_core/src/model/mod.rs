//! Trip/item domain model.
//!
//! # Responsibility
//! - Define the records persisted in the `gajaTrips` slot and exchanged in
//!   backup documents.
//! - Own per-record validation (map url extraction, title/day rules).
//!
//! # Invariants
//! - Trip and item ids are unique across the whole store.
//! - Items belong to exactly one trip for their lifetime.

pub mod item;
pub mod trip;
