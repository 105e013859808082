//! Display-side query entry points.
//!
//! # Responsibility
//! - Derive the filtered, searched and ordered item view for one trip.
//! - Never mutate or persist anything.

pub mod query;
