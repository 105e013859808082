//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate trip/item state changes on top of the state repository.
//! - Keep FFI/CLI layers decoupled from slot encoding and SQL.
//!
//! # Invariants
//! - Every mutating use-case ends with one persisted write followed by
//!   observer notifications.

pub mod archive_service;
pub mod backup;
pub mod events;
pub mod item_service;
pub mod trip_store;
