//! Repository layer: durable state slots.
//!
//! # Responsibility
//! - Define the storage contract the trip store depends on.
//! - Keep SQL and slot encoding details out of the service layer.
//!
//! # Invariants
//! - Repositories never repair or reinterpret state; healing belongs to
//!   `service::trip_store`.

pub mod state_repo;
