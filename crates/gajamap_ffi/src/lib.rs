//! Flutter-facing bridge over `gajamap_core`.

pub mod api;
