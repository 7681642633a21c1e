//! SQLite-backed storage for trace graphs.
//!
//! The contract with the core: a [`store::TraceStore::create_run`] call is
//! atomic-or-nothing, reads return a fully materialized graph with steps
//! sorted by `index`, and deleting a run removes everything it owns but never
//! a shared tag.

pub mod error;
pub mod schema;
pub mod store;

pub use error::StoreError;
pub use store::{ListOptions, TraceStore};
