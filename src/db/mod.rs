//! Database module: view models and SQL repositories.
//!
//! - `model`: view models returned by repositories.
//! - `repo`: SQL-only functions that map rows into entities.
//! - `store`: [`BookingStore`](crate::booking::BookingStore) for the SQLite pool.
//!
//! Callers import from `table_booking::db`; the repository API is re-exported here.

pub mod model;
pub mod repo;
mod store;

pub use repo::*;

pub use model::RestaurantWithTables;
