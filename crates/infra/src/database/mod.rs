//! SQLite-backed storage adapters

mod activity_store;

pub use activity_store::SqliteActivityStore;
