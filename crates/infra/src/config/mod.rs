//! Configuration loading

mod loader;

pub use loader::{load_engine_config, SyncSettings};
