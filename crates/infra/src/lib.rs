//! # Termical Infra
//!
//! Infrastructure adapters for the termical sync engine: the SQLite-backed
//! activity store, the Google Calendar and OpenAI HTTP clients, and the
//! configuration loader. Each adapter implements a port defined in
//! `termical-core`.

pub mod config;
pub mod database;
pub mod errors;
pub mod integrations;

// Re-export commonly used items
pub use database::SqliteActivityStore;
pub use errors::InfraError;
pub use integrations::calendar::GoogleCalendarClient;
pub use integrations::openai::OpenAiClient;
