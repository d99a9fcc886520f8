//! # Termical Domain
//!
//! Business domain types and models for the termical sync engine.
//!
//! This crate contains:
//! - Domain data types (Activity, RawEvent, SyncWindow, etc.)
//! - Domain error types and Result definitions
//! - Engine configuration
//!
//! ## Architecture
//! - No dependencies on other termical crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::EngineConfig;
pub use errors::{EnrichError, EnrichErrorKind, FetchError, Result, TermicalError};
pub use types::{
    content_fingerprint, ActionItem, Activity, Enrichment, EnrichmentReport, EnrichmentStatus,
    RawEvent, ReconcileResult, SyncOutcome, SyncWindow,
};
