//! # Termical Core
//!
//! Synchronization and cache reconciliation engine.
//!
//! This crate contains the engine's business logic behind injectable port
//! traits: the staleness policy, the window reconciler, the bounded
//! enrichment scheduler, and the sync orchestrator that composes them. The
//! in-memory [`store::InMemoryActivityStore`] serves as the reference
//! implementation of the cache store port.
//!
//! ## Architecture
//! - Depends on `termical-domain` only; adapters live in `termical-infra`
//! - All collaborators (calendar, enrichment, storage) are injected

pub mod enrich;
pub mod ports;
pub mod reconcile;
pub mod staleness;
pub mod store;
pub mod sync;

// Re-export commonly used items
pub use enrich::EnrichmentScheduler;
pub use ports::{ActivityStore, CalendarSource, EnrichmentService};
pub use reconcile::Reconciler;
pub use staleness::is_stale;
pub use store::InMemoryActivityStore;
pub use sync::SyncEngine;
