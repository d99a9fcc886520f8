//! OpenAI integration
//!
//! Implements the `EnrichmentService` port over the chat completions API:
//! one call per activity produces a prep summary and extracted action items.

mod client;
mod types;

pub use client::OpenAiClient;
