//! OpenAI-compatible chat completions provider.
//!
//! Implements [`slidescan_core::CompletionProvider`] over blocking HTTP.

pub mod client;

pub use client::{OpenAiClient, OpenAiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
