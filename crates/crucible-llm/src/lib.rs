//! Crucible LLM: chat client for an Ollama-compatible endpoint
//!
//! Implements `crucible_core::CompletionService` over `POST /api/chat`.
//! Structured requests set `format: "json"` so the model returns one JSON
//! object.

pub mod client;
pub mod config;
pub mod error;

pub use client::{is_ollama_available, parse_chat_response, OllamaClient};
pub use config::OllamaConfig;
pub use error::LlmError;

/// Result type for LLM client operations
pub type Result<T> = std::result::Result<T, LlmError>;
