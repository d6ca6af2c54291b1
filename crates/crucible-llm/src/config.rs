//! Endpoint configuration.

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::Result;

pub const DEFAULT_HOST: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Ollama endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL, without the `/api/...` suffix
    pub host: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Sampling temperature; unset leaves the model default
    pub temperature: Option<f32>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        OllamaConfig {
            host: DEFAULT_HOST.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            temperature: None,
        }
    }
}

impl OllamaConfig {
    /// Read `OLLAMA_HOST`, `CRUCIBLE_MODEL` and `CRUCIBLE_LLM_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`OllamaConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(host) = lookup("OLLAMA_HOST").filter(|h| !h.trim().is_empty()) {
            config.host = normalize_host(&host);
        }
        if let Some(model) = lookup("CRUCIBLE_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = model;
        }
        if let Some(raw) = lookup("CRUCIBLE_LLM_TIMEOUT_SECS") {
            config.timeout_secs = raw.trim().parse().map_err(|_| {
                LlmError::Config(format!("CRUCIBLE_LLM_TIMEOUT_SECS must be an integer, got '{raw}'"))
            })?;
        }
        Ok(config)
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.host)
    }

    pub fn tags_url(&self) -> String {
        format!("{}/api/tags", self.host)
    }
}

/// Accept `host:port` as well as full URLs, and drop trailing slashes.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}
