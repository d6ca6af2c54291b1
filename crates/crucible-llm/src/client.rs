//! HTTP chat client.

use std::time::Duration;

use async_trait::async_trait;
use crucible_core::{CollaboratorError, CompletionService};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::OllamaConfig;
use crate::error::LlmError;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
    #[serde(default)]
    error: Option<String>,
}

/// Extract the assistant message from a non-streaming `/api/chat` body.
pub fn parse_chat_response(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body)?;
    if let Some(error) = response.error {
        return Err(LlmError::Malformed(error));
    }
    let content = response
        .message
        .map(|m| m.content)
        .ok_or_else(|| LlmError::Malformed("response has no message".to_string()))?;
    if content.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(content)
}

/// Client for an Ollama-compatible chat endpoint
pub struct OllamaClient {
    config: OllamaConfig,
    http_client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("crucible-llm/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;

        Ok(OllamaClient {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OllamaConfig::from_env()?)
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn request_body(&self, prompt: &str, structured_output: bool) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
            format: structured_output.then_some("json"),
            options: self.config.temperature.map(|temperature| ChatOptions { temperature }),
        }
    }

    /// Send one chat turn and return the assistant message.
    #[instrument(skip(self, prompt), fields(model = %self.config.model, prompt_len = prompt.len()))]
    pub async fn chat(&self, prompt: &str, structured_output: bool) -> Result<String> {
        let response = self
            .http_client
            .post(self.config.chat_url())
            .json(&self.request_body(prompt, structured_output))
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "chat endpoint returned an error");
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let content = parse_chat_response(&body)?;
        debug!(response_len = content.len(), "chat completed");
        Ok(content)
    }

    fn classify(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout(self.config.timeout_secs)
        } else {
            LlmError::from(err)
        }
    }
}

#[async_trait]
impl CompletionService for OllamaClient {
    async fn complete(
        &self,
        prompt: &str,
        structured_output: bool,
    ) -> std::result::Result<String, CollaboratorError> {
        self.chat(prompt, structured_output)
            .await
            .map_err(CollaboratorError::from)
    }
}

/// Check whether the endpoint answers `GET /api/tags`.
pub async fn is_ollama_available(config: &OllamaConfig) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
    {
        Ok(client) => client,
        Err(_) => return false,
    };
    match client.get(config.tags_url()).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_response() {
        let body = r#"{"model":"llama3","message":{"role":"assistant","content":"{\"ok\":true}"},"done":true}"#;
        assert_eq!(parse_chat_response(body).unwrap(), "{\"ok\":true}");
    }

    #[test]
    fn test_parse_chat_response_errors() {
        assert!(matches!(
            parse_chat_response(r#"{"error":"model 'x' not found"}"#),
            Err(LlmError::Malformed(_))
        ));
        assert!(matches!(
            parse_chat_response(r#"{"message":{"role":"assistant","content":"  "}}"#),
            Err(LlmError::EmptyResponse)
        ));
        assert!(matches!(
            parse_chat_response("<html>"),
            Err(LlmError::Malformed(_))
        ));
    }

    #[test]
    fn test_structured_request_sets_json_format() {
        let client = OllamaClient::new(OllamaConfig::default().with_temperature(0.2)).unwrap();
        let body = serde_json::to_value(client.request_body("plan it", true)).unwrap();
        assert_eq!(body["format"], "json");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["content"], "plan it");
        assert!((body["options"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);

        let body = serde_json::to_value(client.request_body("write code", false)).unwrap();
        assert!(body.get("format").is_none());
    }
}
