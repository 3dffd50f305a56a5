// src/services/enrich.rs

//! Optional description enrichment.
//!
//! Disabled enrichment and failed enrichment look the same to the monitor:
//! the original text goes through.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::EnrichmentConfig;
use crate::utils::http;

const PROMPT: &str = "Rewrite the following course description so students can skim it. \
Keep every date, deadline, requirement and link. Reply with the rewritten text only.";

#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, text: &str) -> Result<String>;
}

/// Returns the text unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

#[async_trait]
impl Enricher for PassThrough {
    async fn enrich(&self, text: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

/// Enricher backed by an OpenAI-compatible chat completion endpoint.
pub struct ChatEnricher {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_completion_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl ChatEnricher {
    pub fn new(config: &EnrichmentConfig, api_key: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http::create_async_client("cms-notifier", timeout)?,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            max_tokens: config.max_tokens,
        })
    }
}

/// First non-empty reply of a chat completion.
fn reply_text(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .filter_map(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .find(|c| !c.is_empty())
        .ok_or_else(|| AppError::enrichment("empty completion"))
}

#[async_trait]
impl Enricher for ChatEnricher {
    async fn enrich(&self, text: &str) -> Result<String> {
        // Temperature 0 keeps the output stable between sweeps; the result
        // is diffed against the last stored description.
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: format!("{PROMPT}\n\n{text}"),
            }],
            max_completion_tokens: self.max_tokens,
            temperature: 0.0,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(AppError::enrichment)?;

        let body: ChatResponse = response.json().await.map_err(AppError::enrichment)?;
        reply_text(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pass_through() {
        let text = "Quiz 1 in week 4";
        assert_eq!(PassThrough.enrich(text).await.unwrap(), text);
    }

    #[test]
    fn test_reply_text() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  Quiz moved.  "}}]}"#,
        )
        .unwrap();
        assert_eq!(reply_text(response).unwrap(), "Quiz moved.");
    }

    #[test]
    fn test_empty_reply_is_error() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(matches!(
            reply_text(response),
            Err(AppError::Enrichment(_))
        ));
    }
}
