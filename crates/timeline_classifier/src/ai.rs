//! Collaborator seam for the vendor AI calls.
//!
//! The classifier only needs completion (plain or chat) and embeddings; both go
//! through these traits so tests can swap in an in-memory model.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::prompt::Prompt;

pub trait CompletionModel {
    /// Reply text for a fully composed prompt.
    fn complete(&self, prompt: &Prompt) -> impl Future<Output = Result<String>> + Send;
}

pub trait EmbeddingModel {
    /// One vector per input text, in input order.
    fn embed(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send;
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key:          String,
    pub base_url:         String,
    pub completion_model: String,
    /// Model answering `Prompt::Chat`, usually one fine-tuned on the training export.
    pub chat_model:       String,
    pub embedding_model:  String,
    pub max_tokens:       u32,
    pub temperature:      f32,
    pub timeout:          Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key:          String::new(),
            base_url:         "https://api.openai.com/v1".to_string(),
            completion_model: "gpt-3.5-turbo-instruct".to_string(),
            chat_model:       "gpt-3.5-turbo".to_string(),
            embedding_model:  "text-embedding-3-small".to_string(),
            max_tokens:       256,
            temperature:      0.0,
            timeout:          Duration::from_secs(30),
        }
    }
}

/// OpenAI-compatible HTTP client (`/completions`, `/chat/completions`, `/embeddings`).
pub struct OpenAiClient {
    client: reqwest::Client,
    config: OpenAiConfig,
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingDatum {
    index:     usize,
    embedding: Vec<f32>,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Value> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "{} HTTP {}: {}",
                path,
                status,
                text.chars().take(200).collect::<String>()
            ));
        }

        Ok(resp.json::<Value>().await?)
    }

    /// Endpoint path, request body and reply text pointer for one prompt.
    fn completion_request(&self, prompt: &Prompt) -> (&'static str, Value, &'static str) {
        match prompt {
            Prompt::Text(text) => (
                "completions",
                json!({
                    "model": self.config.completion_model,
                    "prompt": text,
                    "max_tokens": self.config.max_tokens,
                    "temperature": self.config.temperature,
                }),
                "/choices/0/text",
            ),
            Prompt::Chat { system, user } => (
                "chat/completions",
                json!({
                    "model": self.config.chat_model,
                    "messages": [
                        { "role": "system", "content": system },
                        { "role": "user", "content": user },
                    ],
                    "max_tokens": self.config.max_tokens,
                    "temperature": self.config.temperature,
                }),
                "/choices/0/message/content",
            ),
        }
    }
}

fn reply_text(reply: &Value, pointer: &str) -> Result<String> {
    reply
        .pointer(pointer)
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .with_context(|| format!("completion reply without {pointer}"))
}

impl CompletionModel for OpenAiClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let (path, body, pointer) = self.completion_request(prompt);

        let reply = self.post_json(path, body).await?;
        let text = reply_text(&reply, pointer)?;

        debug!("Completion ({}): {}", path, text.trim());
        Ok(text)
    }
}

impl EmbeddingModel for OpenAiClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = json!({
            "model": self.config.embedding_model,
            "input": texts,
        });

        let reply = self.post_json("embeddings", body).await?;
        let mut parsed: EmbeddingResponse =
            serde_json::from_value(reply).context("malformed embeddings reply")?;

        if parsed.data.len() != texts.len() {
            return Err(anyhow::anyhow!(
                "embeddings reply has {} vectors for {} inputs",
                parsed.data.len(),
                texts.len()
            ));
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}
