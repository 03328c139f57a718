use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{config::OpenAiSettings, metrics::track_llm_call};

/// Produces the tutor's answer from a system and a user message.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> Result<String>;

    fn model(&self) -> &str;
}

/// Turns text into vectors for the similarity search.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Client for an OpenAI-compatible API (chat completions + embeddings).
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    settings: OpenAiSettings,
    api_key: String,
}

const EMBED_BATCH_SIZE: usize = 64;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiClient {
    /// Returns `None` when no API key is configured.
    pub fn from_settings(settings: &OpenAiSettings) -> Result<Option<Self>> {
        let Some(api_key) = settings.api_key.clone() else {
            return Ok(None);
        };

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .context("Failed to build OpenAI HTTP client")?;

        Ok(Some(Self {
            http,
            settings: settings.clone(),
            api_key,
        }))
    }

    async fn post_json<B: Serialize + ?Sized, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}{}", self.settings.base_url, path);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to call OpenAI API at {}", path))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API returned {}: {}", status, body);
        }

        response
            .json::<R>()
            .await
            .with_context(|| format!("Failed to parse OpenAI response from {}", path))
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.settings.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.settings.temperature,
        };

        let response: ChatCompletionResponse =
            self.post_json("/v1/chat/completions", &request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .context("OpenAI returned an empty completion")
    }

    async fn embed_batches(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());

        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            let request = EmbeddingRequest {
                model: &self.settings.embedding_model,
                input: batch,
            };
            let mut response: EmbeddingResponse =
                self.post_json("/v1/embeddings", &request).await?;

            if response.data.len() != batch.len() {
                anyhow::bail!(
                    "OpenAI returned {} embeddings for {} inputs",
                    response.data.len(),
                    batch.len()
                );
            }
            response.data.sort_by_key(|d| d.index);
            all.extend(response.data.into_iter().map(|d| d.embedding));
        }

        Ok(all)
    }
}

#[async_trait]
impl Generator for OpenAiClient {
    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        track_llm_call("chat", self.chat(system, user)).await
    }

    fn model(&self) -> &str {
        &self.settings.chat_model
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        track_llm_call("embed", self.embed_batches(texts)).await
    }
}
