use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    config::QdrantSettings,
    metrics::track_vector_operation,
    models::{document::DocumentChunk, hint::SourcePassage},
    services::llm::Embedder,
};

/// Knowledge base the hints are grounded in.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SourcePassage>>;

    /// Embeds and stores the chunks; returns how many were written.
    async fn add_documents(&self, chunks: &[DocumentChunk]) -> Result<usize>;

    async fn document_count(&self) -> Result<u64>;
}

/// Thin client for the Qdrant REST API.
#[derive(Clone)]
pub struct QdrantClient {
    http: reqwest::Client,
    base_url: String,
    collection: String,
    vector_size: u64,
}

#[derive(Debug, Serialize)]
pub struct QdrantPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct ScoredPoint {
    pub score: f32,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Deserialize)]
struct CollectionInfo {
    #[serde(default)]
    points_count: Option<u64>,
}

impl QdrantClient {
    pub fn new(settings: &QdrantSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build Qdrant HTTP client")?;

        Ok(Self {
            http,
            base_url: settings.url.trim_end_matches('/').to_string(),
            collection: settings.collection.clone(),
            vector_size: settings.vector_size,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    /// Creates the collection (cosine distance) if it does not exist yet.
    /// Returns `true` when it had to be created.
    pub async fn ensure_collection(&self) -> Result<bool> {
        let response = self
            .http
            .get(self.collection_url())
            .send()
            .await
            .context("Failed to reach Qdrant")?;

        match response.status() {
            status if status.is_success() => return Ok(false),
            StatusCode::NOT_FOUND => {}
            status => {
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("Qdrant returned {} while checking collection: {}", status, body);
            }
        }

        let response = self
            .http
            .put(self.collection_url())
            .json(&json!({
                "vectors": { "size": self.vector_size, "distance": "Cosine" }
            }))
            .send()
            .await
            .context("Failed to create Qdrant collection")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Qdrant returned {} while creating collection: {}", status, body);
        }

        tracing::info!("Created Qdrant collection: {}", self.collection);
        Ok(true)
    }

    pub async fn search(&self, vector: Vec<f32>, limit: usize) -> Result<Vec<ScoredPoint>> {
        let response = self
            .http
            .post(format!("{}/points/search", self.collection_url()))
            .json(&json!({
                "vector": vector,
                "limit": limit,
                "with_payload": true,
            }))
            .send()
            .await
            .context("Failed to call Qdrant search")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Qdrant search returned {}: {}", status, body);
        }

        let body: QdrantResponse<Vec<ScoredPoint>> = response
            .json()
            .await
            .context("Failed to parse Qdrant search response")?;
        Ok(body.result)
    }

    pub async fn upsert(&self, points: Vec<QdrantPoint>) -> Result<()> {
        let response = self
            .http
            .put(format!("{}/points?wait=true", self.collection_url()))
            .json(&json!({ "points": points }))
            .send()
            .await
            .context("Failed to call Qdrant upsert")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Qdrant upsert returned {}: {}", status, body);
        }
        Ok(())
    }

    pub async fn points_count(&self) -> Result<u64> {
        let response = self
            .http
            .get(self.collection_url())
            .send()
            .await
            .context("Failed to reach Qdrant")?;

        if !response.status().is_success() {
            anyhow::bail!("Qdrant collection info returned {}", response.status());
        }

        let body: QdrantResponse<CollectionInfo> = response
            .json()
            .await
            .context("Failed to parse Qdrant collection info")?;
        Ok(body.result.points_count.unwrap_or(0))
    }
}

/// Payload layout: `page_content` + `metadata`, readable by LangChain's Qdrant store.
fn chunk_payload(chunk: &DocumentChunk) -> serde_json::Value {
    json!({
        "page_content": chunk.text,
        "metadata": {
            "source": chunk.source,
            "file_type": chunk.file_type.as_str(),
            "uploaded_by": chunk.uploaded_by,
            "uploaded_at": chunk.uploaded_at.to_rfc3339(),
            "chunk_index": chunk.chunk_index,
        }
    })
}

fn passage_from_point(point: ScoredPoint) -> Option<SourcePassage> {
    let payload = point.payload?;
    let content = payload.get("page_content")?.as_str()?.to_string();
    let source = payload
        .get("metadata")
        .and_then(|m| m.get("source"))
        .and_then(|s| s.as_str())
        .map(|s| s.to_string());

    Some(SourcePassage {
        content,
        source,
        score: point.score,
    })
}

/// Qdrant search over OpenAI embeddings.
pub struct QdrantRetriever {
    client: QdrantClient,
    embedder: Arc<dyn Embedder>,
}

impl QdrantRetriever {
    pub fn new(client: QdrantClient, embedder: Arc<dyn Embedder>) -> Self {
        Self { client, embedder }
    }
}

#[async_trait]
impl Retriever for QdrantRetriever {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SourcePassage>> {
        let vector = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .context("No embedding returned for query")?;

        let points = track_vector_operation("search", self.client.search(vector, limit)).await?;

        Ok(points.into_iter().filter_map(passage_from_point).collect())
    }

    async fn add_documents(&self, chunks: &[DocumentChunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;

        let points: Vec<QdrantPoint> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| QdrantPoint {
                id: Uuid::new_v4().to_string(),
                vector,
                payload: chunk_payload(chunk),
            })
            .collect();
        let written = points.len();

        track_vector_operation("upsert", self.client.upsert(points)).await?;
        Ok(written)
    }

    async fn document_count(&self) -> Result<u64> {
        track_vector_operation("count", self.client.points_count()).await
    }
}
