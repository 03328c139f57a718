use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::{
    metrics::DOCUMENT_CHUNKS_INGESTED_TOTAL,
    models::document::{DocumentChunk, UploadResponse},
    services::{
        chunking::RecursiveSplitter,
        extract::{extract_text, file_type_for, ExtractError},
        vector_store::Retriever,
    },
};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("Failed to store document: {0}")]
    Store(#[source] anyhow::Error),
}

pub struct DocumentService {
    retriever: Arc<dyn Retriever>,
    splitter: RecursiveSplitter,
}

impl DocumentService {
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self {
            retriever,
            splitter: RecursiveSplitter::default(),
        }
    }

    /// Extracts, chunks, embeds and stores one uploaded file.
    pub async fn ingest(
        &self,
        filename: &str,
        bytes: &[u8],
        uploaded_by: &str,
    ) -> Result<UploadResponse, IngestError> {
        let file_type = file_type_for(filename)?;
        let text = extract_text(file_type, bytes)?;

        let uploaded_at = Utc::now();
        let chunks: Vec<DocumentChunk> = self
            .splitter
            .split(&text)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, text)| DocumentChunk {
                text,
                source: filename.to_string(),
                file_type,
                uploaded_by: uploaded_by.to_string(),
                uploaded_at,
                chunk_index,
            })
            .collect();

        let stored = self
            .retriever
            .add_documents(&chunks)
            .await
            .map_err(IngestError::Store)?;

        DOCUMENT_CHUNKS_INGESTED_TOTAL
            .with_label_values(&[file_type.as_str()])
            .inc_by(stored as u64);

        tracing::info!(
            filename = %filename,
            file_type = file_type.as_str(),
            uploaded_by = %uploaded_by,
            chunks = stored,
            "Document ingested"
        );

        Ok(UploadResponse {
            message: "Document uploaded successfully".to_string(),
            filename: filename.to_string(),
            chunks_created: stored,
        })
    }
}
