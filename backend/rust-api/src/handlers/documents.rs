use axum::{
    extract::{Extension, Multipart, State},
    Json,
};
use std::sync::Arc;

use crate::{
    handlers::ApiError,
    models::{document::UploadResponse, user::Account},
    services::{
        document_service::{DocumentService, IngestError},
        AppState,
    },
};

pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Extract(e) => ApiError::BadRequest(e.to_string()),
            IngestError::Store(e) => {
                tracing::error!("Document ingest failed: {:#}", e);
                ApiError::Internal(format!("Failed to process document: {}", e))
            }
        }
    }
}

/// POST /upload - Add training material to the knowledge base (trainer only)
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let Some(retriever) = state.retriever.clone() else {
        return Err(ApiError::unavailable("Backend services unavailable"));
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|name| name.to_string())
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("Uploaded file has no filename"))?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;

        tracing::info!(
            "Upload received: {} ({} bytes) from {}",
            filename,
            bytes.len(),
            account.username
        );

        let response = DocumentService::new(retriever)
            .ingest(&filename, &bytes, &account.username)
            .await?;

        return Ok(Json(response));
    }

    Err(ApiError::bad_request("Missing multipart field `file`"))
}
