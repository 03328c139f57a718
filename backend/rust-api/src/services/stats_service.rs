use anyhow::Result;
use serde_json::Value;

use crate::{models::StatsResponse, services::AppState};

pub struct StatsService<'a> {
    state: &'a AppState,
}

impl<'a> StatsService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Trainer dashboard snapshot.
    pub async fn collect(&self) -> Result<StatsResponse> {
        let (documents_count, hints_by_level) =
            futures::join!(self.documents_count(), self.state.hint_ledger.level_counts());

        Ok(StatsResponse {
            users: self.state.accounts.usernames(),
            qdrant_connected: self.state.retriever.is_some(),
            llm_connected: self.state.generator.is_some(),
            documents_count,
            hints_by_level: hints_by_level?,
            hint_ledger: self.state.hint_ledger.backend(),
        })
    }

    /// Point count, the error text when Qdrant fails, or null without a vector store.
    async fn documents_count(&self) -> Value {
        let Some(retriever) = &self.state.retriever else {
            return Value::Null;
        };

        match retriever.document_count().await {
            Ok(count) => Value::from(count),
            Err(e) => {
                tracing::warn!("Failed to read document count: {:#}", e);
                Value::from(format!("Error: {}", e))
            }
        }
    }
}
