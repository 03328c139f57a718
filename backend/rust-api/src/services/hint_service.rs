use std::sync::Arc;

use thiserror::Error;
use validator::Validate;

use crate::{
    metrics::{HINTS_REQUESTED_TOTAL, HINT_RESETS_TOTAL},
    models::{
        hint::{
            HintAdvance, HintKey, HintLevel, HintRequest, HintResponse, ResetHintRequest,
            ResetHintResponse,
        },
        user::Account,
    },
    services::{
        hint_ledger::HintLedger,
        llm::Generator,
        prompt::{build_hint_prompt, join_context, PromptInput},
        vector_store::Retriever,
        AppState,
    },
};

#[derive(Debug, Error)]
pub enum HintError {
    #[error("{0}")]
    Validation(String),

    #[error("Backend services unavailable")]
    Unavailable,

    #[error("Hint generation failed: {0}")]
    Generation(#[source] anyhow::Error),

    #[error(transparent)]
    Ledger(anyhow::Error),
}

/// Runs the progressive hint pipeline: ledger advance, retrieval, prompt, generation.
pub struct HintService {
    ledger: Arc<dyn HintLedger>,
    retriever: Option<Arc<dyn Retriever>>,
    generator: Option<Arc<dyn Generator>>,
    retrieval_k: usize,
}

impl HintService {
    pub fn new(
        ledger: Arc<dyn HintLedger>,
        retriever: Option<Arc<dyn Retriever>>,
        generator: Option<Arc<dyn Generator>>,
        retrieval_k: usize,
    ) -> Self {
        Self {
            ledger,
            retriever,
            generator,
            retrieval_k,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.hint_ledger.clone(),
            state.retriever.clone(),
            state.generator.clone(),
            state.config.hints.retrieval_k,
        )
    }

    pub async fn request_hint(
        &self,
        account: &Account,
        req: &HintRequest,
    ) -> Result<HintResponse, HintError> {
        req.validate()
            .map_err(|e| HintError::Validation(e.to_string()))?;
        if req.question.trim().is_empty() {
            return Err(HintError::Validation("Question must not be empty".to_string()));
        }

        let (Some(retriever), Some(generator)) = (&self.retriever, &self.generator) else {
            return Err(HintError::Unavailable);
        };

        let question_id = req.resolved_question_id();
        let key = HintKey::new(account.username.as_str(), question_id.as_str());

        // Withdrawn again if generation fails
        let advance = self
            .ledger
            .advance(&key, req.hint_level)
            .await
            .map_err(HintError::Ledger)?;
        let level = advance.level;

        tracing::info!(
            student = %account.username,
            question_id = %question_id,
            hint_level = level.number(),
            history_len = advance.history_len,
            "Hint level selected"
        );

        let passages = match retriever.search(&req.question, self.retrieval_k).await {
            Ok(passages) => passages,
            Err(e) => {
                tracing::warn!("Retrieval failed, continuing without context: {:#}", e);
                Vec::new()
            }
        };
        let context = join_context(&passages);

        let prompt = build_hint_prompt(&PromptInput {
            question: &req.question,
            context: &context,
            lab_context: req.lab_context.as_deref(),
            lab_id: account.lab_id,
            level,
        });

        let hint = match generator.generate(&prompt.system, &prompt.user).await {
            Ok(hint) => hint,
            Err(e) => {
                tracing::error!(model = generator.model(), "Hint generation failed: {:#}", e);
                self.withdraw(&key, &advance).await;
                return Err(HintError::Generation(e));
            }
        };

        HINTS_REQUESTED_TOTAL
            .with_label_values(&[&level.number().to_string()])
            .inc();

        Ok(HintResponse {
            hint,
            hint_level: level,
            hint_level_name: level.name(),
            remaining_levels: level.remaining(),
            question_id,
            source_passages: passages,
        })
    }

    /// Undoes an advance whose hint never reached the student.
    async fn withdraw(&self, key: &HintKey, advance: &HintAdvance) {
        match self.ledger.rollback(key, advance).await {
            Ok(true) => tracing::debug!(
                hint_level = advance.level.number(),
                "Undelivered hint level withdrawn"
            ),
            Ok(false) => tracing::warn!(
                hint_level = advance.level.number(),
                "Hint history moved on, undelivered level kept"
            ),
            Err(e) => tracing::warn!("Failed to withdraw undelivered hint level: {:#}", e),
        }
    }

    /// Clears one question's history so the next request starts at level 1.
    pub async fn reset_hint(
        &self,
        account: &Account,
        req: &ResetHintRequest,
    ) -> Result<ResetHintResponse, HintError> {
        req.validate()
            .map_err(|e| HintError::Validation(e.to_string()))?;
        let question_id = req.resolved_question_id().ok_or_else(|| {
            HintError::Validation("Either question or question_id is required".to_string())
        })?;

        let key = HintKey::new(account.username.as_str(), question_id.as_str());
        let cleared = self.ledger.reset(&key).await.map_err(HintError::Ledger)?;

        HINT_RESETS_TOTAL.inc();
        tracing::info!(
            student = %account.username,
            question_id = %question_id,
            cleared,
            "Hint history reset"
        );

        Ok(ResetHintResponse {
            question_id,
            cleared,
            next_level: HintLevel::Concept,
        })
    }
}
