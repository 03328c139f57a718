use serde::Serialize;
use std::collections::BTreeMap;

pub mod document;
pub mod hint;
pub mod user;

/// Trainer dashboard payload.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub users: Vec<String>,
    pub qdrant_connected: bool,
    pub llm_connected: bool,
    /// Point count of the collection, or the error text when Qdrant could not be asked.
    pub documents_count: serde_json::Value,
    pub hints_by_level: BTreeMap<u8, u64>,
    pub hint_ledger: &'static str,
}
