use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Sql,
    Md,
    Txt,
}

impl FileType {
    pub const ALLOWED: [&'static str; 4] = ["pdf", "sql", "md", "txt"];

    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(FileType::Pdf),
            "sql" => Some(FileType::Sql),
            "md" => Some(FileType::Md),
            "txt" => Some(FileType::Txt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Sql => "sql",
            FileType::Md => "md",
            FileType::Txt => "txt",
        }
    }
}

/// A piece of uploaded training material, ready for embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub source: String,
    pub file_type: FileType,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
    pub chunk_index: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
    pub chunks_created: usize,
}
