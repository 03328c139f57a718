//! Plain-text extraction for uploaded training material.

use thiserror::Error;

use crate::models::document::FileType;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Only {} files are supported", allowed_list())]
    UnsupportedType(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("File is not valid UTF-8 text")]
    Encoding,

    #[error("File contains no extractable text")]
    Empty,
}

fn allowed_list() -> String {
    FileType::ALLOWED
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolves the file type from the upload's filename.
pub fn file_type_for(filename: &str) -> Result<FileType, ExtractError> {
    FileType::from_filename(filename)
        .ok_or_else(|| ExtractError::UnsupportedType(filename.to_string()))
}

/// Extracts the text of an upload. Fails with `Empty` when only whitespace remains.
pub fn extract_text(file_type: FileType, bytes: &[u8]) -> Result<String, ExtractError> {
    let text = match file_type {
        FileType::Pdf => {
            pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?
        }
        FileType::Sql | FileType::Md | FileType::Txt => {
            let text = std::str::from_utf8(bytes).map_err(|_| ExtractError::Encoding)?;
            text.strip_prefix('\u{feff}').unwrap_or(text).to_string()
        }
    };

    if text.trim().is_empty() {
        return Err(ExtractError::Empty);
    }

    Ok(text)
}
