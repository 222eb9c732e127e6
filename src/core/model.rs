use crate::{err, error::DocqaError};
use serde::{Deserialize, Serialize};

/// Supported document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Text,
    Pdf,
    Html,
}

impl DocumentType {
    pub fn try_from_file_name(name: &str) -> Result<Self, DocqaError> {
        let Some((_, ext)) = name.rsplit_once('.') else {
            return err!(UnsupportedFileType, "missing extension: '{name}'");
        };
        Self::try_from(ext)
    }

    /// Select a type from the value of a `Content-Type` header.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match mime.as_str() {
            "application/pdf" => Some(Self::Pdf),
            "text/html" | "application/xhtml+xml" => Some(Self::Html),
            m if m.starts_with("text/") => Some(Self::Text),
            _ => None,
        }
    }
}

impl TryFrom<&str> for DocumentType {
    type Error = DocqaError;

    fn try_from(ext: &str) -> Result<Self, Self::Error> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "txt" | "md" => Ok(Self::Text),
            "html" | "htm" => Ok(Self::Html),
            _ => err!(UnsupportedFileType, "{ext}"),
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Pdf => write!(f, "pdf"),
            Self::Html => write!(f, "html"),
        }
    }
}

/// Extracted text along with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content: String,

    /// File name for uploads, the URL for loaded pages.
    pub source: String,
}

impl Document {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
        }
    }
}

/// A single record of the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Hex encoded SHA-256 of `content`.
    pub id: String,
    pub content: String,
    pub source: String,
    pub vector: Vec<f32>,
}

/// A chunk returned by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub content: String,
    pub source: String,
    pub score: f32,
}

/// The generated answer to a question.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Answer {
    pub output_text: String,

    /// Distinct sources of the chunks used as context, most relevant first.
    pub sources: Vec<String>,
}
