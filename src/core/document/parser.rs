use crate::{core::model::DocumentType, error::DocqaError, map_err};
use html::HtmlParser;
use pdf::PdfParser;
use text::TextParser;

pub mod html;
pub mod pdf;
pub mod text;

/// Implement on anything that has to parse document bytes.
pub trait DocumentParser {
    fn parse(&self, input: &[u8]) -> Result<String, DocqaError>;
}

/// Enumeration of all supported parser types.
#[derive(Debug, Clone)]
pub enum Parser {
    Text(TextParser),
    Pdf(PdfParser),
    Html(HtmlParser),
}

impl Parser {
    /// Returns the default parser for a document.
    pub fn new(ty: DocumentType) -> Self {
        match ty {
            DocumentType::Text => Self::Text(TextParser),
            DocumentType::Pdf => Self::Pdf(PdfParser),
            DocumentType::Html => Self::Html(HtmlParser),
        }
    }
}

impl DocumentParser for Parser {
    fn parse(&self, input: &[u8]) -> Result<String, DocqaError> {
        match self {
            Self::Text(p) => p.parse(input),
            Self::Pdf(p) => p.parse(input),
            Self::Html(p) => p.parse(input),
        }
    }
}

/// Parse `input` on the blocking pool. PDF extraction goes through a native
/// library and can take a while for large files.
pub async fn parse_blocking(ty: DocumentType, input: Vec<u8>) -> Result<String, DocqaError> {
    map_err!(tokio::task::spawn_blocking(move || Parser::new(ty).parse(&input)).await)
}
