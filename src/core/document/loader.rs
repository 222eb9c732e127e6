use crate::{core::model::Document, error::DocqaError};

/// Loads the contents of web locations as documents.
#[async_trait::async_trait]
pub trait UrlLoader {
    /// Fetch and extract the text of every URL in `urls`.
    ///
    /// Returns one document per URL, sourced with the URL itself.
    /// Fails if any of the URLs cannot be loaded.
    async fn load(&self, urls: &[String]) -> Result<Vec<Document>, DocqaError>;
}
