use crate::error::DocqaError;

/// What the embedded text is going to be used for.
/// Some providers produce different vectors for documents and queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingTask {
    Document,
    Query,
}

/// Operations related to embeddings and their models.
#[async_trait::async_trait]
pub trait Embedder {
    /// Used to identify the embedder in logs and in the app configuration.
    fn id(&self) -> &'static str;

    /// The embedding model used by this instance.
    fn model(&self) -> &str;

    /// Get the vectors for the elements in `content`.
    /// The content passed in can be a user's query,
    /// or a chunked document.
    ///
    /// The output is 1:1 with the input.
    ///
    /// * `content`: The text to embed.
    /// * `task`: The purpose of the embeddings.
    async fn embed(
        &self,
        content: &[&str],
        task: EmbeddingTask,
    ) -> Result<Vec<Vec<f32>>, DocqaError>;
}
