use crate::{
    core::model::{IndexEntry, ScoredChunk},
    error::DocqaError,
};

/// Vector index operations.
#[async_trait::async_trait]
pub trait VectorIndex {
    fn id(&self) -> &'static str;

    /// Returns the amount of entries in the index, 0 if the index does not exist.
    async fn count(&self) -> Result<usize, DocqaError>;

    /// Whether the index exists and holds at least one entry.
    async fn exists(&self) -> Result<bool, DocqaError> {
        Ok(self.count().await? > 0)
    }

    /// Merge `entries` into the index, creating it if it does not exist.
    /// Entries whose ID is already present are skipped, which makes
    /// inserting the same content repeatedly a no-op.
    ///
    /// Returns the amount of newly inserted entries.
    ///
    /// * `model`: The embedding model the vectors were produced with.
    /// * `entries`: The entries to insert.
    async fn insert(&self, model: &str, entries: Vec<IndexEntry>) -> Result<usize, DocqaError>;

    /// Perform semantic search.
    ///
    /// * `vector`: The query to use as the search vector.
    /// * `limit`: Amount of results to return.
    async fn query(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredChunk>, DocqaError>;
}
