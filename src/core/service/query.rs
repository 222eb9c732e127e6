use crate::{
    core::{
        embedder::{Embedder, EmbeddingTask},
        llm::Generator,
        model::{Answer, ScoredChunk},
        vector::VectorIndex,
    },
    err,
    error::DocqaError,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Amount of chunks used as context when none is configured.
pub const DEFAULT_TOP_K: usize = 4;

/// Answers questions using the closest chunks of the index as context.
#[derive(Clone)]
pub struct QueryService {
    embedder: Arc<dyn Embedder + Send + Sync>,
    generator: Arc<dyn Generator + Send + Sync>,
    index: Arc<dyn VectorIndex + Send + Sync>,
    top_k: usize,
}

impl QueryService {
    pub fn new(
        embedder: Arc<dyn Embedder + Send + Sync>,
        generator: Arc<dyn Generator + Send + Sync>,
        index: Arc<dyn VectorIndex + Send + Sync>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            generator,
            index,
            top_k,
        }
    }

    /// Retrieve the `top_k` closest chunks to `question` and let the
    /// generator answer it from them.
    ///
    /// * `question`: The user's query.
    pub async fn answer(&self, question: &str) -> Result<Answer, DocqaError> {
        let question = question.trim();

        if question.is_empty() {
            return err!(MissingQuery);
        }

        if !self.index.exists().await? {
            return err!(IndexMissing);
        }

        let mut embeddings = self
            .embedder
            .embed(&[question], EmbeddingTask::Query)
            .await?;

        let Some(vector) = embeddings.pop() else {
            return err!(
                MalformedResponse,
                "{} returned no embedding for the query",
                self.embedder.id()
            );
        };

        let chunks = self.index.query(&vector, self.top_k).await?;

        debug!(
            "Retrieved {} chunk(s), scores: {:?}",
            chunks.len(),
            chunks.iter().map(|c| c.score).collect::<Vec<_>>()
        );

        let prompt = render_prompt(&chunks, question);
        let output_text = self.generator.generate(&prompt).await?;

        info!(
            "Answered query using {} chunk(s) with '{}'",
            chunks.len(),
            self.generator.model()
        );

        Ok(Answer {
            output_text,
            sources: distinct_sources(&chunks),
        })
    }
}

fn render_prompt(chunks: &[ScoredChunk], question: &str) -> String {
    let context = chunks
        .iter()
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"Answer the question as detailed as possible from the provided context.
If the answer is not in the context, say that it is not available in the context and do not provide a wrong answer.

Context:
{context}

Question:
{question}

Answer:
"#
    )
}

fn distinct_sources(chunks: &[ScoredChunk]) -> Vec<String> {
    let mut sources: Vec<String> = vec![];
    for chunk in chunks {
        if !sources.contains(&chunk.source) {
            sources.push(chunk.source.clone());
        }
    }
    sources
}
