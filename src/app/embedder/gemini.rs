use crate::{
    app::remote::{read_json, with_retry},
    core::embedder::{Embedder, EmbeddingTask},
    err,
    error::DocqaError,
    map_err,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

pub const EMBEDDING_001: &str = "models/embedding-001";

/// Maximum amount of requests accepted by `batchEmbedContents`.
const BATCH_SIZE: usize = 100;

pub struct GeminiEmbeddings {
    client: reqwest::Client,
    endpoint: String,
    key: String,

    /// Always in the `models/{name}` form.
    model: String,
}

impl GeminiEmbeddings {
    pub fn new(client: reqwest::Client, endpoint: &str, key: &str, model: &str) -> Self {
        let model = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        };

        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            key: key.to_string(),
            model,
        }
    }

    async fn embed_batch(
        &self,
        input: &[&str],
        task: EmbeddingTask,
    ) -> Result<Vec<Vec<f32>>, DocqaError> {
        let request = BatchEmbedRequest {
            requests: input
                .iter()
                .map(|&text| EmbedContentRequest {
                    model: &self.model,
                    content: Content {
                        parts: vec![Part { text }],
                    },
                    task_type: task.into(),
                })
                .collect(),
        };

        let url = format!("{}/v1beta/{}:batchEmbedContents", self.endpoint, self.model);
        let (url, request) = (&url, &request);

        let response: BatchEmbedResponse = with_retry("Gemini embeddings", move || async move {
            let response = map_err!(
                self.client
                    .post(url)
                    .header("x-goog-api-key", self.key.as_str())
                    .json(request)
                    .send()
                    .await
            );
            read_json(response).await
        })
        .await?;

        if response.embeddings.len() != input.len() {
            return err!(
                MalformedResponse,
                "expected {} embeddings, got {}",
                input.len(),
                response.embeddings.len()
            );
        }

        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[async_trait::async_trait]
impl Embedder for GeminiEmbeddings {
    fn id(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(
        &self,
        content: &[&str],
        task: EmbeddingTask,
    ) -> Result<Vec<Vec<f32>>, DocqaError> {
        let mut embeddings = Vec::with_capacity(content.len());

        for batch in content.chunks(BATCH_SIZE) {
            embeddings.extend(self.embed_batch(batch, task).await?);
        }

        debug!(
            "Embedded {} chunk(s) with '{}' ({task:?})",
            content.len(),
            self.model
        );

        Ok(embeddings)
    }
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: TaskType,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

impl From<EmbeddingTask> for TaskType {
    fn from(task: EmbeddingTask) -> Self {
        match task {
            EmbeddingTask::Document => Self::RetrievalDocument,
            EmbeddingTask::Query => Self::RetrievalQuery,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}
