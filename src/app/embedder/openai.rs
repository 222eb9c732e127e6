use crate::{
    app::remote::{read_json, with_retry},
    core::embedder::{Embedder, EmbeddingTask},
    err,
    error::DocqaError,
    map_err,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com";

pub const TEXT_EMBEDDING_3_SMALL: &str = "text-embedding-3-small";

/// Inputs sent in a single embeddings request. Kept well below the API's
/// input limit so that a batch of full sized chunks stays under the token limit.
const BATCH_SIZE: usize = 100;

pub struct OpenAiEmbeddings {
    client: reqwest::Client,
    endpoint: String,
    key: String,
    model: String,
}

impl OpenAiEmbeddings {
    pub fn new(client: reqwest::Client, endpoint: &str, key: &str, model: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            key: key.to_string(),
            model: model.to_string(),
        }
    }

    async fn embed_batch(&self, input: &[&str]) -> Result<Vec<Vec<f32>>, DocqaError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input,
        };

        let url = format!("{}/v1/embeddings", self.endpoint);
        let (url, request) = (&url, &request);

        let response: EmbeddingResponse = with_retry("OpenAI embeddings", move || async move {
            let response = map_err!(
                self.client
                    .post(url)
                    .bearer_auth(&self.key)
                    .json(request)
                    .send()
                    .await
            );
            read_json(response).await
        })
        .await?;

        if response.data.len() != input.len() {
            return err!(
                MalformedResponse,
                "expected {} embeddings, got {}",
                input.len(),
                response.data.len()
            );
        }

        debug!(
            "Embedded {} chunk(s) with '{}', used tokens {}-{} (prompt-total)",
            input.len(),
            response.model,
            response.usage.prompt_tokens,
            response.usage.total_tokens
        );

        let mut data = response.data;
        data.sort_by_key(|o| o.index);

        Ok(data.into_iter().map(|o| o.embedding).collect())
    }
}

#[async_trait::async_trait]
impl Embedder for OpenAiEmbeddings {
    fn id(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    /// OpenAI embeddings do not distinguish between documents and queries.
    async fn embed(
        &self,
        content: &[&str],
        _task: EmbeddingTask,
    ) -> Result<Vec<Vec<f32>>, DocqaError> {
        let mut embeddings = Vec::with_capacity(content.len());

        for batch in content.chunks(BATCH_SIZE) {
            embeddings.extend(self.embed_batch(batch).await?);
        }

        Ok(embeddings)
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingObject>,
    model: String,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct EmbeddingObject {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: usize,
    total_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test::serve_mock;
    use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    type Batches = Arc<Mutex<Vec<usize>>>;

    /// Embeds every input, a number, as a one dimensional vector of itself
    /// and lists the results in reverse order.
    async fn embeddings(
        State(batches): State<Batches>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        assert_eq!("Bearer test-key", headers["authorization"]);
        assert_eq!(TEXT_EMBEDDING_3_SMALL, body["model"]);

        let input = body["input"].as_array().unwrap();
        batches.lock().unwrap().push(input.len());

        let data = input
            .iter()
            .enumerate()
            .rev()
            .map(|(index, text)| {
                let value: f32 = text.as_str().unwrap().parse().unwrap();
                json!({ "object": "embedding", "embedding": [value], "index": index })
            })
            .collect::<Vec<_>>();

        Json(json!({
            "object": "list",
            "data": data,
            "model": TEXT_EMBEDDING_3_SMALL,
            "usage": { "prompt_tokens": 8, "total_tokens": 8 }
        }))
    }

    #[tokio::test]
    async fn embeds_in_ordered_batches() {
        let batches = Batches::default();

        let endpoint = serve_mock(
            Router::new()
                .route("/v1/embeddings", post(embeddings))
                .with_state(batches.clone()),
        )
        .await;

        let embedder = OpenAiEmbeddings::new(
            reqwest::Client::new(),
            &endpoint,
            "test-key",
            TEXT_EMBEDDING_3_SMALL,
        );

        let input = (0..250).map(|i| i.to_string()).collect::<Vec<_>>();
        let input = input.iter().map(String::as_str).collect::<Vec<_>>();

        let vectors = embedder
            .embed(&input, EmbeddingTask::Document)
            .await
            .unwrap();

        assert_eq!(vec![100, 100, 50], *batches.lock().unwrap());
        assert_eq!(250, vectors.len());

        for (i, vector) in vectors.iter().enumerate() {
            assert_eq!(vec![i as f32], *vector);
        }
    }

    #[tokio::test]
    async fn provider_errors_are_reported() {
        let endpoint = serve_mock(Router::new().route(
            "/v1/embeddings",
            post(|| async {
                (
                    axum::http::StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": { "message": "Incorrect API key provided" } })),
                )
            }),
        ))
        .await;

        let embedder =
            OpenAiEmbeddings::new(reqwest::Client::new(), &endpoint, "bad", TEXT_EMBEDDING_3_SMALL);

        let error = embedder
            .embed(&["Hello"], EmbeddingTask::Query)
            .await
            .unwrap_err();

        match error.error {
            crate::error::DocqaErr::Upstream { status, message } => {
                assert_eq!(401, status);
                assert_eq!("Incorrect API key provided", message);
            }
            e => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn response_is_decoded() {
        let response: EmbeddingResponse = serde_json::from_str(
            r#"{
                "object": "list",
                "data": [
                    { "object": "embedding", "embedding": [0.2, 0.1], "index": 1 },
                    { "object": "embedding", "embedding": [0.1, 0.2], "index": 0 }
                ],
                "model": "text-embedding-3-small",
                "usage": { "prompt_tokens": 8, "total_tokens": 8 }
            }"#,
        )
        .unwrap();

        let mut data = response.data;
        data.sort_by_key(|o| o.index);

        assert_eq!(vec![0.1, 0.2], data[0].embedding);
        assert_eq!(vec![0.2, 0.1], data[1].embedding);
    }
}
