use crate::{
    app::remote::{read_json, with_retry},
    core::llm::{Generator, DEFAULT_TEMPERATURE},
    err,
    error::DocqaError,
    map_err,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const GPT_4O_MINI: &str = "gpt-4o-mini";

/// Talks the chat completions protocol, so it works with any
/// OpenAI compatible endpoint.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    endpoint: String,
    key: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(client: reqwest::Client, endpoint: &str, key: &str, model: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            key: key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Generator for OpenAiGenerator {
    fn id(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, DocqaError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: DEFAULT_TEMPERATURE,
        };

        let url = format!("{}/v1/chat/completions", self.endpoint);
        let (url, request) = (&url, &request);

        let response: ChatResponse = with_retry("OpenAI completion", move || async move {
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

        if let Some(usage) = response.usage.as_ref() {
            debug!(
                "Completion with '{}' used tokens {}-{} (prompt-total)",
                self.model, usage.prompt_tokens, usage.total_tokens
            );
        }

        let text = response
            .choices
            .into_iter()
            .filter_map(|c| c.message.content)
            .collect::<String>();

        if text.is_empty() {
            return err!(MalformedResponse, "completion contains no content");
        }

        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: usize,
    total_tokens: usize,
}
