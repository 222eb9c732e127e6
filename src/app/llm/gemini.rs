use crate::{
    app::remote::{read_json, with_retry},
    core::llm::{Generator, DEFAULT_TEMPERATURE},
    err,
    error::DocqaError,
    map_err,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const GEMINI_1_5_PRO: &str = "gemini-1.5-pro";

pub struct GeminiGenerator {
    client: reqwest::Client,
    endpoint: String,
    key: String,

    /// Bare model name, without the `models/` prefix.
    model: String,
}

impl GeminiGenerator {
    pub fn new(client: reqwest::Client, endpoint: &str, key: &str, model: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            key: key.to_string(),
            model: model.trim_start_matches("models/").to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Generator for GeminiGenerator {
    fn id(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, DocqaError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: DEFAULT_TEMPERATURE,
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        );
        let (url, request) = (&url, &request);

        let response: GenerateContentResponse =
            with_retry("Gemini generation", move || async move {
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

        response.into_text()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Result<String, DocqaError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "unknown".to_string());
            return err!(MalformedResponse, "no candidates returned; block reason: {reason}");
        };

        debug!("Generation finished: {:?}", candidate.finish_reason);

        let text = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<String>();

        if text.is_empty() {
            return err!(
                MalformedResponse,
                "candidate contains no text; finish reason: {:?}",
                candidate.finish_reason
            );
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocqaErr;
    use serde_json::json;

    #[test]
    fn request_shape() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: "Why?" }],
            }],
            generation_config: GenerationConfig { temperature: 0.5 },
        };

        assert_eq!(
            json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Why?" }] }],
                "generationConfig": { "temperature": 0.5 }
            }),
            serde_json::to_value(&request).unwrap()
        );
    }

    #[test]
    fn candidate_parts_are_joined() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Because " }, { "text": "it is." }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        assert_eq!("Because it is.", response.into_text().unwrap());
    }

    #[test]
    fn blocked_prompt_is_malformed() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();

        let error = response.into_text().unwrap_err();
        assert!(matches!(error.error, DocqaErr::MalformedResponse(ref m) if m.contains("SAFETY")));
    }
}
