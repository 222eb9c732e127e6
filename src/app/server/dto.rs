//! Http specific DTOs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,

    /// Amount of distinct chunks extracted from the files.
    pub chunks: usize,

    /// Amount of chunks that were not in the index before.
    pub inserted: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body of the URL ingestion endpoint, `{ "data": { "url": "..." } }`.
/// Both levels are optional so a missing URL can be told apart
/// from a malformed body.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UrlPayload {
    pub data: Option<UrlData>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UrlData {
    pub url: Option<String>,
}

impl UrlPayload {
    pub fn url(self) -> Option<String> {
        self.data
            .and_then(|data| data.url)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// The question to answer.
    pub query: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_is_extracted() {
        let payload: UrlPayload =
            serde_json::from_str(r#"{"data":{"url":" https://example.com "}}"#).unwrap();
        assert_eq!(Some("https://example.com".to_string()), payload.url());
    }

    #[test]
    fn missing_url_levels() {
        for body in [r#"{}"#, r#"{"data":{}}"#, r#"{"data":null}"#, r#"{"data":{"url":"  "}}"#] {
            let payload: UrlPayload = serde_json::from_str(body).unwrap();
            assert_eq!(None, payload.url(), "{body}");
        }
    }
}
