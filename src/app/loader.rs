use crate::{
    app::remote::with_retry,
    core::{
        document::{loader::UrlLoader, parser::parse_blocking},
        model::{Document, DocumentType},
    },
    error::DocqaError,
    map_err,
};
use futures_util::future::try_join_all;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, error};

/// Fetches pages over HTTP and extracts their text based on the content type.
/// Responses without a recognised content type are treated as HTML.
#[derive(Debug, Clone)]
pub struct HttpUrlLoader {
    client: reqwest::Client,
}

impl HttpUrlLoader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn load_one(&self, url: &str) -> Result<Document, DocqaError> {
        let response = with_retry("URL loading", move || async move {
            let response = map_err!(self.client.get(url).send().await);
            let status = response.status();

            if !status.is_success() {
                error!("Loading {url} failed with status {status}");
                return Err(DocqaError::upstream(
                    status.as_u16(),
                    format!("unable to load {url}"),
                ));
            }

            Ok(response)
        })
        .await?;

        let ty = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(DocumentType::from_content_type)
            .unwrap_or(DocumentType::Html);

        let body = map_err!(response.bytes().await);

        debug!("Loaded {url} ({ty}, {} bytes)", body.len());

        let content = parse_blocking(ty, body.to_vec()).await?;

        Ok(Document::new(content, url))
    }
}

#[async_trait::async_trait]
impl UrlLoader for HttpUrlLoader {
    async fn load(&self, urls: &[String]) -> Result<Vec<Document>, DocqaError> {
        try_join_all(urls.iter().map(|url| self.load_one(url))).await
    }
}
