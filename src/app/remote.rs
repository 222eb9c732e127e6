//! Plumbing shared by the clients of hosted model APIs.

use crate::{err, error::DocqaError, map_err};
use serde::{de::DeserializeOwned, Deserialize};
use std::{future::Future, time::Duration};
use tracing::{error, warn};

/// Total amount of attempts made for a single remote call.
pub const MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry, doubled on every subsequent one.
const BASE_DELAY: Duration = Duration::from_secs(1);

/// Error bodies longer than this are cut off when reported.
const MAX_ERROR_BODY: usize = 512;

/// Run `call` until it succeeds, fails with a non transient error,
/// or [MAX_ATTEMPTS] is reached.
///
/// * `op`: Name of the operation, used in logs.
/// * `call`: Produces the future performing the call.
pub async fn with_retry<T, F, Fut>(op: &str, mut call: F) -> Result<T, DocqaError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DocqaError>>,
{
    let mut attempt = 1;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                let delay = BASE_DELAY * 2u32.pow(attempt - 1);
                warn!("{op} failed (attempt {attempt}/{MAX_ATTEMPTS}), retrying in {delay:?}; {e}");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Decode a successful response as `T`.
///
/// Non success statuses are turned into upstream errors carrying the
/// provider's message. A body that is not a valid `T` is a malformed response.
pub async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, DocqaError> {
    let status = response.status();

    if !status.is_success() {
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        error!("Request to {url} failed with status {status}; {message}");
        return Err(DocqaError::upstream(status.as_u16(), message));
    }

    let body = map_err!(response.bytes().await);

    match serde_json::from_slice(&body) {
        Ok(value) => Ok(value),
        Err(e) => err!(MalformedResponse, "{e}"),
    }
}

/// Both Gemini and OpenAI report errors as `{ "error": { "message": ... } }`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    message: String,
}

fn error_message(body: &str) -> String {
    if let Ok(ErrorBody { error }) = serde_json::from_str::<ErrorBody>(body) {
        return error.message;
    }

    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocqaErr;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn response(status: u16, body: &'static str) -> reqwest::Response {
        reqwest::Response::from(
            axum::http::Response::builder()
                .status(status)
                .body(body)
                .unwrap(),
        )
    }

    #[derive(Debug, Deserialize)]
    struct Values {
        values: Vec<f32>,
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors() {
        let attempts = AtomicU32::new(0);

        let result = with_retry("test", || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt < MAX_ATTEMPTS {
                    Err(DocqaError::upstream(503, "overloaded"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(MAX_ATTEMPTS, result);
        assert_eq!(MAX_ATTEMPTS, attempts.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = with_retry("test", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(DocqaError::upstream(429, "rate limited")) }
        })
        .await;

        let error = result.unwrap_err();
        assert!(matches!(error.error, DocqaErr::Upstream { status: 429, .. }));
        assert_eq!(MAX_ATTEMPTS, attempts.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_errors_are_not_retried() {
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = with_retry("test", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(DocqaError::upstream(400, "API key not valid")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(1, attempts.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn reads_successful_response() {
        let values: Values = read_json(response(200, r#"{"values":[0.5,1.0]}"#))
            .await
            .unwrap();
        assert_eq!(vec![0.5, 1.0], values.values);
    }

    #[tokio::test]
    async fn error_status_carries_provider_message() {
        let error = read_json::<Values>(response(
            400,
            r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#,
        ))
        .await
        .unwrap_err();

        match error.error {
            DocqaErr::Upstream { status, message } => {
                assert_eq!(400, status);
                assert_eq!("API key not valid", message);
            }
            e => panic!("unexpected error: {e}"),
        }
    }

    #[tokio::test]
    async fn unexpected_body_is_malformed() {
        let error = read_json::<Values>(response(200, r#"{"embeddings":[]}"#))
            .await
            .unwrap_err();
        assert!(matches!(error.error, DocqaErr::MalformedResponse(_)));
        assert!(!error.is_transient());
    }

    #[test]
    fn plain_error_bodies_are_truncated() {
        let body = "x".repeat(MAX_ERROR_BODY * 2);
        let message = error_message(&body);
        assert_eq!(MAX_ERROR_BODY + 3, message.len());
        assert_eq!("Bad Gateway", error_message(" Bad Gateway\n"));
    }
}
