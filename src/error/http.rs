use super::{DocqaErr, DocqaError};
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

impl DocqaError {
    pub fn status(&self) -> StatusCode {
        use DocqaErr as E;
        use StatusCode as SC;
        match self.error {
            E::NoFilePart => SC::UNAUTHORIZED,
            E::NoSelectedFiles
            | E::MissingQuery
            | E::MissingUrl
            | E::MalformedBody(_)
            | E::Multipart(_) => SC::BAD_REQUEST,
            E::IndexMissing => SC::NOT_FOUND,
            E::IncompatibleIndex(_) => SC::CONFLICT,
            E::Validation(_)
            | E::Chunker(_)
            | E::InvalidFileName(_)
            | E::UnsupportedFileType(_)
            | E::EmptyDocument(_)
            | E::ParsePdf(_) => SC::UNPROCESSABLE_ENTITY,
            E::Upstream { .. } if self.is_transient() => SC::SERVICE_UNAVAILABLE,
            E::Upstream { .. } | E::MalformedResponse(_) => SC::BAD_GATEWAY,
            E::Reqwest(ref e) if e.is_timeout() => SC::GATEWAY_TIMEOUT,
            E::Reqwest(_) => SC::BAD_GATEWAY,
            E::InvalidProvider(_)
            | E::Config(_)
            | E::CorruptIndex(_)
            | E::IO(_)
            | E::SerdeJson(_)
            | E::Join(_) => SC::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response wrapper.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ResponseError {
    error: String,
    kind: ErrorType,
    retryable: bool,
}

impl ResponseError {
    fn new(kind: ErrorType, error: String, retryable: bool) -> Self {
        Self {
            error,
            kind,
            retryable,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Internal,
    Api,
}

impl IntoResponse for ResponseError {
    fn into_response(self) -> axum::response::Response {
        <Json<ResponseError> as IntoResponse>::into_response(Json(self))
    }
}

impl IntoResponse for DocqaError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let retryable = self.is_transient();

        self.print();

        use DocqaErr as DE;
        use ErrorType as ET;

        let body = match self.error {
            DE::IO(_) | DE::SerdeJson(_) | DE::Join(_) | DE::CorruptIndex(_) | DE::Config(_) => {
                ResponseError::new(ET::Internal, "Internal server error".to_string(), retryable)
            }
            DE::Upstream { .. } | DE::MalformedResponse(_) | DE::Reqwest(_) => {
                ResponseError::new(ET::Internal, self.to_string(), retryable)
            }
            DE::InvalidProvider(_) => {
                ResponseError::new(ET::Internal, self.to_string(), retryable)
            }
            _ => ResponseError::new(ET::Api, self.to_string(), retryable),
        };

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use crate::{err, error::DocqaError};
    use axum::{http::StatusCode, response::IntoResponse};

    fn status_of(result: Result<(), DocqaError>) -> StatusCode {
        result.unwrap_err().status()
    }

    #[test]
    fn input_errors_map_to_client_statuses() {
        assert_eq!(StatusCode::UNAUTHORIZED, status_of(err!(NoFilePart)));
        assert_eq!(StatusCode::BAD_REQUEST, status_of(err!(NoSelectedFiles)));
        assert_eq!(StatusCode::BAD_REQUEST, status_of(err!(MissingQuery)));
        assert_eq!(StatusCode::BAD_REQUEST, status_of(err!(MissingUrl)));
        assert_eq!(
            StatusCode::BAD_REQUEST,
            status_of(err!(MalformedBody, "expected value"))
        );
        assert_eq!(StatusCode::NOT_FOUND, status_of(err!(IndexMissing)));
        assert_eq!(
            StatusCode::UNPROCESSABLE_ENTITY,
            status_of(err!(UnsupportedFileType, "exe"))
        );
    }

    #[test]
    fn upstream_errors_map_to_gateway_statuses() {
        assert_eq!(
            StatusCode::SERVICE_UNAVAILABLE,
            DocqaError::upstream(503, "overloaded").status()
        );
        assert_eq!(
            StatusCode::BAD_GATEWAY,
            DocqaError::upstream(403, "key rejected").status()
        );
    }

    #[tokio::test]
    async fn response_body_uses_error_envelope() {
        let response = DocqaError::upstream(429, "quota").into_response();
        assert_eq!(StatusCode::SERVICE_UNAVAILABLE, response.status());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!("Upstream responded with 429; quota", body["error"]);
        assert_eq!("internal", body["kind"]);
        assert_eq!(true, body["retryable"]);
    }

    #[tokio::test]
    async fn missing_query_body() {
        let result: Result<(), DocqaError> = err!(MissingQuery);
        let response = result.unwrap_err().into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!("No search query provided", body["error"]);
        assert_eq!("api", body["kind"]);
    }
}
