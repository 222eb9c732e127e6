use super::api::ApiDoc;
use crate::{
    app::state::{AppConfig, AppState},
    error::DocqaError,
};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::time::Duration;
use tower_http::{
    classify::ServerErrorsFailureClass,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::Span;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod ingest;
pub mod search;

/// Maximum size of a multipart upload.
const BODY_LIMIT: usize = 50_000_000;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins(&state.config.allowed_origins))
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::POST]);

    use ingest::*;
    use search::*;

    let app = Router::new()
        .route("/info", get(app_config))
        .route("/api/upload", post(upload_scaffold))
        .with_state(state.clone());

    Router::new()
        .route("/upload", post(upload_documents))
        .route("/urls", post(process_url))
        .route("/search", get(search))
        .with_state(state.services.clone())
        .merge(app)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(
            TraceLayer::new_for_http()
                .on_request(|req: &axum::http::Request<_>, _span: &Span| {
                    let ctype = req
                        .headers()
                        .get("content-type")
                        .map(|v| v.to_str().unwrap_or("none"))
                        .unwrap_or("none");

                    tracing::info!(
                        "Processing request | {} {} | content-type: {ctype}",
                        req.method(),
                        req.uri().path()
                    );
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, _span: &Span| {
                        let status = res.status();
                        let ctype = res
                            .headers()
                            .get("content-type")
                            .map(|v| v.to_str().unwrap_or("none"))
                            .unwrap_or("none");

                        tracing::info!(
                            "Sending response | {status} | {}ms | {ctype}",
                            latency.as_millis()
                        );
                    },
                )
                .on_failure(
                    |error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                        tracing::error!("Error in request: {error}")
                    },
                ),
        )
        .layer(cors)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Has to go last to exclude all the tracing/cors layers
        .route("/_health", get(health_check))
}

/// An empty list allows any origin. Origins that are not valid header values are skipped.
fn allowed_origins(origins: &[String]) -> AllowOrigin {
    if origins.is_empty() {
        tracing::info!("Allowing any origin");
        return AllowOrigin::any();
    }

    let origins = origins.iter().filter_map(|origin| {
        match HeaderValue::from_str(origin) {
            Ok(value) => {
                tracing::info!("Adding {origin} to allowed origins");
                Some(value)
            }
            Err(e) => {
                tracing::warn!("Skipping invalid origin '{origin}'; {e}");
                None
            }
        }
    });

    AllowOrigin::list(origins)
}

#[utoipa::path(
    get,
    path = "/_health",
    responses(
        (status = 200, description = "Service is up", body = String)
    )
)]
pub async fn health_check() -> impl IntoResponse {
    "OK"
}

#[utoipa::path(
    get,
    path = "/info",
    responses(
        (status = 200, description = "Get app configuration", body = AppConfig),
        (status = 500, description = "Internal server error", body = ResponseError)
    )
)]
pub async fn app_config(state: State<AppState>) -> Result<Json<AppConfig>, DocqaError> {
    Ok(Json(state.get_configuration().await?))
}
