#[rustfmt::skip]
use super::router::{
    // App
    __path_health_check,
    __path_app_config,
    // Ingestion
    ingest::{__path_upload_documents, __path_process_url, __path_upload_scaffold},
    // Answers
    search::__path_search,
};
use super::dto::{MessageResponse, UploadResponse, UrlData, UrlPayload};
use crate::{
    app::state::AppConfig,
    core::{chunk::ChunkBaseConfig, model::Answer},
    error::http::{ErrorType, ResponseError},
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        // App
        health_check,
        app_config,
        // Ingestion
        upload_documents,
        process_url,
        upload_scaffold,
        // Answers
        search,
    ),
    components(schemas(
        AppConfig,
        ChunkBaseConfig,
        Answer,
        UploadResponse,
        MessageResponse,
        UrlPayload,
        UrlData,
        ResponseError,
        ErrorType,
    ))
)]
pub struct ApiDoc;
