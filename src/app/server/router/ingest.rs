use crate::{
    app::{
        server::dto::{MessageResponse, UploadResponse, UrlPayload},
        state::{AppState, ServiceState},
    },
    core::service::ingest::DocumentUpload,
    err,
    error::DocqaError,
    map_err,
};
use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use tracing::{info, warn};

/// Multipart field holding documents to ingest.
const FILES_FIELD: &str = "files";

/// Multipart field of the plain upload endpoint.
const FILE_FIELD: &str = "file";

#[utoipa::path(
    post,
    path = "/upload",
    responses(
        (status = 200, description = "Files ingested into the index", body = UploadResponse),
        (status = 400, description = "No selected files", body = ResponseError),
        (status = 401, description = "No file part", body = ResponseError),
        (status = 422, description = "Unsupported or empty document", body = ResponseError),
        (status = 500, description = "Internal server error", body = ResponseError)
    ),
    request_body(content = Multipart, content_type = "multipart/form-data")
)]
pub async fn upload_documents(
    services: State<ServiceState>,
    form: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, DocqaError> {
    // A body that is not multipart cannot contain the part either.
    let mut form = match form {
        Ok(form) => form,
        Err(e) => {
            warn!("Rejected upload; {e}");
            return err!(NoFilePart);
        }
    };

    let mut has_part = false;
    let mut uploads = vec![];

    while let Some(field) = map_err!(form.next_field().await) {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }

        has_part = true;

        let name = field.file_name().unwrap_or_default().to_string();
        let file = map_err!(field.bytes().await);

        // Browsers send an unnamed, empty part when nothing was selected.
        if name.is_empty() || file.is_empty() {
            warn!("Skipping empty part '{name}'");
            continue;
        }

        uploads.push(DocumentUpload::new(name, file.to_vec()));
    }

    if !has_part {
        return err!(NoFilePart);
    }

    if uploads.is_empty() {
        return err!(NoSelectedFiles);
    }

    let report = services.ingest.upload(uploads).await?;

    Ok(Json(UploadResponse {
        message: "Files uploaded successfully".to_string(),
        chunks: report.chunks,
        inserted: report.inserted,
    }))
}

#[utoipa::path(
    post,
    path = "/urls",
    responses(
        (status = 200, description = "Page ingested into the index", body = MessageResponse),
        (status = 400, description = "No URL provided or malformed body", body = ResponseError),
        (status = 422, description = "Invalid URL", body = ResponseError),
        (status = 502, description = "URL or model API unreachable", body = ResponseError)
    ),
    request_body = UrlPayload
)]
pub async fn process_url(
    services: State<ServiceState>,
    body: Bytes,
) -> Result<Json<MessageResponse>, DocqaError> {
    // Parsed by hand so that a missing URL and invalid JSON produce our own errors.
    let payload = match serde_json::from_slice::<UrlPayload>(&body) {
        Ok(payload) => payload,
        Err(e) => return err!(MalformedBody, "{e}"),
    };

    let Some(url) = payload.url() else {
        return err!(MissingUrl);
    };

    services.ingest.ingest_urls(&[url]).await?;

    Ok(Json(MessageResponse::new("value")))
}

#[utoipa::path(
    post,
    path = "/api/upload",
    responses(
        (status = 200, description = "File stored", body = MessageResponse),
        (status = 400, description = "No selected files", body = ResponseError),
        (status = 422, description = "Invalid file name", body = ResponseError)
    ),
    request_body(content = Multipart, content_type = "multipart/form-data")
)]
pub async fn upload_scaffold(
    state: State<AppState>,
    form: Result<Multipart, MultipartRejection>,
) -> Result<Json<MessageResponse>, DocqaError> {
    let mut form = match form {
        Ok(form) => form,
        Err(e) => {
            warn!("Rejected upload; {e}");
            return err!(NoSelectedFiles);
        }
    };

    while let Some(field) = map_err!(form.next_field().await) {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let name = field.file_name().unwrap_or_default().to_string();
        let file = map_err!(field.bytes().await);

        if name.is_empty() || file.is_empty() {
            continue;
        }

        let stored = state.providers.store.write(&name, &file).await?;

        info!(
            "Received '{name}' ({} bytes), stored at {}",
            file.len(),
            stored.path.display()
        );

        return Ok(Json(MessageResponse::new("Upload")));
    }

    err!(NoSelectedFiles)
}
