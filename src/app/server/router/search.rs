use crate::{
    app::{server::dto::SearchQuery, state::ServiceState},
    core::model::Answer,
    err,
    error::DocqaError,
};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};

#[utoipa::path(
    get,
    path = "/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Answer generated from the closest chunks", body = Answer),
        (status = 400, description = "No search query provided", body = ResponseError),
        (status = 404, description = "No vector index found", body = ResponseError),
        (status = 502, description = "Model API failure", body = ResponseError)
    )
)]
pub async fn search(
    services: State<ServiceState>,
    params: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Answer>, DocqaError> {
    let Query(params) = match params {
        Ok(params) => params,
        Err(e) => return err!(MalformedBody, "{}", e.body_text()),
    };

    let Some(query) = params.query.filter(|q| !q.trim().is_empty()) else {
        return err!(MissingQuery);
    };

    Ok(Json(services.query.answer(&query).await?))
}
