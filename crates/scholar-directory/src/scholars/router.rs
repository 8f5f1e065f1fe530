use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};

use super::domain::ScholarId;
use super::options::Clock;
use super::query::ListParams;
use super::saved::ExportFormat;
use super::service::{DirectoryService, DirectoryServiceError};
use super::store::ScholarStore;

/// Router exposing the scholar list, detail, batch, filter-option and export endpoints.
pub fn scholar_router<S, C>(service: Arc<DirectoryService<S, C>>) -> Router
where
    S: ScholarStore + 'static,
    C: Clock + Clone + 'static,
{
    Router::new()
        .route("/api/scholars", get(list_handler::<S, C>))
        .route("/api/scholars/filters", get(filters_handler::<S, C>))
        .route(
            "/api/scholars/filters/options",
            get(filter_options_handler::<S, C>),
        )
        .route("/api/scholars/batch", post(batch_handler::<S, C>))
        .route("/api/scholars/export", post(export_handler::<S, C>))
        .route("/api/scholars/:id", get(detail_handler::<S, C>))
        .with_state(service)
}

pub(crate) async fn list_handler<S, C>(
    State(service): State<Arc<DirectoryService<S, C>>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response
where
    S: ScholarStore + 'static,
    C: Clock + Clone + 'static,
{
    let params = ListParams::from_pairs(pairs);
    match service.list(&params).await {
        Ok(body) => (StatusCode::OK, axum::Json(body)).into_response(),
        Err(error) => failure("Failed to fetch scholars", &error),
    }
}

pub(crate) async fn filters_handler<S, C>(
    State(service): State<Arc<DirectoryService<S, C>>>,
) -> Response
where
    S: ScholarStore + 'static,
    C: Clock + Clone + 'static,
{
    match service.filters().await {
        Ok(cached) => (StatusCode::OK, axum::Json(cached.values.clone())).into_response(),
        Err(error) => failure("Failed to fetch filters", &error),
    }
}

pub(crate) async fn filter_options_handler<S, C>(
    State(service): State<Arc<DirectoryService<S, C>>>,
) -> Response
where
    S: ScholarStore + 'static,
    C: Clock + Clone + 'static,
{
    match service.filters().await {
        Ok(cached) => (StatusCode::OK, axum::Json(cached.options.clone())).into_response(),
        Err(error) => failure("Failed to fetch filters", &error),
    }
}

pub(crate) async fn batch_handler<S, C>(
    State(service): State<Arc<DirectoryService<S, C>>>,
    body: Bytes,
) -> Response
where
    S: ScholarStore + 'static,
    C: Clock + Clone + 'static,
{
    let Some(ids) = ids_from_body(&body) else {
        return ids_required();
    };

    match service.batch(&ids).await {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(error) => failure("Failed to fetch scholars", &error),
    }
}

pub(crate) async fn detail_handler<S, C>(
    State(service): State<Arc<DirectoryService<S, C>>>,
    Path(id): Path<String>,
) -> Response
where
    S: ScholarStore + 'static,
    C: Clock + Clone + 'static,
{
    match service.get(&ScholarId(id)).await {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(DirectoryServiceError::NotFound(_)) => {
            let payload = json!({ "error": "Scholar not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(error) => failure("Failed to fetch scholar", &error),
    }
}

pub(crate) async fn export_handler<S, C>(
    State(service): State<Arc<DirectoryService<S, C>>>,
    Query(pairs): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Response
where
    S: ScholarStore + 'static,
    C: Clock + Clone + 'static,
{
    let requested = pairs
        .iter()
        .find(|(key, _)| key == "format")
        .map(|(_, value)| value.as_str());
    let format = match requested {
        None => ExportFormat::Csv,
        Some(raw) => match ExportFormat::parse(raw) {
            Some(format) => format,
            None => {
                let payload = json!({ "error": format!("unsupported export format '{raw}'") });
                return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
            }
        },
    };
    let Some(ids) = ids_from_body(&body) else {
        return ids_required();
    };

    match service.export(ids, format).await {
        Ok(Some(payload)) => {
            let disposition = format!(
                "attachment; filename=\"{}\"",
                payload.file_name(service.today())
            );
            let mut response = (StatusCode::OK, payload.body).into_response();
            let headers = response.headers_mut();
            if let Ok(value) = HeaderValue::from_str(format.content_type().as_ref()) {
                headers.insert(header::CONTENT_TYPE, value);
            }
            if let Ok(value) = HeaderValue::from_str(&disposition) {
                headers.insert(header::CONTENT_DISPOSITION, value);
            }
            response
        }
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => failure("Failed to export scholars", &error),
    }
}

/// `ids` from a `{ "ids": [..] }` body. Non-string entries are skipped.
fn ids_from_body(body: &[u8]) -> Option<Vec<ScholarId>> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let ids = value.get("ids")?.as_array()?;
    Some(
        ids.iter()
            .filter_map(Value::as_str)
            .map(ScholarId::from)
            .collect(),
    )
}

fn ids_required() -> Response {
    let payload = json!({ "error": "ids array required" });
    (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
}

fn failure(message: &'static str, error: &DirectoryServiceError) -> Response {
    tracing::error!(error = %error, "{message}");
    let payload = json!({ "error": message });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
