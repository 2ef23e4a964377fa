//! services/mentoring_api/src/web/portability.rs
//!
//! Export and import handlers. An export is a single JSON document offered as a
//! download; an import is the same document uploaded back as a multipart file.

use crate::error::{ApiError, ErrorBody};
use crate::web::state::AppState;
use axum::{
    extract::{Multipart, Query, State},
    http::header,
    response::{IntoResponse, Json},
};
use chrono::Utc;
use mentoring_core::{
    apply_import, build_export_document, export_filename, inspect, parse_import, ImportError,
    ImportPolicy, ImportSummary, ValidationReport,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ImportParams {
    /// `merge` (default) or `replace`.
    pub policy: Option<String>,
}

/// Download every stored record as one export document.
#[utoipa::path(
    get,
    path = "/export",
    responses(
        (status = 200, description = "The export document, sent as an attachment", content_type = "application/json"),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn export_handler(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let document = build_export_document(state.store.as_ref()).await;
    debug!("Export requested");
    let body = document
        .to_pretty_json()
        .map_err(|e| ApiError::Internal(format!("Failed to encode export: {}", e)))?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_filename(Utc::now().date_naive())
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

/// Check an uploaded file and summarise what it contains. Nothing is written.
///
/// A document that fails validation still gets a 200 with `valid: false`, so the
/// errors can be shown next to the preview.
#[utoipa::path(
    post,
    path = "/import/preview",
    request_body(content_type = "multipart/form-data", description = "The export file to check."),
    responses(
        (status = 200, description = "Validation report with errors, warnings and preview"),
        (status = 400, description = "No file, or the file is not JSON", body = ErrorBody)
    )
)]
pub async fn import_preview_handler(multipart: Multipart) -> Result<Json<ValidationReport>, ApiError> {
    let text = read_upload(multipart).await?;
    Ok(Json(inspect(&text)?))
}

/// Import an uploaded export file under the merge or replace policy.
#[utoipa::path(
    post,
    path = "/import",
    params(ImportParams),
    request_body(content_type = "multipart/form-data", description = "The export file to import."),
    responses(
        (status = 200, description = "What the import changed"),
        (status = 400, description = "No file, unknown policy, or the file is not JSON", body = ErrorBody),
        (status = 422, description = "The file is not a valid export; nothing was written", body = ErrorBody),
        (status = 500, description = "The import failed while saving", body = ErrorBody)
    )
)]
pub async fn import_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ImportParams>,
    multipart: Multipart,
) -> Result<Json<ImportSummary>, ApiError> {
    let policy = match params.policy.as_deref() {
        None => ImportPolicy::default(),
        Some(raw) => raw.parse::<ImportPolicy>().map_err(ApiError::BadRequest)?,
    };
    let text = read_upload(multipart).await?;
    let document = parse_import(&text)?;

    let _guard = state.writes.lock().await;
    let summary = apply_import(state.store.as_ref(), &document, policy).await?;
    Ok(Json(summary))
}

/// Reads the first file part of the upload as text.
async fn read_upload(mut multipart: Multipart) -> Result<String, ApiError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart data: {}", e)))?
        .ok_or_else(|| ApiError::BadRequest("Multipart form must include a file".to_string()))?;

    let data = field
        .bytes()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read file bytes: {}", e)))?;
    String::from_utf8(data.to_vec())
        .map_err(|e| ApiError::from(ImportError::InvalidFile(e.to_string())))
}
