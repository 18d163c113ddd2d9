//! Export archive handler.

use super::tasks::parse_task_id;
use super::{ExportQuery, ExportRequest};
use crate::api::AppState;
use crate::error::Error;
use crate::types::{ExportMode, TaskId};
use axum::{
    Json,
    body::Body,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

/// Name offered to the client for every archive
const DOWNLOAD_FILE_NAME: &str = "export.zip";

/// POST /export - Download the results of a set of tasks as a zip archive
///
/// The archive is built on first request and served from the cache afterwards.
#[utoipa::path(
    post,
    path = "/export",
    tag = "export",
    params(
        ("mode" = Option<String>, Query, description = "single_file (default), by_provider or raw_bundle"),
        ("delimiter" = Option<String>, Query, description = "Field delimiter (default ',')")
    ),
    request_body = ExportRequest,
    responses(
        (status = 200, description = "Zip archive (application/zip)"),
        (status = 400, description = "Missing, unknown or unfinished task IDs, unknown mode or bad delimiter", body = crate::error::ApiError),
        (status = 500, description = "Archive could not be built", body = crate::error::ApiError)
    )
)]
pub async fn export_tasks(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
    body: Option<Json<ExportRequest>>,
) -> Response {
    match build_export(&state, query, body.map(|Json(b)| b).unwrap_or_default()).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn build_export(
    state: &AppState,
    query: ExportQuery,
    request: ExportRequest,
) -> crate::Result<Response> {
    let mode = match query.mode.as_deref() {
        None => ExportMode::SingleFile,
        Some(raw) => ExportMode::parse(raw)
            .ok_or_else(|| Error::Validation(format!("unknown export mode '{}'", raw)))?,
    };

    let task_ids = request
        .task_ids
        .iter()
        .map(|raw| {
            parse_task_id(raw).map_err(|_| Error::Validation(format!("invalid task id '{}'", raw)))
        })
        .collect::<crate::Result<Vec<TaskId>>>()?;

    let path = state
        .pipeline
        .exports()
        .export(&task_ids, mode, query.delimiter.as_deref())
        .await?;

    let file = tokio::fs::File::open(&path).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", DOWNLOAD_FILE_NAME),
            ),
        ],
        body,
    )
        .into_response())
}
