//! Task submission and inspection handlers.

use super::{
    ConeSearchRequest, FindObjectRequest, IdentifierPage, MeasurementPage, PageQuery,
    TaskCreatedResponse, TaskStatusResponse,
};
use crate::api::AppState;
use crate::error::Error;
use crate::types::{Measurement, ObjectIdentifier, ProviderId, SkyPosition, TaskId};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Parse a task ID path segment
///
/// A malformed ID cannot name an existing task, so it is reported as not found.
pub(crate) fn parse_task_id(raw: &str) -> Result<TaskId, Error> {
    raw.parse()
        .map_err(|_| Error::NotFound(format!("task {}", raw)))
}

fn created(result: crate::Result<TaskId>) -> Response {
    match result {
        Ok(task_id) => (StatusCode::OK, Json(TaskCreatedResponse { task_id })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /tasks/:provider_id/cone-search - Search around a sky position
#[utoipa::path(
    post,
    path = "/tasks/{provider_id}/cone-search",
    tag = "tasks",
    params(("provider_id" = String, Path, description = "Provider ID")),
    request_body = ConeSearchRequest,
    responses(
        (status = 200, description = "Task created", body = TaskCreatedResponse),
        (status = 400, description = "Invalid position or radius", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn submit_cone_search(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
    Json(request): Json<ConeSearchRequest>,
) -> Response {
    let position = match SkyPosition::new(request.right_ascension_deg, request.declination_deg) {
        Ok(position) => position,
        Err(e) => return e.into_response(),
    };

    created(
        state
            .pipeline
            .submit_cone_search(ProviderId::from(provider_id), position, request.radius_arcsec)
            .await,
    )
}

/// POST /tasks/:provider_id/find-object - Resolve a name, then search around it
#[utoipa::path(
    post,
    path = "/tasks/{provider_id}/find-object",
    tag = "tasks",
    params(("provider_id" = String, Path, description = "Provider ID")),
    request_body = FindObjectRequest,
    responses(
        (status = 200, description = "Task created", body = TaskCreatedResponse),
        (status = 400, description = "Empty object name", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn submit_find_object(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
    Json(request): Json<FindObjectRequest>,
) -> Response {
    created(
        state
            .pipeline
            .submit_find_object(ProviderId::from(provider_id), &request.name)
            .await,
    )
}

/// POST /tasks/:provider_id/photometric-data - Fetch an identified object's time series
#[utoipa::path(
    post,
    path = "/tasks/{provider_id}/photometric-data",
    tag = "tasks",
    params(("provider_id" = String, Path, description = "Provider ID")),
    request_body = ObjectIdentifier,
    responses(
        (status = 200, description = "Task created", body = TaskCreatedResponse),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn submit_photometric_data(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
    Json(identifier): Json<ObjectIdentifier>,
) -> Response {
    created(
        state
            .pipeline
            .submit_photometric_data(ProviderId::from(provider_id), identifier)
            .await,
    )
}

/// GET /tasks/:task_id - Get a task record
#[utoipa::path(
    get,
    path = "/tasks/{task_id}",
    tag = "tasks",
    params(("task_id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task record", body = crate::types::TaskInfo),
        (status = 404, description = "Task not found", body = crate::error::ApiError)
    )
)]
pub async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let task_id = match parse_task_id(&id) {
        Ok(task_id) => task_id,
        Err(e) => return e.into_response(),
    };

    match state.pipeline.get_task(task_id).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /tasks/:task_id - Delete a task, its results and raw artifact
#[utoipa::path(
    delete,
    path = "/tasks/{task_id}",
    tag = "tasks",
    params(("task_id" = String, Path, description = "Task ID")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 404, description = "Task not found", body = crate::error::ApiError)
    )
)]
pub async fn delete_task(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let task_id = match parse_task_id(&id) {
        Ok(task_id) => task_id,
        Err(e) => return e.into_response(),
    };

    match state.pipeline.delete_task(task_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /tasks/:task_id/status - Poll a task's status
#[utoipa::path(
    get,
    path = "/tasks/{task_id}/status",
    tag = "tasks",
    params(("task_id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Current status", body = TaskStatusResponse),
        (status = 404, description = "Task not found or expired", body = crate::error::ApiError)
    )
)]
pub async fn get_task_status(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let task_id = match parse_task_id(&id) {
        Ok(task_id) => task_id,
        Err(e) => return e.into_response(),
    };

    match state.pipeline.get_status(task_id).await {
        Ok(status) => (StatusCode::OK, Json(TaskStatusResponse { task_id, status })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /tasks/:task_id/identifiers - Page through identifier results
#[utoipa::path(
    get,
    path = "/tasks/{task_id}/identifiers",
    tag = "tasks",
    params(
        ("task_id" = String, Path, description = "Task ID"),
        ("offset" = Option<i64>, Query, description = "Rows to skip"),
        ("count" = Option<i64>, Query, description = "Rows to return")
    ),
    responses(
        (status = 200, description = "Page of identifiers", body = IdentifierPage),
        (status = 404, description = "Task not found", body = crate::error::ApiError)
    )
)]
pub async fn list_identifiers(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Response {
    let task_id = match parse_task_id(&id) {
        Ok(task_id) => task_id,
        Err(e) => return e.into_response(),
    };

    match identifier_page(&state, task_id, &page).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn identifier_page(
    state: &AppState,
    task_id: TaskId,
    page: &PageQuery,
) -> crate::Result<IdentifierPage> {
    // 404 for unknown tasks rather than an empty page
    state.pipeline.get_status(task_id).await?;

    let (offset, count) = page.bounds();
    let db = &state.pipeline.db;
    let data = db.list_identifiers(task_id, offset, count).await?;
    let total_items = db.count_identifiers(task_id).await?;

    Ok(IdentifierPage {
        count: data.len(),
        data,
        total_items,
    })
}

/// GET /tasks/:task_id/measurements - Page through measurement results
#[utoipa::path(
    get,
    path = "/tasks/{task_id}/measurements",
    tag = "tasks",
    params(
        ("task_id" = String, Path, description = "Task ID"),
        ("offset" = Option<i64>, Query, description = "Rows to skip"),
        ("count" = Option<i64>, Query, description = "Rows to return")
    ),
    responses(
        (status = 200, description = "Page of measurements", body = MeasurementPage),
        (status = 404, description = "Task not found", body = crate::error::ApiError)
    )
)]
pub async fn list_measurements(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Response {
    let task_id = match parse_task_id(&id) {
        Ok(task_id) => task_id,
        Err(e) => return e.into_response(),
    };

    match measurement_page(&state, task_id, &page).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn measurement_page(
    state: &AppState,
    task_id: TaskId,
    page: &PageQuery,
) -> crate::Result<MeasurementPage> {
    state.pipeline.get_status(task_id).await?;

    let (offset, count) = page.bounds();
    let db = &state.pipeline.db;
    let data: Vec<Measurement> = db
        .list_measurements(task_id, offset, count)
        .await?
        .into_iter()
        .map(Measurement::from)
        .collect();
    let total_items = db.count_measurements(task_id).await?;

    Ok(MeasurementPage {
        count: data.len(),
        data,
        total_items,
    })
}

/// GET /tasks/:task_id/light-filters - Distinct light filters among a task's measurements
#[utoipa::path(
    get,
    path = "/tasks/{task_id}/light-filters",
    tag = "tasks",
    params(("task_id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Sorted filter names", body = Vec<String>),
        (status = 404, description = "Task not found", body = crate::error::ApiError)
    )
)]
pub async fn list_light_filters(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let task_id = match parse_task_id(&id) {
        Ok(task_id) => task_id,
        Err(e) => return e.into_response(),
    };

    match light_filters(&state, task_id).await {
        Ok(filters) => (StatusCode::OK, Json(filters)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn light_filters(state: &AppState, task_id: TaskId) -> crate::Result<Vec<String>> {
    state.pipeline.get_status(task_id).await?;
    state.pipeline.db.distinct_light_filters(task_id).await
}
