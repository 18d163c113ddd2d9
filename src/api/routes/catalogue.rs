//! Provider listing and object name resolution handlers.

use super::NameResolveRequest;
use crate::api::AppState;
use crate::error::{Error, ProviderError};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// GET /providers - List registered providers
#[utoipa::path(
    get,
    path = "/providers",
    tag = "catalogue",
    responses(
        (status = 200, description = "Registered providers", body = Vec<crate::types::ProviderDescriptor>)
    )
)]
pub async fn list_providers(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.pipeline.providers().descriptors()))
}

/// POST /name-resolve - Resolve an object name to a sky position
#[utoipa::path(
    post,
    path = "/name-resolve",
    tag = "catalogue",
    request_body = NameResolveRequest,
    responses(
        (status = 200, description = "Resolved position", body = crate::types::SkyPosition),
        (status = 404, description = "Name not known to the resolver", body = crate::error::ApiError),
        (status = 502, description = "Resolver unavailable", body = crate::error::ApiError)
    )
)]
pub async fn resolve_name(
    State(state): State<AppState>,
    Json(request): Json<NameResolveRequest>,
) -> Response {
    match state.pipeline.resolver().resolve(&request.name).await {
        Ok(position) => (StatusCode::OK, Json(position)).into_response(),
        Err(ProviderError::NameResolution { name, reason }) => {
            tracing::debug!(object = %name, reason = %reason, "name not resolved");
            Error::NotFound(format!("object '{}': {}", name, reason)).into_response()
        }
        Err(e) => Error::Provider(e).into_response(),
    }
}
