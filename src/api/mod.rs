//! REST API server module
//!
//! Thin HTTP surface over [`TaskPipeline`]: submit tasks, poll their status,
//! page through results and download export archives. Carries no
//! authentication; put it behind a proxy if it must be exposed.

use crate::{Config, Result, TaskPipeline};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// Path segments after `/tasks/` share one parameter name: it is a provider
/// ID on the submission routes and a task ID everywhere else.
///
/// # Routes
///
/// ## Task Submission
/// - `POST /tasks/:provider_id/cone-search` - Search around a sky position
/// - `POST /tasks/:provider_id/find-object` - Resolve a name, then search
/// - `POST /tasks/:provider_id/photometric-data` - Fetch an object's time series
///
/// ## Task Inspection
/// - `GET /tasks/:task_id` - Task record
/// - `DELETE /tasks/:task_id` - Delete a task and its results
/// - `GET /tasks/:task_id/status` - Task status
/// - `GET /tasks/:task_id/identifiers` - Paged identifier results
/// - `GET /tasks/:task_id/measurements` - Paged measurement results
/// - `GET /tasks/:task_id/light-filters` - Distinct light filters of a task
///
/// ## Export
/// - `POST /export` - Zip archive of a set of tasks' results
///
/// ## Catalogue
/// - `GET /providers` - Registered providers
/// - `POST /name-resolve` - Resolve an object name to a position
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(pipeline: Arc<TaskPipeline>, config: Arc<Config>) -> Router {
    let state = AppState::new(pipeline, config.clone());

    let router = Router::new()
        // Task Submission
        .route("/tasks/:id/cone-search", post(routes::submit_cone_search))
        .route("/tasks/:id/find-object", post(routes::submit_find_object))
        .route(
            "/tasks/:id/photometric-data",
            post(routes::submit_photometric_data),
        )
        // Task Inspection
        .route(
            "/tasks/:id",
            get(routes::get_task).delete(routes::delete_task),
        )
        .route("/tasks/:id/status", get(routes::get_task_status))
        .route("/tasks/:id/identifiers", get(routes::list_identifiers))
        .route("/tasks/:id/measurements", get(routes::list_measurements))
        .route("/tasks/:id/light-filters", get(routes::list_light_filters))
        // Export
        .route("/export", post(routes::export_tasks))
        // Catalogue
        .route("/providers", get(routes::list_providers))
        .route("/name-resolve", post(routes::resolve_name))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec));

    // Merge Swagger UI routes if enabled in config (before applying state)
    let router = if config.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config
    if config.api.cors_enabled {
        let cors = build_cors_layer(&config.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin; otherwise only the listed
/// origins are allowed. All methods and headers are allowed.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server stops. The pipeline's background services must be
/// started separately (see [`TaskPipeline::start_services`]).
///
/// # Example
///
/// ```no_run
/// use astrocollector::provider::ProviderRegistry;
/// use astrocollector::{Config, TaskPipeline};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let pipeline = Arc::new(TaskPipeline::new((*config).clone(), ProviderRegistry::new()).await?);
/// pipeline.start_services();
///
/// // Start API server (blocks until shutdown)
/// astrocollector::api::start_api_server(pipeline, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(pipeline: Arc<TaskPipeline>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(
        address = %bind_address,
        "Starting API server"
    );

    let app = create_router(pipeline, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %bind_address,
        "API server listening"
    );

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
