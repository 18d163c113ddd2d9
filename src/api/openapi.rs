//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the astrocollector REST
//! API using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the astrocollector REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "astrocollector REST API",
        version = "0.1.0",
        description = "Submit catalogue queries as background tasks, poll their status, page through results and export them as zip archives",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8123", description = "Local development server")
    ),
    paths(
        // Task Submission
        crate::api::routes::submit_cone_search,
        crate::api::routes::submit_find_object,
        crate::api::routes::submit_photometric_data,

        // Task Inspection
        crate::api::routes::get_task,
        crate::api::routes::delete_task,
        crate::api::routes::get_task_status,
        crate::api::routes::list_identifiers,
        crate::api::routes::list_measurements,
        crate::api::routes::list_light_filters,

        // Export
        crate::api::routes::export_tasks,

        // Catalogue
        crate::api::routes::list_providers,
        crate::api::routes::resolve_name,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::types::TaskId,
        crate::types::ProviderId,
        crate::types::TaskStatus,
        crate::types::TaskKind,
        crate::types::TaskInfo,
        crate::types::SkyPosition,
        crate::types::ObjectIdentifier,
        crate::types::Measurement,
        crate::types::ExportMode,
        crate::types::ProviderDescriptor,

        crate::api::routes::ConeSearchRequest,
        crate::api::routes::FindObjectRequest,
        crate::api::routes::TaskCreatedResponse,
        crate::api::routes::TaskStatusResponse,
        crate::api::routes::IdentifierPage,
        crate::api::routes::MeasurementPage,
        crate::api::routes::ExportRequest,
        crate::api::routes::NameResolveRequest,

        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "tasks", description = "Tasks - Submit catalogue queries, poll status, page through results"),
        (name = "export", description = "Export - Bundle task results into cached zip archives"),
        (name = "catalogue", description = "Catalogue - Registered providers and object name resolution"),
        (name = "system", description = "System endpoints - Health check and OpenAPI spec"),
    )
)]
pub struct ApiDoc;
