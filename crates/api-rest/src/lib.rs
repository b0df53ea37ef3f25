//! # API REST
//!
//! REST API implementation for the grants form engine.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status codes)
//!
//! Uses `api-shared` for request/response types and actor resolution, and
//! `grants-core` for everything else.

#![warn(rust_2018_idioms)]

mod error;
mod handlers;

pub use error::ApiError;

use api_shared::{
    CreateInstanceReq, ErrorRes, FormStatusRes, HealthRes, InstanceRes, InstanceViewRes,
    ListInstancesRes, OrganisationRes, PatchInstanceReq, PatchInstanceRes, SubmitReq,
    TemplateRes,
};
use axum::{
    routing::{get, post, put},
    Router,
};
use grants_core::service::FormInstanceService;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: FormInstanceService,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::form_statuses,
        handlers::get_template,
        handlers::get_organisation,
        handlers::list_organisation_instances,
        handlers::create_instance,
        handlers::get_instance,
        handlers::patch_instance,
        handlers::submit_instance,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        FormStatusRes,
        TemplateRes,
        OrganisationRes,
        CreateInstanceReq,
        InstanceRes,
        InstanceViewRes,
        ListInstancesRes,
        PatchInstanceReq,
        PatchInstanceRes,
        SubmitReq,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router, including Swagger UI at `/swagger-ui` and the OpenAPI document at
/// `/api-docs/openapi.json`.
pub fn router(service: FormInstanceService) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/form-statuses", get(handlers::form_statuses))
        .route("/templates/:id", get(handlers::get_template))
        .route("/organisations/:id", get(handlers::get_organisation))
        .route(
            "/organisations/:id/instances",
            get(handlers::list_organisation_instances),
        )
        .route("/instances", post(handlers::create_instance))
        .route(
            "/instances/:id",
            get(handlers::get_instance).patch(handlers::patch_instance),
        )
        .route("/instances/:id/submit", put(handlers::submit_instance))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(AppState { service })
}
