//! REST handlers.
//!
//! Every handler except the health and status registry endpoints needs the acting user's
//! `x-user-id` and `x-user-role` headers; without them the request is rejected with `401`.

use crate::error::ApiError;
use crate::AppState;
use api_shared::{
    actor_from_headers, CreateInstanceReq, ErrorRes, FormStatusRes, HealthRes, HealthService,
    InstanceRes, InstanceViewRes, ListInstancesRes, OrganisationRes, PatchCommand,
    PatchInstanceReq, PatchInstanceRes, SubmitReq, TemplateRes, USER_ID_HEADER,
    USER_ROLE_HEADER,
};
use axum::{
    extract::{FromRequestParts, Path as AxumPath, State},
    http::{request::Parts, StatusCode},
    response::Json,
};
use grants_core::{Actor, FormStatus, GrantsError, PatchOutcome, RecordId};

/// The acting user, resolved from request headers.
pub(crate) struct RequestActor(pub Actor);

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = actor_from_headers(
            header_value(parts, USER_ID_HEADER),
            header_value(parts, USER_ROLE_HEADER),
        )?;
        Ok(Self(actor))
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

fn parse_id(raw: &str) -> Result<RecordId, ApiError> {
    RecordId::parse(raw).map_err(|e| ApiError::from(GrantsError::from(e)))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
#[axum::debug_handler]
pub(crate) async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/form-statuses",
    responses(
        (status = 200, description = "Every form status with its icon", body = Vec<FormStatusRes>)
    )
)]
#[axum::debug_handler]
pub(crate) async fn form_statuses(State(_state): State<AppState>) -> Json<Vec<FormStatusRes>> {
    Json(FormStatus::all().iter().copied().map(FormStatusRes::from).collect())
}

#[utoipa::path(
    get,
    path = "/templates/{id}",
    params(
        ("id" = String, Path, description = "Form template id"),
        ("x-user-id" = String, Header, description = "Acting user id"),
        ("x-user-role" = String, Header, description = "Acting user role")
    ),
    responses(
        (status = 200, description = "Form template", body = TemplateRes),
        (status = 401, description = "Missing user headers", body = ErrorRes),
        (status = 404, description = "Unknown template", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn get_template(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<TemplateRes>, ApiError> {
    let id = parse_id(&id)?;
    tracing::debug!(template_id = %id, user = %actor.user_id, "get template");
    Ok(Json(TemplateRes(state.service.template(&id)?)))
}

#[utoipa::path(
    get,
    path = "/organisations/{id}",
    params(
        ("id" = String, Path, description = "Organisation id"),
        ("x-user-id" = String, Header, description = "Acting user id"),
        ("x-user-role" = String, Header, description = "Acting user role")
    ),
    responses(
        (status = 200, description = "Organisation", body = OrganisationRes),
        (status = 401, description = "Missing user headers", body = ErrorRes),
        (status = 404, description = "Unknown organisation", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn get_organisation(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<OrganisationRes>, ApiError> {
    let id = parse_id(&id)?;
    tracing::debug!(organisation_id = %id, user = %actor.user_id, "get organisation");
    Ok(Json(OrganisationRes(state.service.organisation(&id)?)))
}

#[utoipa::path(
    get,
    path = "/organisations/{id}/instances",
    params(
        ("id" = String, Path, description = "Organisation id"),
        ("x-user-id" = String, Header, description = "Acting user id"),
        ("x-user-role" = String, Header, description = "Acting user role")
    ),
    responses(
        (status = 200, description = "The organisation's form instances", body = ListInstancesRes),
        (status = 401, description = "Missing user headers", body = ErrorRes),
        (status = 404, description = "Unknown organisation", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn list_organisation_instances(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<ListInstancesRes>, ApiError> {
    let id = parse_id(&id)?;
    state.service.organisation(&id)?;
    let instances = state.service.list_for_organisation(&actor, &id)?;
    Ok(Json(ListInstancesRes { instances }))
}

#[utoipa::path(
    post,
    path = "/instances",
    request_body = CreateInstanceReq,
    params(
        ("x-user-id" = String, Header, description = "Acting user id"),
        ("x-user-role" = String, Header, description = "Acting user role")
    ),
    responses(
        (status = 201, description = "Form instance created", body = InstanceRes),
        (status = 401, description = "Missing user headers", body = ErrorRes),
        (status = 404, description = "Unknown template or organisation", body = ErrorRes),
        (status = 422, description = "Inactive template or invalid input", body = ErrorRes)
    )
)]
/// Starts a `Draft` instance of a template for an organisation.
#[axum::debug_handler]
pub(crate) async fn create_instance(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(req): Json<CreateInstanceReq>,
) -> Result<(StatusCode, Json<InstanceRes>), ApiError> {
    let request = req.into_new_instance()?;
    let instance = state.service.create_instance(&actor, request)?;
    Ok((StatusCode::CREATED, Json(InstanceRes(instance))))
}

#[utoipa::path(
    get,
    path = "/instances/{id}",
    params(
        ("id" = String, Path, description = "Form instance id"),
        ("x-user-id" = String, Header, description = "Acting user id"),
        ("x-user-role" = String, Header, description = "Acting user role")
    ),
    responses(
        (status = 200, description = "Materialised form instance with progress", body = InstanceViewRes),
        (status = 401, description = "Missing user headers", body = ErrorRes),
        (status = 404, description = "Unknown instance", body = ErrorRes)
    )
)]
/// Reads an instance with prefilled answers seeded (not persisted) and section progress.
#[axum::debug_handler]
pub(crate) async fn get_instance(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<InstanceViewRes>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(InstanceViewRes(state.service.read(&actor, &id)?)))
}

#[utoipa::path(
    patch,
    path = "/instances/{id}",
    request_body = PatchInstanceReq,
    params(
        ("id" = String, Path, description = "Form instance id"),
        ("x-user-id" = String, Header, description = "Acting user id"),
        ("x-user-role" = String, Header, description = "Acting user role")
    ),
    responses(
        (status = 200, description = "Updated instance", body = PatchInstanceRes),
        (status = 401, description = "Missing user headers", body = ErrorRes),
        (status = 403, description = "Section or attribute not editable by this role", body = ErrorRes),
        (status = 404, description = "Unknown instance or status", body = ErrorRes),
        (status = 409, description = "Instance updated but its linked instance was not", body = ErrorRes),
        (status = 422, description = "Invalid change", body = ErrorRes)
    )
)]
/// Stores one answer, changes sidebar attributes and status, or both at once.
#[axum::debug_handler]
pub(crate) async fn patch_instance(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<PatchInstanceReq>,
) -> Result<Json<PatchInstanceRes>, ApiError> {
    let id = parse_id(&id)?;
    let outcome = match req.into_command()? {
        PatchCommand::Field { key, value } => PatchOutcome {
            instance: state.service.patch_field(&actor, &id, &key, value).await?,
            created_linked_instance: None,
        },
        PatchCommand::Attributes(patch) => state.service.patch_instance(&actor, &id, patch).await?,
        PatchCommand::FieldAndAttributes {
            key,
            value,
            attributes,
        } => {
            state
                .service
                .patch_answer_and_attributes(&actor, &id, &key, value, attributes)
                .await?
        }
    };
    Ok(Json(PatchInstanceRes(outcome)))
}

#[utoipa::path(
    put,
    path = "/instances/{id}/submit",
    request_body = SubmitReq,
    params(
        ("id" = String, Path, description = "Form instance id"),
        ("x-user-id" = String, Header, description = "Acting user id"),
        ("x-user-role" = String, Header, description = "Acting user role")
    ),
    responses(
        (status = 200, description = "Submitted instance", body = InstanceRes),
        (status = 401, description = "Missing user headers", body = ErrorRes),
        (status = 404, description = "Unknown instance", body = ErrorRes),
        (status = 422, description = "Form incomplete", body = ErrorRes)
    )
)]
/// Submits an instance once every section is complete.
#[axum::debug_handler]
pub(crate) async fn submit_instance(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<SubmitReq>,
) -> Result<Json<InstanceRes>, ApiError> {
    let id = parse_id(&id)?;
    if !req.submitted {
        return Err(GrantsError::Validation("submitted must be true".into()).into());
    }
    let instance = state.service.submit(&actor, &id).await?;
    Ok(Json(InstanceRes(instance)))
}
