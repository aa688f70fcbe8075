//! services/api/src/web/resources.rs
//!
//! Browsing and managing the seven kinds of academic resources. Anyone signed in may
//! read; writes are checked against the caller's profile role by the core service.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use campus_portal_core::domain::{AuthUser, ResourceKind};
use campus_portal_core::ports::PortError;
use campus_portal_core::resources::{NewResource, ResourcePatch};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::attendance::SemesterQuery;
use crate::web::rest::read_upload;
use crate::web::state::AppState;

fn parse_kind(kind: &str) -> Result<ResourceKind, ApiError> {
    kind.parse::<ResourceKind>()
        .map_err(|e| PortError::NotFound(e).into())
}

/// GET /resources/{kind} - List one kind, optionally for one semester
#[utoipa::path(
    get,
    path = "/resources/{kind}",
    params(
        ("kind" = String, Path, description = "question_paper, note, syllabus, lab_manual, event, organizer or mar_support"),
        SemesterQuery
    ),
    responses(
        (status = 200, description = "Resources of that kind"),
        (status = 404, description = "Unknown kind")
    )
)]
pub async fn list_resources_handler(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(query): Query<SemesterQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_kind(&kind)?;
    let semester = query.semester.as_deref().filter(|s| !s.trim().is_empty());
    let resources = state.resources.list(kind, semester).await?;
    Ok(Json(resources))
}

/// POST /resources/{kind} - Publish a resource (admin only)
#[utoipa::path(
    post,
    path = "/resources/{kind}",
    params(("kind" = String, Path, description = "Resource kind")),
    request_body(content = Object, description = "title, semester, optional description, subject, event_date (required for events) and link"),
    responses(
        (status = 201, description = "Created"),
        (status = 400, description = "Missing title, semester or event date"),
        (status = 403, description = "Caller is not an administrator")
    )
)]
pub async fn create_resource_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(kind): Path<String>,
    Json(req): Json<NewResource>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_kind(&kind)?;
    let actor = state.profiles.get(user.id).await?;
    let resource = state.resources.create(&actor, kind, req).await?;
    Ok((StatusCode::CREATED, Json(resource)))
}

/// PUT /resources/{kind}/{id} - Edit a resource (admin only)
#[utoipa::path(
    put,
    path = "/resources/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "Resource kind"),
        ("id" = Uuid, Path, description = "Resource id")
    ),
    request_body(content = Object, description = "Any of title, description, semester, subject, event_date, link"),
    responses(
        (status = 200, description = "Updated"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "No such resource")
    )
)]
pub async fn update_resource_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(patch): Json<ResourcePatch>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_kind(&kind)?;
    let actor = state.profiles.get(user.id).await?;
    let resource = state.resources.update(&actor, kind, id, patch).await?;
    Ok(Json(resource))
}

/// DELETE /resources/{kind}/{id} - Remove a resource and its file (admin only)
#[utoipa::path(
    delete,
    path = "/resources/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "Resource kind"),
        ("id" = Uuid, Path, description = "Resource id")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "No such resource")
    )
)]
pub async fn delete_resource_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_kind(&kind)?;
    let actor = state.profiles.get(user.id).await?;
    state.resources.delete(&actor, kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /resources/{kind}/{id}/file - Attach a PDF, docx or image (admin only)
#[utoipa::path(
    post,
    path = "/resources/{kind}/{id}/file",
    params(
        ("kind" = String, Path, description = "Resource kind"),
        ("id" = Uuid, Path, description = "Resource id")
    ),
    request_body(content_type = "multipart/form-data", description = "The file to attach, up to 10 MB."),
    responses(
        (status = 200, description = "The resource with its new file_url"),
        (status = 400, description = "Missing, empty, oversized or unsupported file"),
        (status = 403, description = "Caller is not an administrator")
    )
)]
pub async fn upload_resource_file_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((kind, id)): Path<(String, Uuid)>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_kind(&kind)?;
    let actor = state.profiles.get(user.id).await?;
    let (file_name, bytes) = read_upload(multipart).await?;
    let resource = state
        .resources
        .attach_file(&actor, kind, id, &file_name, bytes)
        .await?;
    Ok(Json(resource))
}
