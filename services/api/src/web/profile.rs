//! services/api/src/web/profile.rs
//!
//! The signed-in user's own profile.

use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Extension, Json,
};
use campus_portal_core::domain::AuthUser;
use campus_portal_core::profile::ProfileUpdate;
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::rest::read_upload;
use crate::web::state::AppState;

/// GET /profile - The caller's profile
#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "The profile"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.profiles.ensure_profile(&user, None, None).await?;
    Ok(Json(profile))
}

/// PUT /profile - Change name or semester
#[utoipa::path(
    put,
    path = "/profile",
    request_body(content = Object, description = "full_name and/or semester"),
    responses(
        (status = 200, description = "The updated profile"),
        (status = 400, description = "Nothing to update")
    )
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(update): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.profiles.update(user.id, update).await?;
    Ok(Json(profile))
}

/// POST /profile/avatar - Upload a new avatar image
#[utoipa::path(
    post,
    path = "/profile/avatar",
    request_body(content_type = "multipart/form-data", description = "A png, jpg, gif or webp image up to 2 MB."),
    responses(
        (status = 200, description = "The profile with its new avatar_url"),
        (status = 400, description = "Missing, empty, oversized or unsupported file")
    )
)]
pub async fn upload_avatar_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (file_name, bytes) = read_upload(multipart).await?;
    let profile = state
        .profiles
        .upload_avatar(user.id, &file_name, bytes)
        .await?;
    Ok(Json(profile))
}
