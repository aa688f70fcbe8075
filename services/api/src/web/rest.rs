//! services/api/src/web/rest.rs
//!
//! Contains the master definition for the OpenAPI specification and the multipart
//! helper shared by the upload endpoints.

use axum::extract::Multipart;
use bytes::Bytes;
use utoipa::OpenApi;

use crate::error::ApiError;
use crate::web::{attendance, auth, functions, profile, resources, timetable};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        attendance::list_subjects_handler,
        attendance::add_subject_handler,
        attendance::remove_subject_handler,
        attendance::mark_handler,
        attendance::bulk_mark_handler,
        attendance::summary_handler,
        timetable::generate_timetable_handler,
        resources::list_resources_handler,
        resources::create_resource_handler,
        resources::update_resource_handler,
        resources::delete_resource_handler,
        resources::upload_resource_file_handler,
        profile::get_profile_handler,
        profile::update_profile_handler,
        profile::upload_avatar_handler,
        functions::invoke_function_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            timetable::TimetableEntry,
            timetable::TimetableRequest,
        )
    ),
    tags(
        (name = "Campus Portal API", description = "Attendance, timetables, academic resources and profiles for students and administrators.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Multipart Uploads
//=========================================================================================

/// Reads the first file part of a multipart body as `(file_name, bytes)`.
pub async fn read_upload(mut multipart: Multipart) -> Result<(String, Bytes), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart data: {}", e)))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file bytes: {}", e)))?;
        return Ok((file_name, data));
    }
    Err(ApiError::BadRequest(
        "Multipart form must include a file".to_string(),
    ))
}
