//! services/api/src/web/attendance.rs
//!
//! Subject scheduling, attendance marking and the per-semester summary.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use campus_portal_core::attendance::{MarkAttendance, NewSubject};
use campus_portal_core::domain::AuthUser;
use campus_portal_core::ports::PortError;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SemesterQuery {
    /// Only entries of this semester.
    pub semester: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SummaryQuery {
    /// Defaults to the profile's semester.
    pub semester: Option<String>,
    /// The caller's local date; defaults to today in UTC.
    pub date: Option<NaiveDate>,
}

/// A single mark. Administrators may mark on behalf of another student.
#[derive(Debug, Deserialize)]
pub struct MarkRequest {
    #[serde(default)]
    pub student_id: Option<Uuid>,
    #[serde(flatten)]
    pub mark: MarkAttendance,
}

#[derive(Debug, Deserialize)]
pub struct BulkMarkRequest {
    #[serde(default)]
    pub student_id: Option<Uuid>,
    pub marks: Vec<MarkAttendance>,
}

/// Resolves whose attendance is being written. Writing for someone else needs the admin role.
async fn target_student(state: &AppState, user: &AuthUser, requested: Option<Uuid>) -> Result<Uuid, ApiError> {
    match requested {
        Some(student_id) if student_id != user.id => {
            state.profiles.require_admin(user.id).await?;
            Ok(student_id)
        }
        _ => Ok(user.id),
    }
}

/// GET /attendance/subjects - The caller's active subjects
#[utoipa::path(
    get,
    path = "/attendance/subjects",
    params(SemesterQuery),
    responses(
        (status = 200, description = "Active subject schedules"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn list_subjects_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SemesterQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let subjects = state
        .attendance
        .list_subjects(user.id, query.semester.as_deref())
        .await?;
    Ok(Json(subjects))
}

/// POST /attendance/subjects - Add a subject to the caller's schedule
#[utoipa::path(
    post,
    path = "/attendance/subjects",
    request_body(content = Object, description = "subject, weekly_classes (1-20), class_type (theory|lab), semester, optional day_of_week"),
    responses(
        (status = 201, description = "Subject added"),
        (status = 400, description = "Weekly classes outside 1..=20 or blank subject"),
        (status = 422, description = "Subject already scheduled")
    )
)]
pub async fn add_subject_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<NewSubject>,
) -> Result<impl IntoResponse, ApiError> {
    let schedule = state.attendance.add_subject(user.id, req).await?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

/// DELETE /attendance/subjects/{id} - Deactivate a subject; its records are kept
#[utoipa::path(
    delete,
    path = "/attendance/subjects/{id}",
    params(("id" = Uuid, Path, description = "Schedule id")),
    responses(
        (status = 204, description = "Subject removed"),
        (status = 403, description = "Schedule belongs to someone else"),
        (status = 404, description = "No such schedule")
    )
)]
pub async fn remove_subject_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.attendance.remove_subject(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /attendance/mark - Mark one subject for one day
#[utoipa::path(
    post,
    path = "/attendance/mark",
    request_body(content = Object, description = "subject, date, status (present|absent|late), optional class_type, semester, notes and student_id"),
    responses(
        (status = 200, description = "The stored record"),
        (status = 422, description = "Subject is not in the active schedule")
    )
)]
pub async fn mark_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<MarkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let student_id = target_student(&state, &user, req.student_id).await?;
    let record = state
        .attendance
        .mark_attendance(student_id, user.id, req.mark)
        .await?;
    Ok(Json(record))
}

/// POST /attendance/mark/bulk - Mark several subjects at once
#[utoipa::path(
    post,
    path = "/attendance/mark/bulk",
    request_body(content = Object, description = "marks: a list of single marks, optional student_id"),
    responses(
        (status = 200, description = "All records were stored"),
        (status = 500, description = "Some of the writes failed; the rest were kept")
    )
)]
pub async fn bulk_mark_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<BulkMarkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.marks.is_empty() {
        return Err(PortError::Validation("marks must not be empty".to_string()).into());
    }
    let student_id = target_student(&state, &user, req.student_id).await?;
    let records = state
        .attendance
        .bulk_mark(student_id, user.id, req.marks)
        .await?;
    Ok(Json(records))
}

/// GET /attendance/summary - Per-subject, today and overall statistics
#[utoipa::path(
    get,
    path = "/attendance/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Attendance summary"),
        (status = 400, description = "No semester given and none on the profile")
    )
)]
pub async fn summary_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SummaryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let semester = match query.semester.filter(|s| !s.trim().is_empty()) {
        Some(semester) => semester,
        None => state
            .profiles
            .get(user.id)
            .await?
            .semester
            .ok_or_else(|| PortError::Validation("semester is required".to_string()))?,
    };
    let today = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let summary = state.attendance.summary(user.id, &semester, today).await?;
    Ok(Json(summary))
}
