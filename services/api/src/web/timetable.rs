//! services/api/src/web/timetable.rs

use axum::{response::IntoResponse, Json};
use campus_portal_core::domain::{Difficulty, GeneratedTimetableDay, TimetableSubject};
use campus_portal_core::timetable::TimetableDraft;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;

#[derive(Debug, Deserialize, ToSchema)]
pub struct TimetableEntry {
    pub name: String,
    #[schema(value_type = String, example = "hard")]
    pub difficulty: Difficulty,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TimetableRequest {
    pub subjects: Vec<TimetableEntry>,
    /// Number of study days starting Monday, 1 to 7.
    #[serde(default = "default_study_days")]
    pub study_days: usize,
}

fn default_study_days() -> usize {
    TimetableDraft::default().study_days()
}

#[derive(Debug, Serialize)]
pub struct TimetableResponse {
    pub study_days: usize,
    pub subjects: Vec<TimetableSubject>,
    pub days: Vec<GeneratedTimetableDay>,
}

/// Builds a draft from the request, so the same validation applies as for an
/// interactively edited one.
pub fn draft_from(req: TimetableRequest) -> Result<TimetableDraft, ApiError> {
    let mut draft = TimetableDraft::default();
    draft.set_study_days(req.study_days)?;
    for entry in req.subjects {
        draft.add_subject(&entry.name, entry.difficulty)?;
    }
    Ok(draft)
}

/// POST /timetable/generate - Spread subjects over the study week by difficulty
#[utoipa::path(
    post,
    path = "/timetable/generate",
    request_body = TimetableRequest,
    responses(
        (status = 200, description = "The generated week"),
        (status = 400, description = "No subjects, duplicate names or study days outside 1..=7")
    )
)]
pub async fn generate_timetable_handler(
    Json(req): Json<TimetableRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let draft = draft_from(req)?;
    let days = draft.generate()?;
    Ok(Json(TimetableResponse {
        study_days: draft.study_days(),
        subjects: draft.subjects().to_vec(),
        days,
    }))
}
