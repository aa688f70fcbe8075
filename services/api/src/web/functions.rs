//! services/api/src/web/functions.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use campus_portal_core::admin::authorize_function;
use campus_portal_core::domain::AuthUser;
use serde_json::Value;
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::state::AppState;

/// POST /functions/{name} - Invoke a named backend function with a JSON payload
#[utoipa::path(
    post,
    path = "/functions/{name}",
    params(("name" = String, Path, description = "pyq-analyzer or create-admin")),
    request_body(content = Object, description = "The function payload"),
    responses(
        (status = 200, description = "The function's JSON result"),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "create-admin called by a non-administrator"),
        (status = 404, description = "Unknown function"),
        (status = 422, description = "The function refused the input")
    )
)]
pub async fn invoke_function_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(name): Path<String>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    authorize_function(&state.profiles, user.id, &name).await?;
    let result = state.functions.invoke_function(&name, payload).await?;
    Ok(Json(result))
}
