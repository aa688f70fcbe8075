pub mod attendance;
pub mod auth;
pub mod functions;
pub mod middleware;
pub mod profile;
pub mod resources;
pub mod rest;
pub mod state;
pub mod timetable;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

pub use middleware::require_auth;
use state::AppState;

/// All API routes. Everything but the auth endpoints requires a signed-in user.
pub fn router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    let protected_routes = Router::new()
        .route(
            "/attendance/subjects",
            get(attendance::list_subjects_handler).post(attendance::add_subject_handler),
        )
        .route("/attendance/subjects/{id}", delete(attendance::remove_subject_handler))
        .route("/attendance/mark", post(attendance::mark_handler))
        .route("/attendance/mark/bulk", post(attendance::bulk_mark_handler))
        .route("/attendance/summary", get(attendance::summary_handler))
        .route("/timetable/generate", post(timetable::generate_timetable_handler))
        .route(
            "/resources/{kind}",
            get(resources::list_resources_handler).post(resources::create_resource_handler),
        )
        .route(
            "/resources/{kind}/{id}",
            put(resources::update_resource_handler)
                .delete(resources::delete_resource_handler),
        )
        .route("/resources/{kind}/{id}/file", post(resources::upload_resource_file_handler))
        .route(
            "/profile",
            get(profile::get_profile_handler).put(profile::update_profile_handler),
        )
        .route("/profile/avatar", post(profile::upload_avatar_handler))
        .route("/functions/{name}", post(functions::invoke_function_handler))
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
