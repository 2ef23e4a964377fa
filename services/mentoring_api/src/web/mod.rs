pub mod middleware;
pub mod portability;
pub mod rest;
pub mod state;

pub use middleware::require_profile;
pub use state::AppState;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

/// Builds the API router. Goals, sessions, milestones and progress sit behind the
/// profile gate; everything else is public.
pub fn router(app_state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/profile", get(rest::get_profile_handler).put(rest::put_profile_handler))
        .route(
            "/privacy-notice",
            get(rest::get_privacy_notice_handler).put(rest::put_privacy_notice_handler),
        )
        .route("/templates", get(rest::list_templates_handler))
        .route("/templates/{id}", get(rest::get_template_handler))
        .route("/career-tracks", get(rest::list_career_tracks_handler))
        .route("/export", get(portability::export_handler))
        .route("/import/preview", post(portability::import_preview_handler))
        .route("/import", post(portability::import_handler));

    let gated_routes = Router::new()
        .route("/goals", get(rest::get_goals_handler).put(rest::put_goals_handler))
        .route(
            "/sessions",
            get(rest::list_sessions_handler).post(rest::create_session_handler),
        )
        .route(
            "/sessions/{id}",
            put(rest::update_session_handler).delete(rest::delete_session_handler),
        )
        .route(
            "/milestones",
            get(rest::list_milestones_handler).post(rest::create_milestone_handler),
        )
        .route(
            "/milestones/{id}",
            put(rest::update_milestone_handler).delete(rest::delete_milestone_handler),
        )
        .route("/progress", get(rest::progress_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_profile,
        ));

    Router::new()
        .merge(public_routes)
        .merge(gated_routes)
        .with_state(app_state)
}
