//! services/mentoring_api/src/web/rest.rs
//!
//! Contains the Axum handlers for the record endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::{ApiError, ErrorBody};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use mentoring_core::catalog::{email_template, FilledTemplate, TokenMap, CAREER_TRACKS, EMAIL_TEMPLATES};
use mentoring_core::tracker::{self, Progress};
use mentoring_core::{
    Goals, Milestone, MilestoneDraft, Profile, ProfileContext, ProfileDraft, RecordStore, Session,
    SessionDraft,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_profile_handler,
        put_profile_handler,
        get_goals_handler,
        put_goals_handler,
        list_sessions_handler,
        create_session_handler,
        update_session_handler,
        delete_session_handler,
        list_milestones_handler,
        create_milestone_handler,
        update_milestone_handler,
        delete_milestone_handler,
        progress_handler,
        get_privacy_notice_handler,
        put_privacy_notice_handler,
        list_templates_handler,
        get_template_handler,
        list_career_tracks_handler,
        crate::web::portability::export_handler,
        crate::web::portability::import_preview_handler,
        crate::web::portability::import_handler,
    ),
    components(
        schemas(ErrorBody, PrivacyNotice)
    ),
    tags(
        (name = "Mentoring Toolkit API", description = "Local record keeping for a mentoring program: profile, goals, session log, milestones and data portability.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Whether the privacy notice has been dismissed.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PrivacyNotice {
    pub dismissed: bool,
}

//=========================================================================================
// Profile
//=========================================================================================

/// Fetch the stored profile.
#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "The stored profile"),
        (status = 404, description = "No profile has been saved yet", body = ErrorBody)
    )
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Profile>, ApiError> {
    state
        .store
        .profile()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No profile has been saved yet".to_string()))
}

/// Create or update the profile. Name and role are required.
#[utoipa::path(
    put,
    path = "/profile",
    request_body(content_type = "application/json", description = "name, role, and optional email, targetRole, programStartDate and partnerName."),
    responses(
        (status = 200, description = "The saved profile"),
        (status = 400, description = "Name or role missing", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn put_profile_handler(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<ProfileDraft>,
) -> Result<Json<Profile>, ApiError> {
    let _guard = state.writes.lock().await;
    let profile = tracker::save_profile(state.store.as_ref(), draft).await?;
    Ok(Json(profile))
}

//=========================================================================================
// Goals
//=========================================================================================

/// Fetch the goals worksheet. An empty worksheet is returned if none is saved.
#[utoipa::path(
    get,
    path = "/goals",
    responses(
        (status = 200, description = "The goals worksheet"),
        (status = 409, description = "No profile yet", body = ErrorBody)
    )
)]
pub async fn get_goals_handler(
    State(state): State<Arc<AppState>>,
    Extension(_ctx): Extension<ProfileContext>,
) -> Json<Goals> {
    Json(state.store.goals().await.unwrap_or_default())
}

/// Replace the goals worksheet.
#[utoipa::path(
    put,
    path = "/goals",
    request_body(content_type = "application/json", description = "The whole goals worksheet."),
    responses(
        (status = 200, description = "The saved worksheet with lastUpdated set"),
        (status = 409, description = "No profile yet", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn put_goals_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<ProfileContext>,
    Json(goals): Json<Goals>,
) -> Result<Json<Goals>, ApiError> {
    let _guard = state.writes.lock().await;
    let saved = tracker::save_goals(state.store.as_ref(), &ctx, goals).await?;
    Ok(Json(saved))
}

//=========================================================================================
// Sessions
//=========================================================================================

/// List logged sessions in session-number order.
///
/// Listing can save ids for entries stored without one, so it takes the write lock.
#[utoipa::path(
    get,
    path = "/sessions",
    responses(
        (status = 200, description = "Logged sessions"),
        (status = 409, description = "No profile yet", body = ErrorBody)
    )
)]
pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<ProfileContext>,
) -> Result<Json<Vec<Session>>, ApiError> {
    let _guard = state.writes.lock().await;
    let sessions = tracker::list_sessions(state.store.as_ref(), &ctx).await?;
    Ok(Json(tracker::sessions_sorted(sessions)))
}

/// Log a new session.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body(content_type = "application/json", description = "date, topics, actionItems, notes and menteeRating (1-5), all optional."),
    responses(
        (status = 201, description = "The logged session with its number"),
        (status = 400, description = "Rating out of range", body = ErrorBody),
        (status = 409, description = "No profile yet, or the session log is full", body = ErrorBody)
    )
)]
pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<ProfileContext>,
    Json(draft): Json<SessionDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let _guard = state.writes.lock().await;
    let session =
        tracker::add_session(state.store.as_ref(), &ctx, state.config.limits, draft).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Edit a logged session. Its id and number do not change.
#[utoipa::path(
    put,
    path = "/sessions/{id}",
    params(("id" = String, Path, description = "Session id")),
    request_body(content_type = "application/json", description = "The editable session fields."),
    responses(
        (status = 200, description = "The updated session"),
        (status = 404, description = "Unknown session", body = ErrorBody)
    )
)]
pub async fn update_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<ProfileContext>,
    Path(id): Path<String>,
    Json(draft): Json<SessionDraft>,
) -> Result<Json<Session>, ApiError> {
    let _guard = state.writes.lock().await;
    let session = tracker::update_session(state.store.as_ref(), &ctx, &id, draft).await?;
    Ok(Json(session))
}

#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 204, description = "Session deleted"),
        (status = 404, description = "Unknown session", body = ErrorBody)
    )
)]
pub async fn delete_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<ProfileContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let _guard = state.writes.lock().await;
    tracker::delete_session(state.store.as_ref(), &ctx, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// How many sessions are logged against the program's cap.
#[utoipa::path(
    get,
    path = "/progress",
    responses(
        (status = 200, description = "logged, max, remaining and complete"),
        (status = 409, description = "No profile yet", body = ErrorBody)
    )
)]
pub async fn progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<ProfileContext>,
) -> Json<Progress> {
    Json(tracker::progress(state.store.as_ref(), &ctx, state.config.limits).await)
}

//=========================================================================================
// Milestones
//=========================================================================================

#[utoipa::path(
    get,
    path = "/milestones",
    responses(
        (status = 200, description = "Recorded milestones"),
        (status = 409, description = "No profile yet", body = ErrorBody)
    )
)]
pub async fn list_milestones_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<ProfileContext>,
) -> Result<Json<Vec<Milestone>>, ApiError> {
    let _guard = state.writes.lock().await;
    let milestones = tracker::list_milestones(state.store.as_ref(), &ctx).await?;
    Ok(Json(milestones))
}

/// Record a milestone. An achievement is required.
#[utoipa::path(
    post,
    path = "/milestones",
    request_body(content_type = "application/json", description = "achievement, with optional date and nextStep."),
    responses(
        (status = 201, description = "The recorded milestone"),
        (status = 400, description = "Achievement missing", body = ErrorBody),
        (status = 409, description = "No profile yet, or the milestone list is full", body = ErrorBody)
    )
)]
pub async fn create_milestone_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<ProfileContext>,
    Json(draft): Json<MilestoneDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let _guard = state.writes.lock().await;
    let milestone =
        tracker::add_milestone(state.store.as_ref(), &ctx, state.config.limits, draft).await?;
    Ok((StatusCode::CREATED, Json(milestone)))
}

#[utoipa::path(
    put,
    path = "/milestones/{id}",
    params(("id" = String, Path, description = "Milestone id")),
    request_body(content_type = "application/json", description = "The editable milestone fields."),
    responses(
        (status = 200, description = "The updated milestone"),
        (status = 400, description = "Achievement missing", body = ErrorBody),
        (status = 404, description = "Unknown milestone", body = ErrorBody)
    )
)]
pub async fn update_milestone_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<ProfileContext>,
    Path(id): Path<String>,
    Json(draft): Json<MilestoneDraft>,
) -> Result<Json<Milestone>, ApiError> {
    let _guard = state.writes.lock().await;
    let milestone = tracker::update_milestone(state.store.as_ref(), &ctx, &id, draft).await?;
    Ok(Json(milestone))
}

#[utoipa::path(
    delete,
    path = "/milestones/{id}",
    params(("id" = String, Path, description = "Milestone id")),
    responses(
        (status = 204, description = "Milestone deleted"),
        (status = 404, description = "Unknown milestone", body = ErrorBody)
    )
)]
pub async fn delete_milestone_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<ProfileContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let _guard = state.writes.lock().await;
    tracker::delete_milestone(state.store.as_ref(), &ctx, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Privacy Notice
//=========================================================================================

#[utoipa::path(
    get,
    path = "/privacy-notice",
    responses((status = 200, description = "Whether the notice was dismissed", body = PrivacyNotice))
)]
pub async fn get_privacy_notice_handler(State(state): State<Arc<AppState>>) -> Json<PrivacyNotice> {
    Json(PrivacyNotice {
        dismissed: state.store.privacy_dismissed().await,
    })
}

#[utoipa::path(
    put,
    path = "/privacy-notice",
    request_body = PrivacyNotice,
    responses(
        (status = 200, description = "The stored flag", body = PrivacyNotice),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn put_privacy_notice_handler(
    State(state): State<Arc<AppState>>,
    Json(notice): Json<PrivacyNotice>,
) -> Result<Json<PrivacyNotice>, ApiError> {
    let _guard = state.writes.lock().await;
    state.store.set_privacy_dismissed(notice.dismissed).await?;
    Ok(Json(notice))
}

//=========================================================================================
// Templates and Career Tracks
//=========================================================================================

async fn token_map(state: &AppState) -> TokenMap {
    let profile = state.store.profile().await;
    TokenMap::from_profile(profile.as_ref(), &state.config.program_name)
}

/// Every email template, filled from the stored profile where possible.
#[utoipa::path(
    get,
    path = "/templates",
    responses((status = 200, description = "Filled templates with their remaining tokens"))
)]
pub async fn list_templates_handler(State(state): State<Arc<AppState>>) -> Json<Vec<FilledTemplate>> {
    let tokens = token_map(&state).await;
    Json(EMAIL_TEMPLATES.iter().map(|t| t.fill(&tokens)).collect())
}

#[utoipa::path(
    get,
    path = "/templates/{id}",
    params(("id" = String, Path, description = "Template id, e.g. welcome")),
    responses(
        (status = 200, description = "The filled template"),
        (status = 404, description = "Unknown template", body = ErrorBody)
    )
)]
pub async fn get_template_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FilledTemplate>, ApiError> {
    let template =
        email_template(&id).ok_or_else(|| ApiError::NotFound(format!("No template with id {}", id)))?;
    let tokens = token_map(&state).await;
    Ok(Json(template.fill(&tokens)))
}

#[utoipa::path(
    get,
    path = "/career-tracks",
    responses((status = 200, description = "Target roles a profile can pick from"))
)]
pub async fn list_career_tracks_handler() -> impl IntoResponse {
    Json(CAREER_TRACKS)
}
