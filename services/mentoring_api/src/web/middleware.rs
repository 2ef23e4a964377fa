//! services/mentoring_api/src/web/middleware.rs
//!
//! Gate for the routes that only make sense once a profile exists.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use mentoring_core::ProfileContext;
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::state::AppState;

/// Middleware that loads the stored profile.
///
/// If one exists, the `ProfileContext` is inserted into request extensions for
/// handlers to use. Otherwise the request is refused with 409 Conflict.
pub async fn require_profile(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = ProfileContext::load(state.store.as_ref()).await?;
    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}
