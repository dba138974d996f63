//! Inbox handlers: a user's pending work and action history.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use greenlight_db::models::instance::{InboxItem, InboxMode};
use greenlight_db::repositories::StepInstanceRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InboxParams {
    pub mode: Option<InboxMode>,
}

/// GET /api/inbox?mode=pending|history
///
/// `pending` (the default) lists PENDING step instances assigned to the
/// caller; `history` lists step instances the caller has acted on.
pub async fn list_inbox(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<InboxParams>,
) -> AppResult<Json<DataResponse<Vec<InboxItem>>>> {
    let items = match params.mode.unwrap_or(InboxMode::Pending) {
        InboxMode::Pending => StepInstanceRepo::inbox_pending(&state.pool, auth.user_id).await?,
        InboxMode::History => StepInstanceRepo::inbox_history(&state.pool, auth.user_id).await?,
    };
    Ok(Json(DataResponse { data: items }))
}
