use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use murmur_core::AppState;
use murmur_models::poll::Poll;
use murmur_models::scopes::Scopes;

use crate::error::ApiError;
use crate::middleware::AccessToken;

/// `GET /api/v1/polls/{id}`
///
/// Anonymous requests are allowed; a token, when sent, must grant
/// `read:statuses`. Polls on statuses the requester cannot see are reported
/// as missing.
pub async fn get_poll(
    State(state): State<AppState>,
    token: Option<AccessToken>,
    Path(poll_id): Path<String>,
) -> Result<Json<Poll>, ApiError> {
    if let Some(token) = &token {
        token.require_scope(Scopes::READ_STATUSES)?;
    }
    let poll_id: i64 = poll_id.parse().map_err(|_| ApiError::NotFound)?;
    let viewer = token.as_ref().and_then(|t| t.account.as_ref());

    let visible = murmur_core::polls::find_visible_poll(&state.db, poll_id, viewer).await?;

    let now = Utc::now();
    let poll = match viewer {
        Some(requester) => {
            murmur_core::polls::refresh_if_stale(&state, &visible, requester, now).await?
        }
        None => visible.poll,
    };

    let view = murmur_core::polls::render_poll(&state.db, &poll, viewer, now).await?;
    Ok(Json(view))
}
