// Peer invalidation endpoints
//
// The other node calls these after a local mutation. They drop the local
// cache entries without notifying back, so the pair never ping-pongs.
// Both GET and POST are accepted.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Router,
};

use crate::common::{parse_id, ApiError};
use crate::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/cacheInvalidate/user/:user_id",
            get(invalidate_user).post(invalidate_user),
        )
        .route(
            "/cacheInvalidate/index",
            get(invalidate_index).post(invalidate_index),
        )
        .with_state(state)
}

/// Drop a user's cached dashboard (and the index)
#[utoipa::path(
    post,
    path = "/cacheInvalidate/user/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "Invalidated")
    ),
    tag = "peer"
)]
pub async fn invalidate_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user_id = parse_id(&user_id)?;
    tracing::debug!(user_id, "Peer invalidated user cache");
    state.office.invalidate_user(user_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Drop the cached event index
#[utoipa::path(
    post,
    path = "/cacheInvalidate/index",
    responses(
        (status = 204, description = "Invalidated")
    ),
    tag = "peer"
)]
pub async fn invalidate_index(State(state): State<AppState>) -> StatusCode {
    tracing::debug!("Peer invalidated index cache");
    state.office.invalidate_index();
    StatusCode::NO_CONTENT
}
