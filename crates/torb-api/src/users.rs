// User registration and dashboard HTTP routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use torb_core::{DashboardView, Principal};
use torb_storage::hash_password;
use utoipa::ToSchema;

use crate::auth::LoginUser;
use crate::common::{parse_id, ApiError, ErrorResponse};
use crate::AppState;

/// Request to register a user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterUserRequest {
    #[schema(example = "Sonic")]
    pub nickname: String,
    #[schema(example = "sonic")]
    pub login_name: String,
    pub password: String,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/users", post(register_user))
        .route("/api/users/:id", get(get_user))
        .with_state(state)
}

/// POST /api/users - Register a user
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "User registered", body = Principal),
        (status = 409, description = "Login name already taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(req): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<Principal>), ApiError> {
    let pass_hash = hash_password(&req.password).map_err(ApiError::internal)?;
    let user = state
        .office
        .register_user(&req.login_name, &req.nickname, pass_hash)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users/:id - Dashboard of the logged-in user
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Recent activity and total spend", body = DashboardView),
        (status = 401, description = "Not logged in", body = ErrorResponse),
        (status = 403, description = "Another user's dashboard", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    LoginUser(viewer): LoginUser,
    Path(id): Path<String>,
) -> Result<Json<DashboardView>, ApiError> {
    let id = parse_id(&id)?;
    if id != viewer.id {
        return Err(ApiError::forbidden());
    }
    let view = state.office.resolve_user_dashboard(id).await?;
    Ok(Json(view.as_ref().clone()))
}
