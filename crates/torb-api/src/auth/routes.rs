// Login and logout for users and administrators

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use torb_core::{AccountKind, Principal};
use torb_storage::password_matches;
use utoipa::ToSchema;

use super::middleware::{LoginAdmin, LoginUser};
use super::session::cookie_name;
use crate::common::{ApiError, ErrorResponse};
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "sonic")]
    pub login_name: String,
    pub password: String,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/actions/login", post(login_user))
        .route("/api/actions/logout", post(logout_user))
        .route("/admin/api/actions/login", post(login_admin))
        .route("/admin/api/actions/logout", post(logout_admin))
        .with_state(state)
}

async fn login(
    state: &AppState,
    jar: CookieJar,
    kind: AccountKind,
    req: LoginRequest,
) -> Result<(CookieJar, Json<Principal>), ApiError> {
    let principal = state
        .office
        .authenticate(kind, &req.login_name, |hash| {
            password_matches(&req.password, hash)
        })
        .await?;

    let token = state
        .sessions
        .issue(kind, principal.id)
        .map_err(ApiError::internal)?;
    tracing::info!(principal_id = principal.id, ?kind, "Logged in");

    Ok((jar.add(state.sessions.cookie(kind, token)), Json(principal)))
}

fn logout(jar: CookieJar, kind: AccountKind) -> (CookieJar, StatusCode) {
    (
        jar.remove(Cookie::build(cookie_name(kind)).path("/")),
        StatusCode::NO_CONTENT,
    )
}

/// POST /api/actions/login - Start a user session
#[utoipa::path(
    post,
    path = "/api/actions/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, session cookie set", body = Principal),
        (status = 401, description = "Unknown login or wrong password", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<Principal>), ApiError> {
    login(&state, jar, AccountKind::User, req).await
}

/// POST /api/actions/logout - End the user session
#[utoipa::path(
    post,
    path = "/api/actions/logout",
    responses(
        (status = 204, description = "Logged out, session cookie cleared"),
        (status = 401, description = "Not logged in", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn logout_user(_user: LoginUser, jar: CookieJar) -> (CookieJar, StatusCode) {
    logout(jar, AccountKind::User)
}

/// POST /admin/api/actions/login - Start an administrator session
#[utoipa::path(
    post,
    path = "/admin/api/actions/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, session cookie set", body = Principal),
        (status = 401, description = "Unknown login or wrong password", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login_admin(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<Principal>), ApiError> {
    login(&state, jar, AccountKind::Administrator, req).await
}

/// POST /admin/api/actions/logout - End the administrator session
#[utoipa::path(
    post,
    path = "/admin/api/actions/logout",
    responses(
        (status = 204, description = "Logged out, session cookie cleared"),
        (status = 401, description = "Not logged in as administrator", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn logout_admin(_admin: LoginAdmin, jar: CookieJar) -> (CookieJar, StatusCode) {
    logout(jar, AccountKind::Administrator)
}
