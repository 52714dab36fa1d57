// Authentication extractors
// Decision: Principals are re-resolved from the store on every request; token contents alone are never trusted

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use axum_extra::extract::CookieJar;
use torb_core::{AccountKind, Principal};

use super::session::cookie_name;
use crate::common::ApiError;
use crate::AppState;

/// A logged-in user. Rejects with 401 `login_required`.
#[derive(Debug, Clone)]
pub struct LoginUser(pub Principal);

/// The user, if logged in
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Principal>);

impl MaybeUser {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|p| p.id)
    }
}

/// A logged-in administrator. Rejects with 401 `admin_login_required`.
#[derive(Debug, Clone)]
pub struct LoginAdmin(pub Principal);

async fn session_principal(
    parts: &Parts,
    state: &AppState,
    kind: AccountKind,
) -> Result<Option<Principal>, ApiError> {
    let jar = CookieJar::from_headers(&parts.headers);
    let Some(cookie) = jar.get(cookie_name(kind)) else {
        return Ok(None);
    };

    let id = match state.sessions.validate(kind, cookie.value()) {
        Ok(id) => id,
        Err(e) => {
            tracing::debug!(error = %e, ?kind, "Ignoring invalid session cookie");
            return Ok(None);
        }
    };

    Ok(state.office.principal(kind, id).await?)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for LoginUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        session_principal(parts, &state, AccountKind::User)
            .await?
            .map(LoginUser)
            .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "login_required"))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(MaybeUser(
            session_principal(parts, &state, AccountKind::User).await?,
        ))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for LoginAdmin
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        session_principal(parts, &state, AccountKind::Administrator)
            .await?
            .map(LoginAdmin)
            .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "admin_login_required"))
    }
}
