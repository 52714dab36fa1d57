// Common DTOs and error mapping for the HTTP surface
//
// Every failure is rendered as `{"error": "<code>"}` where the code is the
// stable wire code from TorbError::code().

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use torb_core::TorbError;
use utoipa::ToSchema;

/// Standard error response for API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code, e.g. `sold_out`.
    #[schema(example = "sold_out")]
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// An error ready to leave a handler
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found")
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden")
    }

    /// Internal failure, logged here and rendered as `unknown`
    pub fn internal(err: impl std::fmt::Display) -> Self {
        tracing::error!(error = %err, "Request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "unknown")
    }

    /// Mapping for the cancel route, where an unknown rank names a missing resource
    pub fn from_cancel(err: TorbError) -> Self {
        match err {
            TorbError::InvalidRank => Self::new(StatusCode::NOT_FOUND, err.code()),
            other => other.into(),
        }
    }
}

impl From<TorbError> for ApiError {
    fn from(err: TorbError) -> Self {
        if err.is_internal() {
            return Self::internal(err);
        }
        let status = match &err {
            TorbError::NotFound | TorbError::InvalidEvent | TorbError::InvalidSheet => {
                StatusCode::NOT_FOUND
            }
            TorbError::InvalidRank
            | TorbError::NotReserved
            | TorbError::CannotEditClosedEvent
            | TorbError::CannotClosePublicEvent => StatusCode::BAD_REQUEST,
            TorbError::SoldOut | TorbError::Duplicated => StatusCode::CONFLICT,
            TorbError::NotPermitted | TorbError::Forbidden => StatusCode::FORBIDDEN,
            TorbError::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.code())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse::new(self.code))).into_response()
    }
}

/// Path ids arrive as strings; anything that is not an integer is simply not found
pub fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found())
}
