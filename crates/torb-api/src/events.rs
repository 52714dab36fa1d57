// Public event HTTP routes: index, event detail, reserve and cancel

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use torb_core::{ClaimedSeat, EventView, Principal, TorbError};
use utoipa::ToSchema;

use crate::auth::{LoginUser, MaybeUser};
use crate::common::{parse_id, ApiError, ErrorResponse};
use crate::AppState;

/// Top page payload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IndexResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Principal>,
    /// Sanitized public events
    pub events: Vec<EventView>,
}

/// Request to reserve a seat
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReserveRequest {
    #[schema(example = "S")]
    #[serde(default)]
    pub sheet_rank: String,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/events", get(list_events))
        .route("/api/events/:id", get(get_event))
        .route("/api/events/:id/actions/reserve", post(reserve_seat))
        .route(
            "/api/events/:id/sheets/:rank/:num/reservation",
            delete(cancel_reservation),
        )
        .with_state(state)
}

/// GET / - Top page data
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Current user and public events", body = IndexResponse)
    ),
    tag = "events"
)]
pub async fn index(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<Json<IndexResponse>, ApiError> {
    let events = state.office.list_public_events().await?;
    Ok(Json(IndexResponse {
        user,
        events: events.as_ref().clone(),
    }))
}

/// GET /api/events - Public events
#[utoipa::path(
    get,
    path = "/api/events",
    responses(
        (status = 200, description = "Sanitized public events", body = Vec<EventView>)
    ),
    tag = "events"
)]
pub async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<EventView>>, ApiError> {
    let events = state.office.list_public_events().await?;
    Ok(Json(events.as_ref().clone()))
}

/// GET /api/events/:id - Public event with seat detail
#[utoipa::path(
    get,
    path = "/api/events/{id}",
    params(
        ("id" = i64, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Sanitized event, seats held by the viewer are marked mine", body = EventView),
        (status = 404, description = "Event not found or not public", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn get_event(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<EventView>, ApiError> {
    let id = parse_id(&id)?;
    let view = state.office.resolve_public_event(id, viewer.id()).await?;
    Ok(Json(view.sanitized()))
}

/// POST /api/events/:id/actions/reserve - Claim one free seat of a rank
#[utoipa::path(
    post,
    path = "/api/events/{id}/actions/reserve",
    params(
        ("id" = i64, Path, description = "Event ID")
    ),
    request_body = ReserveRequest,
    responses(
        (status = 202, description = "Seat reserved", body = ClaimedSeat),
        (status = 400, description = "Unknown rank", body = ErrorResponse),
        (status = 401, description = "Not logged in", body = ErrorResponse),
        (status = 404, description = "Event not found or not public", body = ErrorResponse),
        (status = 409, description = "No free seat of this rank", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn reserve_seat(
    State(state): State<AppState>,
    LoginUser(user): LoginUser,
    Path(id): Path<String>,
    req: Option<Json<ReserveRequest>>,
) -> Result<(StatusCode, Json<ClaimedSeat>), ApiError> {
    let event_id: i64 = id.parse().map_err(|_| TorbError::InvalidEvent)?;
    // an unreadable body is an empty rank, rejected after the event check
    let rank = req.map(|Json(req)| req.sheet_rank).unwrap_or_default();
    let seat = state.office.claim_seat(event_id, &rank, user.id).await?;
    tracing::info!(
        event_id,
        user_id = user.id,
        rank = %seat.sheet_rank,
        num = seat.sheet_num,
        "Seat reserved"
    );
    Ok((StatusCode::ACCEPTED, Json(seat)))
}

/// DELETE /api/events/:id/sheets/:rank/:num/reservation - Cancel own reservation
#[utoipa::path(
    delete,
    path = "/api/events/{id}/sheets/{rank}/{num}/reservation",
    params(
        ("id" = i64, Path, description = "Event ID"),
        ("rank" = String, Path, description = "Seat rank"),
        ("num" = i64, Path, description = "Seat number within the rank")
    ),
    responses(
        (status = 204, description = "Reservation canceled"),
        (status = 400, description = "Seat is not reserved", body = ErrorResponse),
        (status = 401, description = "Not logged in", body = ErrorResponse),
        (status = 403, description = "Seat is held by someone else", body = ErrorResponse),
        (status = 404, description = "Unknown event, rank or seat", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn cancel_reservation(
    State(state): State<AppState>,
    LoginUser(user): LoginUser,
    Path((id, rank, num)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    let event_id: i64 = id.parse().map_err(|_| TorbError::InvalidEvent)?;
    let num: i64 = num.parse().map_err(|_| TorbError::InvalidSheet)?;
    state
        .office
        .cancel_seat(event_id, &rank, num, user.id)
        .await
        .map_err(ApiError::from_cancel)?;
    tracing::info!(event_id, user_id = user.id, %rank, num, "Reservation canceled");
    Ok(StatusCode::NO_CONTENT)
}
