// Administrator HTTP routes: event management and sales reports

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use torb_core::{EventView, NewEvent, CSV_CONTENT_TYPE};
use utoipa::ToSchema;

use crate::auth::LoginAdmin;
use crate::common::{parse_id, ApiError, ErrorResponse};
use crate::AppState;

/// Request to create an event
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    #[schema(example = "Spring concert")]
    pub title: String,
    #[serde(default)]
    pub public: bool,
    /// Base price; each rank adds its own delta
    #[schema(example = 1000)]
    pub price: i64,
}

/// Request to publish, unpublish or close an event
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct EditEventRequest {
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub closed: bool,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/admin/api/events", get(list_events).post(create_event))
        .route("/admin/api/events/:id", get(get_event))
        .route("/admin/api/events/:id/actions/edit", post(edit_event))
        .route("/admin/api/reports/events/:id/sales", get(event_sales_report))
        .route("/admin/api/reports/sales", get(sales_report))
        .with_state(state)
}

fn csv_response(body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"report.csv\""),
        ],
        body,
    )
        .into_response()
}

/// GET /admin/api/events - Every event
#[utoipa::path(
    get,
    path = "/admin/api/events",
    responses(
        (status = 200, description = "All events with prices and flags", body = Vec<EventView>),
        (status = 401, description = "Not logged in as administrator", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn list_events(
    State(state): State<AppState>,
    _admin: LoginAdmin,
) -> Result<Json<Vec<EventView>>, ApiError> {
    Ok(Json(state.office.list_all_events().await?))
}

/// POST /admin/api/events - Create an event
#[utoipa::path(
    post,
    path = "/admin/api/events",
    request_body = CreateEventRequest,
    responses(
        (status = 200, description = "Event created", body = EventView),
        (status = 401, description = "Not logged in as administrator", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn create_event(
    State(state): State<AppState>,
    _admin: LoginAdmin,
    Json(req): Json<CreateEventRequest>,
) -> Result<Json<EventView>, ApiError> {
    let view = state
        .office
        .create_event(NewEvent {
            title: req.title,
            public: req.public,
            price: req.price,
        })
        .await?;
    Ok(Json(view))
}

/// GET /admin/api/events/:id - Full event view
#[utoipa::path(
    get,
    path = "/admin/api/events/{id}",
    params(
        ("id" = i64, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Event with seat detail", body = EventView),
        (status = 401, description = "Not logged in as administrator", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn get_event(
    State(state): State<AppState>,
    _admin: LoginAdmin,
    Path(id): Path<String>,
) -> Result<Json<EventView>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.office.resolve_event(id, None).await?))
}

/// POST /admin/api/events/:id/actions/edit - Change visibility or close
#[utoipa::path(
    post,
    path = "/admin/api/events/{id}/actions/edit",
    params(
        ("id" = i64, Path, description = "Event ID")
    ),
    request_body = EditEventRequest,
    responses(
        (status = 200, description = "Event updated", body = EventView),
        (status = 400, description = "Event is closed, or still public while closing", body = ErrorResponse),
        (status = 401, description = "Not logged in as administrator", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn edit_event(
    State(state): State<AppState>,
    _admin: LoginAdmin,
    Path(id): Path<String>,
    Json(req): Json<EditEventRequest>,
) -> Result<Json<EventView>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(
        state.office.edit_event(id, req.public, req.closed).await?,
    ))
}

/// GET /admin/api/reports/events/:id/sales - Sales CSV for one event
#[utoipa::path(
    get,
    path = "/admin/api/reports/events/{id}/sales",
    params(
        ("id" = i64, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "CSV report", body = String, content_type = "text/csv"),
        (status = 401, description = "Not logged in as administrator", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn event_sales_report(
    State(state): State<AppState>,
    _admin: LoginAdmin,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let body = state.office.sales_report(Some(id)).await?;
    Ok(csv_response(body))
}

/// GET /admin/api/reports/sales - Sales CSV for every event
#[utoipa::path(
    get,
    path = "/admin/api/reports/sales",
    responses(
        (status = 200, description = "CSV report", body = String, content_type = "text/csv"),
        (status = 401, description = "Not logged in as administrator", body = ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn sales_report(
    State(state): State<AppState>,
    _admin: LoginAdmin,
) -> Result<Response, ApiError> {
    let body = state.office.sales_report(None).await?;
    Ok(csv_response(body))
}
