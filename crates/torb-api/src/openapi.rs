// OpenAPI document for the HTTP surface

use torb_core::{
    ClaimedSeat, DashboardView, EventView, Principal, Rank, RecentReservation, SheetView,
    SheetsView,
};
use utoipa::OpenApi;

use crate::{admin, auth, cache_invalidate, common, events, users};

#[derive(OpenApi)]
#[openapi(
    paths(
        events::index,
        events::list_events,
        events::get_event,
        events::reserve_seat,
        events::cancel_reservation,
        users::register_user,
        users::get_user,
        auth::routes::login_user,
        auth::routes::logout_user,
        auth::routes::login_admin,
        auth::routes::logout_admin,
        admin::list_events,
        admin::create_event,
        admin::get_event,
        admin::edit_event,
        admin::event_sales_report,
        admin::sales_report,
        cache_invalidate::invalidate_user,
        cache_invalidate::invalidate_index,
    ),
    components(
        schemas(
            EventView, SheetsView, SheetView, Rank,
            ClaimedSeat, DashboardView, RecentReservation, Principal,
            common::ErrorResponse,
            events::IndexResponse,
            events::ReserveRequest,
            users::RegisterUserRequest,
            auth::routes::LoginRequest,
            admin::CreateEventRequest,
            admin::EditEventRequest,
        )
    ),
    tags(
        (name = "events", description = "Public event listing, reservation and cancellation"),
        (name = "users", description = "User registration and dashboard"),
        (name = "auth", description = "Cookie session login and logout"),
        (name = "admin", description = "Event management and sales reports"),
        (name = "peer", description = "Cache invalidation calls from the peer node")
    ),
    info(
        title = "Torb API",
        version = "0.2.0",
        description = "Ticket box office: seat reservation with a two-node invalidated view cache",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;
