// Per-user dashboard view
//
// The dashboard is the most expensive read in the system: it resolves
// availability for every event the user recently touched. It is computed
// once and held in the per-user cache until a mutation invalidates it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::account::Principal;
use crate::event::EventView;
use crate::reservation::ReservationActivity;
use crate::sheet::Rank;

/// Number of reservations and events listed on a dashboard
pub const RECENT_LIMIT: usize = 5;

/// One entry of a user's reservation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct RecentReservation {
    pub id: i64,
    /// Event header without seat groups or counts
    pub event: EventView,
    pub sheet_rank: Rank,
    pub sheet_num: i64,
    pub price: i64,
    /// Unix seconds
    pub reserved_at: i64,
    /// Unix seconds, absent while the reservation is active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canceled_at: Option<i64>,
}

/// Computed dashboard payload, as cached per user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct DashboardView {
    pub id: i64,
    pub nickname: String,
    pub recent_reservations: Vec<RecentReservation>,
    /// Sum of prices over the user's active reservations
    pub total_price: i64,
    /// Latest touched events, without per-seat detail
    pub recent_events: Vec<EventView>,
}

impl DashboardView {
    /// Assemble a dashboard from a user's history.
    ///
    /// `events` must hold an anonymous view of every event referenced by
    /// `activity` and `recent_event_ids`; ids missing from it are skipped.
    pub fn assemble(
        user: Principal,
        activity: Vec<ReservationActivity>,
        total_price: i64,
        recent_event_ids: &[i64],
        events: &HashMap<i64, EventView>,
    ) -> Self {
        let recent_reservations = activity
            .into_iter()
            .filter_map(|item| {
                let event = events.get(&item.reservation.event_id)?;
                let price = event.rank_price(item.rank).unwrap_or(event.price);
                Some(RecentReservation {
                    id: item.reservation.id,
                    event: event.clone().snapshot(),
                    sheet_rank: item.rank,
                    sheet_num: item.num,
                    price,
                    reserved_at: item.reservation.reserved_at.timestamp(),
                    canceled_at: item.reservation.canceled_at.map(|t| t.timestamp()),
                })
            })
            .collect();

        let recent_events = recent_event_ids
            .iter()
            .filter_map(|id| events.get(id))
            .map(|event| event.clone().without_detail())
            .collect();

        Self {
            id: user.id,
            nickname: user.nickname,
            recent_reservations,
            total_price,
            recent_events,
        }
    }
}
