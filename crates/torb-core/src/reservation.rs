// Reservation domain types
//
// Reservations are append-only: a row is created by a successful claim
// and is only ever stamped as canceled, never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::sheet::Rank;

/// Persisted reservation row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRecord {
    pub id: i64,
    pub event_id: i64,
    pub sheet_id: i64,
    pub user_id: i64,
    pub reserved_at: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl ReservationRecord {
    pub fn is_active(&self) -> bool {
        self.canceled_at.is_none()
    }

    /// Time of the most recent change to this reservation
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.canceled_at.unwrap_or(self.reserved_at)
    }
}

/// Input for inserting an active reservation
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub event_id: i64,
    pub sheet_id: i64,
    pub user_id: i64,
    pub reserved_at: DateTime<Utc>,
}

/// Result of a successful seat claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ClaimedSeat {
    /// Reservation id
    pub id: i64,
    pub sheet_rank: Rank,
    pub sheet_num: i64,
}

/// A reservation joined with its seat, as listed in a user's history
#[derive(Debug, Clone)]
pub struct ReservationActivity {
    pub reservation: ReservationRecord,
    pub rank: Rank,
    pub num: i64,
}

/// A reservation joined with seat and event prices, for sales reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesRecord {
    pub reservation_id: i64,
    pub event_id: i64,
    pub rank: Rank,
    pub num: i64,
    /// Event base price plus seat delta
    pub price: i64,
    pub user_id: i64,
    pub sold_at: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
}
