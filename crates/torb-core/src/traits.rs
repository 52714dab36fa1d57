// Core traits for pluggable backends
//
// These traits allow the box office to run against different backends:
// - PostgreSQL for production (torb-storage)
// - In-memory implementations for dev mode and tests (crate::memory)
// - HTTP or no-op peer transports for cache invalidation

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::account::{AccountKind, Credentials, NewAccount, Principal};
use crate::error::Result;
use crate::event::{EventRecord, NewEvent};
use crate::reservation::{
    NewReservation, ReservationActivity, ReservationRecord, SalesRecord,
};
use crate::sheet::{Rank, Sheet};

// ============================================================================
// InventoryStore - Durable record of events, seats and reservations
// ============================================================================

/// Transactional row store holding all inventory state
///
/// The store is the sole arbiter of "at most one active reservation per
/// (event, seat)". Implementations must reject an insert that would create
/// a second active reservation for the same seat with `TorbError::Conflict`.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    // ---- events ----

    /// Fetch one event
    async fn get_event(&self, event_id: i64) -> Result<Option<EventRecord>>;

    /// All events ordered by id
    async fn list_events(&self) -> Result<Vec<EventRecord>>;

    /// Insert an open (not closed) event
    async fn create_event(&self, input: NewEvent) -> Result<EventRecord>;

    /// Overwrite the visibility and closure flags
    async fn update_event_flags(&self, event_id: i64, public: bool, closed: bool) -> Result<()>;

    // ---- seats ----

    /// Every seat ordered by rank, then number
    async fn list_sheets(&self) -> Result<Vec<Sheet>>;

    /// Look a seat up by rank and number
    async fn find_sheet(&self, rank: Rank, num: i64) -> Result<Option<Sheet>>;

    // ---- reservation reads ----

    /// Active reservations of an event
    async fn active_reservations(&self, event_id: i64) -> Result<Vec<ReservationRecord>>;

    /// A user's reservations, most recently changed first
    async fn recent_reservations(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<ReservationActivity>>;

    /// Sum of event price plus seat price over a user's active reservations
    async fn total_spend(&self, user_id: i64) -> Result<i64>;

    /// Distinct events a user touched, most recently changed first
    async fn recent_event_ids(&self, user_id: i64, limit: usize) -> Result<Vec<i64>>;

    /// Sales rows for one event or all events, oldest reservation first
    async fn sales_records(&self, event_id: Option<i64>) -> Result<Vec<SalesRecord>>;

    // ---- reservation writes ----

    /// Pick one free seat of `rank` for the event, uniformly at random.
    ///
    /// The selection locks the active reservations it excludes so that it
    /// serializes against concurrent claimants of the same pool. Each call
    /// observes a fresh snapshot.
    async fn pick_free_sheet(&self, event_id: i64, rank: Rank) -> Result<Option<Sheet>>;

    /// Insert an active reservation in its own short transaction
    async fn insert_reservation(&self, input: NewReservation) -> Result<i64>;

    /// Open a transaction holding a row lock on the seat's active reservation
    async fn lock_active_reservation(
        &self,
        event_id: i64,
        sheet_id: i64,
    ) -> Result<Box<dyn SeatLock>>;

    // ---- accounts ----

    /// Create a user or administrator; `TorbError::Duplicated` if the login is taken
    async fn create_account(&self, kind: AccountKind, input: NewAccount) -> Result<Principal>;

    /// Stored credentials for a login name
    async fn find_credentials(
        &self,
        kind: AccountKind,
        login_name: &str,
    ) -> Result<Option<Credentials>>;

    /// Public identity by id
    async fn get_principal(&self, kind: AccountKind, id: i64) -> Result<Option<Principal>>;
}

/// Open transaction holding the row lock on one seat's active reservation
///
/// Dropping the lock without calling `cancel` or `release` rolls back.
#[async_trait]
pub trait SeatLock: Send {
    /// The active reservation under the lock, if the seat is reserved.
    /// When more than one row is active, this is the earliest one.
    fn reservation(&self) -> Option<&ReservationRecord>;

    /// Stamp the locked reservation as canceled and commit
    async fn cancel(self: Box<Self>, canceled_at: DateTime<Utc>) -> Result<()>;

    /// Commit without changes
    async fn release(self: Box<Self>) -> Result<()>;
}

// ============================================================================
// InvalidationTransport - Cross-node cache invalidation
// ============================================================================

/// Outbound channel to the peer node's invalidation endpoints
///
/// Calls are fire-and-forget: implementations must return promptly, must
/// not surface failures to the caller, and do not retry.
pub trait InvalidationTransport: Send + Sync {
    /// Ask the peer to drop its cached dashboard for `user_id`
    fn notify_user_invalidated(&self, user_id: i64);

    /// Ask the peer to drop its cached event index
    fn notify_index_invalidated(&self);
}

/// Transport for single-node deployments
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTransport;

impl InvalidationTransport for NoopTransport {
    fn notify_user_invalidated(&self, _user_id: i64) {}

    fn notify_index_invalidated(&self) {}
}
