// Box Office Core
//
// This crate holds the store-agnostic heart of the ticketing service:
// contention-safe seat allocation, availability resolution and the
// two-node view cache with cross-node invalidation.
//
// Key design decisions:
// - Uses traits (InventoryStore, SeatLock, InvalidationTransport) for pluggable backends
// - Remaining seat counts are always derived from active reservations, never stored
// - Seat claims retry optimistically under an explicit RetryPolicy
// - The cache service is an owned object with a lifecycle, injected into handlers
// - Error handling distinguishes request failures from infrastructure failures

// Domain types
pub mod account;
pub mod dashboard;
pub mod event;
pub mod reservation;
pub mod sheet;

pub mod allocator;
pub mod availability;
pub mod box_office;
pub mod cache;
pub mod config;
pub mod error;
pub mod report;
pub mod traits;

// In-memory implementations for dev mode and testing
pub mod memory;

// Re-exports for convenience
pub use account::{AccountKind, Credentials, NewAccount, Principal};
pub use allocator::ReservationAllocator;
pub use availability::resolve_event;
pub use box_office::BoxOffice;
pub use cache::{Generation, InvalidationOrigin, TorbCache};
pub use config::{BoxOfficeConfig, CacheConfig, RetryPolicy};
pub use dashboard::{DashboardView, RecentReservation};
pub use error::{Result, TorbError};
pub use event::{EventRecord, EventView, NewEvent, SheetView, SheetsView};
pub use report::{render_sales_report, write_sales_report, CSV_CONTENT_TYPE};
pub use reservation::{
    ClaimedSeat, NewReservation, ReservationActivity, ReservationRecord, SalesRecord,
};
pub use sheet::{seed_sheets, Rank, RankLayout, Sheet, STANDARD_LAYOUT};
pub use traits::{InvalidationTransport, InventoryStore, NoopTransport, SeatLock};

pub use memory::{InMemoryInventory, LoopbackTransport, Notification, RecordingTransport};
