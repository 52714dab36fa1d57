// Error types for the box office
//
// Variants follow the failure classes callers must tell apart:
// validation, exhaustion, authorization, contention and infrastructure.

use thiserror::Error;

/// Result type alias for box office operations
pub type Result<T> = std::result::Result<T, TorbError>;

/// Errors that can occur while reading or mutating seat inventory
#[derive(Debug, Error)]
pub enum TorbError {
    /// Requested record does not exist (or is not visible to the caller)
    #[error("not found")]
    NotFound,

    /// Event is unknown or not open for sale
    #[error("invalid event")]
    InvalidEvent,

    /// Rank is not one of the seeded seat tiers
    #[error("invalid rank")]
    InvalidRank,

    /// No seat with the given rank and number
    #[error("invalid sheet")]
    InvalidSheet,

    /// Every seat of the requested rank is taken
    #[error("sold out")]
    SoldOut,

    /// Seat has no active reservation
    #[error("not reserved")]
    NotReserved,

    /// Active reservation belongs to someone else
    #[error("not permitted")]
    NotPermitted,

    /// Principal may not access this resource
    #[error("forbidden")]
    Forbidden,

    /// Login name already taken
    #[error("duplicated")]
    Duplicated,

    /// Unknown login or wrong password
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Closed events are frozen
    #[error("cannot edit closed event")]
    CannotEditClosedEvent,

    /// A public event must be unpublished before it is closed
    #[error("cannot close public event")]
    CannotClosePublicEvent,

    /// A concurrent writer won the race for the same row
    #[error("reservation conflict: {0}")]
    Conflict(String),

    /// Claim loop gave up under a bounded retry policy
    #[error("seat claim gave up after {0} attempts")]
    RetriesExhausted(usize),

    /// Inventory store failure
    #[error("store error: {0}")]
    Store(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl TorbError {
    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        TorbError::Store(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        TorbError::Conflict(msg.into())
    }

    /// Stable machine-readable code used on the wire
    pub fn code(&self) -> &'static str {
        match self {
            TorbError::NotFound => "not_found",
            TorbError::InvalidEvent => "invalid_event",
            TorbError::InvalidRank => "invalid_rank",
            TorbError::InvalidSheet => "invalid_sheet",
            TorbError::SoldOut => "sold_out",
            TorbError::NotReserved => "not_reserved",
            TorbError::NotPermitted => "not_permitted",
            TorbError::Forbidden => "forbidden",
            TorbError::Duplicated => "duplicated",
            TorbError::AuthenticationFailed => "authentication_failed",
            TorbError::CannotEditClosedEvent => "cannot_edit_closed_event",
            TorbError::CannotClosePublicEvent => "cannot_close_public_event",
            TorbError::Conflict(_)
            | TorbError::RetriesExhausted(_)
            | TorbError::Store(_)
            | TorbError::Internal(_) => "unknown",
        }
    }

    /// Whether the error comes from infrastructure rather than the request
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            TorbError::Conflict(_)
                | TorbError::RetriesExhausted(_)
                | TorbError::Store(_)
                | TorbError::Internal(_)
        )
    }
}
