// Database models (internal, converted into core domain types at the edge)

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use torb_core::{
    Credentials, EventRecord, Principal, Rank, ReservationActivity, ReservationRecord,
    SalesRecord, Sheet,
};

fn parse_rank(raw: &str) -> Result<Rank> {
    raw.parse::<Rank>()
        .ok()
        .with_context(|| format!("unknown rank in sheets table: {raw:?}"))
}

// ============================================
// Events
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: i64,
    pub title: String,
    pub public_fg: bool,
    pub closed_fg: bool,
    pub price: i64,
}

impl From<EventRow> for EventRecord {
    fn from(row: EventRow) -> Self {
        EventRecord {
            id: row.id,
            title: row.title,
            public: row.public_fg,
            closed: row.closed_fg,
            price: row.price,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateEventRow {
    pub title: String,
    pub public_fg: bool,
    pub price: i64,
}

// ============================================
// Sheets
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct SheetRow {
    pub id: i64,
    pub rank: String,
    pub num: i64,
    pub price: i64,
}

impl SheetRow {
    pub fn into_sheet(self) -> Result<Sheet> {
        Ok(Sheet {
            id: self.id,
            rank: parse_rank(&self.rank)?,
            num: self.num,
            price: self.price,
        })
    }
}

// ============================================
// Reservations
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct ReservationRow {
    pub id: i64,
    pub event_id: i64,
    pub sheet_id: i64,
    pub user_id: i64,
    pub reserved_at: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl From<ReservationRow> for ReservationRecord {
    fn from(row: ReservationRow) -> Self {
        ReservationRecord {
            id: row.id,
            event_id: row.event_id,
            sheet_id: row.sheet_id,
            user_id: row.user_id,
            reserved_at: row.reserved_at,
            canceled_at: row.canceled_at,
        }
    }
}

/// Reservation joined with its seat
#[derive(Debug, Clone, FromRow)]
pub struct ReservationActivityRow {
    pub id: i64,
    pub event_id: i64,
    pub sheet_id: i64,
    pub user_id: i64,
    pub reserved_at: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub sheet_rank: String,
    pub sheet_num: i64,
}

impl ReservationActivityRow {
    pub fn into_activity(self) -> Result<ReservationActivity> {
        Ok(ReservationActivity {
            rank: parse_rank(&self.sheet_rank)?,
            num: self.sheet_num,
            reservation: ReservationRecord {
                id: self.id,
                event_id: self.event_id,
                sheet_id: self.sheet_id,
                user_id: self.user_id,
                reserved_at: self.reserved_at,
                canceled_at: self.canceled_at,
            },
        })
    }
}

#[derive(Debug, Clone)]
pub struct CreateReservationRow {
    pub event_id: i64,
    pub sheet_id: i64,
    pub user_id: i64,
    pub reserved_at: DateTime<Utc>,
}

/// One line of the sales report
#[derive(Debug, Clone, FromRow)]
pub struct SalesRow {
    pub reservation_id: i64,
    pub event_id: i64,
    pub rank: String,
    pub num: i64,
    pub price: i64,
    pub user_id: i64,
    pub sold_at: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl SalesRow {
    pub fn into_record(self) -> Result<SalesRecord> {
        Ok(SalesRecord {
            reservation_id: self.reservation_id,
            event_id: self.event_id,
            rank: parse_rank(&self.rank)?,
            num: self.num,
            price: self.price,
            user_id: self.user_id,
            sold_at: self.sold_at,
            canceled_at: self.canceled_at,
        })
    }
}

// ============================================
// Accounts (users and administrators share a shape)
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub id: i64,
    pub login_name: String,
    pub nickname: String,
    pub pass_hash: String,
}

impl From<AccountRow> for Credentials {
    fn from(row: AccountRow) -> Self {
        Credentials {
            id: row.id,
            login_name: row.login_name,
            nickname: row.nickname,
            pass_hash: row.pass_hash,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PrincipalRow {
    pub id: i64,
    pub nickname: String,
}

impl From<PrincipalRow> for Principal {
    fn from(row: PrincipalRow) -> Self {
        Principal {
            id: row.id,
            nickname: row.nickname,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateAccountRow {
    pub login_name: String,
    pub nickname: String,
    pub pass_hash: String,
}
