// Database-backed InventoryStore implementation
//
// This module implements the core InventoryStore trait on top of the
// Database repository. Repository errors are anyhow errors; they are
// classified here into the core error taxonomy:
// - unique violation on reservations => Conflict (a concurrent claimant won)
// - unique violation on accounts     => Duplicated
// - anything else                    => Store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use torb_core::{
    AccountKind, Credentials, EventRecord, InventoryStore, NewAccount, NewEvent, NewReservation,
    Principal, Rank, ReservationActivity, ReservationRecord, Result, SalesRecord, SeatLock, Sheet,
    TorbError,
};

use crate::models::{CreateAccountRow, CreateEventRow, CreateReservationRow};
use crate::repositories::{is_unique_violation, Database};

fn store_err(e: anyhow::Error) -> TorbError {
    TorbError::store(e.to_string())
}

// ============================================================================
// DbInventoryStore - Inventory in Postgres
// ============================================================================

#[derive(Clone)]
pub struct DbInventoryStore {
    db: Database,
}

impl DbInventoryStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl InventoryStore for DbInventoryStore {
    async fn get_event(&self, event_id: i64) -> Result<Option<EventRecord>> {
        let row = self.db.get_event(event_id).await.map_err(store_err)?;
        Ok(row.map(EventRecord::from))
    }

    async fn list_events(&self) -> Result<Vec<EventRecord>> {
        let rows = self.db.list_events().await.map_err(store_err)?;
        Ok(rows.into_iter().map(EventRecord::from).collect())
    }

    async fn create_event(&self, input: NewEvent) -> Result<EventRecord> {
        let row = self
            .db
            .create_event(CreateEventRow {
                title: input.title,
                public_fg: input.public,
                price: input.price,
            })
            .await
            .map_err(store_err)?;
        Ok(row.into())
    }

    async fn update_event_flags(&self, event_id: i64, public: bool, closed: bool) -> Result<()> {
        let updated = self
            .db
            .update_event_flags(event_id, public, closed)
            .await
            .map_err(store_err)?;
        if !updated {
            return Err(TorbError::NotFound);
        }
        Ok(())
    }

    async fn list_sheets(&self) -> Result<Vec<Sheet>> {
        let rows = self.db.list_sheets().await.map_err(store_err)?;
        rows.into_iter()
            .map(|row| row.into_sheet().map_err(store_err))
            .collect()
    }

    async fn find_sheet(&self, rank: Rank, num: i64) -> Result<Option<Sheet>> {
        let row = self
            .db
            .find_sheet(rank.as_str(), num)
            .await
            .map_err(store_err)?;
        row.map(|r| r.into_sheet().map_err(store_err)).transpose()
    }

    async fn active_reservations(&self, event_id: i64) -> Result<Vec<ReservationRecord>> {
        let rows = self
            .db
            .list_active_reservations(event_id)
            .await
            .map_err(store_err)?;
        Ok(rows.into_iter().map(ReservationRecord::from).collect())
    }

    async fn recent_reservations(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<ReservationActivity>> {
        let rows = self
            .db
            .list_recent_reservations(user_id, limit as i64)
            .await
            .map_err(store_err)?;
        rows.into_iter()
            .map(|row| row.into_activity().map_err(store_err))
            .collect()
    }

    async fn total_spend(&self, user_id: i64) -> Result<i64> {
        self.db.total_spend(user_id).await.map_err(store_err)
    }

    async fn recent_event_ids(&self, user_id: i64, limit: usize) -> Result<Vec<i64>> {
        self.db
            .list_recent_event_ids(user_id, limit as i64)
            .await
            .map_err(store_err)
    }

    async fn sales_records(&self, event_id: Option<i64>) -> Result<Vec<SalesRecord>> {
        let rows = self.db.list_sales(event_id).await.map_err(store_err)?;
        rows.into_iter()
            .map(|row| row.into_record().map_err(store_err))
            .collect()
    }

    async fn pick_free_sheet(&self, event_id: i64, rank: Rank) -> Result<Option<Sheet>> {
        let row = self
            .db
            .pick_free_sheet(event_id, rank.as_str())
            .await
            .map_err(store_err)?;
        row.map(|r| r.into_sheet().map_err(store_err)).transpose()
    }

    async fn insert_reservation(&self, input: NewReservation) -> Result<i64> {
        self.db
            .insert_reservation(CreateReservationRow {
                event_id: input.event_id,
                sheet_id: input.sheet_id,
                user_id: input.user_id,
                reserved_at: input.reserved_at,
            })
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    TorbError::conflict(format!(
                        "seat {} of event {} already reserved",
                        input.sheet_id, input.event_id
                    ))
                } else {
                    store_err(e)
                }
            })
    }

    async fn lock_active_reservation(
        &self,
        event_id: i64,
        sheet_id: i64,
    ) -> Result<Box<dyn SeatLock>> {
        let (tx, row) = self
            .db
            .lock_active_reservation(event_id, sheet_id)
            .await
            .map_err(store_err)?;
        Ok(Box::new(PgSeatLock {
            tx,
            reservation: row.map(ReservationRecord::from),
        }))
    }

    async fn create_account(&self, kind: AccountKind, input: NewAccount) -> Result<Principal> {
        let row = self
            .db
            .create_account(
                kind,
                CreateAccountRow {
                    login_name: input.login_name,
                    nickname: input.nickname,
                    pass_hash: input.pass_hash,
                },
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    TorbError::Duplicated
                } else {
                    store_err(e)
                }
            })?;
        Ok(row.into())
    }

    async fn find_credentials(
        &self,
        kind: AccountKind,
        login_name: &str,
    ) -> Result<Option<Credentials>> {
        let row = self
            .db
            .get_account_by_login(kind, login_name)
            .await
            .map_err(store_err)?;
        Ok(row.map(Credentials::from))
    }

    async fn get_principal(&self, kind: AccountKind, id: i64) -> Result<Option<Principal>> {
        let row = self.db.get_principal(kind, id).await.map_err(store_err)?;
        Ok(row.map(Principal::from))
    }
}

// ============================================================================
// PgSeatLock - FOR UPDATE lock held by an open transaction
// ============================================================================

/// Dropping the lock rolls the transaction back (sqlx default)
struct PgSeatLock {
    tx: Transaction<'static, Postgres>,
    reservation: Option<ReservationRecord>,
}

#[async_trait]
impl SeatLock for PgSeatLock {
    fn reservation(&self) -> Option<&ReservationRecord> {
        self.reservation.as_ref()
    }

    async fn cancel(self: Box<Self>, canceled_at: DateTime<Utc>) -> Result<()> {
        let PgSeatLock { mut tx, reservation } = *self;
        let reservation = reservation.ok_or(TorbError::NotReserved)?;
        Database::cancel_reservation(&mut tx, reservation.id, canceled_at)
            .await
            .map_err(store_err)?;
        tx.commit().await.map_err(|e| TorbError::store(e.to_string()))?;
        Ok(())
    }

    async fn release(self: Box<Self>) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| TorbError::store(e.to_string()))
    }
}
