// Repository layer for database operations
//
// Decision: one short transaction per reservation insert; seat selection and
// cancellation run inside transactions holding FOR UPDATE row locks.
// Decision: the partial unique index on active reservations is the final
// arbiter of the one-active-reservation-per-seat rule.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use torb_core::AccountKind;

use crate::models::*;

/// Whether an error is a unique-constraint violation raised by Postgres
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
        _ => false,
    }
}

fn account_table(kind: AccountKind) -> &'static str {
    match kind {
        AccountKind::User => "users",
        AccountKind::Administrator => "administrators",
    }
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create database connection from URL
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // ============================================
    // Events
    // ============================================

    pub async fn get_event(&self, id: i64) -> Result<Option<EventRow>> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, title, public_fg, closed_fg, price
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_events(&self) -> Result<Vec<EventRow>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, title, public_fg, closed_fg, price
            FROM events
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn create_event(&self, input: CreateEventRow) -> Result<EventRow> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            INSERT INTO events (title, public_fg, closed_fg, price)
            VALUES ($1, $2, FALSE, $3)
            RETURNING id, title, public_fg, closed_fg, price
            "#,
        )
        .bind(&input.title)
        .bind(input.public_fg)
        .bind(input.price)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Returns false when no event has the id
    pub async fn update_event_flags(&self, id: i64, public_fg: bool, closed_fg: bool) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET public_fg = $2, closed_fg = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(public_fg)
        .bind(closed_fg)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ============================================
    // Sheets
    // ============================================

    pub async fn list_sheets(&self) -> Result<Vec<SheetRow>> {
        let rows = sqlx::query_as::<_, SheetRow>(
            r#"
            SELECT id, rank, num, price
            FROM sheets
            ORDER BY rank ASC, num ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn find_sheet(&self, rank: &str, num: i64) -> Result<Option<SheetRow>> {
        let row = sqlx::query_as::<_, SheetRow>(
            r#"
            SELECT id, rank, num, price
            FROM sheets
            WHERE rank = $1 AND num = $2
            "#,
        )
        .bind(rank)
        .bind(num)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    // ============================================
    // Reservations (reads)
    // ============================================

    pub async fn list_active_reservations(&self, event_id: i64) -> Result<Vec<ReservationRow>> {
        let rows = sqlx::query_as::<_, ReservationRow>(
            r#"
            SELECT id, event_id, sheet_id, user_id, reserved_at, canceled_at
            FROM reservations
            WHERE event_id = $1 AND canceled_at IS NULL
            ORDER BY reserved_at ASC, id ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn list_recent_reservations(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<ReservationActivityRow>> {
        let rows = sqlx::query_as::<_, ReservationActivityRow>(
            r#"
            SELECT r.id, r.event_id, r.sheet_id, r.user_id, r.reserved_at, r.canceled_at,
                   s.rank AS sheet_rank, s.num AS sheet_num
            FROM reservations r
            INNER JOIN sheets s ON s.id = r.sheet_id
            WHERE r.user_id = $1
            ORDER BY COALESCE(r.canceled_at, r.reserved_at) DESC, r.id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn total_spend(&self, user_id: i64) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(e.price + s.price), 0)::BIGINT
            FROM reservations r
            INNER JOIN sheets s ON s.id = r.sheet_id
            INNER JOIN events e ON e.id = r.event_id
            WHERE r.user_id = $1 AND r.canceled_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    pub async fn list_recent_event_ids(&self, user_id: i64, limit: i64) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT event_id
            FROM reservations
            WHERE user_id = $1
            GROUP BY event_id
            ORDER BY MAX(COALESCE(canceled_at, reserved_at)) DESC, event_id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    pub async fn list_sales(&self, event_id: Option<i64>) -> Result<Vec<SalesRow>> {
        let rows = sqlx::query_as::<_, SalesRow>(
            r#"
            SELECT r.id AS reservation_id, r.event_id, s.rank, s.num,
                   e.price + s.price AS price, r.user_id,
                   r.reserved_at AS sold_at, r.canceled_at
            FROM reservations r
            INNER JOIN sheets s ON s.id = r.sheet_id
            INNER JOIN events e ON e.id = r.event_id
            WHERE ($1::BIGINT IS NULL OR r.event_id = $1)
            ORDER BY r.reserved_at ASC, r.id ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ============================================
    // Reservations (writes)
    // ============================================

    /// Pick a random free seat of a rank.
    ///
    /// The FOR UPDATE subquery locks the event's active reservations for the
    /// duration of the pick, serializing concurrent pickers on the same pool.
    pub async fn pick_free_sheet(&self, event_id: i64, rank: &str) -> Result<Option<SheetRow>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, SheetRow>(
            r#"
            SELECT id, rank, num, price
            FROM sheets
            WHERE rank = $2
              AND id NOT IN (
                  SELECT sheet_id FROM reservations
                  WHERE event_id = $1 AND canceled_at IS NULL
                  FOR UPDATE
              )
            ORDER BY random()
            LIMIT 1
            "#,
        )
        .bind(event_id)
        .bind(rank)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(row)
    }

    pub async fn insert_reservation(&self, input: CreateReservationRow) -> Result<i64> {
        let mut tx = self.pool.begin().await?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO reservations (event_id, sheet_id, user_id, reserved_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(input.event_id)
        .bind(input.sheet_id)
        .bind(input.user_id)
        .bind(input.reserved_at)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(id)
    }

    /// Open a transaction and lock the seat's earliest active reservation
    pub async fn lock_active_reservation(
        &self,
        event_id: i64,
        sheet_id: i64,
    ) -> Result<(Transaction<'static, Postgres>, Option<ReservationRow>)> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, ReservationRow>(
            r#"
            SELECT id, event_id, sheet_id, user_id, reserved_at, canceled_at
            FROM reservations
            WHERE event_id = $1 AND sheet_id = $2 AND canceled_at IS NULL
            ORDER BY reserved_at ASC, id ASC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(event_id)
        .bind(sheet_id)
        .fetch_optional(&mut *tx)
        .await?;

        Ok((tx, row))
    }

    /// Stamp a reservation as canceled inside an open transaction
    pub async fn cancel_reservation(
        tx: &mut Transaction<'static, Postgres>,
        reservation_id: i64,
        canceled_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE reservations
            SET canceled_at = $2
            WHERE id = $1
            "#,
        )
        .bind(reservation_id)
        .bind(canceled_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    // ============================================
    // Accounts
    // ============================================

    pub async fn create_account(&self, kind: AccountKind, input: CreateAccountRow) -> Result<PrincipalRow> {
        let sql = format!(
            "INSERT INTO {} (login_name, nickname, pass_hash) VALUES ($1, $2, $3) RETURNING id, nickname",
            account_table(kind)
        );
        let row = sqlx::query_as::<_, PrincipalRow>(&sql)
            .bind(&input.login_name)
            .bind(&input.nickname)
            .bind(&input.pass_hash)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn get_account_by_login(
        &self,
        kind: AccountKind,
        login_name: &str,
    ) -> Result<Option<AccountRow>> {
        let sql = format!(
            "SELECT id, login_name, nickname, pass_hash FROM {} WHERE login_name = $1",
            account_table(kind)
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(login_name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn get_principal(&self, kind: AccountKind, id: i64) -> Result<Option<PrincipalRow>> {
        let sql = format!(
            "SELECT id, nickname FROM {} WHERE id = $1",
            account_table(kind)
        );
        let row = sqlx::query_as::<_, PrincipalRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }
}
