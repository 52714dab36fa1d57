// Reservation allocator
//
// Write side of the inventory: claim one free seat of a rank, or cancel
// the caller's reservation on a specific seat.
//
// Decision: claims are optimistic. The free-seat pick and the insert run in
// separate transactions; a failed insert means another claimant won the race,
// so the loop re-reads the live pool and tries again. Exhaustion is detected
// by the pick itself (no candidate at all) and is never retried.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::error::{Result, TorbError};
use crate::reservation::{ClaimedSeat, NewReservation};
use crate::sheet::{Rank, Sheet};
use crate::traits::InventoryStore;

/// Claims and cancels seats against an inventory store
pub struct ReservationAllocator {
    store: Arc<dyn InventoryStore>,
    retry: RetryPolicy,
}

impl ReservationAllocator {
    pub fn new(store: Arc<dyn InventoryStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Claim one currently free seat of `rank` for `user_id`.
    ///
    /// `sheets` is the seeded seat list, used to reject ranks with no seats.
    pub async fn claim(
        &self,
        event_id: i64,
        rank: &str,
        user_id: i64,
        sheets: &[Sheet],
    ) -> Result<ClaimedSeat> {
        self.require_public_event(event_id).await?;
        let rank = parse_seeded_rank(rank, sheets)?;

        let mut attempts = 0usize;
        loop {
            attempts += 1;

            let sheet = match self.store.pick_free_sheet(event_id, rank).await? {
                Some(sheet) => sheet,
                None => {
                    debug!(event_id, %rank, attempts, "No free seat left");
                    return Err(TorbError::SoldOut);
                }
            };

            let input = NewReservation {
                event_id,
                sheet_id: sheet.id,
                user_id,
                reserved_at: Utc::now(),
            };

            match self.store.insert_reservation(input).await {
                Ok(reservation_id) => {
                    debug!(
                        event_id,
                        reservation_id,
                        sheet_id = sheet.id,
                        attempts,
                        "Seat claimed"
                    );
                    return Ok(ClaimedSeat {
                        id: reservation_id,
                        sheet_rank: sheet.rank,
                        sheet_num: sheet.num,
                    });
                }
                Err(e) => {
                    warn!(
                        event_id,
                        sheet_id = sheet.id,
                        attempt = attempts,
                        error = %e,
                        "Seat insert failed, retrying claim"
                    );
                    if !self.retry.allows_retry(attempts) {
                        return Err(TorbError::RetriesExhausted(attempts));
                    }
                    let delay = self.retry.backoff(attempts);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    /// Cancel `user_id`'s active reservation on seat (`rank`, `num`)
    pub async fn cancel(
        &self,
        event_id: i64,
        rank: &str,
        num: i64,
        user_id: i64,
        sheets: &[Sheet],
    ) -> Result<()> {
        self.require_public_event(event_id).await?;
        let rank = parse_seeded_rank(rank, sheets)?;
        let sheet = self
            .store
            .find_sheet(rank, num)
            .await?
            .ok_or(TorbError::InvalidSheet)?;

        let lock = self.store.lock_active_reservation(event_id, sheet.id).await?;

        let holder = lock.reservation().map(|r| (r.id, r.user_id));
        match holder {
            None => {
                lock.release().await?;
                Err(TorbError::NotReserved)
            }
            Some((_, holder)) if holder != user_id => {
                lock.release().await?;
                Err(TorbError::NotPermitted)
            }
            Some((reservation_id, _)) => {
                lock.cancel(Utc::now()).await?;
                debug!(event_id, reservation_id, sheet_id = sheet.id, "Reservation canceled");
                Ok(())
            }
        }
    }

    async fn require_public_event(&self, event_id: i64) -> Result<()> {
        match self.store.get_event(event_id).await? {
            Some(event) if event.public => Ok(()),
            _ => Err(TorbError::InvalidEvent),
        }
    }
}

/// Parse a rank name and require at least one seeded seat of that rank
fn parse_seeded_rank(name: &str, sheets: &[Sheet]) -> Result<Rank> {
    let rank: Rank = name.parse()?;
    if sheets.iter().any(|s| s.rank == rank) {
        Ok(rank)
    } else {
        Err(TorbError::InvalidRank)
    }
}
