// In-memory implementations for dev mode and testing
//
// InMemoryInventory keeps every table behind one async mutex. A SeatLock
// holds that mutex until it commits, which is a coarser version of the row
// lock the Postgres store takes. The partial unique index on active
// reservations is emulated on insert.
//
// LoopbackTransport wires two in-process caches together as two nodes;
// RecordingTransport just remembers what it was asked to send.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex as SyncMutex;
use rand::seq::SliceRandom;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::account::{AccountKind, Credentials, NewAccount, Principal};
use crate::cache::{InvalidationOrigin, TorbCache};
use crate::error::{Result, TorbError};
use crate::event::{EventRecord, NewEvent};
use crate::reservation::{
    NewReservation, ReservationActivity, ReservationRecord, SalesRecord,
};
use crate::sheet::{seed_sheets, Rank, RankLayout, Sheet, STANDARD_LAYOUT};
use crate::traits::{InvalidationTransport, InventoryStore, SeatLock};

// ============================================================================
// InMemoryInventory - Tables in process memory
// ============================================================================

#[derive(Debug, Default)]
struct Tables {
    events: Vec<EventRecord>,
    sheets: Vec<Sheet>,
    reservations: Vec<ReservationRecord>,
    users: Vec<Credentials>,
    administrators: Vec<Credentials>,
}

impl Tables {
    fn accounts(&self, kind: AccountKind) -> &Vec<Credentials> {
        match kind {
            AccountKind::User => &self.users,
            AccountKind::Administrator => &self.administrators,
        }
    }

    fn accounts_mut(&mut self, kind: AccountKind) -> &mut Vec<Credentials> {
        match kind {
            AccountKind::User => &mut self.users,
            AccountKind::Administrator => &mut self.administrators,
        }
    }

    fn sheet(&self, sheet_id: i64) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.id == sheet_id)
    }

    fn event(&self, event_id: i64) -> Option<&EventRecord> {
        self.events.iter().find(|e| e.id == event_id)
    }

    fn active_index(&self, event_id: i64, sheet_id: i64) -> Option<usize> {
        self.reservations
            .iter()
            .enumerate()
            .filter(|(_, r)| r.event_id == event_id && r.sheet_id == sheet_id && r.is_active())
            .min_by_key(|(_, r)| (r.reserved_at, r.id))
            .map(|(i, _)| i)
    }
}

/// Inventory store held entirely in memory
#[derive(Clone)]
pub struct InMemoryInventory {
    tables: Arc<Mutex<Tables>>,
    failing_inserts: Arc<AtomicUsize>,
}

impl InMemoryInventory {
    /// Create a store seeded with the given seating plan
    pub fn new(layout: &[RankLayout]) -> Self {
        let tables = Tables {
            sheets: seed_sheets(layout),
            ..Default::default()
        };
        Self {
            tables: Arc::new(Mutex::new(tables)),
            failing_inserts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a store seeded with the standard 1000-seat venue
    pub fn standard() -> Self {
        Self::new(&STANDARD_LAYOUT)
    }

    /// Make the next `count` reservation inserts fail with a store error
    pub fn fail_next_inserts(&self, count: usize) {
        self.failing_inserts.store(count, Ordering::SeqCst);
    }

    /// Every reservation ever written, canceled ones included
    pub async fn all_reservations(&self) -> Vec<ReservationRecord> {
        self.tables.lock().await.reservations.clone()
    }

    fn take_insert_failure(&self) -> bool {
        self.failing_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for InMemoryInventory {
    fn default() -> Self {
        Self::standard()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventory {
    async fn get_event(&self, event_id: i64) -> Result<Option<EventRecord>> {
        Ok(self.tables.lock().await.event(event_id).cloned())
    }

    async fn list_events(&self) -> Result<Vec<EventRecord>> {
        let mut events = self.tables.lock().await.events.clone();
        events.sort_by_key(|e| e.id);
        Ok(events)
    }

    async fn create_event(&self, input: NewEvent) -> Result<EventRecord> {
        let mut tables = self.tables.lock().await;
        let event = EventRecord {
            id: tables.events.len() as i64 + 1,
            title: input.title,
            public: input.public,
            closed: false,
            price: input.price,
        };
        tables.events.push(event.clone());
        Ok(event)
    }

    async fn update_event_flags(&self, event_id: i64, public: bool, closed: bool) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let event = tables
            .events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or(TorbError::NotFound)?;
        event.public = public;
        event.closed = closed;
        Ok(())
    }

    async fn list_sheets(&self) -> Result<Vec<Sheet>> {
        let mut sheets = self.tables.lock().await.sheets.clone();
        sheets.sort_by_key(|s| s.order_key());
        Ok(sheets)
    }

    async fn find_sheet(&self, rank: Rank, num: i64) -> Result<Option<Sheet>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .sheets
            .iter()
            .find(|s| s.rank == rank && s.num == num)
            .cloned())
    }

    async fn active_reservations(&self, event_id: i64) -> Result<Vec<ReservationRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .reservations
            .iter()
            .filter(|r| r.event_id == event_id && r.is_active())
            .cloned()
            .collect())
    }

    async fn recent_reservations(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<ReservationActivity>> {
        let tables = self.tables.lock().await;
        let mut mine: Vec<&ReservationRecord> = tables
            .reservations
            .iter()
            .filter(|r| r.user_id == user_id)
            .collect();
        mine.sort_by(|a, b| {
            (b.last_activity(), b.id).cmp(&(a.last_activity(), a.id))
        });

        Ok(mine
            .into_iter()
            .take(limit)
            .filter_map(|r| {
                let sheet = tables.sheet(r.sheet_id)?;
                Some(ReservationActivity {
                    reservation: r.clone(),
                    rank: sheet.rank,
                    num: sheet.num,
                })
            })
            .collect())
    }

    async fn total_spend(&self, user_id: i64) -> Result<i64> {
        let tables = self.tables.lock().await;
        Ok(tables
            .reservations
            .iter()
            .filter(|r| r.user_id == user_id && r.is_active())
            .filter_map(|r| Some(tables.event(r.event_id)?.price + tables.sheet(r.sheet_id)?.price))
            .sum())
    }

    async fn recent_event_ids(&self, user_id: i64, limit: usize) -> Result<Vec<i64>> {
        let tables = self.tables.lock().await;
        let mut latest: HashMap<i64, DateTime<Utc>> = HashMap::new();
        for r in tables.reservations.iter().filter(|r| r.user_id == user_id) {
            let at = r.last_activity();
            latest
                .entry(r.event_id)
                .and_modify(|t| *t = (*t).max(at))
                .or_insert(at);
        }
        let mut ids: Vec<(i64, DateTime<Utc>)> = latest.into_iter().collect();
        ids.sort_by(|a, b| (b.1, b.0).cmp(&(a.1, a.0)));
        Ok(ids.into_iter().take(limit).map(|(id, _)| id).collect())
    }

    async fn sales_records(&self, event_id: Option<i64>) -> Result<Vec<SalesRecord>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<SalesRecord> = tables
            .reservations
            .iter()
            .filter(|r| event_id.map_or(true, |id| r.event_id == id))
            .filter_map(|r| {
                let event = tables.event(r.event_id)?;
                let sheet = tables.sheet(r.sheet_id)?;
                Some(SalesRecord {
                    reservation_id: r.id,
                    event_id: r.event_id,
                    rank: sheet.rank,
                    num: sheet.num,
                    price: event.price + sheet.price,
                    user_id: r.user_id,
                    sold_at: r.reserved_at,
                    canceled_at: r.canceled_at,
                })
            })
            .collect();
        rows.sort_by_key(|r| (r.sold_at, r.reservation_id));
        Ok(rows)
    }

    async fn pick_free_sheet(&self, event_id: i64, rank: Rank) -> Result<Option<Sheet>> {
        let tables = self.tables.lock().await;
        let free: Vec<&Sheet> = tables
            .sheets
            .iter()
            .filter(|s| s.rank == rank)
            .filter(|s| tables.active_index(event_id, s.id).is_none())
            .collect();
        let picked = free.choose(&mut rand::thread_rng()).map(|s| (*s).clone());
        Ok(picked)
    }

    async fn insert_reservation(&self, input: NewReservation) -> Result<i64> {
        if self.take_insert_failure() {
            return Err(TorbError::store("injected insert failure"));
        }

        let mut tables = self.tables.lock().await;
        if tables.active_index(input.event_id, input.sheet_id).is_some() {
            return Err(TorbError::conflict(format!(
                "seat {} of event {} already reserved",
                input.sheet_id, input.event_id
            )));
        }
        let id = tables.reservations.len() as i64 + 1;
        tables.reservations.push(ReservationRecord {
            id,
            event_id: input.event_id,
            sheet_id: input.sheet_id,
            user_id: input.user_id,
            reserved_at: input.reserved_at,
            canceled_at: None,
        });
        Ok(id)
    }

    async fn lock_active_reservation(
        &self,
        event_id: i64,
        sheet_id: i64,
    ) -> Result<Box<dyn SeatLock>> {
        let guard = self.tables.clone().lock_owned().await;
        let index = guard.active_index(event_id, sheet_id);
        let reservation = index.map(|i| guard.reservations[i].clone());
        Ok(Box::new(MemorySeatLock {
            guard,
            index,
            reservation,
        }))
    }

    async fn create_account(&self, kind: AccountKind, input: NewAccount) -> Result<Principal> {
        let mut tables = self.tables.lock().await;
        let accounts = tables.accounts_mut(kind);
        if accounts.iter().any(|a| a.login_name == input.login_name) {
            return Err(TorbError::Duplicated);
        }
        let credentials = Credentials {
            id: accounts.len() as i64 + 1,
            login_name: input.login_name,
            nickname: input.nickname,
            pass_hash: input.pass_hash,
        };
        let principal = credentials.principal();
        accounts.push(credentials);
        Ok(principal)
    }

    async fn find_credentials(
        &self,
        kind: AccountKind,
        login_name: &str,
    ) -> Result<Option<Credentials>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .accounts(kind)
            .iter()
            .find(|a| a.login_name == login_name)
            .cloned())
    }

    async fn get_principal(&self, kind: AccountKind, id: i64) -> Result<Option<Principal>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .accounts(kind)
            .iter()
            .find(|a| a.id == id)
            .map(Credentials::principal))
    }
}

/// Holds the whole table set until committed or dropped
struct MemorySeatLock {
    guard: OwnedMutexGuard<Tables>,
    index: Option<usize>,
    reservation: Option<ReservationRecord>,
}

#[async_trait]
impl SeatLock for MemorySeatLock {
    fn reservation(&self) -> Option<&ReservationRecord> {
        self.reservation.as_ref()
    }

    async fn cancel(mut self: Box<Self>, canceled_at: DateTime<Utc>) -> Result<()> {
        let index = self.index.ok_or(TorbError::NotReserved)?;
        self.guard.reservations[index].canceled_at = Some(canceled_at);
        Ok(())
    }

    async fn release(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Transports
// ============================================================================

/// A peer invalidation as seen by a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    User(i64),
    Index,
}

/// Records notifications instead of sending them
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: SyncMutex<Vec<Notification>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl InvalidationTransport for RecordingTransport {
    fn notify_user_invalidated(&self, user_id: i64) {
        self.sent.lock().push(Notification::User(user_id));
    }

    fn notify_index_invalidated(&self) {
        self.sent.lock().push(Notification::Index);
    }
}

/// Delivers notifications straight into another in-process cache
///
/// Disconnecting drops notifications silently, the way a dead peer would.
pub struct LoopbackTransport {
    peer: OnceLock<Weak<TorbCache>>,
    connected: AtomicBool,
    delivered: AtomicUsize,
    dropped: AtomicUsize,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self {
            peer: OnceLock::new(),
            connected: AtomicBool::new(true),
            delivered: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Point this transport at the peer's cache. Only the first link sticks.
    pub fn link(&self, peer: &Arc<TorbCache>) {
        let _ = self.peer.set(Arc::downgrade(peer));
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    fn deliver(&self, apply: impl FnOnce(&TorbCache)) {
        let peer = self
            .peer
            .get()
            .and_then(Weak::upgrade)
            .filter(|_| self.connected.load(Ordering::SeqCst));
        match peer {
            Some(peer) => {
                apply(&peer);
                self.delivered.fetch_add(1, Ordering::SeqCst);
            }
            None => {
                self.dropped.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl InvalidationTransport for LoopbackTransport {
    fn notify_user_invalidated(&self, user_id: i64) {
        self.deliver(|peer| peer.invalidate_user(user_id, InvalidationOrigin::Peer));
    }

    fn notify_index_invalidated(&self) {
        self.deliver(|peer| peer.invalidate_index(InvalidationOrigin::Peer));
    }
}
