// Box office facade
//
// BoxOffice is the single entry point request handlers call into. It ties
// the allocator, the availability resolver and the owned cache service to
// one inventory store.
//
// Decision: every mutation invalidates locally before returning, so the node
// that performed a write never serves its own stale view. The peer is told
// through the cache's InvalidationTransport, best effort.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::account::{AccountKind, NewAccount, Principal};
use crate::allocator::ReservationAllocator;
use crate::availability::resolve_event;
use crate::cache::{InvalidationOrigin, TorbCache};
use crate::config::BoxOfficeConfig;
use crate::dashboard::{DashboardView, RECENT_LIMIT};
use crate::error::{Result, TorbError};
use crate::event::{EventView, NewEvent};
use crate::report::render_sales_report;
use crate::reservation::ClaimedSeat;
use crate::sheet::Sheet;
use crate::traits::{InvalidationTransport, InventoryStore};

pub struct BoxOffice {
    store: Arc<dyn InventoryStore>,
    allocator: ReservationAllocator,
    cache: Arc<TorbCache>,
    sheets: OnceCell<Vec<Sheet>>,
}

impl BoxOffice {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        transport: Arc<dyn InvalidationTransport>,
        config: BoxOfficeConfig,
    ) -> Self {
        let cache = Arc::new(TorbCache::new(transport, &config.cache));
        Self {
            allocator: ReservationAllocator::new(store.clone(), config.retry),
            store,
            cache,
            sheets: OnceCell::new(),
        }
    }

    pub fn cache(&self) -> &Arc<TorbCache> {
        &self.cache
    }

    pub fn store(&self) -> &Arc<dyn InventoryStore> {
        &self.store
    }

    /// Seeded seats, loaded once. Seats are immutable after seeding.
    async fn sheets(&self) -> Result<&[Sheet]> {
        let sheets = self
            .sheets
            .get_or_try_init(|| async { self.store.list_sheets().await })
            .await?;
        Ok(sheets.as_slice())
    }

    // ========================================================================
    // Reservations
    // ========================================================================

    /// Claim one free seat of `rank` for `user_id`
    pub async fn claim_seat(
        &self,
        event_id: i64,
        rank: &str,
        user_id: i64,
    ) -> Result<ClaimedSeat> {
        let sheets = self.sheets().await?;
        let seat = self.allocator.claim(event_id, rank, user_id, sheets).await?;
        self.cache.invalidate_user(user_id, InvalidationOrigin::Local);
        Ok(seat)
    }

    /// Cancel `user_id`'s reservation on one seat
    pub async fn cancel_seat(
        &self,
        event_id: i64,
        rank: &str,
        num: i64,
        user_id: i64,
    ) -> Result<()> {
        let sheets = self.sheets().await?;
        self.allocator
            .cancel(event_id, rank, num, user_id, sheets)
            .await?;
        self.cache.invalidate_user(user_id, InvalidationOrigin::Local);
        Ok(())
    }

    // ========================================================================
    // Availability
    // ========================================================================

    /// Resolve any event, visible or not
    pub async fn resolve_event(&self, event_id: i64, viewer: Option<i64>) -> Result<EventView> {
        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or(TorbError::NotFound)?;
        let sheets = self.sheets().await?;
        let reservations = self.store.active_reservations(event_id).await?;
        Ok(resolve_event(&event, sheets, &reservations, viewer))
    }

    /// Resolve an event for the public surface; private events are not found
    pub async fn resolve_public_event(
        &self,
        event_id: i64,
        viewer: Option<i64>,
    ) -> Result<EventView> {
        let view = self.resolve_event(event_id, viewer).await?;
        if !view.public {
            return Err(TorbError::NotFound);
        }
        Ok(view)
    }

    /// Sanitized public events without seat detail, served from the index cache
    pub async fn list_public_events(&self) -> Result<Arc<Vec<EventView>>> {
        if let Some(index) = self.cache.get_index() {
            return Ok(index);
        }

        let generation = self.cache.index_generation();
        let mut events = Vec::new();
        for event in self.store.list_events().await? {
            if !event.public {
                continue;
            }
            let view = self.resolve_event(event.id, None).await?;
            events.push(view.without_detail().sanitized());
        }
        debug!(count = events.len(), "Index cache rebuilt");
        Ok(self.cache.set_index(generation, events))
    }

    /// Every event, for administrators. Not cached.
    pub async fn list_all_events(&self) -> Result<Vec<EventView>> {
        let mut events = Vec::new();
        for event in self.store.list_events().await? {
            events.push(self.resolve_event(event.id, None).await?.without_detail());
        }
        Ok(events)
    }

    /// A user's dashboard, served from the per-user cache
    pub async fn resolve_user_dashboard(&self, user_id: i64) -> Result<Arc<DashboardView>> {
        if let Some(view) = self.cache.get_user(user_id) {
            return Ok(view);
        }

        let generation = self.cache.user_generation(user_id);
        let user = self
            .store
            .get_principal(AccountKind::User, user_id)
            .await?
            .ok_or(TorbError::NotFound)?;

        let activity = self.store.recent_reservations(user_id, RECENT_LIMIT).await?;
        let total_price = self.store.total_spend(user_id).await?;
        let recent_event_ids = self.store.recent_event_ids(user_id, RECENT_LIMIT).await?;

        let mut events: HashMap<i64, EventView> = HashMap::new();
        let referenced = activity
            .iter()
            .map(|a| a.reservation.event_id)
            .chain(recent_event_ids.iter().copied());
        for event_id in referenced {
            if !events.contains_key(&event_id) {
                let view = self.resolve_event(event_id, None).await?;
                events.insert(event_id, view);
            }
        }

        let view = DashboardView::assemble(user, activity, total_price, &recent_event_ids, &events);
        Ok(self.cache.set_user(user_id, generation, view))
    }

    // ========================================================================
    // Administration
    // ========================================================================

    pub async fn create_event(&self, input: NewEvent) -> Result<EventView> {
        let event = self.store.create_event(input).await?;
        info!(event_id = event.id, title = %event.title, public = event.public, "Event created");
        let view = self.resolve_event(event.id, None).await?;
        self.cache.invalidate_index(InvalidationOrigin::Local);
        Ok(view)
    }

    /// Publish, unpublish or close an event.
    ///
    /// Closing forces the event private. Closed events are frozen, and a
    /// public event must be unpublished before it can be closed.
    pub async fn edit_event(&self, event_id: i64, public: bool, closed: bool) -> Result<EventView> {
        let public = public && !closed;
        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or(TorbError::NotFound)?;

        if event.closed {
            return Err(TorbError::CannotEditClosedEvent);
        }
        if event.public && closed {
            return Err(TorbError::CannotClosePublicEvent);
        }

        self.store.update_event_flags(event_id, public, closed).await?;
        info!(event_id, public, closed, "Event edited");
        let view = self.resolve_event(event_id, None).await?;
        self.cache.invalidate_index(InvalidationOrigin::Local);
        Ok(view)
    }

    /// Sales report CSV for one event, or for all events
    pub async fn sales_report(&self, event_id: Option<i64>) -> Result<Vec<u8>> {
        if let Some(event_id) = event_id {
            self.store
                .get_event(event_id)
                .await?
                .ok_or(TorbError::NotFound)?;
        }
        let records = self.store.sales_records(event_id).await?;
        render_sales_report(&records)
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    /// Create a user. `pass_hash` is already hashed by the caller.
    pub async fn register_user(
        &self,
        login_name: &str,
        nickname: &str,
        pass_hash: String,
    ) -> Result<Principal> {
        let user = self
            .store
            .create_account(
                AccountKind::User,
                NewAccount {
                    login_name: login_name.to_string(),
                    nickname: nickname.to_string(),
                    pass_hash,
                },
            )
            .await?;
        info!(user_id = user.id, "User registered");
        self.cache.invalidate_user(user.id, InvalidationOrigin::Local);
        Ok(user)
    }

    /// Check a login. `verify` receives the stored hash.
    ///
    /// Unknown logins and wrong passwords fail the same way.
    pub async fn authenticate<F>(
        &self,
        kind: AccountKind,
        login_name: &str,
        verify: F,
    ) -> Result<Principal>
    where
        F: FnOnce(&str) -> bool,
    {
        let credentials = self
            .store
            .find_credentials(kind, login_name)
            .await?
            .ok_or(TorbError::AuthenticationFailed)?;
        if !verify(&credentials.pass_hash) {
            return Err(TorbError::AuthenticationFailed);
        }
        Ok(credentials.principal())
    }

    pub async fn principal(&self, kind: AccountKind, id: i64) -> Result<Option<Principal>> {
        if id <= 0 {
            return Ok(None);
        }
        self.store.get_principal(kind, id).await
    }

    /// Create the administrator unless the login already exists
    pub async fn ensure_administrator(
        &self,
        login_name: &str,
        nickname: &str,
        pass_hash: String,
    ) -> Result<Principal> {
        if let Some(existing) = self
            .store
            .find_credentials(AccountKind::Administrator, login_name)
            .await?
        {
            return Ok(existing.principal());
        }

        let input = NewAccount {
            login_name: login_name.to_string(),
            nickname: nickname.to_string(),
            pass_hash,
        };
        match self.store.create_account(AccountKind::Administrator, input).await {
            Ok(admin) => {
                info!(admin_id = admin.id, login_name, "Administrator created");
                Ok(admin)
            }
            // lost a race with another node bootstrapping the same login
            Err(TorbError::Duplicated) => self
                .store
                .find_credentials(AccountKind::Administrator, login_name)
                .await?
                .map(|c| c.principal())
                .ok_or(TorbError::Duplicated),
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // Peer invalidation and lifecycle
    // ========================================================================

    /// Apply a user invalidation relayed by the peer node
    pub fn invalidate_user(&self, user_id: i64) {
        self.cache.invalidate_user(user_id, InvalidationOrigin::Peer);
    }

    /// Apply an index invalidation relayed by the peer node
    pub fn invalidate_index(&self) {
        self.cache.invalidate_index(InvalidationOrigin::Peer);
    }

    /// Tear down the cache service
    pub fn shutdown(&self) {
        self.cache.clear();
        info!("Box office caches cleared");
    }
}
