// Integration tests for seat allocation and the two-node cache
//
// These tests drive BoxOffice against InMemoryInventory. Two-node scenarios
// share one store between two BoxOffice instances wired with LoopbackTransport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use torb_core::{
    AccountKind, BoxOffice, BoxOfficeConfig, CacheConfig, Credentials, EventRecord,
    InMemoryInventory, InventoryStore, LoopbackTransport, NewAccount, NewEvent, NewReservation,
    NoopTransport, Principal, Rank, RankLayout, ReservationActivity, ReservationRecord,
    RetryPolicy, SalesRecord, SeatLock, Sheet, TorbError,
};

fn layout(s: i64, a: i64) -> Vec<RankLayout> {
    vec![
        RankLayout { rank: Rank::S, count: s, price: 5000 },
        RankLayout { rank: Rank::A, count: a, price: 3000 },
    ]
}

fn test_config() -> BoxOfficeConfig {
    BoxOfficeConfig::new().with_retry(RetryPolicy::bounded(100))
}

fn office(store: &InMemoryInventory) -> Arc<BoxOffice> {
    Arc::new(BoxOffice::new(
        Arc::new(store.clone()),
        Arc::new(NoopTransport),
        test_config(),
    ))
}

async fn public_event(office: &BoxOffice) -> i64 {
    office
        .create_event(NewEvent {
            title: "Live".to_string(),
            public: true,
            price: 1000,
        })
        .await
        .unwrap()
        .id
}

async fn user(office: &BoxOffice, login: &str) -> i64 {
    office
        .register_user(login, login, "hash".to_string())
        .await
        .unwrap()
        .id
}

// =============================================================================
// Seat claim under contention
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_seat_race_has_one_winner() {
    let store = InMemoryInventory::new(&layout(1, 0));
    let office = office(&store);
    let event_id = public_event(&office).await;
    let alice = user(&office, "alice").await;
    let bob = user(&office, "bob").await;

    let first = {
        let office = office.clone();
        tokio::spawn(async move { office.claim_seat(event_id, "S", alice).await })
    };
    let second = {
        let office = office.clone();
        tokio::spawn(async move { office.claim_seat(event_id, "S", bob).await })
    };
    let results = vec![first.await.unwrap(), second.await.unwrap()];

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(TorbError::SoldOut))));
    let seat = winners[0].clone();
    let holder = if results[0].is_ok() { alice } else { bob };

    // exhausted stays exhausted
    let third = office.claim_seat(event_id, "S", alice).await;
    assert!(matches!(third, Err(TorbError::SoldOut)));

    office
        .cancel_seat(event_id, "S", seat.sheet_num, holder)
        .await
        .unwrap();

    let fourth = office.claim_seat(event_id, "S", bob).await.unwrap();
    assert_eq!(fourth.sheet_rank, Rank::S);
    assert_eq!(fourth.sheet_num, seat.sheet_num);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_claims_never_double_book() {
    let store = InMemoryInventory::new(&layout(10, 0));
    let office = office(&store);
    let event_id = public_event(&office).await;

    let handles = (1..=30).map(|user_id| {
        let office = office.clone();
        tokio::spawn(async move { office.claim_seat(event_id, "S", user_id).await })
    });

    let mut won = 0;
    let mut sold_out = 0;
    for result in futures::future::join_all(handles).await {
        match result.unwrap() {
            Ok(_) => won += 1,
            Err(TorbError::SoldOut) => sold_out += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(won, 10);
    assert_eq!(sold_out, 20);

    let active: Vec<_> = store
        .all_reservations()
        .await
        .into_iter()
        .filter(|r| r.is_active())
        .collect();
    let mut seats: Vec<i64> = active.iter().map(|r| r.sheet_id).collect();
    seats.sort();
    seats.dedup();
    assert_eq!(seats.len(), active.len());

    let view = office.resolve_event(event_id, None).await.unwrap();
    assert_eq!(view.remains, 0);
    assert_eq!(view.sheets[&Rank::S].remains, 0);
}

#[tokio::test]
async fn test_exhausting_a_rank_then_freeing_one_seat() {
    let store = InMemoryInventory::new(&layout(3, 2));
    let office = office(&store);
    let event_id = public_event(&office).await;
    let fan = user(&office, "fan").await;

    let mut claimed = Vec::new();
    for _ in 0..3 {
        claimed.push(office.claim_seat(event_id, "S", fan).await.unwrap());
    }
    assert!(matches!(
        office.claim_seat(event_id, "S", fan).await,
        Err(TorbError::SoldOut)
    ));

    // other ranks are unaffected
    let view = office.resolve_event(event_id, Some(fan)).await.unwrap();
    assert_eq!(view.sheets[&Rank::A].remains, 2);
    assert_eq!(view.remains, 2);

    office
        .cancel_seat(event_id, "S", claimed[1].sheet_num, fan)
        .await
        .unwrap();
    let view = office.resolve_event(event_id, Some(fan)).await.unwrap();
    assert_eq!(view.sheets[&Rank::S].remains, 1);

    let again = office.claim_seat(event_id, "S", fan).await.unwrap();
    assert_eq!(again.sheet_rank, Rank::S);
    let view = office.resolve_event(event_id, Some(fan)).await.unwrap();
    assert_eq!(view.sheets[&Rank::S].remains, 0);
}

#[tokio::test]
async fn test_remains_tracks_active_reservations() {
    let store = InMemoryInventory::new(&layout(5, 5));
    let office = office(&store);
    let event_id = public_event(&office).await;

    let mut seats = Vec::new();
    for user_id in 1..=6 {
        let rank = if user_id % 2 == 0 { "S" } else { "A" };
        seats.push((user_id, office.claim_seat(event_id, rank, user_id).await.unwrap()));
    }
    for (user_id, seat) in seats.iter().take(2) {
        office
            .cancel_seat(event_id, seat.sheet_rank.as_str(), seat.sheet_num, *user_id)
            .await
            .unwrap();
    }

    let active = store
        .active_reservations(event_id)
        .await
        .unwrap()
        .len() as i64;
    let view = office.resolve_event(event_id, None).await.unwrap();
    assert_eq!(active, 4);
    assert_eq!(view.remains, view.total - active);
    let rank_remains: i64 = view.sheets.values().map(|g| g.remains).sum();
    assert_eq!(rank_remains, view.remains);
}

// =============================================================================
// Validation and cancellation rules
// =============================================================================

#[tokio::test]
async fn test_claim_validation() {
    let store = InMemoryInventory::new(&layout(2, 0));
    let office = office(&store);
    let event_id = public_event(&office).await;
    let private_id = office
        .create_event(NewEvent {
            title: "Rehearsal".to_string(),
            public: false,
            price: 0,
        })
        .await
        .unwrap()
        .id;

    assert!(matches!(
        office.claim_seat(private_id, "S", 1).await,
        Err(TorbError::InvalidEvent)
    ));
    assert!(matches!(
        office.claim_seat(999, "S", 1).await,
        Err(TorbError::InvalidEvent)
    ));
    assert!(matches!(
        office.claim_seat(event_id, "X", 1).await,
        Err(TorbError::InvalidRank)
    ));
    // a known rank with no seeded seats
    assert!(matches!(
        office.claim_seat(event_id, "A", 1).await,
        Err(TorbError::InvalidRank)
    ));
    assert!(matches!(
        office.cancel_seat(event_id, "S", 99, 1).await,
        Err(TorbError::InvalidSheet)
    ));
    assert!(matches!(
        office.cancel_seat(event_id, "Q", 1, 1).await,
        Err(TorbError::InvalidRank)
    ));
    // cancel agrees with claim on unseeded ranks
    assert!(matches!(
        office.cancel_seat(event_id, "A", 1, 1).await,
        Err(TorbError::InvalidRank)
    ));
}

#[tokio::test]
async fn test_cancel_by_other_user_is_not_permitted() {
    let store = InMemoryInventory::new(&layout(1, 0));
    let office = office(&store);
    let event_id = public_event(&office).await;

    let seat = office.claim_seat(event_id, "S", 1).await.unwrap();
    let err = office
        .cancel_seat(event_id, "S", seat.sheet_num, 2)
        .await
        .unwrap_err();
    assert!(matches!(err, TorbError::NotPermitted));

    let view = office.resolve_event(event_id, Some(1)).await.unwrap();
    let detail = &view.sheets[&Rank::S].detail[0];
    assert!(detail.reserved && detail.mine);
    assert_eq!(view.remains, 0);
}

#[tokio::test]
async fn test_not_reserved_is_idempotent() {
    let store = InMemoryInventory::new(&layout(1, 0));
    let office = office(&store);
    let event_id = public_event(&office).await;

    // never reserved
    for _ in 0..2 {
        assert!(matches!(
            office.cancel_seat(event_id, "S", 1, 1).await,
            Err(TorbError::NotReserved)
        ));
    }

    office.claim_seat(event_id, "S", 1).await.unwrap();
    office.cancel_seat(event_id, "S", 1, 1).await.unwrap();
    let before = store.all_reservations().await;

    for _ in 0..3 {
        assert!(matches!(
            office.cancel_seat(event_id, "S", 1, 1).await,
            Err(TorbError::NotReserved)
        ));
    }
    assert_eq!(store.all_reservations().await, before);
}

// =============================================================================
// Retry policy
// =============================================================================

#[tokio::test]
async fn test_claim_retries_through_insert_failures() {
    let store = InMemoryInventory::new(&layout(2, 0));
    let office = office(&store);
    let event_id = public_event(&office).await;

    store.fail_next_inserts(5);
    let seat = office.claim_seat(event_id, "S", 1).await.unwrap();
    assert_eq!(seat.sheet_rank, Rank::S);
    assert_eq!(store.all_reservations().await.len(), 1);
}

#[tokio::test]
async fn test_bounded_policy_gives_up() {
    let store = InMemoryInventory::new(&layout(2, 0));
    let office = BoxOffice::new(
        Arc::new(store.clone()),
        Arc::new(NoopTransport),
        BoxOfficeConfig::new().with_retry(RetryPolicy::bounded(3)),
    );
    let event_id = public_event(&office).await;

    store.fail_next_inserts(10);
    let err = office.claim_seat(event_id, "S", 1).await.unwrap_err();
    assert!(matches!(err, TorbError::RetriesExhausted(3)));
    assert!(err.is_internal());
    assert!(store.all_reservations().await.is_empty());
}

// =============================================================================
// Dashboard, administration and reports
// =============================================================================

#[tokio::test]
async fn test_dashboard_contents_and_caching() {
    let store = InMemoryInventory::new(&layout(10, 10));
    let office = office(&store);
    let event_id = public_event(&office).await;
    let fan = user(&office, "fan").await;

    let empty = office.resolve_user_dashboard(fan).await.unwrap();
    assert!(empty.recent_reservations.is_empty());
    assert_eq!(empty.total_price, 0);

    let s = office.claim_seat(event_id, "S", fan).await.unwrap();
    office.claim_seat(event_id, "A", fan).await.unwrap();
    office
        .cancel_seat(event_id, "S", s.sheet_num, fan)
        .await
        .unwrap();

    let dashboard = office.resolve_user_dashboard(fan).await.unwrap();
    assert_eq!(dashboard.nickname, "fan");
    assert_eq!(dashboard.recent_reservations.len(), 2);
    // A seat only: 1000 + 3000
    assert_eq!(dashboard.total_price, 4000);
    assert_eq!(dashboard.recent_events.len(), 1);
    assert!(dashboard.recent_reservations[0].event.sheets.is_empty());

    let canceled = dashboard
        .recent_reservations
        .iter()
        .find(|r| r.sheet_rank == Rank::S)
        .unwrap();
    assert!(canceled.canceled_at.is_some());
    assert_eq!(canceled.price, 6000);

    // served from cache until the next mutation
    assert!(office.cache().has_user(fan));
    let cached = office.resolve_user_dashboard(fan).await.unwrap();
    assert!(Arc::ptr_eq(&dashboard, &cached));

    office.claim_seat(event_id, "A", fan).await.unwrap();
    assert!(!office.cache().has_user(fan));
    let fresh = office.resolve_user_dashboard(fan).await.unwrap();
    assert_eq!(fresh.total_price, 8000);
}

#[tokio::test]
async fn test_dashboard_limits_history() {
    let store = InMemoryInventory::new(&layout(10, 0));
    let office = office(&store);
    let fan = user(&office, "fan").await;

    for _ in 0..7 {
        let event_id = public_event(&office).await;
        office.claim_seat(event_id, "S", fan).await.unwrap();
    }
    let dashboard = office.resolve_user_dashboard(fan).await.unwrap();
    assert_eq!(dashboard.recent_reservations.len(), 5);
    assert_eq!(dashboard.recent_events.len(), 5);
    assert_eq!(dashboard.total_price, 7 * 6000);

    assert!(matches!(
        office.resolve_user_dashboard(404).await,
        Err(TorbError::NotFound)
    ));
}

#[tokio::test]
async fn test_edit_event_rules() {
    let store = InMemoryInventory::new(&layout(1, 0));
    let office = office(&store);
    let event_id = public_event(&office).await;

    assert!(matches!(
        office.edit_event(event_id, false, true).await,
        Err(TorbError::CannotClosePublicEvent)
    ));

    let view = office.edit_event(event_id, false, false).await.unwrap();
    assert!(!view.public);
    assert!(matches!(
        office.resolve_public_event(event_id, None).await,
        Err(TorbError::NotFound)
    ));

    // closing forces private even when asked to publish
    let view = office.edit_event(event_id, true, true).await.unwrap();
    assert!(view.closed && !view.public);
    assert!(matches!(
        office.edit_event(event_id, true, false).await,
        Err(TorbError::CannotEditClosedEvent)
    ));
    assert!(matches!(
        office.edit_event(404, true, false).await,
        Err(TorbError::NotFound)
    ));
}

#[tokio::test]
async fn test_sales_report_lists_every_reservation() {
    let store = InMemoryInventory::new(&layout(2, 0));
    let office = office(&store);
    let first = public_event(&office).await;
    let second = public_event(&office).await;

    let seat = office.claim_seat(first, "S", 1).await.unwrap();
    office.claim_seat(second, "S", 2).await.unwrap();
    office
        .cancel_seat(first, "S", seat.sheet_num, 1)
        .await
        .unwrap();

    let all = String::from_utf8(office.sales_report(None).await.unwrap()).unwrap();
    assert_eq!(all.lines().count(), 3);

    let one = String::from_utf8(office.sales_report(Some(first)).await.unwrap()).unwrap();
    let lines: Vec<&str> = one.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with(&format!("1,{first},S,")));
    assert!(lines[1].ends_with('Z'));

    assert!(matches!(
        office.sales_report(Some(404)).await,
        Err(TorbError::NotFound)
    ));
}

#[tokio::test]
async fn test_authentication_and_admin_bootstrap() {
    let store = InMemoryInventory::new(&layout(1, 0));
    let office = office(&store);
    user(&office, "alice").await;

    let ok = office
        .authenticate(AccountKind::User, "alice", |hash| hash == "hash")
        .await
        .unwrap();
    assert_eq!(ok.nickname, "alice");
    assert!(matches!(
        office
            .authenticate(AccountKind::User, "alice", |_| false)
            .await,
        Err(TorbError::AuthenticationFailed)
    ));
    assert!(matches!(
        office
            .authenticate(AccountKind::User, "nobody", |_| true)
            .await,
        Err(TorbError::AuthenticationFailed)
    ));
    // user logins are not administrator logins
    assert!(matches!(
        office
            .authenticate(AccountKind::Administrator, "alice", |_| true)
            .await,
        Err(TorbError::AuthenticationFailed)
    ));

    let admin = office
        .ensure_administrator("admin", "Admin", "h1".to_string())
        .await
        .unwrap();
    let again = office
        .ensure_administrator("admin", "Other", "h2".to_string())
        .await
        .unwrap();
    assert_eq!(admin, again);

    assert!(matches!(
        office.register_user("alice", "dup", "x".to_string()).await,
        Err(TorbError::Duplicated)
    ));
}

// =============================================================================
// Reads racing writes on one node
// =============================================================================

/// Store that parks the next `active_reservations` call until released
struct GatedStore {
    inner: InMemoryInventory,
    armed: AtomicBool,
    reached: Notify,
    release: Notify,
}

impl GatedStore {
    fn new(inner: InMemoryInventory) -> Self {
        Self {
            inner,
            armed: AtomicBool::new(false),
            reached: Notify::new(),
            release: Notify::new(),
        }
    }

    fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl InventoryStore for GatedStore {
    async fn get_event(&self, event_id: i64) -> torb_core::Result<Option<EventRecord>> {
        self.inner.get_event(event_id).await
    }

    async fn list_events(&self) -> torb_core::Result<Vec<EventRecord>> {
        self.inner.list_events().await
    }

    async fn create_event(&self, input: NewEvent) -> torb_core::Result<EventRecord> {
        self.inner.create_event(input).await
    }

    async fn update_event_flags(
        &self,
        event_id: i64,
        public: bool,
        closed: bool,
    ) -> torb_core::Result<()> {
        self.inner.update_event_flags(event_id, public, closed).await
    }

    async fn list_sheets(&self) -> torb_core::Result<Vec<Sheet>> {
        self.inner.list_sheets().await
    }

    async fn find_sheet(&self, rank: Rank, num: i64) -> torb_core::Result<Option<Sheet>> {
        self.inner.find_sheet(rank, num).await
    }

    async fn active_reservations(&self, event_id: i64) -> torb_core::Result<Vec<ReservationRecord>> {
        let reservations = self.inner.active_reservations(event_id).await;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.reached.notify_one();
            self.release.notified().await;
        }
        reservations
    }

    async fn recent_reservations(
        &self,
        user_id: i64,
        limit: usize,
    ) -> torb_core::Result<Vec<ReservationActivity>> {
        self.inner.recent_reservations(user_id, limit).await
    }

    async fn total_spend(&self, user_id: i64) -> torb_core::Result<i64> {
        self.inner.total_spend(user_id).await
    }

    async fn recent_event_ids(&self, user_id: i64, limit: usize) -> torb_core::Result<Vec<i64>> {
        self.inner.recent_event_ids(user_id, limit).await
    }

    async fn sales_records(&self, event_id: Option<i64>) -> torb_core::Result<Vec<SalesRecord>> {
        self.inner.sales_records(event_id).await
    }

    async fn pick_free_sheet(&self, event_id: i64, rank: Rank) -> torb_core::Result<Option<Sheet>> {
        self.inner.pick_free_sheet(event_id, rank).await
    }

    async fn insert_reservation(&self, input: NewReservation) -> torb_core::Result<i64> {
        self.inner.insert_reservation(input).await
    }

    async fn lock_active_reservation(
        &self,
        event_id: i64,
        sheet_id: i64,
    ) -> torb_core::Result<Box<dyn SeatLock>> {
        self.inner.lock_active_reservation(event_id, sheet_id).await
    }

    async fn create_account(
        &self,
        kind: AccountKind,
        input: NewAccount,
    ) -> torb_core::Result<Principal> {
        self.inner.create_account(kind, input).await
    }

    async fn find_credentials(
        &self,
        kind: AccountKind,
        login_name: &str,
    ) -> torb_core::Result<Option<Credentials>> {
        self.inner.find_credentials(kind, login_name).await
    }

    async fn get_principal(&self, kind: AccountKind, id: i64) -> torb_core::Result<Option<Principal>> {
        self.inner.get_principal(kind, id).await
    }
}

fn gated_office(store: &Arc<GatedStore>) -> Arc<BoxOffice> {
    Arc::new(BoxOffice::new(store.clone(), Arc::new(NoopTransport), test_config()))
}

#[tokio::test]
async fn test_index_read_overtaken_by_claim_is_not_cached() {
    let store = Arc::new(GatedStore::new(InMemoryInventory::new(&layout(2, 0))));
    let office = gated_office(&store);
    let event_id = public_event(&office).await;
    let fan = user(&office, "fan").await;

    store.arm();
    let reader = tokio::spawn({
        let office = office.clone();
        async move { office.list_public_events().await }
    });
    store.reached.notified().await;

    office.claim_seat(event_id, "S", fan).await.unwrap();
    store.release.notify_one();

    // the in-flight read still answers with what it saw
    let overtaken = reader.await.unwrap().unwrap();
    assert_eq!(overtaken[0].remains, 2);

    let index = office.list_public_events().await.unwrap();
    assert_eq!(index[0].remains, 1);
    assert_eq!(index[0].sheets[&Rank::S].remains, 1);
}

#[tokio::test]
async fn test_dashboard_read_overtaken_by_claim_is_not_cached() {
    let store = Arc::new(GatedStore::new(InMemoryInventory::new(&layout(2, 0))));
    let office = gated_office(&store);
    let event_id = public_event(&office).await;
    let fan = user(&office, "fan").await;
    office.claim_seat(event_id, "S", fan).await.unwrap();

    store.arm();
    let reader = tokio::spawn({
        let office = office.clone();
        async move { office.resolve_user_dashboard(fan).await }
    });
    store.reached.notified().await;

    office.claim_seat(event_id, "S", fan).await.unwrap();
    store.release.notify_one();

    let overtaken = reader.await.unwrap().unwrap();
    assert_eq!(overtaken.recent_reservations.len(), 1);

    let dashboard = office.resolve_user_dashboard(fan).await.unwrap();
    assert_eq!(dashboard.recent_reservations.len(), 2);
    assert_eq!(dashboard.total_price, 12000);
}

// =============================================================================
// Two nodes
// =============================================================================

struct Pair {
    store: InMemoryInventory,
    a: Arc<BoxOffice>,
    b: Arc<BoxOffice>,
    a_to_b: Arc<LoopbackTransport>,
    b_to_a: Arc<LoopbackTransport>,
}

fn pair(cache: CacheConfig) -> Pair {
    let store = InMemoryInventory::new(&layout(5, 5));
    let a_to_b = Arc::new(LoopbackTransport::new());
    let b_to_a = Arc::new(LoopbackTransport::new());
    let config = test_config().with_cache(cache);
    let a = Arc::new(BoxOffice::new(
        Arc::new(store.clone()),
        a_to_b.clone(),
        config.clone(),
    ));
    let b = Arc::new(BoxOffice::new(Arc::new(store.clone()), b_to_a.clone(), config));
    a_to_b.link(b.cache());
    b_to_a.link(a.cache());
    Pair {
        store,
        a,
        b,
        a_to_b,
        b_to_a,
    }
}

#[tokio::test]
async fn test_mutation_invalidates_both_nodes() {
    let nodes = pair(CacheConfig::default());
    let event_id = public_event(&nodes.a).await;
    let fan = user(&nodes.a, "fan").await;

    // warm both nodes
    let before_a = nodes.a.resolve_user_dashboard(fan).await.unwrap();
    let before_b = nodes.b.resolve_user_dashboard(fan).await.unwrap();
    let index_b = nodes.b.list_public_events().await.unwrap();
    assert_eq!(before_a.total_price, 0);
    assert_eq!(before_b.total_price, 0);
    assert_eq!(index_b[0].remains, 10);

    nodes.a.claim_seat(event_id, "S", fan).await.unwrap();

    // the writing node never serves its own stale view
    assert_eq!(nodes.a.resolve_user_dashboard(fan).await.unwrap().total_price, 6000);
    // the peer was told
    assert!(!nodes.b.cache().has_user(fan));
    assert!(!nodes.b.cache().has_index());
    assert_eq!(nodes.b.resolve_user_dashboard(fan).await.unwrap().total_price, 6000);
    assert_eq!(nodes.b.list_public_events().await.unwrap()[0].remains, 9);

    // peer-applied invalidations are not echoed back
    assert_eq!(nodes.b_to_a.delivered(), 0);
    assert!(nodes.a_to_b.delivered() >= 1);
}

#[tokio::test(start_paused = true)]
async fn test_lost_notification_is_bounded_by_expiry() {
    let nodes = pair(CacheConfig::default().with_max_age(Duration::from_secs(30)));
    let event_id = public_event(&nodes.a).await;
    let fan = user(&nodes.a, "fan").await;

    nodes.b.resolve_user_dashboard(fan).await.unwrap();
    nodes.a_to_b.set_connected(false);

    nodes.a.claim_seat(event_id, "S", fan).await.unwrap();
    assert_eq!(nodes.a.resolve_user_dashboard(fan).await.unwrap().total_price, 6000);

    // node B is stale until its entry expires
    assert_eq!(nodes.b.resolve_user_dashboard(fan).await.unwrap().total_price, 0);
    assert!(nodes.a_to_b.dropped() >= 1);

    tokio::time::advance(Duration::from_secs(31)).await;
    assert_eq!(nodes.b.resolve_user_dashboard(fan).await.unwrap().total_price, 6000);
}

#[tokio::test]
async fn test_peer_invalidation_endpoints_apply_locally() {
    let nodes = pair(CacheConfig::default());
    public_event(&nodes.a).await;
    let fan = user(&nodes.a, "fan").await;

    nodes.b.resolve_user_dashboard(fan).await.unwrap();
    nodes.b.list_public_events().await.unwrap();
    let sent_before = nodes.b_to_a.delivered();

    nodes.b.invalidate_user(fan);
    nodes.b.invalidate_index();
    nodes.b.invalidate_index();

    assert!(!nodes.b.cache().has_user(fan));
    assert!(!nodes.b.cache().has_index());
    assert_eq!(nodes.b_to_a.delivered(), sent_before);
    assert_eq!(nodes.store.list_events().await.unwrap().len(), 1);

    nodes.b.shutdown();
    assert_eq!(nodes.b.cache().cached_users(), 0);
}
