// Integration tests for the Postgres inventory store
//
// These tests require a running Postgres instance.
// Run with: DATABASE_URL=postgres://... cargo test -p torb-storage -- --ignored

use std::sync::Arc;

use chrono::Utc;
use torb_core::{
    AccountKind, BoxOffice, BoxOfficeConfig, InventoryStore, NewAccount, NewEvent,
    NewReservation, NoopTransport, Rank, RetryPolicy, TorbError,
};
use torb_storage::{Database, DbInventoryStore};

async fn store() -> DbInventoryStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = Database::from_url(&url).await.expect("connect");
    db.migrate().await.expect("migrate");
    DbInventoryStore::new(db)
}

async fn fresh_event(store: &DbInventoryStore) -> i64 {
    store
        .create_event(NewEvent {
            title: "pg test".to_string(),
            public: true,
            price: 1000,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_seeded_sheets() {
    let store = store().await;
    let sheets = store.list_sheets().await.unwrap();
    assert_eq!(sheets.len(), 1000);
    assert_eq!(sheets[0].rank, Rank::A);
    assert_eq!(sheets[0].num, 1);
    assert_eq!(sheets.last().unwrap().rank, Rank::S);

    let s1 = store.find_sheet(Rank::S, 1).await.unwrap().unwrap();
    assert_eq!(s1.price, 5000);
    assert!(store.find_sheet(Rank::S, 51).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_partial_unique_index_rejects_second_active_reservation() {
    let store = store().await;
    let event_id = fresh_event(&store).await;
    let input = NewReservation {
        event_id,
        sheet_id: 1,
        user_id: 1,
        reserved_at: Utc::now(),
    };

    store.insert_reservation(input.clone()).await.unwrap();
    let err = store.insert_reservation(input.clone()).await.unwrap_err();
    assert!(matches!(err, TorbError::Conflict(_)));

    let lock = store.lock_active_reservation(event_id, 1).await.unwrap();
    assert!(lock.reservation().is_some());
    lock.cancel(Utc::now()).await.unwrap();

    // a canceled row no longer blocks the seat
    store.insert_reservation(input).await.unwrap();
    assert_eq!(store.active_reservations(event_id).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_claims_against_postgres() {
    let store = store().await;
    let event_id = fresh_event(&store).await;
    let office = Arc::new(BoxOffice::new(
        Arc::new(store.clone()),
        Arc::new(NoopTransport),
        BoxOfficeConfig::new().with_retry(RetryPolicy::bounded(200)),
    ));

    let mut handles = Vec::new();
    for user_id in 1..=60 {
        let office = office.clone();
        handles.push(tokio::spawn(async move {
            office.claim_seat(event_id, "S", user_id).await
        }));
    }
    let mut won = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(TorbError::SoldOut) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(won, 50);

    let view = office.resolve_event(event_id, None).await.unwrap();
    assert_eq!(view.sheets[&Rank::S].remains, 0);
    assert_eq!(view.remains, view.total - 50);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_duplicate_login_maps_to_duplicated() {
    let store = store().await;
    let login = format!("pg-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default());
    let input = NewAccount {
        login_name: login.clone(),
        nickname: "pg".to_string(),
        pass_hash: "x".to_string(),
    };

    let created = store.create_account(AccountKind::User, input.clone()).await.unwrap();
    let err = store.create_account(AccountKind::User, input).await.unwrap_err();
    assert!(matches!(err, TorbError::Duplicated));

    let found = store
        .find_credentials(AccountKind::User, &login)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, created.id);
}
