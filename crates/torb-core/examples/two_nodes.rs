//! Two Nodes Example - Cross-node cache invalidation in one process
//!
//! Runs two box office nodes against one in-memory store and shows that a
//! claim on node A evicts the cached dashboard on node B.
//!
//! Run with: cargo run -p torb-core --example two_nodes

use std::sync::Arc;

use torb_core::{BoxOffice, BoxOfficeConfig, InMemoryInventory, LoopbackTransport, NewEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "torb_core=debug".into()),
        )
        .init();

    println!("=== Two Nodes (torb-core) ===\n");

    // 1. One shared store, two transports pointing at each other
    let store = InMemoryInventory::standard();
    let a_to_b = Arc::new(LoopbackTransport::new());
    let b_to_a = Arc::new(LoopbackTransport::new());

    let node_a = BoxOffice::new(Arc::new(store.clone()), a_to_b.clone(), BoxOfficeConfig::new());
    let node_b = BoxOffice::new(Arc::new(store), b_to_a.clone(), BoxOfficeConfig::new());
    a_to_b.link(node_b.cache());
    b_to_a.link(node_a.cache());

    // 2. Seed an event and a user
    let event = node_a
        .create_event(NewEvent {
            title: "Opening Night".to_string(),
            public: true,
            price: 1000,
        })
        .await?;
    let fan = node_a
        .register_user("fan", "Fan", "not-a-real-hash".to_string())
        .await?;

    // 3. Warm node B, then mutate on node A
    let before = node_b.resolve_user_dashboard(fan.id).await?;
    println!("node B before: total_price={}", before.total_price);

    let seat = node_a.claim_seat(event.id, "S", fan.id).await?;
    println!("node A claimed {}-{}", seat.sheet_rank, seat.sheet_num);

    // 4. Node B recomputes because node A told it to
    let after = node_b.resolve_user_dashboard(fan.id).await?;
    println!("node B after:  total_price={}", after.total_price);

    Ok(())
}
