// Postgres storage layer with sqlx
//
// This crate provides database implementations for core traits:
// - DbInventoryStore: implements InventoryStore for events, seats and reservations
// - StorageBackend: picks Postgres or the in-memory inventory at startup

pub mod backend;
pub mod inventory_store;
pub mod models;
pub mod password;
pub mod repositories;

pub use backend::StorageBackend;
pub use inventory_store::DbInventoryStore;
pub use models::*;
pub use password::{hash_password, password_matches};
pub use repositories::*;
