// Storage backend selection
// Decision: Use enum dispatch for choosing the backend, trait objects past that point
//
// A node runs either against PostgreSQL (production) or against the
// in-memory inventory (dev mode, no DATABASE_URL).

use std::sync::Arc;

use anyhow::Result;
use torb_core::{InMemoryInventory, InventoryStore};
use tracing::info;

use crate::inventory_store::DbInventoryStore;
use crate::repositories::Database;

#[derive(Clone)]
pub enum StorageBackend {
    /// PostgreSQL database (production)
    Postgres(DbInventoryStore),
    /// In-memory inventory seeded with the standard venue (dev mode)
    InMemory(InMemoryInventory),
}

impl StorageBackend {
    /// Connect to PostgreSQL and apply migrations
    pub async fn postgres(database_url: &str) -> Result<Self> {
        let db = Database::from_url(database_url).await?;
        db.migrate().await?;
        info!("Connected to PostgreSQL, migrations applied");
        Ok(Self::Postgres(DbInventoryStore::new(db)))
    }

    pub fn in_memory() -> Self {
        info!("Using in-memory inventory (dev mode)");
        Self::InMemory(InMemoryInventory::standard())
    }

    /// Postgres when a URL is given, in-memory otherwise
    pub async fn from_url(database_url: Option<&str>) -> Result<Self> {
        match database_url {
            Some(url) => Self::postgres(url).await,
            None => Ok(Self::in_memory()),
        }
    }

    pub fn is_dev_mode(&self) -> bool {
        matches!(self, Self::InMemory(_))
    }

    pub fn into_store(self) -> Arc<dyn InventoryStore> {
        match self {
            Self::Postgres(store) => Arc::new(store),
            Self::InMemory(store) => Arc::new(store),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_url_means_dev_mode() {
        let backend = StorageBackend::from_url(None).await.unwrap();
        assert!(backend.is_dev_mode());

        let store = backend.into_store();
        assert_eq!(store.list_sheets().await.unwrap().len(), 1000);
    }
}
