// Per-process view caches
//
// TorbCache owns two caches: one computed dashboard per user, and a single
// slot holding the public event index. Both are advisory. Any entry can be
// dropped at any time and recomputed from the store.
//
// Decision: every invalidation carries its origin. Local invalidations are
// relayed to the peer node through the InvalidationTransport; invalidations
// received from the peer are applied locally only, so two nodes never
// ping-pong notifications.
//
// A reader that misses takes a generation token before it queries the store
// and hands it back with the computed view. Every invalidation bumps the
// slot's generation, so a view computed before a mutation is dropped instead
// of cached. Entries optionally expire after `CacheConfig::max_age`, which
// bounds staleness when a peer notification is lost.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::config::CacheConfig;
use crate::dashboard::DashboardView;
use crate::event::EventView;
use crate::traits::InvalidationTransport;

/// Where an invalidation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationOrigin {
    /// A mutation on this node; the peer must be told
    Local,
    /// Relayed by the peer; apply locally only
    Peer,
}

/// Snapshot of a slot's generation, taken before reading the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

#[derive(Debug)]
struct Entry<T> {
    stored_at: Instant,
    value: Arc<T>,
}

impl<T> Entry<T> {
    fn new(value: Arc<T>) -> Self {
        Self {
            stored_at: Instant::now(),
            value,
        }
    }

    fn is_fresh(&self, max_age: Option<Duration>) -> bool {
        match max_age {
            Some(max_age) => self.stored_at.elapsed() < max_age,
            None => true,
        }
    }
}

#[derive(Debug, Default)]
struct UserSlots {
    entries: HashMap<i64, Entry<DashboardView>>,
    generations: HashMap<i64, u64>,
}

impl UserSlots {
    fn generation(&self, user_id: i64) -> u64 {
        self.generations.get(&user_id).copied().unwrap_or(0)
    }
}

#[derive(Debug, Default)]
struct IndexSlot {
    entry: Option<Entry<Vec<EventView>>>,
    generation: u64,
}

impl IndexSlot {
    fn reset(&mut self) {
        self.entry = None;
        self.generation += 1;
    }
}

/// Cache service owned by one box office node
pub struct TorbCache {
    users: RwLock<UserSlots>,
    index: RwLock<IndexSlot>,
    transport: Arc<dyn InvalidationTransport>,
    max_age: Option<Duration>,
}

impl TorbCache {
    pub fn new(transport: Arc<dyn InvalidationTransport>, config: &CacheConfig) -> Self {
        Self {
            users: RwLock::new(UserSlots::default()),
            index: RwLock::new(IndexSlot::default()),
            transport,
            max_age: config.max_age,
        }
    }

    // ---- per-user dashboards ----

    pub fn has_user(&self, user_id: i64) -> bool {
        self.get_user(user_id).is_some()
    }

    pub fn get_user(&self, user_id: i64) -> Option<Arc<DashboardView>> {
        self.users
            .read()
            .entries
            .get(&user_id)
            .filter(|e| e.is_fresh(self.max_age))
            .map(|e| e.value.clone())
    }

    pub fn user_generation(&self, user_id: i64) -> Generation {
        Generation(self.users.read().generation(user_id))
    }

    /// Store a dashboard computed after `generation` was taken.
    ///
    /// The view is returned either way; it is only cached when no
    /// invalidation of this user happened in between.
    pub fn set_user(
        &self,
        user_id: i64,
        generation: Generation,
        view: DashboardView,
    ) -> Arc<DashboardView> {
        let value = Arc::new(view);
        let mut users = self.users.write();
        if users.generation(user_id) == generation.0 {
            users.entries.insert(user_id, Entry::new(value.clone()));
        } else {
            debug!(user_id, "Dashboard invalidated while computing, not cached");
        }
        value
    }

    /// Drop a user's dashboard and the index.
    ///
    /// The index is cleared too: a user's claim or cancel changes the
    /// remaining counts it shows.
    pub fn invalidate_user(&self, user_id: i64, origin: InvalidationOrigin) {
        {
            let mut users = self.users.write();
            users.entries.remove(&user_id);
            *users.generations.entry(user_id).or_insert(0) += 1;
        }
        self.index.write().reset();
        debug!(user_id, ?origin, "User cache invalidated");

        if origin == InvalidationOrigin::Local {
            self.transport.notify_user_invalidated(user_id);
        }
    }

    // ---- public event index ----

    pub fn has_index(&self) -> bool {
        self.get_index().is_some()
    }

    pub fn get_index(&self) -> Option<Arc<Vec<EventView>>> {
        self.index
            .read()
            .entry
            .as_ref()
            .filter(|e| e.is_fresh(self.max_age))
            .map(|e| e.value.clone())
    }

    pub fn index_generation(&self) -> Generation {
        Generation(self.index.read().generation)
    }

    /// Store an index computed after `generation` was taken
    pub fn set_index(&self, generation: Generation, events: Vec<EventView>) -> Arc<Vec<EventView>> {
        let value = Arc::new(events);
        let mut index = self.index.write();
        if index.generation == generation.0 {
            index.entry = Some(Entry::new(value.clone()));
        } else {
            debug!("Index invalidated while computing, not cached");
        }
        value
    }

    pub fn invalidate_index(&self, origin: InvalidationOrigin) {
        self.index.write().reset();
        debug!(?origin, "Index cache invalidated");

        if origin == InvalidationOrigin::Local {
            self.transport.notify_index_invalidated();
        }
    }

    /// Drop everything without notifying the peer
    pub fn clear(&self) {
        {
            let mut users = self.users.write();
            let UserSlots {
                entries,
                generations,
            } = &mut *users;
            for user_id in entries.drain().map(|(id, _)| id) {
                *generations.entry(user_id).or_insert(0) += 1;
            }
        }
        self.index.write().reset();
    }

    pub fn cached_users(&self) -> usize {
        self.users.read().entries.len()
    }
}
