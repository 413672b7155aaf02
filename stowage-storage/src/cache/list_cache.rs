//! Read-through cache for reference lists.
//!
//! One `ListCache` exists per resource kind. Entries are keyed by an opaque
//! string (kind plus query parameters, e.g. `"rooms:false"`) and hold the
//! last settled fetch, either data or an error.
//!
//! # Guarantees
//!
//! - At most one fetch is outstanding per key. A `load` for a key that is
//!   already loading returns the pending load instead of fetching again.
//! - Every load captures the key's [`Generation`] when it starts. If the key
//!   is invalidated before the fetch settles, the result is dropped: no entry
//!   is written and no subscriber is called.
//!
//! Inside a tokio runtime, `load` spawns the fetch immediately, so
//! subscribers are notified even if the returned [`PendingLoad`] is dropped.
//! Outside a runtime the fetch starts when some clone of the pending load is
//! first polled.
//!
//! State lives behind a `std::sync::Mutex` that is never held across an
//! `.await` or while subscriber callbacks run.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use stowage_core::StoreError;

use super::generation::Generation;
use super::stats::CacheStats;

/// Outcome of a list fetch.
pub type FetchResult<T> = Result<Vec<T>, StoreError>;

/// Future returned by [`ListCache::load`]; shared by every concurrent caller.
pub type PendingLoad = Shared<BoxFuture<'static, ()>>;

type Callback<T> = Arc<dyn Fn(&[T], Option<&StoreError>) + Send + Sync>;

/// Settled state of one key.
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub data: Arc<[T]>,
    pub error: Option<StoreError>,
}

impl<T> CacheEntry<T> {
    fn loaded(data: Vec<T>) -> Self {
        Self {
            data: Arc::from(data),
            error: None,
        }
    }

    fn failed(error: StoreError) -> Self {
        Self {
            data: Arc::from(Vec::new()),
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            error: self.error.clone(),
        }
    }
}

struct InFlight {
    generation: Generation,
    pending: PendingLoad,
}

struct KeyState<T> {
    generation: Generation,
    entry: Option<CacheEntry<T>>,
    in_flight: Option<InFlight>,
    subscribers: Vec<(u64, Callback<T>)>,
}

impl<T> Default for KeyState<T> {
    fn default() -> Self {
        Self {
            generation: Generation::ZERO,
            entry: None,
            in_flight: None,
            subscribers: Vec::new(),
        }
    }
}

struct CacheState<T> {
    keys: HashMap<String, KeyState<T>>,
    next_subscriber_id: u64,
    stats: CacheStats,
}

impl<T> Default for CacheState<T> {
    fn default() -> Self {
        Self {
            keys: HashMap::new(),
            next_subscriber_id: 0,
            stats: CacheStats::default(),
        }
    }
}

fn lock_state<T>(state: &Mutex<CacheState<T>>) -> MutexGuard<'_, CacheState<T>> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("List cache lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Handle returned by [`ListCache::subscribe`].
///
/// Dropping the handle (or calling [`Subscription::unsubscribe`]) removes the
/// callback.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Keyed read-through cache for small lists.
///
/// Cloning is cheap and every clone shares the same state.
pub struct ListCache<T> {
    name: Arc<str>,
    state: Arc<Mutex<CacheState<T>>>,
}

impl<T> Clone for ListCache<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> fmt::Debug for ListCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListCache")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<T> ListCache<T>
where
    T: Send + Sync + 'static,
{
    /// Create an empty cache. `name` only appears in log fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the settled entry for `key`. Never starts a fetch.
    pub fn get(&self, key: &str) -> Option<CacheEntry<T>> {
        let mut guard = lock_state(&self.state);
        let CacheState { keys, stats, .. } = &mut *guard;
        let entry = keys.get(key).and_then(|slot| slot.entry.clone());
        if entry.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        entry
    }

    /// Register `callback` to run every time `key` settles.
    pub fn subscribe<F>(&self, key: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&[T], Option<&StoreError>) + Send + Sync + 'static,
    {
        let key = key.into();
        let id = {
            let mut guard = lock_state(&self.state);
            let id = guard.next_subscriber_id;
            guard.next_subscriber_id += 1;
            guard
                .keys
                .entry(key.clone())
                .or_default()
                .subscribers
                .push((id, Arc::new(callback)));
            id
        };

        let state = Arc::downgrade(&self.state);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(state) = state.upgrade() {
                    let mut guard = lock_state(&state);
                    if let Some(slot) = guard.keys.get_mut(&key) {
                        slot.subscribers.retain(|(existing, _)| *existing != id);
                    }
                }
            })),
        }
    }

    /// Fetch `key` unless a fetch for it is already in flight.
    ///
    /// The fetch is spawned on the current tokio runtime right away. The
    /// returned pending load may be dropped; awaiting it waits until the
    /// fetch has settled and subscribers have been notified (or the result
    /// was dropped as stale).
    pub fn load<F, Fut>(&self, key: impl Into<String>, fetch: F) -> PendingLoad
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = FetchResult<T>> + Send + 'static,
    {
        let key = key.into();
        let mut guard = lock_state(&self.state);
        let CacheState { keys, stats, .. } = &mut *guard;
        let slot = keys.entry(key.clone()).or_default();

        if let Some(in_flight) = &slot.in_flight {
            stats.deduplicated_loads += 1;
            tracing::trace!(cache = %self.name, key = %key, "Joining in-flight fetch");
            return in_flight.pending.clone();
        }

        let generation = slot.generation;
        let pending = settle(
            Arc::downgrade(&self.state),
            Arc::clone(&self.name),
            key.clone(),
            generation,
            fetch,
        )
        .boxed()
        .shared();
        slot.in_flight = Some(InFlight {
            generation,
            pending: pending.clone(),
        });
        stats.fetches += 1;
        tracing::trace!(cache = %self.name, key = %key, generation = %generation, "Starting fetch");
        drop(guard);

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(pending.clone());
            }
            Err(_) => {
                tracing::debug!(cache = %self.name, key = %key, "No runtime, fetch runs when awaited");
            }
        }
        pending
    }

    /// Drop the entry and in-flight marker for `key` and start a new epoch.
    ///
    /// Subscribers are not notified; the next `load` refreshes them.
    pub fn invalidate(&self, key: &str) {
        let mut guard = lock_state(&self.state);
        let CacheState { keys, stats, .. } = &mut *guard;
        let slot = keys.entry(key.to_string()).or_default();
        slot.generation = slot.generation.next();
        slot.entry = None;
        slot.in_flight = None;
        stats.invalidations += 1;
        tracing::debug!(cache = %self.name, key = %key, generation = %slot.generation, "Invalidated key");
    }

    /// Invalidate every key this cache has seen.
    pub fn invalidate_all(&self) {
        let mut guard = lock_state(&self.state);
        let CacheState { keys, stats, .. } = &mut *guard;
        for slot in keys.values_mut() {
            slot.generation = slot.generation.next();
            slot.entry = None;
            slot.in_flight = None;
            stats.invalidations += 1;
        }
        tracing::debug!(cache = %self.name, keys = keys.len(), "Invalidated all keys");
    }

    /// Current generation of `key`.
    pub fn generation(&self, key: &str) -> Generation {
        lock_state(&self.state)
            .keys
            .get(key)
            .map(|slot| slot.generation)
            .unwrap_or_default()
    }

    /// Whether a fetch for `key` is outstanding.
    pub fn is_loading(&self, key: &str) -> bool {
        lock_state(&self.state)
            .keys
            .get(key)
            .is_some_and(|slot| slot.in_flight.is_some())
    }

    pub fn subscriber_count(&self, key: &str) -> usize {
        lock_state(&self.state)
            .keys
            .get(key)
            .map(|slot| slot.subscribers.len())
            .unwrap_or(0)
    }

    pub fn stats(&self) -> CacheStats {
        let guard = lock_state(&self.state);
        let mut stats = guard.stats.clone();
        stats.entry_count = guard
            .keys
            .values()
            .filter(|slot| slot.entry.is_some())
            .count() as u64;
        stats
    }
}

async fn settle<T, F, Fut>(
    state: Weak<Mutex<CacheState<T>>>,
    name: Arc<str>,
    key: String,
    generation: Generation,
    fetch: F,
) where
    T: Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = FetchResult<T>>,
{
    let result = fetch().await;

    // Cache dropped while the fetch was running.
    let Some(state) = state.upgrade() else {
        return;
    };

    let (entry, subscribers) = {
        let mut guard = lock_state(&state);
        let CacheState { keys, stats, .. } = &mut *guard;
        let Some(slot) = keys.get_mut(&key) else {
            return;
        };

        // Only clear the marker this load installed.
        if slot
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.generation == generation)
        {
            slot.in_flight = None;
        }

        if slot.generation != generation {
            stats.stale_discards += 1;
            tracing::debug!(
                cache = %name,
                key = %key,
                started_at = %generation,
                current = %slot.generation,
                "Discarding stale fetch result"
            );
            return;
        }

        let entry = match result {
            Ok(data) => {
                tracing::trace!(cache = %name, key = %key, rows = data.len(), "Fetch settled");
                CacheEntry::loaded(data)
            }
            Err(error) => {
                tracing::warn!(cache = %name, key = %key, error = %error, "Fetch failed");
                CacheEntry::failed(error)
            }
        };
        slot.entry = Some(entry.clone());
        let subscribers: Vec<Callback<T>> = slot
            .subscribers
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        (entry, subscribers)
    };

    for notify in subscribers {
        notify(&entry.data[..], entry.error.as_ref());
    }
}
