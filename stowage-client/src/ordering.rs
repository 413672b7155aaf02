//! Request-ordering guard.
//!
//! Tracks the most recently started request at one call site (a detail pane,
//! a search box). A load that completes after a newer one started must not
//! apply its result; the guard tells it so.
//!
//! The guard never cancels anything. Callers check [`RequestGuard::is_latest`]
//! before writing shared state and call [`RequestGuard::finish`] afterwards.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Cooperative "is this still the latest request" tracker.
///
/// Cloning is cheap; clones share the active token.
pub struct RequestGuard<K> {
    active: Arc<Mutex<Option<K>>>,
}

impl<K> Clone for RequestGuard<K> {
    fn clone(&self) -> Self {
        Self {
            active: Arc::clone(&self.active),
        }
    }
}

impl<K> Default for RequestGuard<K> {
    fn default() -> Self {
        Self {
            active: Arc::new(Mutex::new(None)),
        }
    }
}

impl<K: fmt::Debug> fmt::Debug for RequestGuard<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestGuard")
            .field("active", &*self.lock())
            .finish()
    }
}

impl<K> RequestGuard<K> {
    fn lock(&self) -> MutexGuard<'_, Option<K>> {
        match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Request guard lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl<K> RequestGuard<K>
where
    K: Clone + PartialEq + fmt::Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key` as the active request unless it already is.
    ///
    /// Returns `false` for a duplicate start of the active, unfinished key.
    /// Any other key supersedes whatever was active.
    pub fn should_start(&self, key: &K) -> bool {
        let mut active = self.lock();
        if active.as_ref() == Some(key) {
            tracing::trace!(key = ?key, "Request already active, not starting");
            return false;
        }
        if let Some(previous) = active.as_ref() {
            tracing::trace!(key = ?key, superseded = ?previous, "Request supersedes active request");
        }
        *active = Some(key.clone());
        true
    }

    /// Whether `key` is still the active request.
    pub fn is_latest(&self, key: &K) -> bool {
        self.lock().as_ref() == Some(key)
    }

    /// Clear the active request if it is still `key`.
    pub fn finish(&self, key: &K) {
        let mut active = self.lock();
        if active.as_ref() == Some(key) {
            *active = None;
        }
    }

    /// [`should_start`](Self::should_start) returning a ticket bound to `key`.
    pub fn begin(&self, key: K) -> Option<RequestTicket<K>> {
        self.should_start(&key).then(|| RequestTicket {
            guard: self.clone(),
            key: Some(key),
        })
    }
}

/// A started request. Finishes itself when dropped.
#[must_use = "dropping a RequestTicket finishes the request immediately"]
pub struct RequestTicket<K>
where
    K: Clone + PartialEq + fmt::Debug,
{
    guard: RequestGuard<K>,
    key: Option<K>,
}

impl<K> RequestTicket<K>
where
    K: Clone + PartialEq + fmt::Debug,
{
    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    pub fn is_latest(&self) -> bool {
        self.key
            .as_ref()
            .is_some_and(|key| self.guard.is_latest(key))
    }

    pub fn finish(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(key) = self.key.take() {
            self.guard.finish(&key);
        }
    }
}

impl<K> Drop for RequestTicket<K>
where
    K: Clone + PartialEq + fmt::Debug,
{
    fn drop(&mut self) {
        self.release();
    }
}

impl<K> fmt::Debug for RequestTicket<K>
where
    K: Clone + PartialEq + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestTicket").field("key", &self.key).finish()
    }
}
