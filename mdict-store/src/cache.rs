/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Payload cache shared between dictionary managers.
//!
//! [`DictionaryCache`] puts the payload store and the pending fetch tracker
//! behind one lock, so every manager holding the same cache sees the same
//! in-flight fetches and at most one FULL fetch per identity goes upstream
//! across all of them.
//!
//! Only the manager that issued a fetch receives its answer. Waiters that
//! belong to other managers are parked as [`Handoff`]s in their owner's
//! queue and collected with [`DictionaryCache::take_handoffs`].

use crate::memory::MemoryStore;
use crate::pending::{FullRequest, PendingRequestTracker};
use crate::traits::PayloadStore;
use bytes::Bytes;
use mdict_core::types::{DictionaryIdentity, SessionHandle, Status};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Identifies one participant of a [`DictionaryCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(u64);

impl OwnerId {
    /// Returns the raw value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A session queued on a shared fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waiter {
    /// Participant owning the session.
    pub owner: OwnerId,
    /// The session itself.
    pub handle: SessionHandle,
}

impl Waiter {
    /// Creates a waiter.
    #[must_use]
    pub const fn new(owner: OwnerId, handle: SessionHandle) -> Self {
        Self { owner, handle }
    }
}

/// Outcome of a fetch issued by another participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handoff {
    /// The payload is cached; deliver it to the session.
    Ready {
        /// Waiting session.
        handle: SessionHandle,
        /// Identity whose payload is now cached.
        identity: DictionaryIdentity,
    },
    /// The fetch ended with a status.
    Failed {
        /// Waiting session.
        handle: SessionHandle,
        /// Identity whose fetch failed.
        identity: DictionaryIdentity,
        /// Status reported upstream.
        status: Status,
    },
}

impl Handoff {
    /// Returns the session the handoff is for.
    #[must_use]
    pub const fn handle(&self) -> SessionHandle {
        match self {
            Self::Ready { handle, .. } | Self::Failed { handle, .. } => *handle,
        }
    }
}

struct CacheState {
    tracker: PendingRequestTracker<Waiter>,
    handoffs: HashMap<OwnerId, VecDeque<Handoff>>,
    next_owner: u64,
}

impl CacheState {
    /// Splits released waiters into the caller's own sessions and handoffs
    /// queued for everybody else.
    fn dispatch<F>(&mut self, owner: OwnerId, waiters: Vec<Waiter>, mut handoff: F) -> Vec<SessionHandle>
    where
        F: FnMut(SessionHandle) -> Handoff,
    {
        let mut own = Vec::new();
        for waiter in waiters {
            if waiter.owner == owner {
                own.push(waiter.handle);
            } else if let Some(queue) = self.handoffs.get_mut(&waiter.owner) {
                queue.push_back(handoff(waiter.handle));
            }
        }
        own
    }
}

/// Payload store and fetch coalescer shared by several managers.
pub struct DictionaryCache {
    store: Arc<dyn PayloadStore>,
    state: Mutex<CacheState>,
}

impl fmt::Debug for DictionaryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DictionaryCache")
            .field("cached", &self.store.len())
            .field("pending", &state.tracker.pending_count())
            .field("owners", &state.handoffs.len())
            .finish()
    }
}

impl Default for DictionaryCache {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl DictionaryCache {
    /// Creates a cache over `store`.
    ///
    /// Managers coalesce fetches only when they hold the same cache, not
    /// merely the same store.
    #[must_use]
    pub fn new(store: Arc<dyn PayloadStore>) -> Self {
        Self {
            state: Mutex::new(CacheState {
                tracker: PendingRequestTracker::new(Arc::clone(&store)),
                handoffs: HashMap::new(),
                next_owner: 1,
            }),
            store,
        }
    }

    /// Creates a cache over a fresh [`MemoryStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Returns the payload store.
    #[must_use]
    pub const fn store(&self) -> &Arc<dyn PayloadStore> {
        &self.store
    }

    /// Registers a new participant.
    pub fn register(&self) -> OwnerId {
        let mut state = self.state.lock();
        let owner = OwnerId(state.next_owner);
        state.next_owner += 1;
        state.handoffs.insert(owner, VecDeque::new());
        debug!(%owner, "cache participant registered");
        owner
    }

    /// Removes a participant, its queued waiters and its undelivered handoffs.
    pub fn unregister(&self, owner: OwnerId) {
        let mut state = self.state.lock();
        state.handoffs.remove(&owner);
        let removed = state.tracker.retain_waiters(|w| w.owner != owner);
        debug!(%owner, removed, "cache participant unregistered");
    }

    /// Requests the FULL payload of `identity` for `waiter`.
    ///
    /// `issue_fetch` runs under the cache lock, at most once, and only if
    /// neither the store nor any participant already has the payload on its
    /// way. It must not call back into the cache.
    ///
    /// # Errors
    /// Returns whatever `issue_fetch` returns; nothing is recorded then.
    pub fn request_full<E, F>(
        &self,
        identity: &DictionaryIdentity,
        waiter: Waiter,
        issue_fetch: F,
    ) -> Result<FullRequest, E>
    where
        F: FnOnce(&DictionaryIdentity) -> Result<(), E>,
    {
        self.state
            .lock()
            .tracker
            .request_full(identity, waiter, issue_fetch)
    }

    /// Caches the payload of a fetch issued by `owner` and releases its waiters.
    ///
    /// # Returns
    /// The waiting sessions of `owner`, in join order. Sessions of other
    /// participants receive a [`Handoff::Ready`].
    pub fn complete(
        &self,
        owner: OwnerId,
        identity: &DictionaryIdentity,
        payload: Bytes,
    ) -> Vec<SessionHandle> {
        let mut state = self.state.lock();
        let waiters = state.tracker.on_full_received(identity, payload);
        let total = waiters.len();
        let own = state.dispatch(owner, waiters, |handle| Handoff::Ready {
            handle,
            identity: identity.clone(),
        });
        if own.len() < total {
            info!(%owner, dictionary = %identity, handed_off = total - own.len(), "payload handed to other participants");
        }
        own
    }

    /// Abandons a fetch issued by `owner` after an upstream status.
    ///
    /// # Returns
    /// The waiting sessions of `owner`, in join order. Sessions of other
    /// participants receive a [`Handoff::Failed`].
    pub fn fail(
        &self,
        owner: OwnerId,
        identity: &DictionaryIdentity,
        status: &Status,
    ) -> Vec<SessionHandle> {
        let mut state = self.state.lock();
        let waiters = state.tracker.fail(identity);
        state.dispatch(owner, waiters, |handle| Handoff::Failed {
            handle,
            identity: identity.clone(),
            status: status.clone(),
        })
    }

    /// Removes one waiter from the queue of `identity`.
    pub fn remove_waiter(&self, identity: &DictionaryIdentity, waiter: Waiter) -> bool {
        self.state.lock().tracker.remove_waiter(identity, waiter)
    }

    /// Takes the handoffs queued for `owner`, oldest first.
    pub fn take_handoffs(&self, owner: OwnerId) -> Vec<Handoff> {
        self.state
            .lock()
            .handoffs
            .get_mut(&owner)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default()
    }

    /// Returns true if a fetch for `identity` is in flight.
    #[must_use]
    pub fn is_pending(&self, identity: &DictionaryIdentity) -> bool {
        self.state.lock().tracker.is_pending(identity)
    }

    /// Returns the number of waiters queued on `identity`, across participants.
    #[must_use]
    pub fn waiter_count(&self, identity: &DictionaryIdentity) -> usize {
        self.state.lock().tracker.waiter_count(identity)
    }

    /// Returns the number of fetches in flight.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state.lock().tracker.pending_count()
    }
}
