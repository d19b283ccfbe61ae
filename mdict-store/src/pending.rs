/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Coalescing of in-flight FULL fetches.
//!
//! The tracker guarantees at most one outstanding upstream FULL fetch per
//! dictionary identity. Every requester that arrives while a fetch is in
//! flight joins the waiter list of that identity and is handed the payload,
//! in join order, when it arrives.
//!
//! There is no timeout: a fetch that is never answered keeps its waiters
//! until they are removed or the fetch is failed explicitly.

use crate::traits::PayloadStore;
use bytes::Bytes;
use mdict_core::types::DictionaryIdentity;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of [`PendingRequestTracker::request_full`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FullRequest {
    /// The payload is already cached; deliver it now.
    Cached(Bytes),
    /// A fetch is already in flight and the waiter joined its queue.
    Joined {
        /// Number of waiters queued, this one included.
        waiters: usize,
    },
    /// A new upstream fetch was issued with this waiter as the first in line.
    Issued,
}

/// Tracks FULL fetches in flight and the waiters queued on each.
pub struct PendingRequestTracker<W> {
    store: Arc<dyn PayloadStore>,
    pending: HashMap<DictionaryIdentity, VecDeque<W>>,
}

impl<W> std::fmt::Debug for PendingRequestTracker<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequestTracker")
            .field("cached", &self.store.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl<W: Copy + PartialEq + std::fmt::Debug> PendingRequestTracker<W> {
    /// Creates a tracker backed by the given store.
    #[must_use]
    pub fn new(store: Arc<dyn PayloadStore>) -> Self {
        Self {
            store,
            pending: HashMap::new(),
        }
    }

    /// Returns the backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn PayloadStore> {
        &self.store
    }

    /// Requests the FULL payload of `identity` on behalf of `waiter`.
    ///
    /// Checks the store, then the in-flight fetches, and only then calls
    /// `issue_fetch`, exactly once, to start a new upstream fetch. If
    /// `issue_fetch` fails nothing is recorded and the error is returned.
    ///
    /// # Errors
    /// Returns whatever `issue_fetch` returns on failure.
    pub fn request_full<E, F>(
        &mut self,
        identity: &DictionaryIdentity,
        waiter: W,
        issue_fetch: F,
    ) -> Result<FullRequest, E>
    where
        F: FnOnce(&DictionaryIdentity) -> Result<(), E>,
    {
        if let Some(payload) = self.store.get(identity) {
            debug!(dictionary = %identity, ?waiter, "payload cached, delivering directly");
            return Ok(FullRequest::Cached(payload));
        }

        if let Some(waiters) = self.pending.get_mut(identity) {
            waiters.push_back(waiter);
            let waiters = waiters.len();
            debug!(dictionary = %identity, ?waiter, waiters, "joined in-flight fetch");
            return Ok(FullRequest::Joined { waiters });
        }

        issue_fetch(identity)?;
        info!(dictionary = %identity, ?waiter, "issued upstream fetch");
        self.pending
            .insert(identity.clone(), VecDeque::from([waiter]));
        Ok(FullRequest::Issued)
    }

    /// Caches a received payload and releases the waiters of its identity.
    ///
    /// # Returns
    /// The waiters in join order; empty if nobody was waiting.
    pub fn on_full_received(&mut self, identity: &DictionaryIdentity, payload: Bytes) -> Vec<W> {
        self.store.put(identity, payload);
        let waiters: Vec<W> = self
            .pending
            .remove(identity)
            .map(Vec::from)
            .unwrap_or_default();
        info!(dictionary = %identity, waiters = waiters.len(), "fetch completed");
        waiters
    }

    /// Abandons the fetch of `identity`, returning every waiter in join order.
    pub fn fail(&mut self, identity: &DictionaryIdentity) -> Vec<W> {
        self.pending
            .remove(identity)
            .map(Vec::from)
            .unwrap_or_default()
    }

    /// Removes one waiter from the queue of `identity`.
    ///
    /// The fetch itself stays in flight even if no waiter remains, so the
    /// payload is still cached when it arrives.
    ///
    /// # Returns
    /// `true` if the waiter was queued.
    pub fn remove_waiter(&mut self, identity: &DictionaryIdentity, waiter: W) -> bool {
        let Some(waiters) = self.pending.get_mut(identity) else {
            return false;
        };
        match waiters.iter().position(|w| *w == waiter) {
            Some(index) => {
                waiters.remove(index);
                true
            }
            None => false,
        }
    }

    /// Drops every queued waiter for which `keep` returns false.
    ///
    /// Fetches stay in flight even when their queue empties.
    ///
    /// # Returns
    /// The number of waiters removed.
    pub fn retain_waiters<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&W) -> bool,
    {
        let mut removed = 0;
        for waiters in self.pending.values_mut() {
            let before = waiters.len();
            waiters.retain(|w| keep(w));
            removed += before - waiters.len();
        }
        removed
    }

    /// Returns true if a fetch for `identity` is in flight.
    #[must_use]
    pub fn is_pending(&self, identity: &DictionaryIdentity) -> bool {
        self.pending.contains_key(identity)
    }

    /// Returns the waiters queued on `identity`, in join order.
    #[must_use]
    pub fn waiters(&self, identity: &DictionaryIdentity) -> Vec<W> {
        self.pending
            .get(identity)
            .map(|w| w.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns the number of waiters queued on `identity`.
    #[must_use]
    pub fn waiter_count(&self, identity: &DictionaryIdentity) -> usize {
        self.pending.get(identity).map_or(0, VecDeque::len)
    }

    /// Returns the number of fetches in flight.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use mdict_core::types::DictionaryType;
    use std::cell::Cell;

    fn rwf_fld() -> DictionaryIdentity {
        DictionaryIdentity::new("RWFFld", "", DictionaryType::FieldDefinitions, 1)
    }

    fn tracker() -> PendingRequestTracker<u32> {
        PendingRequestTracker::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_first_request_issues_fetch() {
        let mut tracker = tracker();
        let issued = Cell::new(0);

        let outcome = tracker
            .request_full(&rwf_fld(), 1, |_| -> Result<(), ()> {
                issued.set(issued.get() + 1);
                Ok(())
            })
            .unwrap();

        assert_eq!(outcome, FullRequest::Issued);
        assert_eq!(issued.get(), 1);
        assert!(tracker.is_pending(&rwf_fld()));
    }

    #[test]
    fn test_concurrent_requests_coalesce() {
        let mut tracker = tracker();
        let issued = Cell::new(0);
        let issue = |_: &DictionaryIdentity| -> Result<(), ()> {
            issued.set(issued.get() + 1);
            Ok(())
        };

        assert_eq!(
            tracker.request_full(&rwf_fld(), 1, issue).unwrap(),
            FullRequest::Issued
        );
        assert_eq!(
            tracker.request_full(&rwf_fld(), 2, issue).unwrap(),
            FullRequest::Joined { waiters: 2 }
        );
        assert_eq!(
            tracker.request_full(&rwf_fld(), 3, issue).unwrap(),
            FullRequest::Joined { waiters: 3 }
        );

        assert_eq!(issued.get(), 1);
        assert_eq!(tracker.waiters(&rwf_fld()), vec![1, 2, 3]);

        let released = tracker.on_full_received(&rwf_fld(), Bytes::from_static(b"payload"));
        assert_eq!(released, vec![1, 2, 3]);
        assert!(!tracker.is_pending(&rwf_fld()));
        assert_eq!(
            tracker.store().get(&rwf_fld()).unwrap(),
            Bytes::from_static(b"payload")
        );
    }

    #[test]
    fn test_cached_request_touches_nothing() {
        let mut tracker = tracker();
        tracker
            .store()
            .put(&rwf_fld(), Bytes::from_static(b"cached"));

        let outcome = tracker
            .request_full(&rwf_fld(), 9, |_| -> Result<(), ()> {
                panic!("must not fetch a cached payload")
            })
            .unwrap();

        assert_eq!(outcome, FullRequest::Cached(Bytes::from_static(b"cached")));
        assert_eq!(tracker.pending_count(), 0);
    }

    #[test]
    fn test_failed_issue_records_nothing() {
        let mut tracker = tracker();
        let result = tracker.request_full(&rwf_fld(), 1, |_| Err("gateway down"));

        assert_eq!(result, Err("gateway down"));
        assert!(!tracker.is_pending(&rwf_fld()));

        // The next requester gets to issue the fetch.
        let outcome = tracker
            .request_full(&rwf_fld(), 2, |_| -> Result<(), &str> { Ok(()) })
            .unwrap();
        assert_eq!(outcome, FullRequest::Issued);
    }

    #[test]
    fn test_repeated_delivery_is_idempotent() {
        let mut tracker = tracker();
        tracker
            .request_full(&rwf_fld(), 1, |_| -> Result<(), ()> { Ok(()) })
            .unwrap();

        assert_eq!(
            tracker.on_full_received(&rwf_fld(), Bytes::from_static(b"one")),
            vec![1]
        );
        assert!(
            tracker
                .on_full_received(&rwf_fld(), Bytes::from_static(b"two"))
                .is_empty()
        );
        assert_eq!(
            tracker.store().get(&rwf_fld()).unwrap(),
            Bytes::from_static(b"one")
        );
    }

    #[test]
    fn test_remove_waiter_keeps_fetch() {
        let mut tracker = tracker();
        let ok = |_: &DictionaryIdentity| -> Result<(), ()> { Ok(()) };
        tracker.request_full(&rwf_fld(), 1, ok).unwrap();
        tracker.request_full(&rwf_fld(), 2, ok).unwrap();

        assert!(tracker.remove_waiter(&rwf_fld(), 1));
        assert!(!tracker.remove_waiter(&rwf_fld(), 1));
        assert_eq!(tracker.waiters(&rwf_fld()), vec![2]);

        assert!(tracker.remove_waiter(&rwf_fld(), 2));
        assert!(tracker.is_pending(&rwf_fld()));
        assert_eq!(tracker.waiter_count(&rwf_fld()), 0);

        // A later requester joins the still-running fetch instead of issuing another.
        assert_eq!(
            tracker
                .request_full(&rwf_fld(), 3, |_| -> Result<(), ()> {
                    panic!("fetch already in flight")
                })
                .unwrap(),
            FullRequest::Joined { waiters: 1 }
        );
    }

    #[test]
    fn test_retain_waiters_filters_every_queue() {
        let mut tracker = tracker();
        let other = DictionaryIdentity::new("RWFEnum", "", DictionaryType::EnumTables, 1);
        let ok = |_: &DictionaryIdentity| -> Result<(), ()> { Ok(()) };
        tracker.request_full(&rwf_fld(), 1, ok).unwrap();
        tracker.request_full(&rwf_fld(), 2, ok).unwrap();
        tracker.request_full(&other, 3, ok).unwrap();

        assert_eq!(tracker.retain_waiters(|w| w % 2 == 0), 2);
        assert_eq!(tracker.waiters(&rwf_fld()), vec![2]);
        assert_eq!(tracker.waiter_count(&other), 0);
        assert_eq!(tracker.pending_count(), 2);
    }

    #[test]
    fn test_fail_releases_all_waiters() {
        let mut tracker = tracker();
        let ok = |_: &DictionaryIdentity| -> Result<(), ()> { Ok(()) };
        tracker.request_full(&rwf_fld(), 4, ok).unwrap();
        tracker.request_full(&rwf_fld(), 5, ok).unwrap();

        assert_eq!(tracker.fail(&rwf_fld()), vec![4, 5]);
        assert_eq!(tracker.pending_count(), 0);
        assert!(tracker.fail(&rwf_fld()).is_empty());
    }
}
