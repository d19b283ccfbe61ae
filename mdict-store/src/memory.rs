/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! In-memory payload store implementation.
//!
//! Payloads live for the lifetime of the store. The store is `Sync`, so a
//! single instance can be shared between managers through an `Arc`.

use crate::traits::PayloadStore;
use bytes::Bytes;
use mdict_core::types::DictionaryIdentity;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::debug;

/// In-memory, first-write-wins payload store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Cached payloads indexed by identity.
    payloads: RwLock<HashMap<DictionaryIdentity, Bytes>>,
}

impl MemoryStore {
    /// Creates a new empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the identities currently cached.
    #[must_use]
    pub fn identities(&self) -> Vec<DictionaryIdentity> {
        self.payloads.read().keys().cloned().collect()
    }

    /// Returns the total number of cached payload bytes.
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.payloads.read().values().map(Bytes::len).sum()
    }
}

impl PayloadStore for MemoryStore {
    fn put(&self, identity: &DictionaryIdentity, payload: Bytes) -> bool {
        let mut payloads = self.payloads.write();
        match payloads.entry(identity.clone()) {
            Entry::Occupied(_) => {
                debug!(dictionary = %identity, "payload already cached, ignoring put");
                false
            }
            Entry::Vacant(slot) => {
                debug!(dictionary = %identity, bytes = payload.len(), "caching payload");
                slot.insert(payload);
                true
            }
        }
    }

    fn get(&self, identity: &DictionaryIdentity) -> Option<Bytes> {
        self.payloads.read().get(identity).cloned()
    }

    fn contains(&self, identity: &DictionaryIdentity) -> bool {
        self.payloads.read().contains_key(identity)
    }

    fn len(&self) -> usize {
        self.payloads.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdict_core::types::DictionaryType;
    use std::sync::Arc;

    fn rwf_fld() -> DictionaryIdentity {
        DictionaryIdentity::new("RWFFld", "", DictionaryType::FieldDefinitions, 1)
    }

    #[test]
    fn test_memory_store_new() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.total_bytes(), 0);
    }

    #[test]
    fn test_memory_store_put_and_get() {
        let store = MemoryStore::new();
        assert!(store.put(&rwf_fld(), Bytes::from_static(b"fields")));

        assert!(store.contains(&rwf_fld()));
        assert_eq!(store.get(&rwf_fld()).unwrap(), Bytes::from_static(b"fields"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.identities(), vec![rwf_fld()]);
    }

    #[test]
    fn test_memory_store_first_write_wins() {
        let store = MemoryStore::new();
        assert!(store.put(&rwf_fld(), Bytes::from_static(b"first")));
        assert!(!store.put(&rwf_fld(), Bytes::from_static(b"second")));
        assert!(!store.put(&rwf_fld(), Bytes::from_static(b"third")));

        assert_eq!(store.get(&rwf_fld()).unwrap(), Bytes::from_static(b"first"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_memory_store_distinct_identities() {
        let store = MemoryStore::new();
        let v2 = DictionaryIdentity::new("RWFFld", "2", DictionaryType::FieldDefinitions, 1);
        store.put(&rwf_fld(), Bytes::from_static(b"a"));
        store.put(&v2, Bytes::from_static(b"bb"));

        assert_eq!(store.len(), 2);
        assert_eq!(store.total_bytes(), 3);
        assert!(
            !store.contains(&DictionaryIdentity::new(
                "RWFFld",
                "",
                DictionaryType::EnumTables,
                1
            ))
        );
    }

    #[test]
    fn test_memory_store_shared_across_threads() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.put(&rwf_fld(), Bytes::from(vec![i as u8]));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 1);
    }
}
