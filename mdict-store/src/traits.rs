/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Payload store trait definition.
//!
//! This module defines the abstract interface for dictionary payload caches.

use bytes::Bytes;
use mdict_core::types::DictionaryIdentity;

/// Abstract interface for a dictionary payload cache.
///
/// Entries are append-only: once an identity has bytes, later puts for the
/// same identity are ignored, and nothing is ever evicted. Identity equality
/// is taken to imply content equality.
pub trait PayloadStore: Send + Sync {
    /// Stores a payload unless the identity already has one.
    ///
    /// # Arguments
    /// * `identity` - The dictionary identity
    /// * `payload` - The raw payload bytes
    ///
    /// # Returns
    /// `true` if the payload was inserted, `false` if an entry already existed.
    fn put(&self, identity: &DictionaryIdentity, payload: Bytes) -> bool;

    /// Retrieves the payload cached for an identity.
    fn get(&self, identity: &DictionaryIdentity) -> Option<Bytes>;

    /// Returns true if a payload is cached for the identity.
    fn contains(&self, identity: &DictionaryIdentity) -> bool {
        self.get(identity).is_some()
    }

    /// Returns the number of cached payloads.
    fn len(&self) -> usize;

    /// Returns true if no payload is cached.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
