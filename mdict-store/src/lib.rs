/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! # MDict Store
//!
//! Dictionary payload caching for the MDict dictionary manager.
//!
//! This crate provides:
//! - **PayloadStore trait**: Abstract interface for an append-only payload cache
//! - **MemoryStore**: In-memory, first-write-wins payload store
//! - **PendingRequestTracker**: At most one upstream FULL fetch per identity
//! - **DictionaryCache**: Store and tracker behind one lock, shared by managers

pub mod cache;
pub mod memory;
pub mod pending;
pub mod traits;

pub use cache::{DictionaryCache, Handoff, OwnerId, Waiter};
pub use memory::MemoryStore;
pub use pending::{FullRequest, PendingRequestTracker};
pub use traits::PayloadStore;
