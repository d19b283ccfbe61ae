/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! # MDict Core
//!
//! Core types and error definitions for the MDict dictionary manager.
//!
//! This crate provides the fundamental building blocks used across all MDict crates:
//! - **Error types**: Unified error handling with `thiserror`
//! - **Identity types**: `DictionaryIdentity`, the sole payload cache key
//! - **Handles**: `SessionHandle` for consumers, `StreamId` for upstream requests
//! - **Field references**: Zero-copy `FieldRef` into framed buffers

pub mod error;
pub mod field;
pub mod types;

pub use error::{
    DecodeError, EncodeError, GatewayError, MdictError, RequestError, Result, SessionError,
};
pub use field::FieldRef;
pub use types::{
    DataState, DictionaryIdentity, DictionaryType, Filter, SessionHandle, Status, StreamId,
    StreamState,
};
