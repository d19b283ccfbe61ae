/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! # MDict Session
//!
//! Per-consumer request sessions for the MDict dictionary manager.
//!
//! This crate provides:
//! - **State machine**: Forward-only session states with checked transitions
//! - **Request sessions**: What a consumer asked for and how far it got
//! - **Response encoding**: INFO, FULL and status responses with bounded retry
//! - **Configuration**: Encoding limits and framing options

pub mod config;
pub mod request;
pub mod response;
pub mod state;

pub use config::{EncodingConfig, EncodingConfigBuilder};
pub use request::{DictionaryRequest, RequestSession};
pub use response::{EncodedResponse, ResponseKind, encode_full, encode_info, encode_status};
pub use state::SessionState;
