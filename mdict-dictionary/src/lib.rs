/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! # MDict Dictionary
//!
//! Dictionary schema handling and service bookkeeping for MDict.
//!
//! This crate provides:
//! - **Schema definitions**: Field definitions, enum tables, and the merged per-service schema
//! - **Payload codec**: Encoding and decoding of raw dictionary payloads
//! - **Service catalog**: Which services provide or use which dictionaries

pub mod catalog;
pub mod payload;
pub mod schema;

pub use catalog::{DictionaryCatalog, Service};
pub use payload::{DecodedPayload, PayloadContent, encode_enum_tables, encode_field_definitions};
pub use schema::{EnumTable, FieldDef, RwfType, Schema};
