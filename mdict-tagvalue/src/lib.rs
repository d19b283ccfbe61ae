/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! # MDict Tag-Value
//!
//! Zero-copy tag=value framing used for dictionary payloads and the response
//! messages MDict hands to consumers.
//!
//! ## Features
//!
//! - **Zero-copy parsing**: Field values reference the original buffer
//! - **SIMD-accelerated**: Uses `memchr` for fast delimiter search
//! - **Bounded encoding**: Encoders with a size limit report overflow instead of growing
//! - **Embedded data**: Length-prefixed fields carry payloads containing delimiters

pub mod checksum;
pub mod decoder;
pub mod encoder;

pub use checksum::calculate_checksum;
pub use decoder::{Decoder, Frame};
pub use encoder::{DATA_LENGTH_TAG, DATA_TAG, Encoder, SOH};
