/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Bounded tag=value message encoder.
//!
//! The encoder frames a message as `8=<begin>|9=<len>|<body>10=NNN|` with SOH
//! delimiters. An encoder built with [`Encoder::with_limit`] refuses to grow
//! past its limit and reports [`EncodeError::BufferOverflow`] instead, which
//! is what drives the grow-and-retry loop used for response encoding.

use crate::checksum::{TRAILER_LEN, calculate_checksum, format_checksum};
use bytes::{BufMut, BytesMut};
use mdict_core::error::EncodeError;

/// SOH (Start of Header) delimiter.
pub const SOH: u8 = 0x01;

/// Tag carrying the byte length of the following raw data field.
pub const DATA_LENGTH_TAG: u32 = 95;

/// Tag carrying raw data that may contain delimiters.
pub const DATA_TAG: u32 = 96;

/// Tag-value message encoder.
#[derive(Debug)]
pub struct Encoder<'a> {
    /// Buffer for the message body (between BodyLength and Checksum).
    body: BytesMut,
    /// The BeginString value.
    begin_string: &'a str,
    /// Maximum size of the finished frame, if bounded.
    limit: Option<usize>,
}

impl<'a> Encoder<'a> {
    /// Creates an unbounded encoder with the specified BeginString.
    #[must_use]
    pub fn new(begin_string: &'a str) -> Self {
        Self {
            body: BytesMut::with_capacity(256),
            begin_string,
            limit: None,
        }
    }

    /// Creates an encoder whose finished frame may not exceed `limit` bytes.
    ///
    /// # Arguments
    /// * `begin_string` - The protocol version string
    /// * `limit` - Maximum frame size in bytes, also used as initial capacity
    #[must_use]
    pub fn with_limit(begin_string: &'a str, limit: usize) -> Self {
        Self {
            body: BytesMut::with_capacity(limit),
            begin_string,
            limit: Some(limit),
        }
    }

    /// Appends a field with a string value.
    ///
    /// # Errors
    /// Returns `EncodeError::BufferOverflow` if the field does not fit.
    #[inline]
    pub fn put_str(&mut self, tag: u32, value: &str) -> Result<(), EncodeError> {
        self.put_raw(tag, value.as_bytes())
    }

    /// Appends a field with a signed integer value.
    ///
    /// # Errors
    /// Returns `EncodeError::BufferOverflow` if the field does not fit.
    #[inline]
    pub fn put_int(&mut self, tag: u32, value: i64) -> Result<(), EncodeError> {
        let mut buf = itoa::Buffer::new();
        let s = buf.format(value);
        self.put_raw(tag, s.as_bytes())
    }

    /// Appends a field with an unsigned integer value.
    ///
    /// # Errors
    /// Returns `EncodeError::BufferOverflow` if the field does not fit.
    #[inline]
    pub fn put_uint(&mut self, tag: u32, value: u64) -> Result<(), EncodeError> {
        let mut buf = itoa::Buffer::new();
        let s = buf.format(value);
        self.put_raw(tag, s.as_bytes())
    }

    /// Appends a field with a boolean value (Y/N).
    ///
    /// # Errors
    /// Returns `EncodeError::BufferOverflow` if the field does not fit.
    #[inline]
    pub fn put_bool(&mut self, tag: u32, value: bool) -> Result<(), EncodeError> {
        self.put_raw(tag, if value { b"Y" } else { b"N" })
    }

    /// Appends a length-prefixed raw data field pair (tags 95/96).
    ///
    /// The data may contain SOH or `=` bytes; decoders read it by length.
    ///
    /// # Errors
    /// Returns `EncodeError::BufferOverflow` if the data does not fit.
    pub fn put_data(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        self.put_uint(DATA_LENGTH_TAG, data.len() as u64)?;
        self.put_raw(DATA_TAG, data)
    }

    /// Appends a field with raw bytes.
    ///
    /// # Errors
    /// Returns `EncodeError::BufferOverflow` if the field does not fit.
    #[inline]
    pub fn put_raw(&mut self, tag: u32, value: &[u8]) -> Result<(), EncodeError> {
        let mut tag_buf = itoa::Buffer::new();
        let tag_str = tag_buf.format(tag);

        let needed = tag_str.len() + value.len() + 2;
        self.ensure(self.body.len() + needed)?;

        self.body.put_slice(tag_str.as_bytes());
        self.body.put_u8(b'=');
        self.body.put_slice(value);
        self.body.put_u8(SOH);
        Ok(())
    }

    /// Finalizes the message, prepending the header and appending the checksum.
    ///
    /// # Errors
    /// Returns `EncodeError::BufferOverflow` if the framed message exceeds the limit.
    pub fn finish(self) -> Result<BytesMut, EncodeError> {
        let body_len = self.body.len();
        let mut len_buf = itoa::Buffer::new();
        let len_str = len_buf.format(body_len);

        // 8=<begin>|9=<len>|
        let header_len = 2 + self.begin_string.len() + 1 + 2 + len_str.len() + 1;
        let total = header_len + body_len + TRAILER_LEN;
        self.ensure(total)?;

        let mut message = BytesMut::with_capacity(total);
        message.put_slice(b"8=");
        message.put_slice(self.begin_string.as_bytes());
        message.put_u8(SOH);
        message.put_slice(b"9=");
        message.put_slice(len_str.as_bytes());
        message.put_u8(SOH);
        message.put_slice(&self.body);

        let checksum = format_checksum(calculate_checksum(&message));
        message.put_slice(b"10=");
        message.put_slice(&checksum);
        message.put_u8(SOH);

        Ok(message)
    }

    /// Returns the current body length.
    #[inline]
    #[must_use]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Returns the frame size limit, if any.
    #[inline]
    #[must_use]
    pub const fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Clears the encoder for reuse.
    #[inline]
    pub fn clear(&mut self) {
        self.body.clear();
    }

    fn ensure(&self, needed: usize) -> Result<(), EncodeError> {
        match self.limit {
            Some(available) if needed > available => {
                Err(EncodeError::BufferOverflow { needed, available })
            }
            _ => Ok(()),
        }
    }
}
