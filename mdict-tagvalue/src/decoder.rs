/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Zero-copy tag=value frame decoder.
//!
//! The decoder walks a framed message without allocating for field values;
//! every [`FieldRef`] borrows from the input buffer. Length-prefixed data
//! fields (tags 95/96) are read by length so embedded payloads may contain
//! delimiters.

use crate::checksum::{calculate_checksum, parse_checksum};
use crate::encoder::{DATA_LENGTH_TAG, DATA_TAG, SOH};
use mdict_core::error::DecodeError;
use mdict_core::field::FieldRef;
use memchr::memchr;
use smallvec::SmallVec;
use std::str::FromStr;

/// Equals sign delimiter between tag and value.
pub const EQUALS: u8 = b'=';

/// A decoded frame borrowing from the input buffer.
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    bytes: &'a [u8],
    begin_string: &'a str,
    msg_type: &'a str,
    fields: SmallVec<[FieldRef<'a>; 32]>,
}

impl<'a> Frame<'a> {
    /// Returns the complete frame bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Returns the BeginString value.
    #[must_use]
    pub const fn begin_string(&self) -> &'a str {
        self.begin_string
    }

    /// Returns the message type (tag 35).
    #[must_use]
    pub const fn msg_type(&self) -> &'a str {
        self.msg_type
    }

    /// Returns the body fields after the message type, in wire order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldRef<'a>> {
        self.fields.iter()
    }

    /// Returns the body fields as a slice.
    #[must_use]
    pub fn field_slice(&self) -> &[FieldRef<'a>] {
        &self.fields
    }

    /// Returns the first field with the given tag.
    #[must_use]
    pub fn get_field(&self, tag: u32) -> Option<&FieldRef<'a>> {
        self.fields.iter().find(|f| f.tag == tag)
    }

    /// Returns the first field with the given tag as a string.
    #[must_use]
    pub fn get_field_str(&self, tag: u32) -> Option<&'a str> {
        self.get_field(tag).and_then(|f| f.as_str().ok())
    }

    /// Returns the value of a required field parsed as `T`.
    ///
    /// # Errors
    /// Returns `MissingRequiredField` if absent or `InvalidFieldValue` if unparseable.
    pub fn require_as<T: FromStr>(&self, tag: u32) -> Result<T, DecodeError> {
        self.get_field(tag)
            .ok_or(DecodeError::MissingRequiredField { tag })?
            .parse()
    }

    /// Checks the message type, failing if it differs.
    ///
    /// # Errors
    /// Returns `UnexpectedMsgType` on mismatch.
    pub fn expect_msg_type(&self, expected: &str) -> Result<(), DecodeError> {
        if self.msg_type == expected {
            Ok(())
        } else {
            Err(DecodeError::UnexpectedMsgType {
                expected: expected.to_string(),
                found: self.msg_type.to_string(),
            })
        }
    }
}

/// Zero-copy frame decoder.
#[derive(Debug)]
pub struct Decoder<'a> {
    /// Input buffer.
    input: &'a [u8],
    /// Current position in the buffer.
    offset: usize,
    /// Whether to validate checksums.
    validate_checksum: bool,
}

impl<'a> Decoder<'a> {
    /// Creates a new decoder for the given input buffer.
    #[inline]
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            offset: 0,
            validate_checksum: true,
        }
    }

    /// Sets whether to validate checksums during decoding.
    #[inline]
    #[must_use]
    pub const fn with_checksum_validation(mut self, validate: bool) -> Self {
        self.validate_checksum = validate;
        self
    }

    /// Decodes one complete frame from the buffer.
    ///
    /// # Errors
    /// Returns `DecodeError` if the frame is malformed or incomplete.
    pub fn decode(&mut self) -> Result<Frame<'a>, DecodeError> {
        let start_offset = self.offset;

        let begin_string_field = self.next_field().ok_or(DecodeError::Incomplete)?;
        if begin_string_field.tag != 8 {
            return Err(DecodeError::InvalidBeginString);
        }
        let begin_string = begin_string_field.as_str()?;

        let body_length_field = self.next_field().ok_or(DecodeError::MissingBodyLength)?;
        if body_length_field.tag != 9 {
            return Err(DecodeError::MissingBodyLength);
        }
        let body_length: usize = body_length_field
            .as_str()?
            .parse()
            .map_err(|_| DecodeError::InvalidBodyLength)?;

        let body_start = self.offset;

        let msg_type_field = self.next_field().ok_or(DecodeError::MissingMsgType)?;
        if msg_type_field.tag != 35 {
            return Err(DecodeError::MissingMsgType);
        }
        let msg_type = msg_type_field.as_str()?;

        let mut fields: SmallVec<[FieldRef<'a>; 32]> = SmallVec::new();
        let mut trailer: Option<(usize, FieldRef<'a>)> = None;
        loop {
            let field_start = self.offset;
            let field = self.next_field().ok_or(DecodeError::Incomplete)?;
            match field.tag {
                10 => {
                    trailer = Some((field_start, field));
                    break;
                }
                DATA_LENGTH_TAG => {
                    let len: usize = field.parse()?;
                    fields.push(field);
                    let data = self.next_data_field(len).ok_or(DecodeError::Incomplete)?;
                    fields.push(data);
                }
                _ => fields.push(field),
            }
        }
        let (checksum_start, checksum_field) = trailer.ok_or(DecodeError::Incomplete)?;

        if checksum_start - body_start != body_length {
            return Err(DecodeError::InvalidBodyLength);
        }

        if self.validate_checksum {
            let declared =
                parse_checksum(checksum_field.value).ok_or_else(|| DecodeError::InvalidFieldValue {
                    tag: 10,
                    reason: "invalid checksum format".to_string(),
                })?;
            let calculated = calculate_checksum(&self.input[start_offset..checksum_start]);
            if calculated != declared {
                return Err(DecodeError::ChecksumMismatch {
                    calculated,
                    declared,
                });
            }
        }

        Ok(Frame {
            bytes: &self.input[start_offset..self.offset],
            begin_string,
            msg_type,
            fields,
        })
    }

    /// Parses the next field from the buffer.
    ///
    /// # Returns
    /// The next field, or `None` if the buffer is exhausted or malformed.
    #[inline]
    pub fn next_field(&mut self) -> Option<FieldRef<'a>> {
        if self.offset >= self.input.len() {
            return None;
        }

        let remaining = &self.input[self.offset..];
        let eq_pos = memchr(EQUALS, remaining)?;
        let tag = parse_tag(&remaining[..eq_pos])?;

        let value_start = eq_pos + 1;
        let soh_pos = memchr(SOH, &remaining[value_start..])?;
        let value = &remaining[value_start..value_start + soh_pos];

        self.offset += value_start + soh_pos + 1;

        Some(FieldRef::new(tag, value))
    }

    /// Reads a raw data field (tag 96) of exactly `len` bytes.
    ///
    /// # Returns
    /// The data field, or `None` if the tag, length, or terminator is wrong.
    pub fn next_data_field(&mut self, len: usize) -> Option<FieldRef<'a>> {
        let remaining = &self.input[self.offset..];
        let eq_pos = memchr(EQUALS, remaining)?;
        if parse_tag(&remaining[..eq_pos])? != DATA_TAG {
            return None;
        }
        let value_start = eq_pos + 1;
        let value_end = value_start.checked_add(len)?;
        if remaining.get(value_end) != Some(&SOH) {
            return None;
        }
        self.offset += value_end + 1;
        Some(FieldRef::new(DATA_TAG, &remaining[value_start..value_end]))
    }

    /// Returns the current offset in the buffer.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Returns true if the buffer has been fully consumed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offset >= self.input.len()
    }
}

/// Parses a tag number from ASCII bytes.
#[inline]
fn parse_tag(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() || bytes.len() > 10 {
        return None;
    }

    let mut result: u32 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        result = result.checked_mul(10)?.checked_add(u32::from(b - b'0'))?;
    }

    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;

    fn sample_frame() -> Vec<u8> {
        let mut encoder = Encoder::new("MDICT.1.0");
        encoder.put_str(35, "R").unwrap();
        encoder.put_str(21, "RWFFld").unwrap();
        encoder.put_int(25, 1).unwrap();
        encoder.put_data(b"8=X\x0110=999\x01").unwrap();
        encoder.put_bool(12, true).unwrap();
        encoder.finish().unwrap().to_vec()
    }

    #[test]
    fn test_parse_tag() {
        assert_eq!(parse_tag(b"8"), Some(8));
        assert_eq!(parse_tag(b"12345"), Some(12345));
        assert_eq!(parse_tag(b""), None);
        assert_eq!(parse_tag(b"12a"), None);
    }

    #[test]
    fn test_next_field() {
        let input = b"8=MDICT.1.0\x019=5\x0135=R\x01";
        let mut decoder = Decoder::new(input);

        assert_eq!(decoder.next_field().unwrap().tag, 8);
        let len = decoder.next_field().unwrap();
        assert_eq!(len.as_str().unwrap(), "5");
        assert_eq!(decoder.next_field().unwrap().as_str().unwrap(), "R");
        assert!(decoder.next_field().is_none());
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_decode_frame_with_embedded_data() {
        let bytes = sample_frame();
        let frame = Decoder::new(&bytes).decode().unwrap();

        assert_eq!(frame.begin_string(), "MDICT.1.0");
        assert_eq!(frame.msg_type(), "R");
        assert_eq!(frame.get_field_str(21), Some("RWFFld"));
        assert_eq!(frame.require_as::<i32>(25).unwrap(), 1);
        assert_eq!(frame.get_field(DATA_TAG).unwrap().value, b"8=X\x0110=999\x01");
        assert_eq!(frame.get_field_str(12), Some("Y"));
        assert_eq!(frame.as_bytes().len(), bytes.len());
    }

    #[test]
    fn test_decode_checksum_mismatch() {
        let mut bytes = sample_frame();
        let pos = bytes.iter().position(|&b| b == b'W').unwrap();
        bytes[pos] = b'X';
        assert!(matches!(
            Decoder::new(&bytes).decode(),
            Err(DecodeError::ChecksumMismatch { .. })
        ));
        assert!(
            Decoder::new(&bytes)
                .with_checksum_validation(false)
                .decode()
                .is_ok()
        );
    }

    #[test]
    fn test_decode_truncated() {
        let bytes = sample_frame();
        let truncated = &bytes[..bytes.len() - 9];
        assert!(Decoder::new(truncated).decode().is_err());
    }

    #[test]
    fn test_expect_msg_type() {
        let bytes = sample_frame();
        let frame = Decoder::new(&bytes).decode().unwrap();
        assert!(frame.expect_msg_type("R").is_ok());
        assert!(matches!(
            frame.expect_msg_type("S"),
            Err(DecodeError::UnexpectedMsgType { .. })
        ));
        assert!(matches!(
            frame.require_as::<u32>(999),
            Err(DecodeError::MissingRequiredField { tag: 999 })
        ));
    }
}
