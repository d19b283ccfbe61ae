/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Consumer response encoding.
//!
//! Every session encodes its own response from the shared cached payload,
//! so two sessions waiting on the same dictionary can receive differently
//! shaped messages. Encoding runs into a bounded buffer; when the buffer is
//! too small it is grown and the encoding retried, up to the limits in
//! [`EncodingConfig`].

use crate::config::EncodingConfig;
use crate::request::DictionaryRequest;
use bytes::Bytes;
use mdict_core::error::{DecodeError, EncodeError};
use mdict_core::types::{DictionaryIdentity, SessionHandle, Status};
use mdict_tagvalue::{Decoder, Encoder, Frame};
use tracing::{debug, error};

/// Message type of a refresh response.
pub const MSG_REFRESH: &str = "R";
/// Message type of a status response.
pub const MSG_STATUS: &str = "S";

/// Response field tags.
pub mod tags {
    /// Message type.
    pub const MSG_TYPE: u32 = 35;
    /// Session handle.
    pub const HANDLE: u32 = 11;
    /// Refresh complete flag.
    pub const REFRESH_COMPLETE: u32 = 12;
    /// Service name.
    pub const SERVICE: u32 = 20;
    /// Dictionary name.
    pub const DICTIONARY: u32 = 21;
    /// Request filter.
    pub const FILTER: u32 = 22;
    /// Dictionary version.
    pub const VERSION: u32 = 23;
    /// Dictionary type code.
    pub const DICTIONARY_TYPE: u32 = 24;
    /// Dictionary id.
    pub const DICTIONARY_ID: u32 = 25;
    /// Stream state code.
    pub const STREAM_STATE: u32 = 40;
    /// Data state code.
    pub const DATA_STATE: u32 = 41;
    /// Status code.
    pub const STATUS_CODE: u32 = 42;
    /// Status text.
    pub const TEXT: u32 = 58;
}

/// Shape of an encoded response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    /// Identity summary only.
    Info,
    /// Full dictionary content.
    Full,
    /// Upstream status.
    Status,
}

/// A response encoded for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedResponse {
    kind: ResponseKind,
    handle: SessionHandle,
    bytes: Bytes,
    attempts: u32,
}

impl EncodedResponse {
    /// Returns the response shape.
    #[must_use]
    pub const fn kind(&self) -> ResponseKind {
        self.kind
    }

    /// Returns the session the response was encoded for.
    #[must_use]
    pub const fn handle(&self) -> SessionHandle {
        self.handle
    }

    /// Returns the framed message bytes.
    #[must_use]
    pub const fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Returns how many encoding attempts were needed.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Decodes the framed message.
    ///
    /// # Errors
    /// Returns `DecodeError` if the frame is malformed.
    pub fn frame(&self) -> Result<Frame<'_>, DecodeError> {
        Decoder::new(&self.bytes).decode()
    }
}

/// Encodes the identity summary answering an INFO request.
///
/// # Errors
/// Returns `EncodeError::EncodingFailed` if the retry limits are exhausted.
pub fn encode_info(
    handle: SessionHandle,
    request: &DictionaryRequest,
    identity: &DictionaryIdentity,
    config: &EncodingConfig,
) -> Result<EncodedResponse, EncodeError> {
    let estimate = request.service.len() + identity.name().len() + identity.version().len();
    let (bytes, attempts) = encode_with_retry(config, estimate, |enc| {
        enc.put_str(tags::MSG_TYPE, MSG_REFRESH)?;
        enc.put_uint(tags::HANDLE, handle.value())?;
        if request.attrib_echo {
            enc.put_str(tags::SERVICE, &request.service)?;
        }
        enc.put_str(tags::DICTIONARY, identity.name())?;
        if request.attrib_echo {
            enc.put_str(tags::FILTER, request.filter.as_str())?;
        }
        put_identity(enc, identity)?;
        enc.put_bool(tags::REFRESH_COMPLETE, true)
    })?;
    Ok(EncodedResponse {
        kind: ResponseKind::Info,
        handle,
        bytes,
        attempts,
    })
}

/// Re-encodes a cached payload for one session.
///
/// The response is tagged with the session's own service and dictionary
/// names so the requester can correlate it.
///
/// # Errors
/// Returns `EncodeError::EncodingFailed` if the retry limits are exhausted.
pub fn encode_full(
    handle: SessionHandle,
    request: &DictionaryRequest,
    identity: &DictionaryIdentity,
    payload: &[u8],
    config: &EncodingConfig,
) -> Result<EncodedResponse, EncodeError> {
    let (bytes, attempts) = encode_with_retry(config, payload.len(), |enc| {
        enc.put_str(tags::MSG_TYPE, MSG_REFRESH)?;
        enc.put_uint(tags::HANDLE, handle.value())?;
        enc.put_str(tags::SERVICE, &request.service)?;
        enc.put_str(tags::DICTIONARY, &request.dictionary)?;
        if request.attrib_echo {
            enc.put_str(tags::FILTER, request.filter.as_str())?;
        }
        put_identity(enc, identity)?;
        enc.put_data(payload)?;
        enc.put_bool(tags::REFRESH_COMPLETE, true)
    })?;
    Ok(EncodedResponse {
        kind: ResponseKind::Full,
        handle,
        bytes,
        attempts,
    })
}

/// Encodes an upstream status for one session.
///
/// # Errors
/// Returns `EncodeError::EncodingFailed` if the retry limits are exhausted.
pub fn encode_status(
    handle: SessionHandle,
    request: &DictionaryRequest,
    status: &Status,
    config: &EncodingConfig,
) -> Result<EncodedResponse, EncodeError> {
    let estimate = status.text.len() + request.service.len() + request.dictionary.len();
    let (bytes, attempts) = encode_with_retry(config, estimate, |enc| {
        enc.put_str(tags::MSG_TYPE, MSG_STATUS)?;
        enc.put_uint(tags::HANDLE, handle.value())?;
        if request.attrib_echo {
            enc.put_str(tags::SERVICE, &request.service)?;
            enc.put_str(tags::DICTIONARY, &request.dictionary)?;
            enc.put_str(tags::FILTER, request.filter.as_str())?;
        }
        enc.put_uint(tags::STREAM_STATE, u64::from(status.stream_state.code()))?;
        enc.put_uint(tags::DATA_STATE, u64::from(status.data_state.code()))?;
        enc.put_uint(tags::STATUS_CODE, u64::from(status.code))?;
        enc.put_str(tags::TEXT, &status.text)
    })?;
    Ok(EncodedResponse {
        kind: ResponseKind::Status,
        handle,
        bytes,
        attempts,
    })
}

fn put_identity(enc: &mut Encoder<'_>, identity: &DictionaryIdentity) -> Result<(), EncodeError> {
    enc.put_str(tags::VERSION, identity.version())?;
    enc.put_int(tags::DICTIONARY_TYPE, i64::from(identity.kind().code()))?;
    enc.put_int(tags::DICTIONARY_ID, i64::from(identity.id()))
}

/// Runs `write` into buffers of growing capacity until the frame fits.
fn encode_with_retry<F>(
    config: &EncodingConfig,
    estimate: usize,
    write: F,
) -> Result<(Bytes, u32), EncodeError>
where
    F: Fn(&mut Encoder<'_>) -> Result<(), EncodeError>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut capacity = config.initial_capacity(estimate);
    let mut attempts = 0;

    loop {
        attempts += 1;
        let mut encoder = Encoder::with_limit(&config.begin_string, capacity);
        let result = match write(&mut encoder) {
            Ok(()) => encoder.finish(),
            Err(e) => Err(e),
        };

        match result {
            Ok(frame) => return Ok((frame.freeze(), attempts)),
            Err(EncodeError::BufferOverflow { needed, available }) => {
                if attempts >= max_attempts || capacity >= config.max_buffer_size {
                    error!(attempts, capacity, needed, "response encoding exhausted");
                    return Err(EncodeError::EncodingFailed { attempts, capacity });
                }
                capacity = config.grow(capacity);
                debug!(attempts, needed, available, capacity, "buffer too small, retrying");
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdict_core::types::{DictionaryType, Filter};

    fn rwf_fld() -> DictionaryIdentity {
        DictionaryIdentity::new("RWFFld", "4.20", DictionaryType::FieldDefinitions, 1)
    }

    fn full_request() -> DictionaryRequest {
        DictionaryRequest::new("DIRECT_FEED", "RWFFld")
    }

    #[test]
    fn test_info_response_without_echo() {
        let request = full_request().with_filter(Filter::Info);
        let response =
            encode_info(SessionHandle::new(3), &request, &rwf_fld(), &EncodingConfig::new())
                .unwrap();

        assert_eq!(response.kind(), ResponseKind::Info);
        assert_eq!(response.attempts(), 1);
        let frame = response.frame().unwrap();
        assert_eq!(frame.begin_string(), "MDICT.1.0");
        assert_eq!(frame.msg_type(), MSG_REFRESH);
        assert_eq!(frame.get_field_str(tags::HANDLE), Some("3"));
        assert_eq!(frame.get_field_str(tags::DICTIONARY), Some("RWFFld"));
        assert_eq!(frame.get_field_str(tags::VERSION), Some("4.20"));
        assert_eq!(frame.get_field_str(tags::DICTIONARY_TYPE), Some("1"));
        assert_eq!(frame.get_field_str(tags::DICTIONARY_ID), Some("1"));
        assert!(frame.get_field(tags::SERVICE).is_none());
        assert!(frame.get_field(tags::FILTER).is_none());
        assert!(frame.get_field(mdict_tagvalue::DATA_TAG).is_none());
    }

    #[test]
    fn test_info_response_with_echo() {
        let request = full_request().with_filter(Filter::Info).with_attrib_echo(true);
        let response =
            encode_info(SessionHandle::new(3), &request, &rwf_fld(), &EncodingConfig::new())
                .unwrap();

        let frame = response.frame().unwrap();
        assert_eq!(frame.get_field_str(tags::SERVICE), Some("DIRECT_FEED"));
        assert_eq!(frame.get_field_str(tags::FILTER), Some("INFO"));
    }

    #[test]
    fn test_full_response_carries_payload() {
        let payload = b"8=MDICT.1.0\x019=5\x0135=DF\x0110=000\x01";
        let response = encode_full(
            SessionHandle::new(7),
            &full_request(),
            &rwf_fld(),
            payload,
            &EncodingConfig::new(),
        )
        .unwrap();

        assert_eq!(response.kind(), ResponseKind::Full);
        let frame = response.frame().unwrap();
        assert_eq!(frame.get_field_str(tags::SERVICE), Some("DIRECT_FEED"));
        assert_eq!(frame.get_field_str(tags::DICTIONARY), Some("RWFFld"));
        assert_eq!(frame.get_field_str(tags::DICTIONARY_ID), Some("1"));
        assert_eq!(
            frame.get_field(mdict_tagvalue::DATA_TAG).unwrap().value,
            &payload[..]
        );
        assert!(frame.get_field(tags::FILTER).is_none());
    }

    #[test]
    fn test_status_response() {
        let status = Status::closed_recover("Source unavailable").with_code(5);
        let response = encode_status(
            SessionHandle::new(2),
            &full_request(),
            &status,
            &EncodingConfig::new(),
        )
        .unwrap();

        assert_eq!(response.kind(), ResponseKind::Status);
        let frame = response.frame().unwrap();
        assert_eq!(frame.msg_type(), MSG_STATUS);
        assert_eq!(frame.get_field_str(tags::STREAM_STATE), Some("3"));
        assert_eq!(frame.get_field_str(tags::DATA_STATE), Some("2"));
        assert_eq!(frame.get_field_str(tags::STATUS_CODE), Some("5"));
        assert_eq!(frame.get_field_str(tags::TEXT), Some("Source unavailable"));
        assert!(frame.get_field(tags::SERVICE).is_none());

        let echoed = encode_status(
            SessionHandle::new(2),
            &full_request().with_attrib_echo(true),
            &status,
            &EncodingConfig::new(),
        )
        .unwrap();
        let frame = echoed.frame().unwrap();
        assert_eq!(frame.get_field_str(tags::SERVICE), Some("DIRECT_FEED"));
        assert_eq!(frame.get_field_str(tags::DICTIONARY), Some("RWFFld"));
        assert_eq!(frame.get_field_str(tags::FILTER), Some("FULL"));
    }

    #[test]
    fn test_undersized_buffer_is_grown() {
        let payload = vec![b'x'; 1000];
        let config = EncodingConfig::new().with_headroom(0);
        let response = encode_full(
            SessionHandle::new(1),
            &full_request(),
            &rwf_fld(),
            &payload,
            &config,
        )
        .unwrap();

        assert!(response.attempts() >= 2);
        let frame = response.frame().unwrap();
        assert_eq!(frame.get_field(mdict_tagvalue::DATA_TAG).unwrap().len(), 1000);
    }

    #[test]
    fn test_retry_bounded_by_attempts() {
        let payload = vec![b'x'; 1000];
        let config = EncodingConfig::new()
            .with_headroom(0)
            .with_growth_percent(0)
            .with_max_attempts(3);

        let result = encode_full(
            SessionHandle::new(1),
            &full_request(),
            &rwf_fld(),
            &payload,
            &config,
        );
        assert_eq!(
            result,
            Err(EncodeError::EncodingFailed {
                attempts: 3,
                capacity: 1002
            })
        );
    }

    #[test]
    fn test_retry_bounded_by_buffer_size() {
        let payload = vec![b'x'; 1000];
        let config = EncodingConfig::new().with_max_buffer_size(500);

        let result = encode_full(
            SessionHandle::new(1),
            &full_request(),
            &rwf_fld(),
            &payload,
            &config,
        );
        assert_eq!(
            result,
            Err(EncodeError::EncodingFailed {
                attempts: 1,
                capacity: 500
            })
        );
    }
}
