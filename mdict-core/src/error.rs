/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Error types for the MDict dictionary manager.
//!
//! This module provides a unified error hierarchy using `thiserror` for typed,
//! domain-specific errors across decoding, encoding, session bookkeeping,
//! request handling, and upstream gateway operations.

use crate::types::{SessionHandle, StreamState};
use thiserror::Error;

/// Result type alias using [`MdictError`] as the error type.
pub type Result<T> = std::result::Result<T, MdictError>;

/// Top-level error type for all MDict operations.
#[derive(Debug, Error)]
pub enum MdictError {
    /// Error while decoding a framed message or dictionary payload.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Error while encoding a response message.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Error in request session bookkeeping.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Error answering a consumer request.
    #[error("request error: {0}")]
    Request(#[from] RequestError),

    /// Error reported by the upstream gateway.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Errors that occur while decoding framed messages and payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Buffer is incomplete, need more data.
    #[error("incomplete message, need more data")]
    Incomplete,

    /// Invalid BeginString field (tag 8).
    #[error("invalid begin string: expected 8=<protocol>")]
    InvalidBeginString,

    /// Missing BodyLength field (tag 9).
    #[error("missing body length field (tag 9)")]
    MissingBodyLength,

    /// Invalid BodyLength value.
    #[error("invalid body length value")]
    InvalidBodyLength,

    /// Missing MsgType field (tag 35).
    #[error("missing msg type field (tag 35)")]
    MissingMsgType,

    /// The message type does not match what the caller expected.
    #[error("unexpected msg type: expected {expected}, found {found}")]
    UnexpectedMsgType {
        /// Expected message type.
        expected: String,
        /// Message type found in the frame.
        found: String,
    },

    /// Checksum mismatch between calculated and declared values.
    #[error("checksum mismatch: calculated {calculated}, declared {declared}")]
    ChecksumMismatch {
        /// Calculated checksum value.
        calculated: u8,
        /// Declared checksum value in message.
        declared: u8,
    },

    /// Missing required field.
    #[error("missing required field: tag {tag}")]
    MissingRequiredField {
        /// The tag number of the missing field.
        tag: u32,
    },

    /// Invalid field value for the expected type.
    #[error("invalid field value for tag {tag}: {reason}")]
    InvalidFieldValue {
        /// The tag number of the field.
        tag: u32,
        /// Description of why the value is invalid.
        reason: String,
    },

    /// Repeating group count mismatch.
    #[error("group count mismatch for tag {count_tag}: expected {expected}, found {actual}")]
    GroupCountMismatch {
        /// The tag containing the group count.
        count_tag: u32,
        /// Expected number of group entries.
        expected: u32,
        /// Actual number of group entries found.
        actual: u32,
    },

    /// Invalid UTF-8 in string field.
    #[error("invalid utf-8 in field: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// Errors that occur while encoding response messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Buffer capacity exceeded during encoding.
    #[error("buffer overflow: need {needed} bytes, have {available}")]
    BufferOverflow {
        /// Bytes needed to complete encoding.
        needed: usize,
        /// Bytes available in buffer.
        available: usize,
    },

    /// The grow-and-retry loop gave up.
    #[error("encoding failed after {attempts} attempts, last capacity {capacity} bytes")]
    EncodingFailed {
        /// Number of attempts made.
        attempts: u32,
        /// Buffer capacity used by the last attempt.
        capacity: usize,
    },

    /// Field value exceeds maximum length.
    #[error("field value too long for tag {tag}: {length} exceeds max {max_length}")]
    FieldTooLong {
        /// The tag number of the field.
        tag: u32,
        /// Actual length of the value.
        length: usize,
        /// Maximum allowed length.
        max_length: usize,
    },
}

/// Errors in request session bookkeeping.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Attempted a transition the state machine does not allow.
    #[error("invalid session transition: {from} -> {to}")]
    InvalidTransition {
        /// State the session was in.
        from: String,
        /// State that was requested.
        to: String,
    },

    /// No open session with this handle.
    #[error("unknown session: {0}")]
    UnknownSession(SessionHandle),
}

/// Errors answering one consumer request.
///
/// These are delivered to the affected session only; they never close
/// sibling sessions waiting on the same dictionary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Upstream answered in a shape the protocol does not support.
    #[error("protocol violation: {reason}")]
    ProtocolViolation {
        /// What was wrong with the reply.
        reason: String,
    },

    /// Upstream reported a non-OK stream state.
    #[error("upstream status {state}: {text}")]
    UpstreamStatus {
        /// Stream state reported by upstream.
        state: StreamState,
        /// Status text reported by upstream.
        text: String,
    },

    /// No known service provides the dictionary.
    #[error("no provider found for dictionary {dictionary}")]
    NoProviderFound {
        /// Name of the dictionary.
        dictionary: String,
    },

    /// The response could not be encoded.
    #[error("response encoding failed: {0}")]
    EncodingFailed(EncodeError),

    /// A fetched payload could not be decoded into the service schema.
    #[error("corrupt payload for {dictionary}: {source}")]
    CorruptPayload {
        /// Name of the dictionary.
        dictionary: String,
        /// Underlying decode failure.
        source: DecodeError,
    },
}

/// Errors reported by the upstream gateway when sending requests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Upstream refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Connection to upstream is not available.
    #[error("gateway disconnected")]
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::ChecksumMismatch {
            calculated: 100,
            declared: 200,
        };
        assert_eq!(
            err.to_string(),
            "checksum mismatch: calculated 100, declared 200"
        );
    }

    #[test]
    fn test_mdict_error_from_decode() {
        let decode_err = DecodeError::Incomplete;
        let err: MdictError = decode_err.into();
        assert!(matches!(err, MdictError::Decode(DecodeError::Incomplete)));
    }

    #[test]
    fn test_encoding_failed_display() {
        let err = EncodeError::EncodingFailed {
            attempts: 10,
            capacity: 4096,
        };
        assert_eq!(
            err.to_string(),
            "encoding failed after 10 attempts, last capacity 4096 bytes"
        );
    }

    #[test]
    fn test_request_error_display() {
        let err = RequestError::NoProviderFound {
            dictionary: "RWFEnum".to_string(),
        };
        assert_eq!(err.to_string(), "no provider found for dictionary RWFEnum");

        let err = RequestError::UpstreamStatus {
            state: StreamState::ClosedRecover,
            text: "service down".to_string(),
        };
        assert_eq!(err.to_string(), "upstream status ClosedRecover: service down");
    }

    #[test]
    fn test_session_error_display() {
        let err = SessionError::UnknownSession(SessionHandle::new(7));
        assert_eq!(err.to_string(), "unknown session: 7");
    }
}
