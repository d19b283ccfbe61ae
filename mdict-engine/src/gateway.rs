/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Upstream gateway interface.
//!
//! The gateway sends INFO and FULL requests to upstream services. Requests
//! are fire-and-forget; answers come back later as [`UpstreamEvent`]s that
//! the owner of the manager feeds into
//! [`DictionaryManager::handle_event`](crate::manager::DictionaryManager::handle_event).

use bytes::Bytes;
use mdict_core::error::GatewayError;
use mdict_core::types::{DictionaryIdentity, Status, StreamId};
use std::sync::Arc;

/// Sends dictionary requests upstream.
pub trait UpstreamGateway: Send + Sync {
    /// Requests the identity of `dictionary` from `service` on `stream`.
    ///
    /// # Errors
    /// Returns `GatewayError` if the request cannot be sent.
    fn send_info_request(
        &self,
        stream: StreamId,
        service: &str,
        dictionary: &str,
    ) -> Result<(), GatewayError>;

    /// Requests the full content of `dictionary` from `service` on `stream`.
    ///
    /// # Errors
    /// Returns `GatewayError` if the request cannot be sent.
    fn send_full_request(
        &self,
        stream: StreamId,
        service: &str,
        dictionary: &str,
    ) -> Result<(), GatewayError>;

    /// Cancels an open stream. Unknown streams are ignored.
    fn cancel(&self, stream: StreamId);
}

impl<T: UpstreamGateway + ?Sized> UpstreamGateway for Arc<T> {
    fn send_info_request(
        &self,
        stream: StreamId,
        service: &str,
        dictionary: &str,
    ) -> Result<(), GatewayError> {
        (**self).send_info_request(stream, service, dictionary)
    }

    fn send_full_request(
        &self,
        stream: StreamId,
        service: &str,
        dictionary: &str,
    ) -> Result<(), GatewayError> {
        (**self).send_full_request(stream, service, dictionary)
    }

    fn cancel(&self, stream: StreamId) {
        (**self).cancel(stream);
    }
}

/// An answer from upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamEvent {
    /// A refresh on an INFO or FULL stream.
    Refresh {
        /// Stream the refresh belongs to.
        stream: StreamId,
        /// Identity of the dictionary.
        identity: DictionaryIdentity,
        /// False while more parts follow.
        complete: bool,
        /// Payload bytes; empty for INFO refreshes.
        payload: Bytes,
    },
    /// A status on an INFO or FULL stream.
    Status {
        /// Stream the status belongs to.
        stream: StreamId,
        /// Reported status.
        status: Status,
    },
}

impl UpstreamEvent {
    /// Creates a complete INFO refresh.
    #[must_use]
    pub fn info(stream: StreamId, identity: DictionaryIdentity) -> Self {
        Self::Refresh {
            stream,
            identity,
            complete: true,
            payload: Bytes::new(),
        }
    }

    /// Creates a complete single-part FULL refresh.
    #[must_use]
    pub fn full(stream: StreamId, identity: DictionaryIdentity, payload: Bytes) -> Self {
        Self::Refresh {
            stream,
            identity,
            complete: true,
            payload,
        }
    }

    /// Creates a status event.
    #[must_use]
    pub const fn status(stream: StreamId, status: Status) -> Self {
        Self::Status { stream, status }
    }

    /// Returns the stream the event belongs to.
    #[must_use]
    pub const fn stream(&self) -> StreamId {
        match self {
            Self::Refresh { stream, .. } | Self::Status { stream, .. } => *stream,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdict_core::types::DictionaryType;

    #[test]
    fn test_event_constructors() {
        let identity = DictionaryIdentity::new("RWFFld", "", DictionaryType::FieldDefinitions, 1);

        let info = UpstreamEvent::info(StreamId::new(1), identity.clone());
        assert_eq!(info.stream(), StreamId::new(1));
        match info {
            UpstreamEvent::Refresh {
                complete, payload, ..
            } => {
                assert!(complete);
                assert!(payload.is_empty());
            }
            UpstreamEvent::Status { .. } => panic!("expected refresh"),
        }

        let status = UpstreamEvent::status(StreamId::new(2), Status::closed_recover("gone"));
        assert_eq!(status.stream(), StreamId::new(2));
    }
}
