/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Consumer request sessions.
//!
//! A [`RequestSession`] holds everything one consumer asked for and how far
//! its answer has progressed. The manager drives it; the session itself
//! never talks to upstream.

use crate::config::EncodingConfig;
use crate::response::{EncodedResponse, encode_full, encode_info, encode_status};
use crate::state::SessionState;
use mdict_core::error::{EncodeError, SessionError};
use mdict_core::types::{DictionaryIdentity, Filter, SessionHandle, Status, StreamId};
use tracing::trace;

/// What a consumer asks for when opening a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryRequest {
    /// Service the dictionary is requested against.
    pub service: String,
    /// Dictionary name.
    pub dictionary: String,
    /// INFO for the identity summary, FULL for the content.
    pub filter: Filter,
    /// Keep the upstream stream open after the refresh.
    pub streaming: bool,
    /// Echo the request attributes in responses.
    pub attrib_echo: bool,
    /// Only signal schema completion; never deliver bytes.
    pub completion_only: bool,
}

impl DictionaryRequest {
    /// Creates a non-streaming FULL request.
    #[must_use]
    pub fn new(service: impl Into<String>, dictionary: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            dictionary: dictionary.into(),
            filter: Filter::Full,
            streaming: false,
            attrib_echo: false,
            completion_only: false,
        }
    }

    /// Sets the filter.
    #[must_use]
    pub const fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets whether the request is streaming.
    #[must_use]
    pub const fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Sets whether request attributes are echoed.
    #[must_use]
    pub const fn with_attrib_echo(mut self, echo: bool) -> Self {
        self.attrib_echo = echo;
        self
    }

    /// Marks the request as completion-only.
    #[must_use]
    pub const fn completion_only(mut self) -> Self {
        self.completion_only = true;
        self
    }
}

/// One consumer's request and its progress.
#[derive(Debug, Clone)]
pub struct RequestSession {
    handle: SessionHandle,
    request: DictionaryRequest,
    provider: Option<String>,
    identity: Option<DictionaryIdentity>,
    info_stream: Option<StreamId>,
    state: SessionState,
    status: Option<Status>,
}

impl RequestSession {
    /// Creates a session in the `Created` state.
    #[must_use]
    pub fn new(handle: SessionHandle, request: DictionaryRequest) -> Self {
        Self {
            handle,
            request,
            provider: None,
            identity: None,
            info_stream: None,
            state: SessionState::Created,
            status: None,
        }
    }

    /// Returns the session handle.
    #[must_use]
    pub const fn handle(&self) -> SessionHandle {
        self.handle
    }

    /// Returns the original request.
    #[must_use]
    pub const fn request(&self) -> &DictionaryRequest {
        &self.request
    }

    /// Returns the service name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.request.service
    }

    /// Returns the dictionary name.
    #[must_use]
    pub fn dictionary(&self) -> &str {
        &self.request.dictionary
    }

    /// Returns true for streaming sessions.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        self.request.streaming
    }

    /// Returns true for completion-only sessions.
    #[must_use]
    pub const fn is_completion_only(&self) -> bool {
        self.request.completion_only
    }

    /// Returns the service the INFO request was sent to.
    #[must_use]
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Returns the resolved identity, once known.
    #[must_use]
    pub const fn identity(&self) -> Option<&DictionaryIdentity> {
        self.identity.as_ref()
    }

    /// Returns the session's own upstream INFO stream, if open.
    #[must_use]
    pub const fn info_stream(&self) -> Option<StreamId> {
        self.info_stream
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the status delivered to this session, if any.
    #[must_use]
    pub const fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    /// Moves the session to `next`.
    ///
    /// # Errors
    /// Returns `SessionError::InvalidTransition` if the move is not allowed.
    pub fn advance(&mut self, next: SessionState) -> Result<(), SessionError> {
        let from = self.state;
        self.state = from.transition(next)?;
        trace!(handle = %self.handle, %from, to = %next, "session transition");
        Ok(())
    }

    /// Records the service the INFO request went to.
    pub fn set_provider(&mut self, provider: impl Into<String>) {
        self.provider = Some(provider.into());
    }

    /// Records the upstream INFO stream.
    pub const fn set_info_stream(&mut self, stream: StreamId) {
        self.info_stream = Some(stream);
    }

    /// Takes the upstream INFO stream, leaving none.
    pub const fn take_info_stream(&mut self) -> Option<StreamId> {
        self.info_stream.take()
    }

    /// Records the identity the dictionary name resolved to.
    pub fn record_identity(&mut self, identity: DictionaryIdentity) {
        self.identity = Some(identity);
    }

    /// Records the status delivered to the session.
    pub fn record_status(&mut self, status: Status) {
        self.status = Some(status);
    }

    /// Encodes this session's answer from a cached payload.
    ///
    /// INFO sessions get the identity summary, FULL sessions the payload
    /// re-encoded with their own service and dictionary names.
    ///
    /// # Errors
    /// Returns `EncodeError::EncodingFailed` if the retry limits are exhausted.
    pub fn respond(
        &self,
        identity: &DictionaryIdentity,
        payload: &[u8],
        config: &EncodingConfig,
    ) -> Result<EncodedResponse, EncodeError> {
        match self.request.filter {
            Filter::Info => encode_info(self.handle, &self.request, identity, config),
            Filter::Full => encode_full(self.handle, &self.request, identity, payload, config),
        }
    }

    /// Encodes a status answer for this session.
    ///
    /// # Errors
    /// Returns `EncodeError::EncodingFailed` if the retry limits are exhausted.
    pub fn respond_status(
        &self,
        status: &Status,
        config: &EncodingConfig,
    ) -> Result<EncodedResponse, EncodeError> {
        encode_status(self.handle, &self.request, status, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{ResponseKind, tags};
    use mdict_core::types::DictionaryType;

    fn rwf_fld() -> DictionaryIdentity {
        DictionaryIdentity::new("RWFFld", "", DictionaryType::FieldDefinitions, 1)
    }

    #[test]
    fn test_request_builder() {
        let request = DictionaryRequest::new("DIRECT_FEED", "RWFFld")
            .with_filter(Filter::Info)
            .with_streaming(true)
            .with_attrib_echo(true)
            .completion_only();

        assert_eq!(request.service, "DIRECT_FEED");
        assert_eq!(request.dictionary, "RWFFld");
        assert_eq!(request.filter, Filter::Info);
        assert!(request.streaming);
        assert!(request.attrib_echo);
        assert!(request.completion_only);
    }

    #[test]
    fn test_session_lifecycle() {
        let mut session =
            RequestSession::new(SessionHandle::new(1), DictionaryRequest::new("S1", "RWFFld"));
        assert_eq!(session.state(), SessionState::Created);

        session.advance(SessionState::CheckCache).unwrap();
        session.set_provider("S0");
        session.set_info_stream(StreamId::new(10));
        session.advance(SessionState::AwaitInfo).unwrap();
        session.record_identity(rwf_fld());
        session.advance(SessionState::AwaitFull).unwrap();
        assert!(session.advance(SessionState::AwaitInfo).is_err());
        assert_eq!(session.state(), SessionState::AwaitFull);

        assert_eq!(session.provider(), Some("S0"));
        assert_eq!(session.identity(), Some(&rwf_fld()));
        assert_eq!(session.take_info_stream(), Some(StreamId::new(10)));
        assert_eq!(session.info_stream(), None);

        session.advance(SessionState::Delivered).unwrap();
        session.advance(SessionState::Closed).unwrap();
        assert!(session.state().is_terminal());
    }

    #[test]
    fn test_respond_follows_filter() {
        let full = RequestSession::new(SessionHandle::new(1), DictionaryRequest::new("S1", "RWFFld"));
        let info = RequestSession::new(
            SessionHandle::new(2),
            DictionaryRequest::new("S1", "RWFFld").with_filter(Filter::Info),
        );
        let config = EncodingConfig::new();

        let response = full.respond(&rwf_fld(), b"payload", &config).unwrap();
        assert_eq!(response.kind(), ResponseKind::Full);
        assert_eq!(response.handle(), SessionHandle::new(1));

        let response = info.respond(&rwf_fld(), b"payload", &config).unwrap();
        assert_eq!(response.kind(), ResponseKind::Info);
        assert!(response.frame().unwrap().get_field(mdict_tagvalue::DATA_TAG).is_none());
    }

    #[test]
    fn test_respond_status() {
        let mut session =
            RequestSession::new(SessionHandle::new(4), DictionaryRequest::new("S1", "RWFFld"));
        let status = Status::closed_recover("not found");
        let response = session.respond_status(&status, &EncodingConfig::new()).unwrap();
        session.record_status(status.clone());

        assert_eq!(response.kind(), ResponseKind::Status);
        assert_eq!(
            response.frame().unwrap().get_field_str(tags::TEXT),
            Some("not found")
        );
        assert_eq!(session.status(), Some(&status));
    }
}
