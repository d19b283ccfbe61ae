/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! The dictionary manager.
//!
//! [`DictionaryManager`] owns the service catalog and every live consumer
//! session, and holds a [`DictionaryCache`] with the payload store and the
//! pending fetch tracker. It is a single-threaded reactor: consumers call [`open`](DictionaryManager::open)
//! and [`close`](DictionaryManager::close), upstream answers arrive through
//! [`handle_event`](DictionaryManager::handle_event), and every mutation
//! happens through `&mut self`. The check-cache, check-pending, issue-fetch
//! sequence runs under the lock of the [`DictionaryCache`], so it cannot
//! interleave with another request, not even one made by another manager
//! holding the same cache.
//!
//! A manager that shares its cache receives the answers of fetches issued by
//! other managers through [`poll_shared`](DictionaryManager::poll_shared).

use crate::application::DictionaryConsumer;
use crate::gateway::{UpstreamEvent, UpstreamGateway};
use bytes::{Bytes, BytesMut};
use mdict_core::error::{GatewayError, MdictError, RequestError, Result, SessionError};
use mdict_core::types::{DictionaryIdentity, SessionHandle, Status, StreamId, StreamState};
use mdict_dictionary::DictionaryCatalog;
use mdict_session::{DictionaryRequest, EncodingConfig, RequestSession, SessionState};
use mdict_store::{DictionaryCache, FullRequest, Handoff, OwnerId, PayloadStore, Waiter};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// An in-flight FULL fetch shared by every waiter of one identity.
#[derive(Debug)]
struct FullFetch {
    identity: DictionaryIdentity,
    provider: String,
    parts: BytesMut,
}

/// What an upstream stream answers.
#[derive(Debug)]
enum Route {
    /// One session's INFO stream.
    Info(SessionHandle),
    /// A shared FULL fetch.
    Full(FullFetch),
}

struct SessionEntry {
    session: RequestSession,
    consumer: Arc<dyn DictionaryConsumer>,
}

/// Fetches, caches and fans out dictionaries for many consumers.
pub struct DictionaryManager<G: UpstreamGateway> {
    gateway: G,
    cache: Arc<DictionaryCache>,
    owner: OwnerId,
    catalog: DictionaryCatalog,
    sessions: HashMap<SessionHandle, SessionEntry>,
    routes: HashMap<StreamId, Route>,
    encoding: EncodingConfig,
    next_handle: u64,
    next_stream: u64,
}

impl<G: UpstreamGateway> std::fmt::Debug for DictionaryManager<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictionaryManager")
            .field("services", &self.catalog.len())
            .field("owner", &self.owner)
            .field("cached", &self.cache.store().len())
            .field("pending", &self.cache.pending_count())
            .field("sessions", &self.sessions.len())
            .field("streams", &self.routes.len())
            .finish()
    }
}

impl<G: UpstreamGateway> DictionaryManager<G> {
    /// Creates a manager.
    ///
    /// # Arguments
    /// * `gateway` - Sends requests upstream
    /// * `cache` - Payload cache and fetch coalescer, possibly shared with other managers
    /// * `catalog` - Initial service registrations
    /// * `encoding` - Response encoding limits
    #[must_use]
    pub fn new(
        gateway: G,
        cache: Arc<DictionaryCache>,
        catalog: DictionaryCatalog,
        encoding: EncodingConfig,
    ) -> Self {
        Self {
            gateway,
            owner: cache.register(),
            cache,
            catalog,
            sessions: HashMap::new(),
            routes: HashMap::new(),
            encoding,
            next_handle: 1,
            next_stream: 1,
        }
    }

    /// Opens a session for `request`.
    ///
    /// A request whose identity and payload are already cached is answered
    /// before this returns, without any upstream traffic. Otherwise an INFO
    /// request goes to the service that provides the dictionary.
    ///
    /// # Errors
    /// Returns `RequestError::NoProviderFound` if the service uses the
    /// dictionary but no known service provides it, or `GatewayError` if the
    /// INFO request cannot be sent. No session exists in either case.
    pub fn open(
        &mut self,
        request: DictionaryRequest,
        consumer: Arc<dyn DictionaryConsumer>,
    ) -> Result<SessionHandle> {
        let handle = SessionHandle::new(self.next_handle);
        self.next_handle += 1;

        let mut session = RequestSession::new(handle, request);
        session.advance(SessionState::CheckCache)?;
        self.catalog.service_mut(session.service());

        let cached = self
            .catalog
            .cached_identity(session.service(), session.dictionary())
            .and_then(|identity| {
                self.cache
                    .store()
                    .get(identity)
                    .map(|payload| (identity.clone(), payload))
            });
        if let Some((identity, payload)) = cached {
            debug!(%handle, dictionary = %identity, "cache hit on open");
            self.sessions
                .insert(handle, SessionEntry { session, consumer });
            self.deliver(handle, &identity, &payload);
            return Ok(handle);
        }

        let provider = self
            .catalog
            .resolve_upstream(session.service(), session.dictionary())?;
        let stream = self.allocate_stream();
        self.gateway
            .send_info_request(stream, &provider, session.dictionary())?;

        info!(
            %handle,
            %stream,
            service = session.service(),
            dictionary = session.dictionary(),
            provider = %provider,
            "sent INFO request"
        );
        session.set_provider(provider);
        session.set_info_stream(stream);
        session.advance(SessionState::AwaitInfo)?;
        self.routes.insert(stream, Route::Info(handle));
        self.sessions
            .insert(handle, SessionEntry { session, consumer });
        Ok(handle)
    }

    /// Opens a completion-only session for every dictionary `service` uses.
    ///
    /// Each dictionary resolves independently: a dictionary without a
    /// provider reports its own error and the others still open.
    pub fn open_used(
        &mut self,
        service: &str,
        consumer: Arc<dyn DictionaryConsumer>,
    ) -> Vec<(String, Result<SessionHandle>)> {
        let resolved = self.catalog.resolve_used(service);

        resolved
            .into_iter()
            .map(|(dictionary, provider)| {
                let opened = provider.map_err(MdictError::from).and_then(|_| {
                    let request =
                        DictionaryRequest::new(service, dictionary.as_str()).completion_only();
                    self.open(request, Arc::clone(&consumer))
                });
                if let Err(e) = &opened {
                    warn!(service, dictionary = %dictionary, error = %e, "could not open used dictionary");
                }
                (dictionary, opened)
            })
            .collect()
    }

    /// Closes a session.
    ///
    /// A streaming session cancels its own upstream INFO stream. A session
    /// waiting on a FULL fetch leaves the waiter list; the fetch itself keeps
    /// running for the other waiters and for the cache.
    ///
    /// # Errors
    /// Returns `SessionError::UnknownSession` if the handle is not open.
    pub fn close(&mut self, handle: SessionHandle) -> Result<()> {
        let mut entry = self
            .sessions
            .remove(&handle)
            .ok_or(SessionError::UnknownSession(handle))?;
        let cancel = entry.session.is_streaming();
        self.release(&mut entry.session, cancel);
        info!(%handle, "session closed");
        Ok(())
    }

    /// Processes one upstream answer.
    ///
    /// Events on unknown streams are logged and dropped.
    ///
    /// # Errors
    /// Returns `GatewayError` if a FULL request triggered by the event could
    /// not be sent; the affected session has already been failed.
    pub fn handle_event(&mut self, event: UpstreamEvent) -> Result<()> {
        let result = self.dispatch(event);
        self.poll_shared();
        result
    }

    /// Delivers the outcome of fetches other managers completed for sessions
    /// of this one.
    ///
    /// Called by [`handle_event`](Self::handle_event); a manager sharing its
    /// cache that receives no upstream events must call it itself.
    ///
    /// # Returns
    /// The number of handoffs processed.
    pub fn poll_shared(&mut self) -> usize {
        let handoffs = self.cache.take_handoffs(self.owner);
        let count = handoffs.len();
        for handoff in handoffs {
            match handoff {
                Handoff::Ready { handle, identity } => {
                    let cached = self.cache.store().get(&identity);
                    if let Some(payload) = cached {
                        debug!(%handle, dictionary = %identity, "payload fetched by another manager");
                        self.deliver(handle, &identity, &payload);
                    } else {
                        let reason = RequestError::UpstreamStatus {
                            state: StreamState::ClosedRecover,
                            text: format!("{identity} missing from cache"),
                        };
                        self.fail_session(
                            handle,
                            Status::closed_recover("payload missing from cache"),
                            &reason,
                        );
                    }
                }
                Handoff::Failed { handle, identity, status } => {
                    warn!(%handle, dictionary = %identity, state = %status.stream_state, "fetch by another manager failed");
                    let reason = RequestError::UpstreamStatus {
                        state: status.stream_state,
                        text: status.text.clone(),
                    };
                    self.fail_session(handle, status, &reason);
                }
            }
        }
        count
    }

    fn dispatch(&mut self, event: UpstreamEvent) -> Result<()> {
        match event {
            UpstreamEvent::Refresh {
                stream,
                identity,
                complete,
                payload,
            } => match self.routes.get(&stream) {
                Some(Route::Info(handle)) => {
                    let handle = *handle;
                    self.on_info_refresh(handle, stream, identity, complete)
                }
                Some(Route::Full(_)) => {
                    self.on_full_refresh(stream, &identity, complete, payload);
                    Ok(())
                }
                None => {
                    warn!(%stream, dictionary = %identity, "refresh on unknown stream");
                    Ok(())
                }
            },
            UpstreamEvent::Status { stream, status } => {
                match self.routes.get(&stream) {
                    Some(Route::Info(handle)) => {
                        let handle = *handle;
                        self.on_info_status(handle, stream, status);
                    }
                    Some(Route::Full(_)) => self.on_fetch_status(stream, status),
                    None => warn!(%stream, state = %status.stream_state, "status on unknown stream"),
                }
                Ok(())
            }
        }
    }

    fn on_info_refresh(
        &mut self,
        handle: SessionHandle,
        stream: StreamId,
        identity: DictionaryIdentity,
        complete: bool,
    ) -> Result<()> {
        if !complete {
            error!(%handle, %stream, dictionary = %identity, "multi-part INFO refresh");
            let reason = RequestError::ProtocolViolation {
                reason: format!("multi-part INFO refresh for {identity}"),
            };
            self.fail_session(
                handle,
                Status::closed_recover("multi-part INFO refresh is not supported"),
                &reason,
            );
            return Ok(());
        }

        let Some(entry) = self.sessions.get_mut(&handle) else {
            return Ok(());
        };
        let session = &mut entry.session;
        if session.state() != SessionState::AwaitInfo {
            debug!(%handle, %stream, state = %session.state(), "ignoring INFO refresh");
            return Ok(());
        }
        if !session.is_streaming() {
            session.take_info_stream();
            self.routes.remove(&stream);
        }

        session.record_identity(identity.clone());
        let service = session.service().to_string();
        let provider = session.provider().unwrap_or(&service).to_string();
        self.catalog.record_cached(&service, &identity);
        if provider != service {
            self.catalog.record_cached(&provider, &identity);
        }
        debug!(%handle, dictionary = %identity, "identity resolved");

        let gateway = &self.gateway;
        let next_stream = &mut self.next_stream;
        let mut fetch_stream = None;
        let waiter = Waiter::new(self.owner, handle);
        let outcome = self.cache.request_full(&identity, waiter, |id| {
            let stream = StreamId::new(*next_stream);
            *next_stream += 1;
            gateway.send_full_request(stream, &provider, id.name())?;
            fetch_stream = Some(stream);
            Ok::<(), GatewayError>(())
        });

        match outcome {
            Ok(FullRequest::Cached(payload)) => self.deliver(handle, &identity, &payload),
            Ok(FullRequest::Joined { waiters }) => {
                debug!(%handle, dictionary = %identity, waiters, "waiting on shared fetch");
                self.advance(handle, SessionState::AwaitFull);
            }
            Ok(FullRequest::Issued) => {
                self.advance(handle, SessionState::AwaitFull);
                if let Some(stream) = fetch_stream {
                    info!(%handle, %stream, dictionary = %identity, provider = %provider, "sent FULL request");
                    self.routes.insert(
                        stream,
                        Route::Full(FullFetch {
                            identity,
                            provider,
                            parts: BytesMut::new(),
                        }),
                    );
                }
            }
            Err(e) => {
                error!(%handle, dictionary = %identity, error = %e, "FULL request failed");
                let reason = RequestError::UpstreamStatus {
                    state: StreamState::ClosedRecover,
                    text: e.to_string(),
                };
                self.fail_session(handle, Status::closed_recover(e.to_string()), &reason);
                return Err(e.into());
            }
        }
        Ok(())
    }

    fn on_full_refresh(
        &mut self,
        stream: StreamId,
        identity: &DictionaryIdentity,
        complete: bool,
        payload: Bytes,
    ) {
        let Some(Route::Full(mut fetch)) = self.routes.remove(&stream) else {
            return;
        };
        if fetch.identity != *identity {
            warn!(%stream, expected = %fetch.identity, received = %identity, "FULL refresh identity mismatch");
        }

        if !complete {
            let buffered = fetch.parts.len() + payload.len();
            if buffered > self.encoding.max_buffer_size {
                error!(
                    %stream,
                    dictionary = %fetch.identity,
                    buffered,
                    limit = self.encoding.max_buffer_size,
                    "FULL refresh parts exceed buffer limit"
                );
                self.routes.insert(stream, Route::Full(fetch));
                self.gateway.cancel(stream);
                self.on_fetch_status(
                    stream,
                    Status::closed_recover(format!(
                        "FULL refresh exceeds {} bytes",
                        self.encoding.max_buffer_size
                    )),
                );
                return;
            }
            fetch.parts.extend_from_slice(&payload);
            debug!(%stream, bytes = fetch.parts.len(), "buffered FULL refresh part");
            self.routes.insert(stream, Route::Full(fetch));
            return;
        }

        let payload = if fetch.parts.is_empty() {
            payload
        } else {
            fetch.parts.extend_from_slice(&payload);
            fetch.parts.freeze()
        };

        let waiters = self.cache.complete(self.owner, &fetch.identity, payload.clone());
        // First write wins; deliver what the store actually holds.
        let payload = self.cache.store().get(&fetch.identity).unwrap_or(payload);
        self.catalog.record_cached(&fetch.provider, &fetch.identity);
        info!(%stream, dictionary = %fetch.identity, waiters = waiters.len(), "fanning out FULL refresh");
        for handle in waiters {
            self.deliver(handle, &fetch.identity, &payload);
        }
    }

    fn on_info_status(&mut self, handle: SessionHandle, stream: StreamId, status: Status) {
        if status.is_open() {
            debug!(%handle, %stream, text = %status.text, "open status on INFO stream");
            return;
        }
        self.routes.remove(&stream);
        if let Some(entry) = self.sessions.get_mut(&handle) {
            entry.session.take_info_stream();
        }
        warn!(%handle, %stream, state = %status.stream_state, text = %status.text, "upstream status");
        let reason = RequestError::UpstreamStatus {
            state: status.stream_state,
            text: status.text.clone(),
        };
        self.fail_session(handle, status, &reason);
    }

    fn on_fetch_status(&mut self, stream: StreamId, status: Status) {
        if status.is_open() {
            debug!(%stream, text = %status.text, "open status on FULL stream");
            return;
        }
        let Some(Route::Full(fetch)) = self.routes.remove(&stream) else {
            return;
        };
        let waiters = self.cache.fail(self.owner, &fetch.identity, &status);
        warn!(
            %stream,
            dictionary = %fetch.identity,
            waiters = waiters.len(),
            state = %status.stream_state,
            text = %status.text,
            "shared fetch failed"
        );
        let reason = RequestError::UpstreamStatus {
            state: status.stream_state,
            text: status.text.clone(),
        };
        for handle in waiters {
            self.fail_session(handle, status.clone(), &reason);
        }
    }

    /// Answers one session from a cached payload.
    fn deliver(&mut self, handle: SessionHandle, identity: &DictionaryIdentity, payload: &Bytes) {
        let Some(entry) = self.sessions.get_mut(&handle) else {
            return;
        };
        let session = &mut entry.session;
        let service = session.service().to_string();

        if let Err(e) = self.catalog.merge_payload(&service, identity, payload) {
            error!(%handle, dictionary = %identity, error = %e, "payload does not decode");
            if session.is_completion_only() {
                let reason = RequestError::CorruptPayload {
                    dictionary: identity.name().to_string(),
                    source: e,
                };
                self.fail_session(handle, Status::closed_recover("corrupt dictionary payload"), &reason);
                return;
            }
        }

        session.record_identity(identity.clone());
        if let Err(e) = session.advance(SessionState::Delivered) {
            error!(%handle, error = %e, "cannot deliver");
            return;
        }

        // Completion is reported per session, once, on its own delivery.
        if session.is_completion_only() {
            if let Some(schema) = self.catalog.schema(&service).filter(|s| s.is_complete()) {
                info!(%handle, service = %service, "schema complete");
                entry.consumer.on_complete(&service, schema);
            } else {
                debug!(%handle, service = %service, dictionary = %identity, "schema still incomplete");
            }
        } else {
            match session.respond(identity, payload, &self.encoding) {
                Ok(response) => {
                    debug!(%handle, kind = ?response.kind(), bytes = response.bytes().len(), "delivering response");
                    entry.consumer.on_response(handle, &response);
                }
                Err(e) => {
                    error!(%handle, dictionary = %identity, error = %e, "response encoding failed");
                    entry
                        .consumer
                        .on_failure(handle, &RequestError::EncodingFailed(e));
                }
            }
        }

        if !entry.session.is_streaming() {
            self.finish(handle, false);
        }
    }

    /// Delivers a status to one session and closes it.
    fn fail_session(&mut self, handle: SessionHandle, status: Status, reason: &RequestError) {
        let Some(entry) = self.sessions.get_mut(&handle) else {
            return;
        };
        let session = &mut entry.session;
        if let Err(e) = session.advance(SessionState::Delivered) {
            error!(%handle, error = %e, "cannot deliver status");
        }

        if !session.is_completion_only() {
            match session.respond_status(&status, &self.encoding) {
                Ok(response) => entry.consumer.on_response(handle, &response),
                Err(e) => error!(%handle, error = %e, "status encoding failed"),
            }
        }
        entry.consumer.on_failure(handle, reason);
        session.record_status(status);
        self.finish(handle, true);
    }

    /// Removes a finished session.
    fn finish(&mut self, handle: SessionHandle, cancel_info: bool) {
        if let Some(mut entry) = self.sessions.remove(&handle) {
            self.release(&mut entry.session, cancel_info);
            debug!(%handle, "session finished");
        }
    }

    /// Drops the session's upstream interest and moves it to `Closed`.
    fn release(&mut self, session: &mut RequestSession, cancel_info: bool) {
        if let Some(stream) = session.take_info_stream() {
            self.routes.remove(&stream);
            if cancel_info {
                self.gateway.cancel(stream);
            }
        }
        if let Some(identity) = session.identity() {
            if self
                .cache
                .remove_waiter(identity, Waiter::new(self.owner, session.handle()))
            {
                debug!(handle = %session.handle(), dictionary = %identity, "left shared fetch");
            }
        }
        if let Err(e) = session.advance(SessionState::Closed) {
            error!(handle = %session.handle(), error = %e, "cannot close session");
        }
    }

    fn advance(&mut self, handle: SessionHandle, next: SessionState) {
        if let Some(entry) = self.sessions.get_mut(&handle) {
            if let Err(e) = entry.session.advance(next) {
                error!(%handle, error = %e, "invalid session transition");
            }
        }
    }

    fn allocate_stream(&mut self) -> StreamId {
        let stream = StreamId::new(self.next_stream);
        self.next_stream += 1;
        stream
    }

    /// Returns the service catalog.
    #[must_use]
    pub const fn catalog(&self) -> &DictionaryCatalog {
        &self.catalog
    }

    /// Returns the service catalog for registration.
    pub const fn catalog_mut(&mut self) -> &mut DictionaryCatalog {
        &mut self.catalog
    }

    /// Returns the payload store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn PayloadStore> {
        self.cache.store()
    }

    /// Returns the shared cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<DictionaryCache> {
        &self.cache
    }

    /// Returns the gateway.
    #[must_use]
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Returns the encoding configuration.
    #[must_use]
    pub const fn encoding_config(&self) -> &EncodingConfig {
        &self.encoding
    }

    /// Returns an open session.
    #[must_use]
    pub fn session(&self, handle: SessionHandle) -> Option<&RequestSession> {
        self.sessions.get(&handle).map(|entry| &entry.session)
    }

    /// Returns the state of an open session.
    #[must_use]
    pub fn session_state(&self, handle: SessionHandle) -> Option<SessionState> {
        self.session(handle).map(RequestSession::state)
    }

    /// Returns the number of FULL fetches in flight across the shared cache.
    #[must_use]
    pub fn pending_fetches(&self) -> usize {
        self.cache.pending_count()
    }

    /// Returns the number of sessions waiting on the fetch of `identity`,
    /// across every manager sharing the cache.
    #[must_use]
    pub fn waiter_count(&self, identity: &DictionaryIdentity) -> usize {
        self.cache.waiter_count(identity)
    }

    /// Returns the number of open sessions.
    #[must_use]
    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }
}

impl<G: UpstreamGateway> Drop for DictionaryManager<G> {
    fn drop(&mut self) {
        // Waiters of other managers must not hang on a fetch nobody will answer.
        let status = Status::closed_recover("dictionary manager shut down");
        for (stream, route) in self.routes.drain() {
            if let Route::Full(fetch) = route {
                self.gateway.cancel(stream);
                self.cache.fail(self.owner, &fetch.identity, &status);
            }
        }
        self.cache.unregister(self.owner);
    }
}
