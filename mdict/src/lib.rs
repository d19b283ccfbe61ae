/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! # MDict
//!
//! A dictionary manager for real-time market-data deployments.
//!
//! Market-data fields are described by dictionaries: field definitions and
//! enumeration tables published by upstream services. MDict fetches them
//! with a two-phase protocol (learn the identity with INFO, fetch the content
//! with FULL only when it is not cached), coalesces concurrent requests into
//! one upstream fetch per identity, caches payloads for the process lifetime
//! and re-encodes them for every consumer.
//!
//! ## Features
//!
//! - **Coalescing**: At most one upstream FULL fetch per dictionary identity
//! - **Shared cache**: Payloads and in-flight fetches are shared across managers
//! - **Per-service schema**: Payloads are decoded and merged once per identity
//! - **Bounded encoding**: Undersized buffers are grown and retried within limits
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mdict::prelude::*;
//! use std::sync::Arc;
//!
//! let mut manager = ManagerBuilder::new()
//!     .provides("DIRECT_FEED", "RWFFld")
//!     .provides("DIRECT_FEED", "RWFEnum")
//!     .build(my_gateway);
//!
//! let handle = manager.open(
//!     DictionaryRequest::new("DIRECT_FEED", "RWFFld"),
//!     Arc::new(MyConsumer),
//! )?;
//!
//! // Feed upstream answers as they arrive.
//! manager.handle_event(event)?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`]: Identity and value types, error definitions
//! - [`dictionary`]: Schema types, payload codec and service catalog
//! - [`tagvalue`]: Zero-copy tag=value encoding and decoding
//! - [`session`]: Request session state machine and response encoding
//! - [`store`]: Payload cache and fetch coalescing
//! - [`engine`]: The dictionary manager and its collaborator interfaces

pub mod core {
    //! Identity and value types, error definitions.
    pub use mdict_core::*;
}

pub mod dictionary {
    //! Schema types, payload codec and service catalog.
    pub use mdict_dictionary::*;
}

pub mod tagvalue {
    //! Zero-copy tag=value encoding and decoding.
    pub use mdict_tagvalue::*;
}

pub mod session {
    //! Request session state machine and response encoding.
    pub use mdict_session::*;
}

pub mod store {
    //! Payload cache and fetch coalescing.
    pub use mdict_store::*;
}

pub mod engine {
    //! The dictionary manager and its collaborator interfaces.
    pub use mdict_engine::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Core types
    pub use mdict_core::{
        DataState, DecodeError, DictionaryIdentity, DictionaryType, EncodeError, Filter,
        GatewayError, MdictError, RequestError, Result, SessionError, SessionHandle, Status,
        StreamId, StreamState,
    };

    // Dictionary
    pub use mdict_dictionary::{
        DictionaryCatalog, EnumTable, FieldDef, RwfType, Schema, Service, encode_enum_tables,
        encode_field_definitions,
    };

    // Tag-value encoding
    pub use mdict_tagvalue::{Decoder, Encoder};

    // Session
    pub use mdict_session::{
        DictionaryRequest, EncodedResponse, EncodingConfig, RequestSession, ResponseKind,
        SessionState,
    };

    // Store
    pub use mdict_store::{
        DictionaryCache, FullRequest, MemoryStore, PayloadStore, PendingRequestTracker,
    };

    // Engine
    pub use mdict_engine::{
        DictionaryConsumer, DictionaryManager, ManagerBuilder, NoOpConsumer, UpstreamEvent,
        UpstreamGateway,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use bytes::Bytes;
    use std::sync::Arc;

    struct SilentGateway;

    impl UpstreamGateway for SilentGateway {
        fn send_info_request(
            &self,
            _stream: StreamId,
            _service: &str,
            _dictionary: &str,
        ) -> std::result::Result<(), GatewayError> {
            Ok(())
        }

        fn send_full_request(
            &self,
            _stream: StreamId,
            _service: &str,
            _dictionary: &str,
        ) -> std::result::Result<(), GatewayError> {
            Ok(())
        }

        fn cancel(&self, _stream: StreamId) {}
    }

    #[test]
    fn test_prelude_imports() {
        let identity = DictionaryIdentity::new("RWFFld", "", DictionaryType::FieldDefinitions, 1);
        assert_eq!(identity.kind(), DictionaryType::FieldDefinitions);
        assert_eq!(Filter::default(), Filter::Full);
        assert_eq!(EncodingConfig::default().max_attempts, 10);
    }

    #[test]
    fn test_full_round_trip_through_facade() {
        let store: Arc<dyn PayloadStore> = Arc::new(MemoryStore::new());
        let cache = Arc::new(DictionaryCache::new(Arc::clone(&store)));
        let mut manager = ManagerBuilder::new()
            .provides("DIRECT_FEED", "RWFFld")
            .with_cache(cache)
            .build(SilentGateway);

        let handle = manager
            .open(
                DictionaryRequest::new("DIRECT_FEED", "RWFFld"),
                Arc::new(NoOpConsumer),
            )
            .unwrap();
        assert_eq!(manager.session_state(handle), Some(SessionState::AwaitInfo));

        let identity = DictionaryIdentity::new("RWFFld", "", DictionaryType::FieldDefinitions, 1);
        manager
            .handle_event(UpstreamEvent::info(StreamId::new(1), identity.clone()))
            .unwrap();
        let payload: Bytes = encode_field_definitions(
            "RWFFld",
            "4.20",
            &[FieldDef::new(22, "BID", RwfType::Real)],
        )
        .unwrap();
        manager
            .handle_event(UpstreamEvent::full(StreamId::new(2), identity.clone(), payload))
            .unwrap();

        assert!(store.contains(&identity));
        assert_eq!(manager.session_state(handle), None);
        let schema = manager.catalog().schema("DIRECT_FEED").unwrap();
        assert_eq!(schema.get_field_by_acronym("BID").unwrap().fid, 22);
    }
}
