/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Consumer callback interface.
//!
//! A consumer either forwards encoded responses onward or only waits for a
//! service schema to become complete. Callbacks run on the thread driving
//! the manager and must not block.

use mdict_core::error::RequestError;
use mdict_core::types::SessionHandle;
use mdict_dictionary::Schema;
use mdict_session::EncodedResponse;

/// Callback interface for dictionary consumers.
pub trait DictionaryConsumer: Send + Sync {
    /// Called with the response encoded for a session.
    ///
    /// # Arguments
    /// * `handle` - The session the response answers
    /// * `response` - The encoded refresh or status message
    fn on_response(&self, handle: SessionHandle, response: &EncodedResponse);

    /// Called for completion-only sessions once the service schema holds
    /// both field definitions and enum tables.
    ///
    /// The signal is per session: every completion-only session whose
    /// delivery finds the schema complete reports it once, including a
    /// session opened after the schema was already merged. A session whose
    /// delivery leaves the schema incomplete ends without it.
    ///
    /// # Arguments
    /// * `service` - The service name
    /// * `schema` - The merged schema
    fn on_complete(&self, service: &str, schema: &Schema);

    /// Called when a session ends without a normal answer.
    fn on_failure(&self, _handle: SessionHandle, _error: &RequestError) {}
}

/// Consumer that ignores every callback.
#[derive(Debug, Default)]
pub struct NoOpConsumer;

impl DictionaryConsumer for NoOpConsumer {
    fn on_response(&self, _handle: SessionHandle, _response: &EncodedResponse) {}

    fn on_complete(&self, _service: &str, _schema: &Schema) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdict_core::types::{DictionaryIdentity, DictionaryType};
    use mdict_session::{DictionaryRequest, EncodingConfig, encode_info};

    #[test]
    fn test_noop_consumer() {
        let consumer = NoOpConsumer;
        let identity = DictionaryIdentity::new("RWFFld", "", DictionaryType::FieldDefinitions, 1);
        let response = encode_info(
            SessionHandle::new(1),
            &DictionaryRequest::new("S1", "RWFFld"),
            &identity,
            &EncodingConfig::new(),
        )
        .unwrap();

        consumer.on_response(SessionHandle::new(1), &response);
        consumer.on_complete("S1", &Schema::new());
        consumer.on_failure(
            SessionHandle::new(1),
            &RequestError::NoProviderFound {
                dictionary: "RWFFld".to_string(),
            },
        );
    }
}
