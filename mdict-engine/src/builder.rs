/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Manager builder for fluent configuration.

use crate::gateway::UpstreamGateway;
use crate::manager::DictionaryManager;
use mdict_dictionary::DictionaryCatalog;
use mdict_session::EncodingConfig;
use mdict_store::DictionaryCache;
use std::sync::Arc;

/// Builder for configuring a [`DictionaryManager`].
#[derive(Default)]
pub struct ManagerBuilder {
    /// Cache shared with other managers; a private in-memory cache when unset.
    cache: Option<Arc<DictionaryCache>>,
    /// Response encoding limits.
    encoding: EncodingConfig,
    /// `(dictionary, service)` pairs the service provides.
    provided: Vec<(String, String)>,
    /// `(dictionary, service)` pairs the service uses.
    used: Vec<(String, String)>,
}

impl std::fmt::Debug for ManagerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerBuilder")
            .field("shared_cache", &self.cache.is_some())
            .field("encoding", &self.encoding)
            .field("provided", &self.provided)
            .field("used", &self.used)
            .finish()
    }
}

impl ManagerBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a cache shared with other managers.
    ///
    /// Managers built on one cache share its payloads and never fetch the
    /// same identity twice.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<DictionaryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the response encoding configuration.
    #[must_use]
    pub fn with_encoding(mut self, encoding: EncodingConfig) -> Self {
        self.encoding = encoding;
        self
    }

    /// Registers `service` as a provider of `dictionary`.
    #[must_use]
    pub fn provides(mut self, service: impl Into<String>, dictionary: impl Into<String>) -> Self {
        self.provided.push((dictionary.into(), service.into()));
        self
    }

    /// Registers `service` as a user of `dictionary`.
    #[must_use]
    pub fn uses(mut self, service: impl Into<String>, dictionary: impl Into<String>) -> Self {
        self.used.push((dictionary.into(), service.into()));
        self
    }

    /// Returns the encoding configuration.
    #[must_use]
    pub const fn encoding(&self) -> &EncodingConfig {
        &self.encoding
    }

    /// Builds the manager around `gateway`.
    #[must_use]
    pub fn build<G: UpstreamGateway>(self, gateway: G) -> DictionaryManager<G> {
        let mut catalog = DictionaryCatalog::new();
        for (dictionary, service) in &self.provided {
            catalog.register_provided(dictionary, service);
        }
        for (dictionary, service) in &self.used {
            catalog.register_used(dictionary, service);
        }
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(DictionaryCache::in_memory()));
        DictionaryManager::new(gateway, cache, catalog, self.encoding)
    }
}
