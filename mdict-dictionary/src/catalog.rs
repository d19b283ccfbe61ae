/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Service registry.
//!
//! The catalog knows every service seen so far, which dictionaries each one
//! provides or uses, which identity each dictionary name resolved to, and the
//! schema merged for the service. Services are created on first reference and
//! live as long as the catalog.

use crate::schema::Schema;
use mdict_core::error::{DecodeError, RequestError};
use mdict_core::types::DictionaryIdentity;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// A named upstream service.
#[derive(Debug, Clone, Default)]
pub struct Service {
    name: String,
    provides: BTreeSet<String>,
    uses: BTreeSet<String>,
    cached_identities: HashMap<String, DictionaryIdentity>,
    schema: Schema,
}

impl Service {
    /// Creates an empty service.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if this service provides the dictionary.
    #[must_use]
    pub fn provides(&self, dictionary: &str) -> bool {
        self.provides.contains(dictionary)
    }

    /// Returns true if this service declared the dictionary as used.
    #[must_use]
    pub fn uses(&self, dictionary: &str) -> bool {
        self.uses.contains(dictionary)
    }

    /// Returns the dictionaries this service provides.
    pub fn provided(&self) -> impl Iterator<Item = &str> {
        self.provides.iter().map(String::as_str)
    }

    /// Returns the dictionaries this service uses.
    pub fn used(&self) -> impl Iterator<Item = &str> {
        self.uses.iter().map(String::as_str)
    }

    /// Returns the identity a dictionary name resolved to, if known.
    #[must_use]
    pub fn cached_identity(&self, dictionary: &str) -> Option<&DictionaryIdentity> {
        self.cached_identities.get(dictionary)
    }

    /// Returns the merged schema.
    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// Registry of services in registration order.
#[derive(Debug, Default)]
pub struct DictionaryCatalog {
    services: Vec<Service>,
    index: HashMap<String, usize>,
}

impl DictionaryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the named service, creating it if absent.
    pub fn service_mut(&mut self, name: &str) -> &mut Service {
        let position = match self.index.get(name) {
            Some(&position) => position,
            None => {
                debug!(service = name, "registering service");
                self.services.push(Service::new(name));
                let position = self.services.len() - 1;
                self.index.insert(name.to_string(), position);
                position
            }
        };
        &mut self.services[position]
    }

    /// Returns the named service if known.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.index.get(name).map(|&position| &self.services[position])
    }

    /// Returns all services in registration order.
    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.iter()
    }

    /// Records that `service` provides `dictionary`.
    pub fn register_provided(&mut self, dictionary: &str, service: &str) {
        self.service_mut(service)
            .provides
            .insert(dictionary.to_string());
    }

    /// Records that `service` uses `dictionary`.
    pub fn register_used(&mut self, dictionary: &str, service: &str) {
        self.service_mut(service).uses.insert(dictionary.to_string());
    }

    /// Returns true if `service` provides `dictionary`.
    #[must_use]
    pub fn is_provided(&self, service: &str, dictionary: &str) -> bool {
        self.service(service)
            .is_some_and(|svc| svc.provides(dictionary))
    }

    /// Returns the first service, in registration order, that provides `dictionary`.
    #[must_use]
    pub fn resolve_provider_for(&self, dictionary: &str) -> Option<&str> {
        self.services
            .iter()
            .find(|svc| svc.provides(dictionary))
            .map(Service::name)
    }

    /// Picks the service an upstream request for `dictionary` on behalf of
    /// `service` should go to.
    ///
    /// A service that provides the dictionary answers for itself. Otherwise
    /// the first known provider is used. A service that declared the
    /// dictionary as used but has no provider fails; a service with no
    /// declaration at all is asked directly.
    ///
    /// # Errors
    /// Returns `RequestError::NoProviderFound` for a used dictionary with no provider.
    pub fn resolve_upstream(&self, service: &str, dictionary: &str) -> Result<String, RequestError> {
        if self.is_provided(service, dictionary) {
            return Ok(service.to_string());
        }
        if let Some(provider) = self.resolve_provider_for(dictionary) {
            return Ok(provider.to_string());
        }
        match self.service(service) {
            Some(svc) if svc.uses(dictionary) => Err(RequestError::NoProviderFound {
                dictionary: dictionary.to_string(),
            }),
            _ => Ok(service.to_string()),
        }
    }

    /// Resolves a provider for every dictionary `service` uses.
    ///
    /// Each dictionary resolves independently; a missing provider for one
    /// does not affect the others.
    #[must_use]
    pub fn resolve_used(&self, service: &str) -> Vec<(String, Result<String, RequestError>)> {
        let Some(svc) = self.service(service) else {
            return Vec::new();
        };
        svc.used()
            .map(|dictionary| {
                (
                    dictionary.to_string(),
                    self.resolve_upstream(service, dictionary),
                )
            })
            .collect()
    }

    /// Returns the identity `dictionary` resolved to for `service`, if known.
    #[must_use]
    pub fn cached_identity(&self, service: &str, dictionary: &str) -> Option<&DictionaryIdentity> {
        self.service(service)
            .and_then(|svc| svc.cached_identity(dictionary))
    }

    /// Records that `service` resolved the identity's dictionary name to `identity`.
    pub fn record_cached(&mut self, service: &str, identity: &DictionaryIdentity) {
        self.service_mut(service)
            .cached_identities
            .insert(identity.name().to_string(), identity.clone());
    }

    /// Merges a payload into the service schema at most once per identity.
    ///
    /// # Returns
    /// `true` if this call merged the payload.
    ///
    /// # Errors
    /// Returns `DecodeError` if the payload cannot be decoded.
    pub fn merge_payload(
        &mut self,
        service: &str,
        identity: &DictionaryIdentity,
        payload: &[u8],
    ) -> Result<bool, DecodeError> {
        let merged = self.service_mut(service).schema.merge(identity, payload)?;
        if merged {
            debug!(service, dictionary = %identity, "merged dictionary into schema");
        }
        Ok(merged)
    }

    /// Returns the merged schema of `service`, if the service is known.
    #[must_use]
    pub fn schema(&self, service: &str) -> Option<&Schema> {
        self.service(service).map(Service::schema)
    }

    /// Returns true once `service` has both field definitions and enum tables merged.
    #[must_use]
    pub fn has_full_schema(&self, service: &str) -> bool {
        self.schema(service).is_some_and(Schema::is_complete)
    }

    /// Returns the number of known services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns true if no service is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{encode_enum_tables, encode_field_definitions};
    use crate::schema::{EnumTable, FieldDef, RwfType};
    use mdict_core::types::DictionaryType;

    #[test]
    fn test_registration_is_idempotent() {
        let mut catalog = DictionaryCatalog::new();
        catalog.register_provided("RWFFld", "DIRECT_FEED");
        catalog.register_provided("RWFFld", "DIRECT_FEED");
        catalog.register_used("RWFEnum", "DIRECT_FEED");

        assert_eq!(catalog.len(), 1);
        let svc = catalog.service("DIRECT_FEED").unwrap();
        assert_eq!(svc.provided().collect::<Vec<_>>(), vec!["RWFFld"]);
        assert_eq!(svc.used().collect::<Vec<_>>(), vec!["RWFEnum"]);
        assert!(catalog.is_provided("DIRECT_FEED", "RWFFld"));
        assert!(!catalog.is_provided("DIRECT_FEED", "RWFEnum"));
        assert!(!catalog.is_provided("OTHER", "RWFFld"));
    }

    #[test]
    fn test_resolve_provider_in_registration_order() {
        let mut catalog = DictionaryCatalog::new();
        catalog.register_used("RWFFld", "IDN_RDF");
        catalog.register_provided("RWFFld", "ELEKTRON_DD");
        catalog.register_provided("RWFFld", "DIRECT_FEED");

        assert_eq!(catalog.resolve_provider_for("RWFFld"), Some("ELEKTRON_DD"));
        assert_eq!(catalog.resolve_provider_for("RWFEnum"), None);
    }

    #[test]
    fn test_resolve_upstream() {
        let mut catalog = DictionaryCatalog::new();
        catalog.register_provided("RWFFld", "S1");
        catalog.register_used("RWFFld", "S2");
        catalog.register_used("RWFEnum", "S2");

        assert_eq!(catalog.resolve_upstream("S1", "RWFFld").unwrap(), "S1");
        assert_eq!(catalog.resolve_upstream("S2", "RWFFld").unwrap(), "S1");
        assert_eq!(
            catalog.resolve_upstream("S2", "RWFEnum"),
            Err(RequestError::NoProviderFound {
                dictionary: "RWFEnum".to_string()
            })
        );
        assert_eq!(catalog.resolve_upstream("S3", "RWFEnum").unwrap(), "S3");
    }

    #[test]
    fn test_resolve_used_reports_per_dictionary() {
        let mut catalog = DictionaryCatalog::new();
        catalog.register_provided("RWFFld", "S1");
        catalog.register_used("RWFFld", "S2");
        catalog.register_used("RWFEnum", "S2");

        let resolved = catalog.resolve_used("S2");
        assert_eq!(resolved.len(), 2);
        let enum_entry = resolved.iter().find(|(name, _)| name == "RWFEnum").unwrap();
        assert!(enum_entry.1.is_err());
        let fld_entry = resolved.iter().find(|(name, _)| name == "RWFFld").unwrap();
        assert_eq!(fld_entry.1.as_deref(), Ok("S1"));
        assert!(catalog.resolve_used("UNKNOWN").is_empty());
    }

    #[test]
    fn test_record_cached_creates_service() {
        let mut catalog = DictionaryCatalog::new();
        let identity = DictionaryIdentity::new("RWFFld", "", DictionaryType::FieldDefinitions, 1);
        catalog.record_cached("LATE", &identity);

        assert_eq!(catalog.cached_identity("LATE", "RWFFld"), Some(&identity));
        assert_eq!(catalog.cached_identity("LATE", "RWFEnum"), None);
    }

    #[test]
    fn test_merge_payload_and_full_schema() {
        let mut catalog = DictionaryCatalog::new();
        let fld_id = DictionaryIdentity::new("RWFFld", "1", DictionaryType::FieldDefinitions, 1);
        let enum_id = DictionaryIdentity::new("RWFEnum", "1", DictionaryType::EnumTables, 1);
        let fld = encode_field_definitions("RWFFld", "1", &[FieldDef::new(1, "PROD_PERM", RwfType::UInt)])
            .unwrap();
        let enums = encode_enum_tables("RWFEnum", "1", &[EnumTable::new().with_fid(4)]).unwrap();

        assert!(catalog.merge_payload("S1", &fld_id, &fld).unwrap());
        assert!(!catalog.merge_payload("S1", &fld_id, &fld).unwrap());
        assert!(!catalog.has_full_schema("S1"));
        assert!(catalog.merge_payload("S1", &enum_id, &enums).unwrap());
        assert!(catalog.has_full_schema("S1"));
        assert!(!catalog.has_full_schema("S2"));
        assert_eq!(catalog.schema("S1").unwrap().field_count(), 1);
    }
}
