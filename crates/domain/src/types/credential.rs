//! Credential state held by the identity provider

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::CatalogService;
use crate::constants::PUBLIC_INTERFACE;

/// Bearer token issued by the identity service.
///
/// `value` is empty until the first successful authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub value: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub scope_id: String,
}

impl Credential {
    pub fn new(
        value: impl Into<String>,
        expires_at: DateTime<Utc>,
        scope_id: impl Into<String>,
    ) -> Self {
        Self { value: value.into(), expires_at: Some(expires_at), scope_id: scope_id.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Whether the token is past its expiry at `now`. A credential without an
    /// expiry is treated as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at <= now)
    }
}

/// Public base URL of every service in the catalog, keyed by service name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointCatalog(HashMap<String, String>);

impl EndpointCatalog {
    /// Build the catalog from the services returned by the identity service.
    ///
    /// Only `public` endpoints are kept. Services without a name are skipped;
    /// when a name has several public endpoints the last one wins.
    pub fn from_services(services: &[CatalogService]) -> Self {
        let mut endpoints = HashMap::new();
        for service in services {
            let Some(name) = service.name.as_deref() else {
                continue;
            };
            for endpoint in &service.endpoints {
                if endpoint.interface == PUBLIC_INTERFACE {
                    endpoints.insert(name.to_string(), endpoint.url.clone());
                }
            }
        }
        Self(endpoints)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, url)| (name.as_str(), url.as_str()))
    }
}

impl FromIterator<(String, String)> for EndpointCatalog {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
