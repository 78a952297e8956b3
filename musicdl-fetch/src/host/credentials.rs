//! Per-domain cookie storage.
//!
//! Hosts authenticate from a [`CredentialStore`]. The durable implementation
//! lives in the store crate; [`MemoryCredentialStore`] is used for tests and
//! whenever a caller wants to inject cookies directly.

use std::collections::BTreeMap;

use async_trait::async_trait;
use musicdl_core::{CookieRecord, Domain};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::CredentialError;

// ============================================================================
// Credential Store Trait
// ============================================================================

/// Key-value store of cookies partitioned by domain.
///
/// `(domain, key)` is unique: [`set`](Self::set) replaces an existing value.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Get one cookie value.
    ///
    /// # Returns
    /// * `Ok(Some(value))` - Cookie found
    /// * `Ok(None)` - No cookie with that key for the domain
    /// * `Err(e)` - The store cannot be read
    async fn get(&self, domain: &Domain, key: &str) -> Result<Option<String>, CredentialError>;

    /// Get every cookie stored for a domain, ordered by key.
    async fn get_all(&self, domain: &Domain) -> Result<Vec<CookieRecord>, CredentialError>;

    /// Insert or replace a cookie.
    async fn set(&self, record: CookieRecord) -> Result<(), CredentialError>;

    /// Delete one cookie (`key` given) or every cookie of the domain.
    ///
    /// Returns the number of removed records.
    async fn delete(&self, domain: &Domain, key: Option<&str>) -> Result<usize, CredentialError>;
}

/// Formats cookies as a `Cookie` request header value.
pub fn cookie_header(records: &[CookieRecord]) -> String {
    records
        .iter()
        .map(|r| format!("{}={}", r.key, r.value))
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// In-memory credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    cookies: RwLock<BTreeMap<Domain, BTreeMap<String, String>>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `records`.
    pub fn with_records(records: impl IntoIterator<Item = CookieRecord>) -> Self {
        let mut cookies: BTreeMap<Domain, BTreeMap<String, String>> = BTreeMap::new();
        for record in records {
            cookies
                .entry(record.domain)
                .or_default()
                .insert(record.key, record.value);
        }
        Self {
            cookies: RwLock::new(cookies),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, domain: &Domain, key: &str) -> Result<Option<String>, CredentialError> {
        let cookies = self.cookies.read().await;
        Ok(cookies.get(domain).and_then(|keys| keys.get(key)).cloned())
    }

    async fn get_all(&self, domain: &Domain) -> Result<Vec<CookieRecord>, CredentialError> {
        let cookies = self.cookies.read().await;
        Ok(cookies
            .get(domain)
            .map(|keys| {
                keys.iter()
                    .map(|(k, v)| CookieRecord::new(domain.clone(), k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set(&self, record: CookieRecord) -> Result<(), CredentialError> {
        debug!(domain = %record.domain, key = %record.key, "Cookie set");
        let mut cookies = self.cookies.write().await;
        cookies
            .entry(record.domain)
            .or_default()
            .insert(record.key, record.value);
        Ok(())
    }

    async fn delete(&self, domain: &Domain, key: Option<&str>) -> Result<usize, CredentialError> {
        let mut cookies = self.cookies.write().await;
        let removed = match key {
            None => cookies.remove(domain).map_or(0, |keys| keys.len()),
            Some(key) => {
                let Some(keys) = cookies.get_mut(domain) else {
                    return Ok(0);
                };
                let removed = usize::from(keys.remove(key).is_some());
                if keys.is_empty() {
                    cookies.remove(domain);
                }
                removed
            }
        };
        debug!(domain = %domain, removed, "Cookies deleted");
        Ok(removed)
    }
}

// ============================================================================
// Tests
// ============================================================================
