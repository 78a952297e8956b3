//! Durable cookie store.
//!
//! Cookies live in one JSON file shaped
//! `{ "<domain>": { "<key>": "<value>" } }`, loaded once when the store is
//! opened and rewritten atomically after every mutation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use musicdl_core::{CookieRecord, Domain};
use musicdl_fetch::{CredentialError, CredentialStore};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::persistence::{load_json, save_json};

/// On-disk shape.
type CookieFile = BTreeMap<String, BTreeMap<String, String>>;

/// In-memory shape, keyed by normalized domain.
type CookieMap = BTreeMap<Domain, BTreeMap<String, String>>;

// ============================================================================
// Cookie Store
// ============================================================================

/// [`CredentialStore`] backed by a JSON file.
///
/// A missing file is an empty store. A file that cannot be read or parsed
/// leaves the store unavailable: every operation then fails with
/// [`CredentialError::Unavailable`] and the file is never overwritten.
#[derive(Debug)]
pub struct CookieStore {
    path: PathBuf,
    state: RwLock<Result<CookieMap, String>>,
}

impl CookieStore {
    /// Opens the store at `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match load_json::<CookieFile>(&path).await {
            Ok(file) => Ok(normalize(file, &path)),
            Err(e) if e.is_not_found() => {
                debug!(path = %path.display(), "No cookie file yet");
                Ok(CookieMap::new())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cookie store unavailable");
                Err(e.to_string())
            }
        };

        Self {
            path,
            state: RwLock::new(state),
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if the file was readable.
    pub async fn is_available(&self) -> bool {
        self.state.read().await.is_ok()
    }

    /// Lists the domains that have at least one cookie.
    pub async fn domains(&self) -> Result<Vec<Domain>, CredentialError> {
        let state = self.state.read().await;
        let cookies = available(&state)?;
        Ok(cookies.keys().cloned().collect())
    }

    async fn persist(&self, cookies: &CookieMap) -> Result<(), StoreError> {
        let file: CookieFile = cookies
            .iter()
            .map(|(domain, keys)| (domain.as_str().to_string(), keys.clone()))
            .collect();
        save_json(&self.path, &file).await
    }
}

fn available(state: &Result<CookieMap, String>) -> Result<&CookieMap, CredentialError> {
    state
        .as_ref()
        .map_err(|message| CredentialError::Unavailable(message.clone()))
}

/// Normalizes domains from the file; invalid entries are dropped, entries
/// differing only in case are merged.
fn normalize(file: CookieFile, path: &Path) -> CookieMap {
    let mut cookies = CookieMap::new();
    for (raw, keys) in file {
        match Domain::parse(&raw) {
            Ok(domain) => cookies.entry(domain).or_default().extend(keys),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping cookie entry"),
        }
    }
    cookies.retain(|_, keys| !keys.is_empty());
    cookies
}

#[async_trait]
impl CredentialStore for CookieStore {
    async fn get(&self, domain: &Domain, key: &str) -> Result<Option<String>, CredentialError> {
        let state = self.state.read().await;
        let cookies = available(&state)?;
        Ok(cookies.get(domain).and_then(|keys| keys.get(key)).cloned())
    }

    async fn get_all(&self, domain: &Domain) -> Result<Vec<CookieRecord>, CredentialError> {
        let state = self.state.read().await;
        let cookies = available(&state)?;
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
        let mut state = self.state.write().await;
        let mut updated = available(&state)?.clone();
        updated
            .entry(record.domain.clone())
            .or_default()
            .insert(record.key.clone(), record.value);

        self.persist(&updated)
            .await
            .map_err(|e| CredentialError::Write(e.to_string()))?;
        *state = Ok(updated);

        info!(domain = %record.domain, key = %record.key, "Cookie stored");
        Ok(())
    }

    async fn delete(&self, domain: &Domain, key: Option<&str>) -> Result<usize, CredentialError> {
        let mut state = self.state.write().await;
        let mut updated = available(&state)?.clone();

        let removed = match key {
            Some(key) => {
                let removed = updated
                    .get_mut(domain)
                    .and_then(|keys| keys.remove(key))
                    .map_or(0, |_| 1);
                if updated.get(domain).is_some_and(BTreeMap::is_empty) {
                    updated.remove(domain);
                }
                removed
            }
            None => updated.remove(domain).map_or(0, |keys| keys.len()),
        };

        if removed > 0 {
            self.persist(&updated)
                .await
                .map_err(|e| CredentialError::Write(e.to_string()))?;
            *state = Ok(updated);
        }

        info!(domain = %domain, key = ?key, removed, "Cookies deleted");
        Ok(removed)
    }
}

// ============================================================================
// Tests
// ============================================================================
