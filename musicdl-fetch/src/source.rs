//! Music host capability trait.
//!
//! Each supported site implements [`MusicHost`]: URL matching,
//! authentication from stored cookies, lazy track resolution and audio
//! download. The scheduler only ever talks to hosts through this trait,
//! so tests substitute mock hosts freely.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use futures::stream::BoxStream;
use musicdl_core::{CookieRecord, Domain, Track};
use url::Url;

use crate::error::FetchError;
use crate::host::credentials::{CredentialStore, cookie_header};

/// Lazily resolved tracks of one target.
pub type TrackStream<'a> = BoxStream<'a, Result<Track, FetchError>>;

// ============================================================================
// Session
// ============================================================================

/// Authenticated context produced by [`MusicHost::authenticate`].
///
/// Lives for one fetch invocation and is never persisted. The scheduler
/// shares one session read-only across every worker handling the host's
/// tracks.
#[derive(Clone)]
pub struct Session {
    domain: Domain,
    cookies: BTreeMap<String, String>,
    account: Option<String>,
}

impl Session {
    /// Creates a session from the cookies of `domain`.
    pub fn new(domain: Domain, cookies: impl IntoIterator<Item = CookieRecord>) -> Self {
        Self {
            domain,
            cookies: cookies.into_iter().map(|c| (c.key, c.value)).collect(),
            account: None,
        }
    }

    /// Creates a session without cookies.
    pub fn anonymous(domain: Domain) -> Self {
        Self::new(domain, Vec::new())
    }

    /// Attaches the account name reported by the host.
    #[must_use]
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Domain the session belongs to.
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Account name, if the host reported one.
    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    /// Returns one cookie value.
    pub fn cookie(&self, key: &str) -> Option<&str> {
        self.cookies.get(key).map(String::as_str)
    }

    /// Formats the session cookies as a `Cookie` header value.
    pub fn cookie_header(&self) -> String {
        let records: Vec<CookieRecord> = self
            .cookies
            .iter()
            .map(|(k, v)| CookieRecord::new(self.domain.clone(), k.clone(), v.clone()))
            .collect();
        cookie_header(&records)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("domain", &self.domain)
            .field("cookies", &self.cookies.keys().collect::<Vec<_>>())
            .field("account", &self.account)
            .finish()
    }
}

/// Loads the cookies of `domain`, failing if any of `required` is absent.
///
/// # Errors
///
/// [`FetchError::MissingCredential`] names the first missing key;
/// store failures are passed through.
pub async fn load_session(
    store: &dyn CredentialStore,
    domain: &Domain,
    required: &[&str],
) -> Result<Session, FetchError> {
    let records = store.get_all(domain).await?;

    if let Some(missing) = required
        .iter()
        .find(|key| !records.iter().any(|r| r.key == **key && !r.value.is_empty()))
    {
        return Err(FetchError::MissingCredential {
            domain: domain.to_string(),
            key: (*missing).to_string(),
        });
    }

    Ok(Session::new(domain.clone(), records))
}

// ============================================================================
// Music Host Trait
// ============================================================================

/// Capability bundle for one streaming site.
///
/// Implementations are registered in a fixed, ordered
/// [`HostRegistry`](crate::registry::HostRegistry); the first host whose
/// [`matches`](Self::matches) returns true handles a target.
///
/// # Example
///
/// ```ignore
/// struct ExampleHost { domain: Domain }
///
/// #[async_trait]
/// impl MusicHost for ExampleHost {
///     fn id(&self) -> &str { "example" }
///     fn domain(&self) -> &Domain { &self.domain }
///
///     async fn authenticate(&self, store: &dyn CredentialStore) -> Result<Session, FetchError> {
///         load_session(store, &self.domain, &["session"]).await
///     }
///
///     fn resolve<'a>(&'a self, url: &'a Url, session: &'a Session) -> TrackStream<'a> {
///         // expand the URL into tracks
///     }
///
///     async fn download(&self, track: &Track, session: &Session) -> Result<Vec<u8>, FetchError> {
///         // fetch audio bytes
///     }
/// }
/// ```
#[async_trait]
pub trait MusicHost: Send + Sync {
    /// Stable identifier (e.g. `yandex-music`).
    fn id(&self) -> &str;

    /// Cookie domain; also the dispatch domain.
    fn domain(&self) -> &Domain;

    /// Returns true if this host handles `url`.
    ///
    /// The default accepts http(s) URLs whose host is the domain or one of
    /// its subdomains.
    fn matches(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
            && url
                .host_str()
                .is_some_and(|host| self.domain().covers_host(host))
    }

    /// Produces a session from stored cookies.
    ///
    /// Fails when required cookies are absent or the host rejects them.
    async fn authenticate(&self, store: &dyn CredentialStore) -> Result<Session, FetchError>;

    /// Expands `url` into tracks, lazily where the host paginates.
    ///
    /// Zero tracks is a valid result.
    fn resolve<'a>(&'a self, url: &'a Url, session: &'a Session) -> TrackStream<'a>;

    /// Downloads the audio bytes of `track`.
    async fn download(&self, track: &Track, session: &Session) -> Result<Vec<u8>, FetchError>;

    /// Downloads the cover image of `track`, if it has one.
    async fn cover(&self, _track: &Track, _session: &Session) -> Result<Option<Vec<u8>>, FetchError> {
        Ok(None)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::credentials::MemoryCredentialStore;

    fn yandex() -> Domain {
        Domain::parse("yandex.ru").unwrap()
    }

    #[tokio::test]
    async fn test_load_session_missing_cookie() {
        let store = MemoryCredentialStore::new();
        let err = load_session(&store, &yandex(), &["Session_id"])
            .await
            .unwrap_err();
        match err {
            FetchError::MissingCredential { domain, key } => {
                assert_eq!(domain, "yandex.ru");
                assert_eq!(key, "Session_id");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_session_empty_value_is_missing() {
        let store =
            MemoryCredentialStore::with_records([CookieRecord::new(yandex(), "Session_id", "")]);
        assert!(load_session(&store, &yandex(), &["Session_id"]).await.is_err());
    }

    #[tokio::test]
    async fn test_load_session_collects_cookies() {
        let store = MemoryCredentialStore::with_records([
            CookieRecord::new(yandex(), "Session_id", "abc"),
            CookieRecord::new(yandex(), "yandexuid", "42"),
        ]);
        let session = load_session(&store, &yandex(), &["Session_id"]).await.unwrap();
        assert_eq!(session.cookie("Session_id"), Some("abc"));
        assert_eq!(session.cookie_header(), "Session_id=abc; yandexuid=42");
    }

    #[test]
    fn test_session_debug_hides_values() {
        let session = Session::new(yandex(), [CookieRecord::new(yandex(), "Session_id", "secret")])
            .with_account("user");
        let debug = format!("{session:?}");
        assert!(debug.contains("Session_id"));
        assert!(!debug.contains("secret"));
        assert_eq!(session.account(), Some("user"));
    }
}
