//! Credential types.
//!
//! - [`Domain`] - Normalized site domain (e.g. `yandex.ru`)
//! - [`CookieRecord`] - A `(domain, key, value)` triple

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

// ============================================================================
// Domain
// ============================================================================

/// Normalized domain identifier.
///
/// Domains are the partition key for stored cookies and for host dispatch.
/// Normalization trims whitespace, strips a leading `.` (as browsers export
/// cookie domains) and lower-cases the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Domain(String);

impl Domain {
    /// Parses and normalizes a domain string.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let normalized = raw.trim().trim_start_matches('.').to_ascii_lowercase();

        let invalid = normalized.is_empty()
            || normalized.ends_with('.')
            || normalized.contains("..")
            || normalized
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '/' | ':' | '@' | '?' | '#'));

        if invalid {
            return Err(CoreError::InvalidDomain(raw.to_string()));
        }

        Ok(Self(normalized))
    }

    /// Returns the domain as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if `host` is this domain or one of its subdomains.
    ///
    /// `music.yandex.ru` is covered by `yandex.ru`; `notyandex.ru` is not.
    pub fn covers_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        host == self.0
            || host
                .strip_suffix(self.0.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Domain {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Domain {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Domain> for String {
    fn from(domain: Domain) -> Self {
        domain.0
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Cookie Record
// ============================================================================

/// A stored cookie: `(domain, key, value)`.
///
/// `(domain, key)` is unique within a credential store; setting an existing
/// pair replaces its value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieRecord {
    /// Domain the cookie belongs to.
    pub domain: Domain,
    /// Cookie name (e.g. `Session_id`).
    pub key: String,
    /// Opaque cookie value.
    pub value: String,
}

impl CookieRecord {
    /// Creates a new cookie record.
    pub fn new(domain: Domain, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            domain,
            key: key.into(),
            value: value.into(),
        }
    }
}

// Cookie values are session secrets; keep them out of logs.
impl fmt::Debug for CookieRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieRecord")
            .field("domain", &self.domain)
            .field("key", &self.key)
            .field("value", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_normalization() {
        assert_eq!(Domain::parse("yandex.ru").unwrap().as_str(), "yandex.ru");
        assert_eq!(Domain::parse("  Yandex.RU ").unwrap().as_str(), "yandex.ru");
        assert_eq!(Domain::parse(".yandex.ru").unwrap().as_str(), "yandex.ru");
    }

    #[test]
    fn test_domain_rejects_garbage() {
        for raw in ["", "   ", ".", "https://yandex.ru", "yan dex.ru", "a..b", "yandex.ru."] {
            assert!(Domain::parse(raw).is_err(), "should reject {raw:?}");
        }
    }

    #[test]
    fn test_domain_covers_host() {
        let domain = Domain::parse("yandex.ru").unwrap();
        assert!(domain.covers_host("yandex.ru"));
        assert!(domain.covers_host("music.yandex.ru"));
        assert!(domain.covers_host("MUSIC.Yandex.RU"));
        assert!(!domain.covers_host("notyandex.ru"));
        assert!(!domain.covers_host("yandex.ru.evil.com"));
        assert!(!domain.covers_host("yandex.com"));
    }

    #[test]
    fn test_cookie_record_debug_redacts_value() {
        let record = CookieRecord::new(Domain::parse("yandex.ru").unwrap(), "Session_id", "secret");
        let debug = format!("{record:?}");
        assert!(debug.contains("Session_id"));
        assert!(!debug.contains("secret"));
    }
}
