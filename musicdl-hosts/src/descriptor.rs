//! Host descriptor system.
//!
//! A descriptor contains all the static configuration for a host:
//! - Metadata (display name, cookie domain, required cookies)
//! - Help text shown by `about`
//! - A constructor building the [`MusicHost`] for a fetch context

use std::sync::Arc;

use musicdl_core::{Domain, HostKind};
use musicdl_fetch::{FetchContext, MusicHost};

// ============================================================================
// Host Descriptor
// ============================================================================

/// Complete descriptor for a host.
pub struct HostDescriptor {
    /// Host identifier.
    pub id: HostKind,
    /// Display metadata.
    pub metadata: HostMetadata,
    /// Builds the host for one invocation.
    pub build_host: fn(&FetchContext) -> Arc<dyn MusicHost>,
}

impl HostDescriptor {
    /// Returns the display name.
    pub fn display_name(&self) -> &str {
        self.metadata.display_name
    }

    /// Returns the cookie domain.
    pub fn domain(&self) -> &'static str {
        self.metadata.domain
    }

    /// Returns true if `domain` is this host's domain or one of its subdomains.
    pub fn serves(&self, domain: &Domain) -> bool {
        Domain::parse(self.metadata.domain).is_ok_and(|own| own.covers_host(domain.as_str()))
    }

    /// Builds the host.
    pub fn build(&self, ctx: &FetchContext) -> Arc<dyn MusicHost> {
        (self.build_host)(ctx)
    }

    /// Renders the description printed by `about <domain>`.
    pub fn about(&self) -> String {
        let meta = &self.metadata;
        let mut out = format!(
            "{} ({})\n\n{}\n\nCookies: {}",
            meta.display_name,
            meta.domain,
            meta.description,
            meta.cookie_keys.join(", ")
        );

        if !meta.url_examples.is_empty() {
            out.push_str("\n\nSupported URLs:");
            for example in meta.url_examples {
                out.push_str("\n  ");
                out.push_str(example);
            }
        }

        out.push_str(&format!(
            "\n\nSet the cookie with:\n  downloader cookies set --domain {} --key {} --value <CookieValue>",
            meta.domain,
            meta.cookie_keys.first().copied().unwrap_or("<Key>")
        ));
        out
    }
}

impl std::fmt::Debug for HostDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostDescriptor")
            .field("id", &self.id)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Host Metadata
// ============================================================================

/// Static metadata about a host.
#[derive(Debug, Clone)]
pub struct HostMetadata {
    /// Display name (e.g. "Yandex Music").
    pub display_name: &'static str,
    /// Cookie and dispatch domain.
    pub domain: &'static str,
    /// Cookies that must be present to authenticate.
    pub cookie_keys: &'static [&'static str],
    /// Example target URLs.
    pub url_examples: &'static [&'static str],
    /// Free-form description.
    pub description: &'static str,
    /// Home page.
    pub homepage: &'static str,
}
