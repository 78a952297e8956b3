//! Ordered host registry and target dispatch.

use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::error::RegistryError;
use crate::source::MusicHost;

/// Result of dispatching one target.
pub enum Dispatch<'a> {
    /// A registered host claims the target.
    Host {
        /// Position of the host in the registry.
        index: usize,
        /// The host.
        host: &'a Arc<dyn MusicHost>,
        /// The parsed target URL.
        url: Url,
    },
    /// No host claims the target (or it is not a URL).
    Unsupported {
        /// The target as supplied by the caller.
        target: String,
    },
}

impl std::fmt::Debug for Dispatch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Host { index, host, url } => f
                .debug_struct("Host")
                .field("index", index)
                .field("host", &host.id())
                .field("url", &url.as_str())
                .finish(),
            Self::Unsupported { target } => {
                f.debug_struct("Unsupported").field("target", target).finish()
            }
        }
    }
}

/// Fixed, ordered list of hosts. First match wins.
pub struct HostRegistry {
    hosts: Vec<Arc<dyn MusicHost>>,
}

impl HostRegistry {
    /// Creates a registry, rejecting two hosts with the same domain.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateDomain`] if any two hosts share a domain.
    pub fn new(hosts: Vec<Arc<dyn MusicHost>>) -> Result<Self, RegistryError> {
        for (i, host) in hosts.iter().enumerate() {
            if let Some(earlier) = hosts[..i].iter().find(|h| h.domain() == host.domain()) {
                return Err(RegistryError::DuplicateDomain {
                    domain: host.domain().to_string(),
                    first: earlier.id().to_string(),
                    second: host.id().to_string(),
                });
            }
        }

        debug!(hosts = hosts.len(), "Host registry created");
        Ok(Self { hosts })
    }

    /// Finds the host for `target`.
    pub fn dispatch(&self, target: &str) -> Dispatch<'_> {
        let Ok(url) = Url::parse(target.trim()) else {
            debug!(target, "Target is not a URL");
            return Dispatch::Unsupported {
                target: target.to_string(),
            };
        };

        match self.hosts.iter().enumerate().find(|(_, h)| h.matches(&url)) {
            Some((index, host)) => {
                debug!(target, host = host.id(), "Target dispatched");
                Dispatch::Host { index, host, url }
            }
            None => {
                debug!(target, "No host for target");
                Dispatch::Unsupported {
                    target: target.to_string(),
                }
            }
        }
    }

    /// Returns the registered hosts in priority order.
    pub fn hosts(&self) -> &[Arc<dyn MusicHost>] {
        &self.hosts
    }

    /// Returns the host with the given id.
    pub fn get(&self, id: &str) -> Option<&Arc<dyn MusicHost>> {
        self.hosts.iter().find(|h| h.id() == id)
    }

    /// Number of registered hosts.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Returns true if no host is registered.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl std::fmt::Debug for HostRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.hosts.iter().map(|h| h.id()))
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
