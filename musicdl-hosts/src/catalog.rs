//! Host catalog for managing all host descriptors.
//!
//! The catalog provides static access to all host configurations and
//! builds the ordered [`HostRegistry`] a fetch invocation dispatches over.

use std::sync::OnceLock;

use musicdl_core::{Domain, HostKind};
use musicdl_fetch::{FetchContext, HostRegistry, RegistryError};
use tracing::debug;

use crate::descriptor::HostDescriptor;
use crate::yandex::yandex_descriptor;

// ============================================================================
// Static Catalog
// ============================================================================

/// Static storage for all host descriptors.
static DESCRIPTORS: OnceLock<Vec<HostDescriptor>> = OnceLock::new();

/// Initializes all host descriptors in dispatch priority order.
fn init_descriptors() -> Vec<HostDescriptor> {
    vec![yandex_descriptor()]
}

// ============================================================================
// Host Catalog
// ============================================================================

/// Global catalog of all host descriptors.
pub struct HostCatalog;

impl HostCatalog {
    /// Returns all host descriptors.
    pub fn all() -> &'static [HostDescriptor] {
        DESCRIPTORS.get_or_init(init_descriptors)
    }

    /// Gets a host descriptor by kind.
    pub fn get(id: HostKind) -> Option<&'static HostDescriptor> {
        Self::all().iter().find(|d| d.id == id)
    }

    /// Looks up the host serving `domain` (subdomains included).
    ///
    /// Returns `None` for unknown or malformed domains.
    pub fn get_by_domain(domain: &str) -> Option<&'static HostDescriptor> {
        let domain = Domain::parse(domain).ok()?;
        Self::all().iter().find(|d| d.serves(&domain))
    }

    /// Returns the number of registered hosts.
    pub fn count() -> usize {
        Self::all().len()
    }

    /// Returns all host kinds.
    pub fn kinds() -> Vec<HostKind> {
        Self::all().iter().map(|d| d.id).collect()
    }

    /// Builds the dispatch registry for one invocation.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateDomain`] if two descriptors claim one domain.
    pub fn build_registry(ctx: &FetchContext) -> Result<HostRegistry, RegistryError> {
        let hosts = Self::all().iter().map(|d| d.build(ctx)).collect();
        let registry = HostRegistry::new(hosts)?;
        debug!(hosts = registry.len(), "Registry built from catalog");
        Ok(registry)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_every_kind() {
        for kind in HostKind::all() {
            let desc = HostCatalog::get(*kind);
            assert!(desc.is_some(), "Should find host {kind:?}");
            assert_eq!(desc.unwrap().id, *kind);
        }
        assert_eq!(HostCatalog::count(), HostKind::all().len());
        assert_eq!(HostCatalog::kinds(), HostKind::all());
    }

    #[test]
    fn test_domain_lookup() {
        assert_eq!(
            HostCatalog::get_by_domain("yandex.ru").map(|d| d.id),
            Some(HostKind::YandexMusic)
        );
        assert_eq!(
            HostCatalog::get_by_domain("Music.Yandex.RU").map(|d| d.id),
            Some(HostKind::YandexMusic)
        );
        assert!(HostCatalog::get_by_domain("unknown.example.com").is_none());
        assert!(HostCatalog::get_by_domain("youtube.com").is_none());
        assert!(HostCatalog::get_by_domain("").is_none());
    }

    #[test]
    fn test_build_registry() {
        let ctx = FetchContext::new();
        let registry = HostCatalog::build_registry(&ctx).unwrap();
        assert_eq!(registry.len(), HostCatalog::count());
        assert!(registry.get("yandex-music").is_some());
    }

    #[test]
    fn test_catalog_domains_unique() {
        let domains: Vec<_> = HostCatalog::all().iter().map(|d| d.domain()).collect();
        let mut deduped = domains.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(domains.len(), deduped.len());
    }
}
