// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # musicdl Hosts
//!
//! Streaming-site implementations of [`musicdl_fetch::MusicHost`].
//!
//! Each host module includes:
//!
//! - **Descriptor**: Static configuration (display name, cookie domain,
//!   required cookies, `about` text)
//! - **API client**: The site's JSON handlers
//! - **Parser**: URL patterns and response conversion into tracks
//!
//! ## Supported Hosts
//!
//! | Host | Domain | Albums | Tracks | Playlists |
//! |------|--------|--------|--------|-----------|
//! | Yandex Music | `yandex.ru` | ✅ | ✅ | ✅ |
//!
//! ## Usage
//!
//! ```ignore
//! use musicdl_hosts::HostCatalog;
//! use musicdl_fetch::{FetchContext, FetchScheduler};
//!
//! let ctx = FetchContext::new();
//! let registry = Arc::new(HostCatalog::build_registry(&ctx)?);
//! let scheduler = FetchScheduler::new(registry, &ctx);
//! ```

pub mod catalog;
pub mod descriptor;

// Host modules (alphabetical)
pub mod yandex;

// Re-export key types
pub use catalog::HostCatalog;
pub use descriptor::{HostDescriptor, HostMetadata};

// Re-export host descriptors
pub use yandex::yandex_descriptor;
