// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # musicdl Fetch
//!
//! The fetch pipeline: turning target URLs into tagged audio files.
//!
//! ## Host APIs
//!
//! The [`host`] module provides the collaborators hosts are built from:
//!
//! - [`host::credentials`] - Per-domain cookie storage
//! - [`host::http`] - HTTP client with tracing
//!
//! ## Pipeline
//!
//! - [`source::MusicHost`] - Capability trait every site implements
//! - [`registry::HostRegistry`] - Ordered host list, first match wins
//! - [`tagger::Tagger`] - Embeds metadata and cover art
//! - [`conflict::ConflictResolver`] - Destination collision policy and atomic writes
//! - [`scheduler::FetchScheduler`] - Bounded worker pool producing the report
//!
//! ## Example
//!
//! ```ignore
//! use musicdl_fetch::{FetchContext, FetchOptions, FetchScheduler, HostRegistry};
//!
//! let ctx = FetchContext::new();
//! let registry = Arc::new(HostRegistry::new(vec![Arc::new(MyHost::new(&ctx))])?);
//! let scheduler = FetchScheduler::new(registry, &ctx);
//!
//! let options = FetchOptions::new("/tmp/out", 4);
//! let report = scheduler.run(&targets, &options, CancellationToken::new()).await?;
//! ```

pub mod conflict;
pub mod context;
pub mod error;
pub mod host;
pub mod registry;
pub mod scheduler;
pub mod source;
pub mod tagger;

// Errors
pub use error::{
    ConflictError, CredentialError, FetchError, HttpError, RegistryError, Stage, TagError,
};

// Host APIs
pub use host::{CredentialStore, HttpClient, MemoryCredentialStore, cookie_header};

// Pipeline
pub use conflict::{ConflictResolver, Placement, WriteOutcome};
pub use context::{FetchContext, FetchContextBuilder, FetchSettings};
pub use registry::{Dispatch, HostRegistry};
pub use scheduler::{FetchOptions, FetchScheduler, MAX_LIMIT, MIN_LIMIT, destination_path};
pub use source::{MusicHost, Session, TrackStream, load_session};
pub use tagger::{Id3Tagger, Tagger};

// Cancellation is part of the public `run` signature.
pub use tokio_util::sync::CancellationToken;
