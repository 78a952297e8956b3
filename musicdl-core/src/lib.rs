// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Music Downloader Core
//!
//! Core types and models shared by every crate of the music downloader.
//!
//! This crate has no I/O of its own. It provides:
//!
//! - Domain models (domains, cookie records, tracks, hosts)
//! - Per-track outcomes and the aggregated fetch report
//! - Error types
//!
//! ## Key Types
//!
//! ### Credentials
//! - [`Domain`] - Normalized partition key for cookies and host dispatch
//! - [`CookieRecord`] - A `(domain, key, value)` triple
//!
//! ### Tracks
//! - [`Track`] - Immutable resolved unit of downloadable audio
//! - [`HostKind`] - Enum of all supported streaming hosts
//!
//! ### Outcomes
//! - [`ConflictDecision`] - Destination-collision policy for one invocation
//! - [`TrackOutcome`] - Downloaded, skipped or failed
//! - [`TargetReport`] / [`FetchReport`] - Aggregated invocation result
//! - [`TrackError`] - Serializable per-track / per-target failure

pub mod error;
pub mod models;

// Re-export error types
pub use error::{CoreError, TrackError};

// Re-export all model types
pub use models::{
    // Credentials
    CookieRecord,
    Domain,
    // Hosts & tracks
    HostKind,
    MAX_FILE_NAME_BYTES,
    Track,
    TrackId,
    // Conflicts
    ConflictDecision,
    SkipReason,
    // Reports
    FetchReport,
    ReportSummary,
    TargetReport,
    TargetStatus,
    TrackOutcome,
    TrackReport,
};
