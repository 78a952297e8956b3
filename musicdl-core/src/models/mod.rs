//! Domain models for the music downloader.
//!
//! ## Submodules
//!
//! - [`cookie`] - Credential types (Domain, CookieRecord)
//! - [`track`] - Host and track types (HostKind, Track)
//! - [`conflict`] - Destination collision policy (ConflictDecision)
//! - [`report`] - Outcomes and the aggregated fetch report

mod conflict;
mod cookie;
mod report;
mod track;

// Re-export everything at the models level
pub use conflict::{ConflictDecision, SkipReason};
pub use cookie::{CookieRecord, Domain};
pub use report::{
    FetchReport, ReportSummary, TargetReport, TargetStatus, TrackOutcome, TrackReport,
};
pub use track::{HostKind, MAX_FILE_NAME_BYTES, Track, TrackId};
