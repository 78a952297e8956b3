//! Outcomes and the aggregated fetch report.
//!
//! A [`FetchReport`] holds one [`TargetReport`] per caller-supplied target,
//! in caller order. Each target either failed as a whole (unsupported,
//! authentication, resolution) or lists its tracks in resolver order with
//! one [`TrackOutcome`] each.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::conflict::SkipReason;
use super::track::Track;
use crate::error::TrackError;

// ============================================================================
// Track Outcome
// ============================================================================

/// Outcome of processing one track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrackOutcome {
    /// File written at `path`.
    Downloaded {
        /// Final destination path.
        path: PathBuf,
    },
    /// Track intentionally not written.
    Skipped {
        /// Destination path that was left untouched.
        path: PathBuf,
        /// Why the track was skipped.
        reason: SkipReason,
    },
    /// Track failed.
    Failed {
        /// The failure.
        error: TrackError,
    },
}

impl TrackOutcome {
    /// Creates a failed outcome.
    pub fn failed(error: TrackError) -> Self {
        Self::Failed { error }
    }

    /// Returns true if this outcome counts as a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Returns the error, if any.
    pub fn error(&self) -> Option<&TrackError> {
        match self {
            Self::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// One track with its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackReport {
    /// The resolved track.
    pub track: Track,
    /// What happened to it.
    pub outcome: TrackOutcome,
}

// ============================================================================
// Target Report
// ============================================================================

/// Target-level status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TargetStatus {
    /// The target was dispatched, authenticated and resolved.
    Resolved,
    /// The target failed before (or while) producing tracks.
    Failed {
        /// The failure shared by the whole target.
        error: TrackError,
    },
}

/// Report entry for one caller-supplied target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetReport {
    /// Target URL as supplied by the caller.
    pub target: String,
    /// Identifier of the host that handled the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Target-level status.
    pub status: TargetStatus,
    /// Track outcomes in resolver order.
    #[serde(default)]
    pub tracks: Vec<TrackReport>,
}

impl TargetReport {
    /// Creates an entry for a target that resolved to `tracks`.
    pub fn resolved(target: impl Into<String>, host: impl Into<String>, tracks: Vec<TrackReport>) -> Self {
        Self {
            target: target.into(),
            host: Some(host.into()),
            status: TargetStatus::Resolved,
            tracks,
        }
    }

    /// Creates an entry for a target that failed as a whole.
    pub fn failed(target: impl Into<String>, host: Option<String>, error: TrackError) -> Self {
        Self {
            target: target.into(),
            host,
            status: TargetStatus::Failed { error },
            tracks: Vec::new(),
        }
    }

    /// Returns the target-level error, if any.
    pub fn error(&self) -> Option<&TrackError> {
        match &self.status {
            TargetStatus::Failed { error } => Some(error),
            TargetStatus::Resolved => None,
        }
    }

    /// Returns true if the target and all its tracks succeeded or were skipped.
    pub fn is_success(&self) -> bool {
        self.error().is_none() && !self.tracks.iter().any(|t| t.outcome.is_failure())
    }
}

// ============================================================================
// Fetch Report
// ============================================================================

/// Counters over a whole report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Number of targets.
    pub targets: usize,
    /// Number of track outcomes.
    pub tracks: usize,
    /// Tracks written.
    pub downloaded: usize,
    /// Tracks skipped.
    pub skipped: usize,
    /// Tracks failed.
    pub failed: usize,
    /// Targets that failed as a whole.
    pub failed_targets: usize,
    /// Targets no host claimed.
    pub unsupported: usize,
}

/// Aggregated result of one fetch invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchReport {
    /// When the invocation started.
    pub started_at: DateTime<Utc>,
    /// When the last worker finished.
    pub finished_at: DateTime<Utc>,
    /// One entry per target, in caller order.
    pub targets: Vec<TargetReport>,
}

impl FetchReport {
    /// Creates a report finishing now.
    pub fn new(started_at: DateTime<Utc>, targets: Vec<TargetReport>) -> Self {
        Self {
            started_at,
            finished_at: Utc::now(),
            targets,
        }
    }

    /// Computes the summary counters.
    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary {
            targets: self.targets.len(),
            ..ReportSummary::default()
        };

        for target in &self.targets {
            match target.error() {
                Some(TrackError::UnsupportedTarget(_)) => summary.unsupported += 1,
                Some(_) => summary.failed_targets += 1,
                None => {}
            }

            for track in &target.tracks {
                summary.tracks += 1;
                match track.outcome {
                    TrackOutcome::Downloaded { .. } => summary.downloaded += 1,
                    TrackOutcome::Skipped { .. } => summary.skipped += 1,
                    TrackOutcome::Failed { .. } => summary.failed += 1,
                }
            }
        }

        summary
    }

    /// Total number of track outcomes.
    pub fn track_count(&self) -> usize {
        self.targets.iter().map(|t| t.tracks.len()).sum()
    }

    /// Returns true if no target failed and no track failed.
    ///
    /// Skipped tracks are not failures.
    pub fn is_success(&self) -> bool {
        self.targets.iter().all(TargetReport::is_success)
    }

    /// Returns true if any track failed on a destination conflict.
    pub fn has_conflicts(&self) -> bool {
        self.targets
            .iter()
            .flat_map(|t| &t.tracks)
            .any(|t| matches!(t.outcome.error(), Some(TrackError::Conflict(_))))
    }

    /// Wall-clock duration of the invocation.
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

// ============================================================================
// Tests
// ============================================================================
