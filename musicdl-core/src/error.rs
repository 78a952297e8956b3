//! Core error types for the music downloader.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core error type for model validation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Domain string is empty or malformed.
    #[error("Invalid domain: {0:?}")]
    InvalidDomain(String),

    /// Conflict decision string is not one of the known variants.
    #[error("Unknown conflict decision: {0} (expected ERROR, IGNORE or OVERRIDE)")]
    InvalidConflictDecision(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure recorded for a single track or target in the fetch report.
///
/// Unlike the library error types this one is cloneable and serializable:
/// an authentication failure is shared by every target of the same host,
/// and the whole report can be rendered as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum TrackError {
    /// No registered host handles the target URL.
    #[error("{0} is not supported by any host")]
    UnsupportedTarget(String),

    /// Credentials are missing or were rejected by the host.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The URL is recognized by a host but does not address content.
    #[error("Resolve failed: {0}")]
    Resolve(String),

    /// The host reports the resource absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network failure while fetching audio.
    #[error("Download failed: {0}")]
    Download(String),

    /// Audio container could not be tagged.
    #[error("Tagging failed: {0}")]
    Tag(String),

    /// Destination exists and the conflict decision is `ERROR`.
    #[error("Destination already exists: {0}")]
    Conflict(String),

    /// Write or rename failure.
    #[error("IO error: {0}")]
    Io(String),

    /// The invocation was cancelled before this work ran.
    #[error("Cancelled")]
    Cancelled,
}

impl TrackError {
    /// Returns a short machine-readable name for this error kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::UnsupportedTarget(_) => "unsupported_target",
            Self::Auth(_) => "auth",
            Self::Resolve(_) => "resolve",
            Self::NotFound(_) => "not_found",
            Self::Download(_) => "download",
            Self::Tag(_) => "tag",
            Self::Conflict(_) => "conflict",
            Self::Io(_) => "io",
            Self::Cancelled => "cancelled",
        }
    }
}
