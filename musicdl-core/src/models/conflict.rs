//! Destination collision policy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// What to do when a destination file already exists.
///
/// Fixed for a whole fetch invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConflictDecision {
    /// Record the track as failed and leave the existing file untouched.
    #[default]
    #[serde(rename = "ERROR")]
    Error,
    /// Skip the track and leave the existing file untouched.
    #[serde(rename = "IGNORE")]
    Ignore,
    /// Atomically replace the existing file.
    #[serde(rename = "OVERRIDE", alias = "OVERWRITE")]
    Overwrite,
}

impl ConflictDecision {
    /// Returns the command-line spelling of this decision.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Ignore => "IGNORE",
            Self::Overwrite => "OVERRIDE",
        }
    }

    /// Returns all decisions.
    pub fn all() -> &'static [ConflictDecision] {
        &[Self::Error, Self::Ignore, Self::Overwrite]
    }
}

impl fmt::Display for ConflictDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictDecision {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ERROR" => Ok(Self::Error),
            "IGNORE" => Ok(Self::Ignore),
            "OVERRIDE" | "OVERWRITE" => Ok(Self::Overwrite),
            _ => Err(CoreError::InvalidConflictDecision(s.to_string())),
        }
    }
}

/// Why a track was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Destination exists and the decision is `IGNORE`.
    AlreadyExists,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExists => f.write_str("already exists"),
        }
    }
}
