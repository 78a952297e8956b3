//! User settings.
//!
//! Defaults for `fetch` options and the HTTP client, read from
//! `settings.json`. Command-line flags override every value here.

use std::path::Path;
use std::time::Duration;

use musicdl_core::ConflictDecision;
use musicdl_fetch::{FetchSettings, MAX_LIMIT, MIN_LIMIT};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::persistence::{load_json_or_default, save_json};

/// User preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Worker count when `-l` is not given.
    pub default_limit: usize,

    /// Conflict decision when `-c` is not given.
    pub default_conflict: ConflictDecision,

    /// Per-request HTTP timeout in seconds.
    pub http_timeout_secs: u64,

    /// User agent override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_limit: 4,
            default_conflict: ConflictDecision::Error,
            http_timeout_secs: 30,
            user_agent: None,
        }
    }
}

impl Settings {
    /// Loads settings from `path`.
    ///
    /// A missing file yields defaults; a malformed file is logged and
    /// yields defaults. Out-of-range values are clamped.
    pub async fn load(path: &Path) -> Self {
        let mut settings: Self = load_json_or_default(path).await;

        let clamped = settings.default_limit.clamp(MIN_LIMIT, MAX_LIMIT);
        if clamped != settings.default_limit {
            warn!(
                value = settings.default_limit,
                clamped, "default_limit out of range"
            );
            settings.default_limit = clamped;
        }
        if settings.http_timeout_secs == 0 {
            warn!("http_timeout_secs must be positive, using default");
            settings.http_timeout_secs = Self::default().http_timeout_secs;
        }

        debug!(?settings, "Settings loaded");
        settings
    }

    /// Saves settings to `path`.
    pub async fn save(&self, path: &Path) -> Result<(), StoreError> {
        save_json(path, self).await
    }

    /// Returns the HTTP timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Converts into network settings for the fetch context.
    pub fn fetch_settings(&self) -> FetchSettings {
        let settings = FetchSettings::default().with_timeout(self.http_timeout());
        match &self.user_agent {
            Some(ua) => settings.with_user_agent(ua.clone()),
            None => settings,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
