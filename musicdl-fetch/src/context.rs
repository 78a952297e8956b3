//! Fetch context providing access to host APIs.
//!
//! The context is built once per invocation and handed to every host
//! constructor. It bundles the HTTP client and the credential store.

use std::sync::Arc;
use std::time::Duration;

use crate::host::{CredentialStore, HttpClient, MemoryCredentialStore};

// ============================================================================
// Fetch Settings
// ============================================================================

/// Settings for network operations.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Timeout for each HTTP request.
    pub timeout: Duration,
    /// User agent override.
    pub user_agent: Option<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: None,
        }
    }
}

impl FetchSettings {
    /// Sets a custom timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets a custom user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

// ============================================================================
// Fetch Context
// ============================================================================

/// Context shared by hosts and the scheduler.
pub struct FetchContext {
    /// HTTP client with tracing.
    pub http: Arc<HttpClient>,
    /// Cookie store read by authenticators.
    pub credentials: Arc<dyn CredentialStore>,
    /// Network settings.
    pub settings: FetchSettings,
}

impl FetchContext {
    /// Creates a context with default settings and an empty in-memory store.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a builder for customizing the context.
    pub fn builder() -> FetchContextBuilder {
        FetchContextBuilder::new()
    }

    /// Returns the effective request timeout.
    pub fn timeout(&self) -> Duration {
        self.settings.timeout
    }
}

impl Default for FetchContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FetchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Fetch Context Builder
// ============================================================================

/// Builder for constructing a `FetchContext`.
pub struct FetchContextBuilder {
    http: Option<Arc<HttpClient>>,
    credentials: Option<Arc<dyn CredentialStore>>,
    settings: FetchSettings,
}

impl FetchContextBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            http: None,
            credentials: None,
            settings: FetchSettings::default(),
        }
    }

    /// Sets the HTTP client. Overrides the client built from settings.
    pub fn http(mut self, http: Arc<HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Sets the credential store.
    pub fn credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets the fetch settings.
    pub fn settings(mut self, settings: FetchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    /// Builds the fetch context.
    pub fn build(self) -> FetchContext {
        let settings = self.settings;
        let http = self.http.unwrap_or_else(|| {
            Arc::new(HttpClient::with_options(
                settings.timeout,
                settings.user_agent.as_deref(),
            ))
        });

        FetchContext {
            http,
            credentials: self
                .credentials
                .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new())),
            settings,
        }
    }
}

impl Default for FetchContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
