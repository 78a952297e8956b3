//! Fetch error types.

use std::path::PathBuf;

use musicdl_core::{CoreError, TrackError};
use thiserror::Error;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for fetch operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// A required cookie is missing from the credential store.
    #[error("Missing cookie {key} for {domain}")]
    MissingCredential {
        /// Cookie domain.
        domain: String,
        /// Cookie key.
        key: String,
    },

    /// The host rejected the supplied credentials.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Credential store error.
    #[error("Credential store error: {0}")]
    Credential(#[from] CredentialError),

    /// URL recognized by a host but not addressable to content.
    #[error("Cannot resolve {0}")]
    Unresolvable(String),

    /// The host reports the resource absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid response from the host.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Tagging error.
    #[error("Tag error: {0}")]
    Tag(#[from] TagError),

    /// Destination conflict or write failure.
    #[error("Write error: {0}")]
    Conflict(#[from] ConflictError),

    /// Host registration error.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Invalid fetch options.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The invocation was cancelled.
    #[error("Cancelled")]
    Cancelled,
}

/// Pipeline stage an error was raised in.
///
/// Transport-level failures are reported differently depending on whether
/// they happened while resolving a target or while fetching audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Authenticating a host.
    Authenticate,
    /// Expanding a target into tracks.
    Resolve,
    /// Download, tag and write of one track.
    Process,
}

impl FetchError {
    /// Returns true if this error must abort the whole invocation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Credential(CredentialError::Unavailable(_)) | Self::Registry(_)
        )
    }

    /// Converts this error into the report representation.
    pub fn to_track_error(&self, stage: Stage) -> TrackError {
        let message = self.to_string();
        match self {
            Self::MissingCredential { .. }
            | Self::AuthenticationFailed(_)
            | Self::Credential(_)
            | Self::Http(HttpError::Unauthorized(_)) => TrackError::Auth(message),
            Self::Unresolvable(_) => TrackError::Resolve(message),
            Self::NotFound(_) | Self::Http(HttpError::NotFound(_)) => TrackError::NotFound(message),
            Self::Tag(_) => TrackError::Tag(message),
            Self::Conflict(ConflictError::Exists(path)) => {
                TrackError::Conflict(path.display().to_string())
            }
            Self::Conflict(ConflictError::Io(_) | ConflictError::NameTooLong(_)) | Self::Io(_) => {
                TrackError::Io(message)
            }
            Self::Cancelled => TrackError::Cancelled,
            Self::Http(_)
            | Self::InvalidResponse(_)
            | Self::Json(_)
            | Self::Registry(_)
            | Self::InvalidOptions(_)
            | Self::Core(_) => match stage {
                Stage::Authenticate => TrackError::Auth(message),
                Stage::Resolve => TrackError::Resolve(message),
                Stage::Process => TrackError::Download(message),
            },
        }
    }
}

// ============================================================================
// HTTP Error
// ============================================================================

/// HTTP-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// 401 or 403.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 404.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Response status code.
        status: u16,
        /// Request URL.
        url: String,
    },
}

// ============================================================================
// Credential Error
// ============================================================================

/// Error type for credential store operations.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The store cannot be read at all.
    #[error("Credential store unavailable: {0}")]
    Unavailable(String),

    /// The store could not persist a change.
    #[error("Failed to write credential store: {0}")]
    Write(String),
}

impl CredentialError {
    /// Returns true if the store is unreadable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

// ============================================================================
// Tag Error
// ============================================================================

/// Error type for audio tagging.
#[derive(Debug, Error)]
pub enum TagError {
    /// Audio bytes are not a recognized container.
    #[error("Unsupported audio container: {0}")]
    UnsupportedContainer(String),

    /// Encoding the tag failed.
    #[error("Failed to encode tag: {0}")]
    Encode(#[from] id3::Error),
}

// ============================================================================
// Conflict Error
// ============================================================================

/// Error type for destination writes.
#[derive(Debug, Error)]
pub enum ConflictError {
    /// Destination exists and the decision forbids replacing it.
    #[error("Destination already exists: {}", .0.display())]
    Exists(PathBuf),

    /// File name exceeds what the filesystem accepts.
    #[error("File name too long: {}", .0.display())]
    NameTooLong(PathBuf),

    /// Write or rename failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Registry Error
// ============================================================================

/// Error type for host registration.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two hosts claim the same domain.
    #[error("Hosts {first} and {second} both claim domain {domain}")]
    DuplicateDomain {
        /// The contested domain.
        domain: String,
        /// Id of the host registered first.
        first: String,
        /// Id of the host registered second.
        second: String,
    },
}

// ============================================================================
// Tests
// ============================================================================
