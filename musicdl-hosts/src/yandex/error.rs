//! Yandex Music specific errors.

use musicdl_fetch::{FetchError, HttpError};
use thiserror::Error;

/// Yandex Music specific errors.
#[derive(Debug, Error)]
pub enum YandexError {
    /// HTTP request failed.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The session cookie was not accepted.
    #[error("Session is not logged in (expired or invalid Session_id)")]
    NotLoggedIn,

    /// The API reports the resource absent.
    #[error("{0} not found")]
    NotFound(String),

    /// URL on a Yandex host that does not address an album, track or playlist.
    #[error("Unsupported Yandex Music URL: {0}")]
    UnsupportedUrl(String),

    /// Response did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<YandexError> for FetchError {
    fn from(err: YandexError) -> Self {
        match err {
            YandexError::Http(e) => FetchError::Http(e),
            YandexError::NotLoggedIn => FetchError::AuthenticationFailed(err.to_string()),
            YandexError::NotFound(what) => FetchError::NotFound(what),
            YandexError::UnsupportedUrl(url) => FetchError::Unresolvable(url),
            YandexError::InvalidResponse(msg) => FetchError::InvalidResponse(msg),
        }
    }
}
