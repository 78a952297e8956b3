//! Host APIs used by music hosts.
//!
//! - [`credentials`] - Per-domain cookie storage
//! - [`http`] - HTTP client with tracing and status mapping

pub mod credentials;
pub mod http;

// Re-export key types
pub use credentials::{CredentialStore, MemoryCredentialStore, cookie_header};
pub use http::HttpClient;
