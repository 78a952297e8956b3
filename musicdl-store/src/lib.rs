// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # musicdl Store
//!
//! Durable state for the music downloader.
//!
//! This crate provides:
//!
//! - **CookieStore**: JSON-file [`musicdl_fetch::CredentialStore`], keyed by domain
//! - **Settings**: Defaults for `fetch` options and the HTTP client
//! - **Persistence**: Atomic, owner-only JSON file helpers
//!
//! ## Usage
//!
//! ```ignore
//! use musicdl_store::{CookieStore, Settings, default_config_dir, cookies_path, settings_path};
//!
//! let dir = default_config_dir();
//! let cookies = CookieStore::open(cookies_path(&dir)).await;
//! let settings = Settings::load(&settings_path(&dir)).await;
//! ```

pub mod cookies;
pub mod error;
pub mod persistence;
pub mod settings;

pub use cookies::CookieStore;
pub use error::StoreError;
pub use persistence::{
    COOKIES_FILE, SETTINGS_FILE, cookies_path, default_config_dir, ensure_dir, expand_home,
    load_json, load_json_or_default, save_json, settings_path,
};
pub use settings::Settings;
