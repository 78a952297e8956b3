//! Yandex Music host implementation.
//!
//! Authentication uses the `Session_id` cookie of a logged-in browser
//! session, stored under the `yandex.ru` domain.

mod api;
mod descriptor;
mod error;
mod host;
pub(crate) mod parser;

pub use api::{ENTRIES_CHUNK, YANDEX_BASE_URL, YandexClient};
pub use descriptor::yandex_descriptor;
pub use error::YandexError;
pub use host::{REQUIRED_COOKIES, YANDEX_DOMAIN, YandexMusicHost};
pub use parser::YandexTarget;
