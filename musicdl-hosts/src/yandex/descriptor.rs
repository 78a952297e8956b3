//! Yandex Music host descriptor.

use std::sync::Arc;

use musicdl_core::HostKind;
use musicdl_fetch::{FetchContext, MusicHost};

use super::host::{REQUIRED_COOKIES, YANDEX_DOMAIN, YandexMusicHost};
use crate::descriptor::{HostDescriptor, HostMetadata};

/// Descriptor for Yandex Music.
pub fn yandex_descriptor() -> HostDescriptor {
    HostDescriptor {
        id: HostKind::YandexMusic,
        metadata: yandex_metadata(),
        build_host: build_yandex_host,
    }
}

fn yandex_metadata() -> HostMetadata {
    HostMetadata {
        display_name: HostKind::YandexMusic.display_name(),
        domain: YANDEX_DOMAIN,
        cookie_keys: REQUIRED_COOKIES,
        url_examples: &[
            "https://music.yandex.ru/album/<AlbumId>",
            "https://music.yandex.ru/album/<AlbumId>/track/<TrackId>",
            "https://music.yandex.ru/track/<TrackId>",
            "https://music.yandex.ru/users/<Login>/playlists/<PlaylistId>",
        ],
        description: "Downloads albums, single tracks and user playlists as tagged MP3 files. \
                      Requires a logged-in browser session; copy the Session_id cookie of \
                      music.yandex.ru from your browser.",
        homepage: "https://music.yandex.ru",
    }
}

fn build_yandex_host(ctx: &FetchContext) -> Arc<dyn MusicHost> {
    Arc::new(YandexMusicHost::new(ctx))
}
