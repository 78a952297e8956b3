//! Yandex Music response types, URL parsing and track conversion.

use std::sync::LazyLock;

use musicdl_core::{Track, TrackId};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use url::Url;

use super::error::YandexError;

/// Cover size requested from the image service.
pub const COVER_SIZE: &str = "400x400";

// ============================================================================
// Target URLs
// ============================================================================

/// Content addressed by a Yandex Music URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YandexTarget {
    /// `/album/<id>`
    Album {
        /// Album id.
        album: String,
    },
    /// `/album/<id>/track/<id>` or `/track/<id>`
    Track {
        /// Track id.
        track: String,
        /// Album id, when the URL names one.
        album: Option<String>,
    },
    /// `/users/<owner>/playlists/<kind>`
    Playlist {
        /// Owner login.
        owner: String,
        /// Playlist kind number.
        kind: String,
    },
}

// ============================================================================
// Regex Patterns
// ============================================================================

/// `/album/<id>`
static ALBUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/album/(\d+)/?$").expect("Invalid regex"));

/// `/album/<id>/track/<id>`
static ALBUM_TRACK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/album/(\d+)/track/(\d+)/?$").expect("Invalid regex"));

/// `/track/<id>`
static TRACK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/track/(\d+)/?$").expect("Invalid regex"));

/// `/users/<owner>/playlists/<kind>`
static PLAYLIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/users/([^/]+)/playlists/(\d+)/?$").expect("Invalid regex")
});

impl YandexTarget {
    /// Parses the path of a Yandex Music URL.
    ///
    /// # Errors
    ///
    /// [`YandexError::UnsupportedUrl`] for any other path (artist pages,
    /// the home page, search).
    pub fn parse(url: &Url) -> Result<Self, YandexError> {
        let path = url.path();

        if let Some(caps) = ALBUM_TRACK_RE.captures(path) {
            return Ok(Self::Track {
                track: caps[2].to_string(),
                album: Some(caps[1].to_string()),
            });
        }
        if let Some(caps) = ALBUM_RE.captures(path) {
            return Ok(Self::Album {
                album: caps[1].to_string(),
            });
        }
        if let Some(caps) = TRACK_RE.captures(path) {
            return Ok(Self::Track {
                track: caps[1].to_string(),
                album: None,
            });
        }
        if let Some(caps) = PLAYLIST_RE.captures(path) {
            return Ok(Self::Playlist {
                owner: caps[1].to_string(),
                kind: caps[2].to_string(),
            });
        }

        Err(YandexError::UnsupportedUrl(url.to_string()))
    }
}

// ============================================================================
// API Response Types
// ============================================================================

/// Ids arrive as numbers or strings depending on the handler.
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Num(u64),
        Str(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Num(n) => n.to_string(),
        RawId::Str(s) => s,
    })
}

fn id_strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    struct Wrapped(#[serde(deserialize_with = "id_string")] String);

    let ids: Vec<Wrapped> = Vec::deserialize(deserializer)?;
    Ok(ids.into_iter().map(|w| w.0).collect())
}

/// Response of `handlers/auth.jsx`.
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    /// Whether the cookies belong to a logged-in session.
    #[serde(default)]
    pub logged: bool,
    /// Account details.
    #[serde(default)]
    pub user: Option<AuthUser>,
}

/// Account details.
#[derive(Debug, Deserialize)]
pub struct AuthUser {
    /// Login name.
    #[serde(default)]
    pub login: Option<String>,
}

/// Artist reference.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiArtist {
    /// Artist name.
    pub name: String,
}

/// Position of a track within an album.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackPosition {
    /// Disc number.
    #[serde(default)]
    pub volume: u32,
    /// Track number on the disc.
    #[serde(default)]
    pub index: u32,
}

/// Album reference embedded in a track.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAlbumRef {
    /// Album id.
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    /// Album title.
    #[serde(default)]
    pub title: Option<String>,
    /// Release year.
    #[serde(default)]
    pub year: Option<i32>,
    /// Album artists.
    #[serde(default)]
    pub artists: Vec<ApiArtist>,
    /// Where the track sits on this album.
    #[serde(default)]
    pub track_position: Option<TrackPosition>,
}

/// Track object.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTrack {
    /// Track id.
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    /// Title.
    pub title: String,
    /// Version suffix (e.g. "Remastered").
    #[serde(default)]
    pub version: Option<String>,
    /// Performing artists.
    #[serde(default)]
    pub artists: Vec<ApiArtist>,
    /// Albums the track appears on.
    #[serde(default)]
    pub albums: Vec<ApiAlbumRef>,
    /// Cover URI template (`%%` stands for the size).
    #[serde(default)]
    pub cover_uri: Option<String>,
    /// False for tracks that cannot be streamed.
    #[serde(default)]
    pub available: Option<bool>,
}

/// Response of `handlers/album.jsx`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumResponse {
    /// Album id.
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
    /// Album title.
    #[serde(default)]
    pub title: Option<String>,
    /// Release year.
    #[serde(default)]
    pub year: Option<i32>,
    /// Album artists.
    #[serde(default)]
    pub artists: Vec<ApiArtist>,
    /// Album cover URI template.
    #[serde(default)]
    pub cover_uri: Option<String>,
    /// Discs, each a list of tracks.
    #[serde(default)]
    pub volumes: Vec<Vec<ApiTrack>>,
    /// Error marker (e.g. `not-found`).
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of `handlers/track.jsx`.
#[derive(Debug, Deserialize)]
pub struct TrackResponse {
    /// The track.
    #[serde(default)]
    pub track: Option<ApiTrack>,
    /// Error marker.
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of `handlers/playlist.jsx`.
#[derive(Debug, Deserialize)]
pub struct PlaylistResponse {
    /// The playlist.
    #[serde(default)]
    pub playlist: Option<ApiPlaylist>,
    /// Error marker.
    #[serde(default)]
    pub error: Option<String>,
}

/// Playlist body: the first page of full tracks plus every track id.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPlaylist {
    /// Playlist title.
    #[serde(default)]
    pub title: Option<String>,
    /// First page of tracks.
    #[serde(default)]
    pub tracks: Vec<ApiTrack>,
    /// All track ids, in playlist order (`id` or `id:albumId`).
    #[serde(default, deserialize_with = "id_strings")]
    pub track_ids: Vec<String>,
}

impl ApiPlaylist {
    /// Ids of the tracks not included in the first page.
    pub fn remaining_ids(&self) -> Vec<String> {
        self.track_ids
            .iter()
            .skip(self.tracks.len())
            .cloned()
            .collect()
    }
}

/// Response of the download-info handler.
#[derive(Debug, Deserialize)]
pub struct DownloadInfo {
    /// URL of the storage descriptor.
    pub src: String,
    /// Audio codec.
    #[serde(default)]
    pub codec: Option<String>,
}

/// Storage descriptor used to sign the direct link.
#[derive(Debug, Deserialize)]
pub struct StorageInfo {
    /// Storage host.
    pub host: String,
    /// Path on the storage host.
    pub path: String,
    /// Timestamp component.
    pub ts: String,
    /// Salt.
    pub s: String,
}

/// Returns true if the error marker means "absent".
pub fn is_not_found(error: Option<&str>) -> bool {
    matches!(error, Some("not-found" | "not_found" | "no-such-album" | "no-such-playlist"))
}

// ============================================================================
// Conversion
// ============================================================================

fn join_artists(artists: &[ApiArtist]) -> String {
    artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Expands a cover URI template into a full URL.
pub fn cover_url(scheme: &str, uri: &str) -> String {
    let sized = uri.replace("%%", COVER_SIZE);
    if sized.starts_with("http://") || sized.starts_with("https://") {
        sized
    } else {
        format!("{scheme}://{}", sized.trim_start_matches('/'))
    }
}

/// Album context applied to tracks listed inside an album response.
#[derive(Debug, Default, Clone)]
pub struct AlbumContext {
    /// Album id.
    pub id: Option<String>,
    /// Album title.
    pub title: Option<String>,
    /// Album artists, joined.
    pub artists: Option<String>,
    /// Release year.
    pub year: Option<i32>,
    /// Cover URI template.
    pub cover_uri: Option<String>,
}

impl AlbumContext {
    /// Builds the context from an album response.
    pub fn from_album(album: &AlbumResponse) -> Self {
        Self {
            id: Some(album.id.clone()).filter(|id| !id.is_empty()),
            title: album.title.clone(),
            artists: Some(join_artists(&album.artists)).filter(|a| !a.is_empty()),
            year: album.year,
            cover_uri: album.cover_uri.clone(),
        }
    }
}

/// Converts an API track into a [`Track`].
///
/// `album` fills fields the embedded album reference lacks. The audio
/// reference is `trackId:albumId` (or just the id for album-less tracks).
pub fn to_track(api: &ApiTrack, album: &AlbumContext, scheme: &str) -> Track {
    let album_ref = album
        .id
        .as_ref()
        .and_then(|id| api.albums.iter().find(|a| &a.id == id))
        .or_else(|| api.albums.first());

    let album_id = album_ref.map(|a| a.id.clone()).or_else(|| album.id.clone());
    let audio_ref = match &album_id {
        Some(album_id) => format!("{}:{album_id}", api.id),
        None => api.id.clone(),
    };

    let title = match api.version.as_deref().filter(|v| !v.is_empty()) {
        Some(version) => format!("{} ({version})", api.title),
        None => api.title.clone(),
    };

    let mut track = Track::new(
        TrackId::new(api.id.clone()),
        title,
        join_artists(&api.artists),
        audio_ref,
    );

    if let Some(title) = album_ref
        .and_then(|a| a.title.clone())
        .or_else(|| album.title.clone())
    {
        track = track.with_album(title);
    }

    let album_artist = album_ref
        .map(|a| join_artists(&a.artists))
        .filter(|a| !a.is_empty())
        .or_else(|| album.artists.clone());
    if let Some(album_artist) = album_artist.filter(|a| *a != track.artist) {
        track = track.with_album_artist(album_artist);
    }

    if let Some(index) = album_ref
        .and_then(|a| a.track_position.as_ref())
        .map(|p| p.index)
        .filter(|i| *i > 0)
    {
        track = track.with_track_number(index);
    }

    if let Some(year) = album_ref.and_then(|a| a.year).or(album.year) {
        track = track.with_year(year);
    }

    if let Some(uri) = api.cover_uri.as_ref().or(album.cover_uri.as_ref()) {
        track = track.with_cover_url(cover_url(scheme, uri));
    }

    track
}

/// Computes the direct download URL from a storage descriptor.
pub fn direct_url(scheme: &str, storage: &StorageInfo) -> String {
    const SIGN_SALT: &str = "XGRlBW9FXlekgbPrRHuSiA";

    let path_tail = storage.path.strip_prefix('/').unwrap_or(&storage.path);
    let digest = md5::compute(format!("{SIGN_SALT}{path_tail}{}", storage.s));
    format!(
        "{scheme}://{}/get-mp3/{digest:x}/{}{}",
        storage.host, storage.ts, storage.path
    )
}

// ============================================================================
// Tests
// ============================================================================
