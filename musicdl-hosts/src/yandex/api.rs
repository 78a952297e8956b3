//! Yandex Music web API client.

use std::sync::Arc;

use musicdl_core::Domain;
use musicdl_fetch::HttpClient;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::error::YandexError;
use super::parser::{
    AlbumResponse, ApiPlaylist, ApiTrack, AuthResponse, DownloadInfo, PlaylistResponse,
    StorageInfo, TrackResponse, direct_url, is_not_found,
};

// ============================================================================
// Constants
// ============================================================================

/// Yandex Music web base URL.
pub const YANDEX_BASE_URL: &str = "https://music.yandex.ru/";

const AUTH_ENDPOINT: &str = "/handlers/auth.jsx";
const ALBUM_ENDPOINT: &str = "/handlers/album.jsx";
const TRACK_ENDPOINT: &str = "/handlers/track.jsx";
const PLAYLIST_ENDPOINT: &str = "/handlers/playlist.jsx";
const TRACK_ENTRIES_ENDPOINT: &str = "/handlers/track-entries.jsx";

/// Track ids fetched per `track-entries` request.
pub const ENTRIES_CHUNK: usize = 50;

// ============================================================================
// API Client
// ============================================================================

/// Thin client over the JSON handlers the web player uses.
///
/// Every call takes the session's `Cookie` header; the client itself holds
/// no credentials.
#[derive(Debug, Clone)]
pub struct YandexClient {
    http: Arc<HttpClient>,
    base: Url,
}

impl YandexClient {
    /// Creates a client against `base`.
    pub fn new(http: Arc<HttpClient>, base: Url) -> Self {
        Self { http, base }
    }

    /// Returns the base URL scheme, used for scheme-relative links.
    pub fn scheme(&self) -> &str {
        self.base.scheme()
    }

    /// Returns the underlying HTTP client.
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, YandexError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| YandexError::InvalidResponse(format!("bad endpoint {path}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url, cookies: &str) -> Result<T, YandexError> {
        Ok(self.http.get_json(url.as_str(), Some(cookies)).await?)
    }

    /// Checks the session; returns the account login.
    ///
    /// # Errors
    ///
    /// [`YandexError::NotLoggedIn`] if the cookies are expired or invalid.
    #[instrument(skip_all)]
    pub async fn auth(&self, cookies: &str) -> Result<Option<String>, YandexError> {
        let url = self.endpoint(AUTH_ENDPOINT, &[])?;
        let response: AuthResponse = self.get_json(&url, cookies).await?;

        if !response.logged {
            return Err(YandexError::NotLoggedIn);
        }

        let login = response.user.and_then(|u| u.login);
        debug!(login = ?login, "Session accepted");
        Ok(login)
    }

    /// Fetches an album with its track list.
    #[instrument(skip(self, cookies))]
    pub async fn album(&self, album: &str, cookies: &str) -> Result<AlbumResponse, YandexError> {
        let url = self.endpoint(ALBUM_ENDPOINT, &[("album", album)])?;
        let response: AlbumResponse = self.get_json(&url, cookies).await?;

        if is_not_found(response.error.as_deref()) {
            return Err(YandexError::NotFound(format!("album {album}")));
        }
        if let Some(error) = response.error {
            return Err(YandexError::InvalidResponse(error));
        }

        debug!(volumes = response.volumes.len(), "Album fetched");
        Ok(response)
    }

    /// Fetches a single track.
    #[instrument(skip(self, cookies))]
    pub async fn track(&self, track: &str, cookies: &str) -> Result<ApiTrack, YandexError> {
        let url = self.endpoint(TRACK_ENDPOINT, &[("track", track)])?;
        let response: TrackResponse = self.get_json(&url, cookies).await?;

        if is_not_found(response.error.as_deref()) {
            return Err(YandexError::NotFound(format!("track {track}")));
        }
        response
            .track
            .ok_or_else(|| YandexError::NotFound(format!("track {track}")))
    }

    /// Fetches a playlist's first page and its full id list.
    #[instrument(skip(self, cookies))]
    pub async fn playlist(
        &self,
        owner: &str,
        kind: &str,
        cookies: &str,
    ) -> Result<ApiPlaylist, YandexError> {
        let url = self.endpoint(PLAYLIST_ENDPOINT, &[("owner", owner), ("kinds", kind)])?;
        let response: PlaylistResponse = self.get_json(&url, cookies).await?;

        if is_not_found(response.error.as_deref()) {
            return Err(YandexError::NotFound(format!("playlist {owner}/{kind}")));
        }
        let playlist = response
            .playlist
            .ok_or_else(|| YandexError::NotFound(format!("playlist {owner}/{kind}")))?;

        debug!(
            loaded = playlist.tracks.len(),
            total = playlist.track_ids.len(),
            "Playlist fetched"
        );
        Ok(playlist)
    }

    /// Fetches full track objects for up to [`ENTRIES_CHUNK`] ids.
    #[instrument(skip(self, cookies), fields(count = ids.len()))]
    pub async fn track_entries(
        &self,
        ids: &[String],
        cookies: &str,
    ) -> Result<Vec<ApiTrack>, YandexError> {
        let entries = ids.join(",");
        let url = self.endpoint(TRACK_ENTRIES_ENDPOINT, &[("entries", &entries)])?;
        self.get_json(&url, cookies).await
    }

    /// Resolves a track's audio reference (`trackId:albumId`) to a signed
    /// direct link.
    ///
    /// The storage link named by the API only receives `cookies` when it
    /// is on the API origin or under `domain`.
    #[instrument(skip(self, domain, cookies))]
    pub async fn download_url(
        &self,
        audio_ref: &str,
        domain: &Domain,
        cookies: &str,
    ) -> Result<String, YandexError> {
        let path = format!(
            "/api/v2.1/handlers/track/{audio_ref}/web-album_track-track-track-main/download/m"
        );
        let url = self.endpoint(&path, &[("hq", "1")])?;
        let info: DownloadInfo = self.get_json(&url, cookies).await?;

        let mut storage_url = self.absolute(&info.src)?;
        storage_url.query_pairs_mut().append_pair("format", "json");
        let storage_cookies = self
            .may_receive_cookies(&storage_url, domain)
            .then_some(cookies);
        let storage: StorageInfo = self
            .http
            .get_json(storage_url.as_str(), storage_cookies)
            .await?;

        let link = direct_url(storage_url.scheme(), &storage);
        debug!(codec = ?info.codec, host = %storage.host, "Download link signed");
        Ok(link)
    }

    fn may_receive_cookies(&self, url: &Url, domain: &Domain) -> bool {
        url.origin() == self.base.origin()
            || url.host_str().is_some_and(|h| domain.covers_host(h))
    }

    /// Parses a possibly scheme-relative link (`//host/path`).
    fn absolute(&self, link: &str) -> Result<Url, YandexError> {
        let parsed = if link.starts_with("//") {
            Url::parse(&format!("{}:{link}", self.scheme()))
        } else {
            Url::parse(link)
        };
        parsed.map_err(|e| YandexError::InvalidResponse(format!("bad link {link}: {e}")))
    }
}

// ============================================================================
// Tests
// ============================================================================
