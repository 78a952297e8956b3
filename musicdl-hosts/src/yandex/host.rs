//! Yandex Music host.

use std::collections::VecDeque;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use musicdl_core::{Domain, Track};
use musicdl_fetch::{
    CredentialStore, FetchContext, FetchError, MusicHost, Session, TrackStream, load_session,
};
use tracing::{debug, info, instrument};
use url::Url;

use super::api::{ENTRIES_CHUNK, YANDEX_BASE_URL, YandexClient};
use super::error::YandexError;
use super::parser::{AlbumContext, ApiTrack, YandexTarget, to_track};

/// Cookie domain.
pub const YANDEX_DOMAIN: &str = "yandex.ru";

/// Cookies that must be stored before fetching.
pub const REQUIRED_COOKIES: &[&str] = &["Session_id"];

static DOMAIN: LazyLock<Domain> =
    LazyLock::new(|| Domain::parse(YANDEX_DOMAIN).expect("Invalid domain"));

// ============================================================================
// Resolve State
// ============================================================================

/// Lazy resolution progress for one target.
enum ResolveState {
    Start,
    Entries(VecDeque<String>),
    Done,
}

type Batch = Result<Vec<Track>, FetchError>;

// ============================================================================
// Host
// ============================================================================

/// Yandex Music (`music.yandex.ru`).
///
/// Handles album, track and user playlist URLs on any `yandex.ru`
/// subdomain. Playlists are resolved page by page, so a failure midway
/// still leaves the earlier tracks in the stream.
#[derive(Debug)]
pub struct YandexMusicHost {
    client: YandexClient,
}

impl YandexMusicHost {
    /// Creates the host against the public site.
    pub fn new(ctx: &FetchContext) -> Self {
        let base = Url::parse(YANDEX_BASE_URL).expect("Invalid base URL");
        Self::with_base_url(ctx, base)
    }

    /// Creates the host against another API base (mirrors, test servers).
    pub fn with_base_url(ctx: &FetchContext, base: Url) -> Self {
        Self {
            client: YandexClient::new(Arc::clone(&ctx.http), base),
        }
    }

    fn convert(&self, tracks: &[ApiTrack], album: &AlbumContext) -> Vec<Track> {
        tracks
            .iter()
            .map(|t| to_track(t, album, self.client.scheme()))
            .collect()
    }

    async fn first_batch(
        &self,
        target: YandexTarget,
        cookies: &str,
    ) -> Result<(Vec<Track>, ResolveState), YandexError> {
        match target {
            YandexTarget::Album { album } => {
                let response = self.client.album(&album, cookies).await?;
                let context = AlbumContext::from_album(&response);

                let mut tracks = Vec::new();
                for volume in &response.volumes {
                    for (position, api) in volume.iter().enumerate() {
                        let mut track = to_track(api, &context, self.client.scheme());
                        if track.track_number.is_none() {
                            track.track_number = u32::try_from(position + 1).ok();
                        }
                        tracks.push(track);
                    }
                }
                Ok((tracks, ResolveState::Done))
            }
            YandexTarget::Track { track, album } => {
                let api = self.client.track(&track, cookies).await?;
                let context = AlbumContext {
                    id: album,
                    ..AlbumContext::default()
                };
                Ok((self.convert(&[api], &context), ResolveState::Done))
            }
            YandexTarget::Playlist { owner, kind } => {
                let playlist = self.client.playlist(&owner, &kind, cookies).await?;
                let remaining: VecDeque<String> = playlist.remaining_ids().into();
                let tracks = self.convert(&playlist.tracks, &AlbumContext::default());
                Ok((tracks, ResolveState::Entries(remaining)))
            }
        }
    }

    async fn next_batch(
        &self,
        url: &Url,
        state: ResolveState,
        cookies: &str,
    ) -> Option<(Batch, ResolveState)> {
        match state {
            ResolveState::Start => {
                let batch = match YandexTarget::parse(url) {
                    Ok(target) => self.first_batch(target, cookies).await,
                    Err(e) => Err(e),
                };
                Some(match batch {
                    Ok((tracks, next)) => (Ok(tracks), next),
                    Err(e) => (Err(e.into()), ResolveState::Done),
                })
            }
            ResolveState::Entries(mut ids) => {
                if ids.is_empty() {
                    return None;
                }
                let chunk: Vec<String> = ids.drain(..ids.len().min(ENTRIES_CHUNK)).collect();
                Some(match self.client.track_entries(&chunk, cookies).await {
                    Ok(tracks) => (
                        Ok(self.convert(&tracks, &AlbumContext::default())),
                        ResolveState::Entries(ids),
                    ),
                    Err(e) => (Err(e.into()), ResolveState::Done),
                })
            }
            ResolveState::Done => None,
        }
    }
}

#[async_trait]
impl MusicHost for YandexMusicHost {
    fn id(&self) -> &str {
        "yandex-music"
    }

    fn domain(&self) -> &Domain {
        &DOMAIN
    }

    #[instrument(skip_all)]
    async fn authenticate(&self, store: &dyn CredentialStore) -> Result<Session, FetchError> {
        let session = load_session(store, &DOMAIN, REQUIRED_COOKIES).await?;
        let login = self.client.auth(&session.cookie_header()).await?;

        info!(account = ?login, "Authenticated with Yandex Music");
        Ok(match login {
            Some(login) => session.with_account(login),
            None => session,
        })
    }

    fn resolve<'a>(&'a self, url: &'a Url, session: &'a Session) -> TrackStream<'a> {
        let cookies = session.cookie_header();

        stream::unfold(ResolveState::Start, move |state| {
            let cookies = cookies.clone();
            async move { self.next_batch(url, state, &cookies).await }
        })
        .flat_map(|batch: Batch| {
            let items: Vec<Result<Track, FetchError>> = match batch {
                Ok(tracks) => tracks.into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            };
            stream::iter(items)
        })
        .boxed()
    }

    #[instrument(skip_all, fields(track = %track.id))]
    async fn download(&self, track: &Track, session: &Session) -> Result<Vec<u8>, FetchError> {
        let link = self
            .client
            .download_url(&track.audio_ref, session.domain(), &session.cookie_header())
            .await?;
        let audio = self.client.http().get_bytes(&link, None).await?;
        debug!(bytes = audio.len(), "Audio downloaded");
        Ok(audio)
    }

    async fn cover(&self, track: &Track, _session: &Session) -> Result<Option<Vec<u8>>, FetchError> {
        let Some(url) = &track.cover_url else {
            return Ok(None);
        };
        Ok(Some(self.client.http().get_bytes(url, None).await?))
    }
}

// ============================================================================
// Tests
// ============================================================================
