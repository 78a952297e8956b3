//! Host and track types.
//!
//! - [`HostKind`] - Enum of supported streaming hosts
//! - [`TrackId`] - Host-scoped track identifier
//! - [`Track`] - Resolved unit of downloadable audio with metadata

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Host Kind
// ============================================================================

/// Supported streaming hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKind {
    /// Yandex Music (`music.yandex.ru`)
    YandexMusic,
}

impl HostKind {
    /// Returns the display name for this host.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::YandexMusic => "Yandex Music",
        }
    }

    /// Returns the stable identifier used in reports and logs.
    pub fn id(&self) -> &'static str {
        match self {
            Self::YandexMusic => "yandex-music",
        }
    }

    /// Returns all supported hosts.
    pub fn all() -> &'static [HostKind] {
        &[Self::YandexMusic]
    }
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================================
// Track
// ============================================================================

/// Host-scoped track identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    /// Creates a track id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A resolved, downloadable track.
///
/// Tracks are value objects: once a host resolves them they are never
/// mutated, only read by the scheduler, the tagger and the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Host-scoped identifier.
    pub id: TrackId,
    /// Track title.
    pub title: String,
    /// Performing artist(s), joined for display.
    pub artist: String,
    /// Album title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    /// Album artist, when it differs from the track artist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_artist: Option<String>,
    /// Position within the album.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_number: Option<u32>,
    /// Release year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Cover image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    /// Host-specific audio stream reference, interpreted only by the host
    /// that resolved the track.
    pub audio_ref: String,
}

/// File extension of downloaded audio.
const AUDIO_EXTENSION: &str = "mp3";

/// Longest file name, in bytes, common filesystems accept.
pub const MAX_FILE_NAME_BYTES: usize = 255;

impl Track {
    /// Creates a track with the required fields.
    pub fn new(
        id: TrackId,
        title: impl Into<String>,
        artist: impl Into<String>,
        audio_ref: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            artist: artist.into(),
            album: None,
            album_artist: None,
            track_number: None,
            year: None,
            cover_url: None,
            audio_ref: audio_ref.into(),
        }
    }

    /// Sets the album title.
    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Sets the album artist.
    #[must_use]
    pub fn with_album_artist(mut self, album_artist: impl Into<String>) -> Self {
        self.album_artist = Some(album_artist.into());
        self
    }

    /// Sets the track number.
    #[must_use]
    pub fn with_track_number(mut self, number: u32) -> Self {
        self.track_number = Some(number);
        self
    }

    /// Sets the release year.
    #[must_use]
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Sets the cover URL.
    #[must_use]
    pub fn with_cover_url(mut self, url: impl Into<String>) -> Self {
        self.cover_url = Some(url.into());
        self
    }

    /// Returns `"Artist - Title"`.
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }

    /// Returns the destination file name for this track.
    ///
    /// The id is part of the name, so distinct tracks never share a
    /// destination path. The `Artist - Title` part is shortened so the
    /// whole name fits in [`MAX_FILE_NAME_BYTES`].
    pub fn file_name(&self) -> String {
        let suffix = format!(
            " ({}).{AUDIO_EXTENSION}",
            replace_unsafe_chars(self.id.as_str())
        );
        let head = replace_unsafe_chars(&self.display_name());
        let budget = MAX_FILE_NAME_BYTES.saturating_sub(suffix.len());
        let head = truncate_to_bytes(head.trim(), budget).trim_end();

        if head.is_empty() {
            format!("track{suffix}")
        } else {
            format!("{head}{suffix}")
        }
    }
}

/// Replaces characters that are unsafe in file names on any common
/// filesystem.
fn replace_unsafe_chars(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Returns the longest prefix of `s` within `max` bytes that ends on a
/// char boundary.
fn truncate_to_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let end = (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0);
    &s[..end]
}

// ============================================================================
// Tests
// ============================================================================
