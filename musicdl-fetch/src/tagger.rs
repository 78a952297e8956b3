//! ID3v2 tagging of downloaded audio.
//!
//! Tagging is CPU-only and runs synchronously inside a worker. Any ID3v2
//! tag already present in the download is replaced.

use id3::frame::{Picture, PictureType};
use id3::{Tag, TagLike, Version};
use musicdl_core::Track;
use tracing::debug;

use crate::error::TagError;

/// Length of an ID3v2 header (and footer).
const ID3V2_HEADER_LEN: usize = 10;

/// ID3v2 header flag: a footer follows the tag.
const ID3V2_FOOTER_FLAG: u8 = 0x10;

/// Embeds track metadata into audio bytes.
pub trait Tagger: Send + Sync {
    /// Returns `audio` with metadata (and `cover`, if any) embedded.
    ///
    /// # Errors
    ///
    /// [`TagError`] when the audio container is unsupported or corrupt.
    fn apply(&self, audio: &[u8], track: &Track, cover: Option<&[u8]>) -> Result<Vec<u8>, TagError>;
}

/// ID3v2.4 tagger for MPEG audio.
#[derive(Debug, Default, Clone, Copy)]
pub struct Id3Tagger;

impl Id3Tagger {
    /// Creates a tagger.
    pub fn new() -> Self {
        Self
    }

    fn build_tag(track: &Track, cover: Option<&[u8]>) -> Tag {
        let mut tag = Tag::new();
        tag.set_title(&track.title);
        tag.set_artist(&track.artist);
        if let Some(album) = &track.album {
            tag.set_album(album);
        }
        if let Some(album_artist) = &track.album_artist {
            tag.set_album_artist(album_artist);
        }
        if let Some(number) = track.track_number {
            tag.set_track(number);
        }
        if let Some(year) = track.year {
            tag.set_year(year);
        }
        if let Some(image) = cover.filter(|c| !c.is_empty()) {
            tag.add_frame(Picture {
                mime_type: sniff_image_mime(image).to_string(),
                picture_type: PictureType::CoverFront,
                description: String::new(),
                data: image.to_vec(),
            });
        }
        tag
    }
}

impl Tagger for Id3Tagger {
    fn apply(&self, audio: &[u8], track: &Track, cover: Option<&[u8]>) -> Result<Vec<u8>, TagError> {
        let payload = strip_id3v2(audio)?;
        if !starts_with_frame_sync(payload) {
            return Err(TagError::UnsupportedContainer(
                "no MPEG frame sync at start of audio".to_string(),
            ));
        }

        let tag = Self::build_tag(track, cover);
        let mut out = Vec::with_capacity(payload.len() + cover.map_or(0, <[u8]>::len) + 256);
        tag.write_to(&mut out, Version::Id3v24)?;
        out.extend_from_slice(payload);

        debug!(track = %track.id, tag_len = out.len() - payload.len(), "Audio tagged");
        Ok(out)
    }
}

/// Returns the bytes following an existing ID3v2 tag (or all of them).
fn strip_id3v2(bytes: &[u8]) -> Result<&[u8], TagError> {
    if bytes.len() < ID3V2_HEADER_LEN || &bytes[..3] != b"ID3" {
        return Ok(bytes);
    }

    let size_bytes = &bytes[6..10];
    if size_bytes.iter().any(|b| b & 0x80 != 0) {
        return Err(TagError::UnsupportedContainer(
            "malformed ID3v2 size".to_string(),
        ));
    }
    let size = size_bytes
        .iter()
        .fold(0usize, |acc, b| (acc << 7) | usize::from(*b));

    let footer = if bytes[5] & ID3V2_FOOTER_FLAG != 0 {
        ID3V2_HEADER_LEN
    } else {
        0
    };
    let end = ID3V2_HEADER_LEN + size + footer;

    bytes
        .get(end..)
        .ok_or_else(|| TagError::UnsupportedContainer("truncated ID3v2 tag".to_string()))
}

fn starts_with_frame_sync(bytes: &[u8]) -> bool {
    matches!(bytes, [0xFF, second, ..] if second & 0xE0 == 0xE0)
}

fn sniff_image_mime(image: &[u8]) -> &'static str {
    if image.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else {
        "image/jpeg"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use musicdl_core::TrackId;

    /// One silent MPEG-1 Layer III frame header followed by padding.
    fn mp3_bytes() -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xFB, 0x90, 0x64];
        bytes.extend(std::iter::repeat_n(0u8, 413));
        bytes
    }

    fn track() -> Track {
        Track::new(TrackId::new("42"), "Song", "Artist", "ref")
            .with_album("Album")
            .with_album_artist("Various")
            .with_track_number(3)
            .with_year(2021)
    }

    fn read_back(bytes: &[u8]) -> Tag {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.mp3");
        std::fs::write(&path, bytes).unwrap();
        Tag::read_from_path(&path).unwrap()
    }

    #[test]
    fn test_apply_writes_metadata() {
        let audio = mp3_bytes();
        let tagged = Id3Tagger::new().apply(&audio, &track(), None).unwrap();

        assert!(tagged.starts_with(b"ID3"));
        assert!(tagged.ends_with(&audio));

        let tag = read_back(&tagged);
        assert_eq!(tag.title(), Some("Song"));
        assert_eq!(tag.artist(), Some("Artist"));
        assert_eq!(tag.album(), Some("Album"));
        assert_eq!(tag.album_artist(), Some("Various"));
        assert_eq!(tag.track(), Some(3));
        assert_eq!(tag.pictures().count(), 0);
    }

    #[test]
    fn test_apply_embeds_cover() {
        let cover = b"\x89PNG\r\n\x1a\nrest-of-image".to_vec();
        let tagged = Id3Tagger::new()
            .apply(&mp3_bytes(), &track(), Some(&cover))
            .unwrap();

        let tag = read_back(&tagged);
        let picture = tag.pictures().next().unwrap();
        assert_eq!(picture.mime_type, "image/png");
        assert_eq!(picture.picture_type, PictureType::CoverFront);
        assert_eq!(picture.data, cover);
    }

    #[test]
    fn test_apply_replaces_existing_tag() {
        let audio = mp3_bytes();
        let first = Id3Tagger::new().apply(&audio, &track(), None).unwrap();

        let retitled = Track::new(TrackId::new("42"), "Other", "Artist", "ref");
        let second = Id3Tagger::new().apply(&first, &retitled, None).unwrap();

        assert!(second.ends_with(&audio));
        assert_eq!(read_back(&second).title(), Some("Other"));
        assert_eq!(second.windows(3).filter(|w| *w == b"ID3").count(), 1);
    }

    #[test]
    fn test_rejects_non_mpeg() {
        let err = Id3Tagger::new()
            .apply(b"fLaC\0\0\0\0", &track(), None)
            .unwrap_err();
        assert!(matches!(err, TagError::UnsupportedContainer(_)));

        assert!(Id3Tagger::new().apply(&[], &track(), None).is_err());
    }

    #[test]
    fn test_rejects_truncated_tag() {
        let bytes = [b'I', b'D', b'3', 4, 0, 0, 0, 0, 0x7F, 0x7F, 0xFF, 0xFB];
        assert!(matches!(
            strip_id3v2(&bytes),
            Err(TagError::UnsupportedContainer(_))
        ));
    }

    #[test]
    fn test_sniff_mime() {
        assert_eq!(sniff_image_mime(b"\xFF\xD8\xFF\xE0"), "image/jpeg");
        assert_eq!(sniff_image_mime(b"\x89PNG\r\n\x1a\n"), "image/png");
    }
}
