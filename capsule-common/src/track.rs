//! Track data model
//!
//! A `Track` is the read-only view of one catalog entry as consumed by the
//! queue store and the search engine. Field names serialize in camelCase to
//! match the catalog JSON.

use serde::{Deserialize, Serialize};

/// One playable catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Stable identifier, unique within any collection
    pub id: String,
    /// Display title (non-empty)
    pub title: String,
    /// Known duration in seconds; `None` when unknown.
    ///
    /// `Some(0.0)` is a legitimate zero-length duration, not "unknown".
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// ISO-8601 creation timestamp
    #[serde(default)]
    pub created_at: Option<String>,
    /// Generation model / category label
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub audio: TrackAudio,
    #[serde(default)]
    pub tags: TrackTags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<TrackStats>,
}

/// Audio locations for a track
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackAudio {
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default)]
    pub b2_mp3_key: Option<String>,
    #[serde(default)]
    pub b2_wav_key: Option<String>,
}

/// Mood descriptors used for filtering and ranking
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackTags {
    /// Free-text mood descriptor
    #[serde(default)]
    pub sound: Option<String>,
    /// Ordered condition labels
    #[serde(default)]
    pub conditions: Vec<String>,
}

/// Informational counters; nothing depends on them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStats {
    #[serde(default)]
    pub play_count: Option<u64>,
    #[serde(default)]
    pub favorite_count: Option<u64>,
    #[serde(default)]
    pub is_favorite: Option<bool>,
}

/// The single source a player should load for a track
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayableSource<'a> {
    /// Storage key to exchange for a signed URL
    StorageKey(&'a str),
    /// Directly playable URL
    PublicUrl(&'a str),
}

impl Track {
    /// Create a track with only the required fields set
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            duration_seconds: None,
            image_url: None,
            created_at: None,
            model: None,
            audio: TrackAudio::default(),
            tags: TrackTags::default(),
            stats: None,
        }
    }

    /// Resolve the playable source for this track.
    ///
    /// Storage keys win over the public URL because they can be exchanged
    /// for an access-controlled signed URL. The MP3 key is preferred over the
    /// WAV key. Blank strings count as absent.
    pub fn playable_source(&self) -> Option<PlayableSource<'_>> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|s| !s.trim().is_empty())
        }

        present(&self.audio.b2_mp3_key)
            .or_else(|| present(&self.audio.b2_wav_key))
            .map(PlayableSource::StorageKey)
            .or_else(|| present(&self.audio.public_url).map(PlayableSource::PublicUrl))
    }

    /// Text searched by the mood filter: sound descriptor plus conditions.
    pub(crate) fn mood_text(&self) -> String {
        format!(
            "{} {}",
            self.tags.sound.as_deref().unwrap_or(""),
            self.tags.conditions.join(" ")
        )
        .to_lowercase()
    }
}
