//! Player state snapshot and user-facing playback errors

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::track::Track;

/// Immutable snapshot of the player
///
/// Invariant: when `current_track_id` is set it names a track in `queue`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub current_track_id: Option<String>,
    pub queue: Vec<Track>,
    pub is_playing: bool,
    pub playback_error: Option<String>,
}

impl PlayerState {
    /// Position of the current track in the queue
    pub fn current_index(&self) -> Option<usize> {
        let id = self.current_track_id.as_deref()?;
        self.position_of(id)
    }

    /// The current track, if any
    pub fn current_track(&self) -> Option<&Track> {
        self.current_index().map(|i| &self.queue[i])
    }

    pub(crate) fn position_of(&self, track_id: &str) -> Option<usize> {
        self.queue.iter().position(|t| t.id == track_id)
    }

    pub(crate) fn contains(&self, track_id: &str) -> bool {
        self.position_of(track_id).is_some()
    }

    /// Rebuild a state from an untrusted persisted snapshot.
    ///
    /// Anything that does not fit is coerced rather than rejected:
    /// - a non-object yields the default state
    /// - queue entries that do not decode as tracks are dropped, and later
    ///   duplicates of an id are removed
    /// - a current id missing from the queue falls back to the first entry
    /// - `isPlaying` must be a JSON boolean, otherwise `false`
    /// - a non-string `playbackError` becomes `None`
    pub(crate) fn sanitize(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self::default();
        };

        let queue = match map.remove("queue") {
            Some(Value::Array(items)) => dedup_by_id(
                items
                    .into_iter()
                    .filter_map(|item| serde_json::from_value::<Track>(item).ok())
                    .collect(),
            ),
            _ => Vec::new(),
        };

        let current_track_id = match map.get("currentTrackId") {
            Some(Value::String(id)) if queue.iter().any(|t| &t.id == id) => Some(id.clone()),
            _ => queue.first().map(|t| t.id.clone()),
        };

        let is_playing = map
            .get("isPlaying")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let playback_error = match map.remove("playbackError") {
            Some(Value::String(message)) => Some(message),
            _ => None,
        };

        Self {
            current_track_id,
            queue,
            is_playing,
            playback_error,
        }
    }
}

/// Keep the first occurrence of each track id, preserving order.
pub(crate) fn dedup_by_id(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen = std::collections::HashSet::new();
    tracks
        .into_iter()
        .filter(|t| seen.insert(t.id.clone()))
        .collect()
}

/// User-facing playback errors recorded by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// `play` target is not in the queue (including an empty queue)
    InvalidTrack,
    /// The signed URL for the current track is no longer valid
    SignedUrlExpired,
    /// Any other message reported by the audio collaborator
    Message(String),
}

impl PlaybackError {
    /// Classify an externally reported message.
    ///
    /// Any mention of "expired" (case-insensitive) is reported as
    /// [`PlaybackError::SignedUrlExpired`] regardless of the original wording.
    pub fn from_message(message: &str) -> Self {
        if message.to_lowercase().contains("expired") {
            Self::SignedUrlExpired
        } else {
            Self::Message(message.to_string())
        }
    }
}

impl std::fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTrack => f.write_str("Invalid track"),
            Self::SignedUrlExpired => f.write_str("Signed URL expired"),
            Self::Message(message) => f.write_str(message),
        }
    }
}
