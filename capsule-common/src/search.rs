//! Search and ranking over track collections
//!
//! `search_tracks` is a pure function: it never mutates its inputs and returns
//! the same ordering for the same inputs. Filters form a conjunction; the
//! surviving tracks are scored against the query and ranked.
//!
//! Malformed filter values never fail a search. A non-positive or non-finite
//! duration bound is treated as "no constraint".

use std::cmp::Ordering;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::track::Track;

/// Score for a query match in the title
pub const TITLE_SCORE: u32 = 10;
/// Score for a query match in the sound descriptor
pub const SOUND_SCORE: u32 = 5;
/// Score per matching condition label
pub const CONDITION_SCORE: u32 = 2;

/// Caller-constructed search parameters
///
/// `Default` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    /// Free-text query (trimmed and lower-cased before use)
    pub query: String,
    /// Every mood must appear in the track's mood text
    pub moods: Vec<String>,
    /// Allowed model labels; `""` selects tracks without a model
    pub models: Vec<String>,
    /// Upper bound on duration in seconds
    pub max_duration_seconds: Option<f64>,
    /// Restrict to `favorite_ids`
    pub favorites_only: bool,
    pub favorite_ids: Vec<String>,
}

impl SearchFilters {
    /// Filters with only a query set
    pub fn with_query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }
}

/// Filter, score and rank `tracks` according to `filters`.
///
/// Result ordering: score descending, then title ascending. With an empty
/// query every score is zero, so the default filters yield an alphabetical
/// listing of the whole input.
pub fn search_tracks(tracks: &[Track], filters: &SearchFilters) -> Vec<Track> {
    let query = filters.query.trim().to_lowercase();
    let moods: Vec<String> = filters.moods.iter().map(|m| m.to_lowercase()).collect();

    let mut scored: Vec<(u32, &Track)> = tracks
        .iter()
        .filter(|track| matches_mood(track, &moods))
        .filter(|track| matches_model(track, &filters.models))
        .filter(|track| matches_duration(track, filters.max_duration_seconds))
        .filter(|track| matches_favorite(track, filters))
        .map(|track| (score_track(track, &query), track))
        .filter(|(score, track)| {
            query.is_empty() || *score > 0 || contains_ci(track.model.as_deref(), &query)
        })
        .collect();

    scored.sort_by(|(a_score, a), (b_score, b)| {
        b_score
            .cmp(a_score)
            .then_with(|| compare_titles(&a.title, &b.title))
    });

    scored.into_iter().map(|(_, track)| track.clone()).collect()
}

/// Relevance of `track` for an already-normalized query.
pub fn score_track(track: &Track, normalized_query: &str) -> u32 {
    if normalized_query.is_empty() {
        return 0;
    }

    let mut score = 0;
    if contains_ci(Some(&track.title), normalized_query) {
        score += TITLE_SCORE;
    }
    if contains_ci(track.tags.sound.as_deref(), normalized_query) {
        score += SOUND_SCORE;
    }
    for condition in &track.tags.conditions {
        if contains_ci(Some(condition), normalized_query) {
            score += CONDITION_SCORE;
        }
    }
    score
}

fn contains_ci(value: Option<&str>, normalized_query: &str) -> bool {
    value.is_some_and(|v| v.to_lowercase().contains(normalized_query))
}

fn matches_mood(track: &Track, moods: &[String]) -> bool {
    if moods.is_empty() {
        return true;
    }
    let text = track.mood_text();
    moods.iter().all(|mood| text.contains(mood.as_str()))
}

fn matches_model(track: &Track, models: &[String]) -> bool {
    if models.is_empty() {
        return true;
    }
    let model = track.model.as_deref().unwrap_or("");
    models.iter().any(|m| m == model)
}

fn matches_duration(track: &Track, max_duration_seconds: Option<f64>) -> bool {
    match max_duration_seconds {
        Some(bound) if bound.is_finite() && bound > 0.0 => {
            track.duration_seconds.is_some_and(|d| d <= bound)
        }
        _ => true,
    }
}

fn matches_favorite(track: &Track, filters: &SearchFilters) -> bool {
    !filters.favorites_only || filters.favorite_ids.iter().any(|id| id == &track.id)
}

/// Case-insensitive title order with a byte-order tiebreak so the result is
/// total and deterministic.
fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Listing orders offered alongside search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Most recently created first
    #[default]
    Newest,
    /// Oldest first
    Oldest,
    /// Title A-Z
    #[serde(alias = "az")]
    TitleAsc,
    /// Shortest first
    Duration,
}

/// Sort `tracks` in place. The sort is stable.
///
/// Missing or unparseable `created_at` values sort as the Unix epoch; unknown
/// durations sort as zero.
pub fn sort_tracks(tracks: &mut [Track], order: SortOrder) {
    match order {
        SortOrder::Newest => tracks.sort_by_key(|t| std::cmp::Reverse(created_millis(t))),
        SortOrder::Oldest => tracks.sort_by_key(created_millis),
        SortOrder::TitleAsc => tracks.sort_by(|a, b| compare_titles(&a.title, &b.title)),
        SortOrder::Duration => tracks.sort_by(|a, b| {
            let a = a.duration_seconds.unwrap_or(0.0);
            let b = b.duration_seconds.unwrap_or(0.0);
            a.total_cmp(&b)
        }),
    }
}

fn created_millis(track: &Track) -> i64 {
    track
        .created_at
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.timestamp_millis())
        .unwrap_or(0)
}
