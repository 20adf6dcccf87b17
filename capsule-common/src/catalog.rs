//! Catalog and signing API contracts
//!
//! Typed payloads exchanged between the proxy service and the player. Serde
//! handles shape and primitive types; [`Contract::validate`] enforces the
//! value rules serde cannot express (non-empty strings, absolute URLs,
//! RFC 3339 timestamps, numeric ranges).
//!
//! Nullable fields accept a missing key as `null`.

use chrono::DateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::track::{Track, TrackAudio, TrackStats, TrackTags};
use crate::{Error, Result};

/// Default catalog object served when no file is requested
pub const DEFAULT_CATALOG_FILE: &str = "index/catalog-lite.json";

/// Value-level checks applied after deserialization
pub trait Contract {
    fn validate(&self) -> Result<()>;
}

/// Deserialize `value` as `T` and validate it.
pub fn parse<T: DeserializeOwned + Contract>(value: Value) -> Result<T> {
    let parsed: T =
        serde_json::from_value(value).map_err(|e| Error::Contract(e.to_string()))?;
    parsed.validate()?;
    Ok(parsed)
}

/// Catalog header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMeta {
    /// RFC 3339 timestamp with offset
    pub generated_at: String,
    pub bucket: String,
    pub source_prefix: String,
    pub count: u64,
    pub version: u64,
}

impl Contract for CatalogMeta {
    fn validate(&self) -> Result<()> {
        check_datetime("meta.generatedAt", &self.generated_at)?;
        check_non_empty("meta.bucket", &self.bucket)?;
        check_non_empty("meta.sourcePrefix", &self.source_prefix)?;
        if self.version < 1 {
            return Err(violation("meta.version", "must be at least 1"));
        }
        Ok(())
    }
}

/// Minimal track entry of the lite catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogLiteTrack {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Contract for CatalogLiteTrack {
    fn validate(&self) -> Result<()> {
        check_non_empty("id", &self.id)?;
        check_non_empty("title", &self.title)?;
        check_duration("durationSeconds", self.duration_seconds)?;
        check_optional_url("audioUrl", self.audio_url.as_deref())?;
        check_optional_url("imageUrl", self.image_url.as_deref())?;
        Ok(())
    }
}

/// Audio locations as published in the full catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogAudio {
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default)]
    pub b2_wav_key: Option<String>,
    #[serde(default)]
    pub b2_mp3_key: Option<String>,
}

/// Sharing settings carried through from the generator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPrivacy {
    #[serde(default)]
    pub privacy: Option<String>,
    #[serde(default)]
    pub allow_public_use: Option<bool>,
    #[serde(default)]
    pub can_use: Option<bool>,
}

/// Where the catalog builder found the entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSource {
    pub metadata_key: String,
    pub filename: String,
}

/// Complete track entry of the full catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFullTrack {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    pub audio: CatalogAudio,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub stats: TrackStats,
    pub privacy: CatalogPrivacy,
    pub tags: TrackTags,
    pub source: CatalogSource,
}

impl Contract for CatalogFullTrack {
    fn validate(&self) -> Result<()> {
        check_non_empty("id", &self.id)?;
        check_non_empty("title", &self.title)?;
        check_duration("durationSeconds", self.duration_seconds)?;
        check_optional_url("audio.publicUrl", self.audio.public_url.as_deref())?;
        check_optional_url("imageUrl", self.image_url.as_deref())?;
        if let Some(created_at) = &self.created_at {
            check_datetime("createdAt", created_at)?;
        }
        check_non_empty("source.metadataKey", &self.source.metadata_key)?;
        check_non_empty("source.filename", &self.source.filename)?;
        Ok(())
    }
}

impl From<CatalogFullTrack> for Track {
    fn from(entry: CatalogFullTrack) -> Self {
        Track {
            id: entry.id,
            title: entry.title,
            duration_seconds: entry.duration_seconds,
            image_url: entry.image_url,
            created_at: entry.created_at,
            model: entry.model,
            audio: TrackAudio {
                public_url: entry.audio.public_url,
                b2_mp3_key: entry.audio.b2_mp3_key,
                b2_wav_key: entry.audio.b2_wav_key,
            },
            tags: entry.tags,
            stats: Some(entry.stats),
        }
    }
}

impl From<CatalogLiteTrack> for Track {
    fn from(entry: CatalogLiteTrack) -> Self {
        let mut track = Track::new(entry.id, entry.title);
        track.duration_seconds = entry.duration_seconds;
        track.image_url = entry.image_url;
        track.audio.public_url = entry.audio_url;
        track
    }
}

/// Catalog listing minimal track entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogLite {
    pub meta: CatalogMeta,
    pub tracks: Vec<CatalogLiteTrack>,
}

impl Contract for CatalogLite {
    fn validate(&self) -> Result<()> {
        self.meta.validate()?;
        validate_tracks(&self.tracks)
    }
}

/// Catalog listing complete track entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogFull {
    pub meta: CatalogMeta,
    pub tracks: Vec<CatalogFullTrack>,
}

impl Contract for CatalogFull {
    fn validate(&self) -> Result<()> {
        self.meta.validate()?;
        validate_tracks(&self.tracks)
    }
}

impl CatalogFull {
    /// Convert every entry into a player [`Track`]
    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks.into_iter().map(Track::from).collect()
    }
}

/// Which catalog schema a stored object follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Lite,
    Full,
}

impl CatalogKind {
    /// Objects whose name mentions `catalog-lite` hold the lite schema.
    pub fn for_file(file: &str) -> Self {
        if file.contains("catalog-lite") {
            Self::Lite
        } else {
            Self::Full
        }
    }
}

/// A validated catalog of either kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Catalog {
    Lite(CatalogLite),
    Full(CatalogFull),
}

impl Catalog {
    /// Parse `value` using the schema `kind` selects.
    pub fn parse(kind: CatalogKind, value: Value) -> Result<Self> {
        match kind {
            CatalogKind::Lite => parse(value).map(Self::Lite),
            CatalogKind::Full => parse(value).map(Self::Full),
        }
    }

    pub fn meta(&self) -> &CatalogMeta {
        match self {
            Self::Lite(c) => &c.meta,
            Self::Full(c) => &c.meta,
        }
    }

    pub fn track_count(&self) -> usize {
        match self {
            Self::Lite(c) => c.tracks.len(),
            Self::Full(c) => c.tracks.len(),
        }
    }
}

/// Successful response of the signing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUrlSuccess {
    pub url: String,
    pub expires_in: u64,
    pub file: String,
}

impl Contract for SignUrlSuccess {
    fn validate(&self) -> Result<()> {
        check_url("url", &self.url)?;
        if self.expires_in == 0 {
            return Err(violation("expiresIn", "must be positive"));
        }
        check_non_empty("file", &self.file)
    }
}

/// Error body returned by every API failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
}

impl ApiErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl Contract for ApiErrorBody {
    fn validate(&self) -> Result<()> {
        check_non_empty("error", &self.error)
    }
}

fn validate_tracks<T: Contract>(tracks: &[T]) -> Result<()> {
    for (index, track) in tracks.iter().enumerate() {
        track.validate().map_err(|e| match e {
            Error::Contract(message) => Error::Contract(format!("tracks[{}].{}", index, message)),
            other => other,
        })?;
    }
    Ok(())
}

fn violation(field: &str, rule: &str) -> Error {
    Error::Contract(format!("{}: {}", field, rule))
}

fn check_non_empty(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(violation(field, "must not be empty"));
    }
    Ok(())
}

fn check_duration(field: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(seconds) if !seconds.is_finite() || seconds < 0.0 => {
            Err(violation(field, "must be a non-negative number"))
        }
        _ => Ok(()),
    }
}

fn check_url(field: &str, value: &str) -> Result<()> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| violation(field, &format!("invalid URL ({})", e)))
}

fn check_optional_url(field: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(url) => check_url(field, url),
        None => Ok(()),
    }
}

fn check_datetime(field: &str, value: &str) -> Result<()> {
    DateTime::parse_from_rfc3339(value)
        .map(|_| ())
        .map_err(|_| violation(field, "must be an RFC 3339 timestamp with offset"))
}
