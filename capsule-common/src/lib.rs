//! # Capsule Radio Common Library
//!
//! Shared code for the Capsule Radio player and its proxy service:
//! - Track data model (catalog entries as the player sees them)
//! - Queue/playback store with pluggable persistence
//! - Search/ranking engine over track collections
//! - Catalog and signing API contracts
//! - Configuration loading
//! - Duration formatting helpers

pub mod catalog;
pub mod config;
pub mod error;
pub mod human_time;
pub mod player;
pub mod search;
pub mod track;

pub use error::{Error, Result};
pub use player::{PlayerState, PlayerStore};
pub use search::{search_tracks, SearchFilters};
pub use track::Track;
