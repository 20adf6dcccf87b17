//! Queue and playback state
//!
//! The [`PlayerStore`] is the single source of truth for what is queued and
//! what is currently playing. It is built for a single logical thread of
//! control (a UI event loop): state lives behind `RefCell`, listeners are
//! invoked synchronously after each mutation, and the store is deliberately
//! `!Send`.
//!
//! Persistence is injected at construction through the [`Persist`] trait.

mod persist;
mod state;
mod store;

pub use persist::{FilePersist, MemoryPersist, Persist};
pub use state::{PlaybackError, PlayerState};
pub use store::{HydrateOutcome, PlayerStore, Subscription, PERSIST_KEY};
