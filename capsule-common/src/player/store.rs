//! Queue/playback store
//!
//! Every mutation follows the same sequence: update the in-memory snapshot,
//! write the snapshot to persistence (if configured), then notify listeners.
//! A listener therefore never observes state that storage does not already
//! hold.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use super::persist::Persist;
use super::state::{dedup_by_id, PlaybackError, PlayerState};
use crate::track::Track;

/// Key under which the snapshot is persisted
pub const PERSIST_KEY: &str = "capsule-player-state-v1";

type Listener = Rc<dyn Fn()>;

#[derive(Default)]
struct Listeners {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(u64, Listener)>>,
}

/// Handle returned by [`PlayerStore::subscribe`]
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    /// Unregister the listener. Returns false if it was already gone (or the
    /// store was dropped).
    pub fn unsubscribe(self) -> bool {
        let Some(listeners) = self.listeners.upgrade() else {
            return false;
        };
        let mut entries = listeners.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(id, _)| *id != self.id);
        entries.len() != before
    }
}

/// Result of [`PlayerStore::hydrate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrateOutcome {
    /// No persistence backend configured; nothing changed
    NoPersistence,
    /// Backend had no snapshot (or could not be read); nothing changed
    NoSnapshot,
    /// Snapshot loaded and sanitized into the current state
    Restored,
    /// Snapshot was not valid JSON; it was erased and state reset
    Discarded,
}

/// Single source of truth for queue and transport state
pub struct PlayerStore {
    state: RefCell<Rc<PlayerState>>,
    listeners: Rc<Listeners>,
    persist: Option<Box<dyn Persist>>,
}

impl PlayerStore {
    /// Store without persistence
    pub fn new() -> Self {
        Self {
            state: RefCell::new(Rc::new(PlayerState::default())),
            listeners: Rc::new(Listeners::default()),
            persist: None,
        }
    }

    /// Store that saves every change to `persist`
    pub fn with_persist(persist: impl Persist + 'static) -> Self {
        Self {
            persist: Some(Box::new(persist)),
            ..Self::new()
        }
    }

    /// Current snapshot. Later mutations never alter a returned snapshot.
    pub fn state(&self) -> Rc<PlayerState> {
        Rc::clone(&self.state.borrow())
    }

    /// Register `listener` to run after every state change.
    ///
    /// Listeners receive no arguments; they re-read [`PlayerStore::state`].
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription {
        let id = self.listeners.next_id.get();
        self.listeners.next_id.set(id + 1);
        self.listeners
            .entries
            .borrow_mut()
            .push((id, Rc::new(listener)));

        Subscription {
            id,
            listeners: Rc::downgrade(&self.listeners),
        }
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.entries.borrow().len()
    }

    /// Replace the queue with `tracks`, keeping the first occurrence of each
    /// id. The first track becomes current; the transport flag is untouched.
    pub fn set_queue(&self, tracks: Vec<Track>) {
        let queue = dedup_by_id(tracks);
        self.update(|s| {
            s.current_track_id = queue.first().map(|t| t.id.clone());
            s.queue = queue;
            s.playback_error = None;
        });
    }

    /// Queue `track` to play right after the current track.
    ///
    /// Any existing entry with the same id is removed first. The current
    /// track only changes when nothing was current.
    ///
    /// Re-adding the current track refreshes its entry in place and leaves
    /// the queue order untouched: `[a, b, c]` with `b` current stays
    /// `[a, b, c]`, not `[a, c, b]`.
    pub fn add_next(&self, track: Track) {
        self.update(|s| {
            if s.current_track_id.as_deref() == Some(track.id.as_str()) {
                if let Some(index) = s.position_of(&track.id) {
                    s.queue[index] = track;
                }
                return;
            }

            s.queue.retain(|t| t.id != track.id);
            let insert_at = s.current_index().map_or(0, |i| i + 1);
            if s.current_track_id.is_none() {
                s.current_track_id = Some(track.id.clone());
            }
            s.queue.insert(insert_at, track);
        });
    }

    /// Remove `track_id` from the queue. Removing the current track makes the
    /// new first entry current.
    pub fn remove(&self, track_id: &str) {
        self.update(|s| {
            s.queue.retain(|t| t.id != track_id);
            if s.current_track_id.as_deref() == Some(track_id) {
                s.current_track_id = s.queue.first().map(|t| t.id.clone());
            }
        });
    }

    /// Move the entry at `from` to `to`.
    ///
    /// Out-of-range or equal indices are ignored without notifying anyone.
    pub fn reorder(&self, from: usize, to: usize) {
        let len = self.state.borrow().queue.len();
        if from >= len || to >= len || from == to {
            debug!(from, to, len, "Ignoring reorder outside queue bounds");
            return;
        }

        self.update(|s| {
            let moved = s.queue.remove(from);
            s.queue.insert(to, moved);
        });
    }

    /// Reset to the empty state and erase the persisted snapshot.
    pub fn clear(&self) {
        if let Some(persist) = &self.persist {
            if let Err(e) = persist.remove(PERSIST_KEY) {
                warn!("Failed to erase persisted player state: {}", e);
            }
        }
        *self.state.borrow_mut() = Rc::new(PlayerState::default());
        self.notify();
    }

    /// Start playback of `track_id`, else the current track, else the first
    /// queued track.
    ///
    /// A target that is not queued stops playback and records
    /// [`PlaybackError::InvalidTrack`].
    pub fn play(&self, track_id: Option<&str>) {
        self.update(|s| {
            let target = track_id
                .map(str::to_string)
                .or_else(|| s.current_track_id.clone())
                .or_else(|| s.queue.first().map(|t| t.id.clone()));

            match target {
                Some(id) if s.contains(&id) => {
                    s.current_track_id = Some(id);
                    s.is_playing = true;
                    s.playback_error = None;
                }
                other => {
                    debug!(track_id = ?other, "Refusing to play track not in queue");
                    s.is_playing = false;
                    s.playback_error = Some(PlaybackError::InvalidTrack.to_string());
                }
            }
        });
    }

    /// Stop the transport, keeping the current track.
    pub fn pause(&self) {
        self.update(|s| s.is_playing = false);
    }

    /// Advance one position. At the end of the queue (or with nothing
    /// current) playback stops and the current track is kept.
    pub fn next(&self) {
        self.update(|s| match s.current_index() {
            Some(i) if i + 1 < s.queue.len() => {
                s.current_track_id = Some(s.queue[i + 1].id.clone());
                s.is_playing = true;
            }
            _ => s.is_playing = false,
        });
    }

    /// Retreat one position. At the start of the queue (or with nothing
    /// current) playback stops and the current track is kept.
    pub fn prev(&self) {
        self.update(|s| match s.current_index() {
            Some(i) if i > 0 => {
                s.current_track_id = Some(s.queue[i - 1].id.clone());
                s.is_playing = true;
            }
            _ => s.is_playing = false,
        });
    }

    /// Record an error reported by the audio collaborator and stop playback.
    ///
    /// Messages mentioning expiry are stored as `"Signed URL expired"`.
    /// `None` clears the error (playback still stops).
    pub fn set_playback_error(&self, message: Option<&str>) {
        let normalized = message.map(|m| PlaybackError::from_message(m).to_string());
        self.update(|s| {
            s.playback_error = normalized;
            s.is_playing = false;
        });
    }

    /// Replace in-memory state with the persisted snapshot, if any.
    ///
    /// Unparseable snapshots are erased and the state resets to defaults;
    /// nothing is ever returned as an error.
    pub fn hydrate(&self) -> HydrateOutcome {
        let Some(persist) = &self.persist else {
            return HydrateOutcome::NoPersistence;
        };

        let raw = match persist.get(PERSIST_KEY) {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => return HydrateOutcome::NoSnapshot,
            Err(e) => {
                warn!("Failed to read persisted player state: {}", e);
                return HydrateOutcome::NoSnapshot;
            }
        };

        let outcome = match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => {
                *self.state.borrow_mut() = Rc::new(PlayerState::sanitize(value));
                HydrateOutcome::Restored
            }
            Err(e) => {
                warn!("Discarding corrupt persisted player state: {}", e);
                if let Err(e) = persist.remove(PERSIST_KEY) {
                    warn!("Failed to erase corrupt player state: {}", e);
                }
                *self.state.borrow_mut() = Rc::new(PlayerState::default());
                HydrateOutcome::Discarded
            }
        };

        self.notify();
        outcome
    }

    /// Apply `f` to the state (copy-on-write), persist, then notify.
    fn update(&self, f: impl FnOnce(&mut PlayerState)) {
        {
            let mut state = self.state.borrow_mut();
            f(Rc::make_mut(&mut state));
        }
        self.persist_state();
        self.notify();
    }

    fn persist_state(&self) {
        let Some(persist) = &self.persist else {
            return;
        };

        let result = serde_json::to_string(&*self.state())
            .map_err(crate::Error::from)
            .and_then(|json| persist.set(PERSIST_KEY, &json));

        if let Err(e) = result {
            warn!("Failed to persist player state: {}", e);
        }
    }

    fn notify(&self) {
        // Copy first: a listener may unsubscribe (or subscribe) while running
        let listeners: Vec<Listener> = self
            .listeners
            .entries
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();

        for listener in listeners {
            listener();
        }
    }
}

impl Default for PlayerStore {
    fn default() -> Self {
        Self::new()
    }
}
