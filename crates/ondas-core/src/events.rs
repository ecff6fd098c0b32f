//! Typed event bus shared by the pollers, the player core and the UI.
//!
//! A `tokio::sync::broadcast` channel carries these instead of an implicit
//! global event bus: publishers are injected with a sender, consumers
//! subscribe, and nothing else is shared.

use chrono::{DateTime, Local};

use crate::history::HistoryEntry;
use crate::track::Track;

#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// The now-playing track changed (first load included). Carries the
    /// display track and the detection timestamp.
    TrackChanged {
        track: Track,
        timestamp: DateTime<Local>,
    },
    /// The now-playing poller was stopped for a station switch; the UI should
    /// show a loading state for the named station.
    NowPlayingReset { station: String },
    /// New snapshot of the merged history list, newest first.
    HistoryUpdated { entries: Vec<HistoryEntry> },
    /// The history poller was stopped; the UI should clear its list and show
    /// the loading placeholder for the named station.
    HistoryReset { station: String },
    /// Playback status changed; receivers read the session store.
    SessionUpdated,
}
