//! AppState — the read-only snapshot every component renders from.
//!
//! Only the App event-loop writes here, from session snapshots and
//! `PlayerEvent`s; components never mutate it.

use ondas_core::history::HistoryEntry;
use ondas_core::state::{PlaybackStatus, SessionState};
use ondas_core::track::Track;

pub struct AppState {
    /// Latest session snapshot from the store (stations, tuning, playback).
    pub session: SessionState,
    /// Current now-playing track, None while loading a station.
    pub track: Option<Track>,
    /// Merged history snapshot, newest first.
    pub history: Vec<HistoryEntry>,
    /// False between a station switch and the first history load — the
    /// history pane shows its loading placeholder instead of an empty list.
    pub history_loaded: bool,
    /// Station name shown by loading placeholders.
    pub loading_station: Option<String>,
    /// Ready-to-copy share message, rebuilt on each track change.
    pub share_message: Option<String>,
}

impl AppState {
    pub fn new(session: SessionState) -> Self {
        Self {
            session,
            track: None,
            history: Vec::new(),
            history_loaded: false,
            loading_station: None,
            share_message: None,
        }
    }

    pub fn current_station_name(&self) -> Option<&str> {
        self.session.current().map(|s| s.name.as_str())
    }

    pub fn is_playing(&self) -> bool {
        self.session.playback == PlaybackStatus::Playing
    }
}
