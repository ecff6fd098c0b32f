//! Track model and the now-playing change-detection state machine.
//!
//! `TrackWatcher` is deliberately pure: the poller feeds it one decoded song
//! per cycle and acts only when it reports a change. Normalization (trim +
//! case-fold) is applied for comparison only — the stored and displayed
//! strings keep their original form.

use serde::{Deserialize, Serialize};

/// Placeholder shown when the feed carries an empty title or artist.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub title: String,
    pub artist: String,
    pub art_url: String,
}

impl Track {
    /// Build a track from raw feed fields, substituting the placeholder for
    /// empty or missing values so the UI never renders blank text.
    pub fn from_raw(title: Option<&str>, artist: Option<&str>, art_url: Option<&str>) -> Self {
        Self {
            title: non_blank(title),
            artist: non_blank(artist),
            art_url: art_url.unwrap_or_default().to_string(),
        }
    }

    /// De-dup/identity key shared with the history list.
    pub fn identity_key(&self) -> String {
        format!("{} | {}", self.title, self.artist)
    }
}

fn non_blank(s: Option<&str>) -> String {
    match s {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

/// Trim + case-fold, for comparison only.
pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Owns the last-seen track; reports whether an incoming track is new.
#[derive(Debug, Default)]
pub struct TrackWatcher {
    last: Option<Track>,
}

impl TrackWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Best-effort snapshot of the last confirmed track.
    pub fn current(&self) -> Option<&Track> {
        self.last.as_ref()
    }

    /// Feed one decoded song. Returns `Some(track)` on the first observation
    /// or when the normalized (title, artist) pair differs from the stored
    /// one; the stored track is only overwritten in those cases.
    pub fn observe(&mut self, incoming: Track) -> Option<Track> {
        let changed = match &self.last {
            None => true,
            Some(prev) => {
                normalize(&prev.title) != normalize(&incoming.title)
                    || normalize(&prev.artist) != normalize(&incoming.artist)
            }
        };
        if changed {
            self.last = Some(incoming.clone());
            Some(incoming)
        } else {
            None
        }
    }

    /// Forget the last-seen track (next observation counts as a first load).
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str, artist: &str) -> Track {
        Track::from_raw(Some(title), Some(artist), Some("https://art.example/a.jpg"))
    }

    #[test]
    fn test_placeholder_for_blank_fields() {
        let t = Track::from_raw(Some("  "), None, None);
        assert_eq!(t.title, UNKNOWN);
        assert_eq!(t.artist, UNKNOWN);
        assert!(t.art_url.is_empty());
    }

    #[test]
    fn test_first_observation_is_a_change() {
        let mut w = TrackWatcher::new();
        assert!(w.observe(track("Roar", "Selva Eléctrica")).is_some());
        assert_eq!(w.current().unwrap().title, "Roar");
    }

    #[test]
    fn test_identical_track_is_not_a_change() {
        let mut w = TrackWatcher::new();
        w.observe(track("Roar", "Selva Eléctrica"));
        assert!(w.observe(track("Roar", "Selva Eléctrica")).is_none());
    }

    #[test]
    fn test_comparison_ignores_case_and_whitespace() {
        let mut w = TrackWatcher::new();
        w.observe(track("Roar", "Selva Eléctrica"));
        assert!(w.observe(track("  ROAR ", "selva eléctrica")).is_none());
        // The stored track keeps its original display form.
        assert_eq!(w.current().unwrap().title, "Roar");
    }

    #[test]
    fn test_artist_change_alone_is_a_change() {
        let mut w = TrackWatcher::new();
        w.observe(track("Roar", "Selva Eléctrica"));
        let changed = w.observe(track("Roar", "Trío Nocturno"));
        assert_eq!(changed.unwrap().artist, "Trío Nocturno");
    }

    #[test]
    fn test_reset_makes_next_poll_first_load() {
        let mut w = TrackWatcher::new();
        w.observe(track("Roar", "Selva Eléctrica"));
        w.reset();
        assert!(w.current().is_none());
        assert!(w.observe(track("Roar", "Selva Eléctrica")).is_some());
    }

    #[test]
    fn test_identity_key_format() {
        assert_eq!(
            track("Roar", "Selva Eléctrica").identity_key(),
            "Roar | Selva Eléctrica"
        );
    }
}
