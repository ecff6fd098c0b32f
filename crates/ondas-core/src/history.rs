//! Track history: a bounded, deduplicated, most-recent-first list merged from
//! the station's history feed.
//!
//! The feed is treated as an append-only log ordered newest-first. After the
//! first full load only the newest upstream entry can differ between polls at
//! this cadence, so later cycles look at the head alone instead of re-merging
//! the whole feed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::events::PlayerEvent;
use crate::track::Track;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub title: String,
    pub artist: String,
    /// Identity key used for de-dup decisions.
    pub key: String,
}

impl HistoryEntry {
    pub fn new(title: &str, artist: &str) -> Self {
        Self {
            title: title.to_string(),
            artist: artist.to_string(),
            key: format!("{} | {}", title, artist),
        }
    }

    pub fn from_track(track: &Track) -> Self {
        Self::new(&track.title, &track.artist)
    }
}

/// True when the entry's title or artist contains `term`, case-insensitive.
pub fn matches_exclusion(entry: &HistoryEntry, term: &str) -> bool {
    let term = term.to_lowercase();
    entry.title.to_lowercase().contains(&term) || entry.artist.to_lowercase().contains(&term)
}

/// Map a raw feed to history entries, dropping banned ones. Order preserved.
pub fn filter_feed(feed: &[Track], exclude_terms: &[String]) -> Vec<HistoryEntry> {
    feed.iter()
        .map(HistoryEntry::from_track)
        .filter(|e| !exclude_terms.iter().any(|t| matches_exclusion(e, t)))
        .collect()
}

/// The bounded merge list. Pure — the poller task feeds it one filtered feed
/// snapshot per cycle.
#[derive(Debug)]
pub struct HistoryList {
    entries: Vec<HistoryEntry>,
    max_items: usize,
    loaded: bool,
}

impl HistoryList {
    pub fn new(max_items: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_items: max_items.max(1),
            loaded: false,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Merge one poll result. Returns whether the visible list changed.
    ///
    /// First cycle: take the first `max_items` feed entries as-is. Later
    /// cycles: inspect only the newest feed entry — no-op when its key equals
    /// the current head, otherwise prepend and trim the tail to the bound.
    pub fn apply(&mut self, feed: &[HistoryEntry]) -> bool {
        let Some(newest) = feed.first() else {
            return false;
        };

        if !self.loaded {
            self.entries = feed.iter().take(self.max_items).cloned().collect();
            self.loaded = true;
            return true;
        }

        if self.entries.first().map(|e| e.key.as_str()) == Some(newest.key.as_str()) {
            return false;
        }

        self.entries.insert(0, newest.clone());
        self.entries.truncate(self.max_items);
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.loaded = false;
    }
}

// ── Poller ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HistorySource {
    pub url: String,
    pub station: String,
}

/// Recurring fetch of a station's history feed. One instance lives across
/// station switches; `start` retargets it and `stop` clears the visible list.
pub struct HistoryPoller {
    client: ApiClient,
    events: broadcast::Sender<PlayerEvent>,
    max_items: usize,
    exclude_terms: Vec<String>,
    /// Poll-cycle generation. Results observed under a stale generation are
    /// discarded, so an in-flight fetch cannot revive a stopped poller.
    generation: Arc<AtomicU64>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl HistoryPoller {
    pub fn new(
        client: ApiClient,
        events: broadcast::Sender<PlayerEvent>,
        max_items: usize,
        exclude_terms: Vec<String>,
    ) -> Self {
        Self {
            client,
            events,
            max_items,
            exclude_terms,
            generation: Arc::new(AtomicU64::new(0)),
            task: None,
        }
    }

    /// Begin polling: immediate first fetch, then one per interval. Cycles
    /// run sequentially inside one task — a slow fetch delays the next tick
    /// instead of overlapping it.
    pub fn start(&mut self, source: HistorySource, interval: Duration) {
        self.abort_task();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let client = self.client.clone();
        let events = self.events.clone();
        let max_items = self.max_items;
        let exclude_terms = self.exclude_terms.clone();
        let gen_handle = Arc::clone(&self.generation);

        info!("[history] start: {} every {:?}", source.station, interval);
        self.task = Some(tokio::spawn(async move {
            let mut list = HistoryList::new(max_items);
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match client.fetch_history(&source.url).await {
                    Ok(feed) => {
                        if gen_handle.load(Ordering::SeqCst) != generation {
                            debug!("[history] discarding stale result for {}", source.station);
                            return;
                        }
                        let filtered = filter_feed(&feed, &exclude_terms);
                        if list.apply(&filtered) {
                            let _ = events.send(PlayerEvent::HistoryUpdated {
                                entries: list.entries().to_vec(),
                            });
                        }
                    }
                    Err(e) => {
                        // Non-fatal: skip this cycle, try again next interval.
                        warn!("[history] poll cycle failed for {}: {}", source.station, e);
                    }
                }
            }
        }));
    }

    /// Stop polling and clear the visible list; the UI falls back to its
    /// loading placeholder for `station`.
    pub fn stop(&mut self, station: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.abort_task();
        let _ = self.events.send(PlayerEvent::HistoryReset {
            station: station.to_string(),
        });
        info!("[history] stopped");
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for HistoryPoller {
    fn drop(&mut self) {
        self.abort_task();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, artist: &str) -> HistoryEntry {
        HistoryEntry::new(title, artist)
    }

    fn feed(pairs: &[(&str, &str)]) -> Vec<HistoryEntry> {
        pairs.iter().map(|(t, a)| entry(t, a)).collect()
    }

    #[test]
    fn test_first_load_takes_bound_newest_first() {
        let mut list = HistoryList::new(6);
        let pairs: Vec<(String, String)> = (0..10)
            .map(|i| (format!("Song {i}"), format!("Artist {i}")))
            .collect();
        let feed: Vec<HistoryEntry> = pairs
            .iter()
            .map(|(t, a)| HistoryEntry::new(t, a))
            .collect();

        assert!(list.apply(&feed));
        assert!(list.is_loaded());
        assert_eq!(list.entries().len(), 6);
        assert_eq!(list.entries()[0].title, "Song 0");
        assert_eq!(list.entries()[5].title, "Song 5");
    }

    #[test]
    fn test_unchanged_newest_is_a_noop() {
        let mut list = HistoryList::new(6);
        list.apply(&feed(&[("Uno", "A"), ("Dos", "B")]));
        let before = list.entries().to_vec();

        assert!(!list.apply(&feed(&[("Uno", "A"), ("Dos", "B")])));
        assert_eq!(list.entries(), &before[..]);
        // No consecutive duplicate at the head.
        assert_ne!(list.entries()[0].key, list.entries()[1].key);
    }

    #[test]
    fn test_new_head_prepends_and_trims() {
        let mut list = HistoryList::new(3);
        list.apply(&feed(&[("Uno", "A"), ("Dos", "B"), ("Tres", "C")]));

        assert!(list.apply(&feed(&[("Cuatro", "D"), ("Uno", "A")])));
        assert_eq!(list.entries().len(), 3);
        assert_eq!(list.entries()[0].title, "Cuatro");
        assert_eq!(list.entries()[1].title, "Uno");
        assert_eq!(list.entries()[2].title, "Dos");
    }

    #[test]
    fn test_bound_holds_over_many_cycles() {
        let mut list = HistoryList::new(4);
        list.apply(&feed(&[("Seed", "S")]));
        for i in 0..50 {
            let title = format!("Song {i}");
            list.apply(&[entry(&title, "X")]);
            assert!(list.entries().len() <= 4);
        }
        assert_eq!(list.entries()[0].title, "Song 49");
    }

    #[test]
    fn test_empty_feed_is_a_noop() {
        let mut list = HistoryList::new(6);
        assert!(!list.apply(&[]));
        assert!(!list.is_loaded());
    }

    #[test]
    fn test_exclusion_filter_is_case_insensitive() {
        let raw = vec![
            Track::from_raw(Some("Roar"), Some("Ondas FM"), None),
            Track::from_raw(Some("Quieto"), Some("Trío Nocturno"), None),
            Track::from_raw(Some("ONDAS fm especial"), Some("DJ X"), None),
        ];
        let filtered = filter_feed(&raw, &["ondas fm".to_string()]);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "Quieto");
    }

    #[test]
    fn test_no_exclusion_terms_keeps_everything() {
        let raw = vec![Track::from_raw(Some("Roar"), Some("Ondas FM"), None)];
        assert_eq!(filter_feed(&raw, &[]).len(), 1);
    }

    #[test]
    fn test_clear_resets_loaded_state() {
        let mut list = HistoryList::new(6);
        list.apply(&feed(&[("Uno", "A")]));
        list.clear();
        assert!(!list.is_loaded());
        assert!(list.entries().is_empty());
        // Next apply behaves like a first load again.
        assert!(list.apply(&feed(&[("Dos", "B"), ("Uno", "A")])));
        assert_eq!(list.entries().len(), 2);
    }
}
