//! Multi-cycle polling scenarios driven through the pure state machines:
//! the change detector and the bounded history merge, fed with decoded
//! payload sequences the way the pollers feed them.

use ondas_core::api::{decode_now_playing, NowPlayingEnvelope};
use ondas_core::history::{filter_feed, HistoryList};
use ondas_core::track::{Track, TrackWatcher};

fn envelope(title: &str, artist: &str) -> NowPlayingEnvelope {
    serde_json::from_str(&format!(
        r#"{{"now_playing":{{"song":{{"title":"{title}","artist":"{artist}","art":"https://art.example/x.jpg"}}}}}}"#
    ))
    .unwrap()
}

#[test]
fn displayed_track_changes_iff_normalized_pair_differs() {
    let mut watcher = TrackWatcher::new();
    let responses = [
        ("Roar", "Selva Eléctrica"),      // first load → change
        ("Roar", "Selva Eléctrica"),      // identical → no change
        ("ROAR ", "selva eléctrica"),     // same after normalization → no change
        ("Quieto", "Selva Eléctrica"),    // title differs → change
        ("Quieto", "Trío Nocturno"),      // artist differs → change
        ("Quieto", "Trío Nocturno"),      // identical → no change
    ];

    let mut changes = 0;
    for (title, artist) in responses {
        let track = decode_now_playing(envelope(title, artist)).unwrap();
        if watcher.observe(track).is_some() {
            changes += 1;
        }
    }
    assert_eq!(changes, 3);
    assert_eq!(watcher.current().unwrap().title, "Quieto");
}

#[test]
fn malformed_cycles_leave_state_untouched() {
    let mut watcher = TrackWatcher::new();
    watcher.observe(decode_now_playing(envelope("Roar", "Selva Eléctrica")).unwrap());

    // A malformed payload is skipped before the watcher ever sees it; the
    // next well-formed identical response must still count as unchanged.
    let malformed: NowPlayingEnvelope = serde_json::from_str(r#"{"now_playing":{}}"#).unwrap();
    assert!(decode_now_playing(malformed).is_err());

    let track = decode_now_playing(envelope("Roar", "Selva Eléctrica")).unwrap();
    assert!(watcher.observe(track).is_none());
}

#[test]
fn history_bound_and_head_dedup_hold_across_cycles() {
    let exclude = vec!["ondas fm".to_string()];
    let mut list = HistoryList::new(6);

    // First poll: ten items upstream, one of them the station's own jingle.
    let mut feed: Vec<Track> = (0..9)
        .map(|i| Track::from_raw(Some(&format!("Song {i}")), Some("Artist"), None))
        .collect();
    feed.insert(3, Track::from_raw(Some("Station ID"), Some("Ondas FM"), None));

    assert!(list.apply(&filter_feed(&feed, &exclude)));
    assert_eq!(list.entries().len(), 6);
    assert!(list.entries().iter().all(|e| e.artist != "Ondas FM"));
    assert_eq!(list.entries()[0].title, "Song 0");

    // Many cycles with an unchanged newest entry: zero mutations.
    let before = list.entries().to_vec();
    for _ in 0..20 {
        assert!(!list.apply(&filter_feed(&feed, &exclude)));
    }
    assert_eq!(list.entries(), &before[..]);

    // A genuinely new head track per cycle: bound holds, head advances.
    for i in 0..30 {
        let title = format!("New {i}");
        let next = vec![Track::from_raw(Some(&title), Some("Artist"), None)];
        assert!(list.apply(&filter_feed(&next, &exclude)));
        assert!(list.entries().len() <= 6);
        assert_eq!(list.entries()[0].title, title);
        // Never two consecutive identical keys at the head.
        assert_ne!(list.entries()[0].key, list.entries()[1].key);
    }
}

#[test]
fn excluded_newest_entry_cannot_become_the_head() {
    let exclude = vec!["ondas fm".to_string()];
    let mut list = HistoryList::new(6);
    let seed = vec![Track::from_raw(Some("Roar"), Some("Artist"), None)];
    list.apply(&filter_feed(&seed, &exclude));

    // The station's own name tops the raw feed; after filtering, the
    // remaining newest matches the head and the cycle is a no-op.
    let feed = vec![
        Track::from_raw(Some("Roar"), Some("Ondas FM"), None),
        Track::from_raw(Some("Roar"), Some("Artist"), None),
    ];
    assert!(!list.apply(&filter_feed(&feed, &exclude)));
    assert_eq!(list.entries()[0].artist, "Artist");
}
