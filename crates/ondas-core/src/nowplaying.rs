//! Now-playing poller: recurring fetch of a station's metadata endpoint with
//! change detection.
//!
//! One instance lives for the whole session; a station switch stops it and
//! starts it again against the new endpoint. All per-station state (the
//! `TrackWatcher`) lives inside the polling task, so a restart always begins
//! with a clean first load.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::events::PlayerEvent;
use crate::track::{Track, TrackWatcher};

#[derive(Debug, Clone)]
pub struct NowPlayingSource {
    pub url: String,
    pub station: String,
}

pub struct NowPlayingPoller {
    client: ApiClient,
    events: broadcast::Sender<PlayerEvent>,
    /// Best-effort snapshot of the last confirmed track, for consumers that
    /// ask outside the event stream (share message, window title).
    current: Arc<RwLock<Option<Track>>>,
    /// Poll-cycle generation; see `HistoryPoller` for the stale-result rule.
    generation: Arc<AtomicU64>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl NowPlayingPoller {
    pub fn new(client: ApiClient, events: broadcast::Sender<PlayerEvent>) -> Self {
        Self {
            client,
            events,
            current: Arc::new(RwLock::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            task: None,
        }
    }

    pub async fn current_track(&self) -> Option<Track> {
        self.current.read().await.clone()
    }

    /// Begin polling: immediate first fetch, then one per interval. Cycles
    /// run sequentially inside one task (delay-on-missed-tick), so a slow
    /// fetch can never overlap the next cycle.
    pub fn start(&mut self, source: NowPlayingSource, interval: Duration) {
        self.abort_task();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let client = self.client.clone();
        let events = self.events.clone();
        let current = Arc::clone(&self.current);
        let gen_handle = Arc::clone(&self.generation);

        info!("[nowplaying] start: {} every {:?}", source.station, interval);
        self.task = Some(tokio::spawn(async move {
            let mut watcher = TrackWatcher::new();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match client.fetch_now_playing(&source.url).await {
                    Ok(track) => {
                        if gen_handle.load(Ordering::SeqCst) != generation {
                            debug!("[nowplaying] discarding stale result for {}", source.station);
                            return;
                        }
                        if let Some(changed) = watcher.observe(track) {
                            info!(
                                "[nowplaying] change: {} — {}",
                                changed.artist, changed.title
                            );
                            *current.write().await = Some(changed.clone());
                            let _ = events.send(PlayerEvent::TrackChanged {
                                track: changed,
                                timestamp: chrono::Local::now(),
                            });
                        }
                    }
                    Err(e) => {
                        // Transport failures and malformed payloads alike:
                        // skip the cycle, keep the stored track untouched.
                        warn!("[nowplaying] poll cycle failed for {}: {}", source.station, e);
                    }
                }
            }
        }));
    }

    /// Cancel polling and forget the last-seen track; the UI falls back to a
    /// loading state for `station`.
    pub async fn stop(&mut self, station: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.abort_task();
        *self.current.write().await = None;
        let _ = self.events.send(PlayerEvent::NowPlayingReset {
            station: station.to_string(),
        });
        info!("[nowplaying] stopped");
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for NowPlayingPoller {
    fn drop(&mut self) {
        self.abort_task();
    }
}
