//! PlayerCore — single-owner event loop for playback and poller lifecycle.
//!
//! All tasks that need to change what is playing send `CoreEvent`s here.
//! PlayerCore owns the playback engine, the analyser capture and both
//! pollers exclusively; no other task touches them. After every mutation it
//! publishes on the shared `PlayerEvent` bus so the UI can re-read the
//! session store.
//!
//! Engine signals are observation-driven: the IPC reader pushes `core-idle`
//! and `pause` changes, and the playback status is derived from the observed
//! pair plus the user's intent — never polled.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

use ondas_core::config::Config;
use ondas_core::events::PlayerEvent;
use ondas_core::history::{HistoryPoller, HistorySource};
use ondas_core::nowplaying::{NowPlayingPoller, NowPlayingSource};
use ondas_core::state::{PlaybackStatus, SessionStore};
use ondas_core::stations::Station;

use crate::analyser::{AnalyserTap, CaptureController};
use crate::playback::{PlaybackEngine, PlaybackSignal};

// ── CoreEvent ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    /// Switch to the station at this catalog index.
    Tune(usize),
    Stop,
    Next,
    Prev,
    Random,
    TogglePause,
    SetVolume(f32),
    /// First user interaction after a rejected playback start.
    Interaction,
    Shutdown,
}

#[derive(Debug)]
pub enum CoreEvent {
    Command(PlayerCommand),
    Playback(PlaybackSignal),
}

// ── PlayerCore ────────────────────────────────────────────────────────────────

pub struct PlayerCore {
    config: Config,
    store: Arc<SessionStore>,
    events: broadcast::Sender<PlayerEvent>,
    engine: PlaybackEngine,
    capture: CaptureController,
    now_playing: NowPlayingPoller,
    history: HistoryPoller,
    /// True once the user asked for playback (used to derive status).
    intend_playing: bool,
    /// Observed engine properties.
    obs_rolling: bool,
    obs_pause: bool,
    last_status: PlaybackStatus,
    /// Pollers run once per tune, started when the stream first rolls.
    companions_started: bool,
}

impl PlayerCore {
    pub fn new(
        config: Config,
        store: Arc<SessionStore>,
        events: broadcast::Sender<PlayerEvent>,
        core_tx: mpsc::Sender<CoreEvent>,
        tap: AnalyserTap,
    ) -> anyhow::Result<Self> {
        // Engine signals are forwarded into our own event loop.
        let (signal_tx, mut signal_rx) = mpsc::channel::<PlaybackSignal>(64);
        tokio::spawn(async move {
            while let Some(signal) = signal_rx.recv().await {
                if core_tx.send(CoreEvent::Playback(signal)).await.is_err() {
                    break;
                }
            }
        });

        let client = ondas_core::api::ApiClient::new(config.api.token.clone())?;
        let now_playing = NowPlayingPoller::new(client.clone(), events.clone());
        let history = HistoryPoller::new(
            client,
            events.clone(),
            config.history.max_items,
            config.history.exclude_terms.clone(),
        );

        Ok(Self {
            config,
            store,
            events,
            engine: PlaybackEngine::new(signal_tx),
            capture: CaptureController::new(tap),
            now_playing,
            history,
            intend_playing: false,
            obs_rolling: false,
            obs_pause: false,
            last_status: PlaybackStatus::Idle,
            companions_started: false,
        })
    }

    /// Run until `Shutdown` or the channel closes (UI exited).
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<CoreEvent>) -> anyhow::Result<()> {
        info!("PlayerCore: starting event loop");

        loop {
            match event_rx.recv().await {
                None => {
                    info!("PlayerCore: event channel closed");
                    break;
                }
                Some(CoreEvent::Command(PlayerCommand::Shutdown)) => {
                    info!("PlayerCore: shutdown requested");
                    break;
                }
                Some(CoreEvent::Command(cmd)) => {
                    if let Err(e) = self.handle_command(cmd).await {
                        warn!("PlayerCore: command error: {}", e);
                    }
                }
                Some(CoreEvent::Playback(signal)) => {
                    self.handle_signal(signal).await;
                }
            }
        }

        self.cleanup().await;
        Ok(())
    }

    async fn handle_command(&mut self, cmd: PlayerCommand) -> anyhow::Result<()> {
        info!("PlayerCore: command {:?}", cmd);
        match cmd {
            PlayerCommand::Tune(idx) => self.tune(idx).await?,
            PlayerCommand::Stop => self.stop().await,
            PlayerCommand::Next => self.step_station(1).await?,
            PlayerCommand::Prev => self.step_station(-1).await?,
            PlayerCommand::Random => self.random_station().await?,
            PlayerCommand::TogglePause => self.toggle_pause().await,
            PlayerCommand::SetVolume(value) => self.set_volume(value).await?,
            PlayerCommand::Interaction => self.retry_on_interaction().await,
            // Intercepted by run() before dispatch.
            PlayerCommand::Shutdown => {}
        }
        Ok(())
    }

    // ── station switch ────────────────────────────────────────────────────────

    async fn tune(&mut self, idx: usize) -> anyhow::Result<()> {
        let snapshot = self.store.snapshot().await;
        let Some(station) = snapshot.stations.get(idx).cloned() else {
            warn!("tune: no station at index {}", idx);
            return Ok(());
        };
        info!("tuning: {}", station.name);

        // Old companions first — the panes fall back to a loading state
        // labelled with the station being tuned.
        self.companions_started = false;
        self.now_playing.stop(&station.name).await;
        self.history.stop(&station.name);
        self.capture.stop();

        self.store.set_tuning(idx).await?;
        self.intend_playing = true;
        self.obs_rolling = false;
        self.last_status = PlaybackStatus::Connecting;
        let _ = self.events.send(PlayerEvent::SessionUpdated);

        let handle = match self.engine.ensure_handle().await {
            Ok(h) => h,
            Err(e) => {
                warn!("tune: playback engine unavailable: {}", e);
                self.defer_to_interaction().await;
                return Ok(());
            }
        };

        self.engine.last_volume = snapshot.volume;
        if let Err(e) = handle.load(&station.stream, snapshot.volume).await {
            // Commonly an autoplay-style rejection; the UI stays ready and
            // the next user interaction retries.
            warn!("tune: failed to start '{}': {}", station.name, e);
            self.defer_to_interaction().await;
            return Ok(());
        }

        // Same analyser tap, new capture source — the graph is never rebuilt.
        self.capture.retarget(&station.stream);
        Ok(())
    }

    /// Start the pollers for the tuned station. Called once per tune, the
    /// first time the stream actually rolls.
    async fn start_companions(&mut self, station: &Station) {
        self.companions_started = true;
        self.now_playing.start(
            NowPlayingSource {
                url: station.api.clone(),
                station: station.name.clone(),
            },
            Duration::from_secs(self.config.polling.now_playing_interval_secs),
        );
        self.history.start(
            HistorySource {
                url: station.history.clone(),
                station: station.name.clone(),
            },
            Duration::from_secs(self.config.polling.history_interval_secs),
        );
    }

    async fn stop(&mut self) {
        info!("stopping playback");
        self.intend_playing = false;
        self.companions_started = false;

        let station = self
            .store
            .snapshot()
            .await
            .current()
            .map(|s| s.name.clone())
            .unwrap_or_default();
        self.now_playing.stop(&station).await;
        self.history.stop(&station);
        self.capture.stop();

        if let Some(handle) = self.engine.handle() {
            let _ = handle.stop().await;
        }
        self.store.set_stopped().await;
        self.last_status = PlaybackStatus::Idle;
        let _ = self.events.send(PlayerEvent::SessionUpdated);
    }

    async fn step_station(&mut self, delta: i64) -> anyhow::Result<()> {
        let snapshot = self.store.snapshot().await;
        let count = snapshot.stations.len();
        if count == 0 {
            return Ok(());
        }
        let current = snapshot.current_station.unwrap_or(0) as i64;
        let next = (current + delta).rem_euclid(count as i64) as usize;
        self.tune(next).await
    }

    async fn random_station(&mut self) -> anyhow::Result<()> {
        use rand::Rng;
        let snapshot = self.store.snapshot().await;
        if snapshot.stations.is_empty() {
            return Ok(());
        }
        let idx = rand::thread_rng().gen_range(0..snapshot.stations.len());
        self.tune(idx).await
    }

    // ── playback controls ─────────────────────────────────────────────────────

    async fn toggle_pause(&mut self) {
        if self.store.snapshot().await.current_station.is_none() {
            return;
        }
        if let Some(handle) = self.engine.handle() {
            // Use the observed pause state rather than an IPC round-trip.
            if let Err(e) = handle.set_pause(!self.obs_pause).await {
                warn!("toggle pause failed: {}", e);
            }
        }
    }

    async fn set_volume(&mut self, value: f32) -> anyhow::Result<()> {
        self.store.set_volume(value).await?;
        self.engine.last_volume = value.clamp(0.0, 1.0);
        if let Some(handle) = self.engine.handle() {
            let _ = handle.set_volume(value).await;
        }
        let _ = self.events.send(PlayerEvent::SessionUpdated);
        Ok(())
    }

    /// Playback-start rejection fallback: the UI is marked ready with a
    /// paused affordance and the real start waits for the next interaction.
    async fn defer_to_interaction(&mut self) {
        self.store.set_playback(PlaybackStatus::Paused).await;
        self.store.set_awaiting_interaction(true).await;
        self.last_status = PlaybackStatus::Paused;
        let _ = self.events.send(PlayerEvent::SessionUpdated);
    }

    async fn retry_on_interaction(&mut self) {
        if !self.store.snapshot().await.awaiting_interaction {
            return;
        }
        self.store.set_awaiting_interaction(false).await;
        let snapshot = self.store.snapshot().await;
        let Some(station) = snapshot.current().cloned() else {
            return;
        };
        info!("retrying playback on user interaction: {}", station.name);

        self.intend_playing = true;
        if let Ok(handle) = self.engine.ensure_handle().await {
            if let Err(e) = handle.load(&station.stream, snapshot.volume).await {
                warn!("interaction retry failed: {}", e);
                self.defer_to_interaction().await;
                return;
            }
            self.capture.retarget(&station.stream);
        }
        let _ = self.events.send(PlayerEvent::SessionUpdated);
    }

    // ── engine signals ────────────────────────────────────────────────────────

    async fn handle_signal(&mut self, signal: PlaybackSignal) {
        match signal {
            PlaybackSignal::Rolling(rolling) => self.obs_rolling = rolling,
            PlaybackSignal::Paused(paused) => self.obs_pause = paused,
            PlaybackSignal::Closed => {
                warn!("playback engine connection closed");
                self.obs_rolling = false;
                if self.intend_playing {
                    self.store.set_playback(PlaybackStatus::Error).await;
                    self.last_status = PlaybackStatus::Error;
                    let _ = self.events.send(PlayerEvent::SessionUpdated);
                }
                return;
            }
        }
        self.update_status().await;
    }

    /// Derive the playback status from intent plus observed properties and
    /// publish it when it changed.
    async fn update_status(&mut self) {
        let status = if !self.intend_playing {
            PlaybackStatus::Idle
        } else if self.obs_pause {
            PlaybackStatus::Paused
        } else if self.obs_rolling {
            PlaybackStatus::Playing
        } else {
            PlaybackStatus::Connecting
        };

        if status == PlaybackStatus::Playing && !self.companions_started {
            if let Some(station) = self.store.snapshot().await.current().cloned() {
                self.start_companions(&station).await;
            }
        }

        if status != self.last_status {
            info!("playback status: {:?} → {:?}", self.last_status, status);
            self.last_status = status.clone();
            self.store.set_playback(status).await;
            let _ = self.events.send(PlayerEvent::SessionUpdated);
        }
    }

    async fn cleanup(&mut self) {
        info!("PlayerCore: cleanup");
        let station = self
            .store
            .snapshot()
            .await
            .current()
            .map(|s| s.name.clone())
            .unwrap_or_default();
        self.now_playing.stop(&station).await;
        self.history.stop(&station);
        self.capture.stop();
        self.engine.shutdown().await;
    }
}
