//! App — terminal setup, the main select loop, and action dispatch.
//!
//! The loop multiplexes three sources: terminal input (read on a blocking
//! task and forwarded), `PlayerEvent`s from the core/pollers, and a render
//! tick that drives the visualizer animation. Components return `Action`s;
//! the app translates them into `PlayerCommand`s or local state changes.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use ondas_core::config::Config;
use ondas_core::events::PlayerEvent;
use ondas_core::state::{PlaybackStatus, SessionStore};
use ondas_core::track::Track;

use crate::action::{Action, ComponentId};
use crate::analyser::AnalyserTap;
use crate::app_state::AppState;
use crate::component::Component;
use crate::components::{
    history_panel::HistoryPanel, now_playing::NowPlaying, station_list::StationList,
    viz_panel::VizPanel,
};
use crate::core::{CoreEvent, PlayerCommand};
use crate::viz::BandPalette;
use crate::widgets::status_bar;

/// Render cadence for the visualizer animation.
const RENDER_FPS: u64 = 25;

const FALLBACK_TITLE: &str = "ondas";

enum AppMessage {
    Event(Event),
    Player(PlayerEvent),
}

pub struct App {
    config: Config,
    store: Arc<SessionStore>,
    core_tx: mpsc::Sender<CoreEvent>,
    state: AppState,

    station_list: StationList,
    now_playing: NowPlaying,
    viz_panel: VizPanel,
    history_panel: HistoryPanel,

    focus: ComponentId,
    /// Last tuned station index, to detect switches in session updates.
    last_station: Option<usize>,
    should_quit: bool,
}

impl App {
    pub fn new(
        config: Config,
        store: Arc<SessionStore>,
        core_tx: mpsc::Sender<CoreEvent>,
        tap: AnalyserTap,
        initial_session: ondas_core::state::SessionState,
    ) -> Self {
        let mut station_list = StationList::new();
        let state = AppState::new(initial_session);
        station_list.select_current(&state);

        Self {
            config,
            store,
            core_tx,
            state,
            station_list,
            now_playing: NowPlaying::new(),
            viz_panel: VizPanel::new(tap),
            history_panel: HistoryPanel::new(),
            focus: ComponentId::StationList,
            // None even when a station was restored: the first session update
            // after the startup tune must install the visualizer palette.
            last_station: None,
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self, mut player_rx: broadcast::Receiver<PlayerEvent>) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, SetTitle(FALLBACK_TITLE))?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);

        // Keyboard events, read on a blocking task.
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // Player events, forwarded from the broadcast bus.
        let player_tx = tx.clone();
        tokio::spawn(async move {
            loop {
                match player_rx.recv().await {
                    Ok(ev) => {
                        if player_tx.send(AppMessage::Player(ev)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("player event receiver lagged by {}", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let mut render_tick = tokio::time::interval(Duration::from_millis(1000 / RENDER_FPS));
        render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            terminal.draw(|f| self.draw(f))?;
            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    self.handle_message(msg).await;
                    // Drain whatever queued behind it before redrawing.
                    while let Ok(next) = rx.try_recv() {
                        self.handle_message(next).await;
                    }
                }
                _ = render_tick.tick() => {}
            }
        }

        let _ = self.core_tx.send(CoreEvent::Command(PlayerCommand::Shutdown)).await;
        disable_raw_mode()?;
        execute!(io::stdout(), LeaveAlternateScreen, SetTitle(""))?;
        Ok(())
    }

    async fn handle_message(&mut self, msg: AppMessage) {
        match msg {
            AppMessage::Event(Event::Key(key)) => self.handle_key(key).await,
            AppMessage::Event(_) => {}
            AppMessage::Player(ev) => self.handle_player_event(ev).await,
        }
    }

    // ── Keys ──────────────────────────────────────────────────────────────────

    async fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }

        // One-shot retry after a rejected playback start: any interaction
        // counts, and the key still does whatever it normally does.
        if self.state.session.awaiting_interaction {
            self.send(PlayerCommand::Interaction).await;
        }

        let actions = match key.code {
            KeyCode::Char('q') => vec![Action::Quit],
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                vec![Action::Quit]
            }
            KeyCode::Tab => vec![Action::FocusNext],
            KeyCode::Char('1') => vec![Action::Focus(ComponentId::StationList)],
            KeyCode::Char('2') => vec![Action::Focus(ComponentId::NowPlaying)],
            KeyCode::Char('3') => vec![Action::Focus(ComponentId::History)],
            KeyCode::Char(' ') => vec![Action::TogglePause],
            KeyCode::Char('x') => vec![Action::StopPlayback],
            KeyCode::Char('n') => vec![Action::NextStation],
            KeyCode::Char('p') => vec![Action::PrevStation],
            KeyCode::Char('r') => vec![Action::RandomStation],
            KeyCode::Char('s') => vec![Action::CopyShare],
            KeyCode::Char('+') | KeyCode::Char('=') => vec![Action::VolumeDelta(0.05)],
            KeyCode::Char('-') => vec![Action::VolumeDelta(-0.05)],
            _ => match self.focus {
                ComponentId::StationList => self.station_list.handle_key(key, &self.state),
                ComponentId::NowPlaying => self.now_playing.handle_key(key, &self.state),
                ComponentId::Visualizer => self.viz_panel.handle_key(key, &self.state),
                ComponentId::History => self.history_panel.handle_key(key, &self.state),
            },
        };

        for action in actions {
            self.apply_action(action).await;
        }
    }

    async fn apply_action(&mut self, action: Action) {
        match action {
            Action::Tune(idx) => self.send(PlayerCommand::Tune(idx)).await,
            Action::TogglePause => self.send(PlayerCommand::TogglePause).await,
            Action::StopPlayback => self.send(PlayerCommand::Stop).await,
            Action::NextStation => self.send(PlayerCommand::Next).await,
            Action::PrevStation => self.send(PlayerCommand::Prev).await,
            Action::RandomStation => self.send(PlayerCommand::Random).await,
            Action::VolumeDelta(delta) => {
                let volume = (self.state.session.volume + delta).clamp(0.0, 1.0);
                self.send(PlayerCommand::SetVolume(volume)).await;
            }
            Action::CopyShare => self.copy_share(),
            Action::Focus(id) => self.focus = id,
            Action::FocusNext => {
                self.focus = match self.focus {
                    ComponentId::StationList => ComponentId::NowPlaying,
                    ComponentId::NowPlaying => ComponentId::History,
                    ComponentId::History => ComponentId::StationList,
                    ComponentId::Visualizer => ComponentId::StationList,
                };
            }
            Action::Quit => self.should_quit = true,
        }
    }

    async fn send(&self, cmd: PlayerCommand) {
        if self.core_tx.send(CoreEvent::Command(cmd)).await.is_err() {
            warn!("player core is gone");
        }
    }

    fn copy_share(&mut self) {
        let Some(message) = self.state.share_message.clone() else {
            return;
        };
        match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(message)) {
            Ok(()) => debug!("share message copied to clipboard"),
            Err(e) => warn!("clipboard copy failed: {}", e),
        }
    }

    // ── Player events ─────────────────────────────────────────────────────────

    async fn handle_player_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::TrackChanged { track, timestamp } => {
                debug!("track change at {}: {}", timestamp, track.identity_key());
                if let Some(station) = self.state.current_station_name() {
                    self.state.share_message =
                        Some(fill_template(&self.config.ui.share_template, &track, station));
                }
                self.state.track = Some(track);
                self.state.loading_station = None;
                self.apply_terminal_title();
            }
            PlayerEvent::NowPlayingReset { station } => {
                self.state.track = None;
                self.state.share_message = None;
                self.state.loading_station = Some(station);
            }
            PlayerEvent::HistoryUpdated { entries } => {
                self.state.history = entries;
                self.state.history_loaded = true;
            }
            PlayerEvent::HistoryReset { station } => {
                self.state.history.clear();
                self.state.history_loaded = false;
                self.state.loading_station = Some(station);
            }
            PlayerEvent::SessionUpdated => {
                self.state.session = self.store.snapshot().await;
                self.on_session_updated();
            }
        }
    }

    fn on_session_updated(&mut self) {
        let current = self.state.session.current_station;
        if current != self.last_station {
            self.last_station = current;
            self.station_list.select_current(&self.state);
            match self.state.session.current() {
                Some(station) => {
                    let palette =
                        BandPalette::resolve(&station.color, &self.config.ui.viz_colors);
                    self.viz_panel.restart(palette);
                }
                None => self.viz_panel.stop(),
            }
        }
        if self.state.session.playback == PlaybackStatus::Idle {
            self.viz_panel.stop();
        }
        self.apply_terminal_title();
    }

    /// Document-title analog: the window title carries the track while
    /// playing and falls back to the app name otherwise.
    fn apply_terminal_title(&self) {
        let title = match (&self.state.track, self.state.is_playing()) {
            (Some(track), true) => {
                let station = self.state.current_station_name().unwrap_or(FALLBACK_TITLE);
                fill_template(&self.config.ui.title_template, track, station)
            }
            _ => FALLBACK_TITLE.to_string(),
        };
        if let Err(e) = execute!(io::stdout(), SetTitle(title.as_str())) {
            warn!("failed to set terminal title: {}", e);
        }
    }

    // ── Layout ────────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut Frame) {
        let [main, status] = split(
            frame.area(),
            Direction::Vertical,
            [Constraint::Min(4), Constraint::Length(1)],
        );
        let [left, right] = split(
            main,
            Direction::Horizontal,
            [Constraint::Length(28), Constraint::Min(20)],
        );
        let history_height = (self.config.history.max_items as u16) * 2 + 2;
        let [top, viz, history] = split(
            right,
            Direction::Vertical,
            [
                Constraint::Length(6),
                Constraint::Min(6),
                Constraint::Length(history_height),
            ],
        );

        self.station_list
            .draw(frame, left, self.focus == ComponentId::StationList, &self.state);
        self.now_playing
            .draw(frame, top, self.focus == ComponentId::NowPlaying, &self.state);
        self.viz_panel
            .draw(frame, viz, self.focus == ComponentId::Visualizer, &self.state);
        self.history_panel
            .draw(frame, history, self.focus == ComponentId::History, &self.state);
        status_bar::draw(frame, status, &self.state);
    }
}

fn split<const N: usize>(area: Rect, direction: Direction, constraints: [Constraint; N]) -> [Rect; N] {
    let chunks = Layout::default()
        .direction(direction)
        .constraints(constraints)
        .split(area);
    std::array::from_fn(|i| chunks[i])
}

/// Fill a title/share template: `////` becomes `ARTIST - "TRACK"`, then the
/// `ARTIST`, `TRACK` and `----` (station) placeholders are substituted.
fn fill_template(template: &str, track: &Track, station: &str) -> String {
    template
        .replace("////", &format!("{} - \"{}\"", track.artist, track.title))
        .replace("ARTIST", &track.artist)
        .replace("TRACK", &track.title)
        .replace("----", station)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> Track {
        Track::from_raw(Some("Roar"), Some("Selva Eléctrica"), None)
    }

    #[test]
    fn test_fill_title_template() {
        let title = fill_template("♪ //// on ----", &track(), "Radio Andina");
        assert_eq!(title, "♪ Selva Eléctrica - \"Roar\" on Radio Andina");
    }

    #[test]
    fn test_fill_share_template() {
        let message = fill_template(
            "Listening to ARTIST — \"TRACK\" on ----",
            &track(),
            "Radio Andina",
        );
        assert_eq!(
            message,
            "Listening to Selva Eléctrica — \"Roar\" on Radio Andina"
        );
    }
}
