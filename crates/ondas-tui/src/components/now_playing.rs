//! Now-playing pane: station name, current track, cover-art URL.

use ratatui::crossterm::event::KeyEvent;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;
use crate::component::Component;
use crate::theme::{station_accent, style_muted, style_secondary, C_BADGE_LIVE, C_BADGE_PAUSED, C_PRIMARY};
use crate::widgets::pane_chrome::{pane_chrome, Badge};
use crate::widgets::truncate_width as truncate;

pub struct NowPlaying;

impl NowPlaying {
    pub fn new() -> Self {
        Self
    }
}

impl Component for NowPlaying {
    fn id(&self) -> ComponentId {
        ComponentId::NowPlaying
    }

    fn handle_key(&mut self, _key: KeyEvent, _state: &AppState) -> Vec<Action> {
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let badge = if state.is_playing() {
            Some(Badge {
                text: "LIVE",
                color: C_BADGE_LIVE,
            })
        } else if state.session.awaiting_interaction {
            Some(Badge {
                text: "PAUSED",
                color: C_BADGE_PAUSED,
            })
        } else {
            None
        };

        let block = pane_chrome("now playing", Some('2'), focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 {
            return;
        }

        let width = inner.width as usize;
        let mut lines = Vec::new();

        if let Some(station) = state.session.current() {
            lines.push(Line::from(Span::styled(
                truncate(&format!(" {} — live", station.name), width),
                Style::default().fg(station_accent(station)),
            )));
        } else {
            lines.push(Line::from(Span::styled(" no station tuned", style_muted())));
        }

        match &state.track {
            Some(track) => {
                lines.push(Line::from(Span::styled(
                    truncate(&format!(" {}", track.title), width),
                    Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
                )));
                lines.push(Line::from(Span::styled(
                    truncate(&format!(" {}", track.artist), width),
                    style_secondary(),
                )));
                if !track.art_url.is_empty() {
                    lines.push(Line::from(Span::styled(
                        truncate(&format!(" art: {}", track.art_url), width),
                        style_muted(),
                    )));
                }
            }
            None => {
                let station = state
                    .loading_station
                    .as_deref()
                    .or(state.current_station_name());
                let text = match station {
                    Some(name) => format!(" loading… {}", name),
                    None => " —".to_string(),
                };
                lines.push(Line::from(Span::styled(truncate(&text, width), style_muted())));
            }
        }

        frame.render_widget(Paragraph::new(lines), inner);
    }
}
