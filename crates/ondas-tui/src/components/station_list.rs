//! Station list pane (left column).

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;
use crate::component::Component;
use crate::theme::{
    station_accent, style_muted, style_secondary, style_selected, style_selected_focused,
    C_PLAYING,
};
use crate::widgets::pane_chrome::pane_chrome;

pub struct StationList {
    pub selected: usize,
    scroll_offset: usize,
}

impl StationList {
    pub fn new() -> Self {
        Self {
            selected: 0,
            scroll_offset: 0,
        }
    }

    /// Keep the cursor on the tuned station after startup restore.
    pub fn select_current(&mut self, state: &AppState) {
        if let Some(idx) = state.session.current_station {
            self.selected = idx;
        }
    }
}

impl Component for StationList {
    fn id(&self) -> ComponentId {
        ComponentId::StationList
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        let count = state.session.stations.len();

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if count > 0 {
                    self.selected = (self.selected + 1).min(count - 1);
                }
            }
            KeyCode::Home | KeyCode::Char('g') => self.selected = 0,
            KeyCode::End | KeyCode::Char('G') => self.selected = count.saturating_sub(1),
            KeyCode::Enter => {
                if self.selected < count {
                    return vec![Action::Tune(self.selected)];
                }
            }
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let block = pane_chrome("stations", Some('1'), focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let stations = &state.session.stations;
        if stations.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled("  no stations in catalog", style_muted())),
                inner,
            );
            return;
        }

        self.selected = self.selected.min(stations.len() - 1);
        let height = inner.height as usize;
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if height > 0 && self.selected >= self.scroll_offset + height {
            self.scroll_offset = self.selected + 1 - height;
        }

        let lines: Vec<Line> = stations
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(height)
            .map(|(idx, station)| {
                let tuned = state.session.current_station == Some(idx);
                let marker = if tuned { " ♪ " } else { "   " };
                let style = if idx == self.selected && focused {
                    style_selected_focused()
                } else if idx == self.selected {
                    style_selected()
                } else if tuned {
                    Style::default().fg(station_accent(station))
                } else {
                    style_secondary()
                };
                Line::from(vec![
                    Span::styled(marker, Style::default().fg(C_PLAYING)),
                    Span::styled(station.name.clone(), style),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines), inner);
    }
}
