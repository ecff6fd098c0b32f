//! History pane: the bounded most-recent-first track list.

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
use crate::theme::{style_muted, style_secondary, C_MUTED, C_PRIMARY};
use crate::widgets::pane_chrome::pane_chrome;
use crate::widgets::truncate_width as clip;

pub struct HistoryPanel {
    scroll_offset: usize,
}

impl HistoryPanel {
    pub fn new() -> Self {
        Self { scroll_offset: 0 }
    }
}

impl Component for HistoryPanel {
    fn id(&self) -> ComponentId {
        ComponentId::History
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll_offset = self.scroll_offset.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                // Two rows per entry.
                let max = state.history.len().saturating_sub(1);
                self.scroll_offset = (self.scroll_offset + 1).min(max);
            }
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let block = pane_chrome("history", Some('3'), focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 {
            return;
        }

        if !state.history_loaded {
            let station = state
                .loading_station
                .as_deref()
                .or(state.current_station_name())
                .unwrap_or("—");
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!(" ◌ loading… {}", station),
                    style_muted(),
                )),
                inner,
            );
            return;
        }

        if state.history.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(" no previous tracks yet", style_muted())),
                inner,
            );
            return;
        }

        let width = inner.width as usize;
        let rows = inner.height as usize / 2;
        self.scroll_offset = self
            .scroll_offset
            .min(state.history.len().saturating_sub(1));

        let mut lines = Vec::new();
        for (i, entry) in state
            .history
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(rows)
        {
            let bullet = if i == 0 { " ♪ " } else { "   " };
            lines.push(Line::from(vec![
                Span::styled(bullet, Style::default().fg(C_MUTED)),
                Span::styled(
                    clip(&entry.title, width.saturating_sub(4)),
                    Style::default().fg(C_PRIMARY),
                ),
            ]));
            lines.push(Line::from(Span::styled(
                format!("    {}", clip(&entry.artist, width.saturating_sub(5))),
                style_secondary(),
            )));
        }

        frame.render_widget(Paragraph::new(lines), inner);
    }
}
