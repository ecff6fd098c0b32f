//! Bottom status strip: playback state, volume, key hints.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use ondas_core::state::PlaybackStatus;

use crate::app_state::AppState;
use crate::theme::{C_CONNECTING, C_ERROR, C_MUTED, C_PLAYING, C_SECONDARY};

pub fn draw(frame: &mut Frame, area: Rect, state: &AppState) {
    if area.height == 0 {
        return;
    }

    let (label, color) = match state.session.playback {
        PlaybackStatus::Playing => ("● playing", C_PLAYING),
        PlaybackStatus::Connecting => ("◌ connecting", C_CONNECTING),
        PlaybackStatus::Paused => ("∥ paused", C_CONNECTING),
        PlaybackStatus::Error => ("✕ error", C_ERROR),
        PlaybackStatus::Idle => ("· idle", C_MUTED),
    };

    let volume = format!("vol {:>3.0}%", state.session.volume * 100.0);
    let hint = if state.session.awaiting_interaction {
        "press any key to start playback"
    } else {
        "enter tune · space pause · x stop · n/p/r stations · s share · +/- vol · q quit"
    };

    let line = Line::from(vec![
        Span::styled(format!(" {label} "), Style::default().fg(color)),
        Span::styled(format!(" {volume} "), Style::default().fg(C_SECONDARY)),
        Span::styled(format!("  {hint}"), Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
