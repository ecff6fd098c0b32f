//! Color palette and style constants for the player UI.

use ratatui::style::{Color, Modifier, Style};

use ondas_core::stations::{Station, StationColor};

// ── Color palette ─────────────────────────────────────────────────────────────

pub const C_BG: Color = Color::Rgb(16, 16, 20);
pub const C_PRIMARY: Color = Color::Rgb(212, 212, 224);
pub const C_SECONDARY: Color = Color::Rgb(118, 118, 140);
pub const C_MUTED: Color = Color::Rgb(74, 74, 90);
pub const C_ACCENT: Color = Color::Rgb(246, 213, 63);
pub const C_PLAYING: Color = Color::Rgb(84, 198, 124);
pub const C_CONNECTING: Color = Color::Rgb(255, 184, 80);
pub const C_ERROR: Color = Color::Rgb(255, 92, 92);
pub const C_SELECTION_BG: Color = Color::Rgb(30, 30, 42);
pub const C_PANEL_BORDER: Color = Color::Rgb(42, 42, 54);
pub const C_PANEL_BORDER_FOCUSED: Color = Color::Rgb(124, 104, 200);
pub const C_NUMBER_HINT: Color = Color::Rgb(92, 92, 116);
pub const C_BADGE_LIVE: Color = Color::Rgb(84, 198, 124);
pub const C_BADGE_PAUSED: Color = Color::Rgb(255, 184, 80);

// ── Predefined styles ─────────────────────────────────────────────────────────

pub fn style_secondary() -> Style {
    Style::default().fg(C_SECONDARY)
}

pub fn style_muted() -> Style {
    Style::default().fg(C_MUTED)
}

pub fn style_selected() -> Style {
    Style::default().bg(C_SELECTION_BG).fg(C_PRIMARY)
}

pub fn style_selected_focused() -> Style {
    Style::default()
        .bg(C_SELECTION_BG)
        .fg(C_PRIMARY)
        .add_modifier(Modifier::BOLD)
}

pub fn style_focused_border() -> Style {
    Style::default().fg(C_PANEL_BORDER_FOCUSED)
}

pub fn style_unfocused_border() -> Style {
    Style::default().fg(C_PANEL_BORDER)
}

/// A station's accent color for pane highlights, falling back to the theme
/// accent when the catalog entry has no usable color.
pub fn station_accent(station: &Station) -> Color {
    let from_field = |s: &str| crate::viz::parse_hex(s);
    match &station.color {
        StationColor::Single(c) => from_field(c),
        StationColor::Many(list) => list.first().and_then(|c| from_field(c)),
        StationColor::Unset => None,
    }
    .or_else(|| station.color_light.as_deref().and_then(from_field))
    .unwrap_or(C_ACCENT)
}
