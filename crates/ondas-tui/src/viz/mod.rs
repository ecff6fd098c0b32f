// Waveband visualizer — three smoothed time-domain lines per station color.
// Structure follows the oscilloscope display module this grew out of, reduced
// to the single display mode this player uses.

pub mod waveband;

use ratatui::style::Color;

use ondas_core::stations::StationColor;

use crate::theme::C_BG;

pub const BAND_COUNT: usize = 3;

/// Resolved band colors for one running visualizer.
#[derive(Debug, Clone, PartialEq)]
pub struct BandPalette {
    colors: [Color; BAND_COUNT],
    /// True when all three bands came from a single station color; the outer
    /// bands are then rendered at half intensity.
    single: bool,
}

impl BandPalette {
    /// Resolve a station's color field: a single hex string colors all three
    /// bands (outers dimmed), an array of ≥3 maps one per band, anything else
    /// falls back to `defaults`. Non-hex entries fall back per index.
    pub fn resolve(color: &StationColor, defaults: &[String; 3]) -> Self {
        let (raw, single) = match color {
            StationColor::Single(c) => ([c.clone(), c.clone(), c.clone()], true),
            StationColor::Many(list) if list.len() >= BAND_COUNT => {
                ([list[0].clone(), list[1].clone(), list[2].clone()], false)
            }
            _ => (defaults.clone(), false),
        };

        let mut colors = [Color::White; BAND_COUNT];
        for (i, entry) in raw.iter().enumerate() {
            colors[i] = parse_hex(entry)
                .or_else(|| parse_hex(&defaults[i]))
                .unwrap_or(Color::White);
        }
        Self { colors, single }
    }

    /// Band body color, outer-band dimming applied.
    pub fn band_color(&self, band: usize) -> Color {
        let color = self.colors[band % BAND_COUNT];
        if self.single && band != 1 {
            dim(color, 0.5)
        } else {
            color
        }
    }

    /// Edge color for the gradient fade-out at either end of a band.
    pub fn edge_color(&self, band: usize) -> Color {
        dim(self.band_color(band), 0.5)
    }

    pub fn is_single(&self) -> bool {
        self.single
    }
}

/// Strict `#RRGGBB` parser; anything else is rejected so the caller can fall
/// back, matching the catalog's color contract.
pub fn parse_hex(s: &str) -> Option<Color> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

/// Blend a color toward the background — the terminal stand-in for opacity.
pub fn dim(color: Color, keep: f32) -> Color {
    let (br, bg_, bb) = match C_BG {
        Color::Rgb(r, g, b) => (r, g, b),
        _ => (0, 0, 0),
    };
    match color {
        Color::Rgb(r, g, b) => Color::Rgb(
            blend(r, br, keep),
            blend(g, bg_, keep),
            blend(b, bb, keep),
        ),
        other => other,
    }
}

fn blend(fg: u8, bg: u8, keep: f32) -> u8 {
    (fg as f32 * keep + bg as f32 * (1.0 - keep)).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> [String; 3] {
        [
            "#F6D53F".to_string(),
            "#002C77".to_string(),
            "#CA0020".to_string(),
        ]
    }

    #[test]
    fn test_parse_hex_strict() {
        assert_eq!(parse_hex("#1E448E"), Some(Color::Rgb(0x1E, 0x44, 0x8E)));
        assert_eq!(parse_hex("1E448E"), None);
        assert_eq!(parse_hex("#1E448"), None);
        assert_eq!(parse_hex("#1E448G"), None);
        assert_eq!(parse_hex("#1E448E00"), None);
    }

    #[test]
    fn test_single_color_dims_outer_bands() {
        let palette = BandPalette::resolve(
            &StationColor::Single("#1E448E".to_string()),
            &defaults(),
        );
        assert!(palette.is_single());
        let full = Color::Rgb(0x1E, 0x44, 0x8E);
        assert_eq!(palette.band_color(1), full);
        assert_eq!(palette.band_color(0), dim(full, 0.5));
        assert_eq!(palette.band_color(2), dim(full, 0.5));
        assert_ne!(palette.band_color(0), full);
    }

    #[test]
    fn test_triple_maps_one_color_per_band() {
        let palette = BandPalette::resolve(
            &StationColor::Many(vec![
                "#F6D53F".to_string(),
                "#002C77".to_string(),
                "#CA0020".to_string(),
            ]),
            &defaults(),
        );
        assert!(!palette.is_single());
        assert_eq!(palette.band_color(0), Color::Rgb(0xF6, 0xD5, 0x3F));
        assert_eq!(palette.band_color(1), Color::Rgb(0x00, 0x2C, 0x77));
        assert_eq!(palette.band_color(2), Color::Rgb(0xCA, 0x00, 0x20));
    }

    #[test]
    fn test_invalid_entry_falls_back_per_index() {
        let palette = BandPalette::resolve(
            &StationColor::Many(vec![
                "#F6D53F".to_string(),
                "teal".to_string(),
                "#CA0020".to_string(),
            ]),
            &defaults(),
        );
        assert_eq!(palette.band_color(0), Color::Rgb(0xF6, 0xD5, 0x3F));
        assert_eq!(palette.band_color(1), Color::Rgb(0x00, 0x2C, 0x77));
    }

    #[test]
    fn test_unset_and_short_arrays_use_defaults() {
        for color in [
            StationColor::Unset,
            StationColor::Many(vec!["#111111".to_string()]),
        ] {
            let palette = BandPalette::resolve(&color, &defaults());
            assert!(!palette.is_single());
            assert_eq!(palette.band_color(0), Color::Rgb(0xF6, 0xD5, 0x3F));
            assert_eq!(palette.band_color(2), Color::Rgb(0xCA, 0x00, 0x20));
        }
    }
}
