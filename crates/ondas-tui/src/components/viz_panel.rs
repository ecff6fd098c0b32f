//! Visualizer pane: drives the waveband renderer once per drawn frame.
//!
//! The draw loop is the frame scheduler: when the pane is hidden or has no
//! area the frame is simply skipped (state kept, nothing queued). A station
//! switch stops the old renderer instance and installs a fresh one with the
//! new station's palette.

use ratatui::crossterm::event::KeyEvent;
use ratatui::{
    layout::Rect,
    style::Style,
    symbols::Marker,
    text::Span,
    widgets::{Axis, Block, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::action::{Action, ComponentId};
use crate::analyser::{AnalyserTap, TIME_DOMAIN_BINS};
use crate::app_state::AppState;
use crate::component::Component;
use crate::theme::{style_muted, C_BG};
use crate::viz::waveband::{WavebandRenderer, Y_SCALE};
use crate::viz::BandPalette;
use crate::widgets::pane_chrome::pane_chrome;

pub struct VizPanel {
    tap: AnalyserTap,
    renderer: Option<WavebandRenderer>,
    samples: Vec<u8>,
}

impl VizPanel {
    pub fn new(tap: AnalyserTap) -> Self {
        Self {
            tap,
            renderer: None,
            samples: vec![128; TIME_DOMAIN_BINS],
        }
    }

    /// Stop the running instance and start a fresh one (clean smoothing
    /// buffers) with the next station's colors.
    pub fn restart(&mut self, palette: BandPalette) {
        if let Some(renderer) = &mut self.renderer {
            renderer.stop();
        }
        self.renderer = Some(WavebandRenderer::new(palette));
    }

    pub fn stop(&mut self) {
        if let Some(renderer) = &mut self.renderer {
            renderer.stop();
        }
    }
}

impl Component for VizPanel {
    fn id(&self) -> ComponentId {
        ComponentId::Visualizer
    }

    fn handle_key(&mut self, _key: KeyEvent, _state: &AppState) -> Vec<Action> {
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, _state: &AppState) {
        let block = pane_chrome("visualizer", None, focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        // Visibility gate: skip the frame entirely, keep all state.
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let renderer = match &mut self.renderer {
            Some(r) if r.is_active() => r,
            _ => {
                frame.render_widget(
                    Paragraph::new(Span::styled("  tune a station", style_muted())),
                    inner,
                );
                return;
            }
        };

        self.tap.time_domain(&mut self.samples);
        let segments = renderer.process(&self.samples);

        let datasets: Vec<Dataset> = segments
            .iter()
            .map(|seg| {
                Dataset::default()
                    .marker(Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(Style::default().fg(seg.color))
                    .data(&seg.points)
            })
            .collect();

        let chart = Chart::new(datasets)
            .block(Block::default().style(Style::default().bg(C_BG)))
            .x_axis(Axis::default().bounds([0.0, TIME_DOMAIN_BINS as f64]))
            .y_axis(Axis::default().bounds([-Y_SCALE, Y_SCALE]));

        frame.render_widget(chart, inner);
    }
}
