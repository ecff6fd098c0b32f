// Per-frame waveband processing: byte time-domain samples in, three smoothed
// polylines out. One renderer instance per tuned station; its smoothing
// buffers persist across frames and die with the instance.

use ratatui::style::Color;

use super::{BandPalette, BAND_COUNT};

/// Exponential smoothing factor toward the per-sample target.
pub const SMOOTHING: f32 = 0.10;
/// Base amplitude multiplier (fraction of the vertical scale).
pub const BASE_AMP: f32 = 1.4;
/// The middle band runs hotter than the outer two.
pub const MID_BOOST: f32 = 1.6;
/// Outer bands sample every 4th point for a sparser visual density.
pub const OUTER_STEP: usize = 4;

/// Vertical offset of the outer band baselines from the middle band.
const BAND_OFFSET: f32 = 0.55;
/// Chart Y range is [-Y_SCALE, Y_SCALE]; excursions are clamped to it the
/// way a canvas stroke is clipped at the edges.
pub const Y_SCALE: f64 = 1.6;

/// Fraction of the line faded at the leading edge (middle band / outers).
const FADE_IN_MID: f64 = 0.10;
const FADE_IN_OUTER: f64 = 0.25;
/// Fraction where the trailing fade begins.
const FADE_OUT: f64 = 0.90;

/// One stroke of one band: a polyline plus the color to draw it in. Each
/// band yields a faded lead-in, a full-color body, and a faded tail — the
/// terminal adaptation of the horizontal gradient.
pub struct BandSegment {
    pub points: Vec<(f64, f64)>,
    pub color: Color,
}

pub struct WavebandRenderer {
    palette: BandPalette,
    smoothed: [Vec<f32>; BAND_COUNT],
    /// Explicit stop flag, checked by the render loop each frame. A station
    /// switch stops the old instance before starting the next.
    active: bool,
}

impl WavebandRenderer {
    pub fn new(palette: BandPalette) -> Self {
        Self {
            palette,
            smoothed: Default::default(),
            active: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Resize the smoothing buffers only when the analysis buffer length
    /// actually changed; a resize restarts the bands from silence.
    fn ensure_len(&mut self, len: usize) {
        if self.smoothed[0].len() != len {
            for band in &mut self.smoothed {
                band.clear();
                band.resize(len, 0.0);
            }
        }
    }

    /// Advance the smoothing state by one frame and emit the band strokes.
    /// X is the sample index; Y is baseline + smoothed amplitude, clamped to
    /// the chart range.
    pub fn process(&mut self, samples: &[u8]) -> Vec<BandSegment> {
        self.ensure_len(samples.len());
        let mut out = Vec::with_capacity(BAND_COUNT * 3);

        for band in 0..BAND_COUNT {
            let step = if band == 1 { 1 } else { OUTER_STEP };
            let amp = if band == 1 { BASE_AMP * MID_BOOST } else { BASE_AMP };
            let baseline = (1 - band as i32) as f32 * BAND_OFFSET;

            let mut points = Vec::with_capacity(samples.len() / step + 1);
            let mut i = 0;
            while i < samples.len() {
                let v = (samples[i] as f32 - 128.0) / 128.0;
                let target = v * amp;
                let s = &mut self.smoothed[band][i];
                *s += (target - *s) * SMOOTHING;
                let y = (f64::from(baseline) + f64::from(*s)).clamp(-Y_SCALE, Y_SCALE);
                points.push((i as f64, y));
                i += step;
            }

            let fade_in = if band == 1 { FADE_IN_MID } else { FADE_IN_OUTER };
            out.extend(split_gradient(
                points,
                fade_in,
                self.palette.band_color(band),
                self.palette.edge_color(band),
            ));
        }
        out
    }

    #[cfg(test)]
    fn band_buffer(&self, band: usize) -> &[f32] {
        &self.smoothed[band]
    }
}

/// Split a polyline into edge/body/edge strokes. Segments share their
/// boundary point so the line stays visually continuous.
fn split_gradient(
    points: Vec<(f64, f64)>,
    fade_in: f64,
    body: Color,
    edge: Color,
) -> Vec<BandSegment> {
    let n = points.len();
    if n < 4 {
        return vec![BandSegment { points, color: body }];
    }
    let lead = ((n as f64 * fade_in) as usize).max(1);
    let tail = ((n as f64 * FADE_OUT) as usize).min(n - 1);

    vec![
        BandSegment {
            points: points[..=lead].to_vec(),
            color: edge,
        },
        BandSegment {
            points: points[lead..=tail].to_vec(),
            color: body,
        },
        BandSegment {
            points: points[tail..].to_vec(),
            color: edge,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ondas_core::stations::StationColor;

    fn renderer() -> WavebandRenderer {
        let defaults = [
            "#F6D53F".to_string(),
            "#002C77".to_string(),
            "#CA0020".to_string(),
        ];
        WavebandRenderer::new(BandPalette::resolve(
            &StationColor::Single("#1E448E".to_string()),
            &defaults,
        ))
    }

    #[test]
    fn test_smoothing_converges_monotonically() {
        let mut r = renderer();
        // Constant loud input: every sample at 255.
        let samples = [255u8; 64];
        let target = (255.0 - 128.0) / 128.0 * BASE_AMP * MID_BOOST;

        let mut prev = 0.0f32;
        for _ in 0..200 {
            r.process(&samples);
            let s = r.band_buffer(1)[0];
            assert!(s >= prev, "smoothed value regressed: {s} < {prev}");
            assert!(s <= target + 1e-4, "smoothed value overshot: {s} > {target}");
            prev = s;
        }
        // After many frames the buffer has effectively reached the target.
        assert!((prev - target).abs() < 0.01);
    }

    #[test]
    fn test_amplitude_bounded_by_band_multiplier() {
        let mut r = renderer();
        let samples = [0u8; 64]; // maximum negative excursion
        for _ in 0..500 {
            r.process(&samples);
        }
        for (band, bound) in [(0, BASE_AMP), (1, BASE_AMP * MID_BOOST), (2, BASE_AMP)] {
            for &s in r.band_buffer(band) {
                assert!(s.abs() <= bound + 1e-4);
            }
        }
    }

    #[test]
    fn test_silence_produces_flat_baselines() {
        let mut r = renderer();
        let segments = r.process(&[128u8; 32]);
        for seg in &segments {
            for &(_, y) in &seg.points {
                assert!(
                    (y.abs() - f64::from(BAND_OFFSET)).abs() < 1e-6 || y.abs() < 1e-6,
                    "unexpected y for silence: {y}"
                );
            }
        }
    }

    #[test]
    fn test_outer_bands_subsample_every_fourth_point() {
        let mut r = renderer();
        let segments = r.process(&[128u8; 64]);
        // 3 bands × 3 gradient segments each.
        assert_eq!(segments.len(), 9);
        let band0_points: usize = segments[..3].iter().map(|s| s.points.len()).sum();
        let band1_points: usize = segments[3..6].iter().map(|s| s.points.len()).sum();
        // Shared boundary points are counted twice per band (two seams).
        assert_eq!(band0_points, 64 / OUTER_STEP + 2);
        assert_eq!(band1_points, 64 + 2);
    }

    #[test]
    fn test_buffers_resize_only_on_length_change() {
        let mut r = renderer();
        r.process(&[255u8; 32]);
        let warmed = r.band_buffer(1)[0];
        assert!(warmed > 0.0);

        // Same length: state persists across frames.
        r.process(&[255u8; 32]);
        assert!(r.band_buffer(1)[0] > warmed);

        // New length: buffers restart from silence.
        r.process(&[128u8; 64]);
        assert_eq!(r.band_buffer(1).len(), 64);
        assert_eq!(r.band_buffer(1)[0], 0.0);
    }

    #[test]
    fn test_stop_flag() {
        let mut r = renderer();
        assert!(r.is_active());
        r.stop();
        assert!(!r.is_active());
    }
}
