//! Analyser tap — the frequency-analysis node of the audio graph.
//!
//! An ffmpeg side-capture decodes the station stream to mono PCM and feeds a
//! rolling byte time-domain buffer (values 0..=255, 128 = silence), which the
//! visualizer samples once per frame. The tap itself is constructed once per
//! session and survives station switches; only the capture task feeding it is
//! retargeted, so switching streams never rebuilds the analysis graph.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use ondas_core::platform;

/// Samples handed to the visualizer per frame (the analysis buffer length).
pub const TIME_DOMAIN_BINS: usize = 1024;

/// Capture sample rate. 11025 Hz mono is plenty for a waveform display and
/// keeps the decode cheap.
const CAPTURE_SAMPLE_RATE: u32 = 11025;

/// Ring capacity: a short tail beyond one analysis buffer absorbs bursty
/// chunk arrival without letting the display lag far behind the stream.
const RING_CAPACITY: usize = TIME_DOMAIN_BINS * 4;

/// Rolling byte time-domain buffer. Readers always get the newest
/// `TIME_DOMAIN_BINS` samples; silence (128) fills any shortfall.
#[derive(Clone, Default)]
pub struct AnalyserTap {
    ring: Arc<Mutex<VecDeque<u8>>>,
}

impl AnalyserTap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the latest samples into `buf`, oldest first, padding the front
    /// with silence when fewer samples are available.
    pub fn time_domain(&self, buf: &mut [u8]) {
        let ring = match self.ring.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let take = buf.len().min(ring.len());
        let pad = buf.len() - take;
        buf[..pad].fill(128);
        for (slot, &sample) in buf[pad..].iter_mut().zip(ring.iter().skip(ring.len() - take)) {
            *slot = sample;
        }
    }

    fn push(&self, samples: &[u8]) {
        let mut ring = match self.ring.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        ring.extend(samples.iter().copied());
        while ring.len() > RING_CAPACITY {
            ring.pop_front();
        }
    }
}

/// The audio graph's capture side: one task per tuned station, all feeding
/// the same tap. Owned by the player core.
pub struct CaptureController {
    tap: AnalyserTap,
    task: Option<tokio::task::AbortHandle>,
}

impl CaptureController {
    pub fn new(tap: AnalyserTap) -> Self {
        Self { tap, task: None }
    }

    /// Point the capture at a new stream URL. The previous capture task is
    /// aborted first; the tap keeps its buffer (the visualizer smooths over
    /// the seam).
    pub fn retarget(&mut self, stream_url: &str) {
        self.stop();
        let url = stream_url.to_string();
        let tap = self.tap.clone();
        info!("[analyser] capture retarget → {}", url);
        let task = tokio::spawn(async move {
            loop {
                if let Err(e) = run_capture(&url, &tap).await {
                    debug!("[analyser] capture exited: {e}");
                }
                tokio::time::sleep(std::time::Duration::from_secs(2)).await;
            }
        });
        self.task = Some(task.abort_handle());
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Decode the stream with ffmpeg (s16le mono) and feed the tap until the
/// stream or the process ends.
async fn run_capture(url: &str, tap: &AnalyserTap) -> anyhow::Result<()> {
    let rate = CAPTURE_SAMPLE_RATE.to_string();
    let mut child = tokio::process::Command::new(platform::find_ffmpeg_binary())
        .args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-nostdin",
            "-fflags",
            "nobuffer",
            "-flags",
            "low_delay",
            "-probesize",
            "64k",
            "-analyzeduration",
            "200000",
            "-i",
            url,
            "-vn",
            "-ac",
            "1",
            "-ar",
            &rate,
            "-f",
            "s16le",
            "pipe:1",
        ])
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow::anyhow!("capture stdout unavailable"))?;

    let mut raw = vec![0u8; 2048];
    let mut converted = Vec::with_capacity(raw.len() / 2);
    loop {
        let n = stdout.read(&mut raw).await?;
        if n == 0 {
            break;
        }
        converted.clear();
        for pair in raw[..n].chunks_exact(2) {
            let sample = i16::from_le_bytes([pair[0], pair[1]]);
            // Map signed 16-bit to the byte time-domain range, 128 = silence.
            converted.push(((sample >> 8) + 128) as u8);
        }
        tap.push(&converted);
    }

    let status = child.wait().await?;
    if !status.success() {
        anyhow::bail!("capture process exited: {}", status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tap_reads_as_silence() {
        let tap = AnalyserTap::new();
        let mut buf = [0u8; 16];
        tap.time_domain(&mut buf);
        assert!(buf.iter().all(|&s| s == 128));
    }

    #[test]
    fn test_partial_fill_pads_front_with_silence() {
        let tap = AnalyserTap::new();
        tap.push(&[200, 210, 220]);
        let mut buf = [0u8; 6];
        tap.time_domain(&mut buf);
        assert_eq!(buf, [128, 128, 128, 200, 210, 220]);
    }

    #[test]
    fn test_reader_gets_newest_samples() {
        let tap = AnalyserTap::new();
        tap.push(&(0..=255).collect::<Vec<u8>>());
        let mut buf = [0u8; 4];
        tap.time_domain(&mut buf);
        assert_eq!(buf, [252, 253, 254, 255]);
    }

    #[test]
    fn test_ring_is_bounded() {
        let tap = AnalyserTap::new();
        for _ in 0..100 {
            tap.push(&[128; 1024]);
        }
        let ring = tap.ring.lock().unwrap();
        assert!(ring.len() <= RING_CAPACITY);
    }
}
