//! Playback engine — an mpv child process driven over its JSON IPC socket.
//!
//! The process is the "media element": it is spawned at most once per
//! session and reused across station switches; tuning only swaps the loaded
//! URL. `PlaybackEngine::ensure_handle` is the explicit constructed-once
//! factory (it respawns only when the process has actually died).
//!
//! Property observation replaces polling: we subscribe to `core-idle` and
//! `pause` once per connection, and mpv pushes a property-change line
//! whenever either flips. The reader task translates those into
//! `PlaybackSignal`s for the player core.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

use ondas_core::platform;

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

const OBS_CORE_IDLE: u64 = 1;
const OBS_PAUSE: u64 = 2;

/// What the engine reports back to the player core.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackSignal {
    /// Audio is flowing (`core-idle` went false) or stalled (true → false).
    Rolling(bool),
    /// The pause property flipped.
    Paused(bool),
    /// The IPC connection closed (process died or quit).
    Closed,
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<anyhow::Result<Value>>>>>;

/// Cheaply cloneable handle for sending IPC commands.
#[derive(Clone)]
pub struct EngineHandle {
    writer: Arc<Mutex<Box<dyn tokio::io::AsyncWrite + Send + Unpin>>>,
    pending: PendingMap,
}

impl EngineHandle {
    async fn send(&self, command: Value) -> anyhow::Result<Value> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let mut line = serde_json::to_string(&json!({
            "command": command,
            "request_id": req_id,
        }))?;
        line.push('\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.lock().await.insert(req_id, reply_tx);

        {
            let mut writer = self.writer.lock().await;
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                self.pending.lock().await.remove(&req_id);
                anyhow::bail!("IPC write failed: {e}");
            }
        }

        match tokio::time::timeout(std::time::Duration::from_secs(5), reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => anyhow::bail!("IPC reply channel dropped (req={req_id})"),
            Err(_) => {
                self.pending.lock().await.remove(&req_id);
                anyhow::bail!("IPC timeout (req={req_id})")
            }
        }
    }

    /// Load a stream URL into the running process and unpause.
    pub async fn load(&self, url: &str, volume: f32) -> anyhow::Result<()> {
        self.send(json!(["loadfile", url, "replace"])).await?;
        self.send(json!(["set_property", "volume", (volume * 100.0).clamp(0.0, 100.0)]))
            .await?;
        self.send(json!(["set_property", "pause", false])).await?;
        Ok(())
    }

    pub async fn set_pause(&self, pause: bool) -> anyhow::Result<()> {
        self.send(json!(["set_property", "pause", pause])).await?;
        Ok(())
    }

    pub async fn set_volume(&self, volume: f32) -> anyhow::Result<()> {
        self.send(json!(["set_property", "volume", (volume * 100.0).clamp(0.0, 100.0)]))
            .await?;
        Ok(())
    }

    /// Stop playback but keep the idle process alive for the next tune.
    pub async fn stop(&self) -> anyhow::Result<()> {
        self.send(json!(["stop"])).await?;
        Ok(())
    }

    async fn observe_properties(&self) -> anyhow::Result<()> {
        self.send(json!(["observe_property", OBS_CORE_IDLE, "core-idle"]))
            .await?;
        self.send(json!(["observe_property", OBS_PAUSE, "pause"]))
            .await?;
        Ok(())
    }
}

/// Owns the child process. Single instance, held by the player core.
pub struct PlaybackEngine {
    socket_name: String,
    process: Option<tokio::process::Child>,
    handle: Option<EngineHandle>,
    signal_tx: mpsc::Sender<PlaybackSignal>,
    pub last_volume: f32,
}

impl PlaybackEngine {
    pub fn new(signal_tx: mpsc::Sender<PlaybackSignal>) -> Self {
        Self {
            socket_name: platform::player_socket_name(),
            process: None,
            handle: None,
            signal_tx,
            last_volume: 0.5,
        }
    }

    /// The existing handle, without constructing anything.
    pub fn handle(&self) -> Option<EngineHandle> {
        self.handle.clone()
    }

    /// The constructed-once factory: returns the existing handle while the
    /// process is alive, spawns and connects exactly once otherwise.
    pub async fn ensure_handle(&mut self) -> anyhow::Result<EngineHandle> {
        if self.process_alive() {
            if let Some(handle) = &self.handle {
                return Ok(handle.clone());
            }
        }
        let handle = self.spawn_and_connect().await?;
        self.handle = Some(handle.clone());
        Ok(handle)
    }

    fn process_alive(&mut self) -> bool {
        match self.process.as_mut().map(|child| child.try_wait()) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                warn!("playback process exited: {:?}", status.code());
                false
            }
            Some(Err(e)) => {
                warn!("playback liveness check failed: {}", e);
                false
            }
            None => false,
        }
    }

    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.send(json!(["quit"])).await;
        }
        if let Some(mut child) = self.process.take() {
            let _ = child.kill().await;
        }
    }

    async fn spawn_and_connect(&mut self) -> anyhow::Result<EngineHandle> {
        if let Some(mut stale) = self.process.take() {
            let _ = stale.kill().await;
        }
        #[cfg(unix)]
        {
            // A leftover socket from a previous run would block the bind.
            let _ = tokio::fs::remove_file(&self.socket_name).await;
        }

        let binary = platform::find_mpv_binary();
        let volume_arg = format!(
            "--volume={}",
            (self.last_volume * 100.0).clamp(0.0, 100.0).round() as i64
        );

        info!("playback: spawning {}", binary.display());
        let child = tokio::process::Command::new(&binary)
            .arg("--no-video")
            .arg("--idle=yes")
            .arg(platform::player_socket_arg())
            .arg("--quiet")
            .arg(volume_arg)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()?;
        self.process = Some(child);

        let handle = self.connect().await?;
        handle.observe_properties().await?;
        Ok(handle)
    }

    #[cfg(unix)]
    async fn connect(&self) -> anyhow::Result<EngineHandle> {
        let socket_path = std::path::PathBuf::from(&self.socket_name);
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            if socket_path.exists() {
                break;
            }
        }
        if !socket_path.exists() {
            anyhow::bail!("playback IPC socket did not appear");
        }

        let stream = tokio::net::UnixStream::connect(&socket_path).await?;
        info!("playback: connected to IPC socket");
        let (read_half, write_half) = stream.into_split();
        Ok(self.start_reader(read_half, Box::new(write_half)))
    }

    #[cfg(windows)]
    async fn connect(&self) -> anyhow::Result<EngineHandle> {
        use tokio::net::windows::named_pipe::ClientOptions;

        let pipe_path = format!(r"\\.\pipe\{}", self.socket_name);
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            if let Ok(pipe) = ClientOptions::new().open(&pipe_path) {
                info!("playback: connected to named pipe");
                let (read_half, write_half) = tokio::io::split(pipe);
                return Ok(self.start_reader(read_half, Box::new(write_half)));
            }
        }
        anyhow::bail!("playback named pipe did not appear")
    }

    fn start_reader<R>(
        &self,
        read_half: R,
        write_half: Box<dyn tokio::io::AsyncWrite + Send + Unpin>,
    ) -> EngineHandle
    where
        R: tokio::io::AsyncRead + Send + Unpin + 'static,
    {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let handle = EngineHandle {
            writer: Arc::new(Mutex::new(write_half)),
            pending: Arc::clone(&pending),
        };
        tokio::spawn(reader_task(
            BufReader::new(read_half),
            pending,
            self.signal_tx.clone(),
        ));
        handle
    }
}

async fn reader_task<R>(
    mut reader: BufReader<R>,
    pending: PendingMap,
    signal_tx: mpsc::Sender<PlaybackSignal>,
) where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let value: Value = match serde_json::from_str(trimmed) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("playback reader: bad json '{}': {}", trimmed, e);
                        continue;
                    }
                };

                if let Some(req_id) = value.get("request_id").and_then(Value::as_u64) {
                    let reply = if value["error"].as_str() == Some("success") {
                        Ok(value.clone())
                    } else {
                        let err = value["error"].as_str().unwrap_or("unknown").to_string();
                        Err(anyhow::anyhow!("playback IPC error: {err}"))
                    };
                    if let Some(tx) = pending.lock().await.remove(&req_id) {
                        let _ = tx.send(reply);
                    }
                    continue;
                }

                if let Some(signal) = decode_property_change(&value) {
                    let _ = signal_tx.send(signal).await;
                }
            }
            Err(e) => {
                warn!("playback reader: {}", e);
                break;
            }
        }
    }

    for (_, tx) in pending.lock().await.drain() {
        let _ = tx.send(Err(anyhow::anyhow!("playback IPC connection closed")));
    }
    let _ = signal_tx.send(PlaybackSignal::Closed).await;
}

fn decode_property_change(value: &Value) -> Option<PlaybackSignal> {
    if value.get("event")?.as_str()? != "property-change" {
        return None;
    }
    let id = value.get("id")?.as_u64()?;
    let data = value.get("data").and_then(Value::as_bool);
    match id {
        // core-idle=false means audio is flowing.
        OBS_CORE_IDLE => Some(PlaybackSignal::Rolling(!data.unwrap_or(true))),
        OBS_PAUSE => Some(PlaybackSignal::Paused(data.unwrap_or(false))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_core_idle_change() {
        let value = json!({"event": "property-change", "id": OBS_CORE_IDLE, "data": false});
        assert_eq!(
            decode_property_change(&value),
            Some(PlaybackSignal::Rolling(true))
        );

        let value = json!({"event": "property-change", "id": OBS_CORE_IDLE, "data": true});
        assert_eq!(
            decode_property_change(&value),
            Some(PlaybackSignal::Rolling(false))
        );
    }

    #[test]
    fn test_decode_pause_change() {
        let value = json!({"event": "property-change", "id": OBS_PAUSE, "data": true});
        assert_eq!(
            decode_property_change(&value),
            Some(PlaybackSignal::Paused(true))
        );
    }

    #[test]
    fn test_other_events_are_ignored() {
        assert!(decode_property_change(&json!({"event": "file-loaded"})).is_none());
        assert!(decode_property_change(&json!({"request_id": 4, "error": "success"})).is_none());
    }
}
