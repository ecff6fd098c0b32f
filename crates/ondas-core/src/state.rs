//! Session state: the live snapshot shared with the UI and the small
//! persisted part (last station, volume) restored at startup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::stations::Station;

/// Persisted across runs under the platform data dir.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSession {
    pub last_station_id: Option<String>,
    pub volume: f32,
}

impl Default for PersistedSession {
    fn default() -> Self {
        Self {
            last_station_id: None,
            volume: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    /// Stream loading/buffering after a tune command.
    Connecting,
    Playing,
    Paused,
    Error,
}

/// Full live session snapshot. `rev` increments on every mutation so
/// consumers can detect missed updates.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub rev: u64,
    pub stations: Vec<Station>,
    pub current_station: Option<usize>,
    pub volume: f32,
    pub playback: PlaybackStatus,
    /// Set after a playback-start rejection: the next user interaction
    /// should retry starting the stream.
    pub awaiting_interaction: bool,
}

impl SessionState {
    pub fn current(&self) -> Option<&Station> {
        self.current_station.and_then(|i| self.stations.get(i))
    }
}

/// Single writer (the player core), many readers. Mutations that matter
/// across runs are saved to disk as `PersistedSession`.
pub struct SessionStore {
    state: Arc<RwLock<SessionState>>,
    state_file: PathBuf,
}

impl SessionStore {
    pub fn new(state_file: PathBuf, stations: Vec<Station>) -> Self {
        let persisted = Self::load_persisted(&state_file);
        let current_station = persisted
            .last_station_id
            .as_deref()
            .and_then(|id| stations.iter().position(|s| s.id == id));

        let state = SessionState {
            rev: 1,
            stations,
            current_station,
            volume: persisted.volume.clamp(0.0, 1.0),
            playback: PlaybackStatus::Idle,
            awaiting_interaction: false,
        };

        Self {
            state: Arc::new(RwLock::new(state)),
            state_file,
        }
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn set_tuning(&self, idx: usize) -> anyhow::Result<()> {
        {
            let mut state = self.state.write().await;
            state.current_station = Some(idx);
            state.playback = PlaybackStatus::Connecting;
            state.awaiting_interaction = false;
            state.rev += 1;
        }
        self.save().await
    }

    pub async fn set_playback(&self, status: PlaybackStatus) {
        let mut state = self.state.write().await;
        state.playback = status;
        state.rev += 1;
    }

    pub async fn set_awaiting_interaction(&self, pending: bool) {
        let mut state = self.state.write().await;
        state.awaiting_interaction = pending;
        state.rev += 1;
    }

    pub async fn set_stopped(&self) {
        let mut state = self.state.write().await;
        state.playback = PlaybackStatus::Idle;
        state.awaiting_interaction = false;
        state.rev += 1;
    }

    pub async fn set_volume(&self, volume: f32) -> anyhow::Result<()> {
        {
            let mut state = self.state.write().await;
            state.volume = volume.clamp(0.0, 1.0);
            state.rev += 1;
        }
        self.save().await
    }

    async fn save(&self) -> anyhow::Result<()> {
        let persisted = {
            let state = self.state.read().await;
            PersistedSession {
                last_station_id: state.current().map(|s| s.id.clone()),
                volume: state.volume,
            }
        };

        if let Some(parent) = self.state_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&persisted)?;
        tokio::fs::write(&self.state_file, json).await?;
        Ok(())
    }

    fn load_persisted(state_file: &PathBuf) -> PersistedSession {
        if let Ok(content) = std::fs::read_to_string(state_file) {
            if let Ok(persisted) = serde_json::from_str::<PersistedSession>(&content) {
                return persisted;
            }
        }
        PersistedSession::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stations::parse_catalog_from_str;

    fn two_stations() -> Vec<Station> {
        parse_catalog_from_str(
            r#"[
                {"id":"a","name":"A","stream":"s","api":"x","history":"h"},
                {"id":"b","name":"B","stream":"s","api":"x","history":"h"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_persisted_roundtrip() {
        let p = PersistedSession {
            last_station_id: Some("andina".to_string()),
            volume: 0.8,
        };
        let json = serde_json::to_string(&p).unwrap();
        let back: PersistedSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back.last_station_id.as_deref(), Some("andina"));
        assert!((back.volume - 0.8).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_restore_unknown_station_id_falls_back_to_none() {
        let dir = std::env::temp_dir().join(format!("ondas-state-{}", std::process::id()));
        let file = dir.join("session.json");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            &file,
            r#"{"last_station_id":"missing","volume":0.3}"#,
        )
        .unwrap();

        let store = SessionStore::new(file.clone(), two_stations());
        let snap = store.snapshot().await;
        assert_eq!(snap.current_station, None);
        assert!((snap.volume - 0.3).abs() < f32::EPSILON);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_tune_persists_station_id() {
        let dir = std::env::temp_dir().join(format!("ondas-state-tune-{}", std::process::id()));
        let file = dir.join("session.json");

        let store = SessionStore::new(file.clone(), two_stations());
        store.set_tuning(1).await.unwrap();

        let content = std::fs::read_to_string(&file).unwrap();
        let persisted: PersistedSession = serde_json::from_str(&content).unwrap();
        assert_eq!(persisted.last_station_id.as_deref(), Some("b"));

        let snap = store.snapshot().await;
        assert_eq!(snap.playback, PlaybackStatus::Connecting);
        assert_eq!(snap.current().unwrap().id, "b");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
