//! Authenticated metadata API client and payload decoding.

use serde::Deserialize;
use std::time::Duration;

use crate::track::Track;

/// Failure taxonomy for a poll cycle. Every variant is non-fatal: the poller
/// logs it and tries again on the next interval.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed payload: {0}")]
    Malformed(&'static str),
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(token: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("ondas/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self { http, token })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let mut req = self.http.get(url).header("Accept", "application/json");
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }
        Ok(response.json().await?)
    }

    /// Fetch and decode the now-playing endpoint. `Malformed` when the
    /// expected song object is missing from the envelope.
    pub async fn fetch_now_playing(&self, url: &str) -> Result<Track, ApiError> {
        let envelope: NowPlayingEnvelope = self.get_json(url).await?;
        decode_now_playing(envelope)
    }

    /// Fetch the history feed — a JSON array ordered newest-first. Items
    /// without a song object are dropped rather than failing the cycle.
    pub async fn fetch_history(&self, url: &str) -> Result<Vec<Track>, ApiError> {
        let items: Vec<HistoryFeedItem> = self.get_json(url).await?;
        Ok(items.into_iter().filter_map(decode_feed_item).collect())
    }
}

// ── Payload shapes ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NowPlayingEnvelope {
    pub now_playing: Option<NowPlayingBlock>,
}

#[derive(Debug, Deserialize)]
pub struct NowPlayingBlock {
    pub song: Option<SongData>,
}

#[derive(Debug, Deserialize)]
pub struct SongData {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub art: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryFeedItem {
    pub song: Option<SongData>,
}

pub fn decode_now_playing(envelope: NowPlayingEnvelope) -> Result<Track, ApiError> {
    let song = envelope
        .now_playing
        .and_then(|np| np.song)
        .ok_or(ApiError::Malformed("missing now_playing.song"))?;
    Ok(Track::from_raw(
        song.title.as_deref(),
        song.artist.as_deref(),
        song.art.as_deref(),
    ))
}

fn decode_feed_item(item: HistoryFeedItem) -> Option<Track> {
    let song = item.song?;
    Some(Track::from_raw(
        song.title.as_deref(),
        song.artist.as_deref(),
        song.art.as_deref(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::UNKNOWN;

    #[test]
    fn test_decode_full_envelope() {
        let envelope: NowPlayingEnvelope = serde_json::from_str(
            r#"{"now_playing":{"song":{"title":"Roar","artist":"Selva Eléctrica","art":"https://art.example/roar.jpg"}}}"#,
        )
        .unwrap();
        let track = decode_now_playing(envelope).unwrap();
        assert_eq!(track.title, "Roar");
        assert_eq!(track.artist, "Selva Eléctrica");
        assert_eq!(track.art_url, "https://art.example/roar.jpg");
    }

    #[test]
    fn test_decode_missing_song_is_malformed() {
        let envelope: NowPlayingEnvelope = serde_json::from_str(r#"{"now_playing":{}}"#).unwrap();
        assert!(matches!(
            decode_now_playing(envelope),
            Err(ApiError::Malformed(_))
        ));

        let envelope: NowPlayingEnvelope = serde_json::from_str(r#"{}"#).unwrap();
        assert!(decode_now_playing(envelope).is_err());
    }

    #[test]
    fn test_decode_blank_fields_become_placeholder() {
        let envelope: NowPlayingEnvelope = serde_json::from_str(
            r#"{"now_playing":{"song":{"title":"","artist":null,"art":null}}}"#,
        )
        .unwrap();
        let track = decode_now_playing(envelope).unwrap();
        assert_eq!(track.title, UNKNOWN);
        assert_eq!(track.artist, UNKNOWN);
    }

    #[test]
    fn test_decode_history_feed_drops_songless_items() {
        let items: Vec<HistoryFeedItem> = serde_json::from_str(
            r#"[
                {"song":{"title":"Uno","artist":"A","art":null}},
                {"song":null},
                {"song":{"title":"Dos","artist":"B","art":null}}
            ]"#,
        )
        .unwrap();
        let tracks: Vec<Track> = items.into_iter().filter_map(decode_feed_item).collect();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].title, "Uno");
        assert_eq!(tracks[1].title, "Dos");
    }
}
