use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub stations: StationsConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    /// Static bearer token sent with metadata/history requests. Optional —
    /// public endpoints work without one.
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Seconds between now-playing polls.
    #[serde(default = "default_now_playing_interval")]
    pub now_playing_interval_secs: u64,
    /// Seconds between history polls.
    #[serde(default = "default_history_interval")]
    pub history_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum entries kept in the history list.
    #[serde(default = "default_history_max")]
    pub max_items: usize,
    /// Feed entries whose title or artist contains one of these substrings
    /// (case-insensitive) are dropped. Used to keep a station's own name out
    /// of its history feed.
    #[serde(default)]
    pub exclude_terms: Vec<String>,
}

/// Station catalog source — a local JSON file or an URL fetched once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationsConfig {
    /// Path to a local catalog file (highest priority).
    /// Defaults to `$XDG_CONFIG_HOME/ondas/stations.json`.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,
    /// URL for the catalog (fallback when no local file is found).
    #[serde(default)]
    pub catalog_url: String,
    /// Station id selected when no previous session exists.
    #[serde(default)]
    pub default_station: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_volume")]
    pub default_volume: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Terminal-title template. `////` is replaced with `ARTIST - "TRACK"`,
    /// `----` with the station name.
    #[serde(default = "default_title_template")]
    pub title_template: String,
    /// Share-message template. `ARTIST`, `TRACK` and `----` are replaced.
    #[serde(default = "default_share_template")]
    pub share_template: String,
    /// Default visualizer color triple, used when a station has no usable
    /// color of its own.
    #[serde(default = "default_viz_colors")]
    pub viz_colors: [String; 3],
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            now_playing_interval_secs: default_now_playing_interval(),
            history_interval_secs: default_history_interval(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_items: default_history_max(),
            exclude_terms: Vec::new(),
        }
    }
}

impl Default for StationsConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            catalog_url: String::new(),
            default_station: String::new(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            title_template: default_title_template(),
            share_template: default_share_template(),
            viz_colors: default_viz_colors(),
        }
    }
}

fn default_now_playing_interval() -> u64 {
    40
}

fn default_history_interval() -> u64 {
    160
}

fn default_history_max() -> usize {
    6
}

fn default_volume() -> f32 {
    0.5
}

fn default_catalog_path() -> PathBuf {
    platform::config_dir().join("stations.json")
}

fn default_title_template() -> String {
    "♪ //// on ----".to_string()
}

fn default_share_template() -> String {
    "Listening to ARTIST — \"TRACK\" on ----".to_string()
}

fn default_viz_colors() -> [String; 3] {
    [
        "#F6D53F".to_string(),
        "#002C77".to_string(),
        "#CA0020".to_string(),
    ]
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.polling.now_playing_interval_secs, 40);
        assert_eq!(config.polling.history_interval_secs, 160);
        assert_eq!(config.history.max_items, 6);
        assert!(config.history.exclude_terms.is_empty());
        assert!(config.api.token.is_none());
        assert!(config.stations.catalog_path.ends_with("ondas/stations.json"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [history]
            max_items = 10
            exclude_terms = ["ondas fm"]
            "#,
        )
        .unwrap();
        assert_eq!(config.history.max_items, 10);
        assert_eq!(config.history.exclude_terms, vec!["ondas fm".to_string()]);
        assert_eq!(config.polling.now_playing_interval_secs, 40);
        assert_eq!(config.ui.viz_colors[0], "#F6D53F");
    }
}
