//! Station catalog — a static JSON document read (or fetched) once at startup.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::config::Config;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo: String,
    /// Audio stream URL.
    pub stream: String,
    /// Now-playing metadata endpoint.
    pub api: String,
    /// Track-history endpoint.
    pub history: String,
    /// Visualizer/accent color: one hex string or an array of hex strings.
    #[serde(default)]
    pub color: StationColor,
    #[serde(default)]
    pub color_light: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// A station's color field accepts either `"#RRGGBB"` or `["#..","#..","#.."]`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(untagged)]
pub enum StationColor {
    #[default]
    Unset,
    Single(String),
    Many(Vec<String>),
}

fn default_active() -> bool {
    true
}

pub fn parse_catalog_from_str(content: &str) -> anyhow::Result<Vec<Station>> {
    let stations: Vec<Station> = serde_json::from_str(content)?;
    Ok(stations.into_iter().filter(|s| s.active).collect())
}

pub fn load_catalog_from_file(path: &Path) -> anyhow::Result<Vec<Station>> {
    let content = std::fs::read_to_string(path)?;
    parse_catalog_from_str(&content)
}

/// Resolve the catalog: configured file path, then `stations.json` in the
/// working directory, then the configured URL. Fetched at most once.
pub async fn load_catalog(config: &Config) -> anyhow::Result<Vec<Station>> {
    let catalog_path = &config.stations.catalog_path;
    if catalog_path.exists() {
        match load_catalog_from_file(catalog_path) {
            Ok(s) => {
                info!("Loaded {} stations from {}", s.len(), catalog_path.display());
                return Ok(s);
            }
            Err(e) => warn!("Failed to parse catalog {}: {}", catalog_path.display(), e),
        }
    }

    let local = Path::new("stations.json");
    if local.exists() {
        match load_catalog_from_file(local) {
            Ok(s) => {
                info!("Loaded {} stations from local stations.json", s.len());
                return Ok(s);
            }
            Err(e) => warn!("Failed to parse local stations.json: {}", e),
        }
    }

    let url = &config.stations.catalog_url;
    if !url.is_empty() {
        match fetch_catalog_url(url).await {
            Ok(s) => {
                info!("Loaded {} stations from URL", s.len());
                return Ok(s);
            }
            Err(e) => warn!("Failed to fetch catalog from {}: {}", url, e),
        }
    }

    info!("No station catalog available, starting with empty list");
    Ok(Vec::new())
}

async fn fetch_catalog_url(url: &str) -> anyhow::Result<Vec<Station>> {
    let response = reqwest::get(url).await?;
    if !response.status().is_success() {
        anyhow::bail!("HTTP {}", response.status());
    }
    let text = response.text().await?;
    parse_catalog_from_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r##"[
        {
            "id": "andina",
            "name": "Radio Andina",
            "logo": "https://radio.example/andina.webp",
            "stream": "https://radio.example/andina/stream",
            "api": "https://radio.example/api/nowplaying/andina",
            "history": "https://radio.example/api/history/andina",
            "color": "#1E448E",
            "color_light": "#7FA3E0"
        },
        {
            "id": "pacifico",
            "name": "Onda Pacífico",
            "stream": "https://radio.example/pacifico/stream",
            "api": "https://radio.example/api/nowplaying/pacifico",
            "history": "https://radio.example/api/history/pacifico",
            "color": ["#F6D53F", "#002C77", "#CA0020"]
        },
        {
            "id": "retired",
            "name": "Old Signal",
            "stream": "https://radio.example/old/stream",
            "api": "https://radio.example/api/nowplaying/old",
            "history": "https://radio.example/api/history/old",
            "active": false
        }
    ]"##;

    #[test]
    fn test_parse_catalog_filters_inactive() {
        let stations = parse_catalog_from_str(CATALOG).unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].id, "andina");
        assert!(stations.iter().all(|s| s.active));
    }

    #[test]
    fn test_color_variants() {
        let stations = parse_catalog_from_str(CATALOG).unwrap();
        assert_eq!(
            stations[0].color,
            StationColor::Single("#1E448E".to_string())
        );
        match &stations[1].color {
            StationColor::Many(v) => assert_eq!(v.len(), 3),
            other => panic!("expected color array, got {:?}", other),
        }
        assert!(stations[1].color_light.is_none());
    }

    #[test]
    fn test_missing_color_defaults_unset() {
        let stations = parse_catalog_from_str(
            r#"[{"id":"x","name":"X","stream":"s","api":"a","history":"h"}]"#,
        )
        .unwrap();
        assert_eq!(stations[0].color, StationColor::Unset);
        assert!(stations[0].logo.is_empty());
    }
}
