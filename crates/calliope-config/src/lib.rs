// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::Path;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding library.db and the artwork tree.
    pub data_dir: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    pub host: String,
    pub port: u16,
    /// Filesystem root the daemon serves its library from; unprefixed URIs
    /// are resolved against this when classifying sources.
    pub music_root: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6600,
            music_root: "/var/lib/mpd/music".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Top-level URI segments the builder enumerates.
    pub base_paths: Vec<String>,
    /// Mount listing consulted by the source classifier.
    pub mounts_path: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            base_paths: vec![
                "INTERNAL".to_string(),
                "USB".to_string(),
                "NAS".to_string(),
            ],
            mounts_path: "/proc/self/mounts".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanartTvConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl Default for FanartTvConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeezerConfig {
    pub base_url: Option<String>,
}

impl Default for DeezerConfig {
    fn default() -> Self {
        Self { base_url: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Seconds between worker ticks.
    pub tick_interval_secs: u64,
    /// Jobs drained per tick.
    pub batch_size: u32,
    pub musicbrainz_base_url: Option<String>,
    pub coverart_base_url: Option<String>,
    pub fanarttv: FanartTvConfig,
    pub deezer: DeezerConfig,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            batch_size: 10,
            musicbrainz_base_url: None,
            coverart_base_url: None,
            fanarttv: FanartTvConfig::default(),
            deezer: DeezerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub daemon: DaemonConfig,
    pub library: LibraryConfig,
    pub enrichment: EnrichmentConfig,
    pub telemetry: TelemetryConfig,
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: CALLIOPE_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("CALLIOPE_").split("__"));

    let config: AppConfig = figment.extract()?;
    info!(target: "config", "configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = load(None).expect("defaults load");
        assert_eq!(config.daemon.port, 6600);
        assert_eq!(config.library.base_paths, vec!["INTERNAL", "USB", "NAS"]);
        assert_eq!(config.enrichment.tick_interval_secs, 60);
        assert_eq!(config.enrichment.batch_size, 10);
        assert!(config.enrichment.fanarttv.api_key.is_none());
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[daemon]\nhost = \"10.0.0.5\"\nport = 6601\nmusic_root = \"/srv/music\"\n\n[enrichment]\nbatch_size = 3\ntick_interval_secs = 5\n"
        )
        .expect("write config");

        let config = load(Some(file.path())).expect("config load");
        assert_eq!(config.daemon.host, "10.0.0.5");
        assert_eq!(config.daemon.port, 6601);
        assert_eq!(config.enrichment.batch_size, 3);
        // untouched sections keep their defaults
        assert_eq!(config.database.data_dir, "data");
    }
}
