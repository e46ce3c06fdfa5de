//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const APP_NAME: &str = "gavel";
const CONFIG_FILE: &str = "config.ron";

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Master directory settings.
    pub master: MasterConfig,
    /// Client identity and presentation settings.
    pub client: ClientConfig,
    /// Asset-manifest loading settings.
    pub loading: LoadingConfig,
    /// Socket settings shared by both connections.
    pub network: NetworkConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Master directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MasterConfig {
    /// SRV record naming the master servers.
    pub srv_name: String,
    /// Per-candidate connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Fixed `host:port` candidates. When non-empty, SRV discovery is skipped.
    pub endpoints: Vec<String>,
}

/// Client identity configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base window title; the server name is appended once joined.
    pub window_title: String,
    /// Hardware identifier override. Derived from the machine when unset.
    pub hdid: Option<String>,
}

/// How music items count toward the fast-loading progress bar.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum MusicProgress {
    /// Music batches report characters plus evidence only, as legacy
    /// clients do. The bar holds steady while music loads.
    #[default]
    Legacy,
    /// Music batches count loaded tracks too.
    Full,
}

/// Manifest loading configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoadingConfig {
    /// Progress accounting for fast-loading music batches.
    pub music_progress: MusicProgress,
}

/// Socket configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Disable Nagle's algorithm.
    pub tcp_nodelay: bool,
    /// Enable TCP keepalive.
    pub keepalive: bool,
    /// Seconds idle before the first keepalive probe.
    pub keepalive_idle_secs: u64,
    /// Seconds between keepalive probes.
    pub keepalive_interval_secs: u64,
    /// Game-server connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "gavel_session=trace").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            srv_name: "_aoms._tcp.aceattorneyonline.com".to_string(),
            connect_timeout_ms: 5000,
            endpoints: Vec::new(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            window_title: "Attorney Online 2".to_string(),
            hdid: None,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            tcp_nodelay: true,
            keepalive: true,
            keepalive_idle_secs: 60,
            keepalive_interval_secs: 10,
            connect_timeout_ms: 10_000,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Platform configuration directory for the client.
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join(APP_NAME))
}

// --- Load / Save ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("_aoms._tcp.aceattorneyonline.com"));
        assert!(ron_str.contains("connect_timeout_ms: 5000"));
        assert!(ron_str.contains("music_progress: Legacy"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.client.hdid = Some("abc".to_string());
        config.loading.music_progress = MusicProgress::Full;
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let config: Config = ron::from_str("(master: (), debug: ())").unwrap();
        assert_eq!(config.loading, LoadingConfig::default());
        assert_eq!(config.client.window_title, "Attorney Online 2");
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.master.endpoints = vec!["127.0.0.1:27016".to_string()];
        config.debug.log_level = "debug".to_string();

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }
}
