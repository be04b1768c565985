use highlight_sync_engine::{DEFAULT_COLOR, Palette, RemovalPolicy, SyncOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the highlights API, without the `/api/highlights` suffix.
    pub api_base_url: String,
    pub session_id: Option<String>,
    pub default_color: String,
    pub notice_ttl_ms: u64,
    pub request_timeout_ms: u64,
    pub removal_policy: RemovalPolicy,
    /// Extra or overridden colour tags, tag -> CSS colour.
    pub palette: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            session_id: None,
            default_color: DEFAULT_COLOR.to_string(),
            notice_ttl_ms: 3000,
            request_timeout_ms: 10_000,
            removal_policy: RemovalPolicy::default(),
            palette: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the API base URL
        config.api_base_url =
            Self::expand_value(&config.api_base_url).unwrap_or(config.api_base_url);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/highlight-sync");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    pub fn palette(&self) -> Palette {
        Palette::new(self.default_color.clone(), self.palette.clone())
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.notice_ttl_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Coordinator options for one mounted message.
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            session_id: self.session_id.clone(),
            palette: self.palette(),
            removal_policy: self.removal_policy,
            notice_ttl: self.notice_ttl(),
        }
    }

    fn expand_value(value: &str) -> Option<String> {
        match shellexpand::full(value) {
            Ok(expanded) => Some(expanded.into_owned()),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        // Should not contain tilde anymore
        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/highlight-sync/config.toml"));
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.notice_ttl(), Duration::from_secs(3));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.removal_policy, RemovalPolicy::DropIntersecting);
    }

    #[test]
    fn test_full_config_parses() {
        let config_content = r##"
api_base_url = "https://chat.example.com"
session_id = "abc-123"
default_color = "green"
notice_ttl_ms = 1500
removal_policy = "split"

[palette]
orange = "#fed7aa"
"##;

        let config: Config = toml::from_str(config_content).unwrap();

        assert_eq!(config.api_base_url, "https://chat.example.com");
        assert_eq!(config.session_id.as_deref(), Some("abc-123"));
        assert_eq!(config.removal_policy, RemovalPolicy::Split);
        assert_eq!(config.request_timeout_ms, 10_000);

        let palette = config.palette();
        assert_eq!(palette.default_tag(), "green");
        assert_eq!(palette.presentation(Some("orange")), "#fed7aa");
        assert_eq!(palette.presentation(None), "#bbf7d0");
    }

    #[test]
    fn test_sync_options_carry_config() {
        let config = Config {
            session_id: Some("s".to_string()),
            notice_ttl_ms: 500,
            removal_policy: RemovalPolicy::Split,
            ..Config::default()
        };

        let options = config.sync_options();

        assert_eq!(options.session_id.as_deref(), Some("s"));
        assert_eq!(options.notice_ttl, Duration::from_millis(500));
        assert_eq!(options.removal_policy, RemovalPolicy::Split);
    }

    #[test]
    fn test_unknown_removal_policy_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "removal_policy = \"shred\"\n").unwrap();

        let result = Config::load_from_path(&config_file);

        assert!(matches!(result, Err(ConfigError::ConfigParseError { .. })));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let mut palette = BTreeMap::new();
        palette.insert("teal".to_string(), "#99f6e4".to_string());
        let test_config = Config {
            api_base_url: "http://127.0.0.1:9000".to_string(),
            session_id: Some("session".to_string()),
            palette,
            ..Config::default()
        };

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_api_base_url_expands_env_var() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        unsafe {
            env::set_var("HIGHLIGHT_API_HOST", "api.internal.test");
        }
        std::fs::write(
            &config_file,
            "api_base_url = \"https://$HIGHLIGHT_API_HOST:8443\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(config.api_base_url, "https://api.internal.test:8443");

        unsafe {
            env::remove_var("HIGHLIGHT_API_HOST");
        }
    }

    #[test]
    fn test_unset_env_var_leaves_url_untouched() {
        let value = "http://$HIGHLIGHT_SURELY_UNSET_VAR/x";

        assert_eq!(Config::expand_value(value), None);
    }
}
