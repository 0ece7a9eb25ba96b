use anyhow::{Context, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;

use crate::error::ConfigLoadError;

pub const CONFIG_PATH_VAR: &str = "PACSTRACK_CONFIG_PATH";
pub const CONFIG_JSON_VAR: &str = "PACSTRACK_CONFIG_JSON";
pub const SERVER_URL_VAR: &str = "PACSTRACK_SERVER_URL";

/// Source that produced the client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// Settings for talking to a storage server and keeping its views locally.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the server. A missing scheme is filled in with `http://`.
    pub server_url: String,
    /// Overrides the platform cache directory used for persisted views.
    pub cache_dir: Option<PathBuf>,
    /// Cadence of the progress poll while a storage check runs.
    pub progress_interval_ms: u64,
    /// Pause between the end of one task table refresh and the next.
    pub task_refresh_ms: u64,
    /// Timeout for polls and short requests. Job requests run unbounded.
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5000".to_string(),
            cache_dir: None,
            progress_interval_ms: 1_000,
            task_refresh_ms: 2_000,
            request_timeout_secs: 30,
        }
    }
}

impl ClientConfig {
    /// Load the configuration from the process environment.
    /// Evaluation order:
    /// 1) `$PACSTRACK_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$PACSTRACK_CONFIG_JSON` (inline JSON),
    /// 3) `config.toml` in the platform config directory,
    /// 4) defaults.
    ///
    /// `$PACSTRACK_SERVER_URL` then overrides `server_url`.
    pub fn load_from_env() -> Result<(Self, ConfigSource), ConfigLoadError> {
        Self::load_with(|key| env::var(key).ok(), Self::find_default_file())
    }

    /// [`ClientConfig::load_from_env`] with an injectable variable lookup.
    pub fn load_with(
        lookup: impl Fn(&str) -> Option<String>,
        default_file: Option<PathBuf>,
    ) -> Result<(Self, ConfigSource), ConfigLoadError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let (mut config, source) = if let Some(path_str) = non_empty(CONFIG_PATH_VAR) {
            let path = PathBuf::from(path_str);
            let config = Self::load_from_file(&path)?;
            (config, ConfigSource::EnvPath(path))
        } else if let Some(raw) = non_empty(CONFIG_JSON_VAR) {
            let parsed = Self::parse_json(&raw)
                .context("failed to parse PACSTRACK_CONFIG_JSON")
                .map_err(ConfigLoadError::Parse)?;
            (parsed, ConfigSource::EnvInline)
        } else if let Some(path) = default_file.filter(|path| path.exists()) {
            let config = Self::load_from_file(&path)?;
            (config, ConfigSource::File(path))
        } else {
            (Self::default(), ConfigSource::Default)
        };

        if let Some(url) = non_empty(SERVER_URL_VAR) {
            debug!(%url, "server url overridden from environment");
            config.server_url = url;
        }

        config.validate()?;
        debug!(?source, "client configuration loaded");
        Ok((config, source))
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigLoadError> {
        let contents =
            fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let parsed = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents).with_context(|| {
                format!("invalid client config {}", path.display())
            }),
            Some("toml") | Some("tml") => toml::from_str(&contents).map_err(|err| {
                anyhow!("invalid client config {}: {}", path.display(), err)
            }),
            _ => Self::parse_from_str(&contents, &path.display().to_string()),
        };
        parsed.map_err(ConfigLoadError::Parse)
    }

    pub fn parse_from_str(contents: &str, origin: &str) -> anyhow::Result<Self> {
        // Try TOML first, then JSON for convenience.
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse client config {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw)
            .map_err(|err| anyhow!("invalid client config json: {err}"))
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        url::Url::parse(&self.normalized_server_url()).map_err(|source| {
            ConfigLoadError::InvalidServerUrl {
                url: self.server_url.clone(),
                source,
            }
        })?;
        if self.progress_interval_ms == 0 {
            return Err(ConfigLoadError::ZeroInterval {
                field: "progress_interval_ms",
            });
        }
        if self.task_refresh_ms == 0 {
            return Err(ConfigLoadError::ZeroInterval {
                field: "task_refresh_ms",
            });
        }
        Ok(())
    }

    /// Server URL with a scheme and without a trailing slash.
    pub fn normalized_server_url(&self) -> String {
        let trimmed = self.server_url.trim().trim_end_matches('/');
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        }
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn task_refresh_delay(&self) -> Duration {
        Duration::from_millis(self.task_refresh_ms)
    }

    /// `None` disables the timeout.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0)
            .then(|| Duration::from_secs(self.request_timeout_secs))
    }

    /// Platform config file location, e.g. `~/.config/pacstrack/config.toml`.
    pub fn find_default_file() -> Option<PathBuf> {
        ProjectDirs::from("", "pacstrack", "pacstrack")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_web_client_cadence() {
        let (config, source) = ClientConfig::load_with(lookup(&[]), None).unwrap();
        assert_eq!(source, ConfigSource::Default);
        assert_eq!(config.progress_interval(), Duration::from_secs(1));
        assert_eq!(config.task_refresh_delay(), Duration::from_secs(2));
    }

    #[test]
    fn inline_json_is_used_and_server_url_overrides_it() {
        let vars = [
            (CONFIG_JSON_VAR, r#"{"task_refresh_ms": 500}"#),
            (SERVER_URL_VAR, "pacs-gw:8080/"),
        ];
        let (config, source) = ClientConfig::load_with(lookup(&vars), None).unwrap();
        assert_eq!(source, ConfigSource::EnvInline);
        assert_eq!(config.task_refresh_ms, 500);
        assert_eq!(config.normalized_server_url(), "http://pacs-gw:8080");
    }

    #[test]
    fn blank_variables_are_ignored() {
        let vars = [(CONFIG_PATH_VAR, "  "), (CONFIG_JSON_VAR, "")];
        let (_, source) = ClientConfig::load_with(lookup(&vars), None).unwrap();
        assert_eq!(source, ConfigSource::Default);
    }

    #[test]
    fn zero_progress_interval_is_rejected() {
        let vars = [(CONFIG_JSON_VAR, r#"{"progress_interval_ms": 0}"#)];
        let err = ClientConfig::load_with(lookup(&vars), None).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::ZeroInterval {
                field: "progress_interval_ms"
            }
        ));
    }

    #[test]
    fn zero_timeout_disables_it() {
        let config = ClientConfig {
            request_timeout_secs: 0,
            ..ClientConfig::default()
        };
        assert_eq!(config.request_timeout(), None);
    }
}
