use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::PathBuf};

use crate::normalize::TimeBasis;

/// Environment variable that overrides the stored API key.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Agent configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// base_url = "https://api.openweathermap.org/data/2.5"
/// timeout_secs = 10
/// time_basis = "location"
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// OpenWeatherMap API key.
    pub api_key: Option<String>,

    /// Base URL; `/weather` and `/forecast` are appended.
    pub base_url: String,

    /// Logged once the agent is initialized.
    pub startup_message: String,

    /// Per-request timeout. Unset means the HTTP client default.
    pub timeout_secs: Option<u64>,

    pub time_basis: TimeBasis,

    /// Root directory of the filesystem artifact store.
    pub artifact_dir: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            startup_message: "Weather Agent is ready to provide weather information!".to_string(),
            timeout_secs: None,
            time_basis: TimeBasis::default(),
            artifact_dir: None,
        }
    }
}

// Keeps the API key out of logs.
impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("startup_message", &self.startup_message)
            .field("timeout_secs", &self.timeout_secs)
            .field("time_basis", &self.time_basis)
            .field("artifact_dir", &self.artifact_dir)
            .finish()
    }
}

impl AgentConfig {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: AgentConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "weather-agent", "weather-agent")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Configured artifact directory, or `<data dir>/artifacts`.
    pub fn artifact_dir_or_default(&self) -> Result<PathBuf> {
        match &self.artifact_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()?.data_dir().join("artifacts")),
        }
    }

    /// Apply environment overrides. `lookup` is usually `|k| std::env::var(k).ok()`.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        self
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty()).ok_or_else(|| {
            anyhow!(
                "No OpenWeatherMap API key configured.\n\
                 Hint: run `weather-agent configure` or set {API_KEY_ENV}."
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_openweathermap() {
        let cfg = AgentConfig::default();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.time_basis, TimeBasis::Location);
        assert!(cfg.api_key.is_none());
        assert!(cfg.timeout_secs.is_none());
    }

    #[test]
    fn require_api_key_errors_when_not_set() {
        let cfg = AgentConfig::default();
        let err = cfg.require_api_key().unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("No OpenWeatherMap API key configured"));
        assert!(msg.contains("Hint: run `weather-agent configure`"));
    }

    #[test]
    fn set_api_key_is_returned() {
        let mut cfg = AgentConfig::default();
        cfg.set_api_key("OPEN_KEY".into());
        assert_eq!(cfg.require_api_key().unwrap(), "OPEN_KEY");
    }

    #[test]
    fn env_override_replaces_stored_key() {
        let mut cfg = AgentConfig::default();
        cfg.set_api_key("STORED".into());

        let cfg = cfg.with_env_overrides(|k| (k == API_KEY_ENV).then(|| "FROM_ENV".to_string()));
        assert_eq!(cfg.api_key.as_deref(), Some("FROM_ENV"));
    }

    #[test]
    fn blank_env_override_is_ignored() {
        let mut cfg = AgentConfig::default();
        cfg.set_api_key("STORED".into());

        let cfg = cfg.with_env_overrides(|_| Some("  ".to_string()));
        assert_eq!(cfg.api_key.as_deref(), Some("STORED"));
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg: AgentConfig = toml::from_str(
            r#"
            api_key = "KEY"
            time_basis = "utc"
            timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(cfg.api_key.as_deref(), Some("KEY"));
        assert_eq!(cfg.time_basis, TimeBasis::Utc);
        assert_eq!(cfg.timeout_secs, Some(5));
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut cfg = AgentConfig::default();
        cfg.set_api_key("SECRET".into());
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("SECRET"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn explicit_artifact_dir_wins() {
        let cfg = AgentConfig { artifact_dir: Some(PathBuf::from("/tmp/wx")), ..Default::default() };
        assert_eq!(cfg.artifact_dir_or_default().unwrap(), PathBuf::from("/tmp/wx"));
    }
}
