//! Application configuration management.
//!
//! `Config` is the optional file at `~/.config/stscreds/config.json`.
//! `Settings` is the resolved value handed to every component: command-line
//! overrides first, then the file, then built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::credentials::{BootstrapCredentials, SessionCredentials};
use crate::error::{Error, Result};

/// Application name used for config directory paths
const APP_NAME: &str = "stscreds";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_PROFILE: &str = "default";

pub const DEFAULT_REGION: &str = "eu-west-1";

/// Default requested session length.
pub const DEFAULT_SESSION_DURATION: Duration = Duration::from_secs(12 * 60 * 60);

/// Shortest session the token service will issue.
pub const MIN_SESSION_DURATION: Duration = Duration::from_secs(15 * 60);

/// Longest session the token service will issue for an IAM user.
pub const MAX_SESSION_DURATION: Duration = Duration::from_secs(36 * 60 * 60);

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub profile: Option<String>,
    /// Human-readable duration such as `12h` or `1h30m`.
    pub session_duration: Option<String>,
    pub region: Option<String>,
    pub bootstrap_path: Option<PathBuf>,
    pub session_path: Option<PathBuf>,
}

impl Config {
    /// Load from the default location, or defaults if there is no file.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::storage_io(path, e.to_string()))?;
        serde_json::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub profile: Option<String>,
    pub session_duration: Option<Duration>,
    pub region: Option<String>,
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub profile: String,
    pub session_duration: Duration,
    pub region: String,
    pub bootstrap_path: PathBuf,
    pub session_path: PathBuf,
}

impl Settings {
    pub fn resolve(config: &Config, overrides: Overrides) -> Result<Self> {
        let session_duration = match (overrides.session_duration, &config.session_duration) {
            (Some(d), _) => d,
            (None, Some(raw)) => parse_duration(raw)?,
            (None, None) => DEFAULT_SESSION_DURATION,
        };

        let bootstrap_path = match &config.bootstrap_path {
            Some(p) => p.clone(),
            None => home_path(&[".stscreds", "credentials"])?,
        };
        let session_path = match &config.session_path {
            Some(p) => p.clone(),
            None => home_path(&[".aws", "credentials"])?,
        };

        let settings = Self {
            profile: overrides
                .profile
                .or_else(|| config.profile.clone())
                .unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
            session_duration,
            region: overrides
                .region
                .or_else(|| config.region.clone())
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            bootstrap_path,
            session_path,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.profile.trim().is_empty() {
            return Err(Error::Config("profile name must not be empty".into()));
        }
        if self.session_duration < MIN_SESSION_DURATION || self.session_duration > MAX_SESSION_DURATION {
            return Err(Error::Config(format!(
                "session duration {} outside allowed range {} to {}",
                humantime::format_duration(self.session_duration),
                humantime::format_duration(MIN_SESSION_DURATION),
                humantime::format_duration(MAX_SESSION_DURATION),
            )));
        }
        if self.bootstrap_path == self.session_path {
            return Err(Error::Config(format!(
                "bootstrap and session stores must be different files, both are {}",
                self.bootstrap_path.display()
            )));
        }
        Ok(())
    }

    pub fn bootstrap(&self) -> BootstrapCredentials {
        BootstrapCredentials::new(&self.bootstrap_path, &self.profile)
    }

    pub fn session(&self) -> SessionCredentials {
        SessionCredentials::new(&self.session_path, &self.profile)
    }
}

/// Parse `12h`, `90m`, `1h 30m` and similar.
pub fn parse_duration(raw: &str) -> Result<Duration> {
    humantime::parse_duration(raw.trim())
        .map_err(|e| Error::Config(format!("invalid duration {:?}: {}", raw, e)))
}

fn home_path(parts: &[&str]) -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| Error::Config("Could not find home directory".into()))?;
    Ok(parts.iter().fold(home, |path, part| path.join(part)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_paths() -> Config {
        Config {
            bootstrap_path: Some(PathBuf::from("/tmp/b/credentials")),
            session_path: Some(PathBuf::from("/tmp/s/credentials")),
            ..Config::default()
        }
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(&config_with_paths(), Overrides::default()).unwrap();
        assert_eq!(settings.profile, "default");
        assert_eq!(settings.region, "eu-west-1");
        assert_eq!(settings.session_duration, Duration::from_secs(43_200));
    }

    #[test]
    fn test_override_precedence() {
        let config = Config {
            profile: Some("from-file".into()),
            session_duration: Some("2h".into()),
            region: Some("us-east-1".into()),
            ..config_with_paths()
        };

        let settings = Settings::resolve(&config, Overrides::default()).unwrap();
        assert_eq!(settings.profile, "from-file");
        assert_eq!(settings.session_duration, Duration::from_secs(7_200));
        assert_eq!(settings.region, "us-east-1");

        let overrides = Overrides {
            profile: Some("work".into()),
            session_duration: Some(Duration::from_secs(3_600)),
            region: None,
        };
        let settings = Settings::resolve(&config, overrides).unwrap();
        assert_eq!(settings.profile, "work");
        assert_eq!(settings.session_duration, Duration::from_secs(3_600));
        assert_eq!(settings.region, "us-east-1");
    }

    #[test]
    fn test_duration_bounds() {
        let overrides = Overrides {
            session_duration: Some(Duration::from_secs(60)),
            ..Overrides::default()
        };
        assert!(matches!(
            Settings::resolve(&config_with_paths(), overrides),
            Err(Error::Config(_))
        ));

        let overrides = Overrides {
            session_duration: Some(Duration::from_secs(37 * 3_600)),
            ..Overrides::default()
        };
        assert!(Settings::resolve(&config_with_paths(), overrides).is_err());
    }

    #[test]
    fn test_stores_must_be_separate_files() {
        let config = Config {
            bootstrap_path: Some(PathBuf::from("/tmp/shared/credentials")),
            session_path: Some(PathBuf::from("/tmp/shared/credentials")),
            ..Config::default()
        };
        let err = Settings::resolve(&config, Overrides::default()).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("different files")));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("12h").unwrap(), Duration::from_secs(43_200));
        assert_eq!(parse_duration("1h 30m").unwrap(), Duration::from_secs(5_400));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_load_from_missing_and_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = Config::load_from(&path).unwrap();
        assert!(config.profile.is_none());

        std::fs::write(&path, r#"{"profile": "work", "session_duration": "8h"}"#).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.profile.as_deref(), Some("work"));
        assert_eq!(config.session_duration.as_deref(), Some("8h"));

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
