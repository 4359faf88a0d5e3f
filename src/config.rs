//! Configuration loader and validator.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::search::DEFAULT_RADIUS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub search: Search,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
}

/// Event discovery API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Search {
    pub api_key: String,
    pub base_url: String,
    #[serde(default = "default_radius")]
    pub radius: u32,
}

fn default_radius() -> u32 {
    DEFAULT_RADIUS
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        fs::create_dir_all(&self.app.data_dir)
    }

    /// `DATABASE_URL` when set, otherwise a file under `app.data_dir`.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            format!(
                "sqlite://{}/places.db",
                self.app.data_dir.trim_end_matches('/')
            )
        })
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.search.api_key.trim().is_empty() {
        return Err(ConfigError::Invalid("search.api_key must be non-empty"));
    }
    if cfg.search.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("search.base_url must be non-empty"));
    }
    if cfg.search.radius == 0 {
        return Err(ConfigError::Invalid("search.radius must be > 0"));
    }
    Ok(())
}

/// Sample configuration written by documentation and tests.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"

search:
  api_key: "YOUR_TICKETMASTER_API_KEY"
  base_url: "https://app.ticketmaster.com/"
  radius: 50
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.search.radius, 50);
    }

    #[test]
    fn radius_defaults_when_absent() {
        let yaml = "app:\n  data_dir: d\nsearch:\n  api_key: k\n  base_url: http://x/\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.search.radius, DEFAULT_RADIUS);
    }

    #[test]
    fn invalid_api_key() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.search.api_key = " ".into();
        match validate(&cfg).unwrap_err() {
            ConfigError::Invalid(msg) => assert!(msg.contains("search.api_key")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn invalid_data_dir_base_url_and_radius() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.search.base_url = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.search.radius = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn ensure_dirs_creates_data_dir() {
        let td = tempdir().unwrap();
        let data_path = td.path().join("data");
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = data_path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(data_path.exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.search.api_key, "YOUR_TICKETMASTER_API_KEY");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let td = tempdir().unwrap();
        let err = load(Some(&td.path().join("absent.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
