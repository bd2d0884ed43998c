use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const API_URL_ENV: &str = "DOCCHAT_API_URL";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub api_url: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn save_api_url(url: &str) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.api_url = Some(url.to_string());
        config.save()
    }

    /// Service base URL: CLI flag, then environment, then config file,
    /// then the local development endpoint.
    pub fn resolve_api_url(&self, cli: Option<&str>, env: Option<&str>) -> String {
        [cli, env, self.api_url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|url| !url.is_empty())
            .unwrap_or(DEFAULT_API_URL)
            .to_string()
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("docchat").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            api_url: Some("https://chat.example.com".to_string()),
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_resolve_precedence() {
        let config = Config {
            api_url: Some("http://from-file".to_string()),
        };
        assert_eq!(config.resolve_api_url(Some("http://cli"), Some("http://env")), "http://cli");
        assert_eq!(config.resolve_api_url(None, Some("http://env")), "http://env");
        assert_eq!(config.resolve_api_url(None, Some("  ")), "http://from-file");
        assert_eq!(Config::new().resolve_api_url(None, None), DEFAULT_API_URL);
    }
}
