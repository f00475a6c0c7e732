use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{LibbyError, LibbyResult, StorageError};

pub const API_URL_ENV: &str = "LIBBY_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub onboarding: OnboardingConfig,
    pub recommendations: RecommendationConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_seconds: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OnboardingConfig {
    pub min_interests: usize,
    pub pages: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    pub default_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            request_timeout_seconds: 10,
            user_agent: "LibbyBot/0.1".to_string(),
        }
    }
}

impl ApiConfig {
    /// Whether `base_url` is absolute and can have API paths appended.
    pub fn has_valid_base_url(&self) -> bool {
        url::Url::parse(&self.base_url)
            .map(|url| !url.cannot_be_a_base())
            .unwrap_or(false)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

fn tags(list: &[&str]) -> Vec<String> {
    list.iter().map(|t| t.to_string()).collect()
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            min_interests: 3,
            pages: vec![
                tags(&[
                    "fantasy",
                    "mystery",
                    "romance",
                    "science fiction",
                    "thriller",
                    "horror",
                    "historical fiction",
                    "young adult",
                ]),
                tags(&[
                    "biography",
                    "history",
                    "self-help",
                    "travel",
                    "true crime",
                    "poetry",
                    "philosophy",
                    "cooking",
                ]),
                tags(&[
                    "computer science",
                    "mathematics",
                    "economics",
                    "psychology",
                    "engineering",
                    "medicine",
                    "law",
                    "education",
                ]),
            ],
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self { default_limit: 20 }
    }
}

impl AppConfig {
    /// `<config dir>/libby`, e.g. `~/.config/libby` on Linux.
    pub fn config_dir() -> LibbyResult<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| LibbyError::Config("no configuration directory".to_string()))?;
        Ok(dir.join("libby"))
    }

    pub fn config_file_path() -> LibbyResult<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Loads the configuration file, falling back to defaults when it is
    /// missing or unreadable, then applies environment overrides.
    pub fn load() -> Self {
        let mut config = match Self::config_file_path() {
            Ok(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|err| {
                warn!(error = %err, path = %path.display(), "failed to load config, using defaults");
                Self::default()
            }),
            Ok(_) => Self::default(),
            Err(err) => {
                warn!(error = %err, "using default config");
                Self::default()
            }
        };
        config.apply_env();
        config.sanitize();
        config
    }

    pub fn load_from(path: impl AsRef<Path>) -> LibbyResult<Self> {
        let content = std::fs::read_to_string(path).map_err(StorageError::from)?;
        let config = serde_json::from_str(&content).map_err(StorageError::from)?;
        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> LibbyResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(StorageError::from)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(StorageError::from)?;
        std::fs::write(path, json).map_err(StorageError::from)?;
        Ok(())
    }

    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url.trim().to_string();
            }
        }
    }

    /// Resets values the client cannot start with to their defaults.
    fn sanitize(&mut self) {
        if !self.api.has_valid_base_url() {
            let fallback = ApiConfig::default().base_url;
            warn!(url = %self.api.base_url, %fallback, "invalid API base url, using default");
            self.api.base_url = fallback;
        }
    }

    /// Where the preference store lives: the configured override, else the
    /// platform data directory, else the working directory.
    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.storage.data_dir {
            return dir.clone();
        }
        dirs::data_dir()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_default()
            .join("libby")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_sections() {
        let config: AppConfig =
            serde_json::from_str(r#"{"api": {"base_url": "https://libby.example.edu"}}"#).unwrap();
        assert_eq!(config.api.base_url, "https://libby.example.edu");
        assert_eq!(config.api.request_timeout_seconds, 10);
        assert_eq!(config.onboarding.min_interests, 3);
        assert_eq!(config.onboarding.pages.len(), 3);
        assert_eq!(config.recommendations.default_limit, 20);
    }

    #[test]
    fn bad_base_url_falls_back_to_default() {
        let mut config = AppConfig::default();
        config.api.base_url = "localhost:5000".to_string();
        assert!(!config.api.has_valid_base_url());

        config.sanitize();
        assert_eq!(config.api.base_url, ApiConfig::default().base_url);
        assert!(config.api.has_valid_base_url());

        config.api.base_url = "https://libby.example.edu/backend/".to_string();
        config.sanitize();
        assert_eq!(config.api.base_url, "https://libby.example.edu/backend/");
    }

    #[test]
    fn round_trips_through_file() {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "libby_config_{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        path.push("config.json");

        let mut config = AppConfig::default();
        config.onboarding.min_interests = 5;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.onboarding.min_interests, 5);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
