use crate::constants::*;
use crate::error::{Result, ScraperError};
use crate::types::FieldSpec;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Profile URL template containing `{player}`
    pub profile_url: String,
    /// JSON endpoint listing the players currently online
    #[serde(default)]
    pub online_url: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Sent as `Authorization: Bearer <token>` when present
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_requests_per_min")]
    pub requests_per_min: u64,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_store_file")]
    pub store_file: String,
    #[serde(default = "default_roster_file")]
    pub roster_file: String,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}
fn default_requests_per_min() -> u64 {
    DEFAULT_REQUESTS_PER_MIN
}
fn default_delay_ms() -> u64 {
    DEFAULT_DELAY_MS
}
fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}
fn default_output_dir() -> String {
    DEFAULT_OUTPUT_DIR.to_string()
}
fn default_store_file() -> String {
    DEFAULT_STORE_FILE.to_string()
}
fn default_roster_file() -> String {
    DEFAULT_ROSTER_FILE.to_string()
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            requests_per_min: DEFAULT_REQUESTS_PER_MIN,
            delay_ms: DEFAULT_DELAY_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            store_file: default_store_file(),
            roster_file: default_roster_file(),
        }
    }
}

impl SiteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl LimitsConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Config {
    /// Reads the TOML file, applies environment overrides and validates.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        let mut config = Self::from_toml(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Environment variables win over the file so secrets can stay out of it.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_PROFILE_URL) {
            self.site.profile_url = url;
        }
        if let Some(url) = non_empty(ENV_ONLINE_URL) {
            self.site.online_url = Some(url);
        }
        if let Some(token) = non_empty(ENV_TOKEN) {
            self.site.token = Some(token.trim().to_string());
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.site.profile_url.contains(PLAYER_PLACEHOLDER) {
            return Err(ScraperError::Config(format!(
                "site.profile_url must contain {PLAYER_PLACEHOLDER}"
            )));
        }
        if self.fields.is_empty() {
            return Err(ScraperError::Config(
                "at least one [[fields]] entry is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(ScraperError::Config("field name must not be empty".into()));
            }
            if field.name == SOURCE_COLUMN || field.name == PLAYER_COLUMN {
                return Err(ScraperError::Config(format!(
                    "field name '{}' is reserved",
                    field.name
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(ScraperError::Config(format!(
                    "duplicate field name '{}'",
                    field.name
                )));
            }
        }

        if self.site.timeout_seconds == 0 {
            return Err(ScraperError::Config("site.timeout_seconds must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldKind;

    const SAMPLE: &str = r##"
[site]
profile_url = "https://game.example/profile/{player}"

[limits]
max_retries = 5

[[fields]]
name = "username"
selector = ".profile h1"

[[fields]]
name = "score"
selector = "#stats .score"
kind = "integer"
"##;

    #[test]
    fn test_parse_with_defaults() {
        let config = Config::from_toml(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.site.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
        assert_eq!(config.site.user_agent, DEFAULT_USER_AGENT);
        assert!(config.site.online_url.is_none());
        assert_eq!(config.limits.max_retries, 5);
        assert_eq!(config.limits.requests_per_min, DEFAULT_REQUESTS_PER_MIN);
        assert_eq!(config.storage.store_file, DEFAULT_STORE_FILE);
        assert_eq!(config.fields.len(), 2);
        assert_eq!(config.fields[1].kind, FieldKind::Integer);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::from_toml(SAMPLE).unwrap();
        config.apply_overrides(|key| match key {
            ENV_TOKEN => Some(" abc \n".to_string()),
            ENV_ONLINE_URL => Some("https://game.example/online".to_string()),
            ENV_PROFILE_URL => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(config.site.token.as_deref(), Some("abc"));
        assert_eq!(config.site.online_url.as_deref(), Some("https://game.example/online"));
        assert_eq!(config.site.profile_url, "https://game.example/profile/{player}");
    }

    #[test]
    fn test_validate_rejects_bad_configs() {
        let mut config = Config::from_toml(SAMPLE).unwrap();
        config.site.profile_url = "https://game.example/profile".into();
        assert!(matches!(config.validate(), Err(ScraperError::Config(_))));

        let mut config = Config::from_toml(SAMPLE).unwrap();
        config.fields[1].name = "username".into();
        assert!(matches!(config.validate(), Err(ScraperError::Config(_))));

        let mut config = Config::from_toml(SAMPLE).unwrap();
        config.fields[0].name = SOURCE_COLUMN.into();
        assert!(matches!(config.validate(), Err(ScraperError::Config(_))));

        let mut config = Config::from_toml(SAMPLE).unwrap();
        config.fields[0].name = PLAYER_COLUMN.into();
        assert!(matches!(config.validate(), Err(ScraperError::Config(_))));

        let mut config = Config::from_toml(SAMPLE).unwrap();
        config.fields.clear();
        assert!(matches!(config.validate(), Err(ScraperError::Config(_))));
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = Config::load("/nonexistent/config.toml").unwrap_err();
        assert!(matches!(err, ScraperError::Config(_)));
    }
}
