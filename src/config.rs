use crate::client::ModelConfig;
use crate::scorer::{MAX_BATCH_SIZE, MIN_BATCH_SIZE};
use crate::scraper::Selectors;
use crate::types::{CuratorError, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// One configured news site.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    pub selectors: Selectors,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default = "default_notify_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            timeout_secs: default_notify_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilteringConfig {
    #[serde(default = "default_preferences_file")]
    pub preferences_file: String,
    #[serde(default = "default_min_relevance_score")]
    pub min_relevance_score: u8,
    #[serde(default = "default_max_articles_per_source")]
    pub max_articles_per_source: usize,
    #[serde(default = "default_dashboard_days")]
    pub dashboard_days: i64,
}

impl Default for FilteringConfig {
    fn default() -> Self {
        Self {
            preferences_file: default_preferences_file(),
            min_relevance_score: default_min_relevance_score(),
            max_articles_per_source: default_max_articles_per_source(),
            dashboard_days: default_dashboard_days(),
        }
    }
}

fn default_notify_timeout_secs() -> u64 {
    30
}

fn default_database_path() -> String {
    "./data/seen_articles.db".to_string()
}

fn default_preferences_file() -> String {
    "./preferences.md".to_string()
}

fn default_min_relevance_score() -> u8 {
    7
}

fn default_max_articles_per_source() -> usize {
    20
}

fn default_dashboard_days() -> i64 {
    3
}

/// Full application configuration, loaded from a YAML file with `${VAR}`
/// placeholders resolved from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub sources: Vec<SourceConfig>,
    pub model: ModelConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub filtering: FilteringConfig,
}

impl Config {
    /// Load configuration from `path`, resolving `.env` first so that
    /// placeholder substitution can see freshly loaded variables.
    pub fn load(path: &str) -> Result<Self> {
        if dotenvy::dotenv().is_ok() {
            debug!("Loaded environment from .env");
        }

        let raw = std::fs::read_to_string(path).map_err(|e| {
            CuratorError::Config(format!("configuration file not found: {} ({})", path, e))
        })?;
        let config = Self::parse(&raw)?;
        info!("Configuration loaded from {}", path);
        Ok(config)
    }

    /// Parse and validate configuration from YAML text.
    pub fn parse(raw: &str) -> Result<Self> {
        let substituted = substitute_env_vars(raw);
        let mut config: Config = serde_yaml::from_str(&substituted)
            .map_err(|e| CuratorError::Config(format!("invalid configuration: {}", e)))?;

        config.model.batch_size = config
            .model
            .batch_size
            .clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE);

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(CuratorError::Config("no news sources configured".to_string()));
        }
        for source in &self.sources {
            if source.url.is_empty() || source.selectors.article_list.is_empty() {
                return Err(CuratorError::Config(format!(
                    "invalid news source configuration: {}",
                    source.name
                )));
            }
        }

        if self.discord.webhook_url.is_empty() || self.discord.webhook_url.starts_with("${") {
            warn!("Discord webhook URL not set; notifications will fail until it is configured");
        }
        if self.model.api_key.is_empty() || self.model.api_key.starts_with("${") {
            warn!("Chat model API key not set; scoring calls will fail until it is configured");
        }

        Ok(())
    }
}

/// Replace every `${VAR}` occurrence with the value of the environment
/// variable `VAR`. Unset variables keep the placeholder text, matching
/// the warn-at-validate behavior above.
fn substitute_env_vars(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        match rest[start..].find('}') {
            Some(offset) => {
                let name = &rest[start + 2..start + offset];
                match std::env::var(name) {
                    Ok(value) => out.push_str(&value),
                    Err(_) => out.push_str(&rest[start..=start + offset]),
                }
                rest = &rest[start + offset + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_YAML: &str = r#"
sources:
  - name: Example Daily
    url: https://example.com/news
    selectors:
      article_list: "div.headlines a"
      title: "h4"
model:
  base_url: https://models.example.com
  api_key: test-key
  model: test/model-mini
"#;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config = Config::parse(MINIMAL_YAML).unwrap();
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.model.timeout_secs, 60);
        assert_eq!(config.model.batch_size, 5);
        assert_eq!(config.filtering.min_relevance_score, 7);
        assert_eq!(config.filtering.max_articles_per_source, 20);
        assert_eq!(config.database.path, "./data/seen_articles.db");
    }

    #[test]
    fn rejects_empty_source_list() {
        let raw = r#"
sources: []
model:
  base_url: https://models.example.com
  api_key: k
  model: m
"#;
        assert!(Config::parse(raw).is_err());
    }

    #[test]
    fn clamps_batch_size_at_parse_time() {
        let raw = format!("{}  batch_size: 50\n", MINIMAL_YAML);
        assert_eq!(Config::parse(&raw).unwrap().model.batch_size, 10);

        let raw = format!("{}  batch_size: 0\n", MINIMAL_YAML);
        assert_eq!(Config::parse(&raw).unwrap().model.batch_size, 1);
    }

    #[test]
    fn substitutes_environment_placeholders() {
        std::env::set_var("CURATOR_TEST_KEY", "resolved-secret");
        let raw = MINIMAL_YAML.replace("test-key", "${CURATOR_TEST_KEY}");
        let config = Config::parse(&raw).unwrap();
        assert_eq!(config.model.api_key, "resolved-secret");
    }

    #[test]
    fn keeps_placeholder_for_unset_variables() {
        let substituted = substitute_env_vars("key: ${CURATOR_DEFINITELY_UNSET_VAR}");
        assert_eq!(substituted, "key: ${CURATOR_DEFINITELY_UNSET_VAR}");
    }
}
