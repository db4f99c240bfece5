use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest score a relevance judgment can carry.
pub const MIN_SCORE: u8 = 1;
/// Highest score a relevance judgment can carry.
pub const MAX_SCORE: u8 = 10;

/// A candidate news item produced by the scraper.
///
/// The URL is the only identity an article has; everything else is
/// best-effort extraction and may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub url: String,
    pub title: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
}

impl Article {
    pub fn title_or_unknown(&self) -> &str {
        self.title.as_deref().unwrap_or("Unknown")
    }

    pub fn category_or_unknown(&self) -> &str {
        self.category.as_deref().unwrap_or("Unknown")
    }

    /// Text used for relevance analysis. Full content takes precedence
    /// over the listing-page description when both are present.
    pub fn body_text(&self) -> &str {
        self.content
            .as_deref()
            .or(self.description.as_deref())
            .unwrap_or("")
    }
}

/// A single relevance judgment for one article.
///
/// The score is always inside `[MIN_SCORE, MAX_SCORE]` and the reason is
/// never empty; `new` enforces both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: u8,
    pub reason: String,
}

impl ScoreResult {
    pub fn new(score: i64, reason: impl Into<String>) -> Self {
        let score = score.clamp(MIN_SCORE as i64, MAX_SCORE as i64) as u8;
        let mut reason = reason.into();
        if reason.is_empty() {
            reason = "No reason provided".to_string();
        }
        Self { score, reason }
    }

    /// A bottom-scored result carrying a diagnostic reason.
    pub fn floor(reason: impl Into<String>) -> Self {
        Self::new(MIN_SCORE as i64, reason)
    }
}

/// A persisted article row from the seen-articles store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeenArticle {
    pub url: String,
    pub title: String,
    pub scraped_at: DateTime<Utc>,
    pub relevance_score: Option<i64>,
    pub notified: bool,
    pub reason: Option<String>,
    pub source_name: Option<String>,
}

/// Counters accumulated over a full curation run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub total_articles: usize,
    pub new_articles: usize,
    pub sent_notifications: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum CuratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chat model error: {0}")]
    Chat(String),

    #[error("Preferences file not found: {path}")]
    PreferencesNotFound { path: String },

    #[error("{0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, CuratorError>;
