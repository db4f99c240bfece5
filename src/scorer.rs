use crate::client::{ChatModel, CompletionOptions, SYSTEM_PROMPT};
use crate::prompt;
use crate::response;
use crate::types::{Article, CuratorError, Result, ScoreResult, MAX_SCORE, MIN_SCORE};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Bounds on how many articles a caller may group per scoring call.
pub const MIN_BATCH_SIZE: usize = 1;
pub const MAX_BATCH_SIZE: usize = 10;

fn title_preview(article: &Article) -> String {
    article.title_or_unknown().chars().take(50).collect()
}

/// Batch relevance-scoring engine.
///
/// The output contract is absolute: `score_articles` returns exactly one
/// result per input article, in input order, with every score inside
/// `[1, 10]`, no matter how the underlying call degrades. Nothing the
/// chat model or transport does propagates as an error to the caller.
pub struct RelevanceScorer {
    model: Arc<dyn ChatModel>,
    preferences: String,
    batch_size: usize,
}

impl RelevanceScorer {
    pub fn new(model: Arc<dyn ChatModel>, batch_size: usize) -> Self {
        Self {
            model,
            preferences: String::new(),
            batch_size: batch_size.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE),
        }
    }

    /// Chunk size callers should group articles by.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Load the free-text preference document.
    ///
    /// The one hard failure in this engine: scoring against no preference
    /// document at all produces meaningless results, so a missing file is
    /// raised to the caller instead of absorbed.
    pub fn load_preferences(&mut self, path: &str) -> Result<()> {
        if !Path::new(path).exists() {
            return Err(CuratorError::PreferencesNotFound {
                path: path.to_string(),
            });
        }
        self.preferences = std::fs::read_to_string(path)?;
        info!(
            "Loaded preferences from {} ({} chars)",
            path,
            self.preferences.chars().count()
        );
        Ok(())
    }

    /// Set the preference document directly (tests, embedded callers).
    pub fn set_preferences(&mut self, preferences: impl Into<String>) {
        self.preferences = preferences.into();
    }

    /// Score every article against the preference document.
    ///
    /// One article goes through the plain single-article prompt; several
    /// share one batch call. If the batch call fails for any reason the
    /// whole batch is retried as sequential single-article calls.
    pub async fn score_articles(
        &self,
        articles: &[Article],
        preferences: Option<&str>,
    ) -> Vec<ScoreResult> {
        if articles.is_empty() {
            return Vec::new();
        }

        let prefs = preferences.unwrap_or(&self.preferences);
        if prefs.is_empty() {
            warn!("No preferences loaded, scoring against an empty preference document");
        }

        let results = if articles.len() == 1 {
            vec![self.analyze_single(&articles[0], prefs).await]
        } else {
            match self.try_batch(articles, prefs).await {
                Ok(results) => results,
                Err(e) => {
                    error!("Batch chat call failed: {}", e);
                    info!("Falling back to individual article analysis for this batch");
                    let mut fallback = Vec::with_capacity(articles.len());
                    for article in articles {
                        fallback.push(self.analyze_single(article, prefs).await);
                    }
                    fallback
                }
            }
        };

        debug_assert_eq!(results.len(), articles.len());
        debug_assert!(results
            .iter()
            .all(|r| (MIN_SCORE..=MAX_SCORE).contains(&r.score)));

        results
    }

    /// Convenience wrapper scoring a single article.
    pub async fn analyze_one(
        &self,
        article: &Article,
        preferences: Option<&str>,
    ) -> ScoreResult {
        self.score_articles(std::slice::from_ref(article), preferences)
            .await
            .into_iter()
            .next()
            .unwrap_or_else(|| ScoreResult::floor("Empty scoring result"))
    }

    async fn try_batch(&self, articles: &[Article], prefs: &str) -> Result<Vec<ScoreResult>> {
        let titles_preview: Vec<String> = articles
            .iter()
            .take(3)
            .map(|a| a.title_or_unknown().chars().take(30).collect())
            .collect();
        debug!(
            "Batch analyzing {} articles: {}...",
            articles.len(),
            titles_preview.join(", ")
        );

        let user_prompt = prompt::build_batch_prompt(articles, prefs);
        let raw = self
            .model
            .complete(SYSTEM_PROMPT, &user_prompt, &CompletionOptions::default())
            .await?;

        let results = response::parse_batch(&raw, articles.len());
        for (article, result) in articles.iter().zip(&results) {
            info!(
                "Article scored {}/10: {}...",
                result.score,
                title_preview(article)
            );
        }
        Ok(results)
    }

    async fn analyze_single(&self, article: &Article, prefs: &str) -> ScoreResult {
        debug!("Analyzing article: {}...", title_preview(article));

        let user_prompt = prompt::build_single_prompt(article, prefs);
        match self
            .model
            .complete(SYSTEM_PROMPT, &user_prompt, &CompletionOptions::default())
            .await
        {
            Ok(raw) => {
                let result = response::parse_single(&raw);
                info!(
                    "Article scored {}/10: {}...",
                    result.score,
                    title_preview(article)
                );
                result
            }
            Err(e) => {
                error!("Failed to analyze article with chat model: {}", e);
                ScoreResult::floor(format!("Error analyzing article: {}", e))
            }
        }
    }

    /// Issue a minimal low-cost call and report reachability.
    pub async fn test_connection(&self) -> bool {
        let options = CompletionOptions {
            json_response: false,
            temperature: 0.3,
            max_tokens: Some(5),
        };
        match self.model.complete("", "Test", &options).await {
            Ok(_) => {
                info!(
                    "Successfully connected to chat model: {}",
                    self.model.model_name()
                );
                true
            }
            Err(e) => {
                error!("Failed to connect to chat model: {}", e);
                false
            }
        }
    }
}
