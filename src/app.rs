use crate::client::OpenAiChatModel;
use crate::config::{Config, SourceConfig};
use crate::dashboard;
use crate::notify::DiscordNotifier;
use crate::scorer::RelevanceScorer;
use crate::scraper::{NewsScraper, DEFAULT_USER_AGENT};
use crate::store::ArticleStore;
use crate::types::{Article, Result, RunSummary};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Run orchestrator: wires the scraper, store, scoring engine, and
/// notifier together and drives one full curation pass.
pub struct Curator {
    config: Config,
    store: ArticleStore,
    scraper: NewsScraper,
    scorer: RelevanceScorer,
    notifier: DiscordNotifier,
}

impl Curator {
    pub async fn init(config: Config) -> Result<Self> {
        info!("Initializing news curator");

        let store = ArticleStore::connect(&config.database.path).await?;
        let scraper = NewsScraper::new(DEFAULT_USER_AGENT)?;

        let model = OpenAiChatModel::new(config.model.clone())?;
        let mut scorer = RelevanceScorer::new(Arc::new(model), config.model.batch_size);
        // A missing preference document aborts initialization: scoring
        // against nothing produces meaningless results.
        scorer.load_preferences(&config.filtering.preferences_file)?;

        let notifier =
            DiscordNotifier::new(config.discord.webhook_url.clone(), config.discord.timeout_secs)?;

        info!("News curator initialized");
        Ok(Self {
            config,
            store,
            scraper,
            scorer,
            notifier,
        })
    }

    /// One full pass over every configured source. Per-source failures are
    /// logged and skipped; the run keeps moving.
    pub async fn run(&self, dry_run: bool) -> Result<RunSummary> {
        info!("Starting curation run...");
        let mut summary = RunSummary::default();

        info!("Processing {} news sources", self.config.sources.len());
        for source in &self.config.sources {
            if let Err(e) = self.process_source(source, dry_run, &mut summary).await {
                error!("Error processing source {}: {}", source.name, e);
            }
        }

        info!(
            "Run complete: {} total, {} new, {} notifications",
            summary.total_articles, summary.new_articles, summary.sent_notifications
        );

        if summary.sent_notifications > 0 {
            if dry_run {
                info!("[dry run] Would send summary notification");
            } else {
                self.notifier.send_summary(&summary).await;
            }
        } else {
            info!("No relevant articles found, skipping summary notification");
        }

        Ok(summary)
    }

    async fn process_source(
        &self,
        source: &SourceConfig,
        dry_run: bool,
        summary: &mut RunSummary,
    ) -> Result<()> {
        info!("Scraping {}...", source.name);
        let articles = self
            .scraper
            .scrape(
                &source.url,
                &source.selectors,
                self.config.filtering.max_articles_per_source,
            )
            .await?;
        summary.total_articles += articles.len();
        info!("Found {} articles from {}", articles.len(), source.name);

        let mut unseen = Vec::new();
        for article in articles {
            if self.store.is_seen(&article.url).await? {
                debug!("Skipping seen article: {}", article.title_or_unknown());
            } else {
                unseen.push(article);
            }
        }
        summary.new_articles += unseen.len();

        if unseen.is_empty() {
            info!("No new articles from {}", source.name);
            return Ok(());
        }

        let batch_size = self.scorer.batch_size();
        for (chunk_index, chunk) in unseen.chunks(batch_size).enumerate() {
            info!(
                "Analyzing batch of {} articles ({}-{} of {})",
                chunk.len(),
                chunk_index * batch_size + 1,
                chunk_index * batch_size + chunk.len(),
                unseen.len()
            );

            let results = self.scorer.score_articles(chunk, None).await;
            for (article, result) in chunk.iter().zip(results) {
                self.store
                    .record(
                        &article.url,
                        article.title_or_unknown(),
                        Some(result.score),
                        Some(&result.reason),
                        Some(&source.name),
                    )
                    .await?;

                if result.score >= self.config.filtering.min_relevance_score {
                    info!(
                        "Relevant article (score {}): {}",
                        result.score,
                        article.title_or_unknown()
                    );
                    if dry_run {
                        info!("[dry run] Would send notification");
                        summary.sent_notifications += 1;
                    } else if self
                        .notifier
                        .send_article(article, result.score, &result.reason)
                        .await
                    {
                        summary.sent_notifications += 1;
                    }
                } else {
                    debug!(
                        "Filtered out (score {}): {}",
                        result.score,
                        article.title_or_unknown()
                    );
                }
            }
        }

        Ok(())
    }

    /// Render the dashboard page over recently seen articles.
    pub async fn render_dashboard(&self) -> Result<String> {
        let recent = self
            .store
            .recent(self.config.filtering.dashboard_days)
            .await?;
        let groups = dashboard::group_by_source(recent, &self.config.sources);
        let generated_at = Utc::now().format("%Y-%m-%d %H:%M UTC").to_string();
        Ok(dashboard::render(
            &groups,
            self.config.filtering.min_relevance_score,
            &generated_at,
        ))
    }

    /// Scrape the first configured source and log what comes back.
    pub async fn test_scraper(&self) -> bool {
        info!("Testing scraper...");
        let Some(source) = self.config.sources.first() else {
            error!("No news sources configured");
            return false;
        };
        info!("Testing with {}...", source.name);

        match self
            .scraper
            .scrape(&source.url, &source.selectors, 50)
            .await
        {
            Ok(articles) => {
                info!("Successfully scraped {} articles", articles.len());
                for (index, article) in articles.iter().enumerate() {
                    info!("  {}. {}", index + 1, article.title_or_unknown());
                }
                true
            }
            Err(e) => {
                error!("Scraper test failed: {}", e);
                false
            }
        }
    }

    /// Check model reachability, then score one canned article.
    pub async fn test_model(&self) -> bool {
        info!("Testing chat model...");
        if !self.scorer.test_connection().await {
            error!("Failed to connect to chat model");
            return false;
        }
        info!("Connected to chat model");

        let test_article = Article {
            url: "https://example.com/test".to_string(),
            title: Some("Test Article About Technology".to_string()),
            category: Some("Technology".to_string()),
            description: None,
            content: Some("This is a test article about new technology developments.".to_string()),
        };

        let result = self.scorer.analyze_one(&test_article, None).await;
        info!(
            "Chat model analysis successful: score={}, reason={}",
            result.score, result.reason
        );
        true
    }

    /// Post a test message to the webhook.
    pub async fn test_discord(&self) -> bool {
        info!("Testing Discord webhook...");
        if self.notifier.test_connection().await {
            info!("Discord webhook test successful");
            true
        } else {
            error!("Discord webhook test failed");
            false
        }
    }
}
