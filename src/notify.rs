use crate::prompt::truncate_chars;
use crate::types::{Article, Result, RunSummary};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{error, info};

const COLOR_HIGH: u32 = 0x57F287; // green
const COLOR_MEDIUM: u32 = 0xFEE75C; // yellow
const COLOR_LOW: u32 = 0xED4245; // red
const COLOR_SUMMARY: u32 = 0x5865F2; // blurple

const MAX_EMBED_DESCRIPTION_CHARS: usize = 300;

fn score_color(score: u8) -> u32 {
    if score >= 8 {
        COLOR_HIGH
    } else if score >= 6 {
        COLOR_MEDIUM
    } else {
        COLOR_LOW
    }
}

/// Discord embed payload for one scored article.
pub fn article_embed(article: &Article, score: u8, reason: &str) -> Value {
    let description = article
        .description
        .as_deref()
        .map(|d| truncate_chars(d, MAX_EMBED_DESCRIPTION_CHARS).into_owned())
        .unwrap_or_default();

    json!({
        "title": article.title_or_unknown(),
        "url": article.url,
        "description": description,
        "color": score_color(score),
        "fields": [
            { "name": "Category", "value": article.category_or_unknown(), "inline": true },
            { "name": "Relevance Score", "value": format!("{}/10", score), "inline": true },
            { "name": "Why this article?", "value": reason, "inline": false },
        ],
    })
}

/// Webhook-based notification sink. Delivery failures are logged and
/// reported as `false`; nothing here interrupts a run.
pub struct DiscordNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl DiscordNotifier {
    pub fn new(webhook_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
        })
    }

    pub async fn send_article(&self, article: &Article, score: u8, reason: &str) -> bool {
        let payload = json!({ "embeds": [article_embed(article, score, reason)] });
        let sent = self.post(&payload).await;
        if sent {
            info!(
                "Sent notification for article: {}",
                article.title_or_unknown()
            );
        }
        sent
    }

    pub async fn send_summary(&self, summary: &RunSummary) -> bool {
        let payload = json!({
            "embeds": [{
                "title": "News Curator Run Summary",
                "color": COLOR_SUMMARY,
                "fields": [
                    { "name": "Articles Scraped", "value": summary.total_articles.to_string(), "inline": true },
                    { "name": "New Articles", "value": summary.new_articles.to_string(), "inline": true },
                    { "name": "Notifications Sent", "value": summary.sent_notifications.to_string(), "inline": true },
                ],
            }],
        });
        let sent = self.post(&payload).await;
        if sent {
            info!("Sent summary notification");
        }
        sent
    }

    pub async fn test_connection(&self) -> bool {
        let payload = json!({ "content": "News curator webhook connection test successful" });
        self.post(&payload).await
    }

    async fn post(&self, payload: &Value) -> bool {
        match self.client.post(&self.webhook_url).json(payload).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                error!("Discord webhook returned HTTP {}", response.status());
                false
            }
            Err(e) => {
                error!("Failed to send Discord notification: {}", e);
                false
            }
        }
    }
}
