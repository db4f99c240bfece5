use crate::types::{Result, SeenArticle};
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS seen_articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    scraped_at TEXT NOT NULL,
    relevance_score INTEGER,
    notified INTEGER NOT NULL DEFAULT 0,
    reason TEXT,
    source_name TEXT
)
"#;

/// SQLite-backed store of every article the pipeline has seen, keyed by
/// URL. The scoring core never touches this; it is the orchestrator's
/// dedup and history layer.
pub struct ArticleStore {
    pool: SqlitePool,
}

impl ArticleStore {
    /// Open (creating if needed) the store at `path`. `:memory:` gives an
    /// isolated in-memory database, used by tests.
    pub async fn connect(path: &str) -> Result<Self> {
        let options = if path == ":memory:" {
            SqliteConnectOptions::from_str("sqlite::memory:")?
        } else {
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
        };

        // A single connection keeps :memory: databases coherent and is
        // plenty for one sequential run.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_TABLE_SQL).execute(&pool).await?;
        info!("Article store initialized at {}", path);
        Ok(Self { pool })
    }

    /// Whether an article URL has been recorded before.
    pub async fn is_seen(&self, url: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM seen_articles WHERE url = ?1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Record an article as seen, with its score and reason when it was
    /// analyzed. The notified flag tracks whether a score was attached.
    pub async fn record(
        &self,
        url: &str,
        title: &str,
        relevance_score: Option<u8>,
        reason: Option<&str>,
        source_name: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO seen_articles (url, title, scraped_at, relevance_score, notified, reason, source_name)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (url) DO NOTHING
            "#,
        )
        .bind(url)
        .bind(title)
        .bind(now)
        .bind(relevance_score.map(i64::from))
        .bind(relevance_score.is_some())
        .bind(reason)
        .bind(source_name)
        .execute(&self.pool)
        .await?;

        debug!("Marked article as seen: {}", title);
        Ok(())
    }

    /// Articles seen within the last `days` days, newest first.
    pub async fn recent(&self, days: i64) -> Result<Vec<SeenArticle>> {
        let cutoff = Utc::now() - Duration::days(days);
        let rows = sqlx::query(
            r#"
            SELECT url, title, scraped_at, relevance_score, notified, reason, source_name
            FROM seen_articles
            WHERE scraped_at >= ?1
            ORDER BY scraped_at DESC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(SeenArticle {
                    url: row.try_get("url")?,
                    title: row.try_get("title")?,
                    scraped_at: row.try_get::<DateTime<Utc>, _>("scraped_at")?,
                    relevance_score: row.try_get("relevance_score")?,
                    notified: row.try_get("notified")?,
                    reason: row.try_get("reason")?,
                    source_name: row.try_get("source_name")?,
                })
            })
            .collect()
    }

    /// Total number of recorded articles.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM seen_articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_and_seen_round_trip() {
        let store = ArticleStore::connect(":memory:").await.unwrap();

        assert!(!store.is_seen("https://example.com/a").await.unwrap());
        store
            .record(
                "https://example.com/a",
                "Story A",
                Some(8),
                Some("matches high priority topic"),
                Some("Example Daily"),
            )
            .await
            .unwrap();

        assert!(store.is_seen("https://example.com/a").await.unwrap());
        assert!(!store.is_seen("https://example.com/b").await.unwrap());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_urls_are_recorded_once() {
        let store = ArticleStore::connect(":memory:").await.unwrap();
        store
            .record("https://example.com/a", "Story A", None, None, None)
            .await
            .unwrap();
        store
            .record("https://example.com/a", "Story A again", Some(3), None, None)
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn recent_returns_rows_inside_the_window() {
        let store = ArticleStore::connect(":memory:").await.unwrap();
        store
            .record(
                "https://example.com/a",
                "Story A",
                Some(9),
                Some("reason"),
                Some("Example Daily"),
            )
            .await
            .unwrap();
        store
            .record("https://example.com/b", "Story B", None, None, None)
            .await
            .unwrap();

        let rows = store.recent(7).await.unwrap();
        assert_eq!(rows.len(), 2);

        let scored = rows.iter().find(|r| r.url.ends_with("/a")).unwrap();
        assert_eq!(scored.relevance_score, Some(9));
        assert!(scored.notified);
        assert_eq!(scored.reason.as_deref(), Some("reason"));
        assert_eq!(scored.source_name.as_deref(), Some("Example Daily"));

        let pending = rows.iter().find(|r| r.url.ends_with("/b")).unwrap();
        assert_eq!(pending.relevance_score, None);
        assert!(!pending.notified);
    }
}
