use crate::types::{Article, CuratorError, Result};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; NewsCuratorBot/1.0)";

/// CSS selectors describing where articles live on a source's page.
#[derive(Debug, Clone, Deserialize)]
pub struct Selectors {
    /// Selector matching one element per candidate article (usually the
    /// anchors themselves).
    pub article_list: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| {
        CuratorError::Config(format!("invalid CSS selector '{}': {}", selector, e))
    })
}

fn anchor_selector() -> &'static Selector {
    static ANCHOR: OnceLock<Selector> = OnceLock::new();
    ANCHOR.get_or_init(|| Selector::parse("a").expect("static selector"))
}

fn image_selector() -> &'static Selector {
    static IMAGE: OnceLock<Selector> = OnceLock::new();
    IMAGE.get_or_init(|| Selector::parse("img").expect("static selector"))
}

/// Walk up to the `levels`-th ancestor element, stopping at the root.
fn ancestor(element: ElementRef, levels: usize) -> ElementRef {
    let mut current = element;
    for _ in 0..levels {
        match current.parent().and_then(ElementRef::wrap) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    current
}

fn select_text(scope: ElementRef, selector: &Selector) -> Option<String> {
    let text = scope
        .select(selector)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();
    (!text.is_empty()).then_some(text)
}

fn extract_article(
    element: ElementRef,
    base: &Url,
    title_selector: Option<&Selector>,
    category_selector: Option<&Selector>,
    description_selector: Option<&Selector>,
) -> Option<Article> {
    let href = if element.value().name() == "a" {
        element.value().attr("href")
    } else {
        element
            .select(anchor_selector())
            .next()
            .and_then(|a| a.value().attr("href"))
    }?;

    let url = base.join(href).ok()?;

    // Title fallback chain: configured selector, then img alt (common for
    // image-led cards), then the anchor's title attribute, then link text.
    let title = title_selector
        .and_then(|sel| select_text(element, sel))
        .or_else(|| {
            element
                .select(image_selector())
                .next()
                .and_then(|img| img.value().attr("alt"))
                .map(|alt| alt.trim().to_string())
                .filter(|alt| !alt.is_empty())
        })
        .or_else(|| {
            element
                .value()
                .attr("title")
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
        })
        .or_else(|| {
            let text = element.text().collect::<String>().trim().to_string();
            (!text.is_empty()).then_some(text)
        })
        .unwrap_or_else(|| "Untitled".to_string());

    // Category and description usually sit on a surrounding card element
    // rather than inside the anchor itself.
    let category = category_selector.and_then(|sel| select_text(ancestor(element, 2), sel));
    let description =
        description_selector.and_then(|sel| select_text(ancestor(element, 3), sel));

    Some(Article {
        url: url.to_string(),
        title: Some(title),
        category,
        description,
        content: None,
    })
}

/// Extract candidate articles from a listing page. Relative hrefs are
/// resolved against `base_url`; repeated URLs within the page collapse to
/// their first occurrence.
pub fn parse_articles(html: &str, base_url: &str, selectors: &Selectors) -> Result<Vec<Article>> {
    let document = Html::parse_document(html);
    let base = Url::parse(base_url)?;

    let list_selector = compile(&selectors.article_list)?;
    let title_selector = selectors.title.as_deref().map(compile).transpose()?;
    let category_selector = selectors.category.as_deref().map(compile).transpose()?;
    let description_selector = selectors.description.as_deref().map(compile).transpose()?;

    let mut seen_urls = HashSet::new();
    let mut articles = Vec::new();

    for element in document.select(&list_selector) {
        let Some(article) = extract_article(
            element,
            &base,
            title_selector.as_ref(),
            category_selector.as_ref(),
            description_selector.as_ref(),
        ) else {
            continue;
        };

        if !seen_urls.insert(article.url.clone()) {
            continue;
        }
        articles.push(article);
    }

    debug!("Extracted {} candidate articles", articles.len());
    Ok(articles)
}

/// Selector-driven scraper for configured news sites.
pub struct NewsScraper {
    client: reqwest::Client,
}

impl NewsScraper {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }

    /// Scrape up to `max_articles` candidate articles from one site.
    pub async fn scrape(
        &self,
        page_url: &str,
        selectors: &Selectors,
        max_articles: usize,
    ) -> Result<Vec<Article>> {
        info!("Scraping news from {}", page_url);
        let html = self.fetch_html(page_url).await?;
        let mut articles = parse_articles(&html, page_url, selectors)?;
        articles.truncate(max_articles);
        info!("Found {} articles from {}", articles.len(), page_url);
        Ok(articles)
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;
        // Polite gap between page fetches.
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok(body)
    }
}
