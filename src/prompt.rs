use crate::types::Article;
use std::borrow::Cow;
use std::fmt::Write;

/// Hard ceiling on per-article body text injected into a prompt. Keeps a
/// full batch request inside a model's practical context budget.
pub const MAX_CONTENT_CHARS: usize = 4000;

/// Truncate `text` to at most `max_chars` characters, appending an
/// ellipsis marker when anything was cut. Counts characters, not bytes,
/// so multibyte text is never split mid-scalar.
pub fn truncate_chars(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => {
            let mut cut = text[..byte_index].to_string();
            cut.push_str("...");
            Cow::Owned(cut)
        }
        None => Cow::Borrowed(text),
    }
}

const SCORING_RULES: &str = "\
CRITICAL RULES:
1. Check if the article directly matches ANY of the user's HIGH or MEDIUM priority topics
2. Restaurant openings, food festivals, and culinary events ARE relevant (Food & Culinary section)
3. Technology, health alerts, price changes, and weather emergencies are also relevant
4. Check if the article is in the \"Topics to Ignore\" list - if so, score 1-2
5. When in doubt about relevance, score conservatively but fairly";

const ANALYSIS_PROCESS: &str = "\
1. First, check if the article matches a HIGH priority topic (score 8-10)
2. Then check if it matches a MEDIUM priority topic (score 6-7)
3. If it's in \"Topics to Ignore\", score 1-2
4. Otherwise score based on relevance and local impact";

fn article_block(article: &Article) -> String {
    format!(
        "Title: {}\nCategory: {}\nContent: {}",
        article.title_or_unknown(),
        article.category_or_unknown(),
        truncate_chars(article.body_text(), MAX_CONTENT_CHARS),
    )
}

/// Render the prompt for a single-article relevance call. The model is
/// instructed to answer with exactly one `{"score", "reason"}` object.
pub fn build_single_prompt(article: &Article, preferences: &str) -> String {
    format!(
        "You are a news filter. Analyze if this article matches the user's interests.\n\n\
         USER INTERESTS:\n{preferences}\n\n\
         ARTICLE:\n{block}\n\n\
         {SCORING_RULES}\n\n\
         ANALYSIS PROCESS:\n{ANALYSIS_PROCESS}\n\n\
         Respond with ONLY valid JSON in this exact format:\n\
         {{\n  \"score\": <number from 1-10>,\n  \"reason\": \"<brief explanation of which topic it matches, or why it doesn't match>\"\n}}\n",
        block = article_block(article),
    )
}

/// Render the prompt for a batch relevance call over `articles`.
///
/// Each article gets its own numbered block, and the reply contract names
/// the exact entry count and 0-based index range so truncated or partial
/// replies are detectable instead of silently misaligned.
pub fn build_batch_prompt(articles: &[Article], preferences: &str) -> String {
    let count = articles.len();

    let mut blocks = String::new();
    for (index, article) in articles.iter().enumerate() {
        if index > 0 {
            blocks.push_str("\n\n");
        }
        let _ = write!(blocks, "--- ARTICLE {index} ---\n{}", article_block(article));
    }

    format!(
        "You are a news filter. Analyze if each of the following {count} articles matches the user's interests.\n\n\
         USER INTERESTS:\n{preferences}\n\n\
         {blocks}\n\n\
         {SCORING_RULES}\n\n\
         ANALYSIS PROCESS (apply to EACH article independently):\n{ANALYSIS_PROCESS}\n\n\
         Respond with ONLY valid JSON in this exact format (an object with a \"results\" array containing exactly {count} entries, one per article in order):\n\
         {{\n  \"results\": [\n    {{\"article_index\": 0, \"score\": <number from 1-10>, \"reason\": \"<brief explanation>\"}},\n    {{\"article_index\": 1, \"score\": <number from 1-10>, \"reason\": \"<brief explanation>\"}},\n    ...\n  ]\n}}\n\n\
         IMPORTANT: You MUST return exactly {count} results, one for each article, in order from article 0 to article {last}.\n",
        last = count.saturating_sub(1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str, content: &str) -> Article {
        Article {
            url: "https://example.com/story".to_string(),
            title: Some(title.to_string()),
            category: Some("Local".to_string()),
            description: None,
            content: Some(content.to_string()),
        }
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let text = "é".repeat(4100);
        let cut = truncate_chars(&text, MAX_CONTENT_CHARS);
        assert_eq!(cut.chars().count(), MAX_CONTENT_CHARS + 3);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_chars("hello", MAX_CONTENT_CHARS), "hello");
    }

    #[test]
    fn single_prompt_embeds_preferences_and_fields() {
        let prompt = build_single_prompt(&article("Big news", "Something happened"), "I like trains");
        assert!(prompt.contains("I like trains"));
        assert!(prompt.contains("Title: Big news"));
        assert!(prompt.contains("Category: Local"));
        assert!(prompt.contains("Content: Something happened"));
        // The single path never carries the batch envelope.
        assert!(!prompt.contains("--- ARTICLE"));
        assert!(!prompt.contains("article_index"));
    }

    #[test]
    fn single_prompt_degrades_missing_fields_to_placeholders() {
        let bare = Article {
            url: "https://example.com/bare".to_string(),
            title: None,
            category: None,
            description: None,
            content: None,
        };
        let prompt = build_single_prompt(&bare, "prefs");
        assert!(prompt.contains("Title: Unknown"));
        assert!(prompt.contains("Category: Unknown"));
    }

    #[test]
    fn batch_prompt_numbers_every_article_and_states_count() {
        let articles = vec![
            article("First", "a"),
            article("Second", "b"),
            article("Third", "c"),
        ];
        let prompt = build_batch_prompt(&articles, "prefs");
        assert!(prompt.contains("--- ARTICLE 0 ---"));
        assert!(prompt.contains("--- ARTICLE 1 ---"));
        assert!(prompt.contains("--- ARTICLE 2 ---"));
        assert!(prompt.contains("exactly 3 entries"));
        assert!(prompt.contains("from article 0 to article 2"));
    }

    #[test]
    fn batch_prompt_truncates_each_article_independently() {
        let long = "x".repeat(MAX_CONTENT_CHARS + 500);
        let articles = vec![article("Long", &long), article("Short", "tiny")];
        let prompt = build_batch_prompt(&articles, "prefs");
        assert!(prompt.contains(&format!("{}...", "x".repeat(MAX_CONTENT_CHARS))));
        assert!(prompt.contains("Content: tiny"));
    }
}
