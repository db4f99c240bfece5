use crate::config::SourceConfig;
use crate::types::SeenArticle;
use std::fmt::Write;

/// Articles bucketed under one configured source.
#[derive(Debug)]
pub struct SourceGroup {
    pub name: String,
    pub url: Option<String>,
    pub articles: Vec<SeenArticle>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct GroupStats {
    pub total: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub pending: usize,
}

/// Group articles by source name, preserving configured source order.
/// Configured sources always appear, even when empty; articles whose
/// source matches nothing land in an "Unknown" bucket appended last.
pub fn group_by_source(articles: Vec<SeenArticle>, sources: &[SourceConfig]) -> Vec<SourceGroup> {
    let mut groups: Vec<SourceGroup> = sources
        .iter()
        .map(|s| SourceGroup {
            name: s.name.clone(),
            url: Some(s.url.clone()),
            articles: Vec::new(),
        })
        .collect();

    let mut unknown = Vec::new();
    for article in articles {
        let position = article
            .source_name
            .as_deref()
            .and_then(|name| groups.iter().position(|g| g.name == name));
        match position {
            Some(index) => groups[index].articles.push(article),
            None => unknown.push(article),
        }
    }

    if !unknown.is_empty() {
        groups.push(SourceGroup {
            name: "Unknown".to_string(),
            url: None,
            articles: unknown,
        });
    }

    groups
}

/// Accept/reject/pending counts for one group against the notification
/// threshold. Unscored rows count as pending.
pub fn group_stats(articles: &[SeenArticle], threshold: u8) -> GroupStats {
    let total = articles.len();
    let accepted = articles
        .iter()
        .filter(|a| a.relevance_score.is_some_and(|s| s >= threshold as i64))
        .count();
    let rejected = articles
        .iter()
        .filter(|a| a.relevance_score.is_some_and(|s| s < threshold as i64))
        .count();
    GroupStats {
        total,
        accepted,
        rejected,
        pending: total - accepted - rejected,
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the read-only dashboard page: recently seen articles grouped by
/// source, with per-source stats. Pure presentation over already-loaded
/// rows; no queries, no scoring.
pub fn render(groups: &[SourceGroup], threshold: u8, generated_at: &str) -> String {
    let mut page = String::new();
    page.push_str(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>News Curator Dashboard</title>\n<style>\n\
         body { font-family: sans-serif; margin: 2em; background: #fafafa; color: #222; }\n\
         h2 { border-bottom: 1px solid #ddd; padding-bottom: 0.3em; }\n\
         .stats { color: #666; font-size: 0.9em; margin-bottom: 0.5em; }\n\
         ul { list-style: none; padding-left: 0; }\n\
         li { margin: 0.4em 0; }\n\
         .score { display: inline-block; min-width: 3em; font-weight: bold; }\n\
         .accepted { color: #2d7d46; }\n\
         .rejected { color: #b33; }\n\
         .pending { color: #888; }\n\
         .reason { color: #666; font-size: 0.85em; }\n\
         footer { margin-top: 2em; color: #999; font-size: 0.8em; }\n\
         </style>\n</head>\n<body>\n<h1>News Curator Dashboard</h1>\n",
    );

    for group in groups {
        match &group.url {
            Some(url) => {
                let _ = write!(
                    page,
                    "<h2><a href=\"{}\">{}</a></h2>\n",
                    escape_html(url),
                    escape_html(&group.name)
                );
            }
            None => {
                let _ = write!(page, "<h2>{}</h2>\n", escape_html(&group.name));
            }
        }

        let stats = group_stats(&group.articles, threshold);
        let _ = write!(
            page,
            "<p class=\"stats\">{} articles &mdash; {} accepted, {} rejected, {} pending</p>\n",
            stats.total, stats.accepted, stats.rejected, stats.pending
        );

        if group.articles.is_empty() {
            page.push_str("<p class=\"stats\">No recent articles.</p>\n");
            continue;
        }

        page.push_str("<ul>\n");
        for article in &group.articles {
            let (class, label) = match article.relevance_score {
                Some(score) if score >= threshold as i64 => ("accepted", format!("{}/10", score)),
                Some(score) => ("rejected", format!("{}/10", score)),
                None => ("pending", "–".to_string()),
            };
            let _ = write!(
                page,
                "<li><span class=\"score {}\">{}</span> <a href=\"{}\">{}</a>",
                class,
                label,
                escape_html(&article.url),
                escape_html(&article.title)
            );
            if let Some(reason) = &article.reason {
                let _ = write!(page, " <span class=\"reason\">{}</span>", escape_html(reason));
            }
            page.push_str("</li>\n");
        }
        page.push_str("</ul>\n");
    }

    let _ = write!(
        page,
        "<footer>Generated at {} &mdash; notification threshold {}/10</footer>\n</body>\n</html>\n",
        escape_html(generated_at),
        threshold
    );
    page
}
